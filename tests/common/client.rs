//! Test telnet client.
//!
//! Sends raw lines and asserts on the lines the server writes back.

use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::time::timeout;

/// A test client.
pub struct TestClient {
    reader: BufReader<OwnedReadHalf>,
    writer: BufWriter<OwnedWriteHalf>,
}

impl TestClient {
    /// Connect to a test server.
    pub async fn connect(address: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(address).await?;
        let (read_half, write_half) = stream.into_split();

        Ok(Self {
            reader: BufReader::new(read_half),
            writer: BufWriter::new(write_half),
        })
    }

    /// Send raw bytes, without adding a terminator.
    pub async fn send_raw(&mut self, data: &[u8]) -> anyhow::Result<()> {
        self.writer.write_all(data).await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Send one line.
    pub async fn send(&mut self, line: &str) -> anyhow::Result<()> {
        self.send_raw(format!("{line}\r\n").as_bytes()).await
    }

    /// Receive a single line, without its terminator.
    pub async fn recv(&mut self) -> anyhow::Result<String> {
        self.recv_timeout(Duration::from_secs(5)).await
    }

    /// Receive a line with a timeout. Fails on end of stream.
    pub async fn recv_timeout(&mut self, dur: Duration) -> anyhow::Result<String> {
        let mut line = String::new();
        let read = timeout(dur, self.reader.read_line(&mut line)).await??;
        if read == 0 {
            anyhow::bail!("Connection closed");
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Receive lines until the given predicate returns true.
    pub async fn recv_until<F>(&mut self, mut predicate: F) -> anyhow::Result<Vec<String>>
    where
        F: FnMut(&str) -> bool,
    {
        let mut lines = Vec::new();
        loop {
            let line = self.recv().await?;
            let done = predicate(&line);
            lines.push(line);
            if done {
                break;
            }
        }
        Ok(lines)
    }

    /// Skip lines until exactly `expected` arrives.
    pub async fn expect(&mut self, expected: &str) -> anyhow::Result<()> {
        self.recv_until(|line| line == expected)
            .await
            .map_err(|e| anyhow::anyhow!("Waiting for {expected:?}: {e}"))?;
        Ok(())
    }

    /// Discard whatever arrives within a short window.
    #[allow(dead_code)]
    pub async fn drain(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Ok(line) = self.recv_timeout(Duration::from_millis(100)).await {
            lines.push(line);
        }
        lines
    }

    /// Wait for the server to close the connection, discarding any output.
    #[allow(dead_code)]
    pub async fn closed(&mut self) -> anyhow::Result<()> {
        let mut buf = String::new();
        loop {
            buf.clear();
            let read = timeout(Duration::from_secs(5), self.reader.read_line(&mut buf)).await??;
            if read == 0 {
                return Ok(());
            }
        }
    }

    /// Connect, wait for the welcome line and take a name.
    #[allow(dead_code)]
    pub async fn join(address: &str, name: &str) -> anyhow::Result<Self> {
        let mut client = Self::connect(address).await?;
        client.expect(super::server::WELCOME).await?;
        client.send(&format!("name {name}")).await?;
        client.recv_until(|line| line.ends_with(&format!("is now known as {name}.")))
            .await?;
        Ok(client)
    }
}

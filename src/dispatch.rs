//! Line dispatcher.
//!
//! Each inbound line takes exactly one of three paths:
//!
//! 1. **Abort**: an interceptor is attached and the line is its abort command.
//!    Abortable interceptors are dropped (together with anything they would
//!    have restored) and the session returns to command dispatch.
//!    Non-abortable ones answer with their `no_abort` notice and re-prompt.
//! 2. **Intercepted**: the line is fed to the attached interceptor.
//! 3. **Normal**: the line is matched against the session's registry.
//!
//! Handlers never touch the session directly. Whatever they request through
//! their [`Caller`] is applied here, in order, once they return.

use std::sync::Arc;
use tracing::{debug, trace};

use crate::commands::{Caller, Request};
use crate::error::contain;
use crate::intercept::{Interceptor, Step};
use crate::session::Session;

/// Result of dispatching a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    /// Keep reading lines.
    Continue,
    /// A handler asked to disconnect.
    Quit(String),
}

/// Dispatch one line for `session`.
pub fn handle_line(session: &mut Session, line: &str) -> DispatchResult {
    let abort = session
        .interceptor()
        .is_some_and(|active| active.is_abort(line));

    if abort {
        abort_active(session);
    } else if session.is_intercepted() {
        feed_active(session, line);
    } else {
        dispatch_command(session, line);
    }
    session.outcome()
}

/// Run an event callback with an empty caller and apply its requests.
pub(crate) fn run_event<F>(session: &mut Session, event: F) -> DispatchResult
where
    F: FnOnce(&mut Caller<'_>),
{
    let connection = session.connection().clone();
    let hub = Arc::clone(session.hub());
    let registry = Arc::clone(session.registry());
    let mut caller = Caller::new(&connection, &hub, "").with_registry(&registry);
    if let Err(error) = contain(|| event(&mut caller)) {
        registry.report_error(&mut caller, error);
    }
    let requests = caller.take_requests();
    settle(session, None, requests);
    session.outcome()
}

fn abort_active(session: &mut Session) {
    let connection = session.connection().clone();
    let Some(active) = session.interceptor_mut() else {
        return;
    };

    if active.refuse_abort(&connection) {
        debug!(conn = %connection.id(), kind = active.kind(), "Abort refused");
        active.explain(&connection);
        return;
    }

    connection.notify(active.abort_message_str());
    debug!(conn = %connection.id(), kind = active.kind(), "Interceptor aborted");
    session.transition(None);
}

fn feed_active(session: &mut Session, line: &str) {
    let Some(mut active) = session.take_interceptor() else {
        return;
    };
    let connection = session.connection().clone();
    let hub = Arc::clone(session.hub());
    let registry = Arc::clone(session.registry());

    let mut caller = Caller::new(&connection, &hub, line).with_registry(&registry);
    // The interceptor is out of the session while it is fed; it goes back
    // even if feeding unwinds.
    let step = match contain(|| active.feed(&mut caller, &registry)) {
        Ok(step) => step,
        Err(error) => {
            registry.report_error(&mut caller, error);
            Step::Stay
        }
    };
    let requests = caller.take_requests();
    trace!(conn = %connection.id(), kind = active.kind(), ?step, "Interceptor fed");

    settle(session, Some((active, step)), requests);
}

fn dispatch_command(session: &mut Session, line: &str) {
    let connection = session.connection().clone();
    let hub = Arc::clone(session.hub());
    let registry = Arc::clone(session.registry());

    let mut caller = Caller::new(&connection, &hub, line).with_registry(&registry);
    let resolution = registry.handle_line(&mut caller, true);
    let requests = caller.take_requests();
    trace!(conn = %connection.id(), ?resolution, "Line dispatched");

    settle(session, None, requests);
}

/// Apply the requests made during one invocation.
///
/// `fed` is the interceptor that was just fed (held outside the session while
/// it ran) and whether it wants to stay.
fn settle(session: &mut Session, mut fed: Option<(Interceptor, Step)>, requests: Vec<Request>) {
    for request in requests {
        match request {
            Request::Intercept(next) => intercept(session, &mut fed, next),
            Request::Release => {
                if let Some((current, _)) = fed.take() {
                    session.restore_interceptor(current);
                }
                session.transition(None);
            }
            Request::Registry(registry) => session.set_registry(registry),
            Request::Disconnect(reason) => {
                debug!(conn = %session.connection().id(), %reason, "Disconnect requested");
                session.request_close(reason);
            }
        }
    }

    match fed {
        Some((current, Step::Stay)) => session.restore_interceptor(current),
        Some((current, Step::Done)) => finish(session, current),
        None => {}
    }
}

fn intercept(session: &mut Session, fed: &mut Option<(Interceptor, Step)>, mut next: Interceptor) {
    match fed.take() {
        // The fed interceptor stays: nest the new one over it, after any
        // restore target the new one already has.
        Some((current, Step::Stay)) => {
            session.restore_interceptor(current);
            let previous = session.transition(Some(next));
            if let Some(active) = session.interceptor_mut() {
                active.chain_restore(previous);
            }
        }
        // The fed interceptor is done: the new one takes its place and
        // inherits its restore chain.
        Some((mut current, Step::Done)) => {
            next.chain_restore(current.take_restore());
            session.restore_interceptor(current);
            session.transition(Some(next));
        }
        None => {
            session.transition(Some(next));
        }
    }
}

/// Hand the session from a completed interceptor to its restore target.
fn finish(session: &mut Session, mut current: Interceptor) {
    let target = current.take_restore();
    session.restore_interceptor(current);
    session.transition(target);
}

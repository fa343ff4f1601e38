//! Host integration hooks
//!
//! Connects the tracker to the places faults surface in a Rust program:
//! panics (through a chained panic hook) and `Result` errors (through
//! [`report_and_continue`]).
//!
//! A panic raised while the tracker itself is running is never reported
//! again, so a broken pipeline cannot feed back into the hook.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::Cell;
use std::future::{poll_fn, Future};
use std::panic::{AssertUnwindSafe, Location};
use std::sync::Arc;

use errtrack_core::domain::{FaultEvent, FaultKind, Origin, RequestContext};
use errtrack_core::ports::ContextSource;
use tracing::{error, warn};

use crate::tracker::ErrorTracker;

thread_local! {
    static REPORTING: Cell<bool> = const { Cell::new(false) };
}

/// Marks the current thread as running the reporting pipeline until dropped
struct ReporterScope {
    previous: bool,
}

impl ReporterScope {
    fn enter() -> Self {
        let previous = REPORTING.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for ReporterScope {
    fn drop(&mut self) {
        let previous = self.previous;
        REPORTING.with(|flag| flag.set(previous));
    }
}

fn is_reporting() -> bool {
    REPORTING.with(Cell::get)
}

/// Wraps `future` so every poll runs inside a [`ReporterScope`]
pub(crate) fn guarded<F: Future>(future: F) -> impl Future<Output = F::Output> {
    let mut future = Box::pin(future);
    poll_fn(move |cx| {
        let _scope = ReporterScope::enter();
        future.as_mut().poll(cx)
    })
}

/// Runs `f` on a fresh reporter thread and waits for it
///
/// Returns `None` if the thread could not be started or `f` panicked.
pub(crate) fn run_isolated<T, F>(f: F) -> Option<T>
where
    T: Send,
    F: FnOnce() -> T + Send,
{
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("errtrack-reporter".to_string())
            .spawn_scoped(scope, move || {
                let _scope = ReporterScope::enter();
                f()
            });

        match handle {
            Ok(handle) => handle.join().ok(),
            Err(e) => {
                error!(error = %e, "Failed to spawn fault reporter thread");
                None
            }
        }
    })
}

/// Extracts the message from a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

/// Converts a panic into a fault event of kind `panic`
///
/// # Arguments
/// * `payload` - The panic payload, usually a `&str` or `String`
/// * `location` - Where the panic was raised, if known
/// * `backtrace` - Backtrace captured inside the hook
pub fn fault_from_panic(
    payload: &(dyn Any + Send),
    location: Option<&Location<'_>>,
    backtrace: &Backtrace,
) -> FaultEvent {
    let mut fault =
        FaultEvent::new(FaultKind::panic(), panic_message(payload)).with_backtrace(backtrace);
    if let Some(location) = location {
        fault = fault.with_origin(Origin::new(location.file(), location.line()));
    }
    fault
}

/// Installs a panic hook that reports every panic before default handling
///
/// The request context is taken from `source` at panic time. Delivery runs
/// synchronously on a separate thread; the previously installed hook is
/// called afterwards so the usual panic output is preserved.
pub fn install_panic_reporter(tracker: Arc<ErrorTracker>, source: Arc<dyn ContextSource>) {
    let previous_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        if !is_reporting() {
            let fault = fault_from_panic(
                panic_info.payload(),
                panic_info.location(),
                &Backtrace::force_capture(),
            );

            let delivered = run_isolated(|| {
                let context = std::panic::catch_unwind(AssertUnwindSafe(|| source.snapshot()))
                    .unwrap_or_default();
                tracker.report_on_current_thread(&fault, &context)
            })
            .unwrap_or(false);

            if !delivered {
                warn!(message = %fault.message(), "Panic was not reported");
            }
        }

        // Call the previous panic hook
        previous_hook(panic_info);
    }));
}

/// Reports the error in `result`, if any, and returns `result` unchanged
///
/// The reported type name is the Rust type of the error.
pub async fn report_and_continue<T, E>(
    tracker: &ErrorTracker,
    kind: FaultKind,
    context: &RequestContext,
    result: Result<T, E>,
) -> Result<T, E>
where
    E: std::error::Error + 'static,
{
    if let Err(error) = &result {
        let fault = FaultEvent::from_error(kind, error).with_type_name(std::any::type_name::<E>());
        tracker.report_fault(&fault, context).await;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_payloads() {
        let s: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(s.as_ref()), "static message");

        let owned: Box<dyn Any + Send> = Box::new(String::from("owned message"));
        assert_eq!(panic_message(owned.as_ref()), "owned message");

        let other: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(other.as_ref()), "Unknown panic");
    }

    #[test]
    fn test_reporter_scope_nests_and_restores() {
        assert!(!is_reporting());
        {
            let _outer = ReporterScope::enter();
            assert!(is_reporting());
            {
                let _inner = ReporterScope::enter();
                assert!(is_reporting());
            }
            assert!(is_reporting());
        }
        assert!(!is_reporting());
    }

    #[test]
    fn test_run_isolated_marks_thread_and_catches_panics() {
        assert_eq!(run_isolated(is_reporting), Some(true));
        assert!(!is_reporting());

        let result: Option<()> = run_isolated(|| panic!("isolated"));
        assert!(result.is_none());
    }

    #[test]
    fn test_fault_from_panic_captures_message_and_origin() {
        let payload: Box<dyn Any + Send> = Box::new("index out of bounds");
        let location = Location::caller();

        let fault = fault_from_panic(payload.as_ref(), Some(location), &Backtrace::disabled());

        assert_eq!(fault.kind(), &FaultKind::panic());
        assert_eq!(fault.type_name(), "panic");
        assert_eq!(fault.message(), "index out of bounds");
        let origin = fault.origin().unwrap();
        assert!(origin.file.ends_with("hook.rs"));
        assert_eq!(origin.line, location.line());
        assert!(fault.stack_trace().is_empty());
    }

    #[tokio::test]
    async fn test_guarded_sets_flag_only_while_polling() {
        let inside = guarded(async { is_reporting() }).await;
        assert!(inside);
        assert!(!is_reporting());
    }
}

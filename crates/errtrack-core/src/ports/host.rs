//! Host data-source ports (driven/secondary ports)
//!
//! The pipeline never reaches into global application state. Everything it
//! knows about the running host arrives through these traits as immutable
//! snapshots.
//!
//! ## Design Notes
//!
//! - Implementations must be cheap and infallible; they are called on the
//!   fault-handling path.
//! - `Send + Sync` so one instance can serve concurrently faulting requests.

use crate::domain::{AuthenticatedUser, RequestContext, SystemData};

/// Port trait describing the process the tracker runs in
pub trait HostEnvironment: Send + Sync {
    /// Name of the current deployment environment (`production`, `staging`, ...)
    fn environment_name(&self) -> String;

    /// Runtime version, host framework version and server identification
    fn system_data(&self) -> SystemData;
}

/// Port trait supplying the ambient request for hooks that only see the fault
///
/// Used by the panic hook; regular callers pass their [`RequestContext`]
/// to the tracker directly.
pub trait ContextSource: Send + Sync {
    /// Snapshot of the request currently being served, or an empty context
    fn current_request(&self) -> RequestContext;

    /// The principal attached to the current request, if any
    ///
    /// Consulted only when the request snapshot carries no user.
    fn current_principal(&self) -> Option<AuthenticatedUser> {
        None
    }

    /// Request snapshot with the principal filled in from
    /// [`ContextSource::current_principal`] when missing
    fn snapshot(&self) -> RequestContext {
        let mut context = self.current_request();
        if context.authenticated_user.is_none() {
            context.authenticated_user = self.current_principal();
        }
        context
    }
}

/// Context source for hosts that do not serve requests
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRequestContext;

impl ContextSource for NoRequestContext {
    fn current_request(&self) -> RequestContext {
        RequestContext::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource;

    impl ContextSource for FixedSource {
        fn current_request(&self) -> RequestContext {
            RequestContext::new("GET", "https://app.test/")
        }

        fn current_principal(&self) -> Option<AuthenticatedUser> {
            Some(AuthenticatedUser::new("7"))
        }
    }

    #[test]
    fn test_snapshot_fills_missing_principal() {
        let ctx = FixedSource.snapshot();
        assert_eq!(ctx.method, "GET");
        assert_eq!(ctx.authenticated_user.map(|u| u.id), Some("7".to_string()));
    }

    #[test]
    fn test_no_request_context_is_empty() {
        let ctx = NoRequestContext.snapshot();
        assert!(ctx.url.is_empty());
        assert!(ctx.authenticated_user.is_none());
    }
}

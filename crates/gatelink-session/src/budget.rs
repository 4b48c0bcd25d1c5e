//! The session-start budget: how many fresh sessions we may still open.
//!
//! Gatelink doesn't fetch the budget itself; that's the job of a
//! [`BudgetSource`]. The runner asks the source once before every
//! connection attempt and waits out `reset_after` when nothing remains.

use std::time::Duration;

use crate::SessionError;

/// A snapshot of the session-start budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionStartLimit {
    /// Sessions allowed per reset period.
    pub total: u32,
    /// Sessions still available in this period.
    pub remaining: u32,
    /// Time until `remaining` resets to `total`.
    pub reset_after: Duration,
    /// Identify attempts allowed per 5-second window.
    pub max_concurrency: u32,
}

impl SessionStartLimit {
    /// Whether a new session may be started now.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }
}

/// Supplies the current session-start budget.
///
/// # Trait bounds
///
/// - `Send + Sync` so the source can be shared with the runner task.
/// - `'static` because it lives as long as the client.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use gatelink_session::{BudgetSource, SessionError, SessionStartLimit};
///
/// /// Always reports a single, full budget.
/// struct Unlimited;
///
/// impl BudgetSource for Unlimited {
///     async fn fetch(&self) -> Result<SessionStartLimit, SessionError> {
///         Ok(SessionStartLimit {
///             total: 1000,
///             remaining: 1000,
///             reset_after: Duration::ZERO,
///             max_concurrency: 1,
///         })
///     }
/// }
/// ```
pub trait BudgetSource: Send + Sync + 'static {
    /// Returns the current budget.
    ///
    /// # Errors
    /// [`SessionError::BudgetUnavailable`] when the budget can't be read.
    fn fetch(
        &self,
    ) -> impl std::future::Future<Output = Result<SessionStartLimit, SessionError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Exhausted;

    impl BudgetSource for Exhausted {
        async fn fetch(&self) -> Result<SessionStartLimit, SessionError> {
            Ok(SessionStartLimit {
                total: 1000,
                remaining: 0,
                reset_after: Duration::from_secs(3600),
                max_concurrency: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_fetch_exhausted_budget_reports_exhausted() {
        let limit = Exhausted.fetch().await.unwrap();
        assert!(limit.is_exhausted());
        assert_eq!(limit.reset_after, Duration::from_secs(3600));
    }
}

//! # Request Context
//!
//! `Ctx` carries cancellation and an optional deadline through a request.
//! Every store round trip runs under [`Ctx::run`], so a cancelled request
//! stops at the next await point and issues no further store calls.
//!
//! ```text
//!   Ctx::new() ─┬─ with_timeout(5s) ──► store call ─┐
//!               │                                    ├─ select! ─► Ok / Err(DeadlineExceeded)
//!               └─ cancel() ─────────────────────────┘            Err(Canceled)
//! ```

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Why a context stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CtxError {
    #[error("context canceled")]
    Canceled,

    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

/// Request-scoped cancellation and deadline.
///
/// Cloning shares the same token; [`Ctx::child`] derives a token that is
/// cancelled with its parent but can also be cancelled on its own.
#[derive(Debug, Clone, Default)]
pub struct Ctx {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl Ctx {
    pub fn new() -> Self {
        Self::default()
    }

    /// A context cancelled when `token` is.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// Child context; cancelling it leaves the parent alone.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// Child context that also expires after `timeout`.
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context that expires at `deadline` (or earlier, if the parent does).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// `Ok` while the context is live.
    pub fn err(&self) -> Result<(), CtxError> {
        if self.token.is_cancelled() {
            return Err(CtxError::Canceled);
        }
        match self.deadline {
            Some(deadline) if deadline <= Instant::now() => Err(CtxError::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    /// Runs `fut` unless the context ends first.
    ///
    /// Checks the context before polling, then races the future against
    /// cancellation and the deadline. A losing future is dropped.
    pub async fn run<F, T, E>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<CtxError>,
    {
        self.err()?;

        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(CtxError::Canceled.into()),
                _ = tokio::time::sleep_until(deadline) => Err(CtxError::DeadlineExceeded.into()),
                res = fut => res,
            },
            None => tokio::select! {
                biased;
                _ = self.token.cancelled() => Err(CtxError::Canceled.into()),
                res = fut => res,
            },
        }
    }
}

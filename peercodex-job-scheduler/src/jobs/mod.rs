mod clear_expired_listings;
mod clear_expired_otps;
mod clear_unverified_users;
mod unblacklist_expired_tokens;

pub use clear_expired_listings::ClearExpiredListingsJob;
pub use clear_expired_otps::ClearExpiredOtpsJob;
pub use clear_unverified_users::ClearUnverifiedUsersJob;
pub use unblacklist_expired_tokens::UnblacklistExpiredTokensJob;

use peercodex_common::db::DaoError;

use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinError;

#[derive(Debug)]
pub enum JobError {
    DaoFailure(DaoError),
    ConcurrencyError(JoinError),
    NotReady,
}

impl std::error::Error for JobError {}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobError::DaoFailure(e) => write!(f, "JobError: {e}"),
            JobError::ConcurrencyError(e) => {
                write!(f, "JobError: ConcurrencyError: {e}")
            }
            JobError::NotReady => {
                write!(f, "JobError: Attempted execution before job was ready")
            }
        }
    }
}

impl From<DaoError> for JobError {
    fn from(e: DaoError) -> Self {
        JobError::DaoFailure(e)
    }
}

impl From<JoinError> for JobError {
    fn from(e: JoinError) -> Self {
        JobError::ConcurrencyError(e)
    }
}

/// A periodic cleanup task. `execute` returns the number of rows the job removed.
#[async_trait]
pub trait Job: Send {
    fn name(&self) -> &'static str;
    fn is_ready(&self) -> bool;
    async fn execute(&mut self) -> Result<usize, JobError>;
}

/// Runs a blocking cleanup query on Tokio's blocking pool, marking the job as running for the
/// duration. The flag is cleared even if the query fails.
async fn run_cleanup<F>(is_running: &mut bool, cleanup: F) -> Result<usize, JobError>
where
    F: FnOnce() -> Result<usize, DaoError> + Send + 'static,
{
    if *is_running {
        return Err(JobError::NotReady);
    }

    *is_running = true;
    let result = tokio::task::spawn_blocking(cleanup).await;
    *is_running = false;

    Ok(result??)
}

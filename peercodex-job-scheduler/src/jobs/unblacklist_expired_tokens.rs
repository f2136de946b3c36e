use peercodex_common::db::auth::Dao as AuthDao;
use peercodex_common::db::DbThreadPool;

use async_trait::async_trait;

use crate::jobs::{run_cleanup, Job, JobError};

pub struct UnblacklistExpiredTokensJob {
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl UnblacklistExpiredTokensJob {
    pub fn new(db_thread_pool: DbThreadPool) -> Self {
        Self {
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for UnblacklistExpiredTokensJob {
    fn name(&self) -> &'static str {
        "Unblacklist Expired Tokens"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<usize, JobError> {
        let dao = AuthDao::new(&self.db_thread_pool);
        run_cleanup(&mut self.is_running, move || dao.clear_all_expired_tokens()).await
    }
}

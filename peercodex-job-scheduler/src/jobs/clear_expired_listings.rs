use peercodex_common::db::listing::Dao as ListingDao;
use peercodex_common::db::DbThreadPool;

use async_trait::async_trait;

use crate::jobs::{run_cleanup, Job, JobError};

pub struct ClearExpiredListingsJob {
    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearExpiredListingsJob {
    pub fn new(db_thread_pool: DbThreadPool) -> Self {
        Self {
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearExpiredListingsJob {
    fn name(&self) -> &'static str {
        "Clear Expired Listings"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<usize, JobError> {
        let dao = ListingDao::new(&self.db_thread_pool);
        run_cleanup(&mut self.is_running, move || dao.delete_expired_listings()).await
    }
}

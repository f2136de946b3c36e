use peercodex_common::db::user::Dao as UserDao;
use peercodex_common::db::DbThreadPool;

use async_trait::async_trait;
use std::time::Duration;

use crate::jobs::{run_cleanup, Job, JobError};

pub struct ClearUnverifiedUsersJob {
    pub max_unverified_user_age: Duration,

    db_thread_pool: DbThreadPool,
    is_running: bool,
}

impl ClearUnverifiedUsersJob {
    pub fn new(max_unverified_user_age: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            max_unverified_user_age,
            db_thread_pool,
            is_running: false,
        }
    }
}

#[async_trait]
impl Job for ClearUnverifiedUsersJob {
    fn name(&self) -> &'static str {
        "Clear Unverified Users"
    }

    fn is_ready(&self) -> bool {
        !self.is_running
    }

    async fn execute(&mut self) -> Result<usize, JobError> {
        let max_unverified_user_age = self.max_unverified_user_age;
        let dao = UserDao::new(&self.db_thread_pool);

        run_cleanup(&mut self.is_running, move || {
            dao.delete_unverified_users_older_than(max_unverified_user_age)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use peercodex_common::db::DaoError;
    use peercodex_common::schema::users;

    use diesel::{ExpressionMethods, QueryDsl, RunQueryDsl};
    use std::time::SystemTime;

    use crate::env;
    use crate::jobs::tests::{create_user, delete_user};

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_execute() {
        let old_unverified_id = create_user(false);
        let new_unverified_id = create_user(false);
        let old_verified_id = create_user(true);

        let two_weeks_ago = SystemTime::now() - Duration::from_secs(14 * 86400);
        diesel::update(users::table.filter(users::id.eq_any([old_unverified_id, old_verified_id])))
            .set(users::created_timestamp.eq(two_weeks_ago))
            .execute(&mut env::testing::DB_THREAD_POOL.get().unwrap())
            .unwrap();

        let mut job = ClearUnverifiedUsersJob::new(
            Duration::from_secs(7 * 86400),
            env::testing::DB_THREAD_POOL.clone(),
        );
        assert!(job.execute().await.unwrap() >= 1);

        let dao = UserDao::new(&env::testing::DB_THREAD_POOL);
        assert!(matches!(
            dao.get_user(old_unverified_id),
            Err(DaoError::QueryFailure(diesel::result::Error::NotFound))
        ));
        assert!(dao.get_user(new_unverified_id).is_ok());
        assert!(dao.get_user(old_verified_id).is_ok());

        delete_user(new_unverified_id);
        delete_user(old_verified_id);
    }
}

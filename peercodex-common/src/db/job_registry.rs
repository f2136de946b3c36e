use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::SystemTime;

use crate::db::{DaoError, DbThreadPool};
use crate::models::job_registry::NewJobRegistryItem;
use crate::schema::job_registry as job_registry_fields;
use crate::schema::job_registry::dsl::job_registry;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn get_job_last_run_timestamp(&self, name: &str) -> Result<Option<SystemTime>, DaoError> {
        Ok(job_registry
            .select(job_registry_fields::last_run_timestamp)
            .find(name)
            .get_result::<SystemTime>(&mut self.db_thread_pool.get()?)
            .optional()?)
    }

    pub fn set_job_last_run_timestamp(
        &self,
        job_name: &str,
        timestamp: SystemTime,
    ) -> Result<(), DaoError> {
        let registry_item = NewJobRegistryItem {
            job_name,
            last_run_timestamp: timestamp,
        };

        dsl::insert_into(job_registry)
            .values(&registry_item)
            .on_conflict(job_registry_fields::job_name)
            .do_update()
            .set(job_registry_fields::last_run_timestamp.eq(timestamp))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, UNIX_EPOCH};
    use uuid::Uuid;

    use crate::db::test_utils;

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_job_registry_persists_and_updates_timestamps() {
        let dao = Dao::new(test_utils::db_pool());
        let job_name = format!("test-job-{}", Uuid::now_v7());

        assert!(dao.get_job_last_run_timestamp(&job_name).unwrap().is_none());

        // Whole seconds so the value survives Postgres' microsecond precision unchanged
        let timestamp = UNIX_EPOCH + Duration::from_secs(1_750_000_000);
        dao.set_job_last_run_timestamp(&job_name, timestamp)
            .unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).unwrap(),
            Some(timestamp)
        );

        let new_timestamp = timestamp + Duration::from_secs(60);
        dao.set_job_last_run_timestamp(&job_name, new_timestamp)
            .unwrap();
        assert_eq!(
            dao.get_job_last_run_timestamp(&job_name).unwrap(),
            Some(new_timestamp)
        );

        diesel::delete(job_registry.find(&job_name))
            .execute(&mut test_utils::db_pool().get().unwrap())
            .unwrap();
    }
}

use peercodex_common::db::job_registry::Dao as JobRegistryDao;
use peercodex_common::db::DbThreadPool;

use futures::future;
use std::time::{Duration, Instant, SystemTime};
use tokio::time;

use crate::jobs::Job;

struct JobContainer {
    job: Box<dyn Job>,
    run_frequency: Duration,
    last_run_time: SystemTime,
}

pub struct JobRunner {
    jobs: Vec<JobContainer>,
    update_frequency: Duration,
    db_thread_pool: DbThreadPool,
}

impl JobRunner {
    pub fn new(update_frequency: Duration, db_thread_pool: DbThreadPool) -> Self {
        Self {
            jobs: Vec::new(),
            update_frequency,
            db_thread_pool,
        }
    }

    /// Adds a job to the runner. A job that has never run is treated as having just run, so it
    /// first executes one `run_frequency` after registration.
    pub async fn register(&mut self, job: Box<dyn Job>, run_frequency: Duration) {
        let job_name_ref = job.name();

        log::info!(
            "Registered job \"{}\" to run every {} seconds",
            job_name_ref,
            run_frequency.as_secs()
        );

        let dao = JobRegistryDao::new(&self.db_thread_pool);
        let last_run_time = tokio::task::spawn_blocking(move || {
            dao.get_job_last_run_timestamp(job_name_ref)
                .unwrap_or_else(|e| {
                    log::error!(
                        "Failed to get last run timestamp for job '{}': {}",
                        job_name_ref,
                        e
                    );
                    None
                })
        })
        .await
        .unwrap_or_else(|e| {
            log::error!("Failed to join Tokio task: {}", e);
            None
        });

        self.jobs.push(JobContainer {
            job,
            run_frequency,
            last_run_time: last_run_time.unwrap_or(SystemTime::now()),
        });
    }

    pub async fn start(&mut self) -> ! {
        loop {
            let before = Instant::now();

            let mut job_names = Vec::with_capacity(self.jobs.len());
            let mut job_futures = Vec::with_capacity(self.jobs.len());
            let mut record_job_run_futures = Vec::with_capacity(self.jobs.len());

            for job_container in &mut self.jobs {
                let now = SystemTime::now();
                let job = &mut job_container.job;

                if is_due(job_container.last_run_time, job_container.run_frequency, now)
                    && job.is_ready()
                {
                    let name_ref = job.name();
                    log::info!("Executing job \"{}\"", name_ref);

                    job_container.last_run_time = now;
                    job_names.push(name_ref);
                    job_futures.push(job.execute());

                    let dao = JobRegistryDao::new(&self.db_thread_pool);
                    let record_run_task = tokio::task::spawn_blocking(move || {
                        dao.set_job_last_run_timestamp(name_ref, now)
                    });

                    record_job_run_futures.push(record_run_task);
                }
            }

            let (job_results, recording_results) = future::join(
                future::join_all(job_futures),
                future::join_all(record_job_run_futures),
            )
            .await;

            for (name, result) in job_names.into_iter().zip(job_results) {
                match result {
                    Ok(affected) => {
                        log::info!("Job \"{}\" finished, removing {} rows", name, affected)
                    }
                    Err(e) => log::error!("Job \"{}\" failed: {}", name, e),
                }
            }

            for result in recording_results.into_iter() {
                match result {
                    Ok(Err(e)) => log::error!("Error recording job run: {}", e),
                    Err(e) => log::error!("Failed to join Tokio task: {}", e),
                    Ok(Ok(())) => (),
                }
            }

            let delta = Instant::now() - before;

            if delta < self.update_frequency {
                time::sleep(self.update_frequency - delta).await;
            }
        }
    }
}

fn is_due(last_run_time: SystemTime, run_frequency: Duration, now: SystemTime) -> bool {
    let time_elapsed_since_last_run = now
        .duration_since(last_run_time)
        .unwrap_or(Duration::from_nanos(0));

    time_elapsed_since_last_run >= run_frequency
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::Ordering;
    use std::sync::Arc;

    use crate::env;
    use crate::jobs::tests::MockJob;

    #[test]
    fn test_is_due() {
        let now = SystemTime::now();
        let frequency = Duration::from_secs(10);

        assert!(!is_due(now, frequency, now));
        assert!(!is_due(now - Duration::from_secs(9), frequency, now));
        assert!(is_due(now - Duration::from_secs(10), frequency, now));
        assert!(is_due(now - Duration::from_secs(25), frequency, now));

        // A last run recorded in the future (clock skew between hosts) waits rather than firing
        assert!(!is_due(now + Duration::from_secs(5), frequency, now));
    }

    #[tokio::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_register() {
        let mut job_runner = JobRunner::new(
            Duration::from_micros(200),
            env::testing::DB_THREAD_POOL.clone(),
        );
        assert_eq!(job_runner.update_frequency, Duration::from_micros(200));
        assert!(job_runner.jobs.is_empty());

        job_runner
            .register(Box::new(MockJob::new("Mock Register 1")), Duration::from_millis(1))
            .await;
        assert_eq!(job_runner.jobs.len(), 1);

        job_runner
            .register(Box::new(MockJob::new("Mock Register 2")), Duration::from_millis(3))
            .await;
        assert_eq!(job_runner.jobs.len(), 2);
        assert_eq!(job_runner.jobs[1].run_frequency, Duration::from_millis(3));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_start() {
        let job_name = "Mock Start";
        let dao = JobRegistryDao::new(&env::testing::DB_THREAD_POOL);
        dao.set_job_last_run_timestamp(job_name, SystemTime::now())
            .unwrap();

        let mut job_runner =
            JobRunner::new(Duration::from_millis(5), env::testing::DB_THREAD_POOL.clone());

        let job = MockJob::new(job_name);
        let run_count = Arc::clone(&job.runs);

        job_runner
            .register(Box::new(job), Duration::from_millis(300))
            .await;

        assert_eq!(run_count.load(Ordering::SeqCst), 0);

        tokio::task::spawn(async move { job_runner.start().await });

        time::sleep(Duration::from_millis(150)).await;
        assert_eq!(run_count.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(300)).await;
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        let recorded = dao.get_job_last_run_timestamp(job_name).unwrap().unwrap();
        assert!(recorded.elapsed().unwrap() < Duration::from_secs(5));
    }
}

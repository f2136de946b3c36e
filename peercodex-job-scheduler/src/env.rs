use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::Zeroize;

#[cfg(not(test))]
pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

#[cfg(test)]
pub static CONF: Lazy<Config> = Lazy::new(Config::for_testing);

const DB_USERNAME_VAR: &str = "PEERCODEX_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "PEERCODEX_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "PEERCODEX_DB_HOSTNAME";
const DB_PORT_VAR: &str = "PEERCODEX_DB_PORT";
const DB_NAME_VAR: &str = "PEERCODEX_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "PEERCODEX_JOBS_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "PEERCODEX_JOBS_DB_IDLE_TIMEOUT_SECS";

const WORKER_THREADS_VAR: &str = "PEERCODEX_JOBS_WORKER_THREADS";
const MAX_BLOCKING_THREADS_VAR: &str = "PEERCODEX_JOBS_MAX_BLOCKING_THREADS";
const UPDATE_FREQUENCY_SECS_VAR: &str = "PEERCODEX_JOBS_UPDATE_FREQUENCY_SECS";

const CLEAR_EXPIRED_LISTINGS_FREQUENCY_SECS_VAR: &str =
    "PEERCODEX_CLEAR_EXPIRED_LISTINGS_JOB_FREQUENCY_SECS";
const CLEAR_EXPIRED_OTPS_FREQUENCY_SECS_VAR: &str =
    "PEERCODEX_CLEAR_EXPIRED_OTPS_JOB_FREQUENCY_SECS";
const CLEAR_UNVERIFIED_USERS_FREQUENCY_SECS_VAR: &str =
    "PEERCODEX_CLEAR_UNVERIFIED_USERS_JOB_FREQUENCY_SECS";
const CLEAR_UNVERIFIED_USERS_MAX_AGE_DAYS_VAR: &str =
    "PEERCODEX_CLEAR_UNVERIFIED_USERS_MAX_USER_AGE_DAYS";
const UNBLACKLIST_EXPIRED_TOKENS_FREQUENCY_SECS_VAR: &str =
    "PEERCODEX_UNBLACKLIST_EXPIRED_TOKENS_JOB_FREQUENCY_SECS";

const LOG_LEVEL_VAR: &str = "PEERCODEX_JOBS_LOG_LEVEL";

#[derive(Zeroize)]
pub struct ConfigInner {
    pub db_username: String,
    pub db_password: String,
    pub db_hostname: String,
    pub db_port: u16,
    pub db_name: String,
    #[zeroize(skip)]
    pub db_max_connections: u32,
    #[zeroize(skip)]
    pub db_idle_timeout: Duration,

    #[zeroize(skip)]
    pub worker_threads: usize,
    #[zeroize(skip)]
    pub max_blocking_threads: usize,
    #[zeroize(skip)]
    pub update_frequency: Duration,

    #[zeroize(skip)]
    pub clear_expired_listings_job_frequency: Duration,
    #[zeroize(skip)]
    pub clear_expired_otps_job_frequency: Duration,
    #[zeroize(skip)]
    pub clear_unverified_users_job_frequency: Duration,
    #[zeroize(skip)]
    pub clear_unverified_users_max_user_age: Duration,
    #[zeroize(skip)]
    pub unblacklist_expired_tokens_job_frequency: Duration,

    #[zeroize(skip)]
    pub log_level: String,
}

pub struct Config {
    inner: UnsafeCell<ConfigInner>,
}

impl Deref for Config {
    type Target = ConfigInner;

    fn deref(&self) -> &Self::Target {
        // Safe as long as `unsafe Config::zeroize()` hasn't been called
        unsafe { &*self.inner.get() }
    }
}

// Safe to be shared across threads as long as `unsafe Config::zeroize()` hasn't been called
unsafe impl Sync for Config {}

impl Config {
    pub fn from_env() -> Result<Config, ConfigError> {
        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 4),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 60)),

            worker_threads: env_var_or(WORKER_THREADS_VAR, num_cpus::get()),
            max_blocking_threads: env_var_or(MAX_BLOCKING_THREADS_VAR, 40),
            update_frequency: Duration::from_secs(env_var_or(UPDATE_FREQUENCY_SECS_VAR, 5)),

            clear_expired_listings_job_frequency: secs(
                CLEAR_EXPIRED_LISTINGS_FREQUENCY_SECS_VAR,
                3600,
            ),
            clear_expired_otps_job_frequency: secs(CLEAR_EXPIRED_OTPS_FREQUENCY_SECS_VAR, 3600),
            clear_unverified_users_job_frequency: secs(
                CLEAR_UNVERIFIED_USERS_FREQUENCY_SECS_VAR,
                86400,
            ),
            clear_unverified_users_max_user_age: Duration::from_secs(
                env_var_or(CLEAR_UNVERIFIED_USERS_MAX_AGE_DAYS_VAR, 7) * 86400,
            ),
            unblacklist_expired_tokens_job_frequency: secs(
                UNBLACKLIST_EXPIRED_TOKENS_FREQUENCY_SECS_VAR,
                3600,
            ),

            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    #[cfg(test)]
    pub fn for_testing() -> Config {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::from("postgres")),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("peercodex_test")),
            db_max_connections: 4,
            db_idle_timeout: Duration::from_secs(30),

            worker_threads: 1,
            max_blocking_threads: 4,
            update_frequency: Duration::from_millis(5),

            clear_expired_listings_job_frequency: Duration::from_secs(60),
            clear_expired_otps_job_frequency: Duration::from_secs(60),
            clear_unverified_users_job_frequency: Duration::from_secs(60),
            clear_unverified_users_max_user_age: Duration::from_secs(7 * 86400),
            unblacklist_expired_tokens_job_frequency: Duration::from_secs(60),

            log_level: String::from("debug"),
        };

        Config {
            inner: UnsafeCell::new(inner),
        }
    }

    /// # Safety
    ///
    /// Safe only if the Config isn't being used by other threads or across an async
    /// boundary. Generally, this should only be used at the end of the main function once
    /// all threads have been joined.
    pub unsafe fn zeroize(&self) {
        unsafe {
            (*self.inner.get()).zeroize();
        }
    }
}

fn secs(key: &'static str, default: u64) -> Duration {
    Duration::from_secs(env_var_or(key, default))
}

fn env_var<T: FromStr>(key: &'static str) -> Result<T, ConfigError> {
    let var = std::env::var(key).map_err(|_| ConfigError::missing(key))?;
    let var: T = var.parse().map_err(|_| ConfigError::invalid(key))?;
    Ok(var)
}

fn env_var_or<T: FromStr>(key: &'static str, default: T) -> T {
    let Ok(var) = std::env::var(key) else {
        return default;
    };

    var.parse().unwrap_or(default)
}

#[derive(Clone, Copy, Debug)]
pub enum ConfigError {
    MissingVar(&'static str),
    InvalidVar(&'static str),
}

impl ConfigError {
    fn missing(var_name: &'static str) -> Self {
        Self::MissingVar(var_name)
    }

    fn invalid(var_name: &'static str) -> Self {
        Self::InvalidVar(var_name)
    }
}

impl std::error::Error for ConfigError {}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVar(key) => write!(f, "Missing environment variable '{}'", key),
            Self::InvalidVar(key) => write!(f, "Environment variable '{}' is invalid", key),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use peercodex_common::db::DbThreadPool;

    use diesel::pg::PgConnection;
    use diesel::r2d2::{ConnectionManager, Pool};

    use super::*;

    pub static DB_THREAD_POOL: Lazy<DbThreadPool> = Lazy::new(|| {
        let db_uri = format!(
            "postgres://{}:{}@{}:{}/{}",
            CONF.db_username, CONF.db_password, CONF.db_hostname, CONF.db_port, CONF.db_name,
        );

        Pool::builder()
            .max_size(CONF.db_max_connections)
            .min_idle(Some(0))
            .idle_timeout(Some(CONF.db_idle_timeout))
            .build_unchecked(ConnectionManager::<PgConnection>::new(db_uri))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_falls_back_to_default() {
        assert_eq!(
            secs("PEERCODEX_JOBS_TEST_VAR_THAT_IS_NEVER_SET", 90),
            Duration::from_secs(90)
        );
        assert!(matches!(
            env_var::<u64>("PEERCODEX_JOBS_TEST_VAR_THAT_IS_NEVER_SET"),
            Err(ConfigError::MissingVar(_))
        ));
    }
}

use base64::engine::general_purpose::STANDARD as b64;
use base64::Engine;
use lettre::message::Mailbox;
use once_cell::sync::Lazy;
use std::cell::UnsafeCell;
use std::fmt;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;
use zeroize::{Zeroize, Zeroizing};

#[cfg(not(test))]
pub static CONF: Lazy<Config> = Lazy::new(|| Config::from_env().expect("Failed to load config"));

#[cfg(test)]
pub static CONF: Lazy<Config> = Lazy::new(Config::for_testing);

const DB_USERNAME_VAR: &str = "PEERCODEX_DB_USERNAME";
const DB_PASSWORD_VAR: &str = "PEERCODEX_DB_PASSWORD";
const DB_HOSTNAME_VAR: &str = "PEERCODEX_DB_HOSTNAME";
const DB_PORT_VAR: &str = "PEERCODEX_DB_PORT";
const DB_NAME_VAR: &str = "PEERCODEX_DB_NAME";
const DB_MAX_CONNECTIONS_VAR: &str = "PEERCODEX_DB_MAX_CONNECTIONS";
const DB_IDLE_TIMEOUT_SECS_VAR: &str = "PEERCODEX_DB_IDLE_TIMEOUT_SECS";

const HASHING_KEY_VAR: &str = "PEERCODEX_HASHING_KEY_B64";
const TOKEN_SIGNING_KEY_VAR: &str = "PEERCODEX_TOKEN_SIGNING_KEY_B64";

const HASH_LENGTH_VAR: &str = "PEERCODEX_HASH_LENGTH";
const HASH_ITERATIONS_VAR: &str = "PEERCODEX_HASH_ITERATIONS";
const HASH_MEM_COST_KIB_VAR: &str = "PEERCODEX_HASH_MEM_COST_KIB";
const HASH_THREADS_VAR: &str = "PEERCODEX_HASH_THREADS";
const HASH_SALT_LENGTH_VAR: &str = "PEERCODEX_HASH_SALT_LENGTH";

const EMAIL_ENABLED_VAR: &str = "PEERCODEX_EMAIL_ENABLED";
const EMAIL_FROM_ADDR: &str = "PEERCODEX_EMAIL_FROM_ADDR";
const EMAIL_REPLY_TO_ADDR: &str = "PEERCODEX_EMAIL_REPLY_TO_ADDR";
const SMTP_USERNAME_VAR: &str = "PEERCODEX_SMTP_USERNAME";
const SMTP_PASSWORD_VAR: &str = "PEERCODEX_SMTP_PASSWORD";
const SMTP_ADDRESS_VAR: &str = "PEERCODEX_SMTP_ADDRESS";
const SMTP_PORT_VAR: &str = "PEERCODEX_SMTP_PORT";
const MAX_SMTP_CONNECTIONS_VAR: &str = "PEERCODEX_MAX_SMTP_CONNECTIONS";
const SMTP_IDLE_TIMEOUT_SECS_VAR: &str = "PEERCODEX_SMTP_IDLE_TIMEOUT_SECS";

const USER_VERIFICATION_URL_VAR: &str = "PEERCODEX_USER_VERIFICATION_URL";

const ACCESS_TOKEN_LIFETIME_MINS_VAR: &str = "PEERCODEX_ACCESS_TOKEN_LIFETIME_MINS";
const REFRESH_TOKEN_LIFETIME_DAYS_VAR: &str = "PEERCODEX_REFRESH_TOKEN_LIFETIME_DAYS";
const USER_CREATION_TOKEN_LIFETIME_HOURS_VAR: &str =
    "PEERCODEX_USER_CREATION_TOKEN_LIFETIME_HOURS";
const OTP_LIFETIME_MINS_VAR: &str = "PEERCODEX_OTP_LIFETIME_MINS";

const ALLOWED_EMAIL_DOMAIN_VAR: &str = "PEERCODEX_ALLOWED_EMAIL_DOMAIN";
const ALLOWED_TEST_EMAILS_VAR: &str = "PEERCODEX_ALLOWED_TEST_EMAILS";

const HEALTH_ENDPOINT_KEY_VAR: &str = "PEERCODEX_HEALTH_ENDPOINT_KEY";
const ACTIX_WORKER_COUNT_VAR: &str = "PEERCODEX_ACTIX_WORKER_COUNT";
const LOG_LEVEL_VAR: &str = "PEERCODEX_LOG_LEVEL";

const HASHING_KEY_SIZE: usize = 32;
const TOKEN_SIGNING_KEY_SIZE: usize = 64;

const DEFAULT_ALLOWED_EMAIL_DOMAIN: &str = "@k12.friscoisd.org";

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

    pub hashing_key: [u8; HASHING_KEY_SIZE],
    pub token_signing_key: [u8; TOKEN_SIGNING_KEY_SIZE],

    pub hash_length: u32,
    pub hash_iterations: u32,
    pub hash_mem_cost_kib: u32,
    pub hash_threads: u32,
    pub hash_salt_length: u32,

    pub email_enabled: bool,
    #[zeroize(skip)]
    pub email_from_address: Mailbox,
    #[zeroize(skip)]
    pub email_reply_to_address: Mailbox,
    pub smtp_username: String,
    pub smtp_password: String,
    pub smtp_address: String,
    #[zeroize(skip)]
    pub smtp_port: u16,
    #[zeroize(skip)]
    pub max_smtp_connections: u32,
    #[zeroize(skip)]
    pub smtp_idle_timeout: Duration,

    #[zeroize(skip)]
    pub user_verification_url: String,

    #[zeroize(skip)]
    pub access_token_lifetime: Duration,
    #[zeroize(skip)]
    pub refresh_token_lifetime: Duration,
    #[zeroize(skip)]
    pub user_creation_token_lifetime: Duration,
    #[zeroize(skip)]
    pub otp_lifetime: Duration,

    #[zeroize(skip)]
    pub allowed_email_domain: String,
    #[zeroize(skip)]
    pub allowed_test_emails: Vec<String>,

    pub health_endpoint_key: String,

    #[zeroize(skip)]
    pub actix_worker_count: usize,
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
        let hashing_key = decode_key::<HASHING_KEY_SIZE>(HASHING_KEY_VAR)?;
        let token_signing_key = decode_key::<TOKEN_SIGNING_KEY_SIZE>(TOKEN_SIGNING_KEY_VAR)?;

        let email_from_address: Mailbox = env_var::<String>(EMAIL_FROM_ADDR)?
            .parse()
            .map_err(|_| ConfigError::invalid(EMAIL_FROM_ADDR))?;
        let email_reply_to_address: Mailbox = env_var::<String>(EMAIL_REPLY_TO_ADDR)?
            .parse()
            .map_err(|_| ConfigError::invalid(EMAIL_REPLY_TO_ADDR))?;

        let inner = ConfigInner {
            db_username: env_var(DB_USERNAME_VAR)?,
            db_password: env_var(DB_PASSWORD_VAR)?,
            db_hostname: env_var(DB_HOSTNAME_VAR)?,
            db_port: env_var(DB_PORT_VAR)?,
            db_name: env_var(DB_NAME_VAR)?,
            db_max_connections: env_var_or(DB_MAX_CONNECTIONS_VAR, 48),
            db_idle_timeout: Duration::from_secs(env_var_or(DB_IDLE_TIMEOUT_SECS_VAR, 30)),

            hashing_key,
            token_signing_key,

            hash_length: env_var(HASH_LENGTH_VAR)?,
            hash_iterations: env_var(HASH_ITERATIONS_VAR)?,
            hash_mem_cost_kib: env_var(HASH_MEM_COST_KIB_VAR)?,
            hash_threads: env_var(HASH_THREADS_VAR)?,
            hash_salt_length: env_var(HASH_SALT_LENGTH_VAR)?,

            email_enabled: env_var(EMAIL_ENABLED_VAR)?,
            email_from_address,
            email_reply_to_address,
            smtp_username: env_var_or(SMTP_USERNAME_VAR, String::new()),
            smtp_password: env_var_or(SMTP_PASSWORD_VAR, String::new()),
            smtp_address: env_var_or(SMTP_ADDRESS_VAR, String::new()),
            smtp_port: env_var_or(SMTP_PORT_VAR, 587),
            max_smtp_connections: env_var_or(MAX_SMTP_CONNECTIONS_VAR, 24),
            smtp_idle_timeout: Duration::from_secs(env_var_or(SMTP_IDLE_TIMEOUT_SECS_VAR, 60)),

            user_verification_url: env_var(USER_VERIFICATION_URL_VAR)?,

            access_token_lifetime: Duration::from_secs(
                env_var_or(ACCESS_TOKEN_LIFETIME_MINS_VAR, 15) * 60,
            ),
            refresh_token_lifetime: Duration::from_secs(
                env_var_or(REFRESH_TOKEN_LIFETIME_DAYS_VAR, 30) * 86400,
            ),
            user_creation_token_lifetime: Duration::from_secs(
                env_var_or(USER_CREATION_TOKEN_LIFETIME_HOURS_VAR, 24) * 3600,
            ),
            otp_lifetime: Duration::from_secs(env_var_or(OTP_LIFETIME_MINS_VAR, 15) * 60),

            allowed_email_domain: env_var_or(
                ALLOWED_EMAIL_DOMAIN_VAR,
                String::from(DEFAULT_ALLOWED_EMAIL_DOMAIN),
            ),
            allowed_test_emails: parse_list(&env_var_or(ALLOWED_TEST_EMAILS_VAR, String::new())),

            health_endpoint_key: env_var(HEALTH_ENDPOINT_KEY_VAR)?,

            actix_worker_count: env_var_or(ACTIX_WORKER_COUNT_VAR, num_cpus::get()),
            log_level: env_var_or(LOG_LEVEL_VAR, String::from("info")),
        };

        Ok(Config {
            inner: UnsafeCell::new(inner),
        })
    }

    /// Fixed keys and cheap hash parameters. Database settings are still read from the
    /// environment so tests can point at a local PostgreSQL instance.
    #[cfg(test)]
    pub fn for_testing() -> Config {
        let inner = ConfigInner {
            db_username: env_var_or(DB_USERNAME_VAR, String::from("postgres")),
            db_password: env_var_or(DB_PASSWORD_VAR, String::from("postgres")),
            db_hostname: env_var_or(DB_HOSTNAME_VAR, String::from("localhost")),
            db_port: env_var_or(DB_PORT_VAR, 5432),
            db_name: env_var_or(DB_NAME_VAR, String::from("peercodex_test")),
            db_max_connections: 8,
            db_idle_timeout: Duration::from_secs(30),

            hashing_key: [7; HASHING_KEY_SIZE],
            token_signing_key: [11; TOKEN_SIGNING_KEY_SIZE],

            hash_length: 32,
            hash_iterations: 2,
            hash_mem_cost_kib: 128,
            hash_threads: 1,
            hash_salt_length: 16,

            email_enabled: false,
            email_from_address: Mailbox::new(None, "noreply@peercodex.test".parse().unwrap()),
            email_reply_to_address: Mailbox::new(None, "support@peercodex.test".parse().unwrap()),
            smtp_username: String::new(),
            smtp_password: String::new(),
            smtp_address: String::new(),
            smtp_port: 587,
            max_smtp_connections: 1,
            smtp_idle_timeout: Duration::from_secs(60),

            user_verification_url: String::from("http://localhost:9000/api/user/verify"),

            access_token_lifetime: Duration::from_secs(15 * 60),
            refresh_token_lifetime: Duration::from_secs(30 * 86400),
            user_creation_token_lifetime: Duration::from_secs(24 * 3600),
            otp_lifetime: Duration::from_secs(15 * 60),

            allowed_email_domain: String::from(DEFAULT_ALLOWED_EMAIL_DOMAIN),
            allowed_test_emails: vec![String::from("tester@peercodex.test")],

            health_endpoint_key: String::from("test-health-key"),

            actix_worker_count: 1,
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

fn decode_key<const SIZE: usize>(key: &'static str) -> Result<[u8; SIZE], ConfigError> {
    let decoded = Zeroizing::new(
        b64.decode(env_var::<String>(key)?.as_bytes())
            .map_err(|_| ConfigError::invalid(key))?,
    );

    if decoded.len() < SIZE {
        return Err(ConfigError::invalid(key));
    }

    decoded[..SIZE]
        .try_into()
        .map_err(|_| ConfigError::invalid(key))
}

fn parse_list(var: &str) -> Vec<String> {
    var.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(String::from)
        .collect()
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

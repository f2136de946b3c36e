pub mod auth;
pub mod contact_message;
pub mod job_registry;
pub mod listing;
pub mod points;
pub mod request;
pub mod school_request;
pub mod user;

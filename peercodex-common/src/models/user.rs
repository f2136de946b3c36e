use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::users;

pub const ROLE_USER: &str = "user";
pub const ROLE_STUDENT: &str = "student";

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_verified: bool,

    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub role: String,
    pub onboarding_completed: bool,

    pub school: Option<String>,
    pub grade: Option<String>,
    pub phone_number: Option<String>,
    pub discord: Option<String>,
    pub mentor_subjects: Vec<String>,

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewUser<'a> {
    pub id: Uuid,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub is_verified: bool,

    pub first_name: &'a str,
    pub last_name: &'a str,
    pub date_of_birth: &'a str,
    pub role: &'a str,
    pub onboarding_completed: bool,

    pub mentor_subjects: &'a [String],

    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

/// Fields a user sets during onboarding and later edits on their profile.
#[derive(Clone, Debug, AsChangeset)]
#[diesel(table_name = users)]
#[diesel(treat_none_as_null = true)]
pub struct ProfileChanges<'a> {
    pub school: Option<&'a str>,
    pub grade: Option<&'a str>,
    pub phone_number: Option<&'a str>,
    pub discord: Option<&'a str>,
    pub mentor_subjects: &'a [String],
    pub modified_timestamp: SystemTime,
}

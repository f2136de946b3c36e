use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::school_requests;

pub const SCHOOL_ADD_REQUEST_TYPE: &str = "school_add";
pub const SCHOOL_REQUEST_PENDING: &str = "pending";

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = school_requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SchoolRequest {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub request_type: String,
    pub description: String,
    pub status: String,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = school_requests)]
pub struct NewSchoolRequest<'a> {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub request_type: &'a str,
    pub description: &'a str,
    pub status: &'a str,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

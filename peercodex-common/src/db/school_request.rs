use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::school_request::{
    NewSchoolRequest, SchoolRequest, SCHOOL_ADD_REQUEST_TYPE, SCHOOL_REQUEST_PENDING,
};
use crate::schema::school_requests as school_request_fields;
use crate::schema::school_requests::dsl::school_requests;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_school_add_request(
        &self,
        requester_id: Uuid,
        school_name: &str,
    ) -> Result<SchoolRequest, DaoError> {
        let now = SystemTime::now();
        let description = format!("Add {school_name}");

        let new_request = NewSchoolRequest {
            id: Uuid::now_v7(),
            requester_id,
            request_type: SCHOOL_ADD_REQUEST_TYPE,
            description: &description,
            status: SCHOOL_REQUEST_PENDING,
            created_timestamp: now,
            modified_timestamp: now,
        };

        Ok(dsl::insert_into(school_requests)
            .values(&new_request)
            .get_result::<SchoolRequest>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_school_requests_for_user(
        &self,
        requester_id: Uuid,
    ) -> Result<Vec<SchoolRequest>, DaoError> {
        Ok(school_requests
            .filter(school_request_fields::requester_id.eq(requester_id))
            .order(school_request_fields::created_timestamp.desc())
            .load::<SchoolRequest>(&mut self.db_thread_pool.get()?)?)
    }
}

use diesel::{dsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::contact_message::NewContactMessage;
use crate::schema::contact_messages::dsl::contact_messages;

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn save_contact_message(
        &self,
        name: &str,
        email: &str,
        message: &str,
    ) -> Result<Uuid, DaoError> {
        let message_id = Uuid::now_v7();

        let new_message = NewContactMessage {
            id: message_id,
            name,
            email,
            message,
            created_timestamp: SystemTime::now(),
        };

        dsl::insert_into(contact_messages)
            .values(&new_message)
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(message_id)
    }
}

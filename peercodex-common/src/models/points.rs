use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::{mentor_points, point_awards, point_balances};

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = point_balances, primary_key(user_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PointBalance {
    pub user_id: Uuid,
    pub month_tag: String,
    pub balance: i32,
}

#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = point_balances)]
pub struct NewPointBalance<'a> {
    pub user_id: Uuid,
    pub month_tag: &'a str,
    pub balance: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = mentor_points, primary_key(mentor_id, mentee_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct MentorPoints {
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub total: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = mentor_points)]
pub struct NewMentorPoints {
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub total: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = point_awards)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PointAward {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub amount: i32,
    pub awarded_timestamp: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = point_awards)]
pub struct NewPointAward {
    pub id: Uuid,
    pub mentor_id: Uuid,
    pub mentee_id: Uuid,
    pub amount: i32,
    pub awarded_timestamp: SystemTime,
}

use diesel::{dsl, ExpressionMethods, JoinOnDsl, OptionalExtension, QueryDsl, RunQueryDsl};
use std::collections::HashMap;
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::request::{NewRequest, Request, RequestStatus, StatusCounts};
use crate::schema::mentor_points as mentor_points_fields;
use crate::schema::mentor_points::dsl::mentor_points;
use crate::schema::requests as request_fields;
use crate::schema::requests::dsl::requests;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct SentRequest {
    pub request: Request,
    pub requestee_first_name: String,
    pub requestee_last_name: String,
}

pub struct ReceivedRequest {
    pub request: Request,
    pub requester_first_name: String,
    pub requester_last_name: String,
    pub points_received: i32,
}

pub struct RequestSummary {
    pub sent: StatusCounts,
    pub received: StatusCounts,
    pub total_points_received: i64,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    /// A second pending request between the same two users violates a unique index and fails
    /// with a `UniqueViolation`.
    pub fn create_request(
        &self,
        requester_id: Uuid,
        requestee_id: Uuid,
        message: &str,
    ) -> Result<Request, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let requestee_onboarded = users
                    .select(user_fields::onboarding_completed)
                    .find(requestee_id)
                    .get_result::<bool>(conn)?;

                if !requestee_onboarded {
                    return Err(DaoError::CannotRunQuery(
                        "Requestee has not completed onboarding",
                    ));
                }

                let now = SystemTime::now();
                let new_request = NewRequest {
                    id: Uuid::now_v7(),
                    requester_id,
                    requestee_id,
                    message,
                    status: RequestStatus::Pending.as_str(),
                    created_timestamp: now,
                    modified_timestamp: now,
                };

                Ok(dsl::insert_into(requests)
                    .values(&new_request)
                    .get_result::<Request>(conn)?)
            })
    }

    /// Moves a pending request to `target` on behalf of `user_id`. The request row is locked
    /// for the duration so two answers to the same request cannot both be applied.
    pub fn transition_request(
        &self,
        request_id: Uuid,
        user_id: Uuid,
        target: RequestStatus,
    ) -> Result<Request, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let request = requests
                    .find(request_id)
                    .for_update()
                    .get_result::<Request>(conn)?;

                // Users outside the request shouldn't learn that it exists
                let Some(actor) = request.actor(user_id) else {
                    return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
                };

                let current = request
                    .status()
                    .ok_or(DaoError::CannotRunQuery("Request has an unknown status"))?;

                let new_status = current
                    .transition(actor, target)
                    .map_err(DaoError::InvalidTransition)?;

                let (shared_phone_number, shared_discord) = if new_status
                    == RequestStatus::Accepted
                {
                    users
                        .select((user_fields::phone_number, user_fields::discord))
                        .find(request.requestee_id)
                        .get_result::<(Option<String>, Option<String>)>(conn)?
                } else {
                    (None, None)
                };

                let updated = diesel::update(
                    requests
                        .find(request_id)
                        .filter(request_fields::status.eq(RequestStatus::Pending.as_str())),
                )
                .set((
                    request_fields::status.eq(new_status.as_str()),
                    request_fields::shared_phone_number.eq(shared_phone_number),
                    request_fields::shared_discord.eq(shared_discord),
                    request_fields::modified_timestamp.eq(SystemTime::now()),
                ))
                .get_result::<Request>(conn)
                .optional()?;

                updated.ok_or(DaoError::OutOfDate)
            })
    }

    pub fn get_sent_requests(&self, requester_id: Uuid) -> Result<Vec<SentRequest>, DaoError> {
        let rows = requests
            .inner_join(users.on(user_fields::id.eq(request_fields::requestee_id)))
            .filter(request_fields::requester_id.eq(requester_id))
            .order(request_fields::created_timestamp.desc())
            .select((
                request_fields::all_columns,
                user_fields::first_name,
                user_fields::last_name,
            ))
            .load::<(Request, String, String)>(&mut self.db_thread_pool.get()?)?;

        Ok(rows
            .into_iter()
            .map(|(request, first_name, last_name)| SentRequest {
                request,
                requestee_first_name: first_name,
                requestee_last_name: last_name,
            })
            .collect())
    }

    pub fn get_received_requests(
        &self,
        requestee_id: Uuid,
    ) -> Result<Vec<ReceivedRequest>, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let rows = requests
            .inner_join(users.on(user_fields::id.eq(request_fields::requester_id)))
            .filter(request_fields::requestee_id.eq(requestee_id))
            .order(request_fields::created_timestamp.desc())
            .select((
                request_fields::all_columns,
                user_fields::first_name,
                user_fields::last_name,
            ))
            .load::<(Request, String, String)>(&mut db_connection)?;

        let points_by_mentee = mentor_points
            .select((mentor_points_fields::mentee_id, mentor_points_fields::total))
            .filter(mentor_points_fields::mentor_id.eq(requestee_id))
            .load::<(Uuid, i32)>(&mut db_connection)?
            .into_iter()
            .collect::<HashMap<_, _>>();

        Ok(rows
            .into_iter()
            .map(|(request, first_name, last_name)| {
                let points_received = points_by_mentee
                    .get(&request.requester_id)
                    .copied()
                    .unwrap_or(0);

                ReceivedRequest {
                    request,
                    requester_first_name: first_name,
                    requester_last_name: last_name,
                    points_received,
                }
            })
            .collect())
    }

    pub fn get_request_summary(&self, user_id: Uuid) -> Result<RequestSummary, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let sent_statuses = requests
            .select(request_fields::status)
            .filter(request_fields::requester_id.eq(user_id))
            .load::<String>(&mut db_connection)?;

        let received_statuses = requests
            .select(request_fields::status)
            .filter(request_fields::requestee_id.eq(user_id))
            .load::<String>(&mut db_connection)?;

        let total_points_received = mentor_points
            .select(dsl::sum(mentor_points_fields::total))
            .filter(mentor_points_fields::mentor_id.eq(user_id))
            .get_result::<Option<i64>>(&mut db_connection)?
            .unwrap_or(0);

        Ok(RequestSummary {
            sent: StatusCounts::tally(sent_statuses.iter().filter_map(|s| s.parse().ok())),
            received: StatusCounts::tally(
                received_statuses.iter().filter_map(|s| s.parse().ok()),
            ),
            total_points_received,
        })
    }
}

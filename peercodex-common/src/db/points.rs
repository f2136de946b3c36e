use diesel::pg::PgConnection;
use diesel::{dsl, ExpressionMethods, JoinOnDsl, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::points::{NewMentorPoints, NewPointAward, NewPointBalance, PointAward};
use crate::models::request::RequestStatus;
use crate::points::{self, MONTHLY_POINT_ALLOWANCE};
use crate::schema::mentor_points as mentor_points_fields;
use crate::schema::mentor_points::dsl::mentor_points;
use crate::schema::point_awards as point_award_fields;
use crate::schema::point_awards::dsl::point_awards;
use crate::schema::point_balances as point_balance_fields;
use crate::schema::point_balances::dsl::point_balances;
use crate::schema::requests as request_fields;
use crate::schema::requests::dsl::requests;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct MenteePoints {
    pub mentee_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub total: i32,
}

pub struct PointsReceived {
    pub total: i64,
    pub by_mentee: Vec<MenteePoints>,
    pub history: Vec<PointAward>,
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

    /// Returns the user's spendable balance, resetting it to the monthly allowance first if the
    /// stored balance belongs to an earlier month.
    pub fn get_balance(&self, user_id: Uuid) -> Result<i32, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let current_tag = points::current_month_tag();
                let (stored_tag, stored_balance) =
                    lock_balance_row(conn, user_id, &current_tag)?;

                if stored_tag == current_tag {
                    return Ok(stored_balance);
                }

                diesel::update(point_balances.find(user_id))
                    .set((
                        point_balance_fields::month_tag.eq(&current_tag),
                        point_balance_fields::balance.eq(MONTHLY_POINT_ALLOWANCE),
                    ))
                    .execute(conn)?;

                Ok(MONTHLY_POINT_ALLOWANCE)
            })
    }

    /// Moves `amount` points from the mentee's monthly balance to the mentor's running total
    /// and records the award. Returns the mentee's remaining balance.
    pub fn award_points(
        &self,
        mentee_id: Uuid,
        mentor_id: Uuid,
        amount: i32,
    ) -> Result<i32, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let has_accepted_request = dsl::select(dsl::exists(
                    requests
                        .filter(request_fields::requester_id.eq(mentee_id))
                        .filter(request_fields::requestee_id.eq(mentor_id))
                        .filter(request_fields::status.eq(RequestStatus::Accepted.as_str())),
                ))
                .get_result::<bool>(conn)?;

                if !has_accepted_request {
                    return Err(DaoError::NoAcceptedRequest);
                }

                let current_tag = points::current_month_tag();
                let (stored_tag, stored_balance) =
                    lock_balance_row(conn, mentee_id, &current_tag)?;

                let balance =
                    points::refreshed_balance(Some((&stored_tag, stored_balance)), &current_tag);
                let new_balance =
                    points::apply_award(amount, balance).map_err(DaoError::AwardRejected)?;

                diesel::update(point_balances.find(mentee_id))
                    .set((
                        point_balance_fields::month_tag.eq(&current_tag),
                        point_balance_fields::balance.eq(new_balance),
                    ))
                    .execute(conn)?;

                let new_mentor_points = NewMentorPoints {
                    mentor_id,
                    mentee_id,
                    total: amount,
                };

                dsl::insert_into(mentor_points)
                    .values(&new_mentor_points)
                    .on_conflict((
                        mentor_points_fields::mentor_id,
                        mentor_points_fields::mentee_id,
                    ))
                    .do_update()
                    .set(mentor_points_fields::total.eq(mentor_points_fields::total + amount))
                    .execute(conn)?;

                let award = NewPointAward {
                    id: Uuid::now_v7(),
                    mentor_id,
                    mentee_id,
                    amount,
                    awarded_timestamp: SystemTime::now(),
                };

                dsl::insert_into(point_awards)
                    .values(&award)
                    .execute(conn)?;

                Ok(new_balance)
            })
    }

    pub fn get_points_received(&self, mentor_id: Uuid) -> Result<PointsReceived, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        let by_mentee = mentor_points
            .inner_join(users.on(user_fields::id.eq(mentor_points_fields::mentee_id)))
            .filter(mentor_points_fields::mentor_id.eq(mentor_id))
            .order(mentor_points_fields::total.desc())
            .select((
                mentor_points_fields::mentee_id,
                user_fields::first_name,
                user_fields::last_name,
                mentor_points_fields::total,
            ))
            .load::<(Uuid, String, String, i32)>(&mut db_connection)?
            .into_iter()
            .map(|(mentee_id, first_name, last_name, total)| MenteePoints {
                mentee_id,
                first_name,
                last_name,
                total,
            })
            .collect::<Vec<_>>();

        let history = point_awards
            .filter(point_award_fields::mentor_id.eq(mentor_id))
            .order(point_award_fields::awarded_timestamp.desc())
            .load::<PointAward>(&mut db_connection)?;

        let total = by_mentee.iter().map(|m| i64::from(m.total)).sum();

        Ok(PointsReceived {
            total,
            by_mentee,
            history,
        })
    }
}

/// Makes sure the user has a balance row and locks it for the rest of the transaction.
/// Returns the stored month tag and balance.
fn lock_balance_row(
    conn: &mut PgConnection,
    user_id: Uuid,
    current_tag: &str,
) -> Result<(String, i32), DaoError> {
    let new_balance = NewPointBalance {
        user_id,
        month_tag: current_tag,
        balance: MONTHLY_POINT_ALLOWANCE,
    };

    dsl::insert_into(point_balances)
        .values(&new_balance)
        .on_conflict_do_nothing()
        .execute(conn)?;

    Ok(point_balances
        .select((
            point_balance_fields::month_tag,
            point_balance_fields::balance,
        ))
        .find(user_id)
        .for_update()
        .get_result::<(String, i32)>(conn)?)
}

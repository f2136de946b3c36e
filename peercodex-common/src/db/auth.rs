use diesel::{dsl, ExpressionMethods, OptionalExtension, QueryDsl, RunQueryDsl};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::auth::{NewBlacklistedToken, NewUserOtp};
use crate::otp::Otp;
use crate::schema::blacklisted_tokens as blacklisted_token_fields;
use crate::schema::blacklisted_tokens::dsl::blacklisted_tokens;
use crate::schema::user_otps as user_otp_fields;
use crate::schema::user_otps::dsl::user_otps;
use crate::schema::users as user_fields;
use crate::schema::users::dsl::users;

pub struct UserCredentials {
    pub user_id: Uuid,
    pub email: String,
    pub is_verified: bool,
    pub password_hash: String,
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

    pub fn get_user_credentials(&self, user_email: &str) -> Result<UserCredentials, DaoError> {
        let (user_id, email, is_verified, password_hash) = users
            .select((
                user_fields::id,
                user_fields::email,
                user_fields::is_verified,
                user_fields::password_hash,
            ))
            .filter(user_fields::email.eq(user_email.to_ascii_lowercase()))
            .get_result::<(Uuid, String, bool, String)>(&mut self.db_thread_pool.get()?)?;

        Ok(UserCredentials {
            user_id,
            email,
            is_verified,
            password_hash,
        })
    }

    pub fn blacklist_token(
        &self,
        token_signature: &[u8],
        token_expiration: u64,
    ) -> Result<(), DaoError> {
        let token_expiration = UNIX_EPOCH + Duration::from_secs(token_expiration);

        let blacklisted_token = NewBlacklistedToken {
            token_signature,
            token_expiration,
        };

        dsl::insert_into(blacklisted_tokens)
            .values(&blacklisted_token)
            .on_conflict_do_nothing()
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    /// Returns `true` if the token was already blacklisted. Otherwise, blacklists it and returns
    /// `false`.
    pub fn check_is_token_on_blacklist_and_blacklist(
        &self,
        token_signature: &[u8],
        token_expiration: u64,
    ) -> Result<bool, DaoError> {
        let token_expiration = UNIX_EPOCH + Duration::from_secs(token_expiration);

        let blacklisted_token = NewBlacklistedToken {
            token_signature,
            token_expiration,
        };

        // Zero inserted rows means another request already used this token
        let inserted_count = dsl::insert_into(blacklisted_tokens)
            .values(&blacklisted_token)
            .on_conflict_do_nothing()
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(inserted_count == 0)
    }

    pub fn clear_all_expired_tokens(&self) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            blacklisted_tokens
                .filter(blacklisted_token_fields::token_expiration.lt(SystemTime::now())),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }

    pub fn save_otp(
        &self,
        otp: &str,
        user_email: &str,
        expiration: SystemTime,
    ) -> Result<(), DaoError> {
        let new_otp = NewUserOtp {
            user_email,
            otp,
            expiration,
        };

        dsl::insert_into(user_otps)
            .values(&new_otp)
            .on_conflict(user_otp_fields::user_email)
            .do_update()
            .set((
                user_otp_fields::otp.eq(otp),
                user_otp_fields::expiration.eq(expiration),
            ))
            .execute(&mut self.db_thread_pool.get()?)?;

        Ok(())
    }

    pub fn delete_all_expired_otps(&self) -> Result<usize, DaoError> {
        Ok(
            dsl::delete(user_otps.filter(user_otp_fields::expiration.lt(SystemTime::now())))
                .execute(&mut self.db_thread_pool.get()?)?,
        )
    }

    /// Replaces the user's password hash if `otp` is the unexpired code saved for the email.
    /// The code is consumed on success. Returns `false` if the code doesn't check out.
    pub fn reset_password_with_otp(
        &self,
        user_email: &str,
        otp: &str,
        new_password_hash: &str,
    ) -> Result<bool, DaoError> {
        let mut db_connection = self.db_thread_pool.get()?;

        db_connection
            .build_transaction()
            .run::<_, DaoError, _>(|conn| {
                let saved_otp = user_otps
                    .select(user_otp_fields::otp)
                    .find(user_email)
                    .filter(user_otp_fields::expiration.gt(SystemTime::now()))
                    .for_update()
                    .get_result::<String>(conn)
                    .optional()?;

                let Some(saved_otp) = saved_otp else {
                    return Ok(false);
                };

                if !Otp::matches(otp, &saved_otp) {
                    return Ok(false);
                }

                let updated_count = diesel::update(users.filter(user_fields::email.eq(user_email)))
                    .set((
                        user_fields::password_hash.eq(new_password_hash),
                        user_fields::modified_timestamp.eq(SystemTime::now()),
                    ))
                    .execute(conn)?;

                diesel::delete(user_otps.find(user_email)).execute(conn)?;

                Ok(updated_count == 1)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::db::test_utils;
    use crate::threadrand::SecureRng;

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_delete_all_expired_otps() {
        let user = test_utils::create_onboarded_user(&["AP Biology"]);
        let dao = Dao::new(test_utils::db_pool());

        dao.save_otp("11112222", &user.email, SystemTime::now() - Duration::from_secs(1))
            .unwrap();
        assert!(dao.delete_all_expired_otps().unwrap() >= 1);

        // Expired codes never reset the password, whether or not they've been swept yet
        assert!(!dao
            .reset_password_with_otp(&user.email, "11112222", "new-hash")
            .unwrap());

        // Unexpired codes survive the sweep
        dao.save_otp("33334444", &user.email, SystemTime::now() + Duration::from_secs(60))
            .unwrap();
        dao.delete_all_expired_otps().unwrap();
        assert!(dao
            .reset_password_with_otp(&user.email, "33334444", "new-hash")
            .unwrap());

        test_utils::delete_user(user.id);
    }

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_reset_password_with_otp() {
        let user = test_utils::create_onboarded_user(&["AP Biology"]);
        let dao = Dao::new(test_utils::db_pool());

        dao.save_otp("24681357", &user.email, SystemTime::now() + Duration::from_secs(60))
            .unwrap();

        assert!(!dao
            .reset_password_with_otp(&user.email, "00000000", "new-hash")
            .unwrap());
        assert!(dao
            .reset_password_with_otp(&user.email, "24681357", "new-hash")
            .unwrap());

        // The code cannot be used twice
        assert!(!dao
            .reset_password_with_otp(&user.email, "24681357", "newer-hash")
            .unwrap());

        let credentials = dao.get_user_credentials(&user.email).unwrap();
        assert_eq!(credentials.password_hash, "new-hash");

        test_utils::delete_user(user.id);
    }

    #[test]
    #[ignore = "requires a running PostgreSQL database"]
    fn test_blacklist() {
        let dao = Dao::new(test_utils::db_pool());
        let signature = (0..32).map(|_| SecureRng::next_u8()).collect::<Vec<_>>();
        let expiration = (SystemTime::now() + Duration::from_secs(60))
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        assert!(!dao
            .check_is_token_on_blacklist_and_blacklist(&signature, expiration)
            .unwrap());
        assert!(dao
            .check_is_token_on_blacklist_and_blacklist(&signature, expiration)
            .unwrap());
    }
}

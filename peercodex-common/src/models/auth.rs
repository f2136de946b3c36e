use diesel::{Insertable, Queryable};
use std::time::SystemTime;

use crate::schema::{blacklisted_tokens, user_otps};

#[derive(Clone, Debug, Identifiable, Queryable)]
#[diesel(table_name = user_otps, primary_key(user_email))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserOtp {
    pub user_email: String,
    pub otp: String,
    pub expiration: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = user_otps)]
pub struct NewUserOtp<'a> {
    pub user_email: &'a str,
    pub otp: &'a str,
    pub expiration: SystemTime,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = blacklisted_tokens)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NewBlacklistedToken<'a> {
    pub token_signature: &'a [u8],
    pub token_expiration: SystemTime,
}

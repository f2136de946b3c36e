use peercodex_common::db::{self, DaoError, DbThreadPool};
use peercodex_common::email::EmailSender;
use peercodex_common::messages::{unix_secs, CredentialPair, EmailAddress, PasswordReset, TokenPair};
use peercodex_common::otp::Otp;
use peercodex_common::token::auth_token::{AuthToken, AuthTokenType, NewAuthTokenClaims};
use peercodex_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::SystemTime;
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::env;
use crate::handlers::error::{self, HttpErrorResponse};
use crate::handlers::verification::{self, MAX_PASSWORD_LENGTH};
use crate::middleware::auth::{Access, Refresh, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_OTP_LENGTH: usize = 32;

pub async fn sign_in(
    db_thread_pool: web::Data<DbThreadPool>,
    credentials: web::Json<CredentialPair>,
) -> Result<HttpResponse, HttpErrorResponse> {
    const WRONG_CREDENTIALS_MSG: &str = "Email or password was incorrect";

    let credentials = credentials.into_inner();

    if credentials.password.len() > MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Password cannot be longer than {MAX_PASSWORD_LENGTH} bytes"
        )));
    }

    let email = credentials.email.trim().to_ascii_lowercase();

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    let user_credentials = match web::block(move || auth_dao.get_user_credentials(&email)).await? {
        Ok(c) => c,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::IncorrectCredential(String::from(
                WRONG_CREDENTIALS_MSG,
            )));
        }
        Err(e) => return Err(error::internal(e, "Failed to get user credentials")),
    };

    let password_matches = verification::verify_password(
        Zeroizing::new(credentials.password),
        user_credentials.password_hash,
    )
    .await?;

    if !password_matches {
        return Err(HttpErrorResponse::IncorrectCredential(String::from(
            WRONG_CREDENTIALS_MSG,
        )));
    }

    if !user_credentials.is_verified {
        return Err(HttpErrorResponse::PendingAction(String::from(
            "Please verify your email before signing in",
        )));
    }

    let token_pair = new_token_pair(user_credentials.user_id, &user_credentials.email);
    Ok(HttpResponse::Ok().json(token_pair))
}

pub async fn refresh_tokens(
    db_thread_pool: web::Data<DbThreadPool>,
    refresh_token: VerifiedToken<Refresh, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let VerifiedToken {
        claims, signature, ..
    } = refresh_token;
    let expiration = claims.expiration;

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    match web::block(move || {
        auth_dao.check_is_token_on_blacklist_and_blacklist(&signature, expiration)
    })
    .await?
    {
        Ok(false) => (),
        Ok(true) => {
            return Err(HttpErrorResponse::BadToken(String::from(
                "Refresh token has already been used",
            )));
        }
        Err(e) => return Err(error::internal(e, "Error verifying token")),
    }

    let token_pair = new_token_pair(claims.user_id, &claims.user_email);
    Ok(HttpResponse::Ok().json(token_pair))
}

pub async fn logout(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    refresh_token: VerifiedToken<Refresh, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    if refresh_token.claims.user_id != user_access_token.claims.user_id {
        return Err(HttpErrorResponse::UserDisallowed(String::from(
            "Refresh token does not belong to user",
        )));
    }

    let expiration = refresh_token.claims.expiration;
    let signature = refresh_token.signature;

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    if let Err(e) = web::block(move || auth_dao.blacklist_token(&signature, expiration)).await? {
        return Err(error::internal(e, "Failed to blacklist token"));
    }

    Ok(HttpResponse::Ok().finish())
}

pub async fn request_password_reset(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<EmailSender>,
    email: web::Json<EmailAddress>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let email = email.into_inner().email.trim().to_ascii_lowercase();

    if let Validity::Invalid(msg) = validators::validate_email_address(&email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let email = Arc::new(email);
    let email_ref = Arc::clone(&email);

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    match web::block(move || auth_dao.get_user_credentials(&email_ref)).await? {
        Ok(_) => (),
        // Respond the same way whether or not the account exists
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Ok(HttpResponse::Ok().finish());
        }
        Err(e) => return Err(error::internal(e, "Failed to get user credentials")),
    }

    verification::generate_and_email_otp(&email, &db_thread_pool, &smtp_thread_pool).await?;

    Ok(HttpResponse::Ok().finish())
}

pub async fn reset_password(
    db_thread_pool: web::Data<DbThreadPool>,
    reset: web::Json<PasswordReset>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let reset = reset.into_inner();

    if reset.new_password.len() > MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Password cannot be longer than {MAX_PASSWORD_LENGTH} bytes"
        )));
    }

    if reset.otp.len() > MAX_OTP_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(String::from(
            "One-time passcode is too long",
        )));
    }

    if let Validity::Invalid(msg) =
        validators::validate_password(&reset.new_password, &reset.new_password_confirmation)
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let password_hash = verification::hash_password(Zeroizing::new(reset.new_password)).await?;

    let email = reset.email.trim().to_ascii_lowercase();
    let otp = Otp::normalize(&reset.otp);

    let auth_dao = db::auth::Dao::new(&db_thread_pool);
    match web::block(move || auth_dao.reset_password_with_otp(&email, &otp, &password_hash)).await?
    {
        Ok(true) => Ok(HttpResponse::Ok().finish()),
        Ok(false) => Err(HttpErrorResponse::IncorrectCredential(String::from(
            "One-time passcode is incorrect or has expired",
        ))),
        Err(e) => Err(error::internal(e, "Failed to reset password")),
    }
}

fn new_token_pair(user_id: Uuid, user_email: &str) -> TokenPair {
    let access_token = AuthToken::sign_new(
        NewAuthTokenClaims::expiring_in(
            user_id,
            user_email,
            AuthTokenType::Access,
            env::CONF.access_token_lifetime,
        ),
        &env::CONF.token_signing_key,
    );

    let refresh_token = AuthToken::sign_new(
        NewAuthTokenClaims::expiring_in(
            user_id,
            user_email,
            AuthTokenType::Refresh,
            env::CONF.refresh_token_lifetime,
        ),
        &env::CONF.token_signing_key,
    );

    TokenPair {
        access_token,
        refresh_token,
        server_time: unix_secs(SystemTime::now()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};
    use peercodex_common::messages::{ErrorType, ServerErrorResponse};
    use peercodex_common::token::{Token, TokenError};

    use crate::handlers::test_utils::{self, gen_token};

    #[test]
    fn test_new_token_pair() {
        let user_id = Uuid::now_v7();
        let pair = new_token_pair(user_id, "jdoe123@k12.friscoisd.org");

        let access = AuthToken::decode(&pair.access_token).unwrap();
        let claims = access.verify(&env::CONF.token_signing_key).unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.token_type, AuthTokenType::Access);

        let refresh = AuthToken::decode(&pair.refresh_token).unwrap();
        let claims = refresh.verify(&env::CONF.token_signing_key).unwrap();
        assert_eq!(claims.token_type, AuthTokenType::Refresh);
        assert!(claims.expiration > pair.server_time);

        assert!(matches!(
            refresh.verify(&[0; 64]),
            Err(TokenError::TokenInvalid)
        ));
    }

    #[actix_web::test]
    async fn test_token_routes_require_tokens() {
        let app = test_utils::init_app().await;

        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::TokenMissing);

        let req = TestRequest::post().uri("/api/auth/logout").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn test_reset_password_validates_before_db() {
        let app = test_utils::init_app().await;

        let req = TestRequest::post()
            .uri("/api/auth/password/reset")
            .set_json(PasswordReset {
                email: test_utils::unique_email(),
                otp: String::from("12345678"),
                new_password: String::from("hunter2hunter2"),
                new_password_confirmation: String::from("hunter3hunter3"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let req = TestRequest::post()
            .uri("/api/auth/password/reset_request")
            .set_json(EmailAddress {
                email: String::from("not an email"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_sign_in_refresh_and_logout() {
        let app = test_utils::init_app().await;
        let email = test_utils::unique_email();

        let password_hash = verification::hash_password(Zeroizing::new(String::from(
            "hunter2hunter2",
        )))
        .await
        .unwrap();

        let user_dao = db::user::Dao::new(&env::testing::DB_THREAD_POOL);
        let user_id = user_dao
            .create_user(&email, &password_hash, "Jane", "Doe", "2009-05-14")
            .unwrap();

        let credentials = CredentialPair {
            email: email.to_uppercase(),
            password: String::from("hunter2hunter2"),
        };

        let req = TestRequest::post()
            .uri("/api/auth/sign_in")
            .set_json(&credentials)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let resp_body: ServerErrorResponse = serde_json::from_slice(&resp_body).unwrap();
        assert_eq!(resp_body.err_type, ErrorType::PendingAction);

        user_dao.verify_user_creation(user_id).unwrap();

        let req = TestRequest::post()
            .uri("/api/auth/sign_in")
            .set_json(CredentialPair {
                email: email.clone(),
                password: String::from("hunter2hunter3"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = TestRequest::post()
            .uri("/api/auth/sign_in")
            .set_json(&credentials)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let token_pair: TokenPair = serde_json::from_slice(&resp_body).unwrap();

        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .insert_header(("RefreshToken", token_pair.refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let new_pair: TokenPair = serde_json::from_slice(&resp_body).unwrap();

        // Refresh tokens are single use
        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .insert_header(("RefreshToken", token_pair.refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let other_user = test_utils::create_user(&[]).0;
        let other_refresh_token = gen_token(&other_user, AuthTokenType::Refresh);

        let req = TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(("AccessToken", new_pair.access_token.as_str()))
            .insert_header(("RefreshToken", other_refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        let req = TestRequest::post()
            .uri("/api/auth/logout")
            .insert_header(("AccessToken", new_pair.access_token.as_str()))
            .insert_header(("RefreshToken", new_pair.refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/api/auth/token/refresh")
            .insert_header(("RefreshToken", new_pair.refresh_token.as_str()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        user_dao.delete_user(user_id).unwrap();
        user_dao.delete_user(other_user.id).unwrap();
    }

    #[actix_web::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_password_reset() {
        let app = test_utils::init_app().await;
        let (user, _) = test_utils::create_user(&[]);

        let req = TestRequest::post()
            .uri("/api/auth/password/reset_request")
            .set_json(EmailAddress {
                email: test_utils::unique_email(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/api/auth/password/reset_request")
            .set_json(EmailAddress {
                email: user.email.clone(),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let email = env::testing::MOCK_SENDER.last_sent_to(&user.email).unwrap();
        let code_start = email.html_body.find("<b>").unwrap() + 3;
        let code_end = code_start + email.html_body[code_start..].find("</b>").unwrap();
        let displayed_code = &email.html_body[code_start..code_end];
        assert_eq!(displayed_code.replace(' ', "").len(), 8);

        let mut reset = PasswordReset {
            email: user.email.clone(),
            otp: String::from("0000000"),
            new_password: String::from("a brand new password"),
            new_password_confirmation: String::from("a brand new password"),
        };

        let req = TestRequest::post()
            .uri("/api/auth/password/reset")
            .set_json(&reset)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        // Codes are accepted as displayed in the email, spaces included
        reset.otp = format!(" {displayed_code} ");
        let req = TestRequest::post()
            .uri("/api/auth/password/reset")
            .set_json(&reset)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = TestRequest::post()
            .uri("/api/auth/sign_in")
            .set_json(CredentialPair {
                email: user.email.clone(),
                password: String::from("a brand new password"),
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // The code is consumed
        let req = TestRequest::post()
            .uri("/api/auth/password/reset")
            .set_json(&reset)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        db::user::Dao::new(&env::testing::DB_THREAD_POOL)
            .delete_user(user.id)
            .unwrap();
    }
}

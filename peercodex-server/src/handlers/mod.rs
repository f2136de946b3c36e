pub mod auth;
pub mod contact;
pub mod health;
pub mod listing;
pub mod mentor;
pub mod points;
pub mod reference;
pub mod request;
pub mod school_request;
pub mod user;

pub mod verification {
    use actix_web::web;
    use peercodex_common::db::{self, DbThreadPool};
    use peercodex_common::email::templates::{PasswordResetOtpMessage, VerificationLinkMessage};
    use peercodex_common::email::{EmailMessage, EmailSender};
    use peercodex_common::otp::Otp;
    use peercodex_common::token::auth_token::{AuthToken, AuthTokenType, NewAuthTokenClaims};
    use std::str::FromStr;
    use std::time::SystemTime;
    use tokio::sync::oneshot;
    use uuid::Uuid;
    use zeroize::Zeroizing;

    use super::error::HttpErrorResponse;
    use crate::env;

    pub const MAX_PASSWORD_LENGTH: usize = 512;

    pub async fn hash_password(password: Zeroizing<String>) -> Result<String, HttpErrorResponse> {
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let hash_result = argon2_kdf::Hasher::default()
                .algorithm(argon2_kdf::Algorithm::Argon2id)
                .salt_length(env::CONF.hash_salt_length)
                .hash_length(env::CONF.hash_length)
                .iterations(env::CONF.hash_iterations)
                .memory_cost_kib(env::CONF.hash_mem_cost_kib)
                .threads(env::CONF.hash_threads)
                .secret(argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key))
                .hash(password.as_bytes());

            // The receiver is only gone if the request was dropped
            let _ = sender.send(hash_result);
        });

        match receiver.await? {
            Ok(hash) => Ok(hash.to_string()),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to hash password",
                )))
            }
        }
    }

    pub async fn verify_password(
        password: Zeroizing<String>,
        password_hash: String,
    ) -> Result<bool, HttpErrorResponse> {
        let (sender, receiver) = oneshot::channel();

        rayon::spawn(move || {
            let result = argon2_kdf::Hash::from_str(&password_hash).map(|hash| {
                hash.verify_with_secret(
                    password.as_bytes(),
                    argon2_kdf::Secret::using_bytes(&env::CONF.hashing_key),
                )
            });

            let _ = sender.send(result);
        });

        match receiver.await? {
            Ok(matches) => Ok(matches),
            Err(e) => {
                log::error!("{e}");
                Err(HttpErrorResponse::InternalError(String::from(
                    "Failed to validate password",
                )))
            }
        }
    }

    pub async fn send_verification_email(
        user_id: Uuid,
        user_email: &str,
        first_name: &str,
        smtp_thread_pool: &EmailSender,
    ) -> Result<(), HttpErrorResponse> {
        let user_creation_token = AuthToken::sign_new(
            NewAuthTokenClaims::expiring_in(
                user_id,
                user_email,
                AuthTokenType::UserCreation,
                env::CONF.user_creation_token_lifetime,
            ),
            &env::CONF.token_signing_key,
        );

        let message = EmailMessage {
            to: String::from(user_email),
            subject: "Verify your PeerCodex account",
            html_body: VerificationLinkMessage::generate(
                &env::CONF.user_verification_url,
                &user_creation_token,
                env::CONF.user_creation_token_lifetime,
                first_name,
            ),
        };

        if let Err(e) = smtp_thread_pool.send(message).await {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to send user verification link to user's email address",
            )));
        }

        Ok(())
    }

    pub async fn generate_and_email_otp(
        user_email: &str,
        db_thread_pool: &DbThreadPool,
        smtp_thread_pool: &EmailSender,
    ) -> Result<(), HttpErrorResponse> {
        let otp_expiration = SystemTime::now() + env::CONF.otp_lifetime;

        let user_email_copy = String::from(user_email);

        let otp = Otp::for_password_reset();
        let otp_copy = String::from(otp.as_str());

        let auth_dao = db::auth::Dao::new(db_thread_pool);
        if let Err(e) =
            web::block(move || auth_dao.save_otp(&otp_copy, &user_email_copy, otp_expiration))
                .await?
        {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to save OTP",
            )));
        }

        let message = EmailMessage {
            to: String::from(user_email),
            subject: "Your PeerCodex password reset code",
            html_body: {
                let (first_group, second_group) = otp.display_groups();
                PasswordResetOtpMessage::generate(
                    first_group,
                    second_group,
                    env::CONF.otp_lifetime,
                )
            },
        };

        if let Err(e) = smtp_thread_pool.send(message).await {
            log::error!("{e}");
            return Err(HttpErrorResponse::InternalError(String::from(
                "Failed to send OTP to user's email address",
            )));
        }

        Ok(())
    }

}

pub mod error {
    use peercodex_common::db::DaoError;
    use peercodex_common::messages::{ErrorType, ServerErrorResponse};
    use peercodex_common::token::TokenError;

    use actix_web::http::StatusCode;
    use actix_web::HttpResponse;
    use std::fmt;
    use tokio::sync::oneshot;

    #[derive(Debug)]
    pub enum DoesNotExistType {
        User,
        Request,
        Listing,
    }

    #[derive(Debug)]
    pub enum HttpErrorResponse {
        // 400
        IncorrectlyFormed(String),
        InvalidMessage(String),
        OutOfDate(String),
        InvalidState(String),
        MissingHeader(String),
        ConflictWithExisting(String),

        // 401
        IncorrectCredential(String),
        BadToken(String),
        TokenExpired(String),
        TokenMissing(String),
        WrongTokenType(String),

        // 403
        UserDisallowed(String),
        PendingAction(String),
        NotEnoughPoints(String),

        // 404
        DoesNotExist(String, DoesNotExistType),

        // 413
        InputTooLarge(String),

        // 429
        TooManyRequests(String),

        // 500
        InternalError(String),
    }

    impl std::error::Error for HttpErrorResponse {}

    impl fmt::Display for HttpErrorResponse {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            let server_error: ServerErrorResponse = self.into();
            write!(f, "{:?}", server_error)
        }
    }

    impl From<HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: HttpErrorResponse) -> Self {
            (&resp).into()
        }
    }

    impl From<&HttpErrorResponse> for ServerErrorResponse {
        fn from(resp: &HttpErrorResponse) -> Self {
            match resp {
                // 400
                HttpErrorResponse::IncorrectlyFormed(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectlyFormed,
                    err_message: format!("Incorrectly formed request: {msg}"),
                },
                HttpErrorResponse::InvalidMessage(msg) => ServerErrorResponse {
                    err_type: ErrorType::InvalidMessage,
                    err_message: format!("Invalid message: {msg}"),
                },
                HttpErrorResponse::OutOfDate(msg) => ServerErrorResponse {
                    err_type: ErrorType::OutOfDate,
                    err_message: format!("Out of date: {msg}"),
                },
                HttpErrorResponse::InvalidState(msg) => ServerErrorResponse {
                    err_type: ErrorType::InvalidState,
                    err_message: format!("Invalid state: {msg}"),
                },
                HttpErrorResponse::MissingHeader(msg) => ServerErrorResponse {
                    err_type: ErrorType::MissingHeader,
                    err_message: format!("Missing header: {msg}"),
                },
                HttpErrorResponse::ConflictWithExisting(msg) => ServerErrorResponse {
                    err_type: ErrorType::ConflictWithExisting,
                    err_message: format!("Conflict with existing data: {msg}"),
                },

                // 401
                HttpErrorResponse::IncorrectCredential(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectCredential,
                    err_message: format!("Incorrect credential: {msg}"),
                },
                HttpErrorResponse::BadToken(msg) => ServerErrorResponse {
                    err_type: ErrorType::IncorrectCredential,
                    err_message: format!("Bad token: {msg}"),
                },
                HttpErrorResponse::TokenExpired(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenExpired,
                    err_message: format!("Token expired: {msg}"),
                },
                HttpErrorResponse::TokenMissing(msg) => ServerErrorResponse {
                    err_type: ErrorType::TokenMissing,
                    err_message: format!("Token missing: {msg}"),
                },
                HttpErrorResponse::WrongTokenType(msg) => ServerErrorResponse {
                    err_type: ErrorType::WrongTokenType,
                    err_message: format!("Wrong token type: {msg}"),
                },

                // 403
                HttpErrorResponse::UserDisallowed(msg) => ServerErrorResponse {
                    err_type: ErrorType::UserDisallowed,
                    err_message: format!("User disallowed: {msg}"),
                },
                HttpErrorResponse::PendingAction(msg) => ServerErrorResponse {
                    err_type: ErrorType::PendingAction,
                    err_message: format!("Pending user action: {msg}"),
                },
                HttpErrorResponse::NotEnoughPoints(msg) => ServerErrorResponse {
                    err_type: ErrorType::NotEnoughPoints,
                    err_message: msg.clone(),
                },

                // 404
                HttpErrorResponse::DoesNotExist(msg, dne_type) => ServerErrorResponse {
                    err_type: match dne_type {
                        DoesNotExistType::User => ErrorType::UserDoesNotExist,
                        DoesNotExistType::Request => ErrorType::RequestDoesNotExist,
                        DoesNotExistType::Listing => ErrorType::ListingDoesNotExist,
                    },
                    err_message: format!("Does not exist: {msg}"),
                },

                // 413
                HttpErrorResponse::InputTooLarge(msg) => ServerErrorResponse {
                    err_type: ErrorType::InputTooLarge,
                    err_message: format!("Input is too long: {msg}"),
                },

                // 429
                HttpErrorResponse::TooManyRequests(msg) => ServerErrorResponse {
                    err_type: ErrorType::TooManyRequests,
                    err_message: format!("Too many requests: {msg}"),
                },

                // 500
                HttpErrorResponse::InternalError(msg) => ServerErrorResponse {
                    err_type: ErrorType::InternalError,
                    err_message: format!("Internal error: {msg}"),
                },
            }
        }
    }

    impl actix_web::error::ResponseError for HttpErrorResponse {
        fn error_response(&self) -> HttpResponse {
            HttpResponse::build(self.status_code()).json(ServerErrorResponse::from(self))
        }

        fn status_code(&self) -> StatusCode {
            match *self {
                HttpErrorResponse::IncorrectlyFormed(_)
                | HttpErrorResponse::InvalidMessage(_)
                | HttpErrorResponse::OutOfDate(_)
                | HttpErrorResponse::InvalidState(_)
                | HttpErrorResponse::MissingHeader(_)
                | HttpErrorResponse::ConflictWithExisting(_) => StatusCode::BAD_REQUEST,
                HttpErrorResponse::IncorrectCredential(_)
                | HttpErrorResponse::BadToken(_)
                | HttpErrorResponse::TokenExpired(_)
                | HttpErrorResponse::TokenMissing(_)
                | HttpErrorResponse::WrongTokenType(_) => StatusCode::UNAUTHORIZED,
                HttpErrorResponse::UserDisallowed(_)
                | HttpErrorResponse::PendingAction(_)
                | HttpErrorResponse::NotEnoughPoints(_) => StatusCode::FORBIDDEN,
                HttpErrorResponse::DoesNotExist(_, _) => StatusCode::NOT_FOUND,
                HttpErrorResponse::InputTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
                HttpErrorResponse::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
                HttpErrorResponse::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl From<actix_web::error::BlockingError> for HttpErrorResponse {
        fn from(_err: actix_web::error::BlockingError) -> Self {
            HttpErrorResponse::InternalError(String::from("Actix thread pool failure"))
        }
    }

    impl From<oneshot::error::RecvError> for HttpErrorResponse {
        fn from(_err: oneshot::error::RecvError) -> Self {
            HttpErrorResponse::InternalError(String::from("Rayon thread pool failure"))
        }
    }

    impl From<TokenError> for HttpErrorResponse {
        fn from(err: TokenError) -> Self {
            match err {
                TokenError::TokenInvalid => {
                    HttpErrorResponse::BadToken(String::from("Invalid token"))
                }
                TokenError::TokenExpired => {
                    HttpErrorResponse::TokenExpired(String::from("Token expired"))
                }
                TokenError::TokenMissing => {
                    HttpErrorResponse::TokenMissing(String::from("Missing token"))
                }
                TokenError::WrongTokenType => {
                    HttpErrorResponse::WrongTokenType(String::from("Wrong token type"))
                }
            }
        }
    }

    /// Logs an unexpected DAO failure and hides its details from the client.
    pub fn internal(e: DaoError, msg: &str) -> HttpErrorResponse {
        log::error!("{e}");
        HttpErrorResponse::InternalError(String::from(msg))
    }

    pub fn is_unique_violation(e: &DaoError) -> bool {
        matches!(
            e,
            DaoError::QueryFailure(diesel::result::Error::DatabaseError(
                diesel::result::DatabaseErrorKind::UniqueViolation,
                _,
            ))
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        use actix_web::body::to_bytes;
        use actix_web::ResponseError;

        #[test]
        fn test_status_codes() {
            let cases = [
                (
                    HttpErrorResponse::ConflictWithExisting(String::new()),
                    StatusCode::BAD_REQUEST,
                ),
                (HttpErrorResponse::OutOfDate(String::new()), StatusCode::BAD_REQUEST),
                (
                    HttpErrorResponse::IncorrectCredential(String::new()),
                    StatusCode::UNAUTHORIZED,
                ),
                (HttpErrorResponse::BadToken(String::new()), StatusCode::UNAUTHORIZED),
                (HttpErrorResponse::PendingAction(String::new()), StatusCode::FORBIDDEN),
                (HttpErrorResponse::NotEnoughPoints(String::new()), StatusCode::FORBIDDEN),
                (
                    HttpErrorResponse::DoesNotExist(String::new(), DoesNotExistType::Listing),
                    StatusCode::NOT_FOUND,
                ),
                (
                    HttpErrorResponse::InputTooLarge(String::new()),
                    StatusCode::PAYLOAD_TOO_LARGE,
                ),
                (
                    HttpErrorResponse::TooManyRequests(String::new()),
                    StatusCode::TOO_MANY_REQUESTS,
                ),
                (
                    HttpErrorResponse::InternalError(String::new()),
                    StatusCode::INTERNAL_SERVER_ERROR,
                ),
            ];

            for (resp, status) in cases {
                assert_eq!(resp.status_code(), status, "{resp:?}");
            }
        }

        #[actix_web::test]
        async fn test_error_body_is_json() {
            let resp = HttpErrorResponse::NotEnoughPoints(String::from("Not enough points!"))
                .error_response();

            assert_eq!(resp.status(), StatusCode::FORBIDDEN);

            let body = to_bytes(resp.into_body()).await.unwrap();
            let body: ServerErrorResponse = serde_json::from_slice(&body).unwrap();

            assert_eq!(body.err_type, ErrorType::NotEnoughPoints);
            assert_eq!(body.err_message, "Not enough points!");

            let resp = HttpErrorResponse::DoesNotExist(
                String::from("No request with the given ID"),
                DoesNotExistType::Request,
            )
            .error_response();

            let body = to_bytes(resp.into_body()).await.unwrap();
            let body: ServerErrorResponse = serde_json::from_slice(&body).unwrap();

            assert_eq!(body.err_type, ErrorType::RequestDoesNotExist);
            assert_eq!(body.err_message, "Does not exist: No request with the given ID");
        }

        #[test]
        fn test_token_errors() {
            assert!(matches!(
                HttpErrorResponse::from(TokenError::TokenExpired),
                HttpErrorResponse::TokenExpired(_)
            ));
            assert!(matches!(
                HttpErrorResponse::from(TokenError::TokenInvalid),
                HttpErrorResponse::BadToken(_)
            ));
        }

        #[test]
        fn test_is_unique_violation() {
            assert!(!is_unique_violation(&DaoError::OutOfDate));
            assert!(!is_unique_violation(&DaoError::QueryFailure(
                diesel::result::Error::NotFound
            )));
        }
    }
}

use peercodex_common::token::auth_token::{AuthToken, AuthTokenClaims, AuthTokenType};
use peercodex_common::token::{DecodedToken, Token, TokenError};

use actix_web::dev::Payload;
use actix_web::{FromRequest, HttpRequest};
use futures::future;
use std::marker::PhantomData;

use crate::env;
use crate::handlers::error::HttpErrorResponse;
use crate::middleware::{into_actix_error_res, TokenLocation};

pub trait RequestAuthTokenType {
    fn token_name() -> &'static str;
    fn token_type() -> AuthTokenType;
}

pub struct Access {}
pub struct Refresh {}
pub struct UserCreation {}

impl RequestAuthTokenType for Access {
    fn token_name() -> &'static str {
        "AccessToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Access
    }
}

impl RequestAuthTokenType for Refresh {
    fn token_name() -> &'static str {
        "RefreshToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::Refresh
    }
}

impl RequestAuthTokenType for UserCreation {
    fn token_name() -> &'static str {
        "UserCreationToken"
    }
    fn token_type() -> AuthTokenType {
        AuthTokenType::UserCreation
    }
}

type AuthDecodedToken = DecodedToken<<AuthToken as Token>::Claims>;

/// A decoded token whose signature, type, and expiration have not been checked. Handlers that
/// need to respond to each failure differently (such as the verification link page) use this.
#[derive(Debug)]
pub struct UnverifiedToken<T: RequestAuthTokenType, L: TokenLocation> {
    pub decoded: AuthDecodedToken,
    _marker: PhantomData<(T, L)>,
}

impl<T, L> UnverifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    pub fn verify(&self) -> Result<AuthTokenClaims, TokenError> {
        verify_token(&self.decoded, T::token_type())
    }
}

impl<T, L> FromRequest for UnverifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        match into_actix_error_res(get_and_decode_token::<T, L>(req)) {
            Ok(decoded) => future::ok(UnverifiedToken {
                decoded,
                _marker: PhantomData,
            }),
            Err(e) => future::err(e),
        }
    }
}

#[derive(Debug)]
pub struct VerifiedToken<T: RequestAuthTokenType, L: TokenLocation> {
    pub claims: AuthTokenClaims,
    /// Identifies the token when it gets blacklisted
    pub signature: Vec<u8>,
    _marker: PhantomData<(T, L)>,
}

impl<T, L> FromRequest for VerifiedToken<T, L>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    type Error = HttpErrorResponse;
    type Future = future::Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let decoded_token = match into_actix_error_res(get_and_decode_token::<T, L>(req)) {
            Ok(t) => t,
            Err(e) => return future::err(e),
        };

        let claims = match into_actix_error_res(verify_token(&decoded_token, T::token_type())) {
            Ok(c) => c,
            Err(e) => return future::err(e),
        };

        future::ok(VerifiedToken {
            claims,
            signature: decoded_token.signature,
            _marker: PhantomData,
        })
    }
}

#[inline]
fn get_and_decode_token<T, L>(req: &HttpRequest) -> Result<AuthDecodedToken, TokenError>
where
    T: RequestAuthTokenType,
    L: TokenLocation,
{
    let token = match L::get_from_request(req, T::token_name()) {
        Some(t) => t,
        None => return Err(TokenError::TokenMissing),
    };

    AuthToken::decode(token)
}

#[inline]
fn verify_token(
    decoded_token: &AuthDecodedToken,
    expected_type: AuthTokenType,
) -> Result<AuthTokenClaims, TokenError> {
    let claims = decoded_token.verify(&env::CONF.token_signing_key)?;

    if claims.token_type != expected_type {
        return Err(TokenError::WrongTokenType);
    }

    Ok(claims.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::dev::Payload;
    use actix_web::test::TestRequest;
    use std::time::{Duration, SystemTime, UNIX_EPOCH};
    use uuid::Uuid;

    use peercodex_common::token::auth_token::NewAuthTokenClaims;

    use crate::middleware::{FromHeader, FromQuery};

    fn sign(token_type: AuthTokenType, lifetime_secs: i64) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_secs();

        let claims = NewAuthTokenClaims {
            user_id: Uuid::now_v7(),
            user_email: "jdoe123@k12.friscoisd.org",
            expiration: now.checked_add_signed(lifetime_secs).unwrap(),
            token_type,
        };

        AuthToken::sign_new(claims, &env::CONF.token_signing_key)
    }

    #[actix_web::test]
    async fn test_verified_from_header() {
        let token = sign(AuthTokenType::Access, 10);

        let req = TestRequest::default()
            .insert_header(("AccessToken", token.as_str()))
            .to_http_request();

        let verified =
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();
        assert_eq!(verified.claims.user_email, "jdoe123@k12.friscoisd.org");
        assert_eq!(verified.signature.len(), 32);

        assert!(
            VerifiedToken::<Access, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
        assert!(matches!(
            VerifiedToken::<Refresh, FromHeader>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::TokenMissing(_))
        ));

        // A refresh token sent in the access token header
        let token = sign(AuthTokenType::Refresh, 10);
        let req = TestRequest::default()
            .insert_header(("AccessToken", token.as_str()))
            .to_http_request();

        assert!(matches!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::WrongTokenType(_))
        ));

        let token = sign(AuthTokenType::Access, -10);
        let req = TestRequest::default()
            .insert_header(("AccessToken", token.as_str()))
            .to_http_request();

        assert!(matches!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::TokenExpired(_))
        ));

        let req = TestRequest::default()
            .insert_header(("AccessToken", "garbage"))
            .to_http_request();

        assert!(matches!(
            VerifiedToken::<Access, FromHeader>::from_request(&req, &mut Payload::None).await,
            Err(HttpErrorResponse::BadToken(_))
        ));
    }

    #[actix_web::test]
    async fn test_verified_from_query() {
        let token = sign(AuthTokenType::UserCreation, 10);

        let req = TestRequest::default()
            .uri(&format!("/verify?UserCreationToken={}", &token))
            .to_http_request();

        assert!(
            VerifiedToken::<UserCreation, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_ok()
        );
        assert!(
            VerifiedToken::<UserCreation, FromHeader>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
        assert!(
            VerifiedToken::<Access, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }

    #[actix_web::test]
    async fn test_unverified_defers_checks() {
        let token = sign(AuthTokenType::UserCreation, -10);

        let req = TestRequest::default()
            .uri(&format!("/verify?UserCreationToken={}", &token))
            .to_http_request();

        let unverified =
            UnverifiedToken::<UserCreation, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();

        assert!(matches!(unverified.verify(), Err(TokenError::TokenExpired)));

        let token = sign(AuthTokenType::Access, 10);
        let req = TestRequest::default()
            .uri(&format!("/verify?UserCreationToken={}", &token))
            .to_http_request();

        let unverified =
            UnverifiedToken::<UserCreation, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .unwrap();

        assert!(matches!(unverified.verify(), Err(TokenError::WrongTokenType)));

        let req = TestRequest::default().uri("/verify").to_http_request();
        assert!(
            UnverifiedToken::<UserCreation, FromQuery>::from_request(&req, &mut Payload::None)
                .await
                .is_err()
        );
    }
}

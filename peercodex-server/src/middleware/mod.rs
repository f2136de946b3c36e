pub mod auth;

mod limiter;

pub use limiter::Limiter;

use peercodex_common::token::TokenError;

use actix_web::HttpRequest;

use crate::handlers::error::HttpErrorResponse;

pub trait TokenLocation {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str>;
}

pub struct FromQuery {}
pub struct FromHeader {}

impl TokenLocation for FromQuery {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str> {
        req.query_string().split('&').find_map(|pair| {
            let value = pair.strip_prefix(key)?.strip_prefix('=')?;

            if value.is_empty() {
                None
            } else {
                Some(value)
            }
        })
    }
}

impl TokenLocation for FromHeader {
    fn get_from_request<'a>(req: &'a HttpRequest, key: &str) -> Option<&'a str> {
        let header = req.headers().get(key)?;
        header.to_str().ok()
    }
}

#[inline(always)]
fn into_actix_error_res<T>(result: Result<T, TokenError>) -> Result<T, HttpErrorResponse> {
    match result {
        Ok(t) => Ok(t),
        Err(TokenError::TokenInvalid) => Err(HttpErrorResponse::BadToken(String::from(
            "Token is invalid",
        ))),
        Err(TokenError::TokenExpired) => Err(HttpErrorResponse::TokenExpired(String::from(
            "Token is expired",
        ))),
        Err(TokenError::TokenMissing) => Err(HttpErrorResponse::TokenMissing(String::from(
            "Token is missing",
        ))),
        Err(TokenError::WrongTokenType) => Err(HttpErrorResponse::WrongTokenType(String::from(
            "Incorrect token type",
        ))),
    }
}

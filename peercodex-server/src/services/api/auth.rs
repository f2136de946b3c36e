use actix_web::web::*;

use crate::handlers::auth;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/auth")
            .service(
                resource("/sign_in")
                    .route(post().to(auth::sign_in).wrap(limiters.password.clone())),
            )
            .service(
                resource("/token/refresh")
                    .route(post().to(auth::refresh_tokens).wrap(limiters.refresh_tokens)),
            )
            .service(resource("/logout").route(post().to(auth::logout)))
            .service(
                resource("/password/reset_request")
                    .route(post().to(auth::request_password_reset).wrap(limiters.email)),
            )
            .service(
                resource("/password/reset")
                    .route(post().to(auth::reset_password).wrap(limiters.password)),
            ),
    );
}

use actix_web::web::*;

use crate::handlers::user;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(
        scope("/user")
            .service(
                resource("")
                    .route(post().to(user::create).wrap(limiters.create_user))
                    .route(get().to(user::get_profile)),
            )
            .service(resource("/verify").route(get().to(user::verify_creation)))
            .service(
                resource("/verify/resend")
                    .route(post().to(user::resend_verification).wrap(limiters.email)),
            )
            .service(resource("/onboarding").route(put().to(user::complete_onboarding)))
            .service(resource("/profile").route(put().to(user::update_profile))),
    );
}

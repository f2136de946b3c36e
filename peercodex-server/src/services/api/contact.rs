use actix_web::web::*;

use crate::handlers::contact;

use super::RouteLimiters;

pub fn configure(cfg: &mut ServiceConfig, limiters: RouteLimiters) {
    cfg.service(resource("/contact").route(post().to(contact::submit).wrap(limiters.contact)));
}

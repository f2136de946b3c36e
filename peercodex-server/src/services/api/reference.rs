use actix_web::web::*;

use crate::handlers::reference;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(resource("/reference").route(get().to(reference::get)));
}

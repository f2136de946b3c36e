use peercodex_common::db::{self, DbThreadPool};
use peercodex_common::messages::NewContactMessage;
use peercodex_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};

use crate::handlers::error::{self, HttpErrorResponse};

const MAX_NAME_LENGTH: usize = 200;
const MAX_MESSAGE_LENGTH: usize = 5000;

pub async fn submit(
    db_thread_pool: web::Data<DbThreadPool>,
    contact_message: web::Json<NewContactMessage>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let contact_message = contact_message.into_inner();

    let name = String::from(contact_message.name.trim());
    let email = String::from(contact_message.email.trim());
    let message = String::from(contact_message.message.trim());

    if name.is_empty() || email.is_empty() || message.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Name, email, and message are all required",
        )));
    }

    if name.chars().count() > MAX_NAME_LENGTH || message.chars().count() > MAX_MESSAGE_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Messages are limited to {MAX_MESSAGE_LENGTH} characters"
        )));
    }

    if let Validity::Invalid(msg) = validators::validate_email_address(&email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let contact_message_dao = db::contact_message::Dao::new(&db_thread_pool);
    match web::block(move || contact_message_dao.save_contact_message(&name, &email, &message))
        .await?
    {
        Ok(id) => {
            log::info!("Saved contact message {id}");
            Ok(HttpResponse::Created().finish())
        }
        Err(e) => Err(error::internal(e, "Failed to save message")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use crate::handlers::test_utils;

    fn contact_message(name: &str, email: &str, message: &str) -> NewContactMessage {
        NewContactMessage {
            name: String::from(name),
            email: String::from(email),
            message: String::from(message),
        }
    }

    #[actix_web::test]
    async fn test_submit_validation() {
        let app = test_utils::init_app().await;

        for body in [
            contact_message("", "parent@example.com", "Hello"),
            contact_message("Pat", "parent@example.com", "  "),
            contact_message("Pat", "parent@example", "Hello"),
        ] {
            let req = TestRequest::post()
                .uri("/api/contact")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        }

        let req = TestRequest::post()
            .uri("/api/contact")
            .set_json(contact_message("Pat", "parent@example.com", &"a".repeat(5001)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_submit() {
        let app = test_utils::init_app().await;

        let req = TestRequest::post()
            .uri("/api/contact")
            .set_json(contact_message(
                "Pat Parent",
                "parent@example.com",
                "Is PeerCodex open to middle schoolers?",
            ))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
    }
}

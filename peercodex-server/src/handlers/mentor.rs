use peercodex_common::db::{self, DbThreadPool};
use peercodex_common::messages::{MentorList, MentorSearch, MentorSummary};
use peercodex_common::profile::{self, MentorSearchCriteria};

use actix_web::{web, HttpResponse};

use crate::handlers::error::{self, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

pub async fn search(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    search: web::Json<MentorSearch>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let criteria = into_criteria(search.into_inner())?;
    let searcher_id = user_access_token.claims.user_id;

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let mentors = match web::block(move || user_dao.search_mentors(searcher_id, &criteria)).await?
    {
        Ok(m) => m,
        Err(e) => return Err(error::internal(e, "Failed to search for mentors")),
    };

    Ok(HttpResponse::Ok().json(MentorList {
        mentors: mentors.into_iter().map(MentorSummary::from).collect(),
    }))
}

fn into_criteria(search: MentorSearch) -> Result<MentorSearchCriteria, HttpErrorResponse> {
    if search.subjects.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Select at least one subject",
        )));
    }

    let mut subjects = Vec::with_capacity(search.subjects.len());
    for subject in search.subjects {
        let subject = subject.trim();

        if !profile::is_known_subject(subject) {
            return Err(HttpErrorResponse::IncorrectlyFormed(format!(
                "Unknown subject: {subject}"
            )));
        }

        subjects.push(String::from(subject));
    }

    let non_blank = |field: Option<String>| {
        field
            .map(|f| String::from(f.trim()))
            .filter(|f| !f.is_empty())
    };

    Ok(MentorSearchCriteria {
        subjects,
        school: non_blank(search.school),
        grade: non_blank(search.grade),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use actix_web::body::to_bytes;
    use actix_web::http::StatusCode;
    use actix_web::test::{self, TestRequest};

    use crate::env;
    use crate::handlers::test_utils;

    #[test]
    fn test_into_criteria() {
        let criteria = into_criteria(MentorSearch {
            subjects: vec![String::from(" AP Chemistry ")],
            school: Some(String::from("  ")),
            grade: Some(String::from("12th Grade (Senior)")),
        })
        .unwrap();

        assert_eq!(criteria.subjects, vec![String::from("AP Chemistry")]);
        assert!(criteria.school.is_none());
        assert_eq!(criteria.grade.as_deref(), Some("12th Grade (Senior)"));

        assert!(into_criteria(MentorSearch {
            subjects: Vec::new(),
            school: None,
            grade: None,
        })
        .is_err());

        assert!(into_criteria(MentorSearch {
            subjects: vec![String::from("Cooking")],
            school: None,
            grade: None,
        })
        .is_err());
    }

    #[actix_web::test]
    #[ignore = "requires a running PostgreSQL database"]
    async fn test_search() {
        let app = test_utils::init_app().await;

        let (searcher, access_token) = test_utils::create_user(&["AP Statistics"]);
        let (mentor, _) = test_utils::create_user(&["AP Statistics", "AP Biology"]);
        let (other, _) = test_utils::create_user(&["AP Biology"]);

        let req = TestRequest::post()
            .uri("/api/mentor/search")
            .insert_header(("AccessToken", access_token.as_str()))
            .set_json(MentorSearch {
                subjects: vec![String::from("AP Statistics")],
                school: Some(String::from("Liberty High School")),
                grade: None,
            })
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let resp_body = to_bytes(resp.into_body()).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&resp_body).unwrap();
        let mentors = body["mentors"].as_array().unwrap();

        let ids = mentors
            .iter()
            .map(|m| m["id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>();
        assert!(ids.contains(&mentor.id.to_string()));
        assert!(!ids.contains(&searcher.id.to_string()));
        assert!(!ids.contains(&other.id.to_string()));

        // Contact details are held back until a request is accepted
        for mentor in mentors {
            assert!(mentor.get("phone_number").is_none());
            assert!(mentor.get("discord").is_none());
        }

        let user_dao = db::user::Dao::new(&env::testing::DB_THREAD_POOL);
        for user in [searcher, mentor, other] {
            user_dao.delete_user(user.id).unwrap();
        }
    }
}

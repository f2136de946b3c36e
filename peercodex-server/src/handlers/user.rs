use peercodex_common::db::{self, DaoError, DbThreadPool};
use peercodex_common::email::EmailSender;
use peercodex_common::html::templates::VerifyUserPage;
use peercodex_common::messages::{
    CredentialPair, NewUser, OnboardingForm, ProfileUpdate, UserProfile,
};
use peercodex_common::models::user::ProfileChanges;
use peercodex_common::profile;
use peercodex_common::token::TokenError;
use peercodex_common::validators::{self, Validity};

use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse};
use std::sync::Arc;
use std::time::SystemTime;
use zeroize::Zeroizing;

use crate::env;
use crate::handlers::error::{self, DoesNotExistType, HttpErrorResponse};
use crate::handlers::verification::{self, MAX_PASSWORD_LENGTH};
use crate::middleware::auth::{Access, UnverifiedToken, UserCreation, VerifiedToken};
use crate::middleware::{FromHeader, FromQuery};

const MAX_NAME_LENGTH: usize = 100;
const MAX_SCHOOL_LENGTH: usize = 200;
const MAX_DISCORD_LENGTH: usize = 64;
const MAX_PHONE_LENGTH: usize = 32;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<EmailSender>,
    user_data: web::Json<NewUser>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_data = user_data.into_inner();

    let email = user_data.email.trim().to_ascii_lowercase();
    let first_name = user_data.first_name.trim();
    let last_name = user_data.last_name.trim();

    if let Validity::Invalid(msg) = validators::validate_signup_email(
        &email,
        &env::CONF.allowed_email_domain,
        &env::CONF.allowed_test_emails,
    ) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    if first_name.is_empty() || last_name.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "First and last name are required",
        )));
    }

    if first_name.chars().count() > MAX_NAME_LENGTH || last_name.chars().count() > MAX_NAME_LENGTH
    {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Names cannot be longer than {MAX_NAME_LENGTH} characters"
        )));
    }

    if !user_data.accepted_terms {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "You must accept the terms and conditions",
        )));
    }

    if user_data.password.len() > MAX_PASSWORD_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Password cannot be longer than {MAX_PASSWORD_LENGTH} bytes"
        )));
    }

    if let Validity::Invalid(msg) =
        validators::validate_password(&user_data.password, &user_data.password_confirmation)
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let today = chrono::Utc::now().date_naive();
    if let Validity::Invalid(msg) =
        validators::validate_date_of_birth(user_data.date_of_birth.trim(), today)
    {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    let password_hash =
        verification::hash_password(Zeroizing::new(user_data.password.clone())).await?;

    let new_user = Arc::new((
        email,
        String::from(first_name),
        String::from(last_name),
        String::from(user_data.date_of_birth.trim()),
    ));
    let new_user_ref = Arc::clone(&new_user);

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user_id = match web::block(move || {
        let (email, first_name, last_name, date_of_birth) = &*new_user_ref;
        user_dao.create_user(email, &password_hash, first_name, last_name, date_of_birth)
    })
    .await?
    {
        Ok(id) => id,
        Err(e) if error::is_unique_violation(&e) => {
            return Err(HttpErrorResponse::ConflictWithExisting(String::from(
                "A user with the given email address already exists",
            )));
        }
        Err(e) => return Err(error::internal(e, "Failed to create user")),
    };

    let (email, first_name, _, _) = &*new_user;
    verification::send_verification_email(user_id, email, first_name, &smtp_thread_pool).await?;

    Ok(HttpResponse::Created().finish())
}

pub async fn verify_creation(
    db_thread_pool: web::Data<DbThreadPool>,
    user_creation_token: Result<UnverifiedToken<UserCreation, FromQuery>, HttpErrorResponse>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_creation_token = match user_creation_token {
        Ok(t) => t,
        Err(HttpErrorResponse::TokenMissing(_)) => {
            return Ok(html_page(StatusCode::BAD_REQUEST, VerifyUserPage::MissingToken));
        }
        Err(_) => return Ok(html_page(StatusCode::BAD_REQUEST, VerifyUserPage::InvalidLink)),
    };

    let claims = match user_creation_token.verify() {
        Ok(c) => c,
        Err(TokenError::TokenExpired) => {
            return Ok(html_page(StatusCode::UNAUTHORIZED, VerifyUserPage::ExpiredLink));
        }
        Err(_) => return Ok(html_page(StatusCode::UNAUTHORIZED, VerifyUserPage::InvalidLink)),
    };

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let page = match web::block(move || user_dao.verify_user_creation(claims.user_id)).await? {
        Ok(true) => (StatusCode::OK, VerifyUserPage::Success),
        Ok(false) => (StatusCode::OK, VerifyUserPage::AlreadyVerified),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            (StatusCode::NOT_FOUND, VerifyUserPage::AccountNotFound)
        }
        Err(e) => {
            log::error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, VerifyUserPage::InternalError)
        }
    };

    Ok(html_page(page.0, page.1))
}

pub async fn resend_verification(
    db_thread_pool: web::Data<DbThreadPool>,
    smtp_thread_pool: web::Data<EmailSender>,
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
            // Same response as a wrong password so accounts can't be enumerated
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

    if user_credentials.is_verified {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "User is already verified",
        )));
    }

    let user_id = user_credentials.user_id;
    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.get_user(user_id)).await? {
        Ok(u) => u,
        Err(e) => return Err(error::internal(e, "Failed to get user")),
    };

    verification::send_verification_email(user.id, &user.email, &user.first_name, &smtp_thread_pool)
        .await?;

    Ok(HttpResponse::Ok().finish())
}

pub async fn get_profile(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let user_id = user_access_token.claims.user_id;

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.get_user(user_id)).await? {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => return Err(error::internal(e, "Failed to get user")),
    };

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

pub async fn complete_onboarding(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    form: web::Json<OnboardingForm>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let form = form.into_inner();

    let fields = ProfileFields::validate(
        &form.school,
        &form.grade,
        form.phone_number.as_deref(),
        form.discord.as_deref(),
        form.mentor_subjects,
    )?;

    let user_id = user_access_token.claims.user_id;

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.get_user(user_id)).await? {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => return Err(error::internal(e, "Failed to get user")),
    };

    if !form.confirm_email.trim().eq_ignore_ascii_case(&user.email) {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Confirmation email does not match your account email",
        )));
    }

    if user.onboarding_completed {
        return Err(HttpErrorResponse::InvalidState(String::from(
            "Onboarding has already been completed",
        )));
    }

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || {
        user_dao.complete_onboarding(user_id, &fields.as_changes())
    })
    .await?
    {
        Ok(u) => u,
        Err(e) => return Err(error::internal(e, "Failed to complete onboarding")),
    };

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

pub async fn update_profile(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    update: web::Json<ProfileUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let update = update.into_inner();

    let fields = ProfileFields::validate(
        &update.school,
        &update.grade,
        update.phone_number.as_deref(),
        update.discord.as_deref(),
        update.mentor_subjects,
    )?;

    let user_id = user_access_token.claims.user_id;

    let user_dao = db::user::Dao::new(&db_thread_pool);
    let user = match web::block(move || user_dao.update_profile(user_id, &fields.as_changes()))
        .await?
    {
        Ok(u) => u,
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            return Err(HttpErrorResponse::DoesNotExist(
                String::from("User not found"),
                DoesNotExistType::User,
            ));
        }
        Err(e) => return Err(error::internal(e, "Failed to update profile")),
    };

    Ok(HttpResponse::Ok().json(UserProfile::from(user)))
}

/// Trimmed and validated profile fields shared by onboarding and profile edits. Blank optional
/// fields are stored as null.
#[derive(Debug)]
struct ProfileFields {
    school: String,
    grade: String,
    phone_number: Option<String>,
    discord: Option<String>,
    mentor_subjects: Vec<String>,
}

impl ProfileFields {
    fn validate(
        school: &str,
        grade: &str,
        phone_number: Option<&str>,
        discord: Option<&str>,
        mentor_subjects: Vec<String>,
    ) -> Result<Self, HttpErrorResponse> {
        let school = school.trim();
        let grade = grade.trim();
        let phone_number = phone_number.map(str::trim).filter(|p| !p.is_empty());
        let discord = discord.map(str::trim).filter(|d| !d.is_empty());

        if school.is_empty() {
            return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
                "School is required",
            )));
        }

        if school.chars().count() > MAX_SCHOOL_LENGTH {
            return Err(HttpErrorResponse::InputTooLarge(format!(
                "School name cannot be longer than {MAX_SCHOOL_LENGTH} characters"
            )));
        }

        if !profile::is_known_grade(grade) {
            return Err(HttpErrorResponse::IncorrectlyFormed(format!(
                "Grade must be one of: {}",
                profile::GRADE_LEVELS.join(", ")
            )));
        }

        if let Some(phone_number) = phone_number {
            if phone_number.len() > MAX_PHONE_LENGTH {
                return Err(HttpErrorResponse::InputTooLarge(String::from(
                    "Phone number is too long",
                )));
            }

            if let Validity::Invalid(msg) = validators::validate_phone_number(phone_number) {
                return Err(HttpErrorResponse::IncorrectlyFormed(msg));
            }
        }

        if discord.is_some_and(|d| d.chars().count() > MAX_DISCORD_LENGTH) {
            return Err(HttpErrorResponse::InputTooLarge(format!(
                "Discord handle cannot be longer than {MAX_DISCORD_LENGTH} characters"
            )));
        }

        let mut subjects = Vec::with_capacity(mentor_subjects.len());
        for subject in mentor_subjects {
            let subject = subject.trim();

            if !profile::is_known_subject(subject) {
                return Err(HttpErrorResponse::IncorrectlyFormed(format!(
                    "Unknown subject: {subject}"
                )));
            }

            if !subjects.iter().any(|s| s == subject) {
                subjects.push(String::from(subject));
            }
        }

        Ok(ProfileFields {
            school: String::from(school),
            grade: String::from(grade),
            phone_number: phone_number.map(String::from),
            discord: discord.map(String::from),
            mentor_subjects: subjects,
        })
    }

    fn as_changes(&self) -> ProfileChanges<'_> {
        ProfileChanges {
            school: Some(&self.school),
            grade: Some(&self.grade),
            phone_number: self.phone_number.as_deref(),
            discord: self.discord.as_deref(),
            mentor_subjects: &self.mentor_subjects,
            modified_timestamp: SystemTime::now(),
        }
    }
}

fn html_page(status: StatusCode, page: VerifyUserPage) -> HttpResponse {
    HttpResponse::build(status)
        .content_type("text/html")
        .body(page.generate())
}

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::listing::{ListingCondition, ListingStatus};
use crate::models::request::RequestStatus;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
    pub accepted_terms: bool,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct CredentialPair {
    pub email: String,
    pub password: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EmailAddress {
    pub email: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PasswordReset {
    pub email: String,
    pub otp: String,
    pub new_password: String,
    pub new_password_confirmation: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OnboardingForm {
    pub school: String,
    pub grade: String,
    pub phone_number: Option<String>,
    pub discord: Option<String>,
    pub mentor_subjects: Vec<String>,
    pub confirm_email: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ProfileUpdate {
    pub school: String,
    pub grade: String,
    pub phone_number: Option<String>,
    pub discord: Option<String>,
    pub mentor_subjects: Vec<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MentorSearch {
    pub subjects: Vec<String>,
    pub school: Option<String>,
    pub grade: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewRequest {
    pub requestee_id: Uuid,
    pub message: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct RequestStatusUpdate {
    pub status: RequestStatus,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct PointAwardForm {
    pub mentor_id: Uuid,
    pub amount: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewListing {
    pub name: String,
    pub author: String,
    pub year: i32,
    pub condition: ListingCondition,
    pub price_cents: i64,
    pub contact: String,
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize)]
pub struct ListingStatusUpdate {
    pub status: ListingStatus,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewSchoolRequest {
    pub school_name: String,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct NewContactMessage {
    pub name: String,
    pub email: String,
    pub message: String,
}

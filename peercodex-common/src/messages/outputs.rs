use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::points::{MenteePoints, PointsReceived};
use crate::db::request::{ReceivedRequest, RequestSummary, SentRequest};
use crate::messages::unix_secs;
use crate::models::listing::Listing;
use crate::models::points::PointAward;
use crate::models::request::StatusCounts;
use crate::models::school_request::SchoolRequest;
use crate::models::user::User;
use crate::profile;

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub server_time: u64,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: String,
    pub role: String,
    pub onboarding_completed: bool,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub phone_number: Option<String>,
    pub discord: Option<String>,
    pub mentor_subjects: Vec<String>,
    pub profile_completion: u8,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        let profile_completion = profile::profile_completion(&user);

        UserProfile {
            id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            date_of_birth: user.date_of_birth,
            role: user.role,
            onboarding_completed: user.onboarding_completed,
            school: user.school,
            grade: user.grade,
            phone_number: user.phone_number,
            discord: user.discord,
            mentor_subjects: user.mentor_subjects,
            profile_completion,
        }
    }
}

/// A search result. Phone number and Discord handle are left out until a request is accepted.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MentorSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub school: Option<String>,
    pub grade: Option<String>,
    pub mentor_subjects: Vec<String>,
}

impl From<User> for MentorSummary {
    fn from(user: User) -> Self {
        MentorSummary {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            school: user.school,
            grade: user.grade,
            mentor_subjects: user.mentor_subjects,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MentorList {
    pub mentors: Vec<MentorSummary>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SharedContact {
    pub phone_number: Option<String>,
    pub discord: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SentRequestItem {
    pub id: Uuid,
    pub requestee_id: Uuid,
    pub requestee_name: String,
    pub message: String,
    pub status: String,
    pub created_timestamp: u64,
    pub contact: Option<SharedContact>,
}

impl From<SentRequest> for SentRequestItem {
    fn from(sent: SentRequest) -> Self {
        let contact = sent
            .request
            .shared_contact()
            .map(|(phone_number, discord)| SharedContact {
                phone_number: phone_number.map(String::from),
                discord: discord.map(String::from),
            });

        SentRequestItem {
            id: sent.request.id,
            requestee_id: sent.request.requestee_id,
            requestee_name: format!("{} {}", sent.requestee_first_name, sent.requestee_last_name),
            message: sent.request.message,
            status: sent.request.status,
            created_timestamp: unix_secs(sent.request.created_timestamp),
            contact,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReceivedRequestItem {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requester_name: String,
    pub message: String,
    pub status: String,
    pub created_timestamp: u64,
    pub points_received: i32,
}

impl From<ReceivedRequest> for ReceivedRequestItem {
    fn from(received: ReceivedRequest) -> Self {
        ReceivedRequestItem {
            id: received.request.id,
            requester_id: received.request.requester_id,
            requester_name: format!(
                "{} {}",
                received.requester_first_name, received.requester_last_name
            ),
            message: received.request.message,
            status: received.request.status,
            created_timestamp: unix_secs(received.request.created_timestamp),
            points_received: received.points_received,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SentRequestList {
    pub requests: Vec<SentRequestItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReceivedRequestList {
    pub requests: Vec<ReceivedRequestItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct RequestSummaryOutput {
    pub sent: StatusCounts,
    pub received: StatusCounts,
    pub total_points_received: i64,
}

impl From<RequestSummary> for RequestSummaryOutput {
    fn from(summary: RequestSummary) -> Self {
        RequestSummaryOutput {
            sent: summary.sent,
            received: summary.received,
            total_points_received: summary.total_points_received,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PointBalance {
    pub balance: i32,
    pub month_tag: String,
    pub award_options: Vec<i32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AwardResult {
    pub remaining_balance: i32,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct MenteePointsItem {
    pub mentee_id: Uuid,
    pub mentee_name: String,
    pub total: i32,
}

impl From<MenteePoints> for MenteePointsItem {
    fn from(points: MenteePoints) -> Self {
        MenteePointsItem {
            mentee_id: points.mentee_id,
            mentee_name: format!("{} {}", points.first_name, points.last_name),
            total: points.total,
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PointAwardItem {
    pub mentee_id: Uuid,
    pub amount: i32,
    pub awarded_timestamp: u64,
}

impl From<PointAward> for PointAwardItem {
    fn from(award: PointAward) -> Self {
        PointAwardItem {
            mentee_id: award.mentee_id,
            amount: award.amount,
            awarded_timestamp: unix_secs(award.awarded_timestamp),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct PointsReceivedOutput {
    pub total: i64,
    pub by_mentee: Vec<MenteePointsItem>,
    pub history: Vec<PointAwardItem>,
}

impl From<PointsReceived> for PointsReceivedOutput {
    fn from(received: PointsReceived) -> Self {
        PointsReceivedOutput {
            total: received.total,
            by_mentee: received.by_mentee.into_iter().map(Into::into).collect(),
            history: received.history.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ListingItem {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub author: String,
    pub year: i32,
    pub condition: String,
    pub price_cents: i64,
    pub contact: String,
    pub status: String,
    pub listed_timestamp: u64,
    pub remove_after_timestamp: u64,
}

impl From<Listing> for ListingItem {
    fn from(listing: Listing) -> Self {
        ListingItem {
            id: listing.id,
            owner_id: listing.owner_id,
            name: listing.name,
            author: listing.author,
            year: listing.year,
            condition: listing.condition,
            price_cents: listing.price_cents,
            contact: listing.contact,
            status: listing.status,
            listed_timestamp: unix_secs(listing.listed_timestamp),
            remove_after_timestamp: unix_secs(listing.remove_after_timestamp),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ListingList {
    pub listings: Vec<ListingItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SchoolRequestItem {
    pub id: Uuid,
    pub request_type: String,
    pub description: String,
    pub status: String,
    pub created_timestamp: u64,
}

impl From<SchoolRequest> for SchoolRequestItem {
    fn from(request: SchoolRequest) -> Self {
        SchoolRequestItem {
            id: request.id,
            request_type: request.request_type,
            description: request.description,
            status: request.status,
            created_timestamp: unix_secs(request.created_timestamp),
        }
    }
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SchoolRequestList {
    pub school_requests: Vec<SchoolRequestItem>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReferenceData {
    pub ap_subjects: Vec<String>,
    pub schools: Vec<String>,
    pub grade_levels: Vec<String>,
}

impl ReferenceData {
    pub fn current() -> Self {
        ReferenceData {
            ap_subjects: to_owned_list(profile::AP_SUBJECTS),
            schools: to_owned_list(profile::SCHOOLS),
            grade_levels: to_owned_list(profile::GRADE_LEVELS),
        }
    }
}

fn to_owned_list(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    use crate::models::request::{Request, RequestStatus};

    fn request(status: RequestStatus) -> Request {
        Request {
            id: Uuid::now_v7(),
            requester_id: Uuid::now_v7(),
            requestee_id: Uuid::now_v7(),
            message: String::from("Can you help with AP Physics 1?"),
            status: String::from(status.as_str()),
            shared_phone_number: Some(String::from("5551234567")),
            shared_discord: None,
            created_timestamp: UNIX_EPOCH + Duration::from_secs(1_740_000_000),
            modified_timestamp: SystemTime::now(),
        }
    }

    #[test]
    fn test_sent_request_hides_contact_until_accepted() {
        let pending = SentRequestItem::from(SentRequest {
            request: request(RequestStatus::Pending),
            requestee_first_name: String::from("Ada"),
            requestee_last_name: String::from("Lovelace"),
        });

        assert!(pending.contact.is_none());
        assert_eq!(pending.requestee_name, "Ada Lovelace");
        assert_eq!(pending.created_timestamp, 1_740_000_000);

        let accepted = SentRequestItem::from(SentRequest {
            request: request(RequestStatus::Accepted),
            requestee_first_name: String::from("Ada"),
            requestee_last_name: String::from("Lovelace"),
        });

        let contact = accepted.contact.unwrap();
        assert_eq!(contact.phone_number.as_deref(), Some("5551234567"));
        assert!(contact.discord.is_none());
    }

    #[test]
    fn test_reference_data() {
        let reference = ReferenceData::current();

        assert_eq!(reference.ap_subjects.len(), profile::AP_SUBJECTS.len());
        assert_eq!(reference.schools.len(), profile::SCHOOLS.len());
        assert_eq!(reference.grade_levels[0], "9th Grade (Freshman)");
    }
}

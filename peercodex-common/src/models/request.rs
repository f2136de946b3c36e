use diesel::{Identifiable, Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::SystemTime;
use uuid::Uuid;

use crate::schema::requests;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

/// The side of a request a user is acting from.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RequestActor {
    Requester,
    Requestee,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransitionError {
    AlreadyResolved(RequestStatus),
    NotPermitted {
        actor: RequestActor,
        target: RequestStatus,
    },
}

impl std::error::Error for TransitionError {}

impl fmt::Display for TransitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransitionError::AlreadyResolved(status) => {
                write!(f, "Request has already been {}", status.as_str())
            }
            TransitionError::NotPermitted { actor, target } => {
                let actor = match actor {
                    RequestActor::Requester => "requester",
                    RequestActor::Requestee => "requestee",
                };
                write!(
                    f,
                    "The {actor} of a request cannot mark it as {}",
                    target.as_str()
                )
            }
        }
    }
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Cancelled => "cancelled",
        }
    }

    /// Only pending requests move. The requestee answers a request (accept or reject) and the
    /// requester may withdraw it (cancel).
    pub fn transition(
        self,
        actor: RequestActor,
        target: RequestStatus,
    ) -> Result<RequestStatus, TransitionError> {
        if self != RequestStatus::Pending {
            return Err(TransitionError::AlreadyResolved(self));
        }

        let permitted = matches!(
            (actor, target),
            (
                RequestActor::Requestee,
                RequestStatus::Accepted | RequestStatus::Rejected
            ) | (RequestActor::Requester, RequestStatus::Cancelled)
        );

        if !permitted {
            return Err(TransitionError::NotPermitted { actor, target });
        }

        Ok(target)
    }

    /// Cancelled requests are tallied alongside rejected ones.
    pub fn counts_as_rejected(&self) -> bool {
        matches!(self, RequestStatus::Rejected | RequestStatus::Cancelled)
    }
}

impl FromStr for RequestStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(RequestStatus::Pending),
            "accepted" => Ok(RequestStatus::Accepted),
            "rejected" => Ok(RequestStatus::Rejected),
            "cancelled" => Ok(RequestStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub accepted: u32,
    pub pending: u32,
    pub rejected: u32,
}

impl StatusCounts {
    pub fn tally<I: IntoIterator<Item = RequestStatus>>(statuses: I) -> Self {
        let mut counts = StatusCounts::default();

        for status in statuses {
            match status {
                RequestStatus::Accepted => counts.accepted += 1,
                RequestStatus::Pending => counts.pending += 1,
                s if s.counts_as_rejected() => counts.rejected += 1,
                _ => (),
            }
        }

        counts
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = requests)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Request {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub message: String,
    pub status: String,
    pub shared_phone_number: Option<String>,
    pub shared_discord: Option<String>,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

impl Request {
    pub fn status(&self) -> Option<RequestStatus> {
        self.status.parse().ok()
    }

    pub fn actor(&self, user_id: Uuid) -> Option<RequestActor> {
        if user_id == self.requester_id {
            Some(RequestActor::Requester)
        } else if user_id == self.requestee_id {
            Some(RequestActor::Requestee)
        } else {
            None
        }
    }

    /// Contact details are only revealed once the requestee has accepted.
    pub fn shared_contact(&self) -> Option<(Option<&str>, Option<&str>)> {
        if self.status() != Some(RequestStatus::Accepted) {
            return None;
        }

        Some((
            self.shared_phone_number.as_deref(),
            self.shared_discord.as_deref(),
        ))
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = requests)]
pub struct NewRequest<'a> {
    pub id: Uuid,
    pub requester_id: Uuid,
    pub requestee_id: Uuid,
    pub message: &'a str,
    pub status: &'a str,
    pub created_timestamp: SystemTime,
    pub modified_timestamp: SystemTime,
}

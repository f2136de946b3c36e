use diesel::{Insertable, Queryable};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::{Duration, SystemTime};
use uuid::Uuid;

use crate::schema::listings;

pub const LISTING_LIFETIME: Duration = Duration::from_secs(60 * 24 * 60 * 60);

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ListingCondition {
    #[serde(rename = "new")]
    New,
    #[serde(rename = "like new")]
    LikeNew,
    #[serde(rename = "marked")]
    Marked,
}

impl ListingCondition {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingCondition::New => "new",
            ListingCondition::LikeNew => "like new",
            ListingCondition::Marked => "marked",
        }
    }
}

impl FromStr for ListingCondition {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(ListingCondition::New),
            "like new" => Ok(ListingCondition::LikeNew),
            "marked" => Ok(ListingCondition::Marked),
            _ => Err(()),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingStatus {
    Available,
    Sold,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Available => "available",
            ListingStatus::Sold => "sold",
        }
    }

    pub fn all_visible() -> [&'static str; 2] {
        [
            ListingStatus::Available.as_str(),
            ListingStatus::Sold.as_str(),
        ]
    }
}

impl FromStr for ListingStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "available" => Ok(ListingStatus::Available),
            "sold" => Ok(ListingStatus::Sold),
            _ => Err(()),
        }
    }
}

/// Listings drop out of the marketplace a fixed time after they are posted.
pub fn removal_timestamp(listed: SystemTime) -> SystemTime {
    listed + LISTING_LIFETIME
}

#[derive(Clone, Debug, Serialize, Deserialize, Identifiable, Queryable)]
#[diesel(table_name = listings)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct Listing {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub author: String,
    pub year: i32,
    pub condition: String,
    pub price_cents: i64,
    pub contact: String,
    pub status: String,
    pub listed_timestamp: SystemTime,
    pub remove_after_timestamp: SystemTime,
}

#[cfg(test)]
impl Listing {
    pub fn is_expired_at(&self, now: SystemTime) -> bool {
        self.remove_after_timestamp <= now
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = listings)]
pub struct NewListing<'a> {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: &'a str,
    pub author: &'a str,
    pub year: i32,
    pub condition: &'a str,
    pub price_cents: i64,
    pub contact: &'a str,
    pub status: &'a str,
    pub listed_timestamp: SystemTime,
    pub remove_after_timestamp: SystemTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removal_timestamp() {
        let listed = SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let removal = removal_timestamp(listed);

        assert_eq!(
            removal.duration_since(listed).unwrap(),
            Duration::from_secs(60 * 86400)
        );
    }

    #[test]
    fn test_is_expired_at() {
        let listed = SystemTime::now();
        let listing = Listing {
            id: Uuid::now_v7(),
            owner_id: Uuid::now_v7(),
            name: String::from("Campbell Biology"),
            author: String::from("Urry"),
            year: 2020,
            condition: String::from(ListingCondition::LikeNew.as_str()),
            price_cents: 4500,
            contact: String::from("5551234567"),
            status: String::from(ListingStatus::Available.as_str()),
            listed_timestamp: listed,
            remove_after_timestamp: removal_timestamp(listed),
        };

        assert!(!listing.is_expired_at(listed));
        assert!(!listing.is_expired_at(listed + Duration::from_secs(59 * 86400)));
        assert!(listing.is_expired_at(listed + Duration::from_secs(60 * 86400)));
        assert!(listing.is_expired_at(listed + Duration::from_secs(61 * 86400)));
    }

    #[test]
    fn test_condition_and_status_strings() {
        assert_eq!("like new".parse::<ListingCondition>(), Ok(ListingCondition::LikeNew));
        assert_eq!("marked".parse::<ListingCondition>(), Ok(ListingCondition::Marked));
        assert!("used".parse::<ListingCondition>().is_err());

        assert_eq!(
            serde_json::to_string(&ListingCondition::LikeNew).unwrap(),
            "\"like new\""
        );
        assert_eq!(
            serde_json::from_str::<ListingStatus>("\"sold\"").unwrap(),
            ListingStatus::Sold
        );

        assert_eq!("sold".parse::<ListingStatus>(), Ok(ListingStatus::Sold));
        assert!("removed".parse::<ListingStatus>().is_err());
    }
}

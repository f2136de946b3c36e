use diesel::{dsl, ExpressionMethods, QueryDsl, RunQueryDsl};
use std::time::SystemTime;
use uuid::Uuid;

use crate::db::{DaoError, DbThreadPool};
use crate::models::listing::{self, Listing, ListingCondition, ListingStatus, NewListing};
use crate::schema::listings as listing_fields;
use crate::schema::listings::dsl::listings;

pub struct ListingDetails<'a> {
    pub name: &'a str,
    pub author: &'a str,
    pub year: i32,
    pub condition: ListingCondition,
    pub price_cents: i64,
    pub contact: &'a str,
}

pub struct Dao {
    db_thread_pool: DbThreadPool,
}

impl Dao {
    pub fn new(db_thread_pool: &DbThreadPool) -> Self {
        Self {
            db_thread_pool: db_thread_pool.clone(),
        }
    }

    pub fn create_listing(
        &self,
        owner_id: Uuid,
        details: &ListingDetails,
    ) -> Result<Listing, DaoError> {
        let now = SystemTime::now();

        let new_listing = NewListing {
            id: Uuid::now_v7(),
            owner_id,
            name: details.name,
            author: details.author,
            year: details.year,
            condition: details.condition.as_str(),
            price_cents: details.price_cents,
            contact: details.contact,
            status: ListingStatus::Available.as_str(),
            listed_timestamp: now,
            remove_after_timestamp: listing::removal_timestamp(now),
        };

        Ok(dsl::insert_into(listings)
            .values(&new_listing)
            .get_result::<Listing>(&mut self.db_thread_pool.get()?)?)
    }

    /// Listings still on the marketplace at `now`, newest first.
    pub fn get_visible_listings(&self, now: SystemTime) -> Result<Vec<Listing>, DaoError> {
        Ok(listings
            .filter(listing_fields::status.eq_any(ListingStatus::all_visible().to_vec()))
            .filter(listing_fields::remove_after_timestamp.gt(now))
            .order(listing_fields::listed_timestamp.desc())
            .load::<Listing>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn get_listings_for_owner(&self, owner_id: Uuid) -> Result<Vec<Listing>, DaoError> {
        Ok(listings
            .filter(listing_fields::owner_id.eq(owner_id))
            .order(listing_fields::listed_timestamp.desc())
            .load::<Listing>(&mut self.db_thread_pool.get()?)?)
    }

    /// Fails with `NotFound` if the listing doesn't exist or belongs to someone else.
    pub fn update_listing_status(
        &self,
        listing_id: Uuid,
        owner_id: Uuid,
        status: ListingStatus,
    ) -> Result<Listing, DaoError> {
        Ok(diesel::update(
            listings
                .find(listing_id)
                .filter(listing_fields::owner_id.eq(owner_id)),
        )
        .set(listing_fields::status.eq(status.as_str()))
        .get_result::<Listing>(&mut self.db_thread_pool.get()?)?)
    }

    pub fn delete_listing(&self, listing_id: Uuid, owner_id: Uuid) -> Result<(), DaoError> {
        let deleted_count = diesel::delete(
            listings
                .find(listing_id)
                .filter(listing_fields::owner_id.eq(owner_id)),
        )
        .execute(&mut self.db_thread_pool.get()?)?;

        if deleted_count == 0 {
            return Err(DaoError::QueryFailure(diesel::result::Error::NotFound));
        }

        Ok(())
    }

    pub fn delete_expired_listings(&self) -> Result<usize, DaoError> {
        Ok(diesel::delete(
            listings.filter(listing_fields::remove_after_timestamp.le(SystemTime::now())),
        )
        .execute(&mut self.db_thread_pool.get()?)?)
    }
}

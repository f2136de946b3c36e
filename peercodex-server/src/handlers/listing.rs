use peercodex_common::db::listing::ListingDetails;
use peercodex_common::db::{self, DaoError, DbThreadPool};
use peercodex_common::messages::{ListingItem, ListingList, ListingStatusUpdate, NewListing};
use peercodex_common::validators::{self, Validity};

use actix_web::{web, HttpResponse};
use chrono::Datelike;
use std::time::SystemTime;
use uuid::Uuid;

use crate::handlers::error::{self, DoesNotExistType, HttpErrorResponse};
use crate::middleware::auth::{Access, VerifiedToken};
use crate::middleware::FromHeader;

const MAX_TITLE_LENGTH: usize = 200;
const EARLIEST_PUBLICATION_YEAR: i32 = 1800;

pub async fn create(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    new_listing: web::Json<NewListing>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let new_listing = new_listing.into_inner();
    validate_listing(&new_listing)?;

    let owner_id = user_access_token.claims.user_id;

    let listing_dao = db::listing::Dao::new(&db_thread_pool);
    let listing = match web::block(move || {
        let details = ListingDetails {
            name: new_listing.name.trim(),
            author: new_listing.author.trim(),
            year: new_listing.year,
            condition: new_listing.condition,
            price_cents: new_listing.price_cents,
            contact: new_listing.contact.trim(),
        };

        listing_dao.create_listing(owner_id, &details)
    })
    .await?
    {
        Ok(l) => l,
        Err(e) => return Err(error::internal(e, "Failed to create listing")),
    };

    Ok(HttpResponse::Created().json(ListingItem::from(listing)))
}

pub async fn list(
    db_thread_pool: web::Data<DbThreadPool>,
    _user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let listing_dao = db::listing::Dao::new(&db_thread_pool);
    let listings =
        match web::block(move || listing_dao.get_visible_listings(SystemTime::now())).await? {
            Ok(l) => l,
            Err(e) => return Err(error::internal(e, "Failed to get listings")),
        };

    Ok(HttpResponse::Ok().json(ListingList {
        listings: listings.into_iter().map(ListingItem::from).collect(),
    }))
}

pub async fn list_mine(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let owner_id = user_access_token.claims.user_id;

    let listing_dao = db::listing::Dao::new(&db_thread_pool);
    let listings = match web::block(move || listing_dao.get_listings_for_owner(owner_id)).await? {
        Ok(l) => l,
        Err(e) => return Err(error::internal(e, "Failed to get listings")),
    };

    Ok(HttpResponse::Ok().json(ListingList {
        listings: listings.into_iter().map(ListingItem::from).collect(),
    }))
}

pub async fn update_status(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    listing_id: web::Path<Uuid>,
    update: web::Json<ListingStatusUpdate>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let listing_id = listing_id.into_inner();
    let status = update.into_inner().status;
    let owner_id = user_access_token.claims.user_id;

    let listing_dao = db::listing::Dao::new(&db_thread_pool);
    match web::block(move || listing_dao.update_listing_status(listing_id, owner_id, status))
        .await?
    {
        Ok(listing) => Ok(HttpResponse::Ok().json(ListingItem::from(listing))),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            Err(listing_not_found())
        }
        Err(e) => Err(error::internal(e, "Failed to update listing")),
    }
}

pub async fn delete(
    db_thread_pool: web::Data<DbThreadPool>,
    user_access_token: VerifiedToken<Access, FromHeader>,
    listing_id: web::Path<Uuid>,
) -> Result<HttpResponse, HttpErrorResponse> {
    let listing_id = listing_id.into_inner();
    let owner_id = user_access_token.claims.user_id;

    let listing_dao = db::listing::Dao::new(&db_thread_pool);
    match web::block(move || listing_dao.delete_listing(listing_id, owner_id)).await? {
        Ok(_) => Ok(HttpResponse::Ok().finish()),
        Err(DaoError::QueryFailure(diesel::result::Error::NotFound)) => {
            Err(listing_not_found())
        }
        Err(e) => Err(error::internal(e, "Failed to delete listing")),
    }
}

// Other users' listings are reported as missing rather than forbidden
fn listing_not_found() -> HttpErrorResponse {
    HttpErrorResponse::DoesNotExist(
        String::from("No listing with the given ID belongs to you"),
        DoesNotExistType::Listing,
    )
}

fn validate_listing(listing: &NewListing) -> Result<(), HttpErrorResponse> {
    let name = listing.name.trim();
    let author = listing.author.trim();

    if name.is_empty() || author.is_empty() {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Book name and author are required",
        )));
    }

    if name.chars().count() > MAX_TITLE_LENGTH || author.chars().count() > MAX_TITLE_LENGTH {
        return Err(HttpErrorResponse::InputTooLarge(format!(
            "Book name and author cannot be longer than {MAX_TITLE_LENGTH} characters"
        )));
    }

    let latest_year = chrono::Utc::now().year() + 1;
    if !(EARLIEST_PUBLICATION_YEAR..=latest_year).contains(&listing.year) {
        return Err(HttpErrorResponse::IncorrectlyFormed(format!(
            "Year must be between {EARLIEST_PUBLICATION_YEAR} and {latest_year}"
        )));
    }

    if listing.price_cents < 0 {
        return Err(HttpErrorResponse::IncorrectlyFormed(String::from(
            "Price cannot be negative",
        )));
    }

    if let Validity::Invalid(msg) = validators::validate_listing_contact(listing.contact.trim()) {
        return Err(HttpErrorResponse::IncorrectlyFormed(msg));
    }

    Ok(())
}

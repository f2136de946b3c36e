#![cfg(not(doctest))]

#[macro_use]
extern crate diesel;

pub mod db;
pub mod email;
pub mod html;
pub mod messages;
pub mod models;
pub mod otp;
pub mod points;
pub mod profile;
pub mod schema;
pub mod threadrand;
pub mod token;
pub mod validators;

use chrono::{DateTime, Datelike, Utc};
use std::fmt;

/// Every user starts each calendar month (UTC) with this many points to award.
pub const MONTHLY_POINT_ALLOWANCE: i32 = 50;
pub const AWARD_INCREMENT: i32 = 5;
pub const MAX_SINGLE_AWARD: i32 = 50;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AwardError {
    NotPositive,
    NotAnIncrement,
    AboveMaximum,
    NotEnoughPoints { balance: i32 },
}

impl std::error::Error for AwardError {}

impl fmt::Display for AwardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwardError::NotPositive => write!(f, "Award must be greater than zero"),
            AwardError::NotAnIncrement => {
                write!(f, "Award must be a multiple of {AWARD_INCREMENT}")
            }
            AwardError::AboveMaximum => {
                write!(f, "Award cannot be more than {MAX_SINGLE_AWARD} points")
            }
            AwardError::NotEnoughPoints { .. } => write!(f, "Not enough points!"),
        }
    }
}

pub fn month_tag(date: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", date.year(), date.month())
}

pub fn current_month_tag() -> String {
    month_tag(Utc::now())
}

/// The balance a user may spend right now. A missing balance, or one stored under a different
/// month, is replaced by a full allowance.
pub fn refreshed_balance(stored: Option<(&str, i32)>, current_month_tag: &str) -> i32 {
    match stored {
        Some((month_tag, balance)) if month_tag == current_month_tag => balance,
        _ => MONTHLY_POINT_ALLOWANCE,
    }
}

/// Checks an award against the mentee's refreshed balance and returns the balance left after it.
pub fn apply_award(amount: i32, balance: i32) -> Result<i32, AwardError> {
    if amount <= 0 {
        return Err(AwardError::NotPositive);
    }

    if amount % AWARD_INCREMENT != 0 {
        return Err(AwardError::NotAnIncrement);
    }

    if amount > MAX_SINGLE_AWARD {
        return Err(AwardError::AboveMaximum);
    }

    if amount > balance {
        return Err(AwardError::NotEnoughPoints { balance });
    }

    Ok(balance - amount)
}

/// Amounts a mentee can choose from given their balance.
pub fn award_options(balance: i32) -> Vec<i32> {
    (1..=MAX_SINGLE_AWARD / AWARD_INCREMENT)
        .map(|step| step * AWARD_INCREMENT)
        .take_while(|amount| *amount <= balance)
        .collect()
}

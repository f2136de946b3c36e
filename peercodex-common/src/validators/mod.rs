use chrono::{Datelike, NaiveDate};

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_REQUEST_MESSAGE_WORDS: usize = 100;
pub const MAX_REQUEST_MESSAGE_CHARS: usize = 600;
pub const MIN_USER_AGE: u32 = 13;
pub const MAX_USER_AGE: u32 = 22;

// Matched against whole words and phrases, case-insensitively
const BLOCKED_WORDS: &[&str] = &[
    "fuck",
    "fucking",
    "motherfucker",
    "shit",
    "bullshit",
    "bitch",
    "asshole",
    "arsehole",
    "bastard",
    "cunt",
    "dick",
    "douche",
    "douchebag",
    "jackass",
    "prick",
    "slut",
    "whore",
    "twat",
    "wanker",
    "retard",
    "faggot",
    "fag",
    "nigger",
    "nigga",
    "chink",
    "spic",
    "kike",
    "gook",
    "coon",
    "dyke",
    "tranny",
    "wetback",
    "beaner",
    "raghead",
    "towel head",
    "sand nigger",
    "porch monkey",
    "jungle bunny",
    "camel jockey",
    "rapist",
    "pedophile",
    "pedo",
];

#[derive(Debug)]
pub enum Validity {
    Valid,
    Invalid(String),
}

impl Validity {
    pub fn is_valid(&self) -> bool {
        match &self {
            Validity::Valid => true,
            Validity::Invalid(_) => false,
        }
    }
}

pub fn validate_email_address(email: &str) -> Validity {
    if email.chars().count() > 320 {
        return Validity::Invalid(String::from("Email address is too long."));
    }

    for c in email.chars() {
        if c == ' ' || !c.is_ascii() {
            return Validity::Invalid(String::from(
                "Email address cannot contain a space or non-ASCII characters.",
            ));
        }
    }

    if email.contains("@.") {
        return Validity::Invalid(String::from(
            "Domain name in email address cannot begin with a period.",
        ));
    }

    let Some((username, domain)) = email.split_once('@') else {
        return Validity::Invalid(String::from("Email address must contain an at symbol (@)."));
    };

    if username.is_empty() || domain.len() < 3 {
        return Validity::Invalid(String::from("Email username or domain name is too short."));
    }

    if domain.contains('@') || !domain.contains('.') {
        return Validity::Invalid(String::from(
            "Email address must have only one at symbol (@) and the domain must contain a period.",
        ));
    }

    if domain.ends_with('.') {
        return Validity::Invalid(String::from("Email address cannot end with a period."));
    }

    Validity::Valid
}

/// Accounts are limited to addresses issued by the school district, plus a short list of
/// individually allowed addresses. Both checks ignore case.
pub fn validate_signup_email(
    email: &str,
    allowed_domain: &str,
    allowed_addresses: &[String],
) -> Validity {
    let validity = validate_email_address(email);
    if !validity.is_valid() {
        return validity;
    }

    let email = email.to_ascii_lowercase();

    if allowed_addresses
        .iter()
        .any(|addr| addr.eq_ignore_ascii_case(&email))
    {
        return Validity::Valid;
    }

    let domain_suffix = if allowed_domain.starts_with('@') {
        allowed_domain.to_ascii_lowercase()
    } else {
        format!("@{}", allowed_domain.to_ascii_lowercase())
    };

    if email.ends_with(&domain_suffix) {
        Validity::Valid
    } else {
        Validity::Invalid(format!(
            "Please use your school email address (ending in {domain_suffix})."
        ))
    }
}

pub fn validate_password(password: &str, confirmation: &str) -> Validity {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Validity::Invalid(format!(
            "Password must be at least {MIN_PASSWORD_LENGTH} characters long."
        ));
    }

    if password != confirmation {
        return Validity::Invalid(String::from("Passwords do not match."));
    }

    Validity::Valid
}

/// Parses a `YYYY-MM-DD` date of birth and checks the user's age on `today`.
pub fn validate_date_of_birth(date_of_birth: &str, today: NaiveDate) -> Validity {
    let Ok(dob) = NaiveDate::parse_from_str(date_of_birth, "%Y-%m-%d") else {
        return Validity::Invalid(String::from("Date of birth must be formatted as YYYY-MM-DD."));
    };

    if dob > today {
        return Validity::Invalid(String::from("Date of birth cannot be in the future."));
    }

    let mut age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age -= 1;
    }

    if age < MIN_USER_AGE as i32 || age > MAX_USER_AGE as i32 {
        return Validity::Invalid(format!(
            "You must be between {MIN_USER_AGE} and {MAX_USER_AGE} years old to sign up."
        ));
    }

    Validity::Valid
}

pub fn validate_phone_number(phone_number: &str) -> Validity {
    let body = phone_number.strip_prefix('+').unwrap_or(phone_number);

    if body.is_empty() {
        return Validity::Invalid(String::from("Phone number cannot be empty."));
    }

    let is_allowed = |c: char| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')');

    if !body.chars().all(is_allowed) {
        return Validity::Invalid(String::from(
            "Phone number may only contain digits, spaces, dashes, and parentheses.",
        ));
    }

    Validity::Valid
}

/// Marketplace contact numbers are 10-digit phone numbers. Formatting characters between the
/// digits are ignored, so `(555) 123-4567` is accepted and stored as given.
pub fn validate_listing_contact(contact: &str) -> Validity {
    let digit_count = contact.chars().filter(|c| c.is_ascii_digit()).count();

    if digit_count == 10 {
        Validity::Valid
    } else {
        Validity::Invalid(String::from("Contact must be exactly 10 digits."))
    }
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

pub fn contains_blocked_word(text: &str) -> bool {
    let normalized = text
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .collect::<String>();
    let words = normalized.split_whitespace().collect::<Vec<_>>();

    BLOCKED_WORDS.iter().any(|blocked| {
        let blocked_words = blocked.split(' ').collect::<Vec<_>>();
        words
            .windows(blocked_words.len())
            .any(|window| window == blocked_words.as_slice())
    })
}

/// Checks the free-text message a mentee sends with a request. The message is expected to have
/// already been trimmed.
pub fn validate_request_message(message: &str) -> Validity {
    if message.is_empty() {
        return Validity::Invalid(String::from("Message cannot be empty."));
    }

    if message.chars().count() > MAX_REQUEST_MESSAGE_CHARS {
        return Validity::Invalid(format!(
            "Message cannot be longer than {MAX_REQUEST_MESSAGE_CHARS} characters."
        ));
    }

    if word_count(message) > MAX_REQUEST_MESSAGE_WORDS {
        return Validity::Invalid(format!(
            "Message cannot be longer than {MAX_REQUEST_MESSAGE_WORDS} words."
        ));
    }

    if contains_blocked_word(message) {
        return Validity::Invalid(String::from("Message contains inappropriate language."));
    }

    Validity::Valid
}

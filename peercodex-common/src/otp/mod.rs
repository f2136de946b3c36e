use rand::Rng;

use crate::threadrand::SecureRng;

pub const PASSWORD_RESET_OTP_LENGTH: usize = 8;

/// A one-time passcode made of ASCII digits. Codes are emailed in two space-separated groups
/// (`1234 5678`) and users may type them back in either form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Otp(String);

impl Otp {
    pub fn generate(length: usize) -> Self {
        let mut rng = SecureRng;
        Otp(
            (0..length)
                .map(|_| char::from(b'0' + rng.gen_range(0..10)))
                .collect(),
        )
    }

    pub fn for_password_reset() -> Self {
        Self::generate(PASSWORD_RESET_OTP_LENGTH)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The two halves of the code, as shown in emails.
    pub fn display_groups(&self) -> (&str, &str) {
        self.0.split_at(self.0.len() / 2)
    }

    /// Drops the whitespace users tend to copy along with an emailed code.
    pub fn normalize(entered: &str) -> String {
        entered.chars().filter(|c| !c.is_whitespace()).collect()
    }

    /// Compares in time that depends only on the length of the codes.
    pub fn matches(entered: &str, saved: &str) -> bool {
        let entered = entered.as_bytes();
        let saved = saved.as_bytes();

        if entered.len() != saved.len() {
            return false;
        }

        entered
            .iter()
            .zip(saved)
            .fold(0u8, |diff, (a, b)| diff | (a ^ b))
            == 0
    }
}

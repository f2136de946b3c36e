/// Result pages shown after a user follows the verification link from their signup email.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum VerifyUserPage {
    Success,
    AlreadyVerified,
    ExpiredLink,
    MissingToken,
    InvalidLink,
    AccountNotFound,
    InternalError,
}

impl VerifyUserPage {
    pub fn generate(&self) -> String {
        let (heading, detail) = match self {
            VerifyUserPage::Success => (
                "Your email has been verified!",
                "You can now sign in to PeerCodex and finish setting up your profile.",
            ),
            VerifyUserPage::AlreadyVerified => (
                "Your email is already verified.",
                "Head back to PeerCodex and sign in.",
            ),
            VerifyUserPage::ExpiredLink => (
                "This link has expired.",
                "Sign in with your email and password to have a new link sent to you.",
            ),
            VerifyUserPage::MissingToken => ("This link is invalid because it is missing a token.", ""),
            VerifyUserPage::InvalidLink => ("This link is invalid.", ""),
            VerifyUserPage::AccountNotFound => (
                "Could not find the correct account.",
                "Accounts that aren't verified within a few days are removed. You may need to \
                 sign up again.",
            ),
            VerifyUserPage::InternalError => (
                "Could not verify your account due to an error.",
                "We apologize. We'll try to fix this. Please try again in a few hours.",
            ),
        };

        format!(
            "<!DOCTYPE html>
             <html>
               <head>
                 <title>PeerCodex Account Verification</title>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
               <body>
                 <h1>{heading}</h1>
                 <h3>{detail}</h3>
               </body>
             </html>"
        )
    }
}

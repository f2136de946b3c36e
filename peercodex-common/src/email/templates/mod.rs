use std::time::Duration;

pub struct VerificationLinkMessage {}
pub struct PasswordResetOtpMessage {}

impl VerificationLinkMessage {
    pub fn generate(url: &str, token: &str, token_lifetime: Duration, first_name: &str) -> String {
        let link = format!("{}?UserCreationToken={}", url, token);

        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>Welcome to PeerCodex, {}!</h1>
               <p>Verify your school email to finish creating your account.</p>
               <p><a href=\"{}\" rel=\"nofollow\">Verify my email</a></p>
               <p><b>This link will expire in {} hours.</b></p>
               <br />
               <p><i>Didn't sign up? Just ignore this email.</i></p>
             </body>
             </html>",
            first_name,
            link,
            token_lifetime.as_secs() / (60 * 60),
        )
    }
}

impl PasswordResetOtpMessage {
    pub fn generate(otp_part1: &str, otp_part2: &str, otp_lifetime: Duration) -> String {
        format!(
            "<html>
               <head>
                 <style>
                   body {{
                     font-family: Arial, sans-serif;
                     text-align: center;
                   }}
                 </style>
               </head>
             <body>
               <h1>PeerCodex Password Reset Code</h1>
               <h2 style=\"font-family: 'Courier New', monospace; user-select: all; \
               -webkit-user-select: all;\"><b>{} {}</b></h2>
               <p>We will never ask you for this code over the phone or email. \
               <b>Your code expires in {} minutes.</b></p>
             </body>
             </html>",
            otp_part1,
            otp_part2,
            otp_lifetime.as_secs() / 60,
        )
    }
}

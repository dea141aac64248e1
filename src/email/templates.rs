pub struct RenderedEmail {
    pub subject: String,
    pub text: String,
    pub html: String,
}

const BUTTON_STYLE: &str = "display: inline-block; padding: 12px 28px; background: #3b82f6; color: white; text-decoration: none; border-radius: 6px; font-weight: 600;";

/// `{frontend}/{page}?token=..&email=..` with both values form-encoded.
pub fn link(frontend_url: &str, page: &str, token: &str, email: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("token", token)
        .append_pair("email", email)
        .finish();
    format!("{}/{page}?{query}", frontend_url.trim_end_matches('/'))
}

pub fn render_verification(username: &str, url: &str) -> RenderedEmail {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Welcome, {username}!</h2>
    <p>Thanks for signing up for Desk Buddy. Please confirm your email address to activate your account.</p>
    <p style="text-align: center;"><a href="{url}" style="{BUTTON_STYLE}">Verify Email Address</a></p>
    <p>Or paste this link into your browser:</p>
    <p style="color: #3b82f6; word-break: break-all;">{url}</p>
    <p style="color: #6b7280; font-size: 14px;">If you didn't create an account, you can ignore this email.</p>
</body>
</html>"#
    );

    let text = format!(
        "Welcome to Desk Buddy, {username}!\n\n\
         Please confirm your email address by opening the link below:\n\n\
         {url}\n\n\
         If you didn't create an account, you can ignore this email.\n"
    );

    RenderedEmail {
        subject: "Verify Your Email - Desk Buddy".to_string(),
        text,
        html,
    }
}

pub fn render_password_reset(username: &str, url: &str) -> RenderedEmail {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
    <h2>Password Reset Request</h2>
    <p>Hello {username},</p>
    <p>We received a request to reset the password for your Desk Buddy account.</p>
    <p style="text-align: center;"><a href="{url}" style="{BUTTON_STYLE}">Reset Password</a></p>
    <p>Or paste this link into your browser:</p>
    <p style="color: #3b82f6; word-break: break-all;">{url}</p>
    <p style="color: #6b7280; font-size: 14px;">This link expires in 1 hour and can only be used once. If you didn't request a reset, your password stays unchanged.</p>
</body>
</html>"#
    );

    let text = format!(
        "Hello {username},\n\n\
         We received a request to reset the password for your Desk Buddy account.\n\
         Open the link below to choose a new password:\n\n\
         {url}\n\n\
         This link expires in 1 hour and can only be used once.\n\
         If you didn't request a reset, your password stays unchanged.\n"
    );

    RenderedEmail {
        subject: "Reset Your Password - Desk Buddy".to_string(),
        text,
        html,
    }
}

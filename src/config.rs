use std::env;

fn env_or_empty(key: &str) -> String {
    env::var(key).unwrap_or_default()
}

/// SMTP settings for the admin notification email. All fields come from the
/// environment; an incomplete set disables sending rather than failing startup.
#[derive(Clone, Debug, Default)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub from: String,
    pub admin_email: String,
}

impl SmtpConfig {
    pub fn from_env() -> Self {
        Self {
            host: env_or_empty("SMTP_HOST"),
            port: env::var("SMTP_PORT")
                .ok()
                .and_then(|value| value.parse().ok())
                .unwrap_or(587),
            user: env_or_empty("SMTP_USER"),
            password: env_or_empty("SMTP_PASSWORD"),
            from: env_or_empty("SMTP_FROM"),
            admin_email: env_or_empty("ADMIN_EMAIL"),
        }
    }

    pub fn enabled(&self) -> bool {
        !(self.host.trim().is_empty()
            || self.user.trim().is_empty()
            || self.password.trim().is_empty()
            || self.from.trim().is_empty()
            || self.admin_email.trim().is_empty())
    }
}

#[derive(Clone, Debug, Default)]
pub struct StripeConfig {
    pub secret_key: String,
}

impl StripeConfig {
    pub fn from_env() -> Self {
        Self {
            secret_key: env_or_empty("STRIPE_SECRET_KEY"),
        }
    }

    pub fn enabled(&self) -> bool {
        !self.secret_key.trim().is_empty()
    }
}

use std::env;

pub const DEFAULT_STRIPE_API_BASE: &str = "https://api.stripe.com";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_path: String,
    pub dev_mode: bool,
    pub stripe: StripeSettings,
    /// Upper bound on a multipart upload request body, in bytes.
    pub max_upload_bytes: usize,
    /// Reports with this many rows or more are refused.
    pub pdf_max_rows: usize,
    pub bootstrap_admin_email: Option<String>,
}

/// Payment gateway credentials and redirect targets.
#[derive(Debug, Clone)]
pub struct StripeSettings {
    pub api_key: String,
    pub api_base: String,
    pub success_url: String,
    pub cancel_url: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let dev_mode = env::var("PAYDESK_ENV")
            .map(|v| v == "dev" || v == "development")
            .unwrap_or(false);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port: u16 = env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let base_url = format!("http://{}:{}", host, port);

        let stripe = StripeSettings {
            api_key: env::var("STRIPE_API_KEY").unwrap_or_default(),
            api_base: env::var("STRIPE_API_BASE")
                .unwrap_or_else(|_| DEFAULT_STRIPE_API_BASE.to_string()),
            success_url: env::var("STRIPE_SUCCESS_URL")
                .unwrap_or_else(|_| format!("{}/payment/success", base_url)),
            cancel_url: env::var("STRIPE_CANCEL_URL")
                .unwrap_or_else(|_| format!("{}/payment/cancel", base_url)),
        };

        if stripe.api_key.is_empty() {
            tracing::warn!("STRIPE_API_KEY is not set; payment endpoints will fail");
        }

        Self {
            host,
            port,
            database_path: env::var("DATABASE_PATH").unwrap_or_else(|_| "paydesk.db".to_string()),
            dev_mode,
            stripe,
            max_upload_bytes: env::var("MAX_UPLOAD_BYTES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5 * 1024 * 1024),
            pdf_max_rows: env::var("PDF_MAX_ROWS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|&rows: &usize| rows > 0)
                .unwrap_or(100),
            bootstrap_admin_email: env::var("BOOTSTRAP_ADMIN_EMAIL").ok(),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

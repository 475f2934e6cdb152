use std::env;
use tracing::warn;

const DEFAULT_SLOT_TIMEZONE: &str = "UTC";
const DEFAULT_SERVER_PORT: u16 = 3000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    /// Zone used to read the hour of an appointment: "UTC", "local" or a "+HH:MM" offset.
    pub opd_slot_timezone: String,
    pub server_port: u16,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            opd_slot_timezone: env::var("OPD_SLOT_TIMEZONE")
                .unwrap_or_else(|_| {
                    warn!("OPD_SLOT_TIMEZONE not set, using {}", DEFAULT_SLOT_TIMEZONE);
                    DEFAULT_SLOT_TIMEZONE.to_string()
                }),
            server_port: parse_port(env::var("PORT").ok()),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty() && !self.supabase_anon_key.is_empty()
    }
}

fn parse_port(raw: Option<String>) -> u16 {
    match raw {
        Some(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("PORT value {:?} is not a valid port, using {}", value, DEFAULT_SERVER_PORT);
            DEFAULT_SERVER_PORT
        }),
        None => DEFAULT_SERVER_PORT,
    }
}

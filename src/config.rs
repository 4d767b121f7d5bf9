use clap::{Parser, ValueEnum};

// Which delivery mechanism sends the notification
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    // Resend transactional email API
    Resend,
    // Write the message to the log instead of sending it
    Log,
}

// CLI argument structure, every flag can also come from the environment
#[derive(Parser, Debug, Clone)]
#[command(name = "location-relay")]
#[command(about = "Relays device location reports to email")]
pub struct Args {
    // Port to run the server on
    #[arg(short, long, env = "PORT", default_value_t = 10000)]
    pub port: u16,

    // Bearer tokens allowed to call /send-location (comma-separated)
    #[arg(
        long,
        env = "ALLOWED_TOKENS",
        default_value = "",
        hide_env_values = true,
        hide_default_value = true
    )]
    pub allowed_tokens: String,

    #[arg(long, env = "TRANSPORT", value_enum, default_value_t = TransportKind::Resend)]
    pub transport: TransportKind,

    #[arg(long, env = "RESEND_API_KEY", hide_env_values = true)]
    pub resend_api_key: Option<String>,

    // Base url of the email API, overridable for staging
    #[arg(long, env = "RESEND_API_URL", default_value = "https://api.resend.com")]
    pub resend_api_url: String,

    // Sender identity, e.g. "Tracker <alerts@example.com>"
    #[arg(long, env = "MAIL_FROM")]
    pub mail_from: Option<String>,

    // Used to build a map link when the device sends none
    #[arg(long, env = "MAPS_BASE_URL", default_value = "https://maps.google.com")]
    pub maps_base_url: String,

    // Max requests per IP per window
    #[arg(long, env = "IP_RATE_LIMIT", default_value_t = 30)]
    pub ip_rate_limit: u32,

    // Max requests per device per window
    #[arg(long, env = "DEVICE_RATE_LIMIT", default_value_t = 10)]
    pub device_rate_limit: u32,

    // Rate limit window in seconds
    #[arg(long, env = "RATE_WINDOW", default_value_t = 60)]
    pub rate_window: u64,

    // Timeout for one delivery attempt in seconds
    #[arg(long, env = "SEND_TIMEOUT", default_value_t = 15)]
    pub send_timeout: u64,

    // How often expired rate limit entries are dropped, in seconds
    #[arg(long, env = "SWEEP_INTERVAL", default_value_t = 60)]
    pub sweep_interval: u64,

    // Take the client IP from X-Forwarded-For (only behind a trusted proxy)
    #[arg(long, env = "TRUST_FORWARDED_FOR", default_value_t = false)]
    pub trust_forwarded_for: bool,

    // Include the rejection reason in 401 bodies
    #[arg(long, env = "DISCLOSE_AUTH_REASON", default_value_t = false)]
    pub disclose_auth_reason: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limit_defaults() {
        let args = Args::try_parse_from(["location-relay"]).unwrap();
        assert_eq!(args.ip_rate_limit, 30);
        assert_eq!(args.device_rate_limit, 10);
        assert_eq!(args.rate_window, 60);
        assert_eq!(args.send_timeout, 15);
        assert_eq!(args.transport, TransportKind::Resend);
    }

    #[test]
    fn flags_override_defaults() {
        let args = Args::try_parse_from([
            "location-relay",
            "--port",
            "8081",
            "--allowed-tokens",
            "abc123,def456",
            "--transport",
            "log",
            "--trust-forwarded-for",
        ])
        .unwrap();
        assert_eq!(args.port, 8081);
        assert_eq!(args.allowed_tokens, "abc123,def456");
        assert_eq!(args.transport, TransportKind::Log);
        assert!(args.trust_forwarded_for);
    }
}

use clap::Parser;
use np_core::notifier::validate_amount;
use np_web::ServerConfig;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Poll timeout written as `30s`, `1m`, `1m30s` or bare seconds.
#[derive(Debug, Clone, PartialEq)]
struct PollTimeout(Duration);

impl FromStr for PollTimeout {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let mut seconds = 0u64;
        let mut digits = String::new();

        for c in s.trim().chars() {
            if c.is_ascii_digit() {
                digits.push(c);
                continue;
            }
            let value: u64 = digits
                .parse()
                .map_err(|_| format!("Poll timeout unit '{}' needs a number before it", c))?;
            seconds += match c {
                's' => value,
                'm' => value * 60,
                'h' => value * 3600,
                _ => return Err(format!("Unknown poll timeout unit '{}', use s, m or h", c)),
            };
            digits.clear();
        }
        if !digits.is_empty() {
            seconds += digits.parse::<u64>().map_err(|e| e.to_string())?;
        }

        if seconds == 0 {
            return Err("Poll timeout must be at least one second".to_string());
        }
        Ok(PollTimeout(Duration::from_secs(seconds)))
    }
}

fn parse_amount_arg(s: &str) -> std::result::Result<f64, String> {
    let amount = s.parse::<f64>().map_err(|e| e.to_string())?;
    validate_amount(amount).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Shared nutrition pad server with long-poll sync", long_about = None)]
pub struct Cli {
    #[arg(long, env = "NUTRITION_PAD_HOST", default_value = "0.0.0.0")]
    host: String,
    #[arg(long, env = "NUTRITION_PAD_PORT", default_value_t = 5001)]
    port: u16,
    /// How long a poll request is held open (e.g. 30s, 1m, 1m30s)
    #[arg(long, env = "NUTRITION_PAD_POLL_TIMEOUT", default_value = "30s")]
    poll_timeout: PollTimeout,
    /// Amount shared by all clients at startup, in grams
    #[arg(long, env = "NUTRITION_PAD_INITIAL_AMOUNT", default_value = "100", value_parser = parse_amount_arg)]
    initial_amount: f64,
    #[arg(long, default_value = "memory", help = "Food log backend. Available: memory")]
    storage: String,
    /// Used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            poll_timeout: self.poll_timeout.0,
            initial_amount: self.initial_amount,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&cli.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let storage = np_storage::create_storage(&cli.storage)?;
    let config = cli.server_config();
    info!("✨ Starting nutrition pad on {} (storage: {})", config.address(), cli.storage);

    np_web::serve(config, storage).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout() {
        assert_eq!("30s".parse::<PollTimeout>().unwrap().0, Duration::from_secs(30));
        assert_eq!("1m30s".parse::<PollTimeout>().unwrap().0, Duration::from_secs(90));
        assert_eq!("45".parse::<PollTimeout>().unwrap().0, Duration::from_secs(45));
        assert_eq!("1h".parse::<PollTimeout>().unwrap().0, Duration::from_secs(3600));
        assert!("".parse::<PollTimeout>().is_err());
        assert!("0s".parse::<PollTimeout>().is_err());
        assert!("1 m".parse::<PollTimeout>().is_err());
        assert_eq!(
            "5x".parse::<PollTimeout>().unwrap_err(),
            "Unknown poll timeout unit 'x', use s, m or h"
        );
        assert_eq!(
            "s".parse::<PollTimeout>().unwrap_err(),
            "Poll timeout unit 's' needs a number before it"
        );
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["nutrition-pad"]).unwrap();
        let config = cli.server_config();
        assert_eq!(config.port, 5001);
        assert_eq!(config.poll_timeout, Duration::from_secs(30));
        assert_eq!(config.initial_amount, 100.0);
        assert_eq!(cli.storage, "memory");
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "nutrition-pad",
            "--port",
            "8080",
            "--poll-timeout",
            "5s",
            "--initial-amount",
            "250",
        ])
        .unwrap();
        let config = cli.server_config();
        assert_eq!(config.address(), "0.0.0.0:8080");
        assert_eq!(config.poll_timeout, Duration::from_secs(5));
        assert_eq!(config.initial_amount, 250.0);
    }

    #[test]
    fn test_rejects_out_of_range_initial_amount() {
        assert!(Cli::try_parse_from(["nutrition-pad", "--initial-amount", "501"]).is_err());
        assert!(Cli::try_parse_from(["nutrition-pad", "--initial-amount", "many"]).is_err());
    }
}

use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub chain: ChainConfig,
    pub monitor: MonitorSettings,
    pub email: Option<EmailConfig>,
    pub database: DatabaseConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChainConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Sender address for state-changing calls (expiry sweeps). The node is
    /// expected to hold the key for this account.
    pub from_address: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MonitorSettings {
    /// Rentals with this much time left (or less) are surfaced as expiring.
    pub inclusion_threshold_secs: i64,
    /// Rentals with this much time left (or less) trigger a renter email.
    pub notification_threshold_secs: i64,
    pub poll_interval_secs: u64,
    pub sweep_batch_size: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        let config = config::Config::builder()
            .set_default("monitor.inclusion_threshold_secs", 600)?
            .set_default("monitor.notification_threshold_secs", 600)?
            .set_default("monitor.poll_interval_secs", 60)?
            .set_default("monitor.sweep_batch_size", 10)?
            .set_default("database.path", "rentwatch.db")?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::Environment::with_prefix("RENTWATCH").separator("__"))
            .build()?;

        let cfg: Config = config.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if !is_hex_address(&self.chain.contract_address) {
            anyhow::bail!(
                "Invalid contract address: {}",
                self.chain.contract_address
            );
        }
        if let Some(from) = &self.chain.from_address {
            if !is_hex_address(from) {
                anyhow::bail!("Invalid from address: {}", from);
            }
        }
        if self.monitor.inclusion_threshold_secs <= 0 {
            anyhow::bail!("inclusion_threshold_secs must be positive");
        }
        if self.monitor.notification_threshold_secs <= 0 {
            anyhow::bail!("notification_threshold_secs must be positive");
        }
        if self.monitor.sweep_batch_size == 0 {
            anyhow::bail!("sweep_batch_size must be at least 1");
        }
        Ok(())
    }
}

/// 0x-prefixed, 20-byte hex address.
pub fn is_hex_address(s: &str) -> bool {
    s.len() == 42
        && s.starts_with("0x")
        && s[2..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hex_address() {
        assert!(is_hex_address("0x1234567890abcdef1234567890abcdef12345678"));
        assert!(is_hex_address("0x0000000000000000000000000000000000000000"));
        assert!(!is_hex_address("1234567890abcdef1234567890abcdef12345678"));
        assert!(!is_hex_address("0x1234"));
        assert!(!is_hex_address("0x1234567890abcdef1234567890abcdef1234567g"));
    }
}

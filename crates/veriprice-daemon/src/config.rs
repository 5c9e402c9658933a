//! Configuration file management.
//!
//! `config.toml` lives in `$VERIPRICE_DATA_DIR` or `~/.veriprice`. Every
//! section and key is optional; missing values take the defaults below.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, ensure, Context};
use serde::{Deserialize, Serialize};
use veriprice_crypto::ed25519::SigningKey;
use veriprice_feeder::normalize::parse_price;
use veriprice_feeder::{RetryPolicy, UpdateDecider};
use veriprice_types::{Address, Price, ProducerId, ATTESTATION_FRESHNESS_SECS, MAX_AGE_SECS, MAX_CLOCK_SKEW_SECS};
use veriprice_verifier::VerifierParams;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "VERIPRICE_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Quote feed and debounce settings.
    #[serde(default)]
    pub feed: FeedConfig,
    /// Submission client settings.
    #[serde(default)]
    pub submission: SubmissionConfig,
    /// Verifier freshness windows, owner and alert bounds.
    #[serde(default)]
    pub verifier: VerifierConfig,
    /// Log settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Symbol requested from the quote source.
    #[serde(default = "default_symbol")]
    pub symbol: String,
    /// Label recorded in every quote payload.
    #[serde(default = "default_source_label")]
    pub source_label: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Minimum relative change, in percent, before a quote is published.
    #[serde(default = "default_debounce_pct")]
    pub debounce_pct: f64,
    #[serde(default = "default_producer_id")]
    pub producer_id: String,
    /// Price returned by the built-in stub source.
    #[serde(default = "default_stub_price")]
    pub stub_price: String,
    /// Proof scheme: "digest" | "ed25519".
    #[serde(default = "default_proof_scheme")]
    pub proof_scheme: String,
    /// Hex Ed25519 seed for the "ed25519" scheme. Empty = random per run.
    #[serde(default)]
    pub signing_key_hex: String,
}

/// Submission configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
    /// Safety margin added to fee estimates, in percent.
    #[serde(default = "default_fee_margin_pct")]
    pub fee_margin_pct: u32,
    /// Account that signs update calls.
    #[serde(default = "default_submitter")]
    pub submitter: Address,
    /// Fee charged per accepted call by the local ledger.
    #[serde(default = "default_call_cost")]
    pub call_cost: u64,
    /// Balance credited to the submitter at startup by the local ledger.
    #[serde(default = "default_initial_balance")]
    pub initial_balance: u64,
}

/// Verifier configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifierConfig {
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,
    #[serde(default = "default_attestation_freshness")]
    pub attestation_freshness_secs: u64,
    #[serde(default = "default_max_clock_skew")]
    pub max_clock_skew_secs: u64,
    /// Account allowed to change authorizations and thresholds.
    #[serde(default = "default_owner")]
    pub owner: Address,
    /// Upper alert bound as a decimal string.
    #[serde(default)]
    pub alert_upper: Option<String>,
    /// Lower alert bound as a decimal string.
    #[serde(default)]
    pub alert_lower: Option<String>,
    #[serde(default)]
    pub alerts_enabled: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions

fn default_symbol() -> String {
    "ETHUSD".to_string()
}

fn default_source_label() -> String {
    "stub".to_string()
}

fn default_poll_interval() -> u64 {
    30
}

fn default_debounce_pct() -> f64 {
    0.5
}

fn default_producer_id() -> String {
    "p1".to_string()
}

fn default_stub_price() -> String {
    veriprice_feeder::source::DEFAULT_STUB_PRICE.to_string()
}

fn default_proof_scheme() -> String {
    "digest".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_max_backoff_ms() -> u64 {
    8_000
}

fn default_fee_margin_pct() -> u32 {
    20
}

fn default_submitter() -> Address {
    Address([0xA1; 20])
}

fn default_call_cost() -> u64 {
    1_000
}

fn default_initial_balance() -> u64 {
    1_000_000_000
}

fn default_max_age() -> u64 {
    MAX_AGE_SECS
}

fn default_attestation_freshness() -> u64 {
    ATTESTATION_FRESHNESS_SECS
}

fn default_max_clock_skew() -> u64 {
    MAX_CLOCK_SKEW_SECS
}

fn default_owner() -> Address {
    Address([0x0A; 20])
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            symbol: default_symbol(),
            source_label: default_source_label(),
            poll_interval_secs: default_poll_interval(),
            debounce_pct: default_debounce_pct(),
            producer_id: default_producer_id(),
            stub_price: default_stub_price(),
            proof_scheme: default_proof_scheme(),
            signing_key_hex: String::new(),
        }
    }
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_ms: default_initial_backoff_ms(),
            max_backoff_ms: default_max_backoff_ms(),
            fee_margin_pct: default_fee_margin_pct(),
            submitter: default_submitter(),
            call_cost: default_call_cost(),
            initial_balance: default_initial_balance(),
        }
    }
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age(),
            attestation_freshness_secs: default_attestation_freshness(),
            max_clock_skew_secs: default_max_clock_skew(),
            owner: default_owner(),
            alert_upper: None,
            alert_lower: None,
            alerts_enabled: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Which proof scheme producer and verifier agree on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProofSchemeKind {
    Digest,
    Ed25519,
}

impl FeedConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn producer_id(&self) -> anyhow::Result<ProducerId> {
        ProducerId::new(self.producer_id.clone()).context("feed.producer_id")
    }

    pub fn decider(&self) -> anyhow::Result<UpdateDecider> {
        UpdateDecider::from_pct(self.debounce_pct).context("feed.debounce_pct")
    }

    pub fn proof_scheme(&self) -> anyhow::Result<ProofSchemeKind> {
        match self.proof_scheme.as_str() {
            "digest" => Ok(ProofSchemeKind::Digest),
            "ed25519" => Ok(ProofSchemeKind::Ed25519),
            other => bail!("feed.proof_scheme: unknown scheme {other:?}"),
        }
    }

    /// Ed25519 key from `signing_key_hex`; `None` when unset.
    pub fn signing_key(&self) -> anyhow::Result<Option<SigningKey>> {
        if self.signing_key_hex.is_empty() {
            return Ok(None);
        }
        let key = SigningKey::from_hex_seed(&self.signing_key_hex).context("feed.signing_key_hex")?;
        Ok(Some(key))
    }
}

impl SubmissionConfig {
    pub fn retry_policy(&self) -> anyhow::Result<RetryPolicy> {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
            Duration::from_millis(self.max_backoff_ms),
        )
        .context("submission.max_attempts")
    }
}

impl VerifierConfig {
    pub fn params(&self) -> VerifierParams {
        VerifierParams {
            max_age: self.max_age_secs,
            attestation_freshness: self.attestation_freshness_secs,
            max_clock_skew: self.max_clock_skew_secs,
        }
    }

    /// Parsed `(upper, lower)` alert bounds, if both are set.
    pub fn alert_bounds(&self) -> anyhow::Result<Option<(Price, Price)>> {
        match (&self.alert_upper, &self.alert_lower) {
            (Some(upper), Some(lower)) => {
                let upper = parse_price(upper).context("verifier.alert_upper")?;
                let lower = parse_price(lower).context("verifier.alert_lower")?;
                Ok(Some((upper, lower)))
            }
            (None, None) => Ok(None),
            _ => bail!("verifier.alert_upper and verifier.alert_lower must be set together"),
        }
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if the file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        let config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::from_toml(&content)?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Check every value the daemon will rely on.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.feed.poll_interval_secs > 0, "feed.poll_interval_secs must be positive");
        self.feed.producer_id()?;
        self.feed.decider()?;
        self.feed.proof_scheme()?;
        self.feed.signing_key()?;
        parse_price(&self.feed.stub_price).context("feed.stub_price")?;
        self.submission.retry_policy()?;

        let bounds = self.verifier.alert_bounds()?;
        if self.verifier.alerts_enabled {
            let Some((upper, lower)) = bounds else {
                bail!("verifier.alerts_enabled requires alert_upper and alert_lower");
            };
            ensure!(
                upper > lower,
                "verifier.alert_upper must be greater than verifier.alert_lower"
            );
        }
        Ok(())
    }

    /// Get the data directory path.
    pub fn data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".veriprice"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/veriprice"))
    }

    /// Get the config file path.
    fn config_path() -> PathBuf {
        Self::data_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.feed.symbol, "ETHUSD");
        assert_eq!(config.feed.poll_interval_secs, 30);
        assert_eq!(config.feed.producer_id, "p1");
        assert_eq!(config.submission.max_attempts, 3);
        assert_eq!(config.submission.fee_margin_pct, 20);
        assert_eq!(config.verifier.max_age_secs, 3600);
        assert_eq!(config.verifier.attestation_freshness_secs, 300);
        assert!(!config.verifier.alerts_enabled);
        assert_eq!(config.logging.level, "info");
        config.validate().expect("defaults are valid");
    }

    #[test]
    fn test_config_serialization() {
        let config = DaemonConfig::default();
        let toml_str = toml::to_string(&config).expect("serialize");
        let parsed = DaemonConfig::from_toml(&toml_str).expect("parse");
        assert_eq!(parsed.submission.submitter, config.submission.submitter);
        assert_eq!(parsed.verifier.owner, config.verifier.owner);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = DaemonConfig::from_toml(
            r#"
            [feed]
            debounce_pct = 5.0

            [verifier]
            owner = "0x0000000000000000000000000000000000000001"
            alert_upper = "2500"
            alert_lower = "1500"
            alerts_enabled = true
            "#,
        )
        .expect("parse");
        assert_eq!(config.feed.symbol, "ETHUSD");
        assert_eq!(config.feed.debounce_pct, 5.0);
        let mut owner = [0u8; 20];
        owner[19] = 1;
        assert_eq!(config.verifier.owner, Address(owner));
        assert_eq!(
            config.verifier.alert_bounds().expect("bounds"),
            Some((250_000_000_000, 150_000_000_000))
        );
        config.validate().expect("valid");
    }

    #[test]
    fn test_validation_failures() {
        let mut config = DaemonConfig::default();
        config.feed.debounce_pct = -1.0;
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.submission.max_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.verifier.alerts_enabled = true;
        assert!(config.validate().is_err(), "enabled alerts need bounds");

        config.verifier.alert_upper = Some("1500".into());
        config.verifier.alert_lower = Some("2500".into());
        assert!(config.validate().is_err(), "bounds must be ordered");

        let mut config = DaemonConfig::default();
        config.feed.proof_scheme = "rsa".into();
        assert!(config.validate().is_err());

        let mut config = DaemonConfig::default();
        config.feed.stub_price = "free".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_signing_key() {
        let mut config = DaemonConfig::default();
        assert!(config.feed.signing_key().expect("empty").is_none());
        config.feed.signing_key_hex = "07".repeat(32);
        let key = config.feed.signing_key().expect("seed").expect("configured");
        assert_eq!(key.verifying_key(), SigningKey::from_bytes(&[7u8; 32]).verifying_key());
        config.feed.signing_key_hex = "07".into();
        assert!(config.feed.signing_key().is_err());
    }
}

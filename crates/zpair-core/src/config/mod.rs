use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Backtest,
    Paper,
    Live,
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunMode::Backtest => write!(f, "backtest"),
            RunMode::Paper => write!(f, "paper"),
            RunMode::Live => write!(f, "live"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PairConfig {
    pub name: String,
    pub symbol_long: String,
    pub symbol_short: String,
    pub lookback_bars: usize,
    pub entry_zscore: f64,
    pub exit_zscore: f64,
    pub max_holding_bars: u32,
    pub notional_per_leg: f64,
}

/// Portfolio-wide caps. Validated here, enforced by an external pre-trade
/// gate rather than the strategy.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RiskConfig {
    pub max_total_notional: f64,
    pub max_pairs_open: u32,
    pub max_daily_loss: f64,
    pub max_position_per_symbol: f64,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DataConfig {
    /// Symbol to OHLCV CSV path.
    pub csv: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PaperConfig {
    pub max_cycles: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub mode: RunMode,
    pub poll_interval_seconds: u64,
    #[serde(default = "default_starting_cash")]
    pub starting_cash: f64,
    pub pairs: Vec<PairConfig>,
    pub risk: RiskConfig,
    pub data: Option<DataConfig>,
    pub paper: Option<PaperConfig>,
}

fn default_starting_cash() -> f64 {
    crate::venue::paper::DEFAULT_STARTING_CASH
}

impl PairConfig {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("pair name must not be empty".to_string()));
        }
        if self.symbol_long == self.symbol_short {
            return Err(Error::Config(format!(
                "pair {}: long and short symbols must differ",
                self.name
            )));
        }
        if self.lookback_bars == 0 || self.max_holding_bars == 0 {
            return Err(Error::Config(format!(
                "pair {}: lookback and holding periods must be positive",
                self.name
            )));
        }
        if !is_positive(self.entry_zscore) || !is_positive(self.exit_zscore) {
            return Err(Error::Config(format!(
                "pair {}: z-score thresholds must be greater than zero",
                self.name
            )));
        }
        if !is_positive(self.notional_per_leg) {
            return Err(Error::Config(format!(
                "pair {}: notional per leg must be positive",
                self.name
            )));
        }
        Ok(())
    }
}

impl RiskConfig {
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("max_total_notional", self.max_total_notional),
            ("max_daily_loss", self.max_daily_loss),
            ("max_position_per_symbol", self.max_position_per_symbol),
        ];
        if let Some((field, _)) = limits.iter().find(|(_, value)| !is_positive(*value)) {
            return Err(Error::Config(format!("risk.{field} must be positive")));
        }
        if self.max_pairs_open == 0 {
            return Err(Error::Config(
                "risk.max_pairs_open must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

impl RunConfig {
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_seconds == 0 {
            return Err(Error::Config(
                "poll_interval_seconds must be positive".to_string(),
            ));
        }
        if !is_positive(self.starting_cash) {
            return Err(Error::Config("starting_cash must be positive".to_string()));
        }
        if self.pairs.is_empty() {
            return Err(Error::Config("at least one pair is required".to_string()));
        }

        let mut names = HashSet::new();
        for pair in &self.pairs {
            pair.validate()?;
            if !names.insert(pair.name.as_str()) {
                return Err(Error::Config(format!("duplicate pair name: {}", pair.name)));
            }
        }
        self.risk.validate()
    }

    pub fn pair(&self, name: &str) -> Option<&PairConfig> {
        self.pairs.iter().find(|pair| pair.name == name)
    }

    pub fn csv_paths(&self) -> BTreeMap<String, String> {
        self.data
            .as_ref()
            .map(|data| data.csv.clone())
            .unwrap_or_default()
    }
}

fn is_positive(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

/// Parses and validates a run config. The format follows the extension:
/// `.toml` or `.json`.
pub fn load_run_config(path: &Path) -> Result<RunConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        Error::Config(format!("failed to read config {}: {}", path.display(), err))
    })?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    let config: RunConfig = match ext.as_str() {
        "toml" => toml::from_str(&contents).map_err(|err| {
            Error::Config(format!("failed to parse TOML {}: {}", path.display(), err))
        })?,
        "json" => serde_json::from_str(&contents).map_err(|err| {
            Error::Config(format!("failed to parse JSON {}: {}", path.display(), err))
        })?,
        _ => {
            return Err(Error::Config(format!(
                "unsupported config format for {}: use TOML or JSON",
                path.display()
            )))
        }
    };

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::{load_run_config, RunConfig, RunMode};
    use crate::error::Error;
    use std::fs;

    const SAMPLE: &str = r#"
mode = "paper"
poll_interval_seconds = 60

[[pairs]]
name = "KO_PEP"
symbol_long = "KO"
symbol_short = "PEP"
lookback_bars = 50
entry_zscore = 2.0
exit_zscore = 0.5
max_holding_bars = 200
notional_per_leg = 5000.0

[[pairs]]
name = "XOM_CVX"
symbol_long = "XOM"
symbol_short = "CVX"
lookback_bars = 30
entry_zscore = 1.5
exit_zscore = 0.25
max_holding_bars = 100
notional_per_leg = 2500.0

[risk]
max_total_notional = 50000.0
max_pairs_open = 2
max_daily_loss = 1000.0
max_position_per_symbol = 10000.0

[data.csv]
KO = "data/ko.csv"
"#;

    fn parse(toml_str: &str) -> RunConfig {
        toml::from_str(toml_str).expect("config should parse")
    }

    #[test]
    fn parse_sample_config() {
        let config = parse(SAMPLE);
        assert_eq!(config.mode, RunMode::Paper);
        assert_eq!(config.pairs.len(), 2);
        assert_eq!(config.risk.max_pairs_open, 2);
        assert_eq!(config.starting_cash, 100_000.0);
        assert_eq!(config.csv_paths().get("KO").map(String::as_str), Some("data/ko.csv"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_lookback_is_rejected() {
        let mut config = parse(SAMPLE);
        config.pairs[0].lookback_bars = 0;
        let err = config.validate().expect_err("invalid lookback");
        assert!(matches!(err, Error::Config(msg) if msg.contains("lookback")));
    }

    #[test]
    fn non_positive_thresholds_and_limits_are_rejected() {
        let mut config = parse(SAMPLE);
        config.pairs[1].exit_zscore = 0.0;
        assert!(config.validate().is_err());

        let mut config = parse(SAMPLE);
        config.risk.max_daily_loss = -1.0;
        let err = config.validate().expect_err("invalid risk");
        assert!(err.to_string().contains("max_daily_loss"));
    }

    #[test]
    fn duplicate_pair_names_are_rejected() {
        let mut config = parse(SAMPLE);
        config.pairs[1].name = "KO_PEP".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let toml_str = format!("unknown_field = 1\n{SAMPLE}");
        let err = toml::from_str::<RunConfig>(&toml_str).expect_err("unknown field");
        assert!(err.to_string().to_lowercase().contains("unknown field"));
    }

    #[test]
    fn load_reads_json_and_rejects_other_extensions() {
        let dir = std::env::temp_dir();
        let json_path = dir.join("zpair_config_test.json");
        let config = parse(SAMPLE);
        fs::write(&json_path, serde_json::to_string(&config).expect("json")).expect("write");
        assert_eq!(load_run_config(&json_path).expect("load json"), config);

        let yaml_path = dir.join("zpair_config_test.yaml");
        fs::write(&yaml_path, "mode: paper").expect("write");
        assert!(matches!(load_run_config(&yaml_path), Err(Error::Config(_))));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let path = std::env::temp_dir().join("zpair-missing-config.toml");
        let err = load_run_config(&path).expect_err("expected load to fail");
        assert!(err.to_string().contains("failed to read config"));
    }
}

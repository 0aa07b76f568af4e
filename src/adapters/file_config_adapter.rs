//! INI file configuration adapter.

use crate::domain::error::SimError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::fs;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SimError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        Self::from_string(&content).map_err(|reason| SimError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.config
            .getint(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.config
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.config
            .get(section, key)
            .as_deref()
            .and_then(Self::parse_bool)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[backtest]
ticker = BTCUSDT
interval = 5m
initial_balance = 2500.5
warmup = 30

[strategy]
name = Scalper
leverage = 5

[sqlite]
path = barsim.db
"#;

    #[test]
    fn reads_strings_across_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "ticker"),
            Some("BTCUSDT".to_string())
        );
        assert_eq!(
            adapter.get_string("strategy", "name"),
            Some("Scalper".to_string())
        );
        assert_eq!(
            adapter.get_string("sqlite", "path"),
            Some("barsim.db".to_string())
        );
    }

    #[test]
    fn missing_keys_and_sections() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("nope", "ticker"), None);
        assert!(!adapter.has_key("csv", "dir"));
    }

    #[test]
    fn typed_getters_with_defaults() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("backtest", "warmup", 0), 30);
        assert_eq!(adapter.get_int("backtest", "missing", 42), 42);
        assert_eq!(adapter.get_int("backtest", "ticker", 7), 7);
        assert_eq!(adapter.get_double("backtest", "initial_balance", 0.0), 2500.5);
        assert_eq!(adapter.get_double("backtest", "ticker", 9.5), 9.5);
        assert_eq!(adapter.get_double("strategy", "leverage", 0.0), 5.0);
    }

    #[test]
    fn bool_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[run]\na = yes\nb = off\nc = 1\nd = maybe\n").unwrap();
        assert!(adapter.get_bool("run", "a", false));
        assert!(!adapter.get_bool("run", "b", true));
        assert!(adapter.get_bool("run", "c", false));
        assert!(adapter.get_bool("run", "d", true));
        assert!(!adapter.get_bool("run", "missing", false));
    }

    #[test]
    fn require_string_reports_missing() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.require_string("backtest", "interval").unwrap(), "5m");
        match adapter.require_string("csv", "dir") {
            Err(SimError::ConfigMissing { section, key }) => {
                assert_eq!(section, "csv");
                assert_eq!(key, "dir");
            }
            other => panic!("expected ConfigMissing, got {other:?}"),
        }
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[csv]\ndir = /data/bars\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("csv", "dir"),
            Some("/data/bars".to_string())
        );
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/barsim.ini");
        assert!(matches!(result, Err(SimError::Io(_))));
    }
}

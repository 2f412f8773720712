//! INI file configuration adapter.

use crate::domain::error::SigtraderError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SigtraderError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SigtraderError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SigtraderError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SigtraderError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
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
            .as_ref()
            .and_then(|v| Self::parse_bool(v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    const SAMPLE: &str = r#"
[backtest]
symbol = AAPL
data_dir = data
initial_capital = 10000.0
commission_pct = 0.1
close_open_position = false
strategies = combined, sma

[sma]
fast_period = 10
slow_period = 30

[combined]
buy_threshold = 2.5
sell_threshold = -2.5

[report]
output = out/report.json
"#;

    #[test]
    fn from_string_parses_config() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "symbol"),
            Some("AAPL".to_string())
        );
        assert_eq!(
            adapter.get_string("backtest", "strategies"),
            Some("combined, sma".to_string())
        );
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("out/report.json".to_string())
        );
    }

    #[test]
    fn get_string_returns_none_for_missing_key() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
    }

    #[test]
    fn get_int_returns_value_or_default() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("sma", "fast_period", 0), 10);
        assert_eq!(adapter.get_int("ema", "fast_period", 12), 12);
    }

    #[test]
    fn get_int_returns_default_for_non_numeric() {
        let adapter = FileConfigAdapter::from_string("[sma]\nfast_period = abc\n").unwrap();
        assert_eq!(adapter.get_int("sma", "fast_period", 20), 20);
    }

    #[test]
    fn get_double_returns_value() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_double("combined", "sell_threshold", 0.0), -2.5);
        assert_eq!(
            adapter.get_double("backtest", "initial_capital", 0.0),
            10000.0
        );
    }

    #[test]
    fn get_double_returns_default_for_missing_or_non_numeric() {
        let adapter =
            FileConfigAdapter::from_string("[backtest]\ninitial_capital = not_a_number\n")
                .unwrap();
        assert_eq!(adapter.get_double("backtest", "initial_capital", 99.9), 99.9);
        assert_eq!(adapter.get_double("backtest", "missing", 1.5), 1.5);
    }

    #[test]
    fn get_bool_values() {
        let adapter = FileConfigAdapter::from_string(
            "[backtest]\na = true\nb = yes\nc = 1\nd = false\ne = off\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("backtest", "a", false));
        assert!(adapter.get_bool("backtest", "b", false));
        assert!(adapter.get_bool("backtest", "c", false));
        assert!(!adapter.get_bool("backtest", "d", true));
        assert!(!adapter.get_bool("backtest", "e", true));
        assert!(!adapter.get_bool("backtest", "f", true));
    }

    #[test]
    fn get_bool_returns_default_for_missing_or_garbage() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nflag = maybe\n").unwrap();
        assert!(adapter.get_bool("backtest", "missing", true));
        assert!(!adapter.get_bool("backtest", "flag", false));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(SAMPLE);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert!(!adapter.get_bool("backtest", "close_open_position", true));
    }

    #[test]
    fn from_file_missing_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/config.ini").unwrap_err();
        match err {
            SigtraderError::ConfigParse { file, .. } => {
                assert_eq!(file, "/nonexistent/path/config.ini")
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}

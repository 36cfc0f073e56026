//! INI file configuration adapter.

use crate::domain::error::SizerError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SizerError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| SizerError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, SizerError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| SizerError::ConfigParse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
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

    const FULL_CONFIG: &str = r#"
[portfolio]
value = 2500.0
scaling_factor = 0.5
max_positions = 8

[estimation]
lookback_days = 126
risk_free_rate = 0.045

[options]
use_greeks = yes
top_n = 5

[data]
directory = ./data
tickers = SNDL, BITF ,MARA
"#;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn reads_every_section() {
        let adapter = FileConfigAdapter::from_string(FULL_CONFIG).unwrap();
        assert_eq!(adapter.get_double("portfolio", "value", 0.0), 2500.0);
        assert_eq!(adapter.get_int("portfolio", "max_positions", 0), 8);
        assert_eq!(adapter.get_int("estimation", "lookback_days", 0), 126);
        assert_eq!(adapter.get_double("estimation", "risk_free_rate", 0.0), 0.045);
        assert!(adapter.get_bool("options", "use_greeks", false));
        assert_eq!(
            adapter.get_string("data", "directory"),
            Some("./data".to_string())
        );
    }

    #[test]
    fn get_list_trims_entries() {
        let adapter = FileConfigAdapter::from_string(FULL_CONFIG).unwrap();
        assert_eq!(adapter.get_list("data", "tickers"), vec!["SNDL", "BITF", "MARA"]);
        assert!(adapter.get_list("data", "missing").is_empty());
    }

    #[test]
    fn missing_keys_fall_back() {
        let adapter = FileConfigAdapter::from_string("[portfolio]\n").unwrap();
        assert_eq!(adapter.get_string("portfolio", "value"), None);
        assert_eq!(adapter.get_string("missing_section", "key"), None);
        assert_eq!(adapter.get_int("portfolio", "max_positions", 10), 10);
        assert_eq!(adapter.get_double("portfolio", "value", 1000.0), 1000.0);
        assert!(adapter.get_bool("options", "use_greeks", true));
    }

    #[test]
    fn non_numeric_values_fall_back() {
        let adapter = FileConfigAdapter::from_string(
            "[portfolio]\nvalue = lots\nmax_positions = many\n",
        )
        .unwrap();
        assert_eq!(adapter.get_double("portfolio", "value", 1000.0), 1000.0);
        assert_eq!(adapter.get_int("portfolio", "max_positions", 10), 10);
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[options]\na = true\nb = no\nc = on\nd = 0\ne = maybe\n",
        )
        .unwrap();
        assert!(adapter.get_bool("options", "a", false));
        assert!(!adapter.get_bool("options", "b", true));
        assert!(adapter.get_bool("options", "c", false));
        assert!(!adapter.get_bool("options", "d", true));
        assert!(adapter.get_bool("options", "e", true));
    }

    #[test]
    fn from_file_reads_config() {
        let file = create_temp_config(FULL_CONFIG);
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_int("options", "top_n", 3), 5);
    }

    #[test]
    fn from_file_reports_parse_error_with_path() {
        let result = FileConfigAdapter::from_file("/nonexistent/path/kellysizer.ini");
        match result {
            Err(SizerError::ConfigParse { file, .. }) => {
                assert!(file.contains("kellysizer.ini"))
            }
            _ => panic!("expected ConfigParse error"),
        }
    }
}

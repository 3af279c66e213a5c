//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut config = Ini::new();
        config.load(path).map_err(std::io::Error::other)?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut config = Ini::new();
        config.read(content.to_string())?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
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

    #[test]
    fn from_string_parses_rule_section() {
        let content = r#"
[data]
path = /var/data/bars
symbol = XJO

[rules]
entry_lph_lpl = true
gap_handling = yes
stop_loss_percent = 1.5

[report]
output = trades.csv
"#;
        let adapter = FileConfigAdapter::from_string(content).unwrap();
        assert_eq!(
            adapter.get_string("data", "path"),
            Some("/var/data/bars".to_string())
        );
        assert!(adapter.get_bool("rules", "entry_lph_lpl", false));
        assert!(adapter.get_bool("rules", "gap_handling", false));
        assert_eq!(adapter.get_double("rules", "stop_loss_percent", 1.0), 1.5);
        assert_eq!(
            adapter.get_string("report", "output"),
            Some("trades.csv".to_string())
        );
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let adapter = FileConfigAdapter::from_string("[rules]\n").unwrap();
        assert_eq!(adapter.get_string("rules", "missing"), None);
        assert_eq!(adapter.get_int("rules", "missing", 42), 42);
        assert_eq!(adapter.get_double("rules", "missing", 0.5), 0.5);
        assert!(adapter.get_bool("rules", "missing", true));
        assert!(!adapter.get_bool("rules", "missing", false));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let adapter =
            FileConfigAdapter::from_string("[rules]\nstop_loss_percent = lots\n").unwrap();
        assert_eq!(adapter.get_double("rules", "stop_loss_percent", 1.0), 1.0);
    }

    #[test]
    fn bool_spellings() {
        let adapter = FileConfigAdapter::from_string(
            "[rules]\na = true\nb = yes\nc = 1\nd = false\ne = no\nf = 0\n",
        )
        .unwrap();
        assert!(adapter.get_bool("rules", "a", false));
        assert!(adapter.get_bool("rules", "b", false));
        assert!(adapter.get_bool("rules", "c", false));
        assert!(!adapter.get_bool("rules", "d", true));
        assert!(!adapter.get_bool("rules", "e", true));
        assert!(!adapter.get_bool("rules", "f", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[data]\nsymbol = SPI\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(adapter.get_string("data", "symbol"), Some("SPI".to_string()));
    }

    #[test]
    fn from_file_returns_error_for_missing_file() {
        assert!(FileConfigAdapter::from_file("/nonexistent/pivotrader.ini").is_err());
    }
}

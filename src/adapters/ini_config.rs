//! INI file configuration adapter.

use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

pub struct IniConfig {
    ini: Ini,
}

impl IniConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> std::io::Result<Self> {
        let mut ini = Ini::new();
        ini.load(path).map_err(std::io::Error::other)?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, String> {
        let mut ini = Ini::new();
        ini.read(content.to_string())?;
        Ok(Self { ini })
    }
}

fn truthy(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl ConfigPort for IniConfig {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.ini.getint(section, key).ok().flatten().unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.ini
            .getfloat(section, key)
            .ok()
            .flatten()
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.ini
            .get(section, key)
            .as_deref()
            .and_then(truthy)
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[store]
path = data/stocks.db
pool_size = 2

[ingest]
data_dir = data/dumps
workers = 5
request_delay_ms = 500

[benchmark]
index_name = NIFTY 50

[reconcile]
cutover_date = 2025-01-01
refresh_index = yes
"#;

    #[test]
    fn reads_screener_sections() {
        let config = IniConfig::from_string(SAMPLE).unwrap();
        assert_eq!(
            config.get_string("store", "path"),
            Some("data/stocks.db".to_string())
        );
        assert_eq!(config.get_int("ingest", "workers", 1), 5);
        assert_eq!(config.get_int("ingest", "request_delay_ms", 0), 500);
        assert_eq!(
            config.get_string("benchmark", "index_name"),
            Some("NIFTY 50".to_string())
        );
        assert!(config.get_bool("reconcile", "refresh_index", false));
    }

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = IniConfig::from_string("[store]\npath = x.db\n").unwrap();
        assert_eq!(config.get_string("ingest", "data_dir"), None);
        assert_eq!(config.get_int("ingest", "workers", 5), 5);
        assert_eq!(config.get_double("reconcile", "threshold", 0.3), 0.3);
        assert!(!config.get_bool("reconcile", "refresh_index", false));
    }

    #[test]
    fn non_numeric_values_fall_back_to_defaults() {
        let config = IniConfig::from_string("[ingest]\nworkers = many\n").unwrap();
        assert_eq!(config.get_int("ingest", "workers", 5), 5);
    }

    #[test]
    fn bool_spellings() {
        let config =
            IniConfig::from_string("[a]\nx = on\ny = off\nz = maybe\n").unwrap();
        assert!(config.get_bool("a", "x", false));
        assert!(!config.get_bool("a", "y", true));
        // Unrecognized spellings keep the default.
        assert!(config.get_bool("a", "z", true));
        assert!(!config.get_bool("a", "z", false));
    }

    #[test]
    fn load_reads_a_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{SAMPLE}").unwrap();
        let config = IniConfig::load(file.path()).unwrap();
        assert_eq!(config.get_int("store", "pool_size", 4), 2);
    }

    #[test]
    fn load_missing_file_errors() {
        assert!(IniConfig::load("/nonexistent/fnoscreen.ini").is_err());
    }
}

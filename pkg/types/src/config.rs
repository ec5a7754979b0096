use serde::{Deserialize, Serialize};

/// Operator configuration file (YAML).
///
/// Example `config.yaml`:
/// ```yaml
/// data-dir: /var/lib/kedars/data
/// metrics-port: 9022
/// resync-interval: 5
/// scaler-timeout: 10
/// log-format: json
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperatorConfigFile {
    #[serde(default, alias = "data-dir")]
    pub data_dir: Option<String>,
    #[serde(default, alias = "metrics-port")]
    pub metrics_port: Option<u16>,
    /// Seconds between store rescans for new or deleted ScaledObjects
    #[serde(default, alias = "resync-interval")]
    pub resync_interval: Option<u64>,
    /// Upper bound in seconds on a single scaler query
    #[serde(default, alias = "scaler-timeout")]
    pub scaler_timeout: Option<u64>,
    /// "text" or "json"
    #[serde(default, alias = "log-format")]
    pub log_format: Option<String>,
}

/// Load a YAML config file, returning the default if the file doesn't exist.
pub fn load_config_file<T: serde::de::DeserializeOwned + Default>(path: &str) -> anyhow::Result<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Ok(T::default());
        }
        Err(e) => return Err(e.into()),
    };
    let config: T = serde_yaml::from_str(&content)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let cfg: OperatorConfigFile =
            load_config_file("/nonexistent/kedars/config.yaml").unwrap();
        assert!(cfg.data_dir.is_none());
        assert!(cfg.metrics_port.is_none());
    }

    #[test]
    fn parses_kebab_case_keys() {
        let yaml = "data-dir: /var/lib/kedars\nmetrics-port: 9100\nscaler-timeout: 3\nlog-format: json\n";
        let cfg: OperatorConfigFile = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(cfg.data_dir.as_deref(), Some("/var/lib/kedars"));
        assert_eq!(cfg.metrics_port, Some(9100));
        assert_eq!(cfg.scaler_timeout, Some(3));
        assert_eq!(cfg.log_format.as_deref(), Some("json"));
    }
}

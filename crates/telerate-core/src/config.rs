//! Rate aggregator configuration (TOML).

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

const SAMPLE_CONFIG: &str = r#"## The period on which to flush & clear the aggregator.
period = "30s"
## If true, the original samples are dropped by the host and only the
## derived rate records are forwarded.
drop_original = false

## Series name -> fields whose rate of change is computed each period.
[fields]
docker_container_net = ["rx_bytes", "tx_bytes", "rx_packets", "tx_packets"]
docker_container_blkio = ["io_service_bytes_recursive_read", "io_service_bytes_recursive_write"]
"#;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateConfig {
    #[serde(default = "default_period")]
    pub period: String,
    #[serde(default)]
    pub drop_original: bool,
    #[serde(default)]
    pub fields: HashMap<String, Vec<String>>,
}

fn default_period() -> String {
    "30s".to_string()
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            period: default_period(),
            drop_original: false,
            fields: HashMap::new(),
        }
    }
}

impl RateConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        let config: RateConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// The documented example configuration.
    pub fn sample() -> Self {
        // SAMPLE_CONFIG is a compile-time constant covered by tests.
        toml::from_str(SAMPLE_CONFIG).unwrap_or_default()
    }

    /// The commented TOML text of [`RateConfig::sample`].
    pub fn sample_toml() -> &'static str {
        SAMPLE_CONFIG
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.period_duration()?;
        for (series, fields) in &self.fields {
            let mut seen = HashSet::new();
            for field in fields {
                if field.is_empty() {
                    return Err(ConfigError::EmptyFieldName(series.clone()));
                }
                if !seen.insert(field.as_str()) {
                    return Err(ConfigError::DuplicateField {
                        series: series.clone(),
                        field: field.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Parsed flush period. Zero is rejected.
    pub fn period_duration(&self) -> ConfigResult<Duration> {
        match parse_duration(&self.period) {
            Some(d) if !d.is_zero() => Ok(d),
            _ => Err(ConfigError::InvalidPeriod(self.period.clone())),
        }
    }

    pub fn rate_spec(&self) -> RateSpec {
        RateSpec::new(self.fields.clone())
    }
}

/// Series name to the fields eligible for rate computation.
///
/// Read-only once handed to the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RateSpec {
    fields: HashMap<String, Vec<String>>,
}

impl RateSpec {
    pub fn new(fields: HashMap<String, Vec<String>>) -> Self {
        Self { fields }
    }

    /// Fields to rate for `series`; empty when the series is not configured.
    pub fn fields_for(&self, series: &str) -> &[String] {
        self.fields.get(series).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn series(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }
}

impl<S, F, I> FromIterator<(S, I)> for RateSpec
where
    S: Into<String>,
    F: Into<String>,
    I: IntoIterator<Item = F>,
{
    fn from_iter<T: IntoIterator<Item = (S, I)>>(iter: T) -> Self {
        let fields = iter
            .into_iter()
            .map(|(series, fields)| {
                (series.into(), fields.into_iter().map(Into::into).collect())
            })
            .collect();
        Self { fields }
    }
}

/// Parse a duration string like "30s", "500ms", "2m".
fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if let Some(secs) = s.strip_suffix('s') {
        if let Some(ms) = secs.strip_suffix('m') {
            ms.parse::<u64>().ok().map(Duration::from_millis)
        } else {
            secs.parse::<u64>().ok().map(Duration::from_secs)
        }
    } else if let Some(mins) = s.strip_suffix('m') {
        mins.parse::<u64>()
            .ok()
            .and_then(|m| m.checked_mul(60))
            .map(Duration::from_secs)
    } else {
        s.parse::<u64>().ok().map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn sample_config_parses_and_validates() {
        let config = RateConfig::from_toml_str(RateConfig::sample_toml()).unwrap();
        assert_eq!(config, RateConfig::sample());
        assert_eq!(config.period_duration().unwrap(), Duration::from_secs(30));
        assert!(!config.drop_original);
        assert_eq!(
            config.rate_spec().fields_for("docker_container_net").len(),
            4
        );
    }

    #[test]
    fn minimal_config_uses_defaults() {
        let config = RateConfig::from_toml_str("").unwrap();
        assert_eq!(config, RateConfig::default());
        assert!(config.rate_spec().is_empty());
    }

    #[test]
    fn parse_with_fields() {
        let config = RateConfig::from_toml_str(
            r#"
period = "10s"
drop_original = true

[fields]
m1 = ["a", "b", "f", "g"]
"#,
        )
        .unwrap();
        assert!(config.drop_original);
        assert_eq!(config.rate_spec().fields_for("m1"), ["a", "b", "f", "g"]);
        assert!(config.rate_spec().fields_for("m2").is_empty());
    }

    #[test]
    fn rejects_zero_and_garbage_periods() {
        for period in ["0s", "soon", "", "-5s"] {
            let toml = format!("period = {period:?}");
            let err = RateConfig::from_toml_str(&toml).unwrap_err();
            assert!(matches!(err, ConfigError::InvalidPeriod(_)), "{period}: {err}");
        }
    }

    #[test]
    fn rejects_duplicate_field() {
        let err = RateConfig::from_toml_str("[fields]\nm1 = [\"a\", \"a\"]").unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateField { .. }));
    }

    #[test]
    fn rejects_empty_field_name() {
        let err = RateConfig::from_toml_str("[fields]\nm1 = [\"\"]").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyFieldName(s) if s == "m1"));
    }

    #[test]
    fn parse_error_is_reported() {
        let err = RateConfig::from_toml_str("period = ").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn round_trips_through_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let rendered = RateConfig::sample().to_toml_string().unwrap();
        file.write_all(rendered.as_bytes()).unwrap();

        let loaded = RateConfig::from_file(file.path()).unwrap();
        assert_eq!(loaded, RateConfig::sample());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RateConfig::from_file(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn parse_duration_units() {
        assert_eq!(parse_duration("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_duration("500ms"), Some(Duration::from_millis(500)));
        assert_eq!(parse_duration("2m"), Some(Duration::from_secs(120)));
        assert_eq!(parse_duration("15"), Some(Duration::from_secs(15)));
        assert_eq!(parse_duration("fast"), None);
    }

    #[test]
    fn overflowing_minutes_are_invalid() {
        assert_eq!(parse_duration("307445734561825861m"), None);
        let err = RateConfig::from_toml_str("period = \"307445734561825861m\"").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPeriod(_)));
    }

    #[test]
    fn rate_spec_from_iter() {
        let spec: RateSpec = [("m1", vec!["a", "b"])].into_iter().collect();
        assert_eq!(spec.fields_for("m1"), ["a", "b"]);
        assert_eq!(spec.series().collect::<Vec<_>>(), vec!["m1"]);
    }
}

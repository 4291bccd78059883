use crate::error::{AppError, Result};
use crate::parser::DEFAULT_FAILURE_THRESHOLD;
use crate::repair::FillPolicy;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,
    #[serde(default)]
    pub loader: LoaderConfig,
    #[serde(default)]
    pub plot: PlotConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DataConfig {
    #[serde(default = "default_directory")]
    pub directory: PathBuf,
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

fn default_directory() -> PathBuf {
    PathBuf::from(".")
}

fn default_extensions() -> Vec<String> {
    vec!["csv".to_string(), "txt".to_string()]
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            directory: default_directory(),
            extensions: default_extensions(),
        }
    }
}

impl DataConfig {
    /// Whether `filename` ends in one of the configured extensions (case-insensitive).
    pub fn has_known_extension(&self, filename: &str) -> bool {
        Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|ext| {
                self.extensions
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }

    /// Data files in the configured directory, sorted by path.
    pub fn discover_files(&self) -> Vec<PathBuf> {
        let mut files = Vec::new();
        for ext in &self.extensions {
            let pattern = self.directory.join(format!("*.{}", ext));
            let Some(pattern) = pattern.to_str() else {
                continue;
            };
            match glob::glob(pattern) {
                Ok(paths) => files.extend(paths.filter_map(|p| p.ok())),
                Err(e) => warn!("Invalid data file pattern '{}': {}", pattern, e),
            }
        }
        files.sort();
        files.dedup();
        files
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoaderConfig {
    #[serde(default = "default_policy")]
    pub default_policy: FillPolicy,
    #[serde(
        default = "default_failure_threshold",
        deserialize_with = "deserialize_ratio"
    )]
    pub failure_threshold: f64,
}

fn default_policy() -> FillPolicy {
    FillPolicy::Drop
}

fn default_failure_threshold() -> f64 {
    DEFAULT_FAILURE_THRESHOLD
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            default_policy: default_policy(),
            failure_threshold: default_failure_threshold(),
        }
    }
}

/// Custom deserializer that handles a ratio as both number and string
///
/// Accepts:
/// - `failure_threshold: 0.1` (number)
/// - `failure_threshold: "0.1"` (string that parses to number)
/// - `failure_threshold: ${FAILURE_THRESHOLD}` (env var substituted to either)
fn deserialize_ratio<'de, D>(deserializer: D) -> std::result::Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RatioValue {
        Number(f64),
        String(String),
    }

    match RatioValue::deserialize(deserializer)? {
        RatioValue::Number(n) => Ok(n),
        RatioValue::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid ratio: '{}'", s))),
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PlotConfig {
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Charts with more buckets than this are drawn as lines, otherwise as bars.
    #[serde(default = "default_line_threshold")]
    pub line_threshold: usize,
    #[serde(default = "default_width")]
    pub width: u32,
    #[serde(default = "default_height")]
    pub height: u32,
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("plots")
}

fn default_line_threshold() -> usize {
    25
}

fn default_width() -> u32 {
    1024
}

fn default_height() -> u32 {
    576
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            line_threshold: default_line_threshold(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            warn!(
                "Config file {} not found, using defaults",
                path.display()
            );
            return Ok(Self::default());
        }
        Self::load(path)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Non-empty, dot-free file extensions
    /// - A failure threshold within [0, 1]
    /// - Non-zero chart dimensions
    fn validate(&self) -> Result<()> {
        if self.data.extensions.is_empty() {
            return Err(AppError::Config(
                "At least one data file extension must be configured".to_string(),
            ));
        }

        for ext in &self.data.extensions {
            if ext.is_empty() || ext.contains('.') {
                return Err(AppError::Config(format!(
                    "Data file extension '{}' must be non-empty and given without a dot (e.g., 'csv')",
                    ext
                )));
            }
        }

        if !(0.0..=1.0).contains(&self.loader.failure_threshold) {
            return Err(AppError::Config(format!(
                "Loader failure_threshold {} must be between 0 and 1",
                self.loader.failure_threshold
            )));
        }

        if self.plot.width == 0 || self.plot.height == 0 {
            return Err(AppError::Config(format!(
                "Plot size {}x{} must be non-zero",
                self.plot.width, self.plot.height
            )));
        }

        if self.plot.line_threshold == 0 {
            warn!("Plot line_threshold is 0, every chart will be drawn as lines");
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid env var pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root\n\
             2. Set the missing variable{}: export {}=<value>\n\
             3. Or remove the reference from the config file",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
        )));
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert_eq!(config.data.extensions, vec!["csv", "txt"]);
        assert_eq!(config.loader.default_policy, FillPolicy::Drop);
        assert_eq!(config.plot.line_threshold, 25);
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
data:
  directory: data
  extensions: [csv]
loader:
  default_policy: forward-fill
  failure_threshold: "0.25"
plot:
  output_dir: out
  line_threshold: 30
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.data.directory, PathBuf::from("data"));
        assert_eq!(config.loader.default_policy, FillPolicy::ForwardFill);
        assert_eq!(config.loader.failure_threshold, 0.25);
        assert_eq!(config.plot.line_threshold, 30);
        assert_eq!(config.plot.width, 1024);
    }

    #[test]
    fn test_unknown_policy_rejected() {
        let yaml = "loader:\n  default_policy: interpolate\n";
        assert!(matches!(Config::from_yaml(yaml), Err(AppError::Config(_))));
    }

    #[test]
    fn test_threshold_out_of_range() {
        let yaml = "loader:\n  failure_threshold: 1.5\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("between 0 and 1"));
    }

    #[test]
    fn test_missing_env_var() {
        let yaml = "data:\n  directory: ${ZONE_CONSUMPTION_TEST_UNSET_DIR}\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(err.to_string().contains("ZONE_CONSUMPTION_TEST_UNSET_DIR"));
    }

    #[test]
    fn test_has_known_extension() {
        let data = DataConfig::default();
        assert!(data.has_known_extension("2008.csv"));
        assert!(data.has_known_extension("logs/2008.CSV"));
        assert!(data.has_known_extension("2008.txt"));
        assert!(!data.has_known_extension("2008.xlsx"));
        assert!(!data.has_known_extension("2008"));
    }
}

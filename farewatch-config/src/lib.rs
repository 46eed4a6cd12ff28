//! Loader for crawl configuration with YAML + environment overlays.
//!
//! Sources are merged in the order they are added, with `FAREWATCH__`
//! environment variables (double-underscore separated, e.g.
//! `FAREWATCH__CRAWL__RETRY__MAX_RETRIES=4`) layered on top. After merging,
//! every string value gets `${VAR}` expansion before the typed
//! [`FarewatchConfig`] is built.
//!
//! Expected shape (only `search` is required):
//!
//! ```yaml
//! search:
//!   departure_airport: SGN
//!   arrival_airport: HAN
//!   trip_type: oneway          # or roundtrip (then return_date is required)
//!   departure_date: today      # or DD/MM/YYYY
//!   find_cheapest: false
//! airports:
//!   - { code: SGN, city: Ho Chi Minh, airport_name: Tan Son Nhat, country: Vietnam }
//! crawl:
//!   site: vietjet_vi
//!   horizon: { mode: fixed, days: 15 }
//!   retry: { max_retries: 2, delay_ms: 5000 }
//! browser:
//!   webdriver_url: http://localhost:9515
//!   headless: true
//! ```
use config::{Config, ConfigError, Environment, File};
use farewatch_common::{
    Airport, AirportDirectory, BrowserSettings, CrawlSettings, LoggingSettings, SearchConfig,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct FarewatchConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub airports: Vec<Airport>,
    #[serde(default)]
    pub crawl: CrawlSettings,
    #[serde(default)]
    pub browser: BrowserSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FarewatchConfig {
    pub fn airport_directory(&self) -> AirportDirectory {
        AirportDirectory::new(self.airports.iter().cloned())
    }
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Environment values arrive as strings; coerce the obvious scalars so
/// overrides like `FAREWATCH__BROWSER__HEADLESS=false` type-check.
fn coerce_scalars(v: &mut Value) {
    match v {
        Value::String(s) => {
            if let Ok(b) = s.parse::<bool>() {
                *v = Value::Bool(b);
            } else if let Ok(n) = s.parse::<u64>() {
                *v = Value::from(n);
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(coerce_scalars),
        Value::Object(obj) => obj.values_mut().for_each(coerce_scalars),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML + env overrides).
pub struct FarewatchConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for FarewatchConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl FarewatchConfigLoader {
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Like [`with_file`](Self::with_file) but tolerates a missing file.
    pub fn with_optional_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(false));
        self
    }

    /// Allow tests/CLI to merge inline YAML snippets.
    ///
    /// ```
    /// use farewatch_config::FarewatchConfigLoader;
    ///
    /// let cfg = FarewatchConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// search:
    ///   departure_airport: SGN
    ///   arrival_airport: HAN
    ///   departure_date: "31/01/2025"
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.search.departure_airport, "SGN");
    /// assert_eq!(cfg.crawl.retry.max_retries, 2);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Consume the builder and deserialize the merged sources into strongly
    /// typed config. Environment overrides are applied last.
    pub fn load(self) -> Result<FarewatchConfig, ConfigError> {
        let base: Value = self.builder.build()?.try_deserialize()?;
        let mut overrides: Value = Config::builder()
            .add_source(Environment::with_prefix("FAREWATCH").separator("__"))
            .build()?
            .try_deserialize()?;
        coerce_scalars(&mut overrides);

        let mut v = base;
        merge(&mut v, overrides);
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(b), Value::Object(o)) => {
            for (k, v) in o {
                merge(b.entry(k).or_insert(Value::Null), v);
            }
        }
        (slot, v) => *slot = v,
    }
}

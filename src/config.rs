pub use config::{Config, Environment, File as ConfigFile};
pub use once_cell::sync::OnceCell;

use crate::error::{Result, UtxoError};

static GLOBAL_CONFIG: OnceCell<Config> = OnceCell::new();

pub const DEFAULT_ESPLORA_URL: &str = "https://blockstream.info/api";

/// Load `config.toml` (optional) with `RUSTYUTXO__SECTION__KEY` env overrides.
pub fn load_config(path: &str) -> Result<Config> {
    let config = Config::builder()
        .add_source(ConfigFile::with_name(path).required(false))
        .add_source(Environment::with_prefix("RUSTYUTXO").separator("__"))
        .build()?;
    Ok(config)
}

pub fn init_global_config(path: &str) -> Result<()> {
    let config = load_config(path)?;
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| UtxoError::Config("Config already set".to_string()))?;
    Ok(())
}

pub fn get_global_config() -> Option<&'static Config> {
    GLOBAL_CONFIG.get()
}

/// Typed engine settings with defaults for every missing key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    pub esplora_base_url: String,
    pub timeout_secs: u64,
    pub user_agent: String,
    pub max_concurrent_fetches: usize,
    pub derivation_address_count: u32,
    pub derivation_include_change: bool,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            esplora_base_url: DEFAULT_ESPLORA_URL.to_string(),
            timeout_secs: 10,
            user_agent: format!("rustyutxo/{}", env!("CARGO_PKG_VERSION")),
            max_concurrent_fetches: 8,
            derivation_address_count: 20,
            derivation_include_change: false,
        }
    }
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();

        let esplora_base_url = config
            .get_string("esplora.base_url")
            .unwrap_or(defaults.esplora_base_url);
        let timeout_secs = config
            .get_int("esplora.timeout_secs")
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v as u64)
            .unwrap_or(defaults.timeout_secs);
        let user_agent = config
            .get_string("esplora.user_agent")
            .unwrap_or(defaults.user_agent);
        let max_concurrent_fetches = config
            .get_int("fetch.max_concurrent")
            .ok()
            .filter(|v| *v > 0)
            .map(|v| v as usize)
            .unwrap_or(defaults.max_concurrent_fetches);
        let derivation_address_count = config
            .get_int("derivation.address_count")
            .ok()
            .filter(|v| *v > 0 && *v <= 1000)
            .map(|v| v as u32)
            .unwrap_or(defaults.derivation_address_count);
        let derivation_include_change = config
            .get_bool("derivation.include_change")
            .unwrap_or(defaults.derivation_include_change);

        Self {
            esplora_base_url,
            timeout_secs,
            user_agent,
            max_concurrent_fetches,
            derivation_address_count,
            derivation_include_change,
        }
    }

    /// Settings from the global config, or defaults when it was never loaded.
    pub fn current() -> Self {
        get_global_config()
            .map(Self::from_config)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent");
        let config = load_config(path.to_str().unwrap()).unwrap();
        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.esplora_base_url, DEFAULT_ESPLORA_URL);
        assert_eq!(settings.max_concurrent_fetches, 8);
        assert_eq!(settings.derivation_address_count, 20);
    }

    #[test]
    fn test_values_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("engine.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[esplora]\nbase_url = \"https://mempool.space/testnet/api\"\ntimeout_secs = 3\n\n[fetch]\nmax_concurrent = 2\n\n[derivation]\naddress_count = 5\ninclude_change = true"
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap()).unwrap();
        let settings = EngineSettings::from_config(&config);
        assert_eq!(settings.esplora_base_url, "https://mempool.space/testnet/api");
        assert_eq!(settings.timeout_secs, 3);
        assert_eq!(settings.max_concurrent_fetches, 2);
        assert_eq!(settings.derivation_address_count, 5);
        assert!(settings.derivation_include_change);
    }

    #[test]
    fn test_zero_concurrency_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zero.toml");
        std::fs::write(&path, "[fetch]\nmax_concurrent = 0\n").unwrap();
        let config = load_config(path.to_str().unwrap()).unwrap();
        assert_eq!(EngineSettings::from_config(&config).max_concurrent_fetches, 8);
    }

    // Only test that touches the process-wide config.
    #[test]
    fn test_current_reads_global_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("global.toml");
        std::fs::write(&path, "[esplora]\ntimeout_secs = 3\n").unwrap();

        init_global_config(path.to_str().unwrap()).unwrap();
        assert_eq!(EngineSettings::current().timeout_secs, 3);
        assert_eq!(EngineSettings::current().max_concurrent_fetches, 8);
        assert!(matches!(init_global_config(path.to_str().unwrap()), Err(UtxoError::Config(_))));
    }
}

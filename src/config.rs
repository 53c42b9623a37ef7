use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::readiness::WaiterSettings;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    pub waiter: WaiterConfig,
    pub roster: RosterConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WaiterConfig {
    pub max_attempts: u32,
    pub interval_ms: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RosterConfig {
    pub path: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OutputConfig {
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            waiter: WaiterConfig {
                max_attempts: 20,
                interval_ms: 250,
            },
            roster: RosterConfig { path: None },
            output: OutputConfig { json: false },
        }
    }
}

thread_local! {
    static TEST_CONFIG_PATH: RefCell<Option<PathBuf>> = const { RefCell::new(None) };
}

#[cfg(test)]
pub fn set_test_config_path(path: PathBuf) {
    TEST_CONFIG_PATH.with(|p| *p.borrow_mut() = Some(path));
}

impl Config {
    pub fn config_path() -> Result<PathBuf> {
        #[cfg(test)]
        {
            if let Some(path) = TEST_CONFIG_PATH.with(|p| p.borrow().clone()) {
                return Ok(path);
            }
        }

        Ok(dirs::home_dir()
            .context("Could not find home directory")?
            .join(".botdock.toml"))
    }

    pub fn load() -> Result<Option<Config>> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&config_path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&content).context("Failed to parse config file")?;

        Ok(Some(config))
    }

    pub fn save(&self, silent: bool) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&config_path, content).context("Failed to write config file")?;

        if !silent {
            println!("✅ Configuration saved to: {}", config_path.display());
        }

        Ok(())
    }

    pub fn waiter_settings(&self) -> WaiterSettings {
        WaiterSettings {
            max_attempts: self.waiter.max_attempts,
            interval: Duration::from_millis(self.waiter.interval_ms),
        }
    }
}

// CLI helper functions
pub fn create_default_config(overwrite: bool) -> Result<()> {
    let config = Config::default();
    if !std::fs::exists(Config::config_path()?)? || overwrite {
        config.save(true)?;

        println!("📝 Created default configuration file.");
        println!("📍 Adjust the owner wait budget or roster path:");
        println!("   botdock config set max-attempts ...");
        println!("or");
        println!("   {}", Config::config_path()?.display());
    } else {
        println!("Configuration already exists.  Pass `--overwrite` to overwrite.");
    }

    Ok(())
}

pub fn show_config() -> Result<()> {
    match Config::load()? {
        Some(config) => {
            println!("🔧 Current configuration:");
            println!("   Max Attempts: {}", config.waiter.max_attempts);
            println!("   Interval (ms): {}", config.waiter.interval_ms);
            println!(
                "   Roster Path: {}",
                match &config.roster.path {
                    Some(path) => path.display().to_string(),
                    None => "Default (~/.botdock-roster.json)".to_string(),
                }
            );
            println!("   JSON Output: {}", config.output.json);
        }
        None => {
            println!("❌ No configuration file found.");
            println!("   Run 'botdock config init' to create one.");
        }
    }
    Ok(())
}

pub fn set_config_value(key: &str, value: &str) -> Result<()> {
    let mut config = Config::load()?.unwrap_or_default();

    match key {
        "max-attempts" => {
            let attempts = value.parse::<u32>().context("Invalid number value")?;
            config.waiter.max_attempts = attempts;
        }
        "interval-ms" => {
            let interval = value.parse::<u64>().context("Invalid number value")?;
            config.waiter.interval_ms = interval;
        }
        "roster-path" => {
            config.roster.path = Some(PathBuf::from(value));
        }
        "json" => {
            let enabled = value
                .parse::<bool>()
                .context("Invalid boolean value. Use 'true' or 'false'")?;
            config.output.json = enabled;
        }
        _ => anyhow::bail!("Unknown config key: {}", key),
    }

    config.save(false)?;
    Ok(())
}

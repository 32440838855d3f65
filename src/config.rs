use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;

/// Main configuration structure for the gift advisor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub gifts: GiftDefaults,
    pub openrouter: OpenRouterConfig,
    pub unsplash: UnsplashConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory holding the browser front-end
    pub static_dir: String,
}

/// Defaults folded into the system instruction when the query leaves them out
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GiftDefaults {
    pub currency: String,
    pub minimum_price: String,
    pub age: String,
    pub event: String,
    pub gender: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default)]
    pub api_key: Option<String>,
    pub api_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: i32,
    pub referer: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsplashConfig {
    #[serde(default)]
    pub access_key: Option<String>,
    pub api_url: String,
    pub width: u32,
    pub height: u32,
}

impl Config {
    /// Load configuration from file with environment variable overrides
    /// ALWAYS returns a valid config - never fails
    pub fn load() -> Self {
        let env_paths = ["../.env", ".env"];

        let mut env_loaded = false;
        for path in &env_paths {
            if dotenvy::from_path(path).is_ok() {
                tracing::info!("Loaded .env from: {}", path);
                env_loaded = true;
                break;
            }
        }

        if !env_loaded {
            tracing::warn!("No .env file found - continuing with env vars only");
        }

        let config_path =
            env::var("GIFT_CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());

        let mut config = if Path::new(&config_path).exists() {
            match fs::read_to_string(&config_path) {
                Ok(contents) => match serde_yaml::from_str::<Config>(&contents) {
                    Ok(config) => {
                        tracing::info!("Loaded configuration from {}", config_path);
                        config
                    }
                    Err(e) => {
                        tracing::error!(
                            "Failed to parse config file {}: {} - using defaults",
                            config_path,
                            e
                        );
                        Self::default()
                    }
                },
                Err(e) => {
                    tracing::error!(
                        "Failed to read config file {}: {} - using defaults",
                        config_path,
                        e
                    );
                    Self::default()
                }
            }
        } else {
            tracing::debug!("Config file not found at {} - using defaults", config_path);
            Self::default()
        };

        config.apply_env_overrides(|key| env::var(key).ok());

        if let Err(e) = config.validate() {
            tracing::warn!("Config validation warnings: {} - continuing anyway", e);
        }

        config
    }

    /// Apply environment variable overrides. `lookup` is `std::env::var` outside tests.
    fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("BIND_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("PORT") {
            match port.parse() {
                Ok(port_num) => self.server.port = port_num,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }
        if let Some(dir) = lookup("STATIC_DIR") {
            self.server.static_dir = dir;
        }

        // Gift defaults. The minimum price follows the currency unless set explicitly.
        if let Some(currency) = lookup("DEFAULT_CURRENCY") {
            self.gifts.minimum_price = default_minimum_price(&currency);
            self.gifts.currency = currency;
        }
        if let Some(min) = lookup("MINIMUM_PRICE") {
            self.gifts.minimum_price = min;
        }
        if let Some(age) = lookup("DEFAULT_AGE") {
            self.gifts.age = age;
        }
        if let Some(event) = lookup("DEFAULT_EVENT") {
            self.gifts.event = event;
        }
        if let Some(gender) = lookup("DEFAULT_GENDER") {
            self.gifts.gender = gender;
        }

        // OpenRouter overrides
        if let Some(api_key) = lookup("OPENROUTER_API_KEY") {
            self.openrouter.api_key = Some(api_key);
        }
        if let Some(url) = lookup("OPENROUTER_API_URL") {
            self.openrouter.api_url = url;
        }
        if let Some(model) = lookup("OPENROUTER_MODEL") {
            self.openrouter.model = model;
        }

        // Unsplash overrides
        if let Some(key) = lookup("UNSPLASH_ACCESS_KEY") {
            self.unsplash.access_key = Some(key);
        }
        if let Some(url) = lookup("UNSPLASH_API_URL") {
            self.unsplash.api_url = url;
        }
    }

    /// Validate configuration
    fn validate(&self) -> Result<(), Box<dyn std::error::Error>> {
        if self.server.port == 0 {
            return Err("Server port cannot be 0".into());
        }
        if !(0.0..=2.0).contains(&self.openrouter.temperature) {
            return Err("OpenRouter temperature must be between 0.0 and 2.0".into());
        }
        if self.openrouter.max_tokens <= 0 {
            return Err("OpenRouter max_tokens must be positive".into());
        }
        if !self.openrouter_key_present() {
            return Err("OPENROUTER_API_KEY environment variable must be set".into());
        }
        if !self.unsplash_key_present() {
            return Err("UNSPLASH_ACCESS_KEY not set - placeholder images will be used".into());
        }
        Ok(())
    }

    pub fn openrouter_key_present(&self) -> bool {
        self.openrouter
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    pub fn unsplash_key_present(&self) -> bool {
        self.unsplash
            .access_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty())
    }

    /// Socket address the HTTP server binds to
    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| {
                anyhow::anyhow!(
                    "Invalid bind address {}:{}: {e}",
                    self.server.host,
                    self.server.port
                )
            })
    }
}

fn default_minimum_price(currency: &str) -> String {
    let min = if currency == "USD" { "50" } else { "50000" };
    min.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                static_dir: "public".to_string(),
            },
            gifts: GiftDefaults {
                currency: "USD".to_string(),
                minimum_price: default_minimum_price("USD"),
                age: "unspecified".to_string(),
                event: "general occasion".to_string(),
                gender: "unspecified".to_string(),
            },
            openrouter: OpenRouterConfig {
                api_key: None,
                api_url: "https://openrouter.ai/api/v1/chat/completions".to_string(),
                model: "google/gemini-2.0-flash-exp:free".to_string(),
                temperature: 0.7,
                max_tokens: 500,
                referer: "http://localhost:3000".to_string(),
                title: "AI Gift Advisor".to_string(),
            },
            unsplash: UnsplashConfig {
                access_key: None,
                api_url: "https://api.unsplash.com/search/photos".to_string(),
                width: 400,
                height: 300,
            },
        }
    }
}

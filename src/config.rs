// Copyright (C) 2025 Matías Salinas (support@fenden.com)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use once_cell::sync::OnceCell;
use std::env;

/// Distributed lock TTL, in seconds. The holder of `lock:<fingerprint>`
/// auto-expires after this long if it never releases.
pub const LOCK_TTL_SEC: u64 = 30;

/// Poll interval used by peers waiting on a leader to publish a result.
pub const LOCK_SLEEP_MS: u64 = 250;

/// Upper bound on how long a peer waits before giving up and calling
/// upstream itself.
pub const LOCK_MAX_WAIT_SEC: u64 = 5;

/// Application-wide configuration, sourced entirely from environment
/// variables (optionally loaded from a `.env` file in development).
#[derive(Debug, Clone)]
pub struct Config {
    /// API key attached to every upstream request via `Authorization`.
    pub ors_api_key: String,

    /// Redis connection string for the shared cache/lock store.
    pub redis_url: String,

    /// Shared secret every non-health, non-metrics request must present
    /// via `X-Proxy-Token`.
    pub proxy_token: String,

    /// Base URL of the upstream routing/geocoding provider.
    pub ors_base_url: String,

    /// TTL applied to every `cache:<fingerprint>` entry, in seconds.
    pub cache_ttl_sec: u64,

    /// Port the HTTP server listens on.
    pub port: u16,
}

/// Global, lazily-initialized config object shared across the application.
pub static CONFIG: OnceCell<Config> = OnceCell::new();

fn default_ors_base_url() -> String {
    "https://api.openrouteservice.org".to_string()
}

fn default_cache_ttl_sec() -> u64 {
    86400
}

fn default_port() -> u16 {
    5000
}

impl Config {
    /// Reads configuration from the process environment.
    ///
    /// `ORS_API_KEY`, `REDIS_URL`, and `PROXY_TOKEN` are required; startup
    /// must fail fast with a clear message if any is unset or empty.
    pub fn from_env() -> Result<Self, String> {
        let ors_api_key = required_env("ORS_API_KEY")?;
        let redis_url = required_env("REDIS_URL")?;
        let proxy_token = required_env("PROXY_TOKEN")?;

        let ors_base_url = env::var("ORS_BASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(default_ors_base_url);

        let cache_ttl_sec = match env::var("CACHE_TTL_SEC") {
            Ok(v) if !v.trim().is_empty() => v
                .trim()
                .parse::<u64>()
                .map_err(|_| format!("CACHE_TTL_SEC must be a non-negative integer, got '{v}'"))?,
            _ => default_cache_ttl_sec(),
        };

        let port = match env::var("PORT") {
            Ok(v) if !v.trim().is_empty() => v
                .trim()
                .parse::<u16>()
                .map_err(|_| format!("PORT must be a valid port number, got '{v}'"))?,
            _ => default_port(),
        };

        Ok(Config {
            ors_api_key,
            redis_url,
            proxy_token,
            ors_base_url,
            cache_ttl_sec,
            port,
        })
    }
}

fn required_env(name: &str) -> Result<String, String> {
    match env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(format!("Требуется переменная окружения {name}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize tests that touch them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_vars() {
        for var in [
            "ORS_API_KEY",
            "REDIS_URL",
            "PROXY_TOKEN",
            "ORS_BASE_URL",
            "CACHE_TTL_SEC",
            "PORT",
        ] {
            env::remove_var(var);
        }
    }

    #[test]
    fn missing_required_var_fails_fast() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        let result = Config::from_env();
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("ORS_API_KEY"));
    }

    #[test]
    fn defaults_apply_when_optional_vars_unset() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        env::set_var("ORS_API_KEY", "key");
        env::set_var("REDIS_URL", "redis://localhost");
        env::set_var("PROXY_TOKEN", "secret");

        let config = Config::from_env().expect("should parse with defaults");
        assert_eq!(config.ors_base_url, "https://api.openrouteservice.org");
        assert_eq!(config.cache_ttl_sec, 86400);
        assert_eq!(config.port, 5000);
        clear_vars();
    }

    #[test]
    fn explicit_overrides_are_honored() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        env::set_var("ORS_API_KEY", "key");
        env::set_var("REDIS_URL", "redis://localhost");
        env::set_var("PROXY_TOKEN", "secret");
        env::set_var("ORS_BASE_URL", "https://example.test");
        env::set_var("CACHE_TTL_SEC", "60");
        env::set_var("PORT", "8080");

        let config = Config::from_env().expect("should parse overrides");
        assert_eq!(config.ors_base_url, "https://example.test");
        assert_eq!(config.cache_ttl_sec, 60);
        assert_eq!(config.port, 8080);
        clear_vars();
    }

    #[test]
    fn malformed_numeric_var_fails() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_vars();
        env::set_var("ORS_API_KEY", "key");
        env::set_var("REDIS_URL", "redis://localhost");
        env::set_var("PROXY_TOKEN", "secret");
        env::set_var("CACHE_TTL_SEC", "not-a-number");

        let result = Config::from_env();
        assert!(result.is_err());
        clear_vars();
    }
}

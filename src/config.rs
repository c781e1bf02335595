// Runtime configuration, read once from the environment (and `.env`).

use crate::infra::billing::WhmcsConfig;
use anyhow::{bail, Result};
use std::path::PathBuf;

const DEFAULT_PREFIX: &str = "!";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_CALENDAR_POLL_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct BotConfig {
    pub token: String,
    pub prefix: String,
    pub data_dir: PathBuf,
    pub dev_guild_id: Option<u64>,
    pub calendar_poll_secs: u64,
    pub whmcs: Option<WhmcsConfig>,
    pub google_key_path: Option<String>,
    pub google_key_json: Option<String>,
}

impl BotConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup so tests don't touch the process env.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let Some(token) = get("DISCORD_TOKEN") else {
            bail!("Missing DISCORD_TOKEN environment variable! Create a .env file with your bot token.");
        };

        let dev_guild_id = get("DEV_GUILD_ID").and_then(|raw| match raw.parse::<u64>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::warn!("DEV_GUILD_ID `{}` is not a guild ID, registering globally", raw);
                None
            }
        });

        let calendar_poll_secs = match get("CALENDAR_POLL_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => secs,
                _ => {
                    tracing::warn!(
                        "CALENDAR_POLL_SECS `{}` is invalid, using {}",
                        raw,
                        DEFAULT_CALENDAR_POLL_SECS
                    );
                    DEFAULT_CALENDAR_POLL_SECS
                }
            },
            None => DEFAULT_CALENDAR_POLL_SECS,
        };

        let whmcs = match (get("WHMCS_URL"), get("WHMCS_IDENTIFIER"), get("WHMCS_SECRET")) {
            (Some(url), Some(identifier), Some(secret)) => Some(WhmcsConfig {
                url,
                identifier,
                secret,
                access_key: get("WHMCS_ACCESS_KEY"),
            }),
            (Some(_), _, _) => {
                tracing::warn!("WHMCS_URL is set without WHMCS_IDENTIFIER/WHMCS_SECRET, billing disabled");
                None
            }
            _ => None,
        };

        Ok(Self {
            token,
            prefix: get("BOT_PREFIX").unwrap_or_else(|| DEFAULT_PREFIX.to_string()),
            data_dir: PathBuf::from(get("DATA_DIR").unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())),
            dev_guild_id,
            calendar_poll_secs,
            whmcs,
            google_key_path: get("GOOGLE_SERVICE_ACCOUNT_KEY"),
            google_key_json: get("GOOGLE_SERVICE_ACCOUNT_JSON"),
        })
    }

    pub fn google_configured(&self) -> bool {
        self.google_key_path.is_some() || self.google_key_json.is_some()
    }

    pub fn data_file(&self, name: &str) -> PathBuf {
        self.data_dir.join(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<BotConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn token_is_required() {
        assert!(config_from(&[]).is_err());
        assert!(config_from(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[("DISCORD_TOKEN", "abc")]).unwrap();
        assert_eq!(config.prefix, "!");
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.calendar_poll_secs, 60);
        assert!(config.whmcs.is_none());
        assert!(!config.google_configured());
        assert_eq!(config.data_file("roles.json"), PathBuf::from("data/roles.json"));
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let config = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("CALENDAR_POLL_SECS", "soon"),
            ("DEV_GUILD_ID", "not-a-guild"),
        ])
        .unwrap();
        assert_eq!(config.calendar_poll_secs, 60);
        assert_eq!(config.dev_guild_id, None);
    }

    #[test]
    fn whmcs_needs_credentials() {
        let partial = config_from(&[("DISCORD_TOKEN", "abc"), ("WHMCS_URL", "https://billing.example")])
            .unwrap();
        assert!(partial.whmcs.is_none());

        let full = config_from(&[
            ("DISCORD_TOKEN", "abc"),
            ("WHMCS_URL", "https://billing.example"),
            ("WHMCS_IDENTIFIER", "id"),
            ("WHMCS_SECRET", "secret"),
        ])
        .unwrap();
        let whmcs = full.whmcs.unwrap();
        assert_eq!(whmcs.identifier, "id");
        assert!(whmcs.access_key.is_none());
    }
}

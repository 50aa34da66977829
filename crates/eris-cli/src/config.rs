use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};

use eris_discord::DEFAULT_API_BASE;
use eris_migrate::MigrationOptions;
use eris_migrate::retry::RetryPolicy;

/// Run parameters, from the environment (after `.env`) and the command line.
#[derive(Debug, Clone)]
pub struct Config {
    pub archive_dir: PathBuf,
    pub token: String,
    pub guild_id: String,
    pub api_base: String,
    pub options: MigrationOptions,
}

impl Config {
    /// `args` excludes the program name. The first positional argument, if
    /// any, is the archive directory and overrides `ERIS_ARCHIVE_DIR`.
    pub fn load(args: &[String]) -> Result<Self> {
        Self::from_lookup(args, |key| std::env::var(key).ok())
    }

    fn from_lookup(args: &[String], env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| env(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let archive_dir = args
            .first()
            .cloned()
            .or_else(|| var("ERIS_ARCHIVE_DIR"))
            .map(PathBuf::from)
            .ok_or_else(|| anyhow!("Usage: eris <archive folder> (or set ERIS_ARCHIVE_DIR)"))?;
        if !archive_dir.is_dir() {
            bail!("archive folder {} does not exist", archive_dir.display());
        }

        let token = var("DISCORD_TOKEN").ok_or_else(|| anyhow!("DISCORD_TOKEN is not set"))?;
        let guild_id =
            var("DISCORD_GUILD_ID").ok_or_else(|| anyhow!("DISCORD_GUILD_ID is not set"))?;
        if !guild_id.chars().all(|c| c.is_ascii_digit()) {
            bail!("DISCORD_GUILD_ID must be a numeric snowflake, got '{guild_id}'");
        }

        let parse_u64 = |key: &str, fallback: u64| -> Result<u64> {
            match var(key) {
                Some(v) => v.parse().with_context(|| format!("{key} must be an integer")),
                None => Ok(fallback),
            }
        };

        let concurrency = parse_u64("ERIS_REPLAY_CONCURRENCY", 4)?;
        if concurrency == 0 {
            bail!("ERIS_REPLAY_CONCURRENCY must be >= 1");
        }

        let defaults = RetryPolicy::default();
        let retry = RetryPolicy {
            max_retries: u32::try_from(parse_u64("ERIS_RETRY_MAX", 0)?)
                .context("ERIS_RETRY_MAX is too large")?,
            base_delay: Duration::from_millis(parse_u64(
                "ERIS_RETRY_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )?),
            max_delay: Duration::from_millis(parse_u64(
                "ERIS_RETRY_MAX_MS",
                defaults.max_delay.as_millis() as u64,
            )?),
        };

        Ok(Self {
            archive_dir,
            token,
            guild_id,
            api_base: var("DISCORD_API_BASE").unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            options: MigrationOptions {
                concurrency: concurrency as usize,
                retry,
                failures_dir: var("ERIS_FAILURES_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("failed")),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn tmp_archive() -> String {
        std::env::temp_dir().to_string_lossy().into_owned()
    }

    #[test]
    fn positional_archive_and_defaults() {
        let env = lookup(&[("DISCORD_TOKEN", "abc"), ("DISCORD_GUILD_ID", "1234")]);
        let cfg = Config::from_lookup(&[tmp_archive()], env).unwrap();
        assert_eq!(cfg.guild_id, "1234");
        assert_eq!(cfg.api_base, DEFAULT_API_BASE);
        assert_eq!(cfg.options.concurrency, 4);
        assert!(!cfg.options.retry.is_enabled());
        assert_eq!(cfg.options.failures_dir, PathBuf::from("failed"));
    }

    #[test]
    fn missing_archive_is_a_usage_error() {
        let env = lookup(&[("DISCORD_TOKEN", "abc"), ("DISCORD_GUILD_ID", "1234")]);
        let err = Config::from_lookup(&[], env).unwrap_err();
        assert!(err.to_string().starts_with("Usage: eris"));
    }

    #[test]
    fn rejects_bad_values() {
        let base = [("DISCORD_TOKEN", "abc"), ("DISCORD_GUILD_ID", "1234")];

        let mut zero = base.to_vec();
        zero.push(("ERIS_REPLAY_CONCURRENCY", "0"));
        assert!(Config::from_lookup(&[tmp_archive()], lookup(&zero)).is_err());

        let bad_guild = [("DISCORD_TOKEN", "abc"), ("DISCORD_GUILD_ID", "my-guild")];
        assert!(Config::from_lookup(&[tmp_archive()], lookup(&bad_guild)).is_err());

        let no_token = [("DISCORD_GUILD_ID", "1234")];
        assert!(Config::from_lookup(&[tmp_archive()], lookup(&no_token)).is_err());
    }

    #[test]
    fn retry_settings_from_env() {
        let env = lookup(&[
            ("DISCORD_TOKEN", "abc"),
            ("DISCORD_GUILD_ID", "1234"),
            ("ERIS_RETRY_MAX", "3"),
            ("ERIS_RETRY_BASE_MS", "250"),
        ]);
        let cfg = Config::from_lookup(&[tmp_archive()], env).unwrap();
        assert_eq!(cfg.options.retry.max_retries, 3);
        assert_eq!(cfg.options.retry.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.options.retry.max_delay, Duration::from_secs(30));
    }
}

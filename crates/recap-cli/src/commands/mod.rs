pub mod fetch;
pub mod guilds;
pub mod history;
pub mod login;
pub mod summarize;

use anyhow::{anyhow, bail, Context as _, Result};
use clap::Args;

use recap_core::{DiscordConfig, RecapConfig, RecapPaths, TimeWindow};
use recap_store::{CredentialVault, FileStore, Secret};

use crate::dates::parse_instant;
use crate::ui::StatusLine;

/// Channel and time window shared by `fetch` and `summarize`.
#[derive(Args, Debug, Clone)]
pub struct WindowArgs {
    /// Channel id. Defaults to the last channel summarized.
    #[arg(long)]
    pub channel: Option<String>,

    /// Start of the window (inclusive)
    #[arg(long)]
    pub from: String,

    /// End of the window (inclusive). Defaults to now.
    #[arg(long)]
    pub to: Option<String>,

    /// Upper bound on pages requested
    #[arg(long)]
    pub max_pages: Option<usize>,
}

impl WindowArgs {
    pub fn window(&self) -> Result<TimeWindow> {
        let from = parse_instant(&self.from).context("invalid --from")?;
        let to = self
            .to
            .as_deref()
            .map(parse_instant)
            .transpose()
            .context("invalid --to")?;

        let window = TimeWindow::new(from, to);
        if window.is_inverted() {
            bail!("End date must be after start date.");
        }
        Ok(window)
    }
}

/// Everything a command needs: data dir, config and the store.
pub struct Context {
    pub config: RecapConfig,
    pub store: FileStore,
    pub progress_json: bool,
}

impl Context {
    pub fn load(progress_json: bool) -> Result<Self> {
        let paths = RecapPaths::from_env();
        paths
            .ensure_dirs()
            .with_context(|| format!("failed to create {}", paths.base_dir.display()))?;

        let config = RecapConfig::load(&paths.config_path)
            .with_context(|| format!("failed to load {}", paths.config_path.display()))?;
        config.validate()?;

        let store = FileStore::open(&paths.store_path)?;

        Ok(Self {
            config,
            store,
            progress_json,
        })
    }

    pub fn vault(&self) -> CredentialVault<'_> {
        CredentialVault::new(&self.store)
    }

    /// A stored token, or an error pointing at `recap login`.
    pub fn token(&self, secret: Secret) -> Result<String> {
        self.vault()
            .secret(secret)?
            .ok_or_else(|| anyhow!("No {} token stored. Run `recap login` first.", secret.as_str()))
    }

    /// The explicit channel, else the one used last.
    pub fn channel_id(&self, explicit: Option<String>) -> Result<String> {
        if let Some(channel) = explicit {
            return Ok(channel);
        }
        let last = self.vault().load()?.channel_id;
        if last.is_empty() {
            return Err(anyhow!("No channel given. Pass --channel <ID>."));
        }
        Ok(last)
    }

    pub fn discord_config(&self, max_pages: Option<usize>) -> DiscordConfig {
        let mut config = self.config.discord.clone();
        if let Some(max_pages) = max_pages {
            config.max_pages = max_pages;
        }
        config
    }

    pub fn status(&self, stage: &'static str, message: &str) -> StatusLine {
        StatusLine::new(stage, message, self.progress_json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(from: &str, to: Option<&str>) -> WindowArgs {
        WindowArgs {
            channel: None,
            from: from.to_string(),
            to: to.map(str::to_string),
            max_pages: None,
        }
    }

    #[test]
    fn test_window_rejects_end_before_start() {
        let err = args("2024-03-02T00:00:00Z", Some("2024-03-01T00:00:00Z"))
            .window()
            .unwrap_err();
        assert_eq!(err.to_string(), "End date must be after start date.");
    }

    #[test]
    fn test_window_accepts_ordered_and_open_ranges() {
        let window = args("2024-03-01T00:00:00Z", Some("2024-03-01T00:00:00Z"))
            .window()
            .unwrap();
        assert_eq!(window.from, window.to.unwrap());

        let window = args("2024-03-01T00:00:00Z", None).window().unwrap();
        assert!(window.to.is_none());
    }

    #[test]
    fn test_window_reports_bad_dates() {
        let err = args("soon", None).window().unwrap_err();
        assert_eq!(err.to_string(), "invalid --from");
    }
}

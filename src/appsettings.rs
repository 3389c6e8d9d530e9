use std::{path::PathBuf, time::Duration};

use chrono_tz::Tz;
use config::{Config, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;

type SettingsBuilder = config::ConfigBuilder<DefaultState>;

#[derive(Deserialize, Debug)]
pub struct TelegramSettings {
    pub token: String,
}

#[derive(Deserialize, Debug)]
pub struct BotSettings {
    /// `@name` the commands must start with. Looked up from the chat
    /// platform when unset.
    pub mention: Option<String>,
    /// Messages sent under this name are never treated as commands.
    pub display_name: String,
    pub timezone: Tz,
}

#[derive(Deserialize, Debug)]
pub struct StorageSettings {
    pub path: PathBuf,
}

#[derive(Deserialize, Debug)]
pub struct WatcherSettings {
    pub tick_interval_secs: u64,
    pub pacing_interval_secs: u64,
}

impl WatcherSettings {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_interval_secs)
    }

    pub fn pacing_interval(&self) -> Duration {
        Duration::from_secs(self.pacing_interval_secs)
    }
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub telegram: TelegramSettings,
    pub bot: BotSettings,
    pub storage: StorageSettings,
    pub watcher: WatcherSettings,
}

impl AppSettings {
    /// `appsettings.*`, then `appsettings.local.*`, then `APP_` environment
    /// variables (`APP_TELEGRAM__TOKEN`, `APP_BOT__TIMEZONE`, ...).
    pub fn new() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name("appsettings").required(false))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__"),
            );

        Self::from_builder(builder)
    }

    fn from_builder(builder: SettingsBuilder) -> Result<Self, ConfigError> {
        let settings = builder
            .set_default("bot.display_name", "ramen")?
            .set_default("bot.timezone", "Asia/Tokyo")?
            .set_default("storage.path", "./data/data.csv")?
            .set_default("watcher.tick_interval_secs", 30)?
            .set_default("watcher.pacing_interval_secs", 2)?
            .build()?;

        let settings: Self = settings.try_deserialize()?;
        if settings.watcher.tick_interval_secs == 0 {
            return Err(ConfigError::Message(
                "watcher.tick_interval_secs must be greater than zero".to_owned(),
            ));
        }

        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use chrono_tz::{America::New_York, Asia::Tokyo};
    use config::FileFormat;

    use super::*;

    fn from_toml(toml: &str) -> Result<AppSettings, ConfigError> {
        AppSettings::from_builder(
            Config::builder().add_source(File::from_str(toml, FileFormat::Toml)),
        )
    }

    #[test]
    fn defaults_fill_everything_but_the_token() {
        let settings = from_toml(
            r#"
            [telegram]
            token = "secret"
            "#,
        )
        .unwrap();

        assert_eq!(settings.telegram.token, "secret");
        assert_eq!(settings.bot.mention, None);
        assert_eq!(settings.bot.display_name, "ramen");
        assert_eq!(settings.bot.timezone, Tokyo);
        assert_eq!(settings.storage.path, PathBuf::from("./data/data.csv"));
        assert_eq!(settings.watcher.tick_interval(), Duration::from_secs(30));
        assert_eq!(settings.watcher.pacing_interval(), Duration::from_secs(2));
    }

    #[test]
    fn file_values_override_defaults() {
        let settings = from_toml(
            r#"
            [telegram]
            token = "secret"

            [bot]
            mention = "@ramen_bot"
            timezone = "America/New_York"

            [watcher]
            tick_interval_secs = 5
            "#,
        )
        .unwrap();

        assert_eq!(settings.bot.mention.as_deref(), Some("@ramen_bot"));
        assert_eq!(settings.bot.timezone, New_York);
        assert_eq!(settings.watcher.tick_interval(), Duration::from_secs(5));
        assert_eq!(settings.watcher.pacing_interval(), Duration::from_secs(2));
    }

    #[test]
    fn missing_token_is_an_error() {
        assert!(from_toml("").is_err());
    }

    #[test]
    fn zero_tick_interval_is_an_error() {
        let result = from_toml(
            r#"
            [telegram]
            token = "secret"

            [watcher]
            tick_interval_secs = 0
            "#,
        );

        assert!(matches!(result, Err(ConfigError::Message(_))));
    }

    #[test]
    fn zero_pacing_interval_is_allowed() {
        let settings = from_toml(
            r#"
            [telegram]
            token = "secret"

            [watcher]
            pacing_interval_secs = 0
            "#,
        )
        .unwrap();

        assert_eq!(settings.watcher.pacing_interval(), Duration::ZERO);
    }

    #[test]
    fn unknown_timezone_is_an_error() {
        let result = from_toml(
            r#"
            [telegram]
            token = "secret"

            [bot]
            timezone = "Mars/Olympus_Mons"
            "#,
        );

        assert!(result.is_err());
    }
}

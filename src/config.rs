//! Watcher configuration: a TOML file with `SITE_WATCHER_` environment
//! overrides, validated before anything is scheduled. SMS credentials come
//! from the environment only.

use chrono::NaiveTime;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::error::ConfigError;
use crate::scrape::DEFAULT_USER_AGENT;
use crate::types::SiteDescriptor;

pub const DEFAULT_CONFIG_FILE: &str = "site_watcher.toml";
pub const ENV_PREFIX: &str = "SITE_WATCHER_";
/// Dotenv file read for credentials, relative to the working directory.
pub const DOTENV_FILE: &str = ".env";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherConfig {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub sites: Vec<SiteDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// HH:MM, 24-hour, local time
    pub health_check_morning: String,
    pub health_check_evening: String,
    pub request_timeout_secs: u64,
    /// Scheduler tick
    pub loop_sleep_interval_secs: u64,
    pub log_file_name: String,
    pub log_level: String,
    pub user_agent: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            health_check_morning: "08:00".into(),
            health_check_evening: "20:00".into(),
            request_timeout_secs: 15,
            loop_sleep_interval_secs: 60,
            log_file_name: "site_watcher.log".into(),
            log_level: "info".into(),
            user_agent: DEFAULT_USER_AGENT.into(),
        }
    }
}

impl Settings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.loop_sleep_interval_secs)
    }

    /// Morning and evening health-check times.
    pub fn health_check_times(&self) -> Result<(NaiveTime, NaiveTime), ConfigError> {
        let morning = parse_clock_time(&self.health_check_morning)
            .map_err(|e| ConfigError::Invalid(vec![format!("health_check_morning: {e}")]))?;
        let evening = parse_clock_time(&self.health_check_evening)
            .map_err(|e| ConfigError::Invalid(vec![format!("health_check_evening: {e}")]))?;
        Ok((morning, evening))
    }
}

/// Parse a strict `HH:MM` 24-hour clock time.
pub fn parse_clock_time(s: &str) -> Result<NaiveTime, String> {
    let s = s.trim();
    let well_formed = s.len() == 5
        && s.as_bytes()[2] == b':'
        && s.bytes().enumerate().all(|(i, b)| i == 2 || b.is_ascii_digit());
    if !well_formed {
        return Err(format!("{s:?} is not HH:MM"));
    }
    NaiveTime::parse_from_str(s, "%H:%M").map_err(|e| format!("{s:?}: {e}"))
}

impl WatcherConfig {
    /// Load `path` (must exist), apply env overrides, validate.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let figment = Figment::from(Serialized::defaults(WatcherConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::extract(figment)
    }

    /// Parse TOML text without touching the file system or environment.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let figment =
            Figment::from(Serialized::defaults(WatcherConfig::default())).merge(Toml::string(toml));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let cfg: WatcherConfig = figment
            .extract()
            .map_err(|e| ConfigError::Load(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Every problem found, not just the first one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut problems = Vec::new();

        if self.sites.is_empty() {
            problems.push("no sites configured".to_string());
        }
        for (i, site) in self.sites.iter().enumerate() {
            let label = if site.name.trim().is_empty() {
                problems.push(format!("sites[{i}]: name is empty"));
                format!("sites[{i}]")
            } else {
                format!("sites[{i}] ({})", site.name)
            };
            match Url::parse(&site.url) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                Ok(u) => problems.push(format!("{label}: unsupported url scheme {:?}", u.scheme())),
                Err(e) => problems.push(format!("{label}: invalid url {:?}: {e}", site.url)),
            }
            if site.keywords.is_empty() {
                problems.push(format!("{label}: keywords must be a non-empty list"));
            } else if site.keywords.iter().any(|k| k.trim().is_empty()) {
                problems.push(format!("{label}: keywords must not be blank"));
            }
            if !(site.interval_hours.is_finite() && site.interval_hours > 0.0) {
                problems.push(format!(
                    "{label}: interval_hours must be positive, got {}",
                    site.interval_hours
                ));
            }
        }

        let s = &self.settings;
        if let Err(e) = parse_clock_time(&s.health_check_morning) {
            problems.push(format!("settings.health_check_morning: {e}"));
        }
        if let Err(e) = parse_clock_time(&s.health_check_evening) {
            problems.push(format!("settings.health_check_evening: {e}"));
        }
        if s.request_timeout_secs == 0 {
            problems.push("settings.request_timeout_secs must be at least 1".to_string());
        }
        if s.loop_sleep_interval_secs == 0 {
            problems.push("settings.loop_sleep_interval_secs must be at least 1".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(problems))
        }
    }
}

/* ------------------------ credentials ------------------------ */

#[derive(Clone)]
pub struct TwilioCredentials {
    pub account_sid: String,
    pub auth_token: String,
    pub from_phone: String,
    pub to_phone: String,
}

impl std::fmt::Debug for TwilioCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_phone", &self.from_phone)
            .field("to_phone", &self.to_phone)
            .finish()
    }
}

impl TwilioCredentials {
    pub const VARS: [&'static str; 4] = ["TWILIO_SID", "TWILIO_TOKEN", "FROM_PHONE", "TO_PHONE"];

    /// Process environment first, then `.env` in the working directory.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_file(Path::new(DOTENV_FILE), |key| std::env::var(key).ok())
    }

    /// Resolve through `env`, falling back to the dotenv file at `path`.
    /// A missing file is not an error; a malformed one is.
    pub fn from_env_file(
        path: &Path,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let file = read_dotenv(path)?;
        Self::from_lookup(|key| {
            env(key)
                .filter(|v| !v.trim().is_empty())
                .or_else(|| file.get(key).cloned())
        })
    }

    /// Resolve all four variables through `lookup`; blank counts as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut values = Vec::with_capacity(Self::VARS.len());
        let mut missing = Vec::new();
        for key in Self::VARS {
            match lookup(key).filter(|v| !v.trim().is_empty()) {
                Some(v) => values.push(v),
                None => missing.push(key),
            }
        }
        if !missing.is_empty() {
            return Err(ConfigError::MissingEnv(missing));
        }

        let mut values = values.into_iter();
        let mut next = || values.next().unwrap_or_default();
        Ok(Self {
            account_sid: next(),
            auth_token: next(),
            from_phone: next(),
            to_phone: next(),
        })
    }
}

fn read_dotenv(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let bad = |e: dotenvy::Error| ConfigError::Load(format!("{}: {e}", path.display()));
    match dotenvy::from_path_iter(path) {
        Ok(iter) => iter.collect::<Result<HashMap<_, _>, _>>().map_err(bad),
        Err(e) if e.not_found() => Ok(HashMap::new()),
        Err(e) => Err(bad(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const VALID: &str = r#"
        [settings]
        health_check_morning = "07:30"
        request_timeout_secs = 20

        [[sites]]
        name = "Kariba"
        url = "https://kariba.ca/"
        keywords = ["accepting new patients", "clinic"]
        interval_hours = 0.5

        [[sites]]
        name = "Jobs"
        url = "https://x.test/a"
        keywords = ["hiring"]
    "#;

    #[test]
    fn parses_sites_and_fills_defaults() {
        let cfg = WatcherConfig::from_toml_str(VALID).unwrap();
        assert_eq!(cfg.sites.len(), 2);
        assert_eq!(cfg.sites[0].interval_hours, 0.5);
        assert_eq!(cfg.sites[1].interval_hours, 1.0);
        assert_eq!(cfg.settings.health_check_morning, "07:30");
        assert_eq!(cfg.settings.health_check_evening, "20:00");
        assert_eq!(cfg.settings.request_timeout(), Duration::from_secs(20));
        assert_eq!(cfg.settings.tick_interval(), Duration::from_secs(60));
        assert_eq!(cfg.settings.log_file_name, "site_watcher.log");

        let (morning, evening) = cfg.settings.health_check_times().unwrap();
        assert_eq!(morning, NaiveTime::from_hms_opt(7, 30, 0).unwrap());
        assert_eq!(evening, NaiveTime::from_hms_opt(20, 0, 0).unwrap());
    }

    #[test]
    fn no_sites_is_invalid() {
        let err = WatcherConfig::from_toml_str("[settings]\n").unwrap_err();
        match err {
            ConfigError::Invalid(problems) => {
                assert_eq!(problems, vec!["no sites configured".to_string()])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn collects_every_site_problem() {
        let toml = r#"
            [settings]
            health_check_evening = "8pm"
            loop_sleep_interval_secs = 0

            [[sites]]
            name = ""
            url = "ftp://x.test/"
            keywords = []
            interval_hours = -1.0
        "#;
        let err = WatcherConfig::from_toml_str(toml).unwrap_err();
        let ConfigError::Invalid(problems) = err else {
            panic!("expected validation error, got {err}");
        };
        assert_eq!(problems.len(), 6, "{problems:#?}");
        assert!(problems.iter().any(|p| p.contains("name is empty")));
        assert!(problems.iter().any(|p| p.contains("unsupported url scheme")));
        assert!(problems.iter().any(|p| p.contains("non-empty list")));
        assert!(problems.iter().any(|p| p.contains("interval_hours")));
        assert!(problems.iter().any(|p| p.contains("health_check_evening")));
        assert!(problems.iter().any(|p| p.contains("loop_sleep_interval_secs")));
    }

    #[test]
    fn unknown_setting_is_a_load_error() {
        let toml = "[settings]\nrequest_timeout = 5\n";
        assert!(matches!(
            WatcherConfig::from_toml_str(toml),
            Err(ConfigError::Load(_))
        ));
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");
        assert!(matches!(
            WatcherConfig::load(&path),
            Err(ConfigError::NotFound(p)) if p == path
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();
        let cfg = WatcherConfig::load(file.path()).unwrap();
        assert_eq!(cfg.sites[0].name, "Kariba");
    }

    #[test]
    fn clock_time_parsing() {
        assert_eq!(
            parse_clock_time("08:00").unwrap(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap()
        );
        assert!(parse_clock_time("23:59").is_ok());
        assert!(parse_clock_time("24:00").is_err());
        assert!(parse_clock_time("8:00").is_err());
        assert!(parse_clock_time("08:00:00").is_err());
        assert!(parse_clock_time("ab:cd").is_err());
    }

    #[test]
    fn credentials_list_all_missing_vars() {
        let env: HashMap<&str, &str> = [("TWILIO_SID", "AC123"), ("TO_PHONE", "  ")].into();
        let err = TwilioCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string()))
            .unwrap_err();
        match err {
            ConfigError::MissingEnv(missing) => {
                assert_eq!(missing, vec!["TWILIO_TOKEN", "FROM_PHONE", "TO_PHONE"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn credentials_resolve_in_order() {
        let env: HashMap<&str, &str> = [
            ("TWILIO_SID", "AC123"),
            ("TWILIO_TOKEN", "secret"),
            ("FROM_PHONE", "+15550001"),
            ("TO_PHONE", "+15550002"),
        ]
        .into();
        let creds = TwilioCredentials::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.account_sid, "AC123");
        assert_eq!(creds.auth_token, "secret");
        assert_eq!(creds.from_phone, "+15550001");
        assert_eq!(creds.to_phone, "+15550002");
        assert!(!format!("{creds:?}").contains("secret"));
    }

    #[test]
    fn credentials_fall_back_to_dotenv_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        std::fs::write(
            &path,
            "TWILIO_SID=AC999\nTWILIO_TOKEN=\"from file\"\n# comment\nFROM_PHONE=+15550003\nTO_PHONE=+15550004\n",
        )
        .unwrap();

        let env: HashMap<&str, &str> = [("TO_PHONE", "+15550009"), ("FROM_PHONE", "")].into();
        let creds =
            TwilioCredentials::from_env_file(&path, |k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(creds.account_sid, "AC999");
        assert_eq!(creds.auth_token, "from file");
        assert_eq!(creds.from_phone, "+15550003");
        // the process environment wins over the file
        assert_eq!(creds.to_phone, "+15550009");
    }

    #[test]
    fn missing_dotenv_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let err = TwilioCredentials::from_env_file(&dir.path().join(".env"), |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnv(missing) if missing.len() == 4));
    }

    #[test]
    fn padded_keywords_are_kept_verbatim() {
        let toml = r#"
            [[sites]]
            name = "Gallery"
            url = "https://gallery.test/"
            keywords = [" art "]
        "#;
        let cfg = WatcherConfig::from_toml_str(toml).unwrap();
        assert_eq!(cfg.sites[0].keywords, vec![" art ".to_string()]);
    }
}

// Configuration loading and parsing (league.toml, app.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::lineup::scores::SetRule;
use crate::model::CourtNumber;

/// Upper bound on courts per match accepted from configuration.
pub const MAX_COURTS: CourtNumber = 12;

/// Files read from `config/`, each seeded from `defaults/` when absent.
pub const CONFIG_FILES: [&str; 2] = ["league.toml", "app.toml"];

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to read config file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub scoring: ScoringConfig,
    pub notifications: NotificationConfig,
    pub db_path: String,
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    /// Courts laid out on a new board.
    pub courts: CourtNumber,
    /// Fallback cap for matches that carry none.
    #[serde(default)]
    pub rating_cap: Option<f64>,
}

// ---------------------------------------------------------------------------
// app.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire app.toml file.
#[derive(Debug, Clone, Deserialize)]
struct AppFile {
    #[serde(default)]
    scoring: ScoringConfig,
    database: DatabaseSection,
    #[serde(default)]
    notifications: NotificationConfig,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScoringConfig {
    #[serde(default)]
    pub set_rule: SetRule,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotificationConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            enabled: false,
            webhook_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Parse and validate `<base_dir>/config/{league,app}.toml`. Nothing is
/// seeded from `defaults/` here.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");
    let [league_name, app_name] = CONFIG_FILES;

    let league_path = config_dir.join(league_name);
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let app_path = config_dir.join(app_name);
    let app_text = read_file(&app_path)?;
    let app_file: AppFile = toml::from_str(&app_text).map_err(|e| ConfigError::ParseError {
        path: app_path.clone(),
        source: e,
    })?;

    let config = Config {
        league: league_file.league,
        scoring: app_file.scoring,
        notifications: app_file.notifications,
        db_path: app_file.database.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Seed `config/<name>` from `defaults/<name>` for each of [`CONFIG_FILES`]
/// that is missing. Existing files are never touched. Returns the files that
/// were created.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");
    let copy_error = |message: String| ConfigError::DefaultsCopyError { message };

    let missing: Vec<&str> = CONFIG_FILES
        .iter()
        .copied()
        .filter(|name| !config_dir.join(name).is_file())
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    std::fs::create_dir_all(&config_dir)
        .map_err(|e| copy_error(format!("cannot create {}: {e}", config_dir.display())))?;

    let mut seeded = Vec::with_capacity(missing.len());
    for name in missing {
        let source = defaults_dir.join(name);
        if !source.is_file() {
            return Err(copy_error(format!(
                "config/{name} is missing and there is no {} to seed it from",
                source.display()
            )));
        }
        let target = config_dir.join(name);
        std::fs::copy(&source, &target).map_err(|e| {
            copy_error(format!("cannot copy {} to {}: {e}", source.display(), target.display()))
        })?;
        seeded.push(target);
    }
    Ok(seeded)
}

/// [`ensure_config_files`] then [`load_config_from`], both relative to the
/// working directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("cannot determine working directory: {e}"),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    if !path.is_file() {
        return Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    std::fs::read_to_string(path).map_err(|source| ConfigError::Unreadable {
        path: path.to_path_buf(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.league.name.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.name".into(),
            message: "must not be empty".into(),
        });
    }

    let courts = config.league.courts;
    if courts == 0 || courts > MAX_COURTS {
        return Err(ConfigError::ValidationError {
            field: "league.courts".into(),
            message: format!("must be between 1 and {MAX_COURTS}, got {courts}"),
        });
    }

    if let Some(cap) = config.league.rating_cap {
        if !(cap > 0.0 && cap.is_finite()) {
            return Err(ConfigError::ValidationError {
                field: "league.rating_cap".into(),
                message: format!("must be a positive number, got {cap}"),
            });
        }
    }

    if config.db_path.trim().is_empty() {
        return Err(ConfigError::ValidationError {
            field: "database.path".into(),
            message: "must not be empty".into(),
        });
    }

    let notifications = &config.notifications;
    if notifications.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "notifications.timeout_secs".into(),
            message: "must be > 0".into(),
        });
    }
    if notifications.enabled {
        let url = notifications.webhook_url.as_deref().unwrap_or("").trim();
        if url.is_empty() {
            return Err(ConfigError::ValidationError {
                field: "notifications.webhook_url".into(),
                message: "required when notifications are enabled".into(),
            });
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::ValidationError {
                field: "notifications.webhook_url".into(),
                message: format!("must be an http(s) URL, got {url:?}"),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;

    /// Helper: returns the repository root holding `defaults/`.
    fn project_root() -> PathBuf {
        let manifest = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        let root = manifest.join("../..");
        if root.join("defaults").exists() {
            root
        } else {
            panic!("Cannot locate defaults/ directory from {:?}", manifest);
        }
    }

    /// Helper: a scratch directory with `config/` holding copies of the
    /// default files.
    fn scratch_with_defaults(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let config_dir = tmp.join("config");
        fs::create_dir_all(&config_dir).unwrap();

        let root = project_root();
        fs::copy(root.join("defaults/league.toml"), config_dir.join("league.toml")).unwrap();
        fs::copy(root.join("defaults/app.toml"), config_dir.join("app.toml")).unwrap();
        tmp
    }

    fn expect_validation_error(tmp: &Path, expected_field: &str) {
        let err = load_config_from(tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, expected_field);
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn load_default_config_files() {
        let tmp = scratch_with_defaults("courtside_config_defaults");
        let config = load_config_from(&tmp).expect("defaults should load");

        assert_eq!(config.league.name, "Riverside Doubles League");
        assert_eq!(config.league.courts, 3);
        assert_eq!(config.league.rating_cap, Some(8.0));
        assert_eq!(config.scoring.set_rule, SetRule::Tennis);
        assert_eq!(config.db_path, "courtside.db");
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.webhook_url, None);
        assert_eq!(config.notifications.timeout_secs, 10);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn optional_sections_default() {
        let tmp = scratch_with_defaults("courtside_config_minimal_app");
        fs::write(
            tmp.join("config/app.toml"),
            "[database]\npath = \"x.db\"\n",
        )
        .unwrap();
        fs::write(
            tmp.join("config/league.toml"),
            "[league]\nname = \"L\"\ncourts = 2\n",
        )
        .unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.scoring.set_rule, SetRule::Tennis);
        assert_eq!(config.league.rating_cap, None);
        assert!(!config.notifications.enabled);
        assert_eq!(config.notifications.timeout_secs, 10);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn most_games_rule_parses() {
        let tmp = scratch_with_defaults("courtside_config_most_games");
        let app = fs::read_to_string(tmp.join("config/app.toml"))
            .unwrap()
            .replace("set_rule = \"tennis\"", "set_rule = \"most_games\"");
        fs::write(tmp.join("config/app.toml"), app).unwrap();

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.scoring.set_rule, SetRule::MostGames);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_courts() {
        let tmp = scratch_with_defaults("courtside_config_zero_courts");
        let league = fs::read_to_string(tmp.join("config/league.toml"))
            .unwrap()
            .replace("courts = 3", "courts = 0");
        fs::write(tmp.join("config/league.toml"), league).unwrap();

        expect_validation_error(&tmp, "league.courts");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_too_many_courts() {
        let tmp = scratch_with_defaults("courtside_config_many_courts");
        let league = fs::read_to_string(tmp.join("config/league.toml"))
            .unwrap()
            .replace("courts = 3", "courts = 13");
        fs::write(tmp.join("config/league.toml"), league).unwrap();

        expect_validation_error(&tmp, "league.courts");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_positive_rating_cap() {
        let tmp = scratch_with_defaults("courtside_config_bad_cap");
        let league = fs::read_to_string(tmp.join("config/league.toml"))
            .unwrap()
            .replace("rating_cap = 8.0", "rating_cap = 0.0");
        fs::write(tmp.join("config/league.toml"), league).unwrap();

        expect_validation_error(&tmp, "league.rating_cap");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn enabled_notifications_require_webhook() {
        let tmp = scratch_with_defaults("courtside_config_no_webhook");
        let app = fs::read_to_string(tmp.join("config/app.toml"))
            .unwrap()
            .replace("enabled = false", "enabled = true");
        fs::write(tmp.join("config/app.toml"), app).unwrap();

        expect_validation_error(&tmp, "notifications.webhook_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_non_http_webhook() {
        let tmp = scratch_with_defaults("courtside_config_ftp_webhook");
        let app = fs::read_to_string(tmp.join("config/app.toml"))
            .unwrap()
            .replace(
                "enabled = false",
                "enabled = true\nwebhook_url = \"ftp://example.invalid\"",
            );
        fs::write(tmp.join("config/app.toml"), app).unwrap();

        expect_validation_error(&tmp, "notifications.webhook_url");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_timeout() {
        let tmp = scratch_with_defaults("courtside_config_zero_timeout");
        let app = fs::read_to_string(tmp.join("config/app.toml"))
            .unwrap()
            .replace("timeout_secs = 10", "timeout_secs = 0");
        fs::write(tmp.join("config/app.toml"), app).unwrap();

        expect_validation_error(&tmp, "notifications.timeout_secs");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_set_rule_is_parse_error() {
        let tmp = scratch_with_defaults("courtside_config_bad_rule");
        let app = fs::read_to_string(tmp.join("config/app.toml"))
            .unwrap()
            .replace("set_rule = \"tennis\"", "set_rule = \"pickleball\"");
        fs::write(tmp.join("config/app.toml"), app).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => {
                assert!(path.ends_with("app.toml"));
            }
            other => panic!("expected ParseError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_app_toml() {
        let tmp = scratch_with_defaults("courtside_config_missing_app");
        fs::remove_file(tmp.join("config/app.toml")).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("app.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    /// Helper: an empty scratch directory with `defaults/` seeded from the
    /// repository.
    fn scratch_with_defaults_dir(name: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        let defaults = tmp.join("defaults");
        fs::create_dir_all(&defaults).unwrap();
        for file in CONFIG_FILES {
            fs::copy(project_root().join("defaults").join(file), defaults.join(file)).unwrap();
        }
        tmp
    }

    #[test]
    fn first_run_seeds_both_files_and_loads() {
        let tmp = scratch_with_defaults_dir("courtside_config_first_run");
        fs::write(tmp.join("defaults/notifications.toml.example"), "# sample\n").unwrap();

        let seeded = ensure_config_files(&tmp).unwrap();
        let names: Vec<_> = seeded.iter().filter_map(|p| p.file_name()).collect();
        assert_eq!(names, vec!["league.toml", "app.toml"]);
        assert!(!tmp.join("config/notifications.toml.example").exists());

        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.league.courts, 3);

        // Second run has nothing left to seed.
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn operator_edits_are_never_overwritten() {
        let tmp = scratch_with_defaults_dir("courtside_config_keep_edits");
        fs::create_dir_all(tmp.join("config")).unwrap();
        let custom = "[league]\nname = \"Custom\"\ncourts = 5\n";
        fs::write(tmp.join("config/league.toml"), custom).unwrap();

        let seeded = ensure_config_files(&tmp).unwrap();
        assert_eq!(seeded, vec![tmp.join("config/app.toml")]);
        assert_eq!(fs::read_to_string(tmp.join("config/league.toml")).unwrap(), custom);
        assert_eq!(load_config_from(&tmp).unwrap().league.courts, 5);

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn complete_config_needs_no_defaults() {
        let tmp = scratch_with_defaults("courtside_config_no_defaults_dir");
        assert!(!tmp.join("defaults").exists());
        assert!(ensure_config_files(&tmp).unwrap().is_empty());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn missing_file_without_default_is_an_error() {
        let tmp = scratch_with_defaults_dir("courtside_config_missing_default");
        fs::remove_file(tmp.join("defaults/app.toml")).unwrap();

        let err = ensure_config_files(&tmp).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("config/app.toml is missing"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn directory_in_place_of_file_is_not_found() {
        let tmp = scratch_with_defaults("courtside_config_dir_as_file");
        fs::remove_file(tmp.join("config/app.toml")).unwrap();
        fs::create_dir_all(tmp.join("config/app.toml")).unwrap();

        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::FileNotFound { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }
}

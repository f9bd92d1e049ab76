/// Configuration system for emote-dash.
///
/// Provides a layered configuration hierarchy:
///
/// 1. **Built-in defaults** from [`schema::DashConfig::default()`]
/// 2. **User global config** at `~/.emote-dash/config.toml`
/// 3. **Project local config** at `.emote-dash.toml` in the current directory
/// 4. **Environment variables** `EMOTE_DASH_*` (highest precedence)
///
/// Layers are merged at the TOML table level, so a file that only sets
/// `[polling] series_secs` leaves every other value from the layer below
/// untouched. A malformed file is skipped with a warning.
///
/// # Usage
///
/// ```rust,ignore
/// use emote_dash::config;
///
/// let cfg = config::load();
/// let client = ApiClient::from_config(&cfg);
/// ```
pub mod schema;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

pub use schema::{DashConfig, Environment};

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Load the fully resolved configuration.
///
/// Merges defaults → global TOML → project TOML → env vars.
pub fn load() -> DashConfig {
    let layers = [global_config_path(), project_config_path()];
    let mut config = load_layers(layers.iter().flatten().map(PathBuf::as_path));
    apply_env_overrides(&mut config, |name| std::env::var(name).ok());
    for field in config.polling.too_short() {
        log::warn!(
            "config.poll_interval_floored key=polling.{field} min_secs={}",
            schema::MIN_POLL_SECS
        );
    }
    config
}

/// Merge the given TOML files, in order, over the built-in defaults.
///
/// Missing files are skipped silently; unreadable or malformed ones with a
/// warning.
pub fn load_layers<'a>(paths: impl IntoIterator<Item = &'a Path>) -> DashConfig {
    let mut merged = match toml::Value::try_from(DashConfig::default()) {
        Ok(value) => value,
        Err(e) => {
            log::warn!("config.defaults_unserializable error={e}");
            return DashConfig::default();
        }
    };

    for path in paths {
        if let Some(layer) = load_toml_file(path) {
            merge_tables(&mut merged, layer);
        }
    }

    match merged.try_into() {
        Ok(config) => config,
        Err(e) => {
            log::warn!("config.invalid error={e}");
            DashConfig::default()
        }
    }
}

fn load_toml_file(path: &Path) -> Option<toml::Value> {
    let content = fs::read_to_string(path).ok()?;
    match toml::from_str::<toml::Value>(&content) {
        Ok(value) => {
            log::debug!("config.layer path={}", path.display());
            Some(value)
        }
        Err(e) => {
            log::warn!("config.malformed path={} error={e}", path.display());
            None
        }
    }
}

/// Recursively overlay `overlay` onto `base`. Tables merge key by key;
/// any other value replaces what was there.
fn merge_tables(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_tables(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

// ---------------------------------------------------------------------------
// File paths
// ---------------------------------------------------------------------------

/// Path to the user global config: `~/.emote-dash/config.toml`.
fn global_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".emote-dash").join("config.toml"))
}

/// Path to the project local config: `.emote-dash.toml` in the current directory.
fn project_config_path() -> Option<PathBuf> {
    std::env::current_dir()
        .ok()
        .map(|cwd| cwd.join(".emote-dash.toml"))
}

pub fn global_config_file() -> Option<PathBuf> {
    global_config_path()
}

pub fn project_config_file() -> Option<PathBuf> {
    project_config_path()
}

// ---------------------------------------------------------------------------
// Environment variable overrides
// ---------------------------------------------------------------------------

/// Apply environment variable overrides (highest precedence layer).
///
/// Supported variables:
/// - `EMOTE_DASH_ENV`: `development` / `production` (also `dev` / `prod`)
/// - `EMOTE_DASH_API_URL`: upstream base URL
/// - `EMOTE_DASH_TIMEOUT_MS`: request timeout
/// - `EMOTE_DASH_ADDR`: web listen address
/// - `EMOTE_DASH_QUERY_PARAM`: state query parameter name
/// - `EMOTE_DASH_LOG`: default log filter
/// - `EMOTE_DASH_HISTORY`: navigation history (`1`/`true`/`yes`/`on`)
///
/// Unparseable values are ignored.
fn apply_env_overrides(config: &mut DashConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("EMOTE_DASH_ENV")
        && let Some(env) = parse_environment(&val)
    {
        config.general.environment = env;
    }
    if let Some(val) = var("EMOTE_DASH_API_URL")
        && !val.is_empty()
    {
        config.api.base_url = Some(val);
    }
    if let Some(val) = var("EMOTE_DASH_TIMEOUT_MS")
        && let Ok(ms) = val.parse::<u64>()
    {
        config.api.timeout_ms = ms;
    }
    if let Some(val) = var("EMOTE_DASH_ADDR")
        && !val.is_empty()
    {
        config.web.addr = val;
    }
    if let Some(val) = var("EMOTE_DASH_QUERY_PARAM")
        && !val.is_empty()
    {
        config.state.query_param = val;
    }
    if let Some(val) = var("EMOTE_DASH_LOG")
        && !val.is_empty()
    {
        config.logging.level = val;
    }
    if let Some(val) = var("EMOTE_DASH_HISTORY") {
        config.logging.history = is_truthy(&val);
    }
}

fn is_truthy(val: &str) -> bool {
    matches!(
        val.to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn parse_environment(val: &str) -> Option<Environment> {
    match val.to_ascii_lowercase().as_str() {
        "development" | "dev" => Some(Environment::Development),
        "production" | "prod" => Some(Environment::Production),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Config init / set / reset
// ---------------------------------------------------------------------------

/// Write the default annotated config to `~/.emote-dash/config.toml`.
///
/// Fails if the file already exists unless `force` is set.
pub fn init_config(force: bool) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    init_config_at(&path, force)?;
    Ok(path)
}

fn init_config_at(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        anyhow::bail!(
            "config file already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, DashConfig::default_toml()).context("failed to write config file")?;
    log::info!("config.init path={}", path.display());
    Ok(())
}

/// Set a single dotted key (e.g. `polling.series_secs`) in the global config.
pub fn set_config_value(key: &str, value: &str) -> Result<PathBuf> {
    let path = global_config_path().context("could not determine home directory")?;
    set_config_value_at(&path, key, value)?;
    Ok(path)
}

fn set_config_value_at(path: &Path, key: &str, value: &str) -> Result<()> {
    let mut root: toml::Value = if path.exists() {
        let content = fs::read_to_string(path).context("failed to read config file")?;
        toml::from_str(&content).context("failed to parse config as TOML value")?
    } else {
        toml::Value::try_from(DashConfig::default())
            .context("failed to serialize default config")?
    };

    set_toml_value(&mut root, key, value)?;

    // Reject edits that would make the file unloadable.
    let mut check = toml::Value::try_from(DashConfig::default())
        .context("failed to serialize default config")?;
    merge_tables(&mut check, root.clone());
    let checked: DashConfig = check
        .try_into()
        .with_context(|| format!("invalid value '{value}' for '{key}'"))?;
    if let Some(field) = checked.polling.too_short().first() {
        anyhow::bail!(
            "polling.{field} must be at least {} second(s)",
            schema::MIN_POLL_SECS
        );
    }

    let output = toml::to_string_pretty(&root).context("failed to serialize updated config")?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("failed to create config directory")?;
    }
    fs::write(path, output).context("failed to write config file")?;
    log::info!("config.set key={key}");
    Ok(())
}

/// Set a value in a TOML value tree using a dotted key path.
///
/// The existing value's type decides how `raw_value` is parsed. New keys
/// are inferred as boolean, integer, float or string, in that order.
fn set_toml_value(root: &mut toml::Value, key: &str, raw_value: &str) -> Result<()> {
    let Some((sections, leaf)) = key.rsplit_once('.') else {
        anyhow::bail!("config key must be dotted (section.key): '{key}'");
    };

    let mut current = root;
    for part in sections.split('.') {
        current = current
            .get_mut(part)
            .with_context(|| format!("config key not found: section '{part}' in '{key}'"))?;
    }

    let table = current
        .as_table_mut()
        .with_context(|| format!("expected table at '{sections}'"))?;

    let new_value = match table.get(leaf) {
        Some(toml::Value::Boolean(_)) => toml::Value::Boolean(is_truthy(raw_value)),
        Some(toml::Value::Integer(_)) => {
            let n: i64 = raw_value
                .parse()
                .with_context(|| format!("expected integer for '{key}', got '{raw_value}'"))?;
            toml::Value::Integer(n)
        }
        Some(toml::Value::Float(_)) => {
            let f: f64 = raw_value
                .parse()
                .with_context(|| format!("expected float for '{key}', got '{raw_value}'"))?;
            toml::Value::Float(f)
        }
        Some(toml::Value::String(_)) => toml::Value::String(raw_value.to_string()),
        Some(_) => anyhow::bail!("'{key}' is a table; set one of its keys instead"),
        None => infer_toml_value(raw_value),
    };

    table.insert(leaf.to_string(), new_value);
    Ok(())
}

fn infer_toml_value(raw: &str) -> toml::Value {
    if let Ok(b) = raw.parse::<bool>() {
        toml::Value::Boolean(b)
    } else if let Ok(n) = raw.parse::<i64>() {
        toml::Value::Integer(n)
    } else if let Ok(f) = raw.parse::<f64>() {
        toml::Value::Float(f)
    } else {
        toml::Value::String(raw.to_string())
    }
}

/// Reset the global config to defaults (overwrite the file).
pub fn reset_config() -> Result<PathBuf> {
    init_config(true)
}

/// Show the effective (fully resolved) config as TOML.
pub fn show_effective_config() -> Result<String> {
    let config = load();
    toml::to_string_pretty(&config).context("failed to serialize effective config")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn no_layers_gives_defaults() {
        assert_eq!(load_layers(Vec::<&Path>::new()), DashConfig::default());
    }

    #[test]
    fn later_layers_override_field_by_field() {
        let dir = tempfile::tempdir().unwrap();
        let global = write(
            dir.path(),
            "global.toml",
            "[polling]\nseries_secs = 5\nclips_secs = 60\n",
        );
        let project = write(dir.path(), "project.toml", "[polling]\nclips_secs = 15\n");

        let config = load_layers([global.as_path(), project.as_path()]);
        assert_eq!(config.polling.series_secs, 5);
        assert_eq!(config.polling.clips_secs, 15);
        assert_eq!(config.polling.live_status_secs, 30);
    }

    #[test]
    fn emote_id_tables_merge() {
        let dir = tempfile::tempdir().unwrap();
        let layer = write(dir.path(), "c.toml", "[clips.emote_ids]\nlol = 7\n");

        let config = load_layers([layer.as_path()]);
        assert_eq!(config.clips.emote_ids.get("two"), Some(&2));
        assert_eq!(config.clips.emote_ids.get("lol"), Some(&7));
    }

    #[test]
    fn malformed_and_missing_layers_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let bad = write(dir.path(), "bad.toml", "[polling\nseries_secs = ");
        let missing = dir.path().join("missing.toml");

        let config = load_layers([bad.as_path(), missing.as_path()]);
        assert_eq!(config, DashConfig::default());
    }

    #[test]
    fn env_overrides_apply() {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("EMOTE_DASH_ENV", "prod"),
            ("EMOTE_DASH_TIMEOUT_MS", "250"),
            ("EMOTE_DASH_QUERY_PARAM", "s"),
            ("EMOTE_DASH_HISTORY", "off"),
            ("EMOTE_DASH_ADDR", ""),
        ]);
        let mut config = DashConfig::default();
        apply_env_overrides(&mut config, |name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.general.environment, Environment::Production);
        assert_eq!(config.api_base_url(), schema::PRODUCTION_API_URL);
        assert_eq!(config.api.timeout_ms, 250);
        assert_eq!(config.state.query_param, "s");
        assert!(!config.logging.history);
        assert_eq!(config.web.addr, "127.0.0.1:9747");
    }

    #[test]
    fn env_api_url_beats_environment() {
        let mut config = DashConfig::default();
        apply_env_overrides(&mut config, |name| match name {
            "EMOTE_DASH_ENV" => Some("production".to_string()),
            "EMOTE_DASH_API_URL" => Some("http://10.0.0.2:8000".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url(), "http://10.0.0.2:8000");
    }

    #[test]
    fn parse_environment_handles_variants() {
        assert_eq!(parse_environment("DEV"), Some(Environment::Development));
        assert_eq!(parse_environment("production"), Some(Environment::Production));
        assert_eq!(parse_environment("staging"), None);
    }

    #[test]
    fn is_truthy_accepts_variants() {
        assert!(is_truthy("1"));
        assert!(is_truthy("TRUE"));
        assert!(is_truthy("on"));
        assert!(!is_truthy("0"));
        assert!(!is_truthy("no"));
        assert!(!is_truthy(""));
    }

    #[test]
    fn set_toml_value_keeps_existing_types() {
        let mut root: toml::Value =
            toml::from_str("[polling]\nseries_secs = 10\n[web]\nopen_browser = true\n").unwrap();
        set_toml_value(&mut root, "polling.series_secs", "3").unwrap();
        set_toml_value(&mut root, "web.open_browser", "no").unwrap();

        assert_eq!(root["polling"]["series_secs"].as_integer(), Some(3));
        assert_eq!(root["web"]["open_browser"].as_bool(), Some(false));
        assert!(set_toml_value(&mut root, "polling.series_secs", "soon").is_err());
    }

    #[test]
    fn set_toml_value_infers_new_keys() {
        let mut root: toml::Value = toml::from_str("[clips.emote_ids]\ntwo = 2\n").unwrap();
        set_toml_value(&mut root, "clips.emote_ids.lol", "5").unwrap();
        assert_eq!(root["clips"]["emote_ids"]["lol"].as_integer(), Some(5));
    }

    #[test]
    fn set_toml_value_rejects_bad_keys() {
        let mut root: toml::Value = toml::from_str("[general]\nenvironment = \"development\"\n").unwrap();
        assert!(set_toml_value(&mut root, "nonexistent.key", "x").is_err());
        assert!(set_toml_value(&mut root, "general", "x").is_err());
    }

    #[test]
    fn init_then_set_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        init_config_at(&path, false).unwrap();
        assert!(init_config_at(&path, false).is_err());

        set_config_value_at(&path, "general.environment", "production").unwrap();
        set_config_value_at(&path, "api.base_url", "http://api:8000").unwrap();
        assert!(set_config_value_at(&path, "general.environment", "staging").is_err());
        assert!(set_config_value_at(&path, "polling.series_secs", "0").is_err());

        let config = load_layers([path.as_path()]);
        assert_eq!(config.general.environment, Environment::Production);
        assert_eq!(config.api_base_url(), "http://api:8000");

        init_config_at(&path, true).unwrap();
        assert_eq!(load_layers([path.as_path()]), DashConfig::default());
    }

    #[test]
    fn effective_config_serializes() {
        let toml_str = show_effective_config().unwrap();
        let _: DashConfig = toml::from_str(&toml_str).unwrap();
    }
}

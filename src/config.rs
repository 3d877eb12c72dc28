use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;

pub const CONFIG_FILENAME: &str = "dialogue-overlay.toml";
pub const CONFIG_ENV: &str = "DIALOGUE_OVERLAY_CONFIG";

const DEFAULT_UI_MAP: &str = "Russian_UI/full_translation_mapping.json";
const DEFAULT_KEY_MAP: &str = "Russian_UI/key_based_translations.json";
const DEFAULT_TEXTS_DIR: &str = "Russian_Texts";
const DEFAULT_RAW_TEXTS_DIR: &str = "Russian_Texts_backup";
const DEFAULT_PASSAGE_DUMP: &str = "passage_dump.txt";
const DEFAULT_FILE_SUFFIX: &str = "_rus";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub corpus: CorpusSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CorpusSection {
    /// Flat JSON map of source UI strings to translations.
    #[serde(default)]
    pub ui_map: Option<String>,
    /// Flat JSON map of localization keys to translations.
    #[serde(default)]
    pub key_map: Option<String>,
    /// Directory of passage-formatted `*.txt` files.
    #[serde(default)]
    pub texts_dir: Option<String>,
    /// Directory of marker-less files used for the sequential fallback.
    #[serde(default)]
    pub raw_texts_dir: Option<String>,
    /// Passage dump providing known titles and an offline snapshot of the host objects.
    #[serde(default)]
    pub passage_dump: Option<String>,
    /// Stripped from file stems to get the object base (`001_patricia_rus` -> `001_patricia`).
    #[serde(default)]
    pub file_suffix: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LoggingSection {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default)]
    pub json: Option<bool>,
}

/// Configuration with defaults applied and paths made absolute.
#[derive(Clone, Debug)]
pub struct ResolvedConfig {
    pub config_path: Option<PathBuf>,
    pub base_dir: PathBuf,
    pub ui_map: PathBuf,
    pub key_map: PathBuf,
    pub texts_dir: PathBuf,
    pub raw_texts_dir: PathBuf,
    pub passage_dump: PathBuf,
    pub file_suffix: String,
    pub log_filter: String,
    pub log_json: bool,
}

impl ResolvedConfig {
    /// Explicit path, then the environment variable, then an upward search from the working
    /// directory. No file at all means defaults relative to the working directory.
    pub fn discover(explicit: Option<PathBuf>) -> anyhow::Result<Self> {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        let cfg_file = explicit
            .or_else(|| std::env::var(CONFIG_ENV).ok().map(PathBuf::from))
            .or_else(|| find_file_upwards(&cwd, CONFIG_FILENAME, 10));

        match cfg_file {
            Some(path) if path.exists() => {
                let cfg = load_config(&path)?;
                let base_dir = path
                    .parent()
                    .map(Path::to_path_buf)
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| cwd.clone());
                Ok(Self::from_config(&cfg, Some(path), base_dir))
            }
            Some(path) => Err(anyhow::anyhow!("config not found: {}", path.display())),
            None => Ok(Self::from_config(&AppConfig::default(), None, cwd)),
        }
    }

    #[must_use]
    pub fn from_config(cfg: &AppConfig, config_path: Option<PathBuf>, base_dir: PathBuf) -> Self {
        let c = &cfg.corpus;
        let path = |value: &Option<String>, default: &str| {
            let raw = value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(default);
            let p = PathBuf::from(raw);
            if p.is_absolute() {
                p
            } else {
                base_dir.join(p)
            }
        };

        Self {
            ui_map: path(&c.ui_map, DEFAULT_UI_MAP),
            key_map: path(&c.key_map, DEFAULT_KEY_MAP),
            texts_dir: path(&c.texts_dir, DEFAULT_TEXTS_DIR),
            raw_texts_dir: path(&c.raw_texts_dir, DEFAULT_RAW_TEXTS_DIR),
            passage_dump: path(&c.passage_dump, DEFAULT_PASSAGE_DUMP),
            file_suffix: c
                .file_suffix
                .clone()
                .unwrap_or_else(|| DEFAULT_FILE_SUFFIX.to_string()),
            log_filter: cfg
                .logging
                .filter
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
            log_json: cfg.logging.json.unwrap_or(false),
            config_path,
            base_dir,
        }
    }
}

pub fn find_file_upwards(start_dir: &Path, filename: &str, max_levels: usize) -> Option<PathBuf> {
    let mut dir = start_dir;
    for _ in 0..=max_levels {
        let candidate = dir.join(filename);
        if candidate.exists() {
            return Some(candidate);
        }
        dir = dir.parent()?;
    }
    None
}

pub fn load_config(path: &Path) -> anyhow::Result<AppConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config: {}", path.display()))?;
    let text = text.trim_start_matches('\u{FEFF}');
    let cfg: AppConfig = toml::from_str(text).context("parse config toml")?;
    Ok(cfg)
}

/// Writes the default config into `dir`. An existing file is kept unless `force` is set; the
/// returned flag says whether anything was written.
pub fn init_default_config(dir: &Path, force: bool) -> anyhow::Result<(PathBuf, bool)> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("create config dir: {}", dir.display()))?;
    let cfg_path = dir.join(CONFIG_FILENAME);
    if cfg_path.exists() && !force {
        return Ok((cfg_path, false));
    }
    std::fs::write(&cfg_path, DEFAULT_CONFIG_TOML)
        .with_context(|| format!("write config: {}", cfg_path.display()))?;
    Ok((cfg_path, true))
}

const DEFAULT_CONFIG_TOML: &str = r#"[corpus]
# Relative paths are resolved against this file's directory.
ui_map = "Russian_UI/full_translation_mapping.json"
key_map = "Russian_UI/key_based_translations.json"
texts_dir = "Russian_Texts"
# Marker-less files for the sequential fallback; a missing directory is fine.
raw_texts_dir = "Russian_Texts_backup"
passage_dump = "passage_dump.txt"
file_suffix = "_rus"

[logging]
# EnvFilter directive, e.g. "dialogue_overlay=debug". RUST_LOG takes precedence.
filter = "info"
json = false
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_round_trips_through_loader() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (path, written) = init_default_config(dir.path(), false).expect("init");
        assert!(written);
        let cfg = load_config(&path).expect("load");
        assert_eq!(cfg.corpus.file_suffix.as_deref(), Some("_rus"));
        assert_eq!(cfg.logging.json, Some(false));

        let (_, written_again) = init_default_config(dir.path(), false).expect("init again");
        assert!(!written_again);
        let (_, forced) = init_default_config(dir.path(), true).expect("force");
        assert!(forced);
    }

    #[test]
    fn relative_paths_resolve_against_config_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            "[corpus]\nui_map = \"maps/ui.json\"\ntexts_dir = \"/abs/texts\"\n",
        )
        .expect("write");
        let resolved = ResolvedConfig::discover(Some(path.clone())).expect("discover");
        assert_eq!(resolved.ui_map, dir.path().join("maps/ui.json"));
        assert_eq!(resolved.texts_dir, PathBuf::from("/abs/texts"));
        assert_eq!(resolved.key_map, dir.path().join(DEFAULT_KEY_MAP));
        assert_eq!(resolved.file_suffix, "_rus");
        assert_eq!(resolved.log_filter, "info");
        assert_eq!(resolved.config_path, Some(path));
    }

    #[test]
    fn explicit_missing_config_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(ResolvedConfig::discover(Some(dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn finds_config_in_parent_directory() {
        let dir = tempfile::tempdir().expect("tempdir");
        let nested = dir.path().join("a/b");
        std::fs::create_dir_all(&nested).expect("mkdir");
        std::fs::write(dir.path().join(CONFIG_FILENAME), "").expect("write");
        assert_eq!(
            find_file_upwards(&nested, CONFIG_FILENAME, 10),
            Some(dir.path().join(CONFIG_FILENAME))
        );
        assert_eq!(find_file_upwards(&nested, CONFIG_FILENAME, 1), None);
    }
}

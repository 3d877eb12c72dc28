//! File-system side of corpus loading. The engine only ever sees the resulting strings.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::{info, warn};

use crate::config::ResolvedConfig;
use crate::corpus::{CorpusSources, SourceFile};
use crate::dump::PassageDump;

pub struct LoadedInputs {
    pub sources: CorpusSources,
    pub dump: Option<PassageDump>,
}

impl LoadedInputs {
    /// Swaps in another passage dump; its titles become the raw-block boundaries.
    pub fn replace_dump(&mut self, dump: PassageDump) {
        self.sources.known_titles = dump.known_titles();
        self.dump = Some(dump);
    }
}

/// Reads every configured resource. Missing files and directories are logged and left empty;
/// files that exist but cannot be read are errors.
pub fn load_inputs(cfg: &ResolvedConfig) -> anyhow::Result<LoadedInputs> {
    let ui_map = read_optional(&cfg.ui_map, "ui map")?;
    let key_map = read_optional(&cfg.key_map, "key map")?;
    let passage_files = read_text_dir(&cfg.texts_dir, &cfg.file_suffix)?;

    // The raw directory replaces the passage directory for block scanning when it exists.
    let raw_files = if cfg.raw_texts_dir.is_dir() && !same_dir(&cfg.raw_texts_dir, &cfg.texts_dir) {
        read_text_dir(&cfg.raw_texts_dir, &cfg.file_suffix)?
    } else {
        passage_files.clone()
    };

    let dump = if cfg.passage_dump.is_file() {
        Some(PassageDump::read(&cfg.passage_dump)?)
    } else {
        info!(path = %cfg.passage_dump.display(), "no passage dump, sequential fallback uses passage titles only");
        None
    };
    let known_titles = dump.as_ref().map(PassageDump::known_titles).unwrap_or_default();

    info!(
        passage_files = passage_files.len(),
        raw_files = raw_files.len(),
        known_titles = known_titles.len(),
        "loaded corpus inputs"
    );

    Ok(LoadedInputs {
        sources: CorpusSources {
            ui_map,
            key_map,
            passage_files,
            raw_files,
            known_titles,
        },
        dump,
    })
}

pub fn read_text_file(path: &Path) -> anyhow::Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("read: {}", path.display()))?;
    let (text, had_errors) = encoding_rs::UTF_8.decode_with_bom_removal(&bytes);
    if had_errors {
        warn!(path = %path.display(), "invalid UTF-8 replaced while decoding");
    }
    Ok(text.into_owned())
}

fn read_optional(path: &Path, what: &str) -> anyhow::Result<Option<String>> {
    if !path.is_file() {
        warn!(path = %path.display(), "{what} not found, table stays empty");
        return Ok(None);
    }
    read_text_file(path).map(Some)
}

/// `*.txt` files of `dir` in file-name order, tagged with their object base.
pub fn read_text_dir(dir: &Path, suffix: &str) -> anyhow::Result<Vec<SourceFile>> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "text directory not found");
        return Ok(Vec::new());
    }

    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)
        .with_context(|| format!("list: {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && p.extension().is_some_and(|e| e.eq_ignore_ascii_case("txt")))
        .collect();
    paths.sort();

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            warn!(path = %path.display(), "skipping file with non UTF-8 name");
            continue;
        };
        let base = object_base_for_stem(stem, suffix).to_string();
        let text = read_text_file(&path)?;
        files.push(SourceFile::new(base, text));
    }
    Ok(files)
}

/// `001_patricia_rus` -> `001_patricia`.
pub fn object_base_for_stem<'s>(stem: &'s str, suffix: &str) -> &'s str {
    if suffix.is_empty() {
        return stem;
    }
    stem.strip_suffix(suffix).filter(|s| !s.is_empty()).unwrap_or(stem)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

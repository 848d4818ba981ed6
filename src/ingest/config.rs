//! Feed registry loading: env path, then TOML or JSON, then builtin sources.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::sources::{builtin_sources, Source};

const ENV_PATH: &str = "NEWS_SOURCES_PATH";

/// Load a source registry from an explicit path. Supports TOML or JSON formats.
pub fn load_sources_from(path: &Path) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sources from {}", path.display()))?;
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    parse_sources(&content, ext.as_str())
}

/// Load the registry using env var + fallbacks:
/// 1) $NEWS_SOURCES_PATH
/// 2) config/sources.toml
/// 3) config/sources.json
/// 4) built-in registry
pub fn load_sources_default() -> Result<Vec<Source>> {
    if let Ok(p) = std::env::var(ENV_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_sources_from(&pb);
        } else {
            return Err(anyhow!("NEWS_SOURCES_PATH points to non-existent path"));
        }
    }
    let toml_p = PathBuf::from("config/sources.toml");
    if toml_p.exists() {
        return load_sources_from(&toml_p);
    }
    let json_p = PathBuf::from("config/sources.json");
    if json_p.exists() {
        return load_sources_from(&json_p);
    }
    Ok(builtin_sources())
}

fn parse_sources(s: &str, hint_ext: &str) -> Result<Vec<Source>> {
    let try_toml = hint_ext == "toml" || s.contains("[[sources]]");
    if try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    if let Ok(v) = parse_json(s) {
        return Ok(v);
    }
    if !try_toml {
        if let Ok(v) = parse_toml(s) {
            return Ok(v);
        }
    }
    Err(anyhow!("unsupported sources format"))
}

fn parse_toml(s: &str) -> Result<Vec<Source>> {
    #[derive(serde::Deserialize)]
    struct TomlSources {
        sources: Vec<Source>,
    }
    let v: TomlSources = toml::from_str(s)?;
    Ok(clean_list(v.sources))
}

fn parse_json(s: &str) -> Result<Vec<Source>> {
    let v: Vec<Source> = serde_json::from_str(s)?;
    Ok(clean_list(v))
}

/// Drop blank entries and repeated names (first wins), keep file order.
fn clean_list(items: Vec<Source>) -> Vec<Source> {
    use std::collections::HashSet;
    let mut names = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for mut it in items {
        it.name = it.name.trim().to_string();
        it.url = it.url.trim().to_string();
        if it.name.is_empty() || it.url.is_empty() || it.limit == 0 {
            continue;
        }
        if names.insert(it.name.to_ascii_lowercase()) {
            out.push(it);
        }
    }
    out
}

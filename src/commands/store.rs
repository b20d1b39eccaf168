//! The data directory is the database: whole JSON files, read fully and
//! overwritten fully. No locking; one writer per artifact per run.

use crate::error::{Error, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

pub const SUBMISSIONS: &str = "submissions.json";
pub const PROMO_QUEUE: &str = "promo-queue.json";
pub const EXPERIMENTS: &str = "experiments.json";
pub const EXPERIMENT_OUTCOMES: &str = "experiment-outcomes.json";
pub const OPS_HISTORY: &str = "ops-history.json";
pub const TELEMETRY_EVENTS: &str = "telemetry/events.jsonl";
pub const REGISTRY: &str = "registry.json";
pub const LIVE_SIGNALS: &str = "live-signals.json";
pub const OVERRIDES: &str = "overrides.json";

pub const TARGETS_OUT: &str = "targets.json";
pub const DECISIONS_OUT: &str = "experiment-decisions.json";
pub const RECOMMENDATIONS_OUT: &str = "recommendations.json";
pub const BASELINE_OUT: &str = "ops-baseline.json";
pub const TELEMETRY_OUT: &str = "telemetry-rollup.json";
pub const QUEUE_HEALTH_OUT: &str = "queue-health.json";
pub const CATALOG_OUT: &str = "catalog.json";
pub const BRIEF_OUT: &str = "briefs/operator-brief.md";

/// Optional input: a missing or unparseable file degrades to `T::default()`.
pub fn read_json_or_default<T>(path: &Path) -> T
where
    T: DeserializeOwned + Default,
{
    match read_json_optional(path) {
        Ok(Some(value)) => value,
        Ok(None) => {
            log::warn!("{} not found; using empty default", path.display());
            T::default()
        }
        Err(e) => {
            log::warn!("{} could not be parsed ({e}); using empty default", path.display());
            T::default()
        }
    }
}

/// Required input: the calling operation has no purpose without it.
pub fn read_json_required<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    read_json_optional(path)?.ok_or_else(|| Error::MissingInput(path.display().to_string()))
}

pub fn read_json_optional<T>(path: &Path) -> Result<Option<T>>
where
    T: DeserializeOwned,
{
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Lines of a JSONL file, blank lines removed. Missing file reads as empty.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        log::warn!("{} not found; treating as empty", path.display());
        return Ok(Vec::new());
    }
    let raw = fs::read_to_string(path)?;
    Ok(raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn write_json_pretty<T>(path: &Path, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
{
    let mut raw = serde_json::to_string_pretty(value)?;
    raw.push('\n');
    write_text(path, &raw)
}

pub fn write_text(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    log::info!("wrote {}", path.display());
    Ok(())
}

/// Day-keyed response cache. Entries are never invalidated; a new day is a new directory.
#[derive(Debug, Clone)]
pub struct DayCache {
    root: PathBuf,
}

impl DayCache {
    pub fn new(root: impl Into<PathBuf>, day: NaiveDate) -> Self {
        Self {
            root: root.into().join(day.format("%Y-%m-%d").to_string()),
        }
    }

    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: DeserializeOwned,
    {
        match read_json_optional(&self.entry_path(key)) {
            Ok(value) => value,
            Err(e) => {
                log::warn!("ignoring unreadable cache entry for {key}: {e}");
                None
            }
        }
    }

    pub fn put<T>(&self, key: &str, value: &T) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value)?;
        let path = self.entry_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, raw)?;
        Ok(())
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.root.join(cache_file_name(key))
    }
}

/// Readable slug plus a digest of the exact key; the slug alone is lossy.
fn cache_file_name(key: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(key.as_bytes()));
    let slug = cache_slug(key);
    if slug.is_empty() {
        format!("{}.json", &digest[..16])
    } else {
        format!("{slug}-{}.json", &digest[..16])
    }
}

fn cache_slug(key: &str) -> String {
    let mut slug = String::with_capacity(key.len());
    for ch in key.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

use crate::error::{Error, Result};
use crate::models::settings::Settings;
use serde_json::{json, Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

const SETTINGS_SCHEMA_VERSION: i64 = 2;

pub fn load_effective_settings(data_dir: &Path) -> Result<Settings> {
    let raw = load_settings_from_disk(data_dir)?;
    let mut settings: Settings = serde_json::from_value(raw)
        .map_err(|e| Error::Config(format!("settings.json has an unexpected shape: {e}")))?;

    // Tiers are "first met wins", so they must run from the highest threshold down.
    settings
        .scoring
        .popularity_tiers
        .sort_by(|a, b| b.min_stars.cmp(&a.min_stars));
    settings.targets.denylist.retain(|entry| !entry.trim().is_empty());

    Ok(settings)
}

pub fn load_settings_from_disk(data_dir: &Path) -> Result<Value> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let original = if path.exists() {
        let raw = fs::read_to_string(&path)?;
        // A broken hand edit is reported, never overwritten with defaults.
        serde_json::from_str::<Value>(&raw)
            .map_err(|e| Error::Config(format!("{} is not valid JSON: {e}", path.display())))?
    } else {
        json!({})
    };

    let migrated = migrate_settings(original.clone());
    if migrated != original || !path.exists() {
        write_settings_file(&path, &migrated)?;
    }

    Ok(migrated)
}

pub fn save_settings_to_disk(data_dir: &Path, settings: Value) -> Result<Value> {
    let path = settings_path(data_dir);
    ensure_data_dir(data_dir)?;

    let mut merged = load_settings_from_disk(data_dir)?;
    merge_settings(&mut merged, &settings);

    let migrated = migrate_settings(merged);
    write_settings_file(&path, &migrated)?;
    Ok(migrated)
}

fn settings_path(data_dir: &Path) -> PathBuf {
    data_dir.join("settings.json")
}

fn ensure_data_dir(data_dir: &Path) -> Result<()> {
    fs::create_dir_all(data_dir)?;
    Ok(())
}

fn write_settings_file(path: &Path, settings: &Value) -> Result<()> {
    let mut raw = serde_json::to_string_pretty(settings)?;
    raw.push('\n');
    fs::write(path, raw)?;
    Ok(())
}

fn migrate_settings(input: Value) -> Value {
    let defaults = default_settings();
    let mut out = match input {
        Value::Object(map) => Value::Object(map),
        _ => Value::Object(Map::new()),
    };

    let version = out
        .get("schemaVersion")
        .and_then(Value::as_i64)
        .unwrap_or(0);

    if version < 1 {
        migrate_fractions_from_percentages(&mut out);
    }

    if version < 2 {
        // V2 nests the experiment policy; V1 kept it at the top level.
        lift_legacy_experiment_keys(&mut out);
    }

    deep_merge_defaults(&mut out, &defaults);
    sanitize_settings(&mut out);
    if let Some(obj) = out.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }

    out
}

fn default_settings() -> Value {
    let mut value = serde_json::to_value(Settings::default()).unwrap_or_else(|_| json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.insert("schemaVersion".to_string(), json!(SETTINGS_SCHEMA_VERSION));
    }
    value
}

fn deep_merge_defaults(target: &mut Value, defaults: &Value) {
    let (Some(target_obj), Some(default_obj)) = (target.as_object_mut(), defaults.as_object()) else {
        return;
    };

    for (key, default_value) in default_obj {
        match target_obj.get_mut(key) {
            Some(existing) => {
                if existing.is_object() && default_value.is_object() {
                    deep_merge_defaults(existing, default_value);
                }
            }
            None => {
                target_obj.insert(key.clone(), default_value.clone());
            }
        }
    }
}

fn merge_settings(target: &mut Value, incoming: &Value) {
    match (target, incoming) {
        (Value::Object(target_obj), Value::Object(incoming_obj)) => {
            for (key, value) in incoming_obj {
                if let Some(existing) = target_obj.get_mut(key) {
                    merge_settings(existing, value);
                } else {
                    target_obj.insert(key.clone(), value.clone());
                }
            }
        }
        (target_slot, incoming_value) => {
            *target_slot = incoming_value.clone();
        }
    }
}

fn migrate_fractions_from_percentages(settings: &mut Value) {
    for (section, key) in [
        ("baseline", "cacheHitWarning"),
        ("baseline", "budgetHeadroom"),
        ("recommendations", "proofShareFloor"),
    ] {
        let Some(slot) = settings.get_mut(section).and_then(|s| s.get_mut(key)) else {
            continue;
        };
        if let Some(v) = slot.as_f64().filter(|v| *v > 1.0) {
            *slot = json!(v / 100.0);
        }
    }
}

fn lift_legacy_experiment_keys(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    let mut lifted = Map::new();
    for key in ["minEntries", "winnerRatio"] {
        if let Some(value) = obj.remove(key) {
            lifted.insert(key.to_string(), value);
        }
    }
    if lifted.is_empty() {
        return;
    }

    let section = obj
        .entry("experiments".to_string())
        .or_insert_with(|| json!({}));
    if let Some(section) = section.as_object_mut() {
        for (key, value) in lifted {
            section.entry(key).or_insert(value);
        }
    }
}

fn sanitize_settings(settings: &mut Value) {
    let Some(obj) = settings.as_object_mut() else {
        return;
    };

    clamp_u64(obj, "requestDelayMs", 0, 60_000, 1000);

    with_section(obj, "targets", |s| {
        clamp_u64(s, "perQuery", 1, 100, 30);
        clamp_u64(s, "topN", 1, 500, 50);
        clamp_f64(s, "minScore", 0.0, 1000.0, 0.0);
        for key in [
            "topics",
            "keywords",
            "comparables",
            "signalOrgs",
            "seedRepos",
            "painPoints",
            "denylist",
            "publisherAccounts",
        ] {
            ensure_string_list(s, key);
        }
    });

    with_section(obj, "scoring", |s| {
        clamp_f64(s, "topicWeight", 0.0, 100.0, 10.0);
        clamp_f64(s, "topicCap", 0.0, 100.0, 30.0);
        clamp_f64(s, "keywordWeight", 0.0, 100.0, 5.0);
        clamp_f64(s, "keywordCap", 0.0, 100.0, 20.0);
        clamp_f64(s, "recencyCap", 0.0, 100.0, 20.0);
        clamp_u64(s, "recencyHorizonDays", 1, 3650, 365);
        clamp_f64(s, "fitWeight", 0.0, 100.0, 3.0);
        clamp_f64(s, "fitCap", 0.0, 100.0, 15.0);
        clamp_f64(s, "comparableBonus", 0.0, 100.0, 10.0);
        clamp_f64(s, "signalBonus", 0.0, 100.0, 8.0);
    });

    with_section(obj, "experiments", |s| {
        clamp_u64(s, "minEntries", 1, 1_000_000, 10);
        clamp_f64(s, "winnerRatio", 1.0, 100.0, 2.0);
        clamp_f64(s, "rateEpsilon", 0.000_001, 0.1, 0.001);
    });

    with_section(obj, "recommendations", |s| {
        clamp_u64(s, "highEngagement", 1, 1_000_000, 20);
        clamp_u64(s, "proofMinEvents", 1, 1_000_000, 10);
        clamp_f64(s, "proofShareFloor", 0.0, 1.0, 0.05);
        clamp_f64(s, "highFriction", 0.0, 100.0, 70.0);
        clamp_u64(s, "commonLintFailure", 1, 1000, 3);
        clamp_u64(s, "maxRecommendations", 1, 500, 20);
    });

    with_section(obj, "queue", |s| {
        clamp_u64(s, "stuckDays", 1, 365, 14);
        clamp_u64(s, "topLintFailures", 1, 50, 5);
        clamp_u64(s, "throughputWindowDays", 1, 90, 7);
    });

    with_section(obj, "telemetry", |s| {
        ensure_bool(s, "enabled", true);
        clamp_u64(s, "perDayTypeCap", 1, 1_000_000, 50);
        clamp_u64(s, "spikeThreshold", 1, 1_000_000_000, 500);
    });

    with_section(obj, "baseline", |s| {
        clamp_f64(s, "cacheHitWarning", 0.0, 1.0, 0.70);
        clamp_f64(s, "budgetHeadroom", 0.1, 1.0, 0.8);
    });
}

fn with_section<F>(map: &mut Map<String, Value>, key: &str, sanitize: F)
where
    F: FnOnce(&mut Map<String, Value>),
{
    let section = map.entry(key.to_string()).or_insert_with(|| json!({}));
    if !section.is_object() {
        *section = json!({});
    }
    if let Some(obj) = section.as_object_mut() {
        sanitize(obj);
    }
}

fn clamp_u64(map: &mut Map<String, Value>, key: &str, min: u64, max: u64, default: u64) {
    let raw = map.get(key).and_then(Value::as_u64).unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn clamp_f64(map: &mut Map<String, Value>, key: &str, min: f64, max: f64, default: f64) {
    let raw = map
        .get(key)
        .and_then(Value::as_f64)
        .filter(|v| v.is_finite())
        .unwrap_or(default);
    map.insert(key.to_string(), json!(raw.clamp(min, max)));
}

fn ensure_bool(map: &mut Map<String, Value>, key: &str, default: bool) {
    let value = map.get(key).and_then(Value::as_bool).unwrap_or(default);
    map.insert(key.to_string(), json!(value));
}

fn ensure_string_list(map: &mut Map<String, Value>, key: &str) {
    let items: Vec<String> = map
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    map.insert(key.to_string(), json!(items));
}

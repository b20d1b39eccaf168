use crate::error::Result;
use crate::models::catalog::{CatalogArtifact, CatalogEntry};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub const REGISTRY_LAYER: &str = "registry";
pub const LIVE_SIGNAL_LAYER: &str = "live-signal";
pub const OVERRIDE_LAYER: &str = "override";

/// One partial record and the name reported in provenance.
#[derive(Debug, Clone)]
pub struct Layer<'a> {
    pub name: &'a str,
    pub fields: &'a Map<String, Value>,
}

/// Merge layers left to right into a typed entry. Later layers win per field;
/// an explicit `null` clears whatever an earlier layer set.
pub fn merge_layers(slug: &str, layers: &[Layer<'_>]) -> Result<CatalogEntry> {
    let mut merged = Map::new();
    let mut provenance = BTreeMap::new();

    for layer in layers {
        for (key, value) in layer.fields {
            if key == "slug" || key == "provenance" {
                continue;
            }
            if value.is_null() {
                merged.remove(key);
            } else {
                merged.insert(key.clone(), value.clone());
            }
            provenance.insert(key.clone(), layer.name.to_string());
        }
    }

    merged.insert("slug".to_string(), Value::String(slug.to_string()));
    let mut entry: CatalogEntry = serde_json::from_value(Value::Object(merged))?;
    entry.provenance = provenance;
    Ok(entry)
}

/// Build the catalog from the registry plus per-slug live-signal and override layers.
pub fn sync_catalog(
    registry: &[Map<String, Value>],
    live_signals: &BTreeMap<String, Map<String, Value>>,
    overrides: &BTreeMap<String, Map<String, Value>>,
) -> CatalogArtifact {
    let mut artifact = CatalogArtifact::default();
    let mut by_slug: BTreeMap<String, &Map<String, Value>> = BTreeMap::new();

    for (index, record) in registry.iter().enumerate() {
        match record.get("slug").and_then(Value::as_str).filter(|s| !s.is_empty()) {
            Some(slug) => {
                if by_slug.insert(slug.to_string(), record).is_some() {
                    artifact
                        .warnings
                        .push(format!("registry lists {slug} more than once; last entry wins"));
                }
            }
            None => artifact
                .warnings
                .push(format!("registry entry #{index} has no slug; skipped")),
        }
    }

    for (source, layer) in [(LIVE_SIGNAL_LAYER, live_signals), (OVERRIDE_LAYER, overrides)] {
        for slug in layer.keys().filter(|slug| !by_slug.contains_key(*slug)) {
            artifact
                .warnings
                .push(format!("{source} entry {slug} is not in the registry; ignored"));
        }
    }

    let empty = Map::new();
    for (slug, record) in &by_slug {
        let layers = [
            Layer { name: REGISTRY_LAYER, fields: record },
            Layer { name: LIVE_SIGNAL_LAYER, fields: live_signals.get(slug).unwrap_or(&empty) },
            Layer { name: OVERRIDE_LAYER, fields: overrides.get(slug).unwrap_or(&empty) },
        ];
        match merge_layers(slug, &layers) {
            Ok(entry) => artifact.entries.push(entry),
            Err(e) => artifact.warnings.push(format!("{slug}: could not merge layers ({e})")),
        }
    }

    artifact
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn last_layer_wins_and_records_provenance() {
        let registry = object(json!({"slug": "fd", "name": "fd", "description": "find", "stars": 10}));
        let live = object(json!({"stars": 33000}));
        let human = object(json!({"description": "A simple, fast find", "featured": true}));

        let entry = merge_layers(
            "fd",
            &[
                Layer { name: REGISTRY_LAYER, fields: &registry },
                Layer { name: LIVE_SIGNAL_LAYER, fields: &live },
                Layer { name: OVERRIDE_LAYER, fields: &human },
            ],
        )
        .unwrap();

        assert_eq!(entry.stars, Some(33000));
        assert_eq!(entry.description.as_deref(), Some("A simple, fast find"));
        assert!(entry.featured);
        assert_eq!(entry.provenance["stars"], LIVE_SIGNAL_LAYER);
        assert_eq!(entry.provenance["description"], OVERRIDE_LAYER);
        assert_eq!(entry.provenance["name"], REGISTRY_LAYER);
    }

    #[test]
    fn null_override_clears_field() {
        let registry = object(json!({"slug": "fd", "name": "fd", "worthy": true}));
        let human = object(json!({"worthy": null}));

        let entry = merge_layers(
            "fd",
            &[
                Layer { name: REGISTRY_LAYER, fields: &registry },
                Layer { name: OVERRIDE_LAYER, fields: &human },
            ],
        )
        .unwrap();

        assert_eq!(entry.worthy, None);
        assert_eq!(entry.provenance["worthy"], OVERRIDE_LAYER);
    }

    #[test]
    fn sync_warns_on_orphans_and_bad_types() {
        let registry = vec![
            object(json!({"slug": "fd", "name": "fd"})),
            object(json!({"slug": "bat", "name": "bat", "stars": "many"})),
            object(json!({"name": "nameless"})),
        ];
        let live = BTreeMap::from([("ghost".to_string(), object(json!({"stars": 1})))]);
        let overrides = BTreeMap::new();

        let catalog = sync_catalog(&registry, &live, &overrides);

        assert_eq!(catalog.entries.len(), 1);
        assert_eq!(catalog.entries[0].slug, "fd");
        assert_eq!(catalog.warnings.len(), 3);
        assert!(catalog.warnings.iter().any(|w| w.contains("ghost")));
        assert!(catalog.warnings.iter().any(|w| w.starts_with("bat:")));
    }
}

use crate::analysis::layers::sync_catalog;
use crate::commands::store;
use crate::error::Result;
use crate::models::catalog::CatalogArtifact;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::Path;

/// Merge registry, live signals and human overrides into `catalog.json`.
pub fn run_catalog_sync(data_dir: &Path) -> Result<CatalogArtifact> {
    let registry: Vec<Map<String, Value>> = store::read_json_required(&data_dir.join(store::REGISTRY))?;
    let live: BTreeMap<String, Map<String, Value>> = store::read_json_or_default(&data_dir.join(store::LIVE_SIGNALS));
    let overrides: BTreeMap<String, Map<String, Value>> = store::read_json_or_default(&data_dir.join(store::OVERRIDES));

    let catalog = sync_catalog(&registry, &live, &overrides);
    for warning in &catalog.warnings {
        log::warn!("{warning}");
    }

    store::write_json_pretty(&data_dir.join(store::CATALOG_OUT), &catalog)?;
    log::info!("catalog: {} entries", catalog.entries.len());
    Ok(catalog)
}

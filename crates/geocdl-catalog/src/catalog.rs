//! [`DatasetCatalog`]: the registry of process-lifetime [`Dataset`]
//! singletons. Owns datasets; datasets never reference the catalog back, so
//! there is no cycle (Design Notes §9).

use crate::capabilities::DatasetSummary;
use crate::dataset::Dataset;
use geocdl_common::{GeoCdlError, GeoCdlResult};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

#[derive(Default)]
pub struct DatasetCatalog {
    datasets: BTreeMap<String, Arc<dyn Dataset>>,
}

impl DatasetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a dataset under its own `capabilities().id`. Panics on a
    /// duplicate ID, which indicates a startup configuration bug rather
    /// than a runtime/request-time condition.
    pub fn register(&mut self, dataset: Arc<dyn Dataset>) {
        let id = dataset.capabilities().id.clone();
        info!(dataset = %id, "registering dataset");
        if self.datasets.insert(id.clone(), dataset).is_some() {
            panic!("dataset \"{}\" registered twice", id);
        }
    }

    pub fn get(&self, id: &str) -> GeoCdlResult<Arc<dyn Dataset>> {
        self.datasets.get(id).cloned().ok_or_else(|| GeoCdlError::UnknownDataset(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.datasets.contains_key(id)
    }

    /// `GET /list_datasets`: published datasets, sorted by name (§6.1).
    pub fn list_published(&self) -> Vec<DatasetSummary> {
        let mut out: Vec<DatasetSummary> = self
            .datasets
            .values()
            .filter(|d| d.capabilities().publish)
            .map(|d| d.capabilities().to_summary())
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.datasets.keys().map(|s| s.as_str())
    }
}

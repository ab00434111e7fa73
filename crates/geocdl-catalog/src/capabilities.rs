//! [`DatasetCapabilities`]: what a dataset advertises to the catalog and,
//! through it, the rest of the pipeline.

use chrono::NaiveDate;
use geocdl_common::{CategoricalMeta, Crs, Grain, GridUnit};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone)]
pub struct DatasetCapabilities {
    pub id: String,
    pub name: String,
    pub nontemporal: bool,
    /// Never contains [`Grain::None`].
    pub supported_grains: BTreeSet<Grain>,
    /// Inclusive `(start, end)` availability per supported grain.
    pub date_ranges: BTreeMap<Grain, (NaiveDate, NaiveDate)>,
    pub crs: Crs,
    pub grid_size: f64,
    pub grid_unit: GridUnit,
    pub categorical: bool,
    /// Per-variable categorical metadata (RAT + colormap).
    pub variable_categories: BTreeMap<String, CategoricalMeta>,
    /// Catalog visibility only; does not affect request handling.
    pub publish: bool,
}

impl DatasetCapabilities {
    pub fn categories_for(&self, var: &str) -> Option<&CategoricalMeta> {
        self.variable_categories.get(var).filter(|c| !c.is_empty())
    }

    /// CRS metadata record, reused verbatim in the HTTP `ds_info` response
    /// and the output archive's `metadata.json` (§6.6).
    pub fn to_summary(&self) -> DatasetSummary {
        DatasetSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub id: String,
    pub name: String,
}

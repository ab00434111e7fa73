//! Shared application state: the dataset catalog and the upload cache are
//! both process-global singletons per §5, so they're constructed once at
//! startup and handed to every handler behind an `Arc`.

use geocdl_catalog::DatasetCatalog;
use geocdl_upload_cache::UploadCache;
use std::path::PathBuf;
use std::time::Duration;

pub struct AppState {
    pub catalog: DatasetCatalog,
    pub uploads: UploadCache,
}

impl AppState {
    pub fn new(upload_dir: PathBuf, max_upload_bytes: u64, retention: Duration) -> anyhow::Result<Self> {
        let catalog = geocdl_datasets::build_reference_catalog();
        let uploads = UploadCache::new(upload_dir, max_upload_bytes)?.with_retention(retention);
        Ok(AppState { catalog, uploads })
    }
}

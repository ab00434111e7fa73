//! The [`Dataset`] contract: the one trait the rest of the pipeline calls
//! into to actually fetch data. Dataset-specific file decoding (GDAL/NetCDF)
//! is the explicitly out-of-scope collaborator this trait boundary stands
//! in for (§1); `geocdl-datasets` provides concrete, testable
//! implementations against synthetic grids.

use crate::capabilities::DatasetCapabilities;
use geocdl_common::{DataLayer, GeoCdlError, GeoCdlResult, Grain, InterpMethod, RequestDate, SubsetGeom};

/// A registered data source. Implementations are process-lifetime
/// singletons owned by the [`DatasetCatalog`](crate::catalog::DatasetCatalog).
pub trait Dataset: Send + Sync {
    fn capabilities(&self) -> &DatasetCapabilities;

    /// Fetches one variable at one grain/date for the given (already
    /// buffered + reprojected into this dataset's CRS) subset geometry.
    ///
    /// `date` is `None` only for non-temporal datasets. Returns `Ok(None)`
    /// when the dataset has no data for this layer (sparse coverage) — this
    /// is never an error and the caller silently omits the layer. Returns
    /// [`GeoCdlError::CrsMismatch`] if `geom`'s CRS does not match this
    /// dataset's CRS.
    fn get_data(
        &self,
        variable: &str,
        grain: Grain,
        date: Option<RequestDate>,
        interp: InterpMethod,
        geom: &SubsetGeom,
    ) -> GeoCdlResult<Option<DataLayer>>;

    /// Validates that `geom`'s CRS matches this dataset's CRS, per the
    /// contract all `get_data` implementations must honor.
    fn check_crs(&self, geom: &SubsetGeom) -> GeoCdlResult<()> {
        if geom.crs() != &self.capabilities().crs {
            Err(GeoCdlError::CrsMismatch)
        } else {
            Ok(())
        }
    }
}

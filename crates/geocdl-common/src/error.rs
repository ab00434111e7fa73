//! Error types shared across the GeoCDL workspace.

use thiserror::Error;

/// Result type alias using [`GeoCdlError`].
pub type GeoCdlResult<T> = Result<T, GeoCdlError>;

/// Primary error type for GeoCDL operations.
///
/// Every validation-class variant maps to HTTP 400 via [`GeoCdlError::http_status_code`];
/// everything else (I/O, internal invariant violations) maps to 500.
#[derive(Debug, Error)]
pub enum GeoCdlError {
    // === Catalog errors ===
    #[error("Invalid dataset ID: \"{0}\"")]
    UnknownDataset(String),

    // === Date spec errors ===
    #[error("Could not parse dates string: {0}")]
    BadDateSpec(String),

    #[error("Cannot mix date grains within a single date range/list")]
    MixedGrain,

    #[error("End value of a range cannot be less than the start value")]
    EndBeforeStart,

    #[error("Invalid month value: {0}")]
    InvalidMonth(u32),

    #[error("Invalid day value: {0}")]
    InvalidDay(u32),

    #[error("A value of \"N\" was used without a defined maximum value")]
    NoMaxForN,

    #[error("The years to include in the request were not specified")]
    MissingYears,

    // === Grain negotiation / validation errors ===
    #[error("Dataset \"{dataset}\" does not support any grain compatible with this request")]
    UnsupportedGrain { dataset: String },

    #[error("Requested date range is not available for one or more datasets")]
    RangeUnavailable,

    #[error("Invalid method value: {0}")]
    InvalidMethod(String),

    // === Geometry errors ===
    #[error("This operation requires a {expected} geometry, but a {actual} geometry was given")]
    GeomKindMismatch {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("Buffering is only supported for polygon subset geometries")]
    BufferNotSupported,

    #[error("Geometry CRS does not match the dataset CRS")]
    CrsMismatch,

    #[error("Unsupported geometry type: \"{0}\"")]
    UnsupportedGeomType(String),

    #[error("Multiple polygons are not supported")]
    MultiPolyUnsupported,

    #[error("Unsupported or unrecognized CRS: {0}")]
    UnsupportedCrs(String),

    // === Upload cache errors ===
    #[error("Uploaded file exceeds the maximum allowed size")]
    UploadTooLarge,

    #[error("Uploaded file could not be parsed as point or polygon data")]
    UploadNotParseable,

    #[error("No cached upload found for the given identifier")]
    UploadNotFound,

    #[error("More than one cached file matches the given identifier")]
    UploadNotUnique,

    #[error("No coordinate reference system could be determined for the uploaded data")]
    UploadCrsUnresolved,

    // === Tileset errors ===
    #[error("No tiles intersect the requested geometry")]
    NoTiles,

    // === Request assembly errors ===
    #[error("Unsupported output format: {0}")]
    InvalidOutputFormat(String),

    #[error("Point requests require a multipoint subset geometry")]
    PointRequestRequiresMultiPoint,

    #[error("Invalid request type")]
    InvalidRequestType,

    // === Infrastructure ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GeoCdlError {
    /// HTTP status code this error maps to.
    pub fn http_status_code(&self) -> u16 {
        match self {
            GeoCdlError::UnknownDataset(_) => 404,
            GeoCdlError::UploadNotFound => 404,

            GeoCdlError::Io(_) | GeoCdlError::Json(_) | GeoCdlError::Internal(_) => 500,

            _ => 400,
        }
    }

    /// Whether this error represents a client-supplied validation failure,
    /// as opposed to an internal/IO failure.
    pub fn is_client_error(&self) -> bool {
        self.http_status_code() < 500
    }
}

//! DataRequest assembly (C8): the immutable, fully-validated request
//! object the rest of the pipeline operates on, plus the query-string
//! grammars (§6.2, §6.3) and metadata record (§6.6) it's built from.

pub mod metadata;
pub mod parse;
pub mod request;

pub use metadata::{CrsMeta, DatasetMeta, RequestInfoMeta, RequestMetadata};
pub use parse::{datasets_as_map, parse_clip_string, parse_coords, parse_datasets_string};
pub use request::{DataRequest, DataRequestParams, DateSpec};

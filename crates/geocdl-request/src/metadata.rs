//! The request metadata record written as `metadata.json`'s first archive
//! entry (§6.6), and embedded in the `GET /ds_info` response.

use geocdl_common::Crs;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct CrsMeta {
    pub name: String,
    pub epsg: Option<u32>,
    pub proj4: String,
    pub wkt: String,
    pub datum: String,
    pub is_geographic: bool,
    pub is_projected: bool,
}

impl From<&Crs> for CrsMeta {
    fn from(crs: &Crs) -> Self {
        CrsMeta {
            name: crs.name.clone(),
            epsg: crs.epsg,
            proj4: crs.proj4.clone(),
            wkt: crs.wkt.clone(),
            datum: crs.datum.clone(),
            is_geographic: crs.is_geographic,
            is_projected: crs.is_projected,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestInfoMeta {
    pub url: String,
    pub datetime: String,
    pub target_dates: String,
    pub target_crs: CrsMeta,
    pub request_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_resolution: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpolation_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resample_method: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetMeta {
    pub id: String,
    pub name: String,
    pub crs: CrsMeta,
    pub requested_vars: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestMetadata {
    pub request: RequestInfoMeta,
    pub datasets: Vec<DatasetMeta>,
}

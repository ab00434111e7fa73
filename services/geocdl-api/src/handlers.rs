//! HTTP surface (§6.1): dataset discovery, raster/point subset requests,
//! and the upload endpoint. Each handler's job is narrow — decode the
//! query grammar, assemble a [`DataRequestParams`], and hand off to
//! [`geocdl_request::DataRequest::new`] and [`geocdl_handler::RequestHandler`];
//! all request-shape validation lives in those two places, not here.

use std::sync::Arc;

use axum::extract::{Extension, Multipart, OriginalUri, Query};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use bytes::Bytes;
use geo::{LineString, MultiPoint, Point, Polygon};
use geocdl_catalog::DatasetCapabilities;
use geocdl_common::{Crs, GeoCdlError, GeoCdlResult, GrainMethod, InterpMethod, OutputFormat, RequestType, SubsetGeom, SubsetMultiPoint, SubsetPolygon, ValidateMethod};
use geocdl_handler::RequestHandler;
use geocdl_request::{parse_clip_string, parse_coords, parse_datasets_string, DataRequest, DataRequestParams, DateSpec};
use serde::Serialize;
use tracing::{error, info};

use crate::query::{DsInfoQuery, SubsetQuery};
use crate::state::AppState;

/// Wraps a [`GeoCdlError`] as a JSON body with its mapped HTTP status
/// (§7: validation-class errors are 400, `UnknownDataset`/`UploadNotFound`
/// are 404, infrastructure failures are 500).
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if !self.0.is_client_error() {
            error!(error = %self.0, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub struct ApiError(GeoCdlError);

impl From<GeoCdlError> for ApiError {
    fn from(e: GeoCdlError) -> Self {
        ApiError(e)
    }
}

pub async fn health_handler() -> &'static str {
    "ok"
}

/// `GET /list_datasets` — published datasets, sorted by name.
pub async fn list_datasets_handler(Extension(state): Extension<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!(state.catalog.list_published()))
}

#[derive(Serialize)]
struct DsInfo<'a> {
    id: &'a str,
    name: &'a str,
    nontemporal: bool,
    supported_grains: Vec<String>,
    crs: geocdl_request::CrsMeta,
    grid_size: f64,
    grid_unit: &'static str,
    categorical: bool,
    publish: bool,
}

/// `GET /ds_info?id=…` — a single dataset's capability record.
pub async fn ds_info_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(q): Query<DsInfoQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let ds = state.catalog.get(&q.id)?;
    let caps: &DatasetCapabilities = ds.capabilities();
    let info = DsInfo {
        id: &caps.id,
        name: &caps.name,
        nontemporal: caps.nontemporal,
        supported_grains: caps.supported_grains.iter().map(|g| g.to_string()).collect(),
        crs: geocdl_request::CrsMeta::from(&caps.crs),
        grid_size: caps.grid_size,
        grid_unit: match caps.grid_unit {
            geocdl_common::GridUnit::Meters => "meters",
            geocdl_common::GridUnit::Degrees => "degrees",
        },
        categorical: caps.categorical,
        publish: caps.publish,
    };
    Ok(Json(serde_json::to_value(info).map_err(GeoCdlError::from)?))
}

/// `GET /subset_polygon?…` — a raster subset request, returned as a ZIP.
pub async fn subset_polygon_handler(
    Extension(state): Extension<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<SubsetQuery>,
) -> Result<Response, ApiError> {
    let params = build_request_params(&state, &q, RequestType::Raster, uri.to_string())?;
    fulfill(&state, params).await
}

/// `GET /subset_points?…` — a point interpolation request, returned as a
/// ZIP (CSV, shapefile, or NetCDF, per `output_format`).
pub async fn subset_points_handler(
    Extension(state): Extension<Arc<AppState>>,
    OriginalUri(uri): OriginalUri,
    Query(q): Query<SubsetQuery>,
) -> Result<Response, ApiError> {
    let params = build_request_params(&state, &q, RequestType::Point, uri.to_string())?;
    fulfill(&state, params).await
}

async fn fulfill(state: &AppState, params: DataRequestParams) -> Result<Response, ApiError> {
    let request = DataRequest::new(params, &state.catalog)?;
    let handler = RequestHandler::new(&state.catalog);
    let zip_path = handler.fulfill(&request)?;

    let bytes = tokio::fs::read(&zip_path).await.map_err(GeoCdlError::from)?;
    let filename = zip_path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_else(|| "subset.zip".to_string());
    let _ = tokio::fs::remove_file(&zip_path).await;

    Ok((
        [
            (header::CONTENT_TYPE, "application/zip".to_string()),
            (header::CONTENT_DISPOSITION, format!("attachment; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}

/// Assembles a [`DataRequestParams`] from the wire query grammar. The
/// subset geometry is read either from the inline `clip`/`points` string
/// or from a previously-uploaded `clip_file_guid`/`points_file_guid`
/// (§4.7); exactly one source is expected per request type.
fn build_request_params(
    state: &AppState,
    q: &SubsetQuery,
    request_type: RequestType,
    request_url: String,
) -> GeoCdlResult<DataRequestParams> {
    let dataset_vars = parse_datasets_string(&q.datasets)?;

    let date_spec = if let Some(dates) = &q.dates {
        DateSpec::DatesString(dates.clone())
    } else if q.years.is_some() || q.months.is_some() || q.days.is_some() {
        DateSpec::Ymd {
            years: q.years.clone(),
            months: q.months.clone(),
            days: q.days.clone(),
        }
    } else {
        DateSpec::None
    };

    let grain_method = q.grain_method.as_deref().map(str::parse::<GrainMethod>).transpose()?.unwrap_or_default();
    let validate_method = q.validate_method.as_deref().map(str::parse::<ValidateMethod>).transpose()?.unwrap_or_default();

    let target_crs = q.crs.as_deref().map(Crs::parse).transpose()?.unwrap_or_else(Crs::wgs84);
    let target_resolution = q.resolution;

    let interp_str = match request_type {
        RequestType::Raster => q.resample_method.as_deref(),
        RequestType::Point => q.interp_method.as_deref(),
    };
    let interp_method = interp_str.map(str::parse::<InterpMethod>).transpose()?;

    let output_format = match &q.output_format {
        Some(s) => s.parse::<OutputFormat>()?,
        None => match request_type {
            RequestType::Raster => OutputFormat::GeoTiff,
            RequestType::Point => OutputFormat::Csv,
        },
    };

    let subset_geom = build_subset_geom(state, q, request_type, &target_crs)?;

    Ok(DataRequestParams {
        dataset_vars,
        date_spec,
        grain_method,
        validate_method,
        subset_geom,
        target_crs,
        target_resolution,
        interp_method,
        request_type,
        output_format,
        request_url,
    })
}

fn build_subset_geom(state: &AppState, q: &SubsetQuery, request_type: RequestType, target_crs: &Crs) -> GeoCdlResult<SubsetGeom> {
    let clip_file_crs = q.clip_file_crs.as_deref().map(Crs::parse).transpose()?;

    match request_type {
        RequestType::Raster => {
            if let Some(clip) = &q.clip {
                let ring = parse_clip_string(clip)?;
                Ok(SubsetGeom::Polygon(SubsetPolygon {
                    geom: ring_to_polygon(&ring),
                    crs: target_crs.clone(),
                }))
            } else if let Some(guid) = &q.clip_file_guid {
                let (geom, crs) = state.uploads.get_polygon(guid, clip_file_crs)?;
                Ok(SubsetGeom::Polygon(SubsetPolygon { geom, crs }))
            } else {
                Err(GeoCdlError::UnsupportedGeomType("no clip geometry supplied".into()))
            }
        }
        RequestType::Point => {
            if let Some(points) = &q.points {
                let coords = parse_coords(points)?;
                let pts: Vec<Point<f64>> = coords.into_iter().map(|(x, y)| Point::new(x, y)).collect();
                Ok(SubsetGeom::MultiPoint(SubsetMultiPoint {
                    geom: MultiPoint::new(pts),
                    crs: target_crs.clone(),
                }))
            } else if let Some(guid) = &q.points_file_guid {
                let (geom, crs) = state.uploads.get_multipoint(guid, clip_file_crs)?;
                Ok(SubsetGeom::MultiPoint(SubsetMultiPoint { geom, crs }))
            } else {
                Err(GeoCdlError::UnsupportedGeomType("no points geometry supplied".into()))
            }
        }
    }
}

fn ring_to_polygon(ring: &[(f64, f64)]) -> Polygon<f64> {
    let coords: Vec<geo::Coord<f64>> = ring.iter().map(|&(x, y)| geo::Coord { x, y }).collect();
    Polygon::new(LineString::new(coords), vec![])
}

/// Upload endpoint for polygon/multipoint subset files (§4.7). Accepts a
/// single-part multipart upload; returns the assigned GUID.
pub async fn upload_handler(Extension(state): Extension<Arc<AppState>>, mut multipart: Multipart) -> Result<Json<serde_json::Value>, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| GeoCdlError::Internal(format!("multipart error: {e}")))?
        .ok_or_else(|| GeoCdlError::Internal("no file part in upload".into()))?;

    let original_name = field.file_name().unwrap_or("upload").to_string();
    let data: Bytes = field.bytes().await.map_err(|e| GeoCdlError::Internal(format!("multipart error: {e}")))?;

    let guid = state.uploads.add_file(&mut std::io::Cursor::new(data.to_vec()), &original_name)?;
    info!(guid = %guid, file = %original_name, "upload cached");
    Ok(Json(serde_json::json!({ "guid": guid })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state() -> AppState {
        AppState {
            catalog: geocdl_datasets::build_reference_catalog(),
            uploads: geocdl_upload_cache::UploadCache::new(std::env::temp_dir().join("geocdl_api_test_uploads"), 1_000_000).unwrap(),
        }
    }

    fn query(datasets: &str, dates: &str, clip: &str) -> SubsetQuery {
        SubsetQuery {
            datasets: datasets.to_string(),
            dates: Some(dates.to_string()),
            years: None,
            months: None,
            days: None,
            grain_method: None,
            validate_method: None,
            crs: Some("EPSG:4326".to_string()),
            resolution: Some(0.04167),
            resample_method: None,
            interp_method: None,
            output_format: None,
            clip: Some(clip.to_string()),
            points: None,
            clip_file_guid: None,
            points_file_guid: None,
            clip_file_crs: None,
        }
    }

    // S1: annual range, single dataset, raster output.
    #[test]
    fn subset_polygon_params_build_a_valid_request() {
        let state = test_state();
        let q = query("PRISM:ppt", "2000:2002", "(-105,42),(-104,41)");
        let params = build_request_params(&state, &q, RequestType::Raster, "http://test/subset_polygon".to_string()).unwrap();
        let request = DataRequest::new(params, &state.catalog).unwrap();
        assert_eq!(request.dates_for("PRISM").len(), 3);
        assert_eq!(request.output_format, OutputFormat::GeoTiff);
    }

    // S3: grain_method=skip equivalent — a nontemporal dataset alongside a
    // temporal one, raster output, dates applying only to the temporal one.
    #[test]
    fn subset_polygon_handles_nontemporal_dataset() {
        let state = test_state();
        let q = query("PRISM:ppt;GTOPO30:elev", "2000", "(-105,42),(-104,41)");
        let params = build_request_params(&state, &q, RequestType::Raster, "http://test/subset_polygon".to_string()).unwrap();
        let request = DataRequest::new(params, &state.catalog).unwrap();
        assert_eq!(request.dates_for("PRISM").len(), 1);
        assert!(request.dates_for("GTOPO30").is_empty());
        assert!(request.includes("GTOPO30"));
    }

    // S4: points request defaults to csv and parses a semicolon coordinate
    // list into a multipoint subset geometry.
    #[test]
    fn subset_points_params_default_to_csv() {
        let state = test_state();
        let q = SubsetQuery {
            datasets: "PRISM:tmax".to_string(),
            dates: Some("2001-05".to_string()),
            years: None,
            months: None,
            days: None,
            grain_method: None,
            validate_method: None,
            crs: Some("EPSG:4326".to_string()),
            resolution: None,
            resample_method: None,
            interp_method: None,
            output_format: None,
            clip: None,
            points: Some("-100,40;-99,41".to_string()),
            clip_file_guid: None,
            points_file_guid: None,
            clip_file_crs: None,
        };
        let params = build_request_params(&state, &q, RequestType::Point, "http://test/subset_points".to_string()).unwrap();
        assert_eq!(params.output_format, OutputFormat::Csv);
        match &params.subset_geom {
            SubsetGeom::MultiPoint(mp) => assert_eq!(mp.geom.0.len(), 2),
            SubsetGeom::Polygon(_) => panic!("expected multipoint"),
        }
    }

    #[test]
    fn missing_clip_geometry_is_a_client_error() {
        let state = test_state();
        let mut q = query("PRISM:ppt", "2000", "(-105,42),(-104,41)");
        q.clip = None;
        let err = build_request_params(&state, &q, RequestType::Raster, "http://test".to_string()).unwrap_err();
        assert!(err.is_client_error());
    }
}

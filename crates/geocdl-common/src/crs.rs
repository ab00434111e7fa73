//! Coordinate reference system types and closed-form transformations.
//!
//! A full general-purpose CRS transformation library (e.g. PROJ) is treated
//! as an external collaborator and not reimplemented here. What this module
//! does provide, in the same spirit as the workspace's existing hand-rolled
//! Lambert Conformal Conic math, is closed-form forward/inverse projection
//! formulas for the handful of CRSs this catalog's datasets actually use:
//! geographic WGS84/NAD83, Web Mercator, CONUS Albers Equal Area
//! (EPSG:5070), and a Lambert Conformal Conic matching Daymet's native grid.
//! Everything is routed through geographic WGS84 lon/lat as a pivot.

use crate::error::{GeoCdlError, GeoCdlResult};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;

/// Full CRS definition, including the metadata object the catalog and
/// dataset records need to report (`name`, `epsg`, `proj4`, `wkt`, `datum`,
/// `is_geographic`, `is_projected`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crs {
    pub name: String,
    pub epsg: Option<u32>,
    pub proj4: String,
    pub wkt: String,
    pub datum: String,
    pub is_geographic: bool,
    pub is_projected: bool,
    kind: CrsKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum CrsKind {
    Wgs84,
    Nad83,
    WebMercator,
    ConusAlbers,
    DaymetLcc,
}

impl PartialEq for Crs {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}
impl Eq for Crs {}

impl Crs {
    pub fn wgs84() -> Self {
        Crs {
            name: "WGS 84".into(),
            epsg: Some(4326),
            proj4: "+proj=longlat +datum=WGS84 +no_defs".into(),
            wkt: "GEOGCRS[\"WGS 84\",...]".into(),
            datum: "World Geodetic System 1984".into(),
            is_geographic: true,
            is_projected: false,
            kind: CrsKind::Wgs84,
        }
    }

    pub fn nad83() -> Self {
        Crs {
            name: "NAD83".into(),
            epsg: Some(4269),
            proj4: "+proj=longlat +datum=NAD83 +no_defs".into(),
            wkt: "GEOGCRS[\"NAD83\",...]".into(),
            datum: "North American Datum 1983".into(),
            is_geographic: true,
            is_projected: false,
            kind: CrsKind::Nad83,
        }
    }

    pub fn web_mercator() -> Self {
        Crs {
            name: "WGS 84 / Pseudo-Mercator".into(),
            epsg: Some(3857),
            proj4: "+proj=merc +a=6378137 +b=6378137 +lat_ts=0 +lon_0=0 +x_0=0 +y_0=0 +k=1 +units=m +nadgrids=@null +wktext +no_defs".into(),
            wkt: "PROJCRS[\"WGS 84 / Pseudo-Mercator\",...]".into(),
            datum: "World Geodetic System 1984".into(),
            is_geographic: false,
            is_projected: true,
            kind: CrsKind::WebMercator,
        }
    }

    /// NAD83 / Conus Albers, EPSG:5070. Used by NASS CDL and similar
    /// 30m CONUS categorical rasters.
    pub fn conus_albers() -> Self {
        Crs {
            name: "NAD83 / Conus Albers".into(),
            epsg: Some(5070),
            proj4: "+proj=aea +lat_1=29.5 +lat_2=45.5 +lat_0=23 +lon_0=-96 +x_0=0 +y_0=0 +datum=NAD83 +units=m +no_defs".into(),
            wkt: "PROJCRS[\"NAD83 / Conus Albers\",...]".into(),
            datum: "North American Datum 1983".into(),
            is_geographic: false,
            is_projected: true,
            kind: CrsKind::ConusAlbers,
        }
    }

    /// Daymet's native Lambert Conformal Conic, matching
    /// `+proj=lcc +lat_1=25 +lat_2=60 +lat_0=42.5 +lon_0=-100 +x_0=0 +y_0=0 +ellps=WGS84 +units=m +no_defs`.
    pub fn daymet_lcc() -> Self {
        Crs {
            name: "Daymet Lambert Conformal Conic".into(),
            epsg: None,
            proj4: "+proj=lcc +lat_1=25 +lat_2=60 +lat_0=42.5 +lon_0=-100 +x_0=0 +y_0=0 +ellps=WGS84 +units=m +no_defs".into(),
            wkt: "PROJCRS[\"Daymet Lambert Conformal Conic\",...]".into(),
            datum: "World Geodetic System 1984".into(),
            is_geographic: false,
            is_projected: true,
            kind: CrsKind::DaymetLcc,
        }
    }

    /// Parse from an `"EPSG:NNNN"` string, or one of the catalog's named
    /// non-EPSG presets (`"DAYMET_LCC"`).
    pub fn parse(s: &str) -> GeoCdlResult<Self> {
        let normalized = s.trim().to_uppercase();
        match normalized.as_str() {
            "EPSG:4326" | "CRS:84" => Ok(Crs::wgs84()),
            "EPSG:4269" => Ok(Crs::nad83()),
            "EPSG:3857" | "EPSG:900913" => Ok(Crs::web_mercator()),
            "EPSG:5070" => Ok(Crs::conus_albers()),
            "DAYMET_LCC" => Ok(Crs::daymet_lcc()),
            _ => Err(GeoCdlError::UnsupportedCrs(s.to_string())),
        }
    }

    /// Canonical string form, used both for metadata and round-tripping
    /// through query strings / `.prj` sidecar lookups.
    pub fn code_string(&self) -> String {
        match self.epsg {
            Some(code) => format!("EPSG:{}", code),
            None => self.name.replace(' ', "_").to_uppercase(),
        }
    }

    /// Forward-project a geographic WGS84 point (lon, lat in degrees) into
    /// this CRS's native coordinates.
    fn from_wgs84(&self, lon_deg: f64, lat_deg: f64) -> (f64, f64) {
        match self.kind {
            CrsKind::Wgs84 | CrsKind::Nad83 => (lon_deg, lat_deg),
            CrsKind::WebMercator => geographic_to_web_mercator(lon_deg, lat_deg),
            CrsKind::ConusAlbers => geographic_to_albers(lon_deg, lat_deg, 29.5, 45.5, 23.0, -96.0),
            CrsKind::DaymetLcc => geographic_to_lcc(lon_deg, lat_deg, 25.0, 60.0, 42.5, -100.0),
        }
    }

    /// Inverse-project a native-CRS point back to geographic WGS84 (lon, lat
    /// in degrees).
    fn to_wgs84(&self, x: f64, y: f64) -> (f64, f64) {
        match self.kind {
            CrsKind::Wgs84 | CrsKind::Nad83 => (x, y),
            CrsKind::WebMercator => web_mercator_to_geographic(x, y),
            CrsKind::ConusAlbers => albers_to_geographic(x, y, 29.5, 45.5, 23.0, -96.0),
            CrsKind::DaymetLcc => lcc_to_geographic(x, y, 25.0, 60.0, 42.5, -100.0),
        }
    }

    /// Transform a point from this CRS into `target`, routed through
    /// geographic WGS84 as a pivot.
    pub fn transform_point(&self, target: &Crs, x: f64, y: f64) -> (f64, f64) {
        if self == target {
            return (x, y);
        }
        let (lon, lat) = self.to_wgs84(x, y);
        target.from_wgs84(lon, lat)
    }

    /// Axis unit: `"metre"` for projected CRSs, `"degree"` for geographic
    /// ones, matching the distinction the harmonization buffer-width
    /// computation needs (§4.5 buffer-width unit handling).
    pub fn axis_unit(&self) -> &'static str {
        if self.is_projected {
            "metre"
        } else {
            "degree"
        }
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code_string())
    }
}

// --- Web Mercator -----------------------------------------------------

const EARTH_RADIUS_M: f64 = 6378137.0;

fn geographic_to_web_mercator(lon_deg: f64, lat_deg: f64) -> (f64, f64) {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians().clamp(-1.4844, 1.4844);
    let x = EARTH_RADIUS_M * lon;
    let y = EARTH_RADIUS_M * (PI / 4.0 + lat / 2.0).tan().ln();
    (x, y)
}

fn web_mercator_to_geographic(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / EARTH_RADIUS_M).to_degrees();
    let lat = (2.0 * (y / EARTH_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}

// --- Albers Equal Area Conic -------------------------------------------
// Standard closed-form Albers forward/inverse on a sphere of
// `EARTH_RADIUS_M`, parameterized by the two standard parallels and the
// origin, matching the NAD83 / Conus Albers (EPSG:5070) definition used by
// NASS CDL. Sphere-approximation error at CONUS scale is on the order of
// the raster's own pixel size and is noted as an accepted simplification.

fn geographic_to_albers(lon_deg: f64, lat_deg: f64, lat1: f64, lat2: f64, lat0: f64, lon0: f64) -> (f64, f64) {
    let (lat1, lat2, lat0, lon0) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians(), lon0.to_radians());
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    let n = (lat1.cos() - lat2.cos()) / (lat2.sin() - lat1.sin());
    let n = if n.abs() < 1e-12 { (lat1 + lat2).sin() / 2.0 } else { n };
    let c = lat1.cos().powi(2) + 2.0 * n * lat1.sin();
    let rho0 = EARTH_RADIUS_M * (c - 2.0 * n * lat0.sin()).sqrt() / n;

    let rho = EARTH_RADIUS_M * (c - 2.0 * n * lat.sin()).sqrt() / n;
    let theta = n * (lon - lon0);

    let x = rho * theta.sin();
    let y = rho0 - rho * theta.cos();
    (x, y)
}

fn albers_to_geographic(x: f64, y: f64, lat1: f64, lat2: f64, lat0: f64, lon0: f64) -> (f64, f64) {
    let (lat1, lat2, lat0, lon0) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians(), lon0.to_radians());

    let n = (lat1.cos() - lat2.cos()) / (lat2.sin() - lat1.sin());
    let n = if n.abs() < 1e-12 { (lat1 + lat2).sin() / 2.0 } else { n };
    let c = lat1.cos().powi(2) + 2.0 * n * lat1.sin();
    let rho0 = EARTH_RADIUS_M * (c - 2.0 * n * lat0.sin()).sqrt() / n;

    let rho = ((x).powi(2) + (rho0 - y).powi(2)).sqrt();
    let rho = if n < 0.0 { -rho } else { rho };
    let theta = (x / (rho0 - y)).atan();

    let lat = ((c - (rho * n / EARTH_RADIUS_M).powi(2)) / (2.0 * n)).asin();
    let lon = lon0 + theta / n;

    (lon.to_degrees(), lat.to_degrees())
}

// --- Lambert Conformal Conic --------------------------------------------
// Same cone-constant derivation used for the workspace's grid-index-based
// Lambert Conformal implementation, but returning projected meters (x, y)
// directly rather than grid indices, since catalog datasets care about
// continuous coordinates, not a fixed sampling grid.

fn lcc_cone_constant(lat1: f64, lat2: f64) -> f64 {
    if (lat1 - lat2).abs() < 1e-9 {
        lat1.sin()
    } else {
        ((lat1.cos() / lat2.cos()).ln()) / (((PI / 4.0 + lat2 / 2.0).tan() / (PI / 4.0 + lat1 / 2.0).tan()).ln())
    }
}

fn geographic_to_lcc(lon_deg: f64, lat_deg: f64, lat1: f64, lat2: f64, lat0: f64, lon0: f64) -> (f64, f64) {
    let (lat1r, lat2r, lat0r, lon0r) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians(), lon0.to_radians());
    let lat = lat_deg.to_radians();
    let lon = lon_deg.to_radians();

    let n = lcc_cone_constant(lat1r, lat2r);
    let f = lat1r.cos() * (PI / 4.0 + lat1r / 2.0).tan().powf(n) / n;
    let rho0 = EARTH_RADIUS_M * f / (PI / 4.0 + lat0r / 2.0).tan().powf(n);

    let rho = EARTH_RADIUS_M * f / (PI / 4.0 + lat / 2.0).tan().powf(n);
    let mut dlon = lon - lon0r;
    while dlon > PI {
        dlon -= 2.0 * PI;
    }
    while dlon < -PI {
        dlon += 2.0 * PI;
    }
    let theta = n * dlon;

    let x = rho * theta.sin();
    let y = rho0 - rho * theta.cos();
    (x, y)
}

fn lcc_to_geographic(x: f64, y: f64, lat1: f64, lat2: f64, lat0: f64, lon0: f64) -> (f64, f64) {
    let (lat1r, lat2r, lat0r, lon0r) = (lat1.to_radians(), lat2.to_radians(), lat0.to_radians(), lon0.to_radians());

    let n = lcc_cone_constant(lat1r, lat2r);
    let f = lat1r.cos() * (PI / 4.0 + lat1r / 2.0).tan().powf(n) / n;
    let rho0 = EARTH_RADIUS_M * f / (PI / 4.0 + lat0r / 2.0).tan().powf(n);

    let rho = (x * x + (rho0 - y) * (rho0 - y)).sqrt();
    let rho = if n < 0.0 { -rho } else { rho };
    let theta = (x / (rho0 - y)).atan();

    let lat = 2.0 * ((EARTH_RADIUS_M * f / rho).powf(1.0 / n)).atan() - PI / 2.0;
    let lon = lon0r + theta / n;

    (lon.to_degrees(), lat.to_degrees())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_epsg_codes() {
        assert_eq!(Crs::parse("EPSG:4326").unwrap(), Crs::wgs84());
        assert_eq!(Crs::parse("epsg:3857").unwrap(), Crs::web_mercator());
        assert!(Crs::parse("EPSG:99999").is_err());
    }

    #[test]
    fn web_mercator_roundtrip() {
        let wm = Crs::web_mercator();
        let wgs = Crs::wgs84();
        let (x, y) = wm.from_wgs84(-94.5, 39.0);
        let (lon, lat) = wm.to_wgs84(x, y);
        assert!((lon - (-94.5)).abs() < 1e-6);
        assert!((lat - 39.0).abs() < 1e-6);
        let (x2, y2) = wgs.transform_point(&wm, -94.5, 39.0);
        assert!((x2 - x).abs() < 1e-6 && (y2 - y).abs() < 1e-6);
    }

    #[test]
    fn albers_roundtrip() {
        let (x, y) = geographic_to_albers(-94.5, 39.0, 29.5, 45.5, 23.0, -96.0);
        let (lon, lat) = albers_to_geographic(x, y, 29.5, 45.5, 23.0, -96.0);
        assert!((lon - (-94.5)).abs() < 1e-6, "lon {} vs -94.5", lon);
        assert!((lat - 39.0).abs() < 1e-6, "lat {} vs 39.0", lat);
    }

    #[test]
    fn lcc_roundtrip() {
        let (x, y) = geographic_to_lcc(-100.0, 42.5, 25.0, 60.0, 42.5, -100.0);
        // The projection origin should map to (0, 0).
        assert!(x.abs() < 1e-6, "x should be ~0, got {}", x);
        assert!(y.abs() < 1e-6, "y should be ~0, got {}", y);

        let (x, y) = geographic_to_lcc(-90.0, 38.0, 25.0, 60.0, 42.5, -100.0);
        let (lon, lat) = lcc_to_geographic(x, y, 25.0, 60.0, 42.5, -100.0);
        assert!((lon - (-90.0)).abs() < 1e-6);
        assert!((lat - 38.0).abs() < 1e-6);
    }

    #[test]
    fn identity_for_equal_crs() {
        let wgs = Crs::wgs84();
        let (x, y) = wgs.transform_point(&Crs::wgs84(), -100.0, 40.0);
        assert_eq!((x, y), (-100.0, 40.0));
    }
}

//! Small shared enums used across the request pipeline: grid units, raster
//! colors, resample/interpolation methods, output formats, and the
//! user-facing policy knobs (`grain_method`, `validate_method`).

use crate::error::GeoCdlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The unit a dataset's `grid_size` is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GridUnit {
    Meters,
    Degrees,
}

/// An RGBA color, used for categorical-raster colormaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba(pub u8, pub u8, pub u8, pub u8);

impl Rgba {
    /// `"#RRGGBB"` (alpha dropped), matching `_rgbaToHex` in the reference
    /// implementation's categorical point output.
    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// The kind of request being fulfilled: a raster clip or a point
/// interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Raster,
    Point,
}

/// Resample/interpolation method requested for a dataset read.
///
/// Raster requests are restricted to [`RESAMPLE_METHODS`]; point requests to
/// [`POINT_METHODS`]. `Nearest` is the shared default and is valid for both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InterpMethod {
    Nearest,
    Bilinear,
    Cubic,
    CubicSpline,
    Lanczos,
    Average,
    Linear,
}

pub const RESAMPLE_METHODS: &[InterpMethod] = &[
    InterpMethod::Nearest,
    InterpMethod::Bilinear,
    InterpMethod::Cubic,
    InterpMethod::CubicSpline,
    InterpMethod::Lanczos,
    InterpMethod::Average,
];

pub const POINT_METHODS: &[InterpMethod] = &[InterpMethod::Nearest, InterpMethod::Linear, InterpMethod::Cubic];

impl InterpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterpMethod::Nearest => "nearest",
            InterpMethod::Bilinear => "bilinear",
            InterpMethod::Cubic => "cubic",
            InterpMethod::CubicSpline => "cubicspline",
            InterpMethod::Lanczos => "lanczos",
            InterpMethod::Average => "average",
            InterpMethod::Linear => "linear",
        }
    }
}

impl fmt::Display for InterpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for InterpMethod {
    type Err = GeoCdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "nearest" => Ok(InterpMethod::Nearest),
            "bilinear" => Ok(InterpMethod::Bilinear),
            "cubic" => Ok(InterpMethod::Cubic),
            "cubicspline" => Ok(InterpMethod::CubicSpline),
            "lanczos" => Ok(InterpMethod::Lanczos),
            "average" => Ok(InterpMethod::Average),
            "linear" => Ok(InterpMethod::Linear),
            other => Err(GeoCdlError::InvalidMethod(other.to_string())),
        }
    }
}

/// Output archive format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    GeoTiff,
    NetCdf,
    Csv,
    Shapefile,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::GeoTiff => "tif",
            OutputFormat::NetCdf => "nc",
            OutputFormat::Csv => "csv",
            OutputFormat::Shapefile => "shp",
        }
    }

    pub fn compatible_with(&self, request_type: RequestType) -> bool {
        match request_type {
            RequestType::Raster => matches!(self, OutputFormat::GeoTiff | OutputFormat::NetCdf),
            RequestType::Point => matches!(self, OutputFormat::Csv | OutputFormat::Shapefile | OutputFormat::NetCdf),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OutputFormat::GeoTiff => "geotiff",
            OutputFormat::NetCdf => "netcdf",
            OutputFormat::Csv => "csv",
            OutputFormat::Shapefile => "shapefile",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for OutputFormat {
    type Err = GeoCdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "geotiff" | "tif" | "tiff" => Ok(OutputFormat::GeoTiff),
            "netcdf" | "nc" => Ok(OutputFormat::NetCdf),
            "csv" => Ok(OutputFormat::Csv),
            "shapefile" | "shp" => Ok(OutputFormat::Shapefile),
            other => Err(GeoCdlError::InvalidOutputFormat(other.to_string())),
        }
    }
}

/// How a dataset's date grain is chosen relative to the request's inferred
/// grain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GrainMethod {
    Strict,
    Skip,
    Coarser,
    Finer,
    Any,
}

impl Default for GrainMethod {
    fn default() -> Self {
        GrainMethod::Strict
    }
}

impl FromStr for GrainMethod {
    type Err = GeoCdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(GrainMethod::Strict),
            "skip" => Ok(GrainMethod::Skip),
            "coarser" => Ok(GrainMethod::Coarser),
            "finer" => Ok(GrainMethod::Finer),
            "any" => Ok(GrainMethod::Any),
            other => Err(GeoCdlError::InvalidMethod(other.to_string())),
        }
    }
}

/// How requested dates are reconciled against a dataset's availability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValidateMethod {
    Strict,
    All,
    Overlap,
}

impl Default for ValidateMethod {
    fn default() -> Self {
        ValidateMethod::Strict
    }
}

impl FromStr for ValidateMethod {
    type Err = GeoCdlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "strict" => Ok(ValidateMethod::Strict),
            "all" => Ok(ValidateMethod::All),
            "overlap" => Ok(ValidateMethod::Overlap),
            other => Err(GeoCdlError::InvalidMethod(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgba_hex_format() {
        assert_eq!(Rgba(255, 0, 128, 255).to_hex(), "#FF0080");
    }

    #[test]
    fn output_format_compatibility() {
        assert!(OutputFormat::GeoTiff.compatible_with(RequestType::Raster));
        assert!(!OutputFormat::Csv.compatible_with(RequestType::Raster));
        assert!(OutputFormat::Csv.compatible_with(RequestType::Point));
        assert!(OutputFormat::NetCdf.compatible_with(RequestType::Point));
    }

    #[test]
    fn parse_methods_case_insensitive() {
        assert_eq!("NEAREST".parse::<InterpMethod>().unwrap(), InterpMethod::Nearest);
        assert_eq!("Overlap".parse::<ValidateMethod>().unwrap(), ValidateMethod::Overlap);
        assert!("bogus".parse::<GrainMethod>().is_err());
    }
}

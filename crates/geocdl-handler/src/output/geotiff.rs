//! GeoTIFF writer (C10), grounded in `data_request_output.py::_writeGeoTIFF`/
//! `_assignCategories` (GeoTIFF branch). Real georeferenced raster encoding
//! goes through `gdal`, the same crate `brandonfcohen1-gnarmap`'s pipeline
//! uses for raster I/O in this example pack — a full GDAL binding is the
//! concrete, testable implementation standing in for "a full dataset file
//! format library" (§1), rather than a hand-rolled TIFF encoder.

use crate::naming::aux_xml_filename;
use gdal::raster::Buffer;
use gdal::DriverManager;
use geocdl_common::{CategoricalMeta, GeoCdlError, GeoCdlResult, RasterLayer};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes one single-band GeoTIFF from `layer` at `path`. If `categories`
/// is `Some` (the dataset declared `categorical = true` for this
/// variable), embeds the colormap into band 1 and writes a sidecar
/// `<path>.aux.xml` raster attribute table (§4.5.3).
///
/// Returns every file actually written — the `.tif` itself, plus the
/// `.aux.xml` sidecar when categorical.
pub fn write_geotiff(layer: &RasterLayer, categories: Option<&CategoricalMeta>, path: &Path) -> GeoCdlResult<Vec<PathBuf>> {
    let driver = DriverManager::get_driver_by_name("GTiff").map_err(gdal_err)?;
    let mut dataset = driver
        .create_with_band_type::<f64, _>(path, layer.width, layer.height, 1)
        .map_err(gdal_err)?;

    dataset.set_geo_transform(&layer.geotransform).map_err(gdal_err)?;
    dataset.set_projection(&layer.crs.wkt).map_err(gdal_err)?;

    let mut band = dataset.rasterband(1).map_err(gdal_err)?;
    if let Some(nodata) = layer.nodata {
        band.set_no_data_value(Some(nodata)).map_err(gdal_err)?;
    }

    let mut buffer = Buffer::new((layer.width, layer.height), layer.data.clone());
    band.write((0, 0), (layer.width, layer.height), &mut buffer).map_err(gdal_err)?;

    let mut written = vec![path.to_path_buf()];

    if let Some(categories) = categories.filter(|c| !c.is_empty()) {
        if !categories.colormap.is_empty() {
            let table = gdal::raster::ColorTable::new(gdal::raster::PaletteInterpretation::RGBA);
            for (code, rgba) in &categories.colormap {
                if let Ok(idx) = usize::try_from(*code) {
                    table.set_color_entry(idx, &gdal::raster::ColorEntry {
                        c1: rgba.0,
                        c2: rgba.1,
                        c3: rgba.2,
                        c4: rgba.3,
                    });
                }
            }
            band.set_color_table(&table);
        }

        let aux_path = PathBuf::from(aux_xml_filename(&path.to_string_lossy()));
        fs::write(&aux_path, render_rat_xml(&categories.rat))?;
        written.push(aux_path);
    }

    Ok(written)
}

/// Renders a GDAL PAM-style `.aux.xml` raster attribute table: one row per
/// class, columns `value` and `class_name`, matching the structure GDAL's
/// own `GDALRasterAttributeTable::Serialize` produces for a categorical
/// band, which `_assignCategories`'s GeoTIFF branch relies on downstream
/// readers (QGIS, ArcGIS) to pick up automatically.
fn render_rat_xml(rat: &std::collections::BTreeMap<i64, String>) -> String {
    let mut rows = String::new();
    for (value, name) in rat {
        rows.push_str(&format!(
            "    <Row index=\"{value}\"><F>{value}</F><F>{}</F></Row>\n",
            xml_escape(name)
        ));
    }
    format!(
        "<PAMDataset>\n  <PAMRasterBand band=\"1\">\n    <GDALRasterAttributeTable>\n      <FieldDefn index=\"0\"><Name>Value</Name><Type>1</Type><Usage>0</Usage></FieldDefn>\n      <FieldDefn index=\"1\"><Name>Class_Name</Name><Type>2</Type><Usage>2</Usage></FieldDefn>\n{rows}    </GDALRasterAttributeTable>\n  </PAMRasterBand>\n</PAMDataset>\n"
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn gdal_err(e: gdal::errors::GdalError) -> GeoCdlError {
    GeoCdlError::Internal(format!("GDAL error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geocdl_common::{Crs, Rgba};
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn layer() -> RasterLayer {
        RasterLayer {
            data: vec![0.0, 1.0, 2.0, 3.0],
            width: 2,
            height: 2,
            crs: Crs::wgs84(),
            geotransform: [0.0, 1.0, 0.0, 10.0, 0.0, -1.0],
            nodata: Some(-9999.0),
        }
    }

    #[test]
    fn rat_xml_contains_every_class() {
        let mut rat = BTreeMap::new();
        rat.insert(1, "Corn".to_string());
        rat.insert(2, "Soybeans".to_string());
        let xml = render_rat_xml(&rat);
        assert!(xml.contains("Corn"));
        assert!(xml.contains("Soybeans"));
        assert!(xml.contains("GDALRasterAttributeTable"));
    }

    #[test]
    fn write_geotiff_returns_sidecar_for_categorical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NASS_CDL_cdl_2020.tif");
        let mut colormap = BTreeMap::new();
        colormap.insert(1, Rgba(255, 211, 0, 255));
        let mut rat = BTreeMap::new();
        rat.insert(1, "Corn".to_string());
        let categories = CategoricalMeta { rat, colormap };
        let written = write_geotiff(&layer(), Some(&categories), &path).unwrap();
        assert_eq!(written.len(), 2);
        assert!(written[1].to_string_lossy().ends_with(".aux.xml"));
    }

    #[test]
    fn write_geotiff_plain_has_no_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM_ppt_2000.tif");
        let written = write_geotiff(&layer(), None, &path).unwrap();
        assert_eq!(written.len(), 1);
    }
}

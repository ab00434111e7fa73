//! Output file naming (§6.4), grounded in
//! `data_request_output.py::_getSingleLayerOutputFileName`/`_getNCFileName`.
//!
//! The reference implementation embeds a date into the point-output
//! filename for some formats; this spec's fix (§9 Open Questions) keeps
//! the date out of point filenames entirely and relies on the `time`
//! column instead (§4.5.3/Testable Property handled in `output::points`).

use geocdl_common::RequestDate;

/// `<dsid>_<var>[_<date>].<ext>` for one raster layer. `date` formats as
/// `YYYY`, `YYYY-MM`, or `YYYY-MM-DD` via `RequestDate`'s `Display` impl;
/// non-temporal datasets (no date) omit the suffix entirely.
pub fn raster_filename(dsid: &str, var: &str, date: Option<RequestDate>, ext: &str) -> String {
    match date {
        Some(d) => format!("{dsid}_{var}_{d}.{ext}"),
        None => format!("{dsid}_{var}.{ext}"),
    }
}

/// `<dsid>.nc` for a per-dataset NetCDF raster output (one file holds
/// every variable/date for that dataset).
pub fn netcdf_dataset_filename(dsid: &str) -> String {
    format!("{dsid}.nc")
}

/// `<joined-dsids>.<ext>` for a points request, joined in dataset
/// declaration order.
pub fn points_filename(dataset_ids: &[&str], ext: &str) -> String {
    format!("{}.{ext}", dataset_ids.join("_"))
}

/// `<geotiff-name>.aux.xml` categorical-raster sidecar.
pub fn aux_xml_filename(geotiff_name: &str) -> String {
    format!("{geotiff_name}.aux.xml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raster_filename_includes_date_suffix() {
        assert_eq!(raster_filename("PRISM", "ppt", Some(RequestDate::annual(2000)), "tif"), "PRISM_ppt_2000.tif");
        assert_eq!(
            raster_filename("DaymetV4", "tmax", Some(RequestDate::monthly(2015, 1)), "tif"),
            "DaymetV4_tmax_2015-01.tif"
        );
    }

    #[test]
    fn raster_filename_omits_suffix_for_nontemporal() {
        assert_eq!(raster_filename("GTOPO30", "elev", None, "tif"), "GTOPO30_elev.tif");
    }

    #[test]
    fn points_filename_joins_declaration_order() {
        assert_eq!(points_filename(&["PRISM", "DaymetV4"], "csv"), "PRISM_DaymetV4.csv");
    }

    #[test]
    fn aux_xml_appends_suffix() {
        assert_eq!(aux_xml_filename("NASS_CDL_cdl_2020.tif"), "NASS_CDL_cdl_2020.tif.aux.xml");
    }
}

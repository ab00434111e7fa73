//! CSV and shapefile point writers (C10), grounded in
//! `data_request_output.py::_writeCsv`/`_writeShapefile` and
//! `_assignCategories`'s point-output branch (color/class-name columns).

use geocdl_common::{CategoricalMeta, GeoCdlError, GeoCdlResult, PointValue, RequestDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// One dataset/variable's interpolated values at every request coordinate,
/// for one date — one per (dataset, variable, date) task the handler ran.
pub struct PointColumn {
    pub dsid: String,
    pub var: String,
    pub date: Option<RequestDate>,
    pub values: Vec<PointValue>,
    pub categories: Option<CategoricalMeta>,
}

/// A dataset/variable's interpolated values across every requested date,
/// keyed by date — what a multi-date `PointColumn` run collapses into
/// before a writer ever sees it, so each writer emits one row per
/// coordinate *per date* instead of one (wrongly-named) column per date.
pub struct PointSeries {
    pub dsid: String,
    pub var: String,
    pub categories: Option<CategoricalMeta>,
    pub by_date: BTreeMap<Option<RequestDate>, Vec<PointValue>>,
}

impl PointSeries {
    fn name(&self) -> String {
        format!("{}_{}", self.dsid, self.var)
    }
}

/// Groups a flat task-ordered `PointColumn` list (one per dataset × variable
/// × date) into one [`PointSeries`] per (dataset, variable), preserving the
/// order each pair was first seen in `columns`.
pub fn group_series(columns: Vec<PointColumn>) -> Vec<PointSeries> {
    let mut order: Vec<(String, String)> = Vec::new();
    let mut by_key: BTreeMap<(String, String), PointSeries> = BTreeMap::new();

    for col in columns {
        let key = (col.dsid.clone(), col.var.clone());
        if !by_key.contains_key(&key) {
            order.push(key.clone());
            by_key.insert(
                key.clone(),
                PointSeries { dsid: col.dsid.clone(), var: col.var.clone(), categories: col.categories.clone(), by_date: BTreeMap::new() },
            );
        }
        let series = by_key.get_mut(&key).unwrap();
        series.by_date.insert(col.date, col.values);
    }

    order.into_iter().filter_map(|key| by_key.remove(&key)).collect()
}

/// Every distinct date across `series`, ascending (`None` first, for
/// nontemporal datasets), and the request coordinates themselves (shared
/// by every series/date, since they all interpolate the same subset
/// geometry).
fn date_axis_and_coords(series: &[PointSeries]) -> (Vec<Option<RequestDate>>, Vec<(f64, f64)>) {
    let mut dates: std::collections::BTreeSet<Option<RequestDate>> = std::collections::BTreeSet::new();
    for s in series {
        dates.extend(s.by_date.keys().copied());
    }
    let coords = series
        .iter()
        .find_map(|s| s.by_date.values().next())
        .map(|values| values.iter().map(|p| (p.x, p.y)).collect())
        .unwrap_or_default();
    (dates.into_iter().collect(), coords)
}

/// Writes `x,y,time,<dsid>_<var>[,...color/class columns]` rows to a single
/// CSV, one row per request coordinate per date, matching `_writeCsv`'s flat
/// long-format table.
pub fn write_csv_points(columns: Vec<PointColumn>, path: &Path) -> GeoCdlResult<PathBuf> {
    let series = group_series(columns);
    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;

    let mut header = vec!["x".to_string(), "y".to_string(), "time".to_string()];
    for s in &series {
        header.push(s.name());
        if s.categories.as_ref().is_some_and(|c| !c.is_empty()) {
            header.push(format!("{}_class_name", s.name()));
            if s.categories.as_ref().is_some_and(|c| !c.colormap.is_empty()) {
                header.push(format!("{}_color", s.name()));
            }
        }
    }
    writer.write_record(&header).map_err(csv_err)?;

    let (dates, coords) = date_axis_and_coords(&series);
    for date in &dates {
        let time = date.map(|d| d.to_string()).unwrap_or_default();
        for (i, &(x, y)) in coords.iter().enumerate() {
            let mut row = vec![x.to_string(), y.to_string(), time.clone()];
            for s in &series {
                let value = s.by_date.get(date).and_then(|values| values.get(i)).and_then(|v| v.value);
                row.push(value.map(|v| v.to_string()).unwrap_or_default());
                if let Some(categories) = s.categories.as_ref().filter(|c| !c.is_empty()) {
                    let code = value.map(|v| v as i64);
                    let name = code.and_then(|c| categories.rat.get(&c)).cloned().unwrap_or_default();
                    row.push(name);
                    if !categories.colormap.is_empty() {
                        let color = code.and_then(|c| categories.colormap.get(&c)).map(|c| c.to_hex()).unwrap_or_default();
                        row.push(color);
                    }
                }
            }
            writer.write_record(&row).map_err(csv_err)?;
        }
    }

    writer.flush()?;
    Ok(path.to_path_buf())
}

/// Writes one point shapefile (`.shp`/`.shx`/`.dbf`) with a numeric field
/// per column, plus `class_name`/`color` text fields for categorical
/// columns, matching `_writeShapefile`'s attribute-table layout. As with
/// [`write_csv_points`], a multi-date request emits one record per
/// coordinate per date rather than folding dates into extra same-named
/// fields.
pub fn write_shapefile_points(columns: Vec<PointColumn>, path: &Path) -> GeoCdlResult<PathBuf> {
    use dbase::{FieldValue, TableWriterBuilder};
    use shapefile::{Point, Writer};

    let series = group_series(columns);

    let mut builder = TableWriterBuilder::new().add_character_field("time".try_into().unwrap(), 20);
    for s in &series {
        builder = builder.add_numeric_field(field_name(&s.name()).as_str().try_into().unwrap(), 18, 6);
        if s.categories.as_ref().is_some_and(|c| !c.is_empty()) {
            builder = builder.add_character_field(field_name(&format!("{}_cls", s.name())).as_str().try_into().unwrap(), 80);
        }
    }

    let mut writer = Writer::from_path_with_filetype(path, builder, shapefile::ShapeType::Point)
        .map_err(|e| GeoCdlError::Internal(format!("shapefile writer error: {e}")))?;

    let (dates, coords) = date_axis_and_coords(&series);
    for date in &dates {
        let time = date.map(|d| d.to_string()).unwrap_or_default();
        for (i, &(x, y)) in coords.iter().enumerate() {
            let shape = Point::new(x, y);

            let mut record = dbase::Record::default();
            record.insert("time".to_string(), FieldValue::Character(Some(time.clone())));
            for s in &series {
                let value = s.by_date.get(date).and_then(|values| values.get(i)).and_then(|v| v.value);
                record.insert(field_name(&s.name()), FieldValue::Numeric(value));
                if let Some(categories) = s.categories.as_ref().filter(|c| !c.is_empty()) {
                    let code = value.map(|v| v as i64);
                    let name = code.and_then(|c| categories.rat.get(&c)).cloned();
                    record.insert(field_name(&format!("{}_cls", s.name())), FieldValue::Character(name));
                }
            }
            writer
                .write_shape_and_record(&shape, &record)
                .map_err(|e| GeoCdlError::Internal(format!("shapefile write error: {e}")))?;
        }
    }

    Ok(path.to_path_buf())
}

/// DBF field names are capped at 10 characters; truncate rather than error,
/// since the reference implementation silently does the same through
/// pandas/geopandas' shapefile writer.
fn field_name(name: &str) -> String {
    name.chars().take(10).collect()
}

fn csv_err(e: csv::Error) -> GeoCdlError {
    GeoCdlError::Internal(format!("CSV error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn column() -> PointColumn {
        PointColumn {
            dsid: "PRISM".to_string(),
            var: "ppt".to_string(),
            date: Some(RequestDate::annual(2020)),
            values: vec![
                PointValue { x: -100.0, y: 40.0, value: Some(12.5) },
                PointValue { x: -99.0, y: 41.0, value: None },
            ],
            categories: None,
        }
    }

    #[test]
    fn write_csv_points_writes_header_and_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM.csv");
        let out = write_csv_points(vec![column()], &path).unwrap();
        let contents = std::fs::read_to_string(&out).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), "x,y,time,PRISM_ppt");
        assert_eq!(lines.next().unwrap(), "-100,40,2020,12.5");
    }

    #[test]
    fn write_csv_points_adds_categorical_columns() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("NASS_CDL.csv");
        let mut col = column();
        let mut rat = std::collections::BTreeMap::new();
        rat.insert(12, "Corn".to_string());
        col.categories = Some(CategoricalMeta { rat, colormap: std::collections::BTreeMap::new() });
        col.values[0].value = Some(12.0);
        let out = write_csv_points(vec![col], &path).unwrap();
        let contents = std::fs::read_to_string(&out).unwrap();
        assert!(contents.contains("PRISM_ppt_class_name"));
        assert!(contents.contains("Corn"));
    }

    /// Two dates for the same dataset/variable must become two rows per
    /// coordinate under one `PRISM_tmax` header, not two same-named columns
    /// with the second date dropped.
    #[test]
    fn write_csv_points_collapses_multiple_dates_into_rows() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("PRISM.csv");
        let may = PointColumn {
            dsid: "PRISM".to_string(),
            var: "tmax".to_string(),
            date: Some(RequestDate::monthly(2001, 5)),
            values: vec![PointValue { x: -100.0, y: 40.0, value: Some(20.0) }],
            categories: None,
        };
        let june = PointColumn {
            dsid: "PRISM".to_string(),
            var: "tmax".to_string(),
            date: Some(RequestDate::monthly(2001, 6)),
            values: vec![PointValue { x: -100.0, y: 40.0, value: Some(25.0) }],
            categories: None,
        };
        let out = write_csv_points(vec![may, june], &path).unwrap();
        let contents = std::fs::read_to_string(&out).unwrap();
        let mut lines = contents.lines();
        assert_eq!(lines.next().unwrap(), "x,y,time,PRISM_tmax");
        assert_eq!(lines.next().unwrap(), "-100,40,2001-05,20");
        assert_eq!(lines.next().unwrap(), "-100,40,2001-06,25");
        assert!(lines.next().is_none());
    }

    #[test]
    fn field_name_truncates_to_ten_chars() {
        assert_eq!(field_name("NASS_CDL_cdl_class_name").len(), 10);
    }
}

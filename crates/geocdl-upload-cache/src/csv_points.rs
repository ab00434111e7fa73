//! CSV point parsing: matches a handful of conventional column-name
//! spellings for x/y rather than requiring an exact header, mirroring
//! `upload_cache.py::_readCSV`.

use geo::{MultiPoint, Point};

const X_COLNAMES: &[&str] = &["x", "long", "longitude"];
const Y_COLNAMES: &[&str] = &["y", "lat", "latitude"];

fn find_header<'a>(headers: &'a csv::StringRecord, candidates: &[&str]) -> Option<usize> {
    headers.iter().position(|h| candidates.contains(&h.to_lowercase().trim()))
}

/// Reads x/y point coordinates out of a CSV file, matching header names
/// case-insensitively against [`X_COLNAMES`]/[`Y_COLNAMES`]. Returns `None`
/// if no matching header pair is found (the caller falls back to other
/// parsers).
pub fn read_csv_points(bytes: &[u8]) -> Option<MultiPoint<f64>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(bytes);
    let headers = rdr.headers().ok()?.clone();
    let x_idx = find_header(&headers, X_COLNAMES)?;
    let y_idx = find_header(&headers, Y_COLNAMES)?;

    let mut points = Vec::new();
    for result in rdr.records() {
        let record = result.ok()?;
        let x: f64 = record.get(x_idx)?.trim().parse().ok()?;
        let y: f64 = record.get(y_idx)?.trim().parse().ok()?;
        points.push(Point::new(x, y));
    }
    Some(MultiPoint::new(points))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_standard_xy_header() {
        let csv = "x,y,value\n1.0,2.0,5\n3.0,4.0,6\n";
        let mp = read_csv_points(csv.as_bytes()).unwrap();
        assert_eq!(mp.0.len(), 2);
        assert_eq!(mp.0[0], Point::new(1.0, 2.0));
    }

    #[test]
    fn parses_latitude_longitude_header_case_insensitive() {
        let csv = "ID,Longitude,Latitude\nA,-100.5,40.1\n";
        let mp = read_csv_points(csv.as_bytes()).unwrap();
        assert_eq!(mp.0[0], Point::new(-100.5, 40.1));
    }

    #[test]
    fn returns_none_without_matching_headers() {
        let csv = "a,b,c\n1,2,3\n";
        assert!(read_csv_points(csv.as_bytes()).is_none());
    }
}

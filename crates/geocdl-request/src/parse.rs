//! Pure query-string grammars consumed by the HTTP surface: the
//! `datasets`/`variables` string (§6.2) and the `clip`/`points` coordinate
//! string (§6.3). Neither touches the catalog — dataset-ID existence is
//! checked by [`crate::request::DataRequest::new`], not here, so these stay
//! unit-testable in isolation (Testable Property 6, clip determinism).

use geocdl_common::GeoCdlError;
use std::collections::BTreeMap;

/// Parses `dsid:var1,var2;dsid2:var1` into an ordered map of dataset ID to
/// requested variable names, preserving declaration order (§5 "Output
/// files are added ... in dataset-declaration order, then
/// variable-declaration order").
pub fn parse_datasets_string(s: &str) -> Result<Vec<(String, Vec<String>)>, GeoCdlError> {
    let mut out = Vec::new();
    for ds_spec in s.split(';') {
        let parts: Vec<&str> = ds_spec.splitn(2, ':').collect();
        if parts.len() != 2 {
            return Err(GeoCdlError::BadDateSpec(format!("Incorrect dataset specification: \"{}\".", ds_spec)));
        }
        let varnames: Vec<String> = parts[1].split(',').map(|s| s.to_string()).collect();
        if varnames.first().map(|v| v.is_empty()).unwrap_or(true) {
            return Err(GeoCdlError::BadDateSpec(format!("Incorrect dataset specification: \"{}\".", ds_spec)));
        }
        out.push((parts[0].to_string(), varnames));
    }
    Ok(out)
}

/// Same as [`parse_datasets_string`] but collapsed into a lookup map,
/// dropping declaration order — convenient for the constructor's
/// dataset-existence check.
pub fn datasets_as_map(parsed: &[(String, Vec<String>)]) -> BTreeMap<String, Vec<String>> {
    parsed.iter().cloned().collect()
}

/// Parses a semicolon- or parenthesized-comma-separated coordinate list:
/// `"x1,y1;x2,y2..."` or `"(x1,y1),(x2,y2)..."`.
pub fn parse_coords(coords_str: &str) -> Result<Vec<(f64, f64)>, GeoCdlError> {
    let bad = || GeoCdlError::BadDateSpec("Incorrect coordinate specification.".to_string());

    let coord_strs: Vec<String> = if coords_str.starts_with('(') {
        let mut parts: Vec<String> = coords_str.split("),").map(|c| c.trim_start_matches('(').to_string()).collect();
        if let Some(last) = parts.last_mut() {
            if let Some(stripped) = last.strip_suffix(')') {
                *last = stripped.to_string();
            } else {
                return Err(bad());
            }
        }
        parts
    } else {
        coords_str.split(';').map(|s| s.to_string()).collect()
    };

    let mut coords = Vec::with_capacity(coord_strs.len());
    for c in coord_strs {
        let parts: Vec<&str> = c.split(',').collect();
        if parts.len() != 2 {
            return Err(bad());
        }
        let x: f64 = parts[0].trim().parse().map_err(|_| bad())?;
        let y: f64 = parts[1].trim().parse().map_err(|_| bad())?;
        coords.push((x, y));
    }
    Ok(coords)
}

/// Parses a clip boundary: two coordinates auto-expand to a closed 5-vertex
/// bounding-box polygon (TL, TR, BR, BL, TL); more than two are treated as
/// polygon vertices, closed by duplicating the first vertex if the ring
/// isn't already closed (§6.3).
pub fn parse_clip_string(clip: &str) -> Result<Vec<(f64, f64)>, GeoCdlError> {
    if clip.is_empty() {
        return Ok(Vec::new());
    }
    let coords = parse_coords(clip)?;
    if coords.len() < 2 {
        return Err(GeoCdlError::BadDateSpec("Invalid clip geometry specification.".to_string()));
    }
    if coords.len() == 2 {
        let (x0, y0) = coords[0];
        let (x1, y1) = coords[1];
        Ok(vec![(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
    } else {
        let mut coords = coords;
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }
        Ok(coords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datasets_string_preserves_order() {
        let parsed = parse_datasets_string("PRISM:ppt,tmax;DaymetV4:tmax").unwrap();
        assert_eq!(parsed, vec![
            ("PRISM".to_string(), vec!["ppt".to_string(), "tmax".to_string()]),
            ("DaymetV4".to_string(), vec!["tmax".to_string()]),
        ]);
    }

    #[test]
    fn datasets_string_rejects_empty_varlist() {
        assert!(parse_datasets_string("PRISM:").is_err());
    }

    #[test]
    fn datasets_string_rejects_malformed_spec() {
        assert!(parse_datasets_string("PRISM").is_err());
    }

    #[test]
    fn coords_parse_both_syntaxes() {
        let paren = parse_coords("(1,2),(3,4)").unwrap();
        let semi = parse_coords("1,2;3,4").unwrap();
        assert_eq!(paren, vec![(1.0, 2.0), (3.0, 4.0)]);
        assert_eq!(paren, semi);
    }

    #[test]
    fn clip_two_coords_expands_to_bbox_ring() {
        let ring = parse_clip_string("(0,1),(1,0)").unwrap();
        assert_eq!(ring, vec![(0.0, 1.0), (1.0, 1.0), (1.0, 0.0), (0.0, 0.0), (0.0, 1.0)]);
    }

    #[test]
    fn clip_determinism_across_syntaxes() {
        let a = parse_clip_string("(0,1),(1,0)").unwrap();
        let b = parse_clip_string("0,1;1,0").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn clip_polygon_closes_unclosed_ring() {
        let ring = parse_clip_string("0,0;1,0;1,1").unwrap();
        assert_eq!(ring.first(), ring.last());
        assert_eq!(ring.len(), 4);
    }

    #[test]
    fn clip_polygon_leaves_closed_ring_untouched() {
        let ring = parse_clip_string("0,0;1,0;1,1;0,0").unwrap();
        assert_eq!(ring.len(), 4);
    }
}

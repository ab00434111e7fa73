//! UploadCache (C4): stores user-uploaded point/polygon subset files by
//! GUID, parses them via an extension-then-sniff fallback pipeline (CSV,
//! GeoJSON, zipped shapefile), and evicts them by filesystem access time.
//!
//! Grounded in `api_core/upload_cache.py::DataUploadCache`.

mod csv_points;
mod geojson_points;
mod shapefile_points;

use geo::{MultiPoint, Polygon};
use geocdl_common::{Crs, GeoCdlError, GeoCdlResult};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use uuid::Uuid;

/// Summary stats returned by [`UploadCache::get_stats`].
#[derive(Debug, Clone, Copy)]
pub struct UploadCacheStats {
    pub file_count: usize,
    pub total_bytes: u64,
}

/// On-disk store of user uploads, addressed by a random GUID prefix on the
/// filename (`<guid>_<original-name>`).
pub struct UploadCache {
    cache_dir: PathBuf,
    max_file_size: u64,
    retention: Duration,
    chunk_size: usize,
}

impl UploadCache {
    pub fn new(cache_dir: impl Into<PathBuf>, max_file_size: u64) -> GeoCdlResult<Self> {
        let cache_dir = cache_dir.into();
        fs::create_dir_all(&cache_dir)?;
        Ok(UploadCache {
            cache_dir,
            max_file_size,
            retention: Duration::from_secs(14_400),
            chunk_size: 1024,
        })
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Streams `data` to disk under a fresh GUID, checking size as it
    /// writes and deleting the partial file if `max_file_size` is
    /// exceeded, matching `addFile`'s chunked size guard.
    pub fn add_file(&self, data: &mut dyn Read, original_name: &str) -> GeoCdlResult<String> {
        let guid = Uuid::new_v4().to_string();
        let fname = format!("{guid}_{original_name}");
        let path = self.cache_dir.join(&fname);
        let mut out = File::create(&path)?;

        let mut buf = vec![0u8; self.chunk_size];
        let mut total: u64 = 0;
        loop {
            let n = data.read(&mut buf)?;
            if n == 0 {
                break;
            }
            total += n as u64;
            if total > self.max_file_size {
                drop(out);
                let _ = fs::remove_file(&path);
                return Err(GeoCdlError::UploadTooLarge);
            }
            out.write_all(&buf[..n])?;
        }
        Ok(guid)
    }

    fn find_file(&self, guid: &str) -> GeoCdlResult<PathBuf> {
        let prefix = format!("{guid}_");
        let mut matches = Vec::new();
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            if entry.file_name().to_string_lossy().starts_with(&prefix) {
                matches.push(entry.path());
            }
        }
        match matches.len() {
            0 => Err(GeoCdlError::UploadNotFound),
            1 => Ok(matches.remove(0)),
            _ => Err(GeoCdlError::UploadNotUnique),
        }
    }

    pub fn contains(&self, guid: &str) -> bool {
        self.find_file(guid).is_ok()
    }

    /// Parses the cached upload as a set of points.
    ///
    /// Dispatches by extension first, then (if that parser finds zero
    /// points) tries each other parser in turn, matching `getMultiPoint`'s
    /// extension-then-sniff fallback.
    pub fn get_multipoint(&self, guid: &str, crs_override: Option<Crs>) -> GeoCdlResult<(MultiPoint<f64>, Crs)> {
        let path = self.find_file(guid)?;
        let bytes = fs::read(&path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();

        let mut points: Vec<geo::Point<f64>> = Vec::new();
        let mut crs = crs_override.clone();

        let try_csv = |points: &mut Vec<geo::Point<f64>>| -> bool {
            if let Some(mp) = csv_points::read_csv_points(&bytes) {
                points.extend(mp.into_iter());
                true
            } else {
                false
            }
        };
        let try_geojson = |points: &mut Vec<geo::Point<f64>>| -> bool {
            if let Ok(gj) = std::str::from_utf8(&bytes).unwrap_or("").parse::<geojson::GeoJson>() {
                let pts = geojson_points::extract_points(&gj);
                if !pts.is_empty() {
                    points.extend(pts);
                    return true;
                }
            }
            false
        };
        let try_shapefile = |points: &mut Vec<geo::Point<f64>>, crs: &mut Option<Crs>| -> GeoCdlResult<bool> {
            if let Some(shp) = shapefile_points::read_zip(&bytes)? {
                let mp = shapefile_points::read_points(&shp.shp)?;
                if !mp.0.is_empty() {
                    if crs.is_none() {
                        if let Some(prj) = &shp.prj {
                            *crs = shapefile_points::crs_from_prj(prj);
                        }
                    }
                    points.extend(mp.into_iter());
                    return Ok(true);
                }
            }
            Ok(false)
        };

        let found = match ext.as_str() {
            "csv" => try_csv(&mut points),
            "json" | "geojson" => try_geojson(&mut points),
            "zip" => try_shapefile(&mut points, &mut crs)?,
            _ => false,
        };

        if !found {
            let _ = try_csv(&mut points)
                || try_geojson(&mut points)
                || try_shapefile(&mut points, &mut crs)?;
        }

        if points.is_empty() {
            return Err(GeoCdlError::UploadNotParseable);
        }
        let crs = crs.ok_or(GeoCdlError::UploadCrsUnresolved)?;
        Ok((MultiPoint::new(points), crs))
    }

    /// Parses the cached upload as a single polygon, using the same
    /// extension-then-sniff strategy as [`UploadCache::get_multipoint`].
    pub fn get_polygon(&self, guid: &str, crs_override: Option<Crs>) -> GeoCdlResult<(Polygon<f64>, Crs)> {
        let path = self.find_file(guid)?;
        let bytes = fs::read(&path)?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("").to_lowercase();
        let mut crs = crs_override.clone();

        let try_geojson = |crs: &mut Option<Crs>| -> GeoCdlResult<Option<Polygon<f64>>> {
            if let Ok(gj) = std::str::from_utf8(&bytes).unwrap_or("").parse::<geojson::GeoJson>() {
                return geojson_points::extract_polygon(&gj);
            }
            let _ = crs;
            Ok(None)
        };
        let try_shapefile = |crs: &mut Option<Crs>| -> GeoCdlResult<Option<Polygon<f64>>> {
            if let Some(shp) = shapefile_points::read_zip(&bytes)? {
                let poly = shapefile_points::read_polygon(&shp.shp)?;
                if crs.is_none() {
                    if let Some(prj) = &shp.prj {
                        *crs = shapefile_points::crs_from_prj(prj);
                    }
                }
                return Ok(Some(poly));
            }
            Ok(None)
        };

        let result = match ext.as_str() {
            "json" | "geojson" => try_geojson(&mut crs)?,
            "zip" => try_shapefile(&mut crs)?,
            _ => None,
        };
        let result = match result {
            Some(p) => Some(p),
            None => try_geojson(&mut crs)?.or(try_shapefile(&mut crs)?),
        };

        let poly = result.ok_or(GeoCdlError::UploadNotParseable)?;
        let crs = crs.ok_or(GeoCdlError::UploadCrsUnresolved)?;
        Ok((poly, crs))
    }

    /// Deletes cached files whose access time is older than `retention`.
    pub fn clean(&self) -> GeoCdlResult<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            let accessed = meta.accessed().unwrap_or(now);
            if now.duration_since(accessed).unwrap_or(Duration::ZERO) > self.retention {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    pub fn get_stats(&self) -> GeoCdlResult<UploadCacheStats> {
        let mut file_count = 0;
        let mut total_bytes = 0;
        for entry in fs::read_dir(&self.cache_dir)? {
            let entry = entry?;
            let meta = entry.metadata()?;
            if meta.is_file() {
                file_count += 1;
                total_bytes += meta.len();
            }
        }
        Ok(UploadCacheStats { file_count, total_bytes })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn add_file_then_contains() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        let guid = cache.add_file(&mut Cursor::new(b"x,y\n1,2\n".to_vec()), "points.csv").unwrap();
        assert!(cache.contains(&guid));
    }

    #[test]
    fn add_file_rejects_oversized_upload() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 4).unwrap();
        let err = cache.add_file(&mut Cursor::new(b"way too big".to_vec()), "f.csv").unwrap_err();
        assert!(matches!(err, GeoCdlError::UploadTooLarge));
    }

    #[test]
    fn get_multipoint_parses_csv() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        let guid = cache.add_file(&mut Cursor::new(b"x,y\n1.0,2.0\n3.0,4.0\n".to_vec()), "p.csv").unwrap();
        let (mp, _crs) = cache.get_multipoint(&guid, Some(Crs::wgs84())).unwrap();
        assert_eq!(mp.0.len(), 2);
    }

    #[test]
    fn get_multipoint_errors_without_crs() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        let guid = cache.add_file(&mut Cursor::new(b"x,y\n1.0,2.0\n".to_vec()), "p.csv").unwrap();
        let err = cache.get_multipoint(&guid, None).unwrap_err();
        assert!(matches!(err, GeoCdlError::UploadCrsUnresolved));
    }

    #[test]
    fn get_multipoint_parse_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        let guid = cache.add_file(&mut Cursor::new(b"x,y\n1.0,2.0\n3.0,4.0\n".to_vec()), "p.csv").unwrap();
        let (first, _) = cache.get_multipoint(&guid, Some(Crs::wgs84())).unwrap();
        let (second, _) = cache.get_multipoint(&guid, Some(Crs::wgs84())).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn contains_false_for_unknown_guid() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        assert!(!cache.contains("not-a-real-guid"));
    }

    #[test]
    fn clean_evicts_only_past_retention() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap().with_retention(Duration::from_millis(20));
        let guid = cache.add_file(&mut Cursor::new(b"x,y\n1,2\n".to_vec()), "stale.csv").unwrap();

        // Freshly written file is within retention: clean() leaves it alone.
        assert_eq!(cache.clean().unwrap(), 0);
        assert!(cache.contains(&guid));

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(cache.clean().unwrap(), 1);
        assert!(!cache.contains(&guid));
    }

    #[test]
    fn get_stats_counts_files() {
        let dir = tempdir().unwrap();
        let cache = UploadCache::new(dir.path(), 1_000_000).unwrap();
        cache.add_file(&mut Cursor::new(b"x,y\n1,2\n".to_vec()), "a.csv").unwrap();
        cache.add_file(&mut Cursor::new(b"x,y\n3,4\n".to_vec()), "b.csv").unwrap();
        let stats = cache.get_stats().unwrap();
        assert_eq!(stats.file_count, 2);
        assert!(stats.total_bytes > 0);
    }
}

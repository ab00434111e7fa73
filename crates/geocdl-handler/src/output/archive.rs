//! Output archive assembly (§4.5.4/§6.5), grounded in
//! `data_request_output.py::_zipContents` and the upload cache's existing
//! `zip` crate usage in `geocdl-upload-cache::shapefile_points::read_zip`.

use geocdl_common::{GeoCdlError, GeoCdlResult};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;

/// Zips `files` (plus a `metadata.json` built from `metadata`) into
/// `<out_dir>/<archive_name>.zip`. `metadata.json` is written as the
/// archive's first entry; every other file is stored flat, by basename
/// only — directory structure is not preserved (§6.5).
pub fn assemble_archive(
    metadata: &serde_json::Value,
    files: &[PathBuf],
    out_dir: &Path,
    archive_name: &str,
) -> GeoCdlResult<PathBuf> {
    let zip_path = out_dir.join(format!("{archive_name}.zip"));
    let zip_file = File::create(&zip_path)?;
    let mut writer = zip::ZipWriter::new(zip_file);
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    writer.start_file("metadata.json", options.clone()).map_err(zip_err)?;
    writer.write_all(serde_json::to_string_pretty(metadata)?.as_bytes())?;

    for path in files {
        let basename = path
            .file_name()
            .ok_or_else(|| GeoCdlError::Internal(format!("output file has no basename: {}", path.display())))?
            .to_string_lossy()
            .into_owned();
        writer.start_file(&basename, options.clone()).map_err(zip_err)?;
        let mut contents = Vec::new();
        File::open(path)?.read_to_end(&mut contents)?;
        writer.write_all(&contents)?;
    }

    writer.finish().map_err(zip_err)?;
    Ok(zip_path)
}

fn zip_err(e: zip::result::ZipError) -> GeoCdlError {
    GeoCdlError::Internal(format!("zip error: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Read as _;
    use tempfile::tempdir;

    #[test]
    fn assemble_archive_puts_metadata_first() {
        let dir = tempdir().unwrap();
        let data_path = dir.path().join("PRISM_ppt_2020.tif");
        std::fs::write(&data_path, b"fake tif").unwrap();

        let zip_path = assemble_archive(&json!({"request": "test"}), &[data_path], dir.path(), "geocdl_subset_ab12cd34").unwrap();

        let file = File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        assert_eq!(archive.by_index(0).unwrap().name(), "metadata.json");

        let mut found_tif = false;
        for i in 0..archive.len() {
            if archive.by_index(i).unwrap().name() == "PRISM_ppt_2020.tif" {
                found_tif = true;
            }
        }
        assert!(found_tif);
    }

    #[test]
    fn assemble_archive_flattens_nested_paths() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("nested");
        std::fs::create_dir(&nested).unwrap();
        let data_path = nested.join("GTOPO30_elev.tif");
        std::fs::write(&data_path, b"fake tif").unwrap();

        let zip_path = assemble_archive(&json!({}), &[data_path], dir.path(), "geocdl_subset_zzzz1111").unwrap();
        let file = File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_name("GTOPO30_elev.tif").unwrap();
        let mut buf = String::new();
        entry.read_to_string(&mut buf).unwrap();
        assert_eq!(buf, "fake tif");
    }
}

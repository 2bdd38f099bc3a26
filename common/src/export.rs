// Bulk JSON export of laws

use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::errors::ExportError;
use crate::schemas::{DataResponse, LawAllFields};

pub const LAWS_DIR: &str = "laws";
pub const ALL_LAWS_GZ: &str = "all_laws.json.gz";
pub const ALL_LAWS_TARBALL: &str = "all_laws.tar.gz";

fn write_pretty_json<W: Write, T: Serialize>(mut writer: W, value: &T) -> Result<(), ExportError> {
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write `dir/<slug>.json`
pub fn write_law_json_file(law: &LawAllFields, dir: &Path) -> Result<PathBuf, ExportError> {
    let path = dir.join(format!("{}.json", law.slug()));
    let file = File::create(&path)?;
    write_pretty_json(BufWriter::new(file), &DataResponse::new(law))?;
    Ok(path)
}

/// Write one file per law under `dir/laws/` plus a gzipped file with all laws
#[instrument(skip(laws), fields(count = laws.len()))]
pub fn write_all_law_json_files(laws: &[LawAllFields], dir: &Path) -> Result<(), ExportError> {
    let laws_dir = dir.join(LAWS_DIR);
    fs::create_dir_all(&laws_dir)?;

    for law in laws {
        write_law_json_file(law, &laws_dir)?;
    }

    let file = File::create(dir.join(ALL_LAWS_GZ))?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    write_pretty_json(&mut encoder, &DataResponse::new(laws))?;
    encoder.finish()?.flush()?;

    info!(dir = %dir.display(), "Wrote law JSON files");
    Ok(())
}

/// Write all JSON files and bundle the per-law files into a tarball
#[instrument(skip(laws), fields(count = laws.len()))]
pub fn generate_bulk_law_files(laws: &[LawAllFields], dir: &Path) -> Result<(), ExportError> {
    write_all_law_json_files(laws, dir)?;

    let file = File::create(dir.join(ALL_LAWS_TARBALL))?;
    let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all(LAWS_DIR, dir.join(LAWS_DIR))?;
    builder.into_inner()?.finish()?.flush()?;

    info!(dir = %dir.display(), "Wrote bulk law files");
    Ok(())
}

pub mod geojson;

use std::path::{Path, PathBuf};

use strum::{Display, EnumIter, EnumString, IntoStaticStr, VariantNames};

use crate::{
    annotations::AnnotationRecord,
    error::{FootprintError, Result},
};

pub use self::geojson::FootprintCollection;

/// Serialization of a single prediction.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq,
    Display, EnumString, EnumIter, VariantNames, IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum OutputFormat {
    /// GeoJSON FeatureCollection, one polygon feature per footprint
    #[default]
    Geojson,
    /// Plain JSON array of `{outline, score}` objects
    Json,
}

/// All files below `dir` with the given extension, sorted by path.
pub fn discover_images(dir: &Path, extension: &str) -> Result<Vec<PathBuf>> {
    let pattern = dir.join("**").join(format!("*.{extension}"));
    let pattern = pattern.to_string_lossy();
    let mut images = glob::glob(&pattern)?
        .map(|entry| entry.map_err(|e| FootprintError::Io(e.into())))
        .collect::<Result<Vec<_>>>()?;
    images.sort();
    Ok(images)
}

/// Write annotation records as one JSON array.
pub fn write_annotations(path: &Path, records: &[AnnotationRecord]) -> Result<()> {
    use std::io::Write;

    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer(&mut writer, records)?;
    writer.flush()?;
    Ok(())
}

pub fn read_annotations(path: &Path) -> Result<Vec<AnnotationRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

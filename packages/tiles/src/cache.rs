//! Content hash of a tile batch, used by the renderer to skip redundant
//! redraws.

use geojson::FeatureCollection;

use crate::TilesError;

/// MD5 hex digest of the batch's JSON serialization.
///
/// Property maps serialize with sorted keys, so two structurally
/// identical batches hash equally. Feature order is part of the
/// serialization: reordering features changes the key.
///
/// # Errors
///
/// Returns [`TilesError::Json`] if the batch cannot be serialized.
pub fn cache_key(tiles: &FeatureCollection) -> Result<String, TilesError> {
    let bytes = serde_json::to_vec(tiles)?;
    Ok(format!("{:x}", md5::compute(&bytes)))
}

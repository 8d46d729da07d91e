// Error type for the fallible, load-shaped operations of the library.
//
// Structural outcomes (a tank failing to form, a re-check tearing a tank
// down, a fill that moves zero units) are not errors; they are booleans or
// enums returned to the caller. `TankError` only covers decoding outside
// data: config JSON, persisted valve records, and full site saves.

use crate::types::VoxelCoord;

#[derive(Debug, thiserror::Error)]
pub enum TankError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid tank config: {0}")]
    InvalidConfig(String),

    #[error("unknown orientation code {0}")]
    InvalidOrientation(i32),

    #[error("invalid valve record at {coord}: {reason}")]
    InvalidRecord { coord: VoxelCoord, reason: String },
}

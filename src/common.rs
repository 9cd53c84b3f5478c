//! Common types and constants used throughout the project.

use std::path::{Path, PathBuf};

// ============================================================================
// Input / output layout
// ============================================================================

/// The action log, relative to the input directory. Required.
pub const ACTIONS_FILE: &str = "actions.csv";

/// Optional sidecar selecting the resize mode.
pub const CONFIG_FILE: &str = "dataset_config.json";

/// Directory holding one `frame_{frame:06}.png` per recorded frame.
pub const FRAMES_DIR: &str = "frames";

/// Default output filename, placed inside the input directory.
pub const DEFAULT_OUTPUT_FILE: &str = "train.parquet";

/// Default input directory for the `convert` binary.
pub const DEFAULT_INPUT_DIR: &str = "nitrogen_dataset";

/// Side length of every normalized frame.
pub const TARGET_SIZE: u32 = 256;

// ============================================================================
// Column names
// ============================================================================

/// Frame index column of the action log.
pub const FRAME_COLUMN: &str = "frame";

/// Raw analog stick columns of the action log.
pub const STICK_X_COLUMN: &str = "stick_x";
pub const STICK_Y_COLUMN: &str = "stick_y";

/// The fourteen digital button columns, in output order.
pub const BUTTON_COLUMNS: [&str; 14] = [
    "south",
    "east",
    "west",
    "north",
    "left_shoulder",
    "right_shoulder",
    "left_trigger",
    "right_trigger",
    "start",
    "back",
    "dpad_up",
    "dpad_down",
    "dpad_left",
    "dpad_right",
];

/// Stick clicks and the guide button. Written right after [`BUTTON_COLUMNS`].
pub const AUX_COLUMNS: [&str; 3] = ["left_thumb", "right_thumb", "guide"];

pub const J_LEFT_COLUMN: &str = "j_left";
pub const J_RIGHT_COLUMN: &str = "j_right";
pub const IMAGE_COLUMN: &str = "image";

/// All seventeen digital columns in output order.
pub fn digital_columns() -> impl Iterator<Item = &'static str> {
    BUTTON_COLUMNS.iter().chain(AUX_COLUMNS.iter()).copied()
}

/// `frames/frame_000042.png` for frame 42.
pub fn frame_path(frames_dir: &Path, frame: u64) -> PathBuf {
    frames_dir.join(format!("frame_{frame:06}.png"))
}

// ============================================================================
// Per-row image outcome
// ============================================================================

/// What happened to one row's screenshot.
///
/// Only [`FrameImage::Encoded`] yields a value in the `image` column; the
/// other variants are written as null, never as an empty blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameImage {
    /// Normalized and re-encoded PNG bytes.
    Encoded(Vec<u8>),
    /// No file at the expected path.
    Missing,
    /// The file existed (or the row had no usable frame index) but could not
    /// be turned into an encoded image.
    Failed(String),
}

impl FrameImage {
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            FrameImage::Encoded(bytes) => Some(bytes.as_slice()),
            FrameImage::Missing | FrameImage::Failed(_) => None,
        }
    }

    pub fn is_encoded(&self) -> bool {
        matches!(self, FrameImage::Encoded(_))
    }
}

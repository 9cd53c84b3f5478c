//! Dataset assembly: action log + sidecar config + frames → one Parquet file.
//!
//! ## Steps
//!
//! 1. Require `actions.csv`; load it with columns and row order intact.
//! 2. Resolve the resize mode from `dataset_config.json` (default `pad`).
//! 3. If enabled and `frames/` exists, load, normalize and PNG-encode the frame
//!    of every row. A bad frame only nulls its own cell.
//! 4. Project the log onto the fixed output schema and write it once.
//!
//! Only a missing input, an unreadable action log, or a failed write abort
//! the run.

use std::io::Cursor;
use std::path::Path;
use std::time::Instant;

use image::{ImageFormat, RgbImage};
use indicatif::{HumanCount, HumanDuration, ProgressBar, ProgressStyle};
use tracing::{info, warn};

use crate::actions::ActionLog;
use crate::common::*;
use crate::config::DatasetConfig;
use crate::dataset::Dataset;
use crate::error::{ConvertError, FrameError};
use crate::normalize::{AreaNormalizer, FrameNormalizer, ResizeMode};

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssembleReport {
    pub rows: usize,
    pub resize_mode: ResizeMode,
    /// Whether an `image` column was written.
    pub image_column: bool,
    pub encoded: usize,
    pub missing: usize,
    pub failed: usize,
}

impl AssembleReport {
    fn new(rows: usize, resize_mode: ResizeMode, images: Option<&[FrameImage]>) -> Self {
        let mut report = Self {
            rows,
            resize_mode,
            image_column: images.is_some(),
            encoded: 0,
            missing: 0,
            failed: 0,
        };
        for image in images.unwrap_or_default() {
            match image {
                FrameImage::Encoded(_) => report.encoded += 1,
                FrameImage::Missing => report.missing += 1,
                FrameImage::Failed(_) => report.failed += 1,
            }
        }
        report
    }
}

/// Convert `input_dir` into `output_file` with the area-averaging normalizer.
pub fn assemble(
    input_dir: &Path,
    output_file: &Path,
    process_images: bool,
) -> Result<AssembleReport, ConvertError> {
    Assembler::new().run(input_dir, output_file, process_images)
}

/// Runs a conversion with a pluggable [`FrameNormalizer`].
#[derive(Debug, Default)]
pub struct Assembler<N = AreaNormalizer> {
    normalizer: N,
}

impl Assembler<AreaNormalizer> {
    pub fn new() -> Self {
        Self::default()
    }
}

impl<N: FrameNormalizer> Assembler<N> {
    pub fn with_normalizer(normalizer: N) -> Self {
        Self { normalizer }
    }

    pub fn normalizer(&self) -> &N {
        &self.normalizer
    }

    pub fn run(
        &self,
        input_dir: &Path,
        output_file: &Path,
        process_images: bool,
    ) -> Result<AssembleReport, ConvertError> {
        if !input_dir.is_dir() {
            return Err(ConvertError::InputDirNotFound(input_dir.to_path_buf()));
        }
        let actions_path = input_dir.join(ACTIONS_FILE);
        if !actions_path.exists() {
            return Err(ConvertError::ActionLogNotFound(actions_path));
        }

        let start = Instant::now();

        info!("Reading action log: {}", actions_path.display());
        let log = ActionLog::load(&actions_path)?;

        let mode = DatasetConfig::load(&input_dir.join(CONFIG_FILE)).resize_mode();

        let frames_dir = input_dir.join(FRAMES_DIR);
        let images = if !process_images {
            warn!("Skipping image processing (disabled)");
            None
        } else if !frames_dir.is_dir() {
            warn!(
                "Skipping image processing: frames directory not found: {}",
                frames_dir.display()
            );
            None
        } else {
            info!("Processing images and embedding into parquet (mode: {mode})...");
            Some(self.process_frames(&log, &frames_dir, mode))
        };

        let report = AssembleReport::new(log.num_rows(), mode, images.as_deref());
        let dataset = Dataset::from_action_log(&log, images)?;

        info!("Saving parquet to: {}", output_file.display());
        dataset.write_parquet(output_file)?;
        info!(
            "Successfully converted dataset: {} rows in {}",
            HumanCount(dataset.num_rows() as u64),
            HumanDuration(start.elapsed())
        );

        Ok(report)
    }

    /// One outcome per row, in row order.
    fn process_frames(&self, log: &ActionLog, frames_dir: &Path, mode: ResizeMode) -> Vec<FrameImage> {
        let total = log.num_rows();
        let Some(frames) = log.frame_indices() else {
            let e = FrameError::NoFrameColumn;
            warn!("{e}; every image will be empty");
            return vec![FrameImage::Failed(e.to_string()); total];
        };

        let pb = progress_bar(total);
        let mut images = Vec::with_capacity(total);
        for (row, frame) in frames.into_iter().enumerate() {
            let outcome = match frame {
                Some(frame) => self.process_frame(frames_dir, frame, mode),
                None => {
                    let e = FrameError::InvalidFrameIndex { row };
                    warn!("Skipping image: {e}");
                    FrameImage::Failed(e.to_string())
                }
            };
            images.push(outcome);
            pb.inc(1);
        }
        pb.finish_and_clear();
        info!("  Processed {total}/{total} frames. Done.");

        images
    }

    fn process_frame(&self, frames_dir: &Path, frame: u64, mode: ResizeMode) -> FrameImage {
        let path = frame_path(frames_dir, frame);
        if !path.exists() {
            warn!("Missing image for frame {frame}: {}", path.display());
            return FrameImage::Missing;
        }

        let encoded = load_frame(&path).and_then(|raw| {
            let normalized = self.normalizer.normalize(raw, mode);
            encode_png(&normalized)
        });
        match encoded {
            Ok(bytes) => FrameImage::Encoded(bytes),
            Err(e) => {
                warn!("Error processing frame {frame}: {e}");
                FrameImage::Failed(e.to_string())
            }
        }
    }
}

/// Decode any supported image and convert it to 8-bit RGB.
pub fn load_frame(path: &Path) -> Result<RgbImage, FrameError> {
    let img = image::open(path).map_err(|source| FrameError::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(img.to_rgb8())
}

/// Lossless PNG encoding of a normalized frame.
pub fn encode_png(img: &RgbImage) -> Result<Vec<u8>, FrameError> {
    let mut cursor = Cursor::new(Vec::new());
    img.write_to(&mut cursor, ImageFormat::Png)
        .map_err(FrameError::Encode)?;
    Ok(cursor.into_inner())
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::with_template(
        "  Frames     {bar:40.cyan/blue} {pos}/{len} frames [{elapsed_precise}, ETA {eta_precise}]",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb
}

//! Convert a recording directory into a NitroGen parquet dataset.
//!
//! ## Input
//!
//! - `<input>/actions.csv`: one row per frame (required)
//! - `<input>/dataset_config.json`: `{"resize_mode": "stretch" | "crop" | "pad"}` (optional)
//! - `<input>/frames/frame_NNNNNN.png`: one screenshot per frame (optional)
//!
//! ## Usage
//!
//! ```sh
//! cargo run --release --bin convert -- --input nitrogen_dataset
//! cargo run --release --bin convert -- -i recordings/run1 -o out/run1.parquet --skip-images
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use nitrogen_dataset::assemble::assemble;
use nitrogen_dataset::common::{DEFAULT_INPUT_DIR, DEFAULT_OUTPUT_FILE};

#[derive(Parser, Debug)]
#[command(about = "Convert an actions.csv + frames/ recording into a NitroGen parquet dataset")]
struct Args {
    /// Input directory containing actions.csv and frames/.
    #[arg(short, long, default_value = DEFAULT_INPUT_DIR)]
    input: PathBuf,

    /// Output parquet file (default: <input>/train.parquet).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Skip image processing (only convert the action log).
    #[arg(long, default_value_t = false)]
    skip_images: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();

    let input_dir = std::path::absolute(&args.input)?;
    let output_file = match &args.output {
        Some(path) => std::path::absolute(path)?,
        None => input_dir.join(DEFAULT_OUTPUT_FILE),
    };

    info!("Input:  {}", input_dir.display());
    info!("Output: {}", output_file.display());

    let report = assemble(&input_dir, &output_file, !args.skip_images).inspect_err(|e| error!("{e}"))?;

    info!(
        "Wrote {} rows (resize_mode={})",
        report.rows, report.resize_mode
    );
    if report.image_column {
        info!(
            "  Images: {} embedded, {} missing, {} failed",
            report.encoded, report.missing, report.failed
        );
    }
    Ok(())
}

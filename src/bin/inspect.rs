//! Inspect a converted dataset: dump schema, button statistics, image coverage
//! and sample rows in a human-readable format.
//!
//! ## Usage
//!
//! ```sh
//! cargo run --release --bin inspect -- --dataset nitrogen_dataset/train.parquet
//! cargo run --release --bin inspect -- --dataset nitrogen_dataset/train.parquet --sample-rows 10
//! ```

use std::path::PathBuf;

use arrow::array::{Array, AsArray, Float64Array, ListArray};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use nitrogen_dataset::common::*;
use nitrogen_dataset::dataset::Dataset;

#[derive(Parser, Debug)]
#[command(about = "Inspect a converted parquet dataset")]
struct Args {
    /// Path to the parquet file written by `convert`.
    #[arg(long)]
    dataset: PathBuf,

    /// Number of sample rows to dump (0 to skip).
    #[arg(long, default_value_t = 5)]
    sample_rows: usize,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let batch = Dataset::read_parquet(&args.dataset)?;
    let num_rows = batch.num_rows();
    let images = batch.column_by_name(IMAGE_COLUMN).map(|c| c.as_binary::<i32>().clone());

    // ── Overview ──────────────────────────────────────────────────────────
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║  Dataset: {}", args.dataset.display());
    println!("╠══════════════════════════════════════════════════════════════╣");
    println!("║  Rows:       {num_rows:>10}");
    println!("║  Columns:    {:>10}", batch.num_columns());
    match &images {
        Some(blobs) => {
            let present = blobs.len() - blobs.null_count();
            let bytes: usize = (0..blobs.len())
                .filter(|&i| blobs.is_valid(i))
                .map(|i| blobs.value(i).len())
                .sum();
            println!(
                "║  Images:     {present:>10} present, {} absent, {} bytes",
                blobs.null_count(),
                bytes
            );
        }
        None => println!("║  Images:     {:>10}", "(no column)"),
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    // ── Schema ────────────────────────────────────────────────────────────
    println!("┌─ Schema");
    for (i, field) in batch.schema().fields().iter().enumerate() {
        let nullable = if field.is_nullable() { " (nullable)" } else { "" };
        println!("│  [{i:>2}] {} : {}{nullable}", field.name(), field.data_type());
    }
    println!("└─");
    println!();

    // ── Digital columns ───────────────────────────────────────────────────
    println!("┌─ Digital columns (pressed / total)");
    for name in digital_columns() {
        match batch.column_by_name(name) {
            Some(col) => {
                let pressed = col.as_boolean().true_count();
                let pct = if num_rows > 0 {
                    pressed as f64 / num_rows as f64 * 100.0
                } else {
                    0.0
                };
                println!("│  {name:>14}: {pressed:>8} / {num_rows} ({pct:5.1}%)");
            }
            None => println!("│  {name:>14}: (missing)"),
        }
    }
    println!("└─");

    if args.sample_rows > 0 {
        println!();
        print_samples(&batch, args.sample_rows);
    }

    Ok(())
}

fn stick(batch: &RecordBatch, name: &str, row: usize) -> String {
    let Some(list) = batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<ListArray>())
    else {
        return "-".to_string();
    };
    let values = list.value(row);
    match values.as_any().downcast_ref::<Float64Array>() {
        Some(v) => format!(
            "[{}]",
            v.values()
                .iter()
                .map(|x| format!("{x:+.3}"))
                .collect::<Vec<_>>()
                .join(", ")
        ),
        None => "-".to_string(),
    }
}

fn print_samples(batch: &RecordBatch, sample_rows: usize) {
    let n = batch.num_rows();
    let show = n.min(sample_rows);
    let images = batch.column_by_name(IMAGE_COLUMN).map(|c| c.as_binary::<i32>());

    println!("┌─ Sample rows (first {show} of {n})");
    for row in 0..show {
        let pressed: Vec<&str> = digital_columns()
            .filter(|name| {
                batch
                    .column_by_name(name)
                    .is_some_and(|c| c.as_boolean().value(row))
            })
            .collect();
        let pressed = if pressed.is_empty() {
            "(none)".to_string()
        } else {
            pressed.join(" ")
        };

        let image = match images {
            None => String::new(),
            Some(blobs) if blobs.is_null(row) => "  image: (absent)".to_string(),
            Some(blobs) => {
                let bytes = blobs.value(row);
                match image::load_from_memory(bytes) {
                    Ok(img) => format!(
                        "  image: {} bytes, {}x{}",
                        bytes.len(),
                        img.width(),
                        img.height()
                    ),
                    Err(e) => format!("  image: {} bytes, undecodable ({e})", bytes.len()),
                }
            }
        };

        println!(
            "│  {row:>6}  j_left={} j_right={}  buttons: {pressed}{image}",
            stick(batch, J_LEFT_COLUMN, row),
            stick(batch, J_RIGHT_COLUMN, row),
        );
    }
    println!("└─");
}

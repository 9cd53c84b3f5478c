//! The action log: `actions.csv` loaded as a single Arrow `RecordBatch`, plus
//! the coercions that turn its loosely typed columns into controller state.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

use arrow::array::*;
use arrow::compute::concat_batches;
use arrow::csv::ReaderBuilder;
use arrow::csv::reader::Format;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatch;
use tracing::{info, warn};

use crate::common::{FRAME_COLUMN, STICK_X_COLUMN, STICK_Y_COLUMN};
use crate::error::ConvertError;

/// One row per recorded frame, with columns and row order exactly as in the CSV.
#[derive(Debug, Clone)]
pub struct ActionLog {
    batch: RecordBatch,
}

impl ActionLog {
    /// Read a CSV with a header row. Column types are inferred over the whole
    /// file.
    pub fn load(path: &Path) -> Result<Self, ConvertError> {
        let read_err = |source| ConvertError::ReadActionLog {
            path: path.to_path_buf(),
            source,
        };

        let mut file = File::open(path)?;
        let format = Format::default().with_header(true);
        let (schema, _) = format.infer_schema(&mut file, None).map_err(read_err)?;
        file.seek(SeekFrom::Start(0))?;

        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .build(file)
            .map_err(read_err)?;
        let batches: Vec<RecordBatch> = reader.collect::<Result<Vec<_>, _>>().map_err(read_err)?;
        let batch = concat_batches(&schema, &batches).map_err(read_err)?;

        info!(
            "  {} rows, {} columns: [{}]",
            batch.num_rows(),
            batch.num_columns(),
            batch
                .schema()
                .fields()
                .iter()
                .map(|f| format!("{}: {}", f.name(), f.data_type()))
                .collect::<Vec<_>>()
                .join(", ")
        );

        Ok(Self { batch })
    }

    pub fn from_batch(batch: RecordBatch) -> Self {
        Self { batch }
    }

    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    pub fn column(&self, name: &str) -> Option<&ArrayRef> {
        self.batch.column_by_name(name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Frame index per row, or `None` if the log has no `frame` column.
    /// Null, negative and non-numeric cells have no frame index.
    pub fn frame_indices(&self) -> Option<Vec<Option<u64>>> {
        let array = self.column(FRAME_COLUMN)?;
        let n = array.len();
        let Some(ints) = cast_to_i64(array.as_ref()) else {
            warn!(
                "Column '{FRAME_COLUMN}' of type {} is not numeric",
                array.data_type()
            );
            return Some(vec![None; n]);
        };
        Some(
            (0..n)
                .map(|i| {
                    if ints.is_null(i) {
                        None
                    } else {
                        u64::try_from(ints.value(i)).ok()
                    }
                })
                .collect(),
        )
    }

    /// The named digital column coerced to non-null booleans; all `false` if
    /// the column is absent.
    pub fn digital(&self, name: &str) -> BooleanArray {
        match self.column(name) {
            Some(array) => coerce_bool(name, array.as_ref()),
            None => BooleanArray::from(vec![false; self.num_rows()]),
        }
    }

    /// `[stick_x, stick_y]` per row when both columns exist. Cells that are
    /// null or cannot be read as numbers become `NaN`.
    pub fn left_stick(&self) -> Option<Vec<[f64; 2]>> {
        let x = self.column(STICK_X_COLUMN)?;
        let y = self.column(STICK_Y_COLUMN)?;
        let xs = float_values(STICK_X_COLUMN, x.as_ref());
        let ys = float_values(STICK_Y_COLUMN, y.as_ref());
        Some(xs.into_iter().zip(ys).map(|(x, y)| [x, y]).collect())
    }
}

// ============================================================================
// Coercion helpers
// ============================================================================

/// Cast an Arrow array to Int64 (handles any integer, float or numeric string).
fn cast_to_i64(array: &dyn Array) -> Option<Int64Array> {
    arrow::compute::cast(array, &DataType::Int64)
        .ok()
        .and_then(|a| a.as_any().downcast_ref::<Int64Array>().cloned())
}

/// Cast an Arrow array to Float64. Unparseable strings become null.
fn cast_to_f64(array: &dyn Array) -> Option<Float64Array> {
    arrow::compute::cast(array, &DataType::Float64)
        .ok()
        .and_then(|a| a.as_any().downcast_ref::<Float64Array>().cloned())
}

/// Extract string values (Utf8 or LargeUtf8).
fn array_to_strings(array: &dyn Array) -> Option<Vec<Option<String>>> {
    let utf8 = arrow::compute::cast(array, &DataType::Utf8).ok()?;
    let sa = utf8.as_any().downcast_ref::<StringArray>()?;
    Some(
        (0..sa.len())
            .map(|i| {
                if sa.is_null(i) {
                    None
                } else {
                    Some(sa.value(i).to_string())
                }
            })
            .collect(),
    )
}

fn float_values(name: &str, array: &dyn Array) -> Vec<f64> {
    match cast_to_f64(array) {
        Some(fa) => (0..fa.len())
            .map(|i| if fa.is_null(i) { f64::NAN } else { fa.value(i) })
            .collect(),
        None => {
            warn!(
                "Column '{name}' of type {} cannot be read as float",
                array.data_type()
            );
            vec![f64::NAN; array.len()]
        }
    }
}

/// Truthiness of one text cell.
pub fn parse_truthy(s: &str) -> bool {
    let s = s.trim();
    match s.to_ascii_lowercase().as_str() {
        "true" | "t" | "yes" | "y" | "on" => true,
        "false" | "f" | "no" | "n" | "off" | "" => false,
        _ => match s.parse::<f64>() {
            Ok(v) => v != 0.0,
            Err(_) => true,
        },
    }
}

/// Coerce any loaded column to a non-null boolean column. An empty cell is a
/// missing value and counts as pressed, like NaN; numbers are `true` when
/// nonzero.
fn coerce_bool(name: &str, array: &dyn Array) -> BooleanArray {
    let n = array.len();
    let bits: Vec<bool> = match array.data_type() {
        DataType::Boolean => match array.as_any().downcast_ref::<BooleanArray>() {
            Some(ba) => (0..n).map(|i| ba.is_null(i) || ba.value(i)).collect(),
            None => vec![true; n],
        },
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => match array_to_strings(array)
        {
            Some(strings) => strings
                .iter()
                .map(|s| s.as_deref().is_none_or(parse_truthy))
                .collect(),
            None => vec![true; n],
        },
        DataType::Null => vec![true; n],
        other => match cast_to_f64(array) {
            Some(fa) => (0..n)
                .map(|i| fa.is_null(i) || fa.value(i) != 0.0)
                .collect(),
            None => {
                warn!("Column '{name}' of type {other} cannot be read as boolean; using false");
                vec![false; n]
            }
        },
    };
    BooleanArray::from(bits)
}

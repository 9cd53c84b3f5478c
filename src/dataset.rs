//! The output table: fixed schema, construction from an action log, and
//! Parquet persistence.
//!
//! ## Schema
//!
//! | columns                                   | arrow type      | nulls |
//! |-------------------------------------------|-----------------|-------|
//! | 14 buttons (`south` .. `dpad_right`)      | `Boolean`       | no    |
//! | `left_thumb`, `right_thumb`, `guide`      | `Boolean`       | no    |
//! | `j_left`, `j_right`                       | `List<Float64>` | no    |
//! | `image` (only when frames were processed) | `Binary` (PNG)  | yes   |
//!
//! A null `image` cell means no frame was available for that row.

use std::fs::{self, File};
use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use arrow::array::*;
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Field, Float64Type, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::basic::Compression;
use parquet::errors::ParquetError;
use parquet::file::properties::WriterProperties;

use crate::actions::ActionLog;
use crate::common::*;
use crate::error::ConvertError;

/// Rows per record batch handed to the Parquet writer. Keeps the `image`
/// column's 32-bit offsets far from overflow however many frames there are.
const WRITE_BATCH_ROWS: usize = 1024;

/// The neutral stick position.
pub const STICK_CENTER: [f64; 2] = [0.0, 0.0];

fn stick_field(name: &str) -> Field {
    Field::new(
        name,
        DataType::List(Arc::new(Field::new_list_field(DataType::Float64, true))),
        false,
    )
}

/// The output schema. Column order is fixed.
pub fn dataset_schema(with_image: bool) -> SchemaRef {
    let mut fields: Vec<Field> = digital_columns()
        .map(|name| Field::new(name, DataType::Boolean, false))
        .collect();
    fields.push(stick_field(J_LEFT_COLUMN));
    fields.push(stick_field(J_RIGHT_COLUMN));
    if with_image {
        fields.push(Field::new(IMAGE_COLUMN, DataType::Binary, true));
    }
    Arc::new(Schema::new(fields))
}

/// The assembled dataset, held in memory until it is written once.
#[derive(Debug, Clone)]
pub struct Dataset {
    /// One array per entry of [`digital_columns`], same order.
    digital: Vec<BooleanArray>,
    j_left: Vec<[f64; 2]>,
    j_right: Vec<[f64; 2]>,
    image: Option<Vec<FrameImage>>,
    num_rows: usize,
}

impl Dataset {
    /// Project an action log onto the output schema.
    ///
    /// Digital columns missing from the log are all `false`. `j_left` is
    /// `[stick_x, stick_y]` when both exist and the stick center otherwise.
    /// `j_right` is always the stick center. `image`, when given, must hold
    /// one outcome per row.
    pub fn from_action_log(
        log: &ActionLog,
        image: Option<Vec<FrameImage>>,
    ) -> Result<Self, ConvertError> {
        let num_rows = log.num_rows();
        if let Some(images) = image.as_ref().map(Vec::len).filter(|&n| n != num_rows) {
            return Err(ConvertError::ImageCountMismatch {
                rows: num_rows,
                images,
            });
        }

        let digital = digital_columns().map(|name| log.digital(name)).collect();
        let j_left = log
            .left_stick()
            .unwrap_or_else(|| vec![STICK_CENTER; num_rows]);
        let j_right = vec![STICK_CENTER; num_rows];

        Ok(Self {
            digital,
            j_left,
            j_right,
            image,
            num_rows,
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }

    pub fn schema(&self) -> SchemaRef {
        dataset_schema(self.has_image())
    }

    /// Rows `range` as a record batch in the output schema.
    pub fn record_batch(&self, range: Range<usize>) -> Result<RecordBatch, arrow::error::ArrowError> {
        let len = range.len();
        let mut columns: Vec<ArrayRef> = self
            .digital
            .iter()
            .map(|col| Arc::new(col.slice(range.start, len)) as ArrayRef)
            .collect();
        columns.push(Arc::new(stick_array(&self.j_left[range.clone()])));
        columns.push(Arc::new(stick_array(&self.j_right[range.clone()])));
        if let Some(images) = &self.image {
            let blobs: BinaryArray = images[range].iter().map(FrameImage::as_bytes).collect();
            columns.push(Arc::new(blobs));
        }
        RecordBatch::try_new(self.schema(), columns)
    }

    /// Write the whole dataset to `path` (Snappy-compressed Parquet). The
    /// parent directory is created if needed.
    pub fn write_parquet(&self, path: &Path) -> Result<(), ConvertError> {
        self.try_write_parquet(path)
            .map_err(|source| ConvertError::WriteDataset {
                path: path.to_path_buf(),
                source,
            })
    }

    fn try_write_parquet(&self, path: &Path) -> Result<(), ParquetError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = File::create(path)?;
        let props = WriterProperties::builder()
            .set_compression(Compression::SNAPPY)
            .build();
        let mut writer = ArrowWriter::try_new(file, self.schema(), Some(props))?;

        let mut start = 0;
        while start < self.num_rows {
            let end = (start + WRITE_BATCH_ROWS).min(self.num_rows);
            writer.write(&self.record_batch(start..end)?)?;
            start = end;
        }
        writer.close()?;
        Ok(())
    }

    /// Read a written dataset back as a single record batch.
    pub fn read_parquet(path: &Path) -> Result<RecordBatch, ConvertError> {
        read_batches(path).map_err(|source| ConvertError::ReadDataset {
            path: path.to_path_buf(),
            source,
        })
    }
}

fn read_batches(path: &Path) -> Result<RecordBatch, ParquetError> {
    let file = File::open(path)?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    let schema = builder.schema().clone();
    let batches = builder
        .build()?
        .collect::<Result<Vec<_>, arrow::error::ArrowError>>()?;
    Ok(concat_batches(&schema, &batches)?)
}

fn stick_array(values: &[[f64; 2]]) -> ListArray {
    ListArray::from_iter_primitive::<Float64Type, _, _>(
        values.iter().map(|[x, y]| Some(vec![Some(*x), Some(*y)])),
    )
}

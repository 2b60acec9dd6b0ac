//! Parquet directory writer and reader.

use super::Columnar;
use crate::common::*;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::{fs::File, io};

/// The marker file written after a directory is complete.
pub const SUCCESS_MARKER: &str = "_SUCCESS";

/// Parquet writer options.
#[derive(Debug, Clone)]
pub struct ParquetWriterInit {
    /// Target row group size in bytes.
    pub block_size: usize,
    /// Maximum number of part files per directory.
    pub num_partitions: usize,
}

impl ParquetWriterInit {
    pub fn build(self) -> Result<ParquetWriter> {
        let Self {
            block_size,
            num_partitions,
        } = self;
        ensure!(block_size > 0, "block_size must be positive");
        ensure!(num_partitions > 0, "num_partitions must be positive");

        Ok(ParquetWriter {
            block_size,
            num_partitions,
        })
    }
}

/// Writes records as directories of Parquet part files.
#[derive(Debug, Clone)]
pub struct ParquetWriter {
    block_size: usize,
    num_partitions: usize,
}

impl ParquetWriter {
    /// The number of rows per row group for the given records.
    pub fn rows_per_group<T, R>(&self, records: &[R]) -> usize
    where
        T: Columnar,
        R: Borrow<T>,
    {
        if records.is_empty() {
            return 1;
        }
        let total: usize = records.iter().map(|record| record.borrow().row_size()).sum();
        let avg_row_size = (total / records.len()).max(1);
        (self.block_size / avg_row_size).max(1)
    }

    /// Write records to `dir` as part files and return the file paths.
    ///
    /// The directory is created if it does not exist. Existing part files
    /// with the same names are overwritten.
    pub fn write_dir<T, R>(&self, dir: impl AsRef<Path>, records: &[R]) -> Result<Vec<PathBuf>>
    where
        T: Columnar,
        R: Borrow<T>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory '{}'", dir.display()))?;

        let rows_per_group = self.rows_per_group::<T, R>(records);
        let chunk_len = {
            let len = (records.len() + self.num_partitions - 1) / self.num_partitions;
            len.max(1)
        };

        // an empty dataset still gets one part file to keep the schema
        let chunks: Vec<&[R]> = if records.is_empty() {
            vec![records]
        } else {
            records.chunks(chunk_len).collect()
        };

        let paths: Vec<_> = chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| -> Result<_> {
                let path = dir.join(format!("part-{:05}.parquet", index));
                write_parquet_file::<T, R>(&path, chunk, rows_per_group)
                    .with_context(|| format!("failed to write '{}'", path.display()))?;
                Ok(path)
            })
            .try_collect()?;

        debug!(
            "wrote {} rows in {} files to '{}'",
            records.len(),
            paths.len(),
            dir.display()
        );

        Ok(paths)
    }

    /// Replace `root` with the `train` and `test` subdirectories.
    ///
    /// Anything under `root` is removed first, so a repeated call never
    /// accumulates data. Concurrent calls on the same `root` are undefined
    /// and must be prevented by the caller.
    pub fn save_split<T, R>(&self, root: impl AsRef<Path>, train: &[R], test: &[R]) -> Result<()>
    where
        T: Columnar,
        R: Borrow<T>,
    {
        let root = root.as_ref();
        remove_dir_if_exists(root)?;

        for (name, records) in [("train", train), ("test", test)] {
            let dir = root.join(name);
            self.write_dir::<T, R>(&dir, records)?;
            let marker = dir.join(SUCCESS_MARKER);
            File::create(&marker)
                .with_context(|| format!("failed to create '{}'", marker.display()))?;
            info!(
                "saved {} {} records to '{}'",
                records.len(),
                name,
                dir.display()
            );
        }

        Ok(())
    }
}

fn write_parquet_file<T, R>(path: &Path, records: &[R], rows_per_group: usize) -> Result<()>
where
    T: Columnar,
    R: Borrow<T>,
{
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_max_row_group_size(rows_per_group)
        .build();
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, T::schema(), Some(props))?;

    // convert chunk by chunk to bound the memory of Arrow buffers
    for chunk in records.chunks(rows_per_group) {
        let batch = T::to_record_batch(chunk)?;
        writer.write(&batch)?;
    }

    writer.close()?;
    Ok(())
}

/// Remove a directory recursively. It is not an error if it does not exist.
pub fn remove_dir_if_exists(dir: impl AsRef<Path>) -> Result<()> {
    let dir = dir.as_ref();
    match fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => {
            Err(err).with_context(|| format!("failed to remove directory '{}'", dir.display()))
        }
    }
}

/// Read all record batches in a Parquet file.
pub fn read_parquet_file(path: impl AsRef<Path>) -> Result<Vec<RecordBatch>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    let reader = ParquetRecordBatchReaderBuilder::try_new(file)?.build()?;
    let batches: Vec<_> = reader
        .try_collect()
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    Ok(batches)
}

/// List the Parquet part files in a directory in name order.
pub fn list_parquet_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut paths: Vec<_> = fs::read_dir(dir)
        .with_context(|| format!("failed to list directory '{}'", dir.display()))?
        .map(|entry| -> Result<_> {
            let path = entry?.path();
            let is_part = path.extension().map_or(false, |ext| ext == "parquet") && path.is_file();
            Ok(is_part.then(|| path))
        })
        .filter_map(|result| result.transpose())
        .try_collect()?;
    paths.sort();
    Ok(paths)
}

/// Read and decode all records in a directory of part files.
pub fn read_parquet_dir<T>(dir: impl AsRef<Path>) -> Result<Vec<T>>
where
    T: Columnar,
{
    let mut records = vec![];
    for path in list_parquet_files(dir)? {
        for batch in read_parquet_file(&path)? {
            records.extend(T::from_record_batch(&batch)?);
        }
    }
    Ok(records)
}

//! Local managed table catalog.
//!
//! A table `<name>` is stored in `<warehouse_dir>/<name>/`. The metadata
//! file `_table.json` points to the part files of the current version,
//! which live in the `v<version>/` subdirectory.

use super::{
    columnar::Columnar,
    parquet::{read_parquet_file, remove_dir_if_exists, ParquetWriter},
};
use crate::{common::*, config::validate_table_name};

const METADATA_FILE: &str = "_table.json";

/// The metadata of a managed table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableMeta {
    pub name: String,
    pub format: String,
    pub version: u64,
    pub schema: Vec<ColumnMeta>,
    pub num_rows: usize,
    /// Data files relative to the table directory.
    pub files: Vec<PathBuf>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
}

impl ColumnMeta {
    fn from_field(field: &Field) -> Self {
        Self {
            name: field.name().to_owned(),
            data_type: field.data_type().to_string(),
            nullable: field.is_nullable(),
        }
    }
}

/// The catalog of managed tables in a warehouse directory.
#[derive(Debug, Clone)]
pub struct Catalog {
    warehouse_dir: PathBuf,
    writer: ParquetWriter,
}

impl Catalog {
    pub fn new(warehouse_dir: impl AsRef<Path>, writer: ParquetWriter) -> Self {
        Self {
            warehouse_dir: warehouse_dir.as_ref().to_owned(),
            writer,
        }
    }

    pub fn table_dir(&self, name: &str) -> PathBuf {
        self.warehouse_dir.join(name)
    }

    /// Load the metadata of a table, or `None` if the table does not exist.
    pub fn table(&self, name: &str) -> Result<Option<TableMeta>> {
        validate_table_name(name)?;
        let path = self.table_dir(name).join(METADATA_FILE);
        if !path.is_file() {
            return Ok(None);
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read table metadata '{}'", path.display()))?;
        let meta: TableMeta = serde_json::from_str(&text)
            .with_context(|| format!("corrupted table metadata '{}'", path.display()))?;
        ensure!(
            meta.name == name,
            "table metadata '{}' belongs to table '{}'",
            path.display(),
            meta.name
        );
        Ok(Some(meta))
    }

    /// Replace the content and schema of a table, creating it if absent.
    pub fn overwrite_table<T, R>(&self, name: &str, records: &[R]) -> Result<TableMeta>
    where
        T: Columnar,
        R: Borrow<T>,
    {
        let table_dir = self.table_dir(name);
        let prev = self.table(name)?;
        let version = prev.as_ref().map_or(1, |meta| meta.version + 1);

        // write data files of the new version
        let version_name = format!("v{}", version);
        let data_dir = table_dir.join(&version_name);
        remove_dir_if_exists(&data_dir)?;
        let files: Vec<_> = self
            .writer
            .write_dir::<T, R>(&data_dir, records)?
            .into_iter()
            .map(|path| -> Result<_> {
                let file_name = path
                    .file_name()
                    .ok_or_else(|| format_err!("invalid data file '{}'", path.display()))?;
                Ok(Path::new(&version_name).join(file_name))
            })
            .try_collect()?;

        // commit by atomically replacing the metadata file
        let meta = TableMeta {
            name: name.to_owned(),
            format: "parquet".into(),
            version,
            schema: T::schema()
                .fields()
                .iter()
                .map(|field| ColumnMeta::from_field(field))
                .collect(),
            num_rows: records.len(),
            files,
            updated_at: Utc::now(),
        };
        {
            let path = table_dir.join(METADATA_FILE);
            let tmp_path = table_dir.join(format!("{}.tmp", METADATA_FILE));
            let text = serde_json::to_string_pretty(&meta)?;
            fs::write(&tmp_path, text)
                .with_context(|| format!("failed to write '{}'", tmp_path.display()))?;
            fs::rename(&tmp_path, &path)
                .with_context(|| format!("failed to commit '{}'", path.display()))?;
        }

        // remove data of previous versions
        for entry in fs::read_dir(&table_dir)? {
            let path = entry?.path();
            let is_stale = path.is_dir()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map_or(false, |name| {
                        name != version_name
                            && name.starts_with('v')
                            && name[1..].bytes().all(|b| b.is_ascii_digit())
                    });
            if is_stale {
                remove_dir_if_exists(&path)?;
            }
        }

        info!(
            "saved {} rows to table '{}' version {}",
            meta.num_rows, name, version
        );

        Ok(meta)
    }

    /// Read the metadata and all record batches of a table.
    pub fn read_table(&self, name: &str) -> Result<(TableMeta, Vec<RecordBatch>)> {
        let meta = self
            .table(name)?
            .ok_or_else(|| format_err!("table '{}' does not exist", name))?;
        let table_dir = self.table_dir(name);

        let mut batches = vec![];
        for file in &meta.files {
            batches.extend(read_parquet_file(table_dir.join(file))?);
        }
        Ok((meta, batches))
    }

    /// Read and decode all records of a table.
    pub fn read_records<T>(&self, name: &str) -> Result<Vec<T>>
    where
        T: Columnar,
    {
        let (_meta, batches) = self.read_table(name)?;
        let records: Vec<_> = batches
            .iter()
            .map(T::from_record_batch)
            .flatten_ok()
            .try_collect()?;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        dataset::{LabeledRecord, RawRecord},
        error::ConfigError,
        sink::ParquetWriterInit,
    };

    fn catalog(dir: &Path) -> Catalog {
        let writer = ParquetWriterInit {
            block_size: 1024 * 1024,
            num_partitions: 2,
        }
        .build()
        .unwrap();
        Catalog::new(dir, writer)
    }

    fn raw_records(n: usize) -> Vec<RawRecord> {
        (0..n)
            .map(|index| RawRecord {
                path: format!("/data/001.a/{:03}.jpg", index),
                content: vec![index as u8; 16],
            })
            .collect()
    }

    #[test]
    fn overwrite_table_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let catalog = catalog(dir.path());
        assert!(catalog.table("raw_images")?.is_none());

        let first = raw_records(5);
        let meta = catalog.overwrite_table::<RawRecord, _>("raw_images", &first)?;
        assert_eq!(meta.version, 1);
        assert_eq!(meta.num_rows, 5);
        assert_eq!(meta.schema[0].name, "path");
        assert_eq!(meta.schema[0].data_type, "Utf8");
        assert_eq!(meta.schema[1].data_type, "Binary");
        assert_eq!(catalog.table("raw_images")?, Some(meta));

        // overwrite replaces rows and removes old files
        let second = raw_records(3);
        let meta = catalog.overwrite_table::<RawRecord, _>("raw_images", &second)?;
        assert_eq!(meta.version, 2);
        assert_eq!(meta.num_rows, 3);
        assert!(!catalog.table_dir("raw_images").join("v1").exists());
        assert_eq!(catalog.read_records::<RawRecord>("raw_images")?, second);
        Ok(())
    }

    #[test]
    fn overwrite_replaces_schema_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let catalog = catalog(dir.path());

        catalog.overwrite_table::<RawRecord, _>("images", &raw_records(2))?;
        let labeled = vec![LabeledRecord {
            label: 7,
            image: vec![1, 2, 3],
        }];
        let meta = catalog.overwrite_table::<LabeledRecord, _>("images", &labeled)?;
        assert_eq!(meta.schema[0].name, "label");
        assert_eq!(meta.schema[0].data_type, "Int32");

        let (_meta, batches) = catalog.read_table("images")?;
        assert_eq!(batches[0].schema().fields(), LabeledRecord::schema().fields());
        assert_eq!(catalog.read_records::<LabeledRecord>("images")?, labeled);
        Ok(())
    }

    #[test]
    fn empty_table_test() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let catalog = catalog(dir.path());
        let empty: Vec<LabeledRecord> = vec![];

        let meta = catalog.overwrite_table::<LabeledRecord, _>("labeled_images", &empty)?;
        assert_eq!(meta.num_rows, 0);
        assert_eq!(meta.files.len(), 1);
        assert!(catalog
            .read_records::<LabeledRecord>("labeled_images")?
            .is_empty());
        Ok(())
    }

    #[test]
    fn invalid_table_test() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog(dir.path());

        let err = catalog
            .overwrite_table::<RawRecord, _>("../escape", &raw_records(1))
            .unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
        assert!(catalog.read_table("missing").is_err());
    }
}

//! Image preprocessing pipeline that turns a directory of labeled JPEG
//! files into fixed-size training and test tables.

mod common;
pub mod config;
pub mod dataset;
pub mod error;
pub mod profiling;
pub mod sink;
pub mod split;
pub mod transform;

use crate::{
    common::*,
    config::Config,
    dataset::{LabeledRecord, RawRecord},
    profiling::Timing,
    sink::{Catalog, ParquetWriterInit},
    split::TrainTestSplit,
};

/// Statistics of a completed preparation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepSummary {
    pub num_records: usize,
    pub num_train: usize,
    pub num_test: usize,
    pub raw_table_version: u64,
    pub labeled_table_version: u64,
}

/// The entry of the preparation program.
///
/// The run owns its output locations. Concurrent runs writing to the same
/// `table_path` or warehouse tables give undefined results, and callers
/// must not start them.
pub async fn start(config: Arc<Config>) -> Result<PrepSummary> {
    let mut timing = Timing::new("start");
    config.validate()?;

    // load and transform images
    info!("loading images from '{}'", config.image_path.display());
    let dataset = dataset::assemble_dataset(
        &config.image_path,
        config.image_size,
        config.num_partitions,
    )
    .await?;
    info!(
        "cached {} records in {} bytes",
        dataset.num_records(),
        dataset.cached_bytes()
    );
    timing.set_volume_record(
        "assemble_dataset",
        dataset.num_records(),
        dataset.cached_bytes(),
    );

    // split
    let split = TrainTestSplit::new(&dataset, &config.split)?;
    info!(
        "split into {} train and {} test records",
        split.num_train(),
        split.num_test()
    );
    timing.set_record("split");

    let writer = ParquetWriterInit {
        block_size: config.parquet.block_size,
        num_partitions: config.num_partitions,
    }
    .build()?;

    // write train/test Parquet directories
    {
        let parquet_dir = config.parquet_dir();
        let writer = writer.clone();
        let dataset = dataset.clone();
        let split = split.clone();

        tokio::task::spawn_blocking(move || {
            let (train, test) = split.records(&dataset);
            writer.save_split::<LabeledRecord, _>(&parquet_dir, &train, &test)
        })
        .await??;
    }
    {
        let num_bytes: usize = dataset
            .labeled_records()
            .iter()
            .map(|record| record.image.len())
            .sum();
        timing.set_volume_record("save_split", dataset.num_records(), num_bytes);
    }

    // overwrite managed tables
    let (raw_meta, labeled_meta) = {
        let catalog = Catalog::new(&config.catalog.warehouse_dir, writer);
        let config = config.clone();
        let dataset = dataset.clone();

        tokio::task::spawn_blocking(move || -> Result<_> {
            let raw_meta = catalog
                .overwrite_table::<RawRecord, _>(&config.catalog.raw_table, dataset.raw_records())?;
            let labeled_meta = catalog.overwrite_table::<LabeledRecord, _>(
                &config.catalog.labeled_table,
                dataset.labeled_records(),
            )?;
            Ok((raw_meta, labeled_meta))
        })
        .await??
    };
    timing.set_volume_record(
        "save_tables",
        dataset.num_records() * 2,
        dataset.cached_bytes(),
    );

    let summary = PrepSummary {
        num_records: dataset.num_records(),
        num_train: split.num_train(),
        num_test: split.num_test(),
        raw_table_version: raw_meta.version,
        labeled_table_version: labeled_meta.version,
    };
    info!(
        "finished with {} records, {} train, {} test, table '{}' v{}, table '{}' v{}",
        summary.num_records,
        summary.num_train,
        summary.num_test,
        raw_meta.name,
        raw_meta.version,
        labeled_meta.name,
        labeled_meta.version
    );
    timing.report();

    Ok(summary)
}

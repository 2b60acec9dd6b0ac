use anyhow::{Context, Result};
use arrow::{
    array::{Array, BinaryArray, Int32Array, StringArray},
    datatypes::DataType,
    record_batch::RecordBatch,
};
use image_prep::{
    config::Config,
    sink::{Catalog, ParquetWriterInit},
};
use prettytable::{cell, row, Cell, Row, Table};
use std::{env, path::PathBuf, sync::Arc};
use structopt::StructOpt;

#[derive(Debug, Clone, StructOpt)]
/// Prepare labeled image datasets for training.
enum Args {
    /// Run the preparation pipeline
    Run {
        #[structopt(long)]
        /// configuration file
        config_file: Option<PathBuf>,
        #[structopt(long)]
        /// overrides the image directory in the configuration
        image_path: Option<PathBuf>,
        #[structopt(long)]
        /// overrides the output directory in the configuration
        table_path: Option<PathBuf>,
    },
    /// Show the schema and leading rows of a managed table
    Info {
        #[structopt(long)]
        /// configuration file
        config_file: Option<PathBuf>,
        #[structopt(long, default_value = "5")]
        /// number of rows to show
        rows: usize,
        /// table name
        table: String,
    },
}

#[tokio::main]
pub async fn main() -> Result<()> {
    {
        let filters = env::var("RUST_LOG").unwrap_or_else(|_| "info".into());
        pretty_env_logger::formatted_builder()
            .parse_filters(&filters)
            .init();
    }

    match Args::from_args() {
        Args::Run {
            config_file,
            image_path,
            table_path,
        } => {
            let mut config = load_config(config_file)?;
            if let Some(image_path) = image_path {
                config.image_path = image_path;
            }
            if let Some(table_path) = table_path {
                config.table_path = table_path;
            }
            image_prep::start(Arc::new(config)).await?;
        }
        Args::Info {
            config_file,
            rows,
            table,
        } => {
            let config = load_config(config_file)?;
            info(&config, &table, rows)?;
        }
    }

    Ok(())
}

fn load_config(config_file: Option<PathBuf>) -> Result<Config> {
    let config = match config_file {
        Some(config_file) => Config::open(&config_file).with_context(|| {
            format!("failed to load config file '{}'", config_file.display())
        })?,
        None => Config::default(),
    };
    Ok(config)
}

fn info(config: &Config, name: &str, num_rows: usize) -> Result<()> {
    let writer = ParquetWriterInit {
        block_size: config.parquet.block_size,
        num_partitions: config.num_partitions,
    }
    .build()?;
    let catalog = Catalog::new(&config.catalog.warehouse_dir, writer);
    let (meta, batches) = catalog.read_table(name)?;

    println!(
        "table '{}' version {}, {} rows, updated at {}",
        meta.name, meta.version, meta.num_rows, meta.updated_at
    );

    // schema
    {
        let mut table = Table::new();
        table.add_row(row!["column", "type", "nullable"]);
        meta.schema.iter().for_each(|column| {
            table.add_row(row![column.name, column.data_type, column.nullable]);
        });
        table.printstd();
    }

    // leading rows
    {
        let mut table = Table::new();
        table.set_titles(Row::new(
            meta.schema
                .iter()
                .map(|column| Cell::new(&column.name))
                .collect(),
        ));

        let mut remaining = num_rows;
        for batch in &batches {
            if remaining == 0 {
                break;
            }
            let len = batch.num_rows().min(remaining);
            (0..len).for_each(|index| {
                table.add_row(batch_row(batch, index));
            });
            remaining -= len;
        }
        table.printstd();
    }

    Ok(())
}

fn batch_row(batch: &RecordBatch, index: usize) -> Row {
    let cells = batch
        .columns()
        .iter()
        .map(|array| {
            if array.is_null(index) {
                return cell!("null");
            }

            let text = match array.data_type() {
                DataType::Int32 => array
                    .as_any()
                    .downcast_ref::<Int32Array>()
                    .map(|array| array.value(index).to_string()),
                DataType::Utf8 => array
                    .as_any()
                    .downcast_ref::<StringArray>()
                    .map(|array| array.value(index).to_owned()),
                DataType::Binary => array
                    .as_any()
                    .downcast_ref::<BinaryArray>()
                    .map(|array| format!("<{} bytes>", array.value(index).len())),
                _ => None,
            };
            let text = text.unwrap_or_else(|| format!("<{}>", array.data_type()));
            Cell::new(&text)
        })
        .collect();
    Row::new(cells)
}

//! Preparation program configuration format.

use crate::{common::*, error::ConfigError};

lazy_static! {
    static ref TABLE_NAME_REGEX: regex::Regex =
        regex::Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap();
}

/// The main preparation configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// The root directory scanned for `*.jpg` files.
    #[serde(default = "default_image_path")]
    pub image_path: PathBuf,
    /// The root directory under which Parquet outputs are written.
    #[serde(default = "default_table_path")]
    pub table_path: PathBuf,
    /// The side length of the normalized square images.
    #[serde(default = "default_image_size")]
    pub image_size: u32,
    /// The number of parallel workers and output part files.
    #[serde(default = "default_num_partitions")]
    pub num_partitions: usize,
    #[serde(default)]
    pub split: SplitConfig,
    #[serde(default)]
    pub parquet: ParquetConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

impl Config {
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let text = std::fs::read_to_string(path)?;
        let config = json5::from_str(&text)?;
        Ok(config)
    }

    /// Directory receiving the train and test Parquet outputs.
    pub fn parquet_dir(&self) -> PathBuf {
        self.table_path.join("pq")
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.image_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("image_path"));
        }
        if self.table_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("table_path"));
        }
        if self.catalog.warehouse_dir.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPath("catalog.warehouse_dir"));
        }
        if self.image_size == 0 {
            return Err(ConfigError::NonPositive("image_size"));
        }
        if self.num_partitions == 0 {
            return Err(ConfigError::NonPositive("num_partitions"));
        }
        if self.parquet.block_size == 0 {
            return Err(ConfigError::NonPositive("parquet.block_size"));
        }

        self.split.validate()?;

        [&self.catalog.raw_table, &self.catalog.labeled_table]
            .into_iter()
            .try_for_each(|name| validate_table_name(name))?;
        if self.catalog.raw_table == self.catalog.labeled_table {
            return Err(ConfigError::InvalidTableName(
                self.catalog.raw_table.clone(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            image_path: default_image_path(),
            table_path: default_table_path(),
            image_size: default_image_size(),
            num_partitions: default_num_partitions(),
            split: SplitConfig::default(),
            parquet: ParquetConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

/// Train/test split options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Relative weights of the train and test subsets.
    #[serde(default = "default_split_weights")]
    pub weights: Vec<f64>,
    #[serde(default = "default_split_seed")]
    pub seed: u64,
}

impl SplitConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let Self { weights, .. } = self;

        if weights.len() != 2 {
            return Err(ConfigError::InvalidSplit(format!(
                "expect 2 weights for train and test, but get {}",
                weights.len()
            )));
        }
        if weights.iter().any(|&w| !w.is_finite() || w < 0.0) {
            return Err(ConfigError::InvalidSplit(format!(
                "weights must be non-negative, but get {:?}",
                weights
            )));
        }
        if weights.iter().sum::<f64>() <= 0.0 {
            return Err(ConfigError::InvalidSplit(
                "the sum of weights must be positive".into(),
            ));
        }

        Ok(())
    }
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            weights: default_split_weights(),
            seed: default_split_seed(),
        }
    }
}

/// Parquet writer options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParquetConfig {
    /// Target row group size in bytes.
    #[serde(default = "default_block_size")]
    pub block_size: usize,
}

impl Default for ParquetConfig {
    fn default() -> Self {
        Self {
            block_size: default_block_size(),
        }
    }
}

/// Managed table catalog options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default = "default_warehouse_dir")]
    pub warehouse_dir: PathBuf,
    #[serde(default = "default_raw_table")]
    pub raw_table: String,
    #[serde(default = "default_labeled_table")]
    pub labeled_table: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            warehouse_dir: default_warehouse_dir(),
            raw_table: default_raw_table(),
            labeled_table: default_labeled_table(),
        }
    }
}

pub fn validate_table_name(name: &str) -> Result<(), ConfigError> {
    if TABLE_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ConfigError::InvalidTableName(name.to_owned()))
    }
}

fn default_image_path() -> PathBuf {
    "/mnt/poc/images/caltech_256/".into()
}

fn default_table_path() -> PathBuf {
    "/ml/images/tables/".into()
}

fn default_image_size() -> u32 {
    299
}

fn default_num_partitions() -> usize {
    64
}

fn default_split_weights() -> Vec<f64> {
    vec![0.9, 0.1]
}

fn default_split_seed() -> u64 {
    42
}

fn default_block_size() -> usize {
    1024 * 1024
}

fn default_warehouse_dir() -> PathBuf {
    "/user/hive/warehouse/".into()
}

fn default_raw_table() -> String {
    "raw_images".into()
}

fn default_labeled_table() -> String {
    "labeled_images".into()
}

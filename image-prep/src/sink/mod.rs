//! Output sinks of the preparation pipeline.

mod catalog;
mod columnar;
mod parquet;

pub use self::parquet::*;
pub use catalog::*;
pub use columnar::*;

//! Dataset loading and caching toolkit.

mod assemble;
mod cached;
mod record;

pub use assemble::*;
pub use cached::*;
pub use record::*;

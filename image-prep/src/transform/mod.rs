//! Per-record transform functions.
//!
//! Both functions are pure and can be invoked concurrently, in any order
//! and any number of times.

mod image;
mod label;

pub use self::image::*;
pub use label::*;

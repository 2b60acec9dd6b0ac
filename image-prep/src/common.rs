//! Common imports from external crates.

pub use anyhow::{ensure, format_err, Context as _, Result};
pub use arrow::{
    array::{Array, ArrayRef, BinaryArray, Int32Array, StringArray},
    datatypes::{DataType, Field, Schema, SchemaRef},
    record_batch::RecordBatch,
};
pub use chrono::{DateTime, Utc};
pub use futures::stream::{self, StreamExt as _, TryStreamExt as _};
pub use itertools::Itertools as _;
pub use lazy_static::lazy_static;
pub use log::{debug, info, warn};
pub use par_stream::prelude::*;
pub use rand::{prelude::*, rngs::StdRng};
pub use serde::{Deserialize, Serialize};
pub use std::{
    borrow::Borrow,
    collections::HashSet,
    fs,
    iter,
    mem,
    path::{Path, PathBuf},
    sync::Arc,
};

// src/store/mod.rs

//! Lookup of steps, objects and blobs by id.
//!
//! - [`Store`] is the read-side contract every other module is written
//!   against.
//! - [`memory::LocalMemoryStore`] keeps entities in memory and blobs as
//!   paths on the local file system.
//! - [`blobs`] registers a directory of files as content-addressed blobs.

pub mod blobs;
pub mod memory;

pub use blobs::{BlobPatterns, compute_file_hash, import_blobs};
pub use memory::LocalMemoryStore;

use crate::errors::Result;
use crate::model::{Object, Step};

/// Abstract lookup service for steps, objects and blobs.
///
/// All `get_*` methods fail with `NotFound` for unknown ids. How content is
/// added is left to the implementation.
pub trait Store: Send + Sync {
    fn has_blob(&self, blob_id: &str) -> bool;
    /// URL under which the blob content can be fetched.
    fn get_blob_url(&self, blob_id: &str) -> Result<String>;
    fn iter_blob(&self) -> Box<dyn Iterator<Item = &str> + '_>;

    fn has_obj(&self, obj_id: &str) -> bool;
    fn get_obj(&self, obj_id: &str) -> Result<&Object>;
    fn iter_obj(&self) -> Box<dyn Iterator<Item = (&str, &Object)> + '_>;

    fn has_step(&self, step_id: &str) -> bool;
    fn get_step(&self, step_id: &str) -> Result<&Step>;
    fn iter_step(&self) -> Box<dyn Iterator<Item = (&str, &Step)> + '_>;
}

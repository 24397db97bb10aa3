// src/config/mod.rs

//! Manual files: a TOML description of blobs, objects and steps.
//!
//! - `model.rs` defines the TOML data model and the validated [`Manual`].
//! - `loader.rs` reads a manual file from disk.
//! - `validate.rs` checks references and dependencies and builds the store
//!   and graph.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{load_and_validate, load_from_path};
pub use model::{BlobConfig, ConfigSection, Manual, ObjectConfig, RawManualFile, StepConfig};
pub use validate::validate_manual;

use crate::dag::{Schedule, plan};
use crate::errors::Result;

impl Manual {
    /// Run the configured scheduler over the configured targets.
    pub fn plan(&self) -> Result<Schedule> {
        let targets: Option<Vec<&str>> = self
            .config
            .targets
            .as_ref()
            .map(|t| t.iter().map(String::as_str).collect());
        plan(
            &self.graph,
            &self.store,
            self.config.scheduler,
            targets.as_deref(),
            self.config.sched_id.clone(),
        )
    }
}

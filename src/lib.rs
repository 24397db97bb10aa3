// src/lib.rs

pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod model;
pub mod schema;
pub mod store;

use std::path::Path;

use tracing::info;

use crate::config::Manual;
use crate::config::loader::load_and_validate;
use crate::dag::{Bom, Schedule};
use crate::errors::Result;

/// A loaded manual together with its schedule and bill of materials.
#[derive(Debug, Clone)]
pub struct PlannedManual {
    pub manual: Manual,
    pub schedule: Schedule,
    pub bom: Bom,
}

/// High-level entry point: load the manual at `path`, schedule it with the
/// configured scheduler and collect the bill of materials.
pub fn plan_manual(path: impl AsRef<Path>) -> Result<PlannedManual> {
    let manual = load_and_validate(path)?;
    let schedule = manual.plan()?;
    let bom = schedule.collect_bom(&manual.store)?;

    info!(
        sched = %schedule.sched_id(),
        steps = schedule.len(),
        timed = schedule.is_timed(),
        tools = bom.tools.len(),
        parts = bom.parts.len(),
        "planned manual"
    );
    Ok(PlannedManual {
        manual,
        schedule,
        bom,
    })
}

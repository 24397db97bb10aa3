// src/model/mod.rs

//! Entity and reference model.
//!
//! Every entity has a *declared* form (`Raw*`, plain serde data exactly as
//! written in a manual) and a validated form built from it via `TryFrom`.
//! Validation happens in this order:
//! 1. field-level checks (required values, ranges) -> `Validation`
//! 2. identifier patterns -> `InvalidIdentifier`
//! 3. cross-field invariants (e.g. created vs. optional) -> `Validation`
//!
//! Defaults are resolved once during construction. `declared()` gives back
//! the minimal form with defaults omitted.

pub mod checksum;
pub mod ids;
pub mod object;
pub mod resource;
pub mod step;
pub mod timespan;

pub use object::{
    BomCount, BomReference, BomView, Object, ObjectRefView, ObjectReference, ObjectView,
    RawObject, RawObjectReference,
};
pub use resource::{
    FileReference, FileView, ImageReference, ImageView, RawFileReference, RawImageReference,
};
pub use step::{RawStep, Step, StepView};
pub use timespan::TimeSpan;

use crate::errors::Result;
use crate::store::Store;

/// Resolve a reference (and everything nested in it) against a store.
///
/// Read-only: the store is never modified. A referenced id that the store
/// does not know fails with `NotFound`.
pub trait Dereference {
    type View;

    fn dereference(&self, store: &dyn Store) -> Result<Self::View>;
}

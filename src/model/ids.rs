// src/model/ids.rs

//! Identifier patterns for steps, objects and blobs.

use std::sync::OnceLock;

use regex::Regex;

use crate::errors::{IdKind, ManualError, Result};

/// Steps must start with a letter and may only contain ASCII alphanumerics.
pub const STEP_ID_PATTERN: &str = "^[a-zA-Z][a-zA-Z0-9]*$";
/// Objects and blobs may additionally contain underscores and start with a digit.
pub const OBJ_ID_PATTERN: &str = "^[a-zA-Z0-9_]+$";

fn step_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(STEP_ID_PATTERN).expect("step id pattern is valid"))
}

fn obj_id_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(OBJ_ID_PATTERN).expect("object id pattern is valid"))
}

pub fn is_valid_step_id(id: &str) -> bool {
    step_id_re().is_match(id)
}

pub fn is_valid_obj_id(id: &str) -> bool {
    obj_id_re().is_match(id)
}

pub fn validate_step_id(id: &str) -> Result<()> {
    check(IdKind::Step, id, is_valid_step_id(id))
}

pub fn validate_obj_id(id: &str) -> Result<()> {
    check(IdKind::Object, id, is_valid_obj_id(id))
}

/// Blob ids share the object pattern.
pub fn validate_blob_id(id: &str) -> Result<()> {
    check(IdKind::Blob, id, is_valid_obj_id(id))
}

fn check(kind: IdKind, id: &str, ok: bool) -> Result<()> {
    if ok {
        Ok(())
    } else {
        Err(ManualError::InvalidIdentifier {
            kind,
            id: id.to_string(),
        })
    }
}

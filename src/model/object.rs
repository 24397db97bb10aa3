// src/model/object.rs

//! Physical objects and the references steps hold to them.

use serde::{Deserialize, Serialize};

use crate::errors::{ManualError, Result};
use crate::model::checksum::checksum_of;
use crate::model::ids::validate_obj_id;
use crate::model::resource::{ImageReference, ImageView, RawImageReference};
use crate::model::Dereference;
use crate::store::Store;

/// Declared fields of an [`Object`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawObject {
    pub obj_id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<RawImageReference>>,
}

impl RawObject {
    pub fn new(obj_id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            obj_id: obj_id.into(),
            name: name.into(),
            description: None,
            images: None,
        }
    }
}

/// A physical part, tool or result that is relevant to the assembly.
///
/// Whether an object acts as part, tool or result is decided by the step
/// that references it, not by the object itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawObject", into = "RawObject")]
pub struct Object {
    obj_id: String,
    name: String,
    description: String,
    images: Vec<ImageReference>,
}

impl Object {
    pub fn new(obj_id: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        Self::try_from(RawObject::new(obj_id, name))
    }

    pub fn obj_id(&self) -> &str {
        &self.obj_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn images(&self) -> &[ImageReference] {
        &self.images
    }

    /// Minimal declared form (defaults omitted). Feeding it back through
    /// `Object::try_from` yields an equal object.
    pub fn declared(&self) -> RawObject {
        RawObject {
            obj_id: self.obj_id.clone(),
            name: self.name.clone(),
            description: (!self.description.is_empty()).then(|| self.description.clone()),
            images: (!self.images.is_empty())
                .then(|| self.images.iter().map(ImageReference::declared).collect()),
        }
    }

    /// Content checksum over everything except `obj_id`.
    ///
    /// Two objects that only differ in their id have the same checksum.
    pub fn checksum(&self) -> Result<String> {
        #[derive(Serialize)]
        struct Content<'a> {
            name: &'a str,
            description: &'a str,
            images: Vec<RawImageReference>,
        }

        checksum_of(&Content {
            name: &self.name,
            description: &self.description,
            images: self.images.iter().map(ImageReference::declared).collect(),
        })
    }
}

impl TryFrom<RawObject> for Object {
    type Error = ManualError;

    fn try_from(raw: RawObject) -> Result<Self> {
        if raw.name.trim().is_empty() {
            return Err(ManualError::validation(
                "object",
                format!("object '{}' has an empty name", raw.obj_id),
            ));
        }
        validate_obj_id(&raw.obj_id)?;

        let images = raw
            .images
            .unwrap_or_default()
            .into_iter()
            .map(ImageReference::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            obj_id: raw.obj_id,
            name: raw.name,
            description: raw.description.unwrap_or_default(),
            images,
        })
    }
}

impl From<Object> for RawObject {
    fn from(o: Object) -> Self {
        o.declared()
    }
}

/// Resolved view of an [`Object`] with its images dereferenced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectView {
    pub obj_id: String,
    pub name: String,
    pub description: String,
    pub images: Vec<ImageView>,
}

impl Dereference for Object {
    type View = ObjectView;

    fn dereference(&self, store: &dyn Store) -> Result<ObjectView> {
        let images = self
            .images
            .iter()
            .map(|img| img.dereference(store))
            .collect::<Result<Vec<_>>>()?;

        Ok(ObjectView {
            obj_id: self.obj_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            images,
        })
    }
}

/// Declared fields of an [`ObjectReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawObjectReference {
    pub obj_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

impl RawObjectReference {
    pub fn new(obj_id: impl Into<String>) -> Self {
        Self {
            obj_id: obj_id.into(),
            optional: None,
            quantity: None,
            created: None,
        }
    }
}

/// Step-local reference to an [`Object`] stored elsewhere.
///
/// An object can not be created by a step and optional for it at the same
/// time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawObjectReference", into = "RawObjectReference")]
pub struct ObjectReference {
    obj_id: String,
    optional: bool,
    quantity: u32,
    created: bool,
}

impl ObjectReference {
    pub fn new(obj_id: impl Into<String>) -> Result<Self> {
        Self::try_from(RawObjectReference::new(obj_id))
    }

    pub fn obj_id(&self) -> &str {
        &self.obj_id
    }

    pub fn optional(&self) -> bool {
        self.optional
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn created(&self) -> bool {
        self.created
    }

    pub fn declared(&self) -> RawObjectReference {
        RawObjectReference {
            obj_id: self.obj_id.clone(),
            optional: self.optional.then_some(true),
            quantity: (self.quantity != 1).then_some(self.quantity),
            created: self.created.then_some(true),
        }
    }
}

impl TryFrom<RawObjectReference> for ObjectReference {
    type Error = ManualError;

    fn try_from(raw: RawObjectReference) -> Result<Self> {
        let quantity = raw.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(ManualError::validation(
                "object reference",
                format!("quantity of '{}' must be at least 1", raw.obj_id),
            ));
        }
        validate_obj_id(&raw.obj_id)?;

        let optional = raw.optional.unwrap_or(false);
        let created = raw.created.unwrap_or(false);
        if optional && created {
            return Err(ManualError::validation(
                "object reference",
                format!("'{}' can not be both created and optional", raw.obj_id),
            ));
        }

        Ok(Self {
            obj_id: raw.obj_id,
            optional,
            quantity,
            created,
        })
    }
}

impl From<ObjectReference> for RawObjectReference {
    fn from(r: ObjectReference) -> Self {
        r.declared()
    }
}

/// Resolved view of an [`ObjectReference`]: the referenced object's fields
/// plus the reference-local `optional`/`quantity`/`created` flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRefView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(flatten)]
    pub object: ObjectView,
    pub optional: bool,
    pub quantity: u32,
    pub created: bool,
}

impl Dereference for ObjectReference {
    type View = ObjectRefView;

    fn dereference(&self, store: &dyn Store) -> Result<ObjectRefView> {
        let object = store.get_obj(&self.obj_id)?.dereference(store)?;
        Ok(ObjectRefView {
            alias: None,
            object,
            optional: self.optional,
            quantity: self.quantity,
            created: self.created,
        })
    }
}

/// Aggregated bill-of-materials entry for one object.
///
/// Unlike [`ObjectReference`] this is not tied to a single step: it counts
/// what is needed over a whole schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomCount {
    pub quantity: u32,
    pub optional: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BomReference {
    pub obj_id: String,
    pub quantity: u32,
    pub optional: u32,
}

impl BomReference {
    pub fn new(obj_id: impl Into<String>, count: BomCount) -> Result<Self> {
        let obj_id = obj_id.into();
        validate_obj_id(&obj_id)?;
        Ok(Self {
            obj_id,
            quantity: count.quantity,
            optional: count.optional,
        })
    }
}

/// Resolved view of a [`BomReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BomView {
    #[serde(flatten)]
    pub object: ObjectView,
    pub quantity: u32,
    pub optional: u32,
}

impl Dereference for BomReference {
    type View = BomView;

    fn dereference(&self, store: &dyn Store) -> Result<BomView> {
        let object = store.get_obj(&self.obj_id)?.dereference(store)?;
        Ok(BomView {
            object,
            quantity: self.quantity,
            optional: self.optional,
        })
    }
}

// src/model/resource.rs

//! References to binary blobs (files and images).
//!
//! A reference carries its own display metadata (file name, alt text,
//! extension) independent of where the blob is stored. The store only knows
//! how to turn a `blob_id` into a URL.

use serde::{Deserialize, Serialize};

use crate::errors::{ManualError, Result};
use crate::model::Dereference;
use crate::model::ids::validate_blob_id;
use crate::store::Store;

/// Declared fields of a [`FileReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawFileReference {
    pub blob_id: String,
    pub filename: String,
}

/// Reference to a downloadable file, e.g. a CAD source or a PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawFileReference", into = "RawFileReference")]
pub struct FileReference {
    blob_id: String,
    filename: String,
}

impl FileReference {
    pub fn new(blob_id: impl Into<String>, filename: impl Into<String>) -> Result<Self> {
        Self::try_from(RawFileReference {
            blob_id: blob_id.into(),
            filename: filename.into(),
        })
    }

    pub fn blob_id(&self) -> &str {
        &self.blob_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn declared(&self) -> RawFileReference {
        RawFileReference {
            blob_id: self.blob_id.clone(),
            filename: self.filename.clone(),
        }
    }
}

impl TryFrom<RawFileReference> for FileReference {
    type Error = ManualError;

    fn try_from(raw: RawFileReference) -> Result<Self> {
        if raw.filename.trim().is_empty() {
            return Err(ManualError::validation(
                "file reference",
                format!("blob '{}' has an empty filename", raw.blob_id),
            ));
        }
        validate_blob_id(&raw.blob_id)?;
        Ok(Self {
            blob_id: raw.blob_id,
            filename: raw.filename,
        })
    }
}

impl From<FileReference> for RawFileReference {
    fn from(r: FileReference) -> Self {
        r.declared()
    }
}

/// Resolved view of a [`FileReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub blob_id: String,
    pub filename: String,
    pub url: String,
}

impl Dereference for FileReference {
    type View = FileView;

    fn dereference(&self, store: &dyn Store) -> Result<FileView> {
        Ok(FileView {
            alias: None,
            blob_id: self.blob_id.clone(),
            filename: self.filename.clone(),
            url: store.get_blob_url(&self.blob_id)?,
        })
    }
}

/// Declared fields of an [`ImageReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawImageReference {
    pub blob_id: String,
    pub alt: String,
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sourcefiles: Option<Vec<RawFileReference>>,
}

/// Reference to an image, optionally with the source files it was
/// rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawImageReference", into = "RawImageReference")]
pub struct ImageReference {
    blob_id: String,
    alt: String,
    extension: String,
    sourcefiles: Vec<FileReference>,
}

impl ImageReference {
    pub fn new(
        blob_id: impl Into<String>,
        alt: impl Into<String>,
        extension: impl Into<String>,
    ) -> Result<Self> {
        Self::try_from(RawImageReference {
            blob_id: blob_id.into(),
            alt: alt.into(),
            extension: extension.into(),
            sourcefiles: None,
        })
    }

    pub fn blob_id(&self) -> &str {
        &self.blob_id
    }

    pub fn alt(&self) -> &str {
        &self.alt
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    pub fn sourcefiles(&self) -> &[FileReference] {
        &self.sourcefiles
    }

    /// Minimal declared form; an empty `sourcefiles` list is omitted.
    pub fn declared(&self) -> RawImageReference {
        RawImageReference {
            blob_id: self.blob_id.clone(),
            alt: self.alt.clone(),
            extension: self.extension.clone(),
            sourcefiles: (!self.sourcefiles.is_empty())
                .then(|| self.sourcefiles.iter().map(FileReference::declared).collect()),
        }
    }
}

impl TryFrom<RawImageReference> for ImageReference {
    type Error = ManualError;

    fn try_from(raw: RawImageReference) -> Result<Self> {
        if raw.extension.trim().is_empty() {
            return Err(ManualError::validation(
                "image reference",
                format!("blob '{}' has an empty extension", raw.blob_id),
            ));
        }
        validate_blob_id(&raw.blob_id)?;

        let sourcefiles = raw
            .sourcefiles
            .unwrap_or_default()
            .into_iter()
            .map(FileReference::try_from)
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            blob_id: raw.blob_id,
            alt: raw.alt,
            extension: raw.extension,
            sourcefiles,
        })
    }
}

impl From<ImageReference> for RawImageReference {
    fn from(r: ImageReference) -> Self {
        r.declared()
    }
}

/// Resolved view of an [`ImageReference`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub blob_id: String,
    pub alt: String,
    pub extension: String,
    pub sourcefiles: Vec<FileView>,
    pub url: String,
}

impl Dereference for ImageReference {
    type View = ImageView;

    fn dereference(&self, store: &dyn Store) -> Result<ImageView> {
        let sourcefiles = self
            .sourcefiles
            .iter()
            .map(|f| f.dereference(store))
            .collect::<Result<Vec<_>>>()?;

        Ok(ImageView {
            alias: None,
            blob_id: self.blob_id.clone(),
            alt: self.alt.clone(),
            extension: self.extension.clone(),
            sourcefiles,
            url: store.get_blob_url(&self.blob_id)?,
        })
    }
}

//! Polymorphic block content: the closed kind set and its payload codec.
//!
//! A block's payload shape is dictated by its kind tag. Text blocks carry a
//! plain string; canvas and image blocks embed an arbitrary client JSON
//! document that is stored opaquely and must round-trip byte-for-byte.
//! Opaque sub-documents are held as [`serde_json::value::RawValue`] so that
//! neither decoding nor re-encoding normalizes key order or whitespace.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;

use crate::error::{Error, Result};

/// Closed set of block kinds.
///
/// Adding a variant here forces every match in the codec and the block
/// store to be revisited, which is the point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    /// Plain text content
    Text,
    /// Free-form canvas document (opaque JSON)
    Canvas,
    /// Image reference plus client metadata (opaque JSON)
    Image,
}

impl BlockKind {
    /// Stable string form, matching the wire tag and the stored column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Canvas => "canvas",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for BlockKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for BlockKind {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "text" => Ok(Self::Text),
            "canvas" => Ok(Self::Canvas),
            "image" => Ok(Self::Image),
            other => Err(Error::UnsupportedType(other.to_string())),
        }
    }
}

/// Payload of a text block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextPayload {
    pub text: String,
}

/// Payload of a canvas block. `data` is client JSON, stored verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasPayload {
    pub data: Box<RawValue>,
}

impl PartialEq for CanvasPayload {
    fn eq(&self, other: &Self) -> bool {
        self.data.get() == other.data.get()
    }
}

/// Payload of an image block: a storage path plus client JSON metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePayload {
    pub path: String,
    pub data: Box<RawValue>,
}

impl PartialEq for ImagePayload {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path && self.data.get() == other.data.get()
    }
}

/// Decoded block content, one variant per kind.
///
/// Serializes untagged: the wire form is the bare payload object
/// (`{"text": ...}`, `{"data": ...}`, `{"path": ..., "data": ...}`) and the
/// kind travels separately as the block's type tag. Decoding always goes
/// through [`BlockContent::decode`] with an explicit kind; the enum is
/// deliberately not `Deserialize` so the tag can never be guessed from shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BlockContent {
    Text(TextPayload),
    Canvas(CanvasPayload),
    Image(ImagePayload),
}

impl BlockContent {
    /// Decode a raw wire content object against the given kind.
    ///
    /// Fails with [`Error::InvalidContent`] when the content is absent or
    /// when required fields for the kind are missing or malformed.
    pub fn decode(kind: BlockKind, raw: Option<&RawValue>) -> Result<Self> {
        let raw = raw.ok_or_else(|| Error::InvalidContent("content is required".to_string()))?;
        match kind {
            BlockKind::Text => {
                let payload: TextPayload = serde_json::from_str(raw.get())
                    .map_err(|e| Error::InvalidContent(e.to_string()))?;
                Ok(Self::Text(payload))
            }
            BlockKind::Canvas => {
                let payload: CanvasPayload = serde_json::from_str(raw.get())
                    .map_err(|e| Error::InvalidContent(e.to_string()))?;
                Ok(Self::Canvas(payload))
            }
            BlockKind::Image => {
                let payload: ImagePayload = serde_json::from_str(raw.get())
                    .map_err(|e| Error::InvalidContent(e.to_string()))?;
                Ok(Self::Image(payload))
            }
        }
    }

    /// Encode back to the wire content object.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// The kind this payload conforms to.
    pub fn kind(&self) -> BlockKind {
        match self {
            Self::Text(_) => BlockKind::Text,
            Self::Canvas(_) => BlockKind::Canvas,
            Self::Image(_) => BlockKind::Image,
        }
    }
}

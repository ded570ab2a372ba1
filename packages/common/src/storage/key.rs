use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StorageError;

/// A named object storage bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Images,
    Documents,
}

impl Bucket {
    pub const ALL: &'static [Bucket] = &[Self::Images, Self::Documents];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Images => "images",
            Self::Documents => "documents",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Bucket {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "images" => Ok(Self::Images),
            "documents" => Ok(Self::Documents),
            other => Err(StorageError::InvalidKey(format!("unknown bucket '{other}'"))),
        }
    }
}

/// A validated object key of the form `{owner}/{name}`.
///
/// The first segment names the identity the object belongs to; it is the
/// only thing the storage policy looks at.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectKey {
    owner: String,
    name: String,
}

impl ObjectKey {
    /// Build a key from its two segments, validating both.
    pub fn from_parts(owner: &str, name: &str) -> Result<Self, StorageError> {
        validate_segment(owner)?;
        validate_segment(name)?;
        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }

    /// Parse a `{owner}/{name}` path.
    pub fn parse(path: &str) -> Result<Self, StorageError> {
        let mut parts = path.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) => Self::from_parts(owner, name),
            _ => Err(StorageError::InvalidKey(format!(
                "expected '{{owner}}/{{name}}', got '{path}'"
            ))),
        }
    }

    /// Generate a fresh key `{owner}/{uuid}.{ext}` for a new upload.
    pub fn generate(owner: Uuid, ext: &str) -> Self {
        Self {
            owner: owner.to_string(),
            name: format!("{}.{ext}", Uuid::now_v7()),
        }
    }

    /// First path segment: the owning identity's id, as written in the key.
    pub fn owner_segment(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the first segment names `user_id`.
    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        Uuid::parse_str(&self.owner).is_ok_and(|owner| owner == user_id)
    }

    pub fn as_path(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

fn validate_segment(segment: &str) -> Result<(), StorageError> {
    let reason = if segment.is_empty() {
        "empty path segment"
    } else if segment.len() > 255 {
        "path segment longer than 255 bytes"
    } else if segment.starts_with('.') {
        "path segment must not start with '.'"
    } else if segment.contains(['/', '\\']) {
        "path segment must not contain separators"
    } else if segment.chars().any(|c| c.is_control()) {
        "path segment must not contain control characters"
    } else {
        return Ok(());
    };
    Err(StorageError::InvalidKey(reason.into()))
}

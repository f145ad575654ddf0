//! Extension to MIME type table
//!
//! The table doubles as the list of tracked file types: a file whose
//! extension is not in the table is skipped by the sync driver. There is no
//! fallback content type. The side-car extension `.md5` cannot be tracked.

use std::collections::BTreeMap;

use super::entry::SIDECAR_EXTENSION;
use super::errors::DomainError;

/// Validated, case-insensitive mapping from `.ext` to `type/subtype`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MimeTable {
    entries: BTreeMap<String, String>,
}

impl MimeTable {
    /// Builds a table from raw `(extension, mime)` pairs
    ///
    /// Extensions are lowercased; they must start with `.`, have at least
    /// one more character and not be the side-car extension. MIME values must
    /// look like `type/subtype`.
    ///
    /// # Errors
    /// Returns the first invalid mapping found
    pub fn new<I, K, V>(pairs: I) -> Result<Self, DomainError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut entries = BTreeMap::new();
        for (ext, mime) in pairs {
            let ext = ext.as_ref().trim().to_ascii_lowercase();
            let mime = mime.as_ref().trim();
            validate_extension(&ext)?;
            validate_mime(&ext, mime)?;
            entries.insert(ext, mime.to_string());
        }
        Ok(Self { entries })
    }

    /// Content type for an extension such as `.JPG`, or `None` when untracked
    #[must_use]
    pub fn content_type(&self, extension: &str) -> Option<&str> {
        self.entries
            .get(&extension.to_ascii_lowercase())
            .map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn validate_extension(ext: &str) -> Result<(), DomainError> {
    if ext.len() < 2 || !ext.starts_with('.') || ext[1..].contains(['.', '/']) {
        return Err(DomainError::InvalidMimeMapping(format!(
            "extension '{ext}' must look like '.jpg'"
        )));
    }
    if &ext[1..] == SIDECAR_EXTENSION {
        return Err(DomainError::InvalidMimeMapping(format!(
            "'{ext}' is reserved for fingerprint side-car files"
        )));
    }
    Ok(())
}

fn validate_mime(ext: &str, mime: &str) -> Result<(), DomainError> {
    let valid = match mime.split_once('/') {
        Some((kind, subtype)) => {
            !kind.is_empty()
                && !subtype.is_empty()
                && !subtype.contains('/')
                && !mime.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::InvalidMimeMapping(format!(
            "'{ext}' maps to '{mime}', expected 'type/subtype'"
        )));
    }
    Ok(())
}

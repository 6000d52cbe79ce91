use crate::store::StoreError;
use std::path::{Component, Path};

pub struct SessionKey;

impl SessionKey {
    /// Validate a session id for use as a single storage path segment.
    ///
    /// Rejects:
    /// - Empty ids and ids longer than 128 bytes
    /// - Separators, `.`/`..`, and absolute paths
    /// - Hidden names (leading `.`)
    /// - Anything outside `[A-Za-z0-9._-]`
    pub fn sanitize(raw: &str) -> Result<String, StoreError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StoreError::InvalidSessionId("Empty session id".to_string()));
        }
        if trimmed.len() > 128 {
            return Err(StoreError::InvalidSessionId(format!(
                "Session id too long ({} bytes)",
                trimmed.len()
            )));
        }

        if trimmed.contains(['/', '\\']) {
            return Err(StoreError::InvalidSessionId(format!(
                "Session id must be a single path segment: {}",
                raw
            )));
        }

        let mut components = Path::new(trimmed).components();
        let segment = match (components.next(), components.next()) {
            (Some(Component::Normal(part)), None) => part.to_str().ok_or_else(|| {
                StoreError::InvalidSessionId(format!("Invalid UTF-8 in session id: {:?}", part))
            })?,
            (Some(Component::ParentDir), None) | (Some(Component::CurDir), None) => {
                return Err(StoreError::InvalidSessionId(format!(
                    "Relative directory marker not allowed: {}",
                    raw
                )));
            }
            (Some(Component::Prefix(_)), _) | (Some(Component::RootDir), _) => {
                return Err(StoreError::InvalidSessionId(format!(
                    "Absolute path not allowed: {}",
                    raw
                )));
            }
            _ => {
                return Err(StoreError::InvalidSessionId(format!(
                    "Session id must be a single path segment: {}",
                    raw
                )));
            }
        };

        if segment.starts_with('.') {
            return Err(StoreError::InvalidSessionId(format!(
                "Hidden names not allowed: {}",
                raw
            )));
        }

        if let Some(bad) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        {
            return Err(StoreError::InvalidSessionId(format!(
                "Character {:?} not allowed in session id: {}",
                bad, raw
            )));
        }

        Ok(segment.to_string())
    }
}

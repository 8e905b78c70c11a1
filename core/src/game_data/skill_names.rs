use hashbrown::HashMap;
use std::path::Path;

use crate::error::StorageError;

/// Skill id -> display name, loaded once from a JSON object such as
/// `{"1241": "Frost Beam", "20301": "Lifebloom"}`.
#[derive(Debug, Clone, Default)]
pub struct SkillNames {
    names: HashMap<u64, String>,
}

impl SkillNames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(path: &Path) -> Result<Self, StorageError> {
        let contents = std::fs::read_to_string(path).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let raw: std::collections::HashMap<String, String> = serde_json::from_str(&contents)
            .map_err(|source| StorageError::Deserialize {
                path: path.to_path_buf(),
                source,
            })?;

        let mut names = HashMap::with_capacity(raw.len());
        for (id, name) in raw {
            match id.trim().parse::<u64>() {
                Ok(id) => {
                    names.insert(id, name);
                }
                Err(_) => tracing::warn!(key = %id, "Skipping non-numeric skill id"),
            }
        }
        tracing::debug!(count = names.len(), path = ?path, "Loaded skill names");
        Ok(Self { names })
    }

    pub fn insert(&mut self, id: u64, name: impl Into<String>) {
        self.names.insert(id, name.into());
    }

    pub fn get(&self, id: u64) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Display name for `id`, falling back to the id itself.
    pub fn display_name(&self, id: u64) -> String {
        self.get(id).map(str::to_string).unwrap_or_else(|| id.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_falls_back_to_id() {
        let mut names = SkillNames::new();
        names.insert(1241, "Frost Beam");
        assert_eq!(names.display_name(1241), "Frost Beam");
        assert_eq!(names.display_name(77), "77");
    }

    #[test]
    fn test_load_skips_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("skills.json");
        std::fs::write(&path, r#"{"1241": "Frost Beam", "oops": "Nope", " 20301 ": "Lifebloom"}"#)
            .unwrap();

        let names = SkillNames::load(&path).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names.get(20301), Some("Lifebloom"));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = SkillNames::load(&dir.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }
}

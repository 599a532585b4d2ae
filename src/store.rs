use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::catalog::{Catalog, Game};
use crate::error::QuizError;

/// Read side of the game document.
pub trait DocumentStore {
    fn catalog(&self) -> Result<Catalog, QuizError>;

    fn find_game(&self, id: &str) -> Result<Option<Game>, QuizError> {
        Ok(self.catalog()?.game(id).cloned())
    }
}

impl DocumentStore for Catalog {
    fn catalog(&self) -> Result<Catalog, QuizError> {
        Ok(self.clone())
    }

    fn find_game(&self, id: &str) -> Result<Option<Game>, QuizError> {
        Ok(self.game(id).cloned())
    }
}

/// Catalog kept in a single JSON file, read wholesale on every call.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DocumentStore for JsonFileStore {
    /// A missing or blank file reads as an empty catalog. Malformed JSON is
    /// an error; the file is left untouched.
    fn catalog(&self) -> Result<Catalog, QuizError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no catalog at {}, using empty", self.path.display());
                return Ok(Catalog::default());
            }
            Err(e) => return Err(e.into()),
        };
        if text.trim().is_empty() {
            return Ok(Catalog::default());
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::catalog;
    use assert_matches::assert_matches;
    use tempfile::tempdir;

    #[test]
    fn in_memory_catalog_is_a_store() {
        let cat = catalog();
        assert_eq!(cat.find_game("series-1").unwrap().unwrap().name, "Game series-1");
        assert!(cat.find_game("nope").unwrap().is_none());
    }

    #[test]
    fn file_store_reads_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.json");
        fs::write(&path, serde_json::to_vec_pretty(&catalog()).unwrap()).unwrap();

        let store = JsonFileStore::with_path(&path);
        assert_eq!(store.path(), path.as_path());
        assert_eq!(store.catalog().unwrap(), catalog());
        assert_eq!(
            store.find_game("symbols-1").unwrap().unwrap().metadata.category,
            "Symbol Coding"
        );
    }

    #[test]
    fn missing_or_blank_file_is_empty_catalog() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.json");
        let store = JsonFileStore::with_path(&path);
        assert!(store.catalog().unwrap().main_subjects.is_empty());

        fs::write(&path, "  \n").unwrap();
        assert!(store.catalog().unwrap().main_subjects.is_empty());
        assert!(store.find_game("any").unwrap().is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("games.json");
        fs::write(&path, "[1, 2").unwrap();
        let store = JsonFileStore::with_path(&path);
        assert_matches!(store.catalog(), Err(QuizError::Parse(_)));
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2");
    }
}

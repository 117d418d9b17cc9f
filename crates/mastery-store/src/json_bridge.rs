use std::fs;
use std::path::Path;

use mastery_core::{ProgressEngine, export_json, import_json};

use crate::error::{Result, StoreError};
use crate::store::Store;

impl Store {
    /// Replace the stored items with the contents of a JSON export file.
    pub fn import_json_file(&self, path: &Path) -> Result<ProgressEngine> {
        let json = fs::read_to_string(path).map_err(|e| {
            StoreError::InvalidData(format!("failed to read {}: {e}", path.display()))
        })?;
        self.import_json_str(&json)
    }

    /// Replace the stored items with a JSON export. Returns the imported engine.
    pub fn import_json_str(&self, json: &str) -> Result<ProgressEngine> {
        let engine = import_json(json)?;
        self.save_engine(&engine)?;
        tracing::info!(items = engine.len(), "imported JSON");
        Ok(engine)
    }

    pub fn export_json_file(&self, path: &Path) -> Result<()> {
        let json = self.export_json_string()?;
        fs::write(path, json).map_err(|e| {
            StoreError::InvalidData(format!("failed to write {}: {e}", path.display()))
        })
    }

    pub fn export_json_string(&self) -> Result<String> {
        let engine = self.load_engine()?;
        export_json(&engine).map_err(|e| StoreError::InvalidData(format!("JSON export failed: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T0: u64 = 1_771_632_000;

    fn make_engine() -> ProgressEngine {
        let mut engine = ProgressEngine::new();
        for _ in 0..3 {
            engine.record_outcome_at("verbs_たべます", true, T0).unwrap();
        }
        engine.record_outcome_at("nouns_ほん", false, T0).unwrap();
        engine
    }

    #[test]
    fn test_import_export_roundtrip() {
        let store = Store::open_in_memory().unwrap();
        let original = make_engine();
        store
            .import_json_str(&export_json(&original).unwrap())
            .unwrap();

        let reimported = import_json(&store.export_json_string().unwrap()).unwrap();
        assert_eq!(reimported.summary(), original.summary());
        assert_eq!(reimported.due_items(u64::MAX), original.due_items(u64::MAX));
    }

    #[test]
    fn test_import_persists() {
        let store = Store::open_in_memory().unwrap();
        store
            .import_json_str(&export_json(&make_engine()).unwrap())
            .unwrap();
        let loaded = store.load_engine().unwrap();
        assert_eq!(loaded.record("verbs_たべます").unwrap().correct_streak, 3);
    }

    #[test]
    fn test_import_invalid_json() {
        let store = Store::open_in_memory().unwrap();
        assert!(matches!(
            store.import_json_str("not json"),
            Err(StoreError::Engine(_))
        ));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("export.json");

        let source = Store::open_in_memory().unwrap();
        source.save_engine(&make_engine()).unwrap();
        source.export_json_file(&path).unwrap();

        let target = Store::open_in_memory().unwrap();
        let engine = target.import_json_file(&path).unwrap();
        assert_eq!(engine.len(), 2);
        assert_eq!(target.load_engine().unwrap().len(), 2);

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["version"], "1.0");
    }

    #[test]
    fn test_import_missing_file() {
        let store = Store::open_in_memory().unwrap();
        let err = store
            .import_json_file(Path::new("/nonexistent/export.json"))
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"), "{err}");
    }
}

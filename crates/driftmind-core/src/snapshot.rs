//! Snapshot — Opaque Persisted State
//!
//! No specific wire format is mandated, so this module picks plain `serde_json`. A
//! snapshot bundles every piece of engine state: graph, chemistry (carried inside the
//! graph's edges), dimensions, fitness history, evolution params, and the field's C/R
//! vectors — nothing is process-global, so the snapshot is fully self-contained.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::{EngineError, Result};

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub engine: Engine,
}

/// Export the engine's full state as an opaque, versioned JSON string.
pub fn export(engine: &Engine) -> Result<String> {
    let snapshot = Snapshot { version: SNAPSHOT_VERSION, engine: engine.clone() };
    serde_json::to_string(&snapshot).map_err(|e| EngineError::Snapshot(e.to_string()))
}

/// Re-import a previously exported snapshot.
pub fn import(data: &str) -> Result<Engine> {
    let snapshot: Snapshot =
        serde_json::from_str(data).map_err(|e| EngineError::Snapshot(e.to_string()))?;
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(EngineError::Snapshot(format!(
            "unsupported snapshot version {} (expected {})",
            snapshot.version, SNAPSHOT_VERSION
        )));
    }
    Ok(snapshot.engine)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::beam::Mode;

    #[test]
    fn round_trip_is_byte_identical_without_intervening_mutation() {
        let mut engine = Engine::with_seed(3);
        engine.learn("cats are mammals");
        let _ = engine.answer("cats", Mode::Balanced);

        let first = export(&engine).unwrap();
        let second = export(&engine).unwrap();
        assert_eq!(first, second);

        let restored = import(&first).unwrap();
        let reexported = export(&restored).unwrap();
        assert_eq!(first, reexported);
    }

    #[test]
    fn rejects_unknown_version() {
        let bad = r#"{"version":999,"engine":{}}"#;
        assert!(import(bad).is_err());
    }

    #[test]
    fn round_trip_survives_a_write_to_and_read_from_disk() {
        let mut engine = Engine::with_seed(5);
        engine.learn("fire produces heat");
        let _ = engine.answer("fire", Mode::Balanced);

        let dir = tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, export(&engine).unwrap()).unwrap();

        let loaded = import(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(export(&engine).unwrap(), export(&loaded).unwrap());
    }
}

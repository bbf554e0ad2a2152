use crate::game::strategy::StateKey;
use blackjack_lib::Move;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Version written into every saved model, loading any other version fails.
pub const MODEL_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("no model file at {}", .0.display())]
    NotFound(PathBuf),
    #[error("could not read or write model: {0}")]
    Io(#[from] io::Error),
    #[error("malformed model file: {0}")]
    Format(#[from] serde_json::Error),
    #[error("unsupported model version {found}")]
    UnsupportedVersion { found: u32 },
}

/// One learned state/action value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QEntry {
    pub state: StateKey,
    pub action: Move,
    pub value: f64,
}

/// The persisted form of a learned policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyModel {
    pub version: u32,
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub epsilon: f64,
    pub entries: Vec<QEntry>,
}

impl PolicyModel {
    /// Writes the model as JSON, creating any missing parent directories.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ModelError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<PolicyModel, ModelError> {
        let path = path.as_ref();
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(ModelError::NotFound(path.to_path_buf()))
            }
            Err(e) => return Err(e.into()),
        };
        let model: PolicyModel = serde_json::from_str(&contents)?;
        if model.version != MODEL_VERSION {
            return Err(ModelError::UnsupportedVersion {
                found: model.version,
            });
        }
        Ok(model)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::game::strategy::QLearningStrategy;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "blackjack_sim_model_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    fn sample_model() -> PolicyModel {
        let mut q = QLearningStrategy::new();
        q.set_q_value(
            StateKey {
                player_total: 16,
                dealer_value: 10,
                is_soft: false,
            },
            Move::Surrender,
            -0.45,
        );
        q.set_q_value(
            StateKey {
                player_total: 18,
                dealer_value: 11,
                is_soft: true,
            },
            Move::Stand,
            0.25,
        );
        q.to_model()
    }

    #[test]
    fn test_save_and_load() {
        let dir = scratch_dir("round_trip");
        let path = dir.join("nested").join("model.json");
        let model = sample_model();
        model.save(&path).unwrap();
        let loaded = PolicyModel::load(&path).unwrap();
        assert_eq!(loaded, model);

        let mut q = QLearningStrategy::new();
        assert_eq!(q.load_model(&path).unwrap(), 2);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_missing_file() {
        let dir = scratch_dir("missing");
        let err = PolicyModel::load(dir.join("nope.json")).unwrap_err();
        assert!(matches!(err, ModelError::NotFound(_)));

        let mut q = QLearningStrategy::new();
        q.set_q_value(
            StateKey {
                player_total: 12,
                dealer_value: 2,
                is_soft: false,
            },
            Move::Hit,
            0.3,
        );
        assert!(q.load_model(dir.join("nope.json")).is_err());
        assert_eq!(q.num_entries(), 1);
    }

    #[test]
    fn test_bad_contents() {
        let dir = scratch_dir("bad");
        fs::create_dir_all(&dir).unwrap();

        let garbage = dir.join("garbage.json");
        fs::write(&garbage, "not json").unwrap();
        assert!(matches!(
            PolicyModel::load(&garbage),
            Err(ModelError::Format(_))
        ));

        let future = dir.join("future.json");
        let mut model = sample_model();
        model.version = MODEL_VERSION + 1;
        fs::write(&future, serde_json::to_string(&model).unwrap()).unwrap();
        assert!(matches!(
            PolicyModel::load(&future),
            Err(ModelError::UnsupportedVersion { found }) if found == MODEL_VERSION + 1
        ));
        let _ = fs::remove_dir_all(&dir);
    }
}

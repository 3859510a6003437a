//! Read-only access to the garden files written by the garden tooling.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, de::IgnoredAny};

use crate::domain::{GardenStats, GardenStore, RepositoryError};

/// File stem of the default garden
pub const DEFAULT_GARDEN: &str = "wonder";

/// The parts of a garden file needed for statistics
#[derive(Debug, Deserialize)]
struct GardenRecord {
    #[serde(default)]
    questions: Vec<QuestionRecord>,
}

#[derive(Debug, Deserialize)]
struct QuestionRecord {
    #[serde(default)]
    growth: Vec<IgnoredAny>,
}

/// Reads `<dir>/wonder.json`
#[derive(Debug, Clone)]
pub struct JsonGardenStore {
    dir: PathBuf,
}

impl JsonGardenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn default_garden_path(&self) -> PathBuf {
        self.dir.join(format!("{DEFAULT_GARDEN}.json"))
    }
}

#[async_trait]
impl GardenStore for JsonGardenStore {
    async fn load_stats(&self) -> Result<GardenStats, RepositoryError> {
        let path = self.default_garden_path();
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(RepositoryError::GardenNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        let garden: GardenRecord = serde_json::from_str(&content)?;
        Ok(GardenStats {
            questions: garden.questions.len() as u64,
            tendings: garden.questions.iter().map(|q| q.growth.len() as u64).sum(),
        })
    }
}

// ============================================================
// Layer 4 — Dataset Loader
// ============================================================
// Loads passages, titles and suggested questions from a JSON
// bundle shaped like this:
//
//   {
//     "titles":    [["Super_Bowl_50"], ...],
//     "contents":  [["paragraph 1", "paragraph 2"], ...],
//     "questions": [["Where did Super Bowl 50 take place?", ...], ...]
//   }
//
// Entry i is titles[i][0], contents[i] joined by "\n", and
// questions[i]. The three arrays must have the same length.
//
// A copy of assets/qa.json is compiled into the binary and used
// when no --dataset path is given.
//
// Reference: serde_json documentation
//            Rust Book §9 (Error Handling)

use std::{fs, path::Path};

use serde::Deserialize;

use crate::domain::errors::DatasetError;
use crate::domain::passage::Passage;
use crate::domain::traits::DatasetProvider;

const BUNDLED_DATASET: &str = include_str!("../../assets/qa.json");

/// On-disk layout of the dataset bundle.
#[derive(Debug, Deserialize)]
struct DatasetFile {
    titles:    Vec<Vec<String>>,
    contents:  Vec<Vec<String>>,
    questions: Vec<Vec<String>>,
}

/// A dataset held fully in memory.
/// Implements the DatasetProvider trait from Layer 3.
#[derive(Debug, Clone)]
pub struct JsonDataset {
    passages: Vec<Passage>,
}

impl JsonDataset {
    /// The dataset compiled into the binary.
    pub fn bundled() -> Result<Self, DatasetError> {
        Self::from_json(BUNDLED_DATASET)
    }

    /// Load a dataset bundle from disk.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DatasetError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| DatasetError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let dataset = Self::from_json(&json)?;
        tracing::info!(
            "Loaded {} passages from '{}'",
            dataset.passages.len(),
            path.display()
        );
        Ok(dataset)
    }

    /// `from_path` when a path is given, `bundled` otherwise.
    pub fn from_optional_path(path: Option<&Path>) -> Result<Self, DatasetError> {
        match path {
            Some(p) => Self::from_path(p),
            None    => Self::bundled(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self, DatasetError> {
        let file: DatasetFile = serde_json::from_str(json)?;

        if file.titles.len() != file.contents.len() || file.titles.len() != file.questions.len() {
            return Err(DatasetError::Inconsistent(format!(
                "{} titles, {} contents, {} question lists",
                file.titles.len(),
                file.contents.len(),
                file.questions.len()
            )));
        }

        let passages = file
            .titles
            .into_iter()
            .zip(file.contents)
            .zip(file.questions)
            .enumerate()
            .map(|(i, ((titles, paragraphs), questions))| {
                let title = titles.into_iter().next().ok_or_else(|| {
                    DatasetError::Inconsistent(format!("entry {i} has no title"))
                })?;
                Ok(Passage::new(title, paragraphs.join("\n"), questions))
            })
            .collect::<Result<Vec<_>, DatasetError>>()?;

        Ok(Self { passages })
    }

    /// Wrap passages that were built in code.
    pub fn from_passages(passages: Vec<Passage>) -> Self {
        Self { passages }
    }

    fn get(&self, index: usize) -> Result<&Passage, DatasetError> {
        self.passages.get(index).ok_or(DatasetError::IndexOutOfRange {
            index,
            len: self.passages.len(),
        })
    }
}

impl DatasetProvider for JsonDataset {
    fn len(&self) -> usize {
        self.passages.len()
    }

    fn titles(&self) -> Vec<&str> {
        self.passages.iter().map(|p| p.title.as_str()).collect()
    }

    fn content(&self, index: usize) -> Result<&str, DatasetError> {
        Ok(self.get(index)?.content.as_str())
    }

    fn questions(&self, index: usize) -> Result<&[String], DatasetError> {
        Ok(self.get(index)?.questions.as_slice())
    }

    fn passage(&self, index: usize) -> Result<Passage, DatasetError> {
        self.get(index).cloned()
    }
}

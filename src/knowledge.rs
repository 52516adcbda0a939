use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum KnowledgeError {
    #[error("can't read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("malformed FAQ document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

#[derive(Deserialize)]
struct FaqDocument {
    faq: Vec<FaqEntry>,
}

/// FAQ entries in the order they were loaded. Never mutated after startup.
#[derive(Clone, Debug, Default)]
pub struct KnowledgeBase {
    entries: Vec<FaqEntry>,
}

impl KnowledgeBase {
    pub fn new(entries: Vec<FaqEntry>) -> KnowledgeBase {
        KnowledgeBase { entries }
    }

    pub async fn load(path: impl AsRef<Path>) -> Result<KnowledgeBase, KnowledgeError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).await.map_err(|source| KnowledgeError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let kb = KnowledgeBase::from_json(&raw)?;
        log::info!("loaded {} FAQ entries from {}", kb.len(), path.display());
        if kb.is_empty() {
            log::warn!("FAQ is empty, every message goes to the provider");
        }
        Ok(kb)
    }

    /// Parses `{"faq": [{"question": .., "answer": ..}, ..]}`.
    pub fn from_json(raw: &str) -> Result<KnowledgeBase, KnowledgeError> {
        let doc: FaqDocument = serde_json::from_str(raw)?;
        Ok(KnowledgeBase::new(doc.faq))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Answer of the first entry whose question occurs inside the utterance,
    /// case-insensitively. Containment, not equality: a short question like
    /// "цена" matches any utterance mentioning it.
    pub fn lookup(&self, utterance: &str) -> Option<&str> {
        let utterance = utterance.to_lowercase();

        self.entries
            .iter()
            .find(|entry| utterance.contains(&entry.question.to_lowercase()))
            .map(|entry| entry.answer.as_str())
    }
}

//! Back-off n-gram model over vocabulary ids.
//!
//! For every context length k in 0..=order the model keeps next-id counts
//! keyed by the last k ids of the training segment. Prediction walks from the
//! longest context down and answers with the first table that has seen the
//! context; the k = 0 table sees every training window, so a trained model
//! always has an answer. An untrained model predicts uniformly.

use std::collections::BTreeMap;
use std::path::Path;

use codec::TrainingWindow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::predictor::{Predictor, PredictorError};
use crate::ModelError;

/// Next id → occurrences.
type Counts = BTreeMap<usize, u64>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NgramModel {
    order: usize,
    vocab_size: usize,
    /// `tables[k]` is keyed by the last k ids.
    tables: Vec<BTreeMap<String, Counts>>,
}

fn context_key(context: &[usize]) -> String {
    context
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl NgramModel {
    pub fn new(order: usize, vocab_size: usize) -> Self {
        NgramModel {
            order,
            vocab_size,
            tables: vec![BTreeMap::new(); order + 1],
        }
    }

    /// Count every window's target under each context length.
    pub fn train<I>(windows: I, order: usize, vocab_size: usize) -> Self
    where
        I: IntoIterator<Item = TrainingWindow>,
    {
        let mut model = NgramModel::new(order, vocab_size);
        let mut seen = 0usize;
        for window in windows {
            model.observe(&window.segment, window.target);
            seen += 1;
        }
        info!(
            windows = seen,
            order,
            contexts = model.context_count(),
            "trained n-gram model"
        );
        model
    }

    /// Add one (context, next id) observation.
    pub fn observe(&mut self, segment: &[usize], target: usize) {
        for k in 0..=self.order.min(segment.len()) {
            let key = context_key(&segment[segment.len() - k..]);
            *self.tables[k]
                .entry(key)
                .or_default()
                .entry(target)
                .or_default() += 1;
        }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    pub fn vocab_size(&self) -> usize {
        self.vocab_size
    }

    /// Distinct contexts across all orders.
    pub fn context_count(&self) -> usize {
        self.tables.iter().map(BTreeMap::len).sum()
    }

    fn distribution(&self, counts: &Counts) -> Vec<f64> {
        let total: u64 = counts.values().sum();
        let mut dist = vec![0.0; self.vocab_size];
        for (&id, &count) in counts {
            if let Some(p) = dist.get_mut(id) {
                *p = count as f64 / total as f64;
            }
        }
        dist
    }

    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ModelError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "saved model weights");
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let text = std::fs::read_to_string(path).map_err(|source| ModelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let model: NgramModel = serde_json::from_str(&text)?;
        if model.tables.len() != model.order + 1 {
            return Err(ModelError::Invalid(format!(
                "{} tables for order {}",
                model.tables.len(),
                model.order
            )));
        }
        Ok(model)
    }
}

impl Predictor for NgramModel {
    fn predict(&self, window: &[usize]) -> Result<Vec<f64>, PredictorError> {
        if let Some(&id) = window.iter().find(|&&id| id >= self.vocab_size) {
            return Err(PredictorError::IdOutOfRange {
                id,
                vocab_size: self.vocab_size,
            });
        }

        for k in (0..=self.order.min(window.len())).rev() {
            let key = context_key(&window[window.len() - k..]);
            if let Some(counts) = self.tables[k].get(&key) {
                debug!(context = k, "n-gram hit");
                return Ok(self.distribution(counts));
            }
        }

        Ok(vec![1.0 / self.vocab_size as f64; self.vocab_size])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codec::windows::song_windows;
    use pretty_assertions::assert_eq;

    #[test]
    fn context_keys() {
        assert_eq!(context_key(&[]), "");
        assert_eq!(context_key(&[3, 10, 0]), "3,10,0");
    }

    #[test]
    fn learns_a_repeating_song() {
        // filler 0, song 1 2 3 1 2 3
        let song = [1, 2, 3, 1, 2, 3];
        let model = NgramModel::train(song_windows(&song, 4, 0), 4, 4);

        assert_eq!(model.predict(&[0, 0, 0, 0]).unwrap(), vec![0.0, 1.0, 0.0, 0.0]);
        assert_eq!(model.predict(&[0, 0, 0, 1]).unwrap(), vec![0.0, 0.0, 1.0, 0.0]);
        assert_eq!(model.predict(&[3, 1, 2, 3]).unwrap(), vec![1.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn backs_off_to_shorter_context() {
        let mut model = NgramModel::new(2, 3);
        model.observe(&[1, 2], 0);
        model.observe(&[2, 2], 1);

        // "0,2" never seen, but "2" was, followed by 0 once and 1 once
        assert_eq!(model.predict(&[0, 2]).unwrap(), vec![0.5, 0.5, 0.0]);
        // nothing matches beyond the unigram table
        assert_eq!(model.predict(&[1, 1]).unwrap(), vec![0.5, 0.5, 0.0]);
    }

    #[test]
    fn untrained_is_uniform() {
        let model = NgramModel::new(3, 4);
        assert_eq!(model.predict(&[0, 1]).unwrap(), vec![0.25; 4]);
    }

    #[test]
    fn rejects_foreign_ids() {
        let model = NgramModel::new(1, 2);
        assert!(matches!(
            model.predict(&[0, 5]),
            Err(PredictorError::IdOutOfRange { id: 5, vocab_size: 2 })
        ));
    }

    #[test]
    fn short_windows_use_what_they_have() {
        let mut model = NgramModel::new(4, 3);
        model.observe(&[1], 2);
        assert_eq!(model.predict(&[1]).unwrap(), vec![0.0, 0.0, 1.0]);
        assert_eq!(model.predict(&[]).unwrap(), vec![0.0, 0.0, 1.0]);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        let model = NgramModel::train(song_windows(&[1, 2, 1, 1], 3, 0), 2, 3);

        model.save(&path).unwrap();
        assert_eq!(NgramModel::load(&path).unwrap(), model);
    }

    #[test]
    fn load_rejects_inconsistent_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("weights.json");
        std::fs::write(&path, r#"{"order":2,"vocab_size":3,"tables":[{}]}"#).unwrap();
        assert!(matches!(NgramModel::load(&path), Err(ModelError::Invalid(_))));
    }
}

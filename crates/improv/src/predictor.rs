//! The next-token model seam.

/// Errors a predictor may raise for a window.
#[derive(Debug, thiserror::Error)]
pub enum PredictorError {
    #[error("id {id} is outside the model's vocabulary of {vocab_size}")]
    IdOutOfRange { id: usize, vocab_size: usize },

    #[error("model failure: {0}")]
    Model(String),
}

/// Maps a window of token ids to a probability vector over the vocabulary.
///
/// Implementations must not depend on earlier calls: every prediction is a
/// pure function of the window, so one model can serve many generations at
/// once.
pub trait Predictor: Send + Sync {
    fn predict(&self, window: &[usize]) -> Result<Vec<f64>, PredictorError>;
}

impl<F> Predictor for F
where
    F: Fn(&[usize]) -> Vec<f64> + Send + Sync,
{
    fn predict(&self, window: &[usize]) -> Result<Vec<f64>, PredictorError> {
        Ok(self(window))
    }
}

/// One row per window position, with a single 1.0 at that position's id.
///
/// Ids at or past `vocab_size` leave their row all zero.
pub fn one_hot(window: &[usize], vocab_size: usize) -> Vec<Vec<f32>> {
    window
        .iter()
        .map(|&id| {
            let mut row = vec![0.0; vocab_size];
            if let Some(cell) = row.get_mut(id) {
                *cell = 1.0;
            }
            row
        })
        .collect()
}

//! Autoregressive continuation of a seed melody.
//!
//! A [`Generation`] owns one song's sliding window. Each [`Generation::step`]
//! asks the predictor for a distribution over the vocabulary, samples a token,
//! appends it and slides the window. Generation stops when the filler is drawn
//! or the step limit is reached. The song so far is available at any point, so
//! a caller can stop between steps.

use std::collections::VecDeque;

use codec::{EncodedSong, Rational, Token, Vocabulary};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::predictor::{Predictor, PredictorError};
use crate::sampler::{SampleError, Sampler};

#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("seed token '{token}' at position {position} is not in the vocabulary")]
    UnknownToken { token: Token, position: usize },

    #[error("predictor returned {got} probabilities for a vocabulary of {expected}")]
    DistributionSize { expected: usize, got: usize },

    #[error("sampled id {0} is outside the vocabulary")]
    UnknownId(usize),

    #[error(transparent)]
    Sample(#[from] SampleError),

    #[error(transparent)]
    Predictor(#[from] PredictorError),
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Window length fed to the predictor
    pub segment_length: usize,
    /// Generated tokens before stopping; 0 means until the filler is drawn
    pub max_steps: usize,
    pub temperature: f64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        GenerationConfig {
            segment_length: 128,
            max_steps: 0,
            temperature: 0.8,
        }
    }
}

/// Step limit for `bars` bars of 4/4 at quantization `step` (quarter notes).
///
/// Zero bars means no limit.
pub fn steps_for_bars(bars: usize, step: Rational) -> usize {
    if bars == 0 || *step.numer() <= 0 {
        return 0;
    }
    let steps = Rational::from_integer(4) / step;
    bars * steps.to_integer().max(1) as usize
}

/// What one call to [`Generation::step`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Token appended, generation goes on
    Continue(Token),
    /// Token appended and generation is now over
    Finished(Token),
    /// Already over, nothing happened
    Done,
}

pub struct Generation<'v> {
    vocabulary: &'v Vocabulary,
    config: GenerationConfig,
    seed: EncodedSong,
    window: VecDeque<usize>,
    generated: Vec<Token>,
    finished: bool,
}

impl<'v> Generation<'v> {
    /// Map the seed into ids and fill the first window.
    ///
    /// The window is the last `segment_length` ids of the seed behind
    /// `segment_length` fillers. Any seed token outside the vocabulary fails
    /// here, before the predictor ever runs.
    pub fn start(
        seed: &EncodedSong,
        vocabulary: &'v Vocabulary,
        config: GenerationConfig,
    ) -> Result<Self, GenerateError> {
        let ids = seed
            .iter()
            .enumerate()
            .map(|(position, token)| {
                vocabulary
                    .id(token)
                    .ok_or(GenerateError::UnknownToken { token: *token, position })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let len = config.segment_length;
        let mut padded: Vec<usize> = std::iter::repeat(vocabulary.filler_id())
            .take(len)
            .chain(ids)
            .collect();
        let window: VecDeque<usize> = padded.split_off(padded.len() - len).into();

        Ok(Generation {
            vocabulary,
            config,
            seed: seed.clone(),
            window,
            generated: Vec::new(),
            finished: false,
        })
    }

    /// Produce one token.
    pub fn step<P>(&mut self, predictor: &P, sampler: &mut Sampler) -> Result<Step, GenerateError>
    where
        P: Predictor + ?Sized,
    {
        if self.finished {
            return Ok(Step::Done);
        }

        let distribution = predictor.predict(self.window.make_contiguous())?;
        if distribution.len() != self.vocabulary.len() {
            return Err(GenerateError::DistributionSize {
                expected: self.vocabulary.len(),
                got: distribution.len(),
            });
        }

        let id = sampler.sample(&distribution, self.config.temperature)?;
        let token = self.vocabulary.token(id).ok_or(GenerateError::UnknownId(id))?;

        if self.window.pop_front().is_some() {
            self.window.push_back(id);
        }
        self.generated.push(token);

        let limit_hit = self.config.max_steps > 0 && self.generated.len() >= self.config.max_steps;
        if token == Token::Filler || limit_hit {
            self.finished = true;
            debug!(steps = self.generated.len(), filler = token == Token::Filler, "generation finished");
            Ok(Step::Finished(token))
        } else {
            Ok(Step::Continue(token))
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Tokens produced so far, seed excluded.
    pub fn generated(&self) -> &[Token] {
        &self.generated
    }

    /// Seed followed by everything generated.
    pub fn into_song(self) -> EncodedSong {
        let mut song = self.seed;
        song.extend(self.generated);
        song
    }
}

/// Continue `seed` until the predictor draws the filler or the step limit hits.
pub fn generate<P>(
    seed: &EncodedSong,
    vocabulary: &Vocabulary,
    config: GenerationConfig,
    predictor: &P,
    sampler: &mut Sampler,
) -> Result<EncodedSong, GenerateError>
where
    P: Predictor + ?Sized,
{
    let mut generation = Generation::start(seed, vocabulary, config)?;
    while let Step::Continue(_) = generation.step(predictor, sampler)? {}

    info!(
        seed = seed.len(),
        generated = generation.generated().len(),
        "generated melody"
    );
    Ok(generation.into_song())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // "*" "-" "0" "60" "62"
    fn vocab() -> Vocabulary {
        Vocabulary::build(&[Some("60 - 0 62".parse().unwrap())])
    }

    fn seed(text: &str) -> EncodedSong {
        text.parse().unwrap()
    }

    fn config(segment_length: usize, max_steps: usize) -> GenerationConfig {
        GenerationConfig {
            segment_length,
            max_steps,
            temperature: 0.8,
        }
    }

    fn always(id: usize) -> impl Fn(&[usize]) -> Vec<f64> + Send + Sync {
        move |_: &[usize]| {
            let mut dist = vec![0.0; 5];
            dist[id] = 1.0;
            dist
        }
    }

    #[test]
    fn filler_ends_after_one_step() {
        let vocab = vocab();
        for max_steps in [0, 1, 50] {
            let song = generate(
                &seed("60 -"),
                &vocab,
                config(4, max_steps),
                &always(vocab.filler_id()),
                &mut Sampler::with_seed(1),
            )
            .unwrap();
            assert_eq!(song, seed("60 - *"));
        }
    }

    #[test]
    fn step_limit() {
        let vocab = vocab();
        let hold = vocab.id(&Token::Hold).unwrap();
        let song = generate(&seed("62"), &vocab, config(4, 3), &always(hold), &mut Sampler::with_seed(1))
            .unwrap();
        assert_eq!(song, seed("62 - - -"));
    }

    #[test]
    fn unknown_seed_token_fails_before_predicting() {
        let calls = AtomicUsize::new(0);
        let counting = |_: &[usize]| {
            calls.fetch_add(1, Ordering::SeqCst);
            vec![1.0; 5]
        };

        let vocab = vocab();
        let err = generate(&seed("60 61"), &vocab, config(4, 0), &counting, &mut Sampler::with_seed(1))
            .unwrap_err();
        assert!(matches!(
            err,
            GenerateError::UnknownToken { token: Token::Pitch(61), position: 1 }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn window_is_padded_then_slides() {
        let vocab = vocab();
        let rest = vocab.id(&Token::Rest).unwrap();
        let seen = Mutex::new(Vec::new());
        let recording = |window: &[usize]| {
            seen.lock().unwrap().push(window.to_vec());
            always(rest)(window)
        };

        let mut generation = Generation::start(&seed("60 -"), &vocab, config(3, 2)).unwrap();
        let mut sampler = Sampler::with_seed(5);
        assert_eq!(generation.step(&recording, &mut sampler).unwrap(), Step::Continue(Token::Rest));
        assert_eq!(generation.step(&recording, &mut sampler).unwrap(), Step::Finished(Token::Rest));
        assert_eq!(generation.step(&recording, &mut sampler).unwrap(), Step::Done);

        let filler = vocab.filler_id();
        let sixty = vocab.id(&Token::Pitch(60)).unwrap();
        let hold = vocab.id(&Token::Hold).unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            vec![vec![filler, sixty, hold], vec![sixty, hold, rest]]
        );
        assert_eq!(generation.into_song(), seed("60 - 0 0"));
    }

    #[test]
    fn long_seed_keeps_only_its_tail() {
        let vocab = vocab();
        let seen = Mutex::new(Vec::new());
        let recording = |window: &[usize]| {
            seen.lock().unwrap().push(window.to_vec());
            always(vocab.filler_id())(window)
        };

        generate(&seed("62 - 0 60 -"), &vocab, config(2, 0), &recording, &mut Sampler::with_seed(1))
            .unwrap();
        let expected = vec![vocab.id(&Token::Pitch(60)).unwrap(), vocab.id(&Token::Hold).unwrap()];
        assert_eq!(*seen.lock().unwrap(), vec![expected]);
    }

    #[test]
    fn wrong_distribution_size() {
        let vocab = vocab();
        let short = |_: &[usize]| vec![1.0, 0.0];
        let err = generate(&seed(""), &vocab, config(4, 0), &short, &mut Sampler::with_seed(1)).unwrap_err();
        assert!(matches!(err, GenerateError::DistributionSize { expected: 5, got: 2 }));
    }

    #[test]
    fn degenerate_distribution_surfaces() {
        let vocab = vocab();
        let zeros = |_: &[usize]| vec![0.0; 5];
        let err = generate(&seed(""), &vocab, config(4, 0), &zeros, &mut Sampler::with_seed(1)).unwrap_err();
        assert!(matches!(err, GenerateError::Sample(SampleError::ZeroMass)));
    }

    #[test]
    fn partial_song_between_steps() {
        let vocab = vocab();
        let sixty = vocab.id(&Token::Pitch(60)).unwrap();
        let mut generation = Generation::start(&seed("0"), &vocab, config(8, 0)).unwrap();
        let mut sampler = Sampler::with_seed(9);
        for _ in 0..4 {
            assert_eq!(generation.step(&always(sixty), &mut sampler).unwrap(), Step::Continue(Token::Pitch(60)));
        }
        assert!(!generation.is_finished());
        assert_eq!(generation.into_song(), seed("0 60 60 60 60"));
    }

    #[test]
    fn bars_to_steps() {
        assert_eq!(steps_for_bars(0, Rational::new(1, 4)), 0);
        assert_eq!(steps_for_bars(2, Rational::new(1, 4)), 32);
        assert_eq!(steps_for_bars(3, Rational::new(1, 2)), 24);
    }
}

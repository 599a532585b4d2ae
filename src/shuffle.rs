use rand::Rng;

use crate::catalog::Question;
use crate::error::QuizError;

/// A question with its options put into a per-session random order.
#[derive(Debug, Clone, PartialEq)]
pub struct RandomizedQuestion {
    pub question: Question,
    pub options: Vec<String>,
    pub original_to_randomized: Vec<usize>,
    pub randomized_to_original: Vec<usize>,
}

impl RandomizedQuestion {
    /// Displayed position of the correct answer.
    pub fn correct_position(&self) -> usize {
        self.original_to_randomized[self.question.correct]
    }

    /// Original option index for a displayed position.
    pub fn original_index(&self, position: usize) -> Option<usize> {
        self.randomized_to_original.get(position).copied()
    }

    pub fn is_correct(&self, position: usize) -> bool {
        self.original_index(position) == Some(self.question.correct)
    }
}

/// Draws the original option indices out of a pool one at a time, each
/// uniformly from what is left, so every one of the `n!` orders is equally
/// likely.
pub fn randomize<R: Rng>(
    question: &Question,
    rng: &mut R,
) -> Result<RandomizedQuestion, QuizError> {
    question.validate()?;

    let n = question.options.len();
    let mut pool: Vec<usize> = (0..n).collect();
    let mut options = Vec::with_capacity(n);
    let mut original_to_randomized = vec![0; n];
    let mut randomized_to_original = Vec::with_capacity(n);

    while !pool.is_empty() {
        let original = pool.remove(rng.gen_range(0..pool.len()));
        original_to_randomized[original] = options.len();
        randomized_to_original.push(original);
        options.push(question.options[original].clone());
    }

    Ok(RandomizedQuestion {
        question: question.clone(),
        options,
        original_to_randomized,
        randomized_to_original,
    })
}

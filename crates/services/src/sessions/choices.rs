use flashcard_core::model::LearningItem;
use rand::seq::{IndexedRandom, SliceRandom};

use crate::random::RandomSource;

/// Builds the answer options for one question.
///
/// Returns `min(size, deck.len())` distinct items: `correct` plus
/// distractors sampled without replacement from the rest of `deck`, in an
/// order drawn independently of the deck order. `size` is at least 1.
pub fn generate_choice_set<'a>(
    deck: &'a [LearningItem],
    correct: &'a LearningItem,
    size: usize,
    rng: &mut dyn RandomSource,
) -> Vec<&'a LearningItem> {
    let others: Vec<&LearningItem> = deck.iter().filter(|c| c.id() != correct.id()).collect();

    let mut choices = Vec::with_capacity(size.max(1));
    choices.push(correct);
    choices.extend(
        others
            .choose_multiple(rng.rng(), size.saturating_sub(1))
            .copied(),
    );
    choices.shuffle(rng.rng());
    choices
}

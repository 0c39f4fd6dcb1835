//! Reply selection with an injectable source of choice.

use std::collections::VecDeque;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use super::classifier::{classify, ResponseCategory};
use super::responses::ResponsePool;

/// Source of choice for picking among candidates.
///
/// Implementations return an index in `0..len`; `len` is always at least 1.
pub trait ChoiceSource: Send {
    fn choose(&mut self, len: usize) -> usize;
}

/// Uniform choice from the thread-local generator.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl ChoiceSource for ThreadRandom {
    fn choose(&mut self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Reproducible uniform choice.
#[derive(Debug, Clone)]
pub struct SeededChoice {
    rng: StdRng,
}

impl SeededChoice {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl ChoiceSource for SeededChoice {
    fn choose(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of indices, then keeps returning 0.
/// Out-of-range indices wrap modulo `len`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedChoice {
    script: VecDeque<usize>,
}

impl ScriptedChoice {
    pub fn new(script: impl IntoIterator<Item = usize>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }
}

impl ChoiceSource for ScriptedChoice {
    fn choose(&mut self, len: usize) -> usize {
        self.script.pop_front().unwrap_or(0) % len
    }
}

/// Picks one candidate per category.
pub struct Selector {
    pool: Arc<ResponsePool>,
    chooser: Box<dyn ChoiceSource>,
}

impl Selector {
    pub fn new(pool: Arc<ResponsePool>, chooser: Box<dyn ChoiceSource>) -> Self {
        Self { pool, chooser }
    }

    pub fn select(&mut self, category: ResponseCategory) -> String {
        let candidates = self.pool.candidates(category);
        // ResponsePool construction rejects empty categories.
        assert!(
            !candidates.is_empty(),
            "response pool has no candidates for `{category}`"
        );

        let index = self.chooser.choose(candidates.len()).min(candidates.len() - 1);
        debug!(%category, index, "response selected");
        candidates[index].clone()
    }

    /// Draw an extra `0..=max` from the same source (used for delay jitter).
    pub fn jitter(&mut self, max: u64) -> u64 {
        if max == 0 {
            return 0;
        }
        // `0..=max` has `max + 1` values; saturate where that exceeds usize.
        let span = usize::try_from(max)
            .ok()
            .and_then(|m| m.checked_add(1))
            .unwrap_or(usize::MAX);
        self.chooser.choose(span) as u64
    }

    pub fn pool(&self) -> &ResponsePool {
        &self.pool
    }
}

/// A categorized reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub category: ResponseCategory,
    pub text: String,
}

/// The classify + select pipeline, shared by the text engine and the voice adapter.
pub struct Responder {
    selector: Selector,
}

impl Responder {
    pub fn new(pool: Arc<ResponsePool>, chooser: Box<dyn ChoiceSource>) -> Self {
        Self {
            selector: Selector::new(pool, chooser),
        }
    }

    pub fn respond(&mut self, text: &str) -> Reply {
        let category = classify(text);
        Reply {
            category,
            text: self.selector.select(category),
        }
    }

    pub fn selector_mut(&mut self) -> &mut Selector {
        &mut self.selector
    }

    pub fn pool(&self) -> &ResponsePool {
        self.selector.pool()
    }
}

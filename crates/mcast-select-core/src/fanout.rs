//! Counting completion barrier for a batch of concurrent lookups.
//!
//! A page load fans out one membership lookup per device. Re-rendering on each
//! answer would refresh the page N times, so the lookups are counted against a
//! barrier that drains once per batch. Every `open` starts a new generation;
//! completions carry the generation they were issued under and are ignored
//! once that generation has been superseded.

use tracing::{debug, trace};

use crate::error::BarrierError;

/// Token identifying one batch opened on a [`FanOutBarrier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

/// What a single `complete` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Still waiting on `remaining` completions.
    Pending { remaining: usize },
    /// This was the last completion; `on_drained` has fired.
    Drained,
    /// The completion belonged to a superseded generation and was ignored.
    Stale,
}

type DrainedHook = Box<dyn FnMut(Generation) + Send>;

pub struct FanOutBarrier {
    generation: u64,
    expected: usize,
    pending: usize,
    on_drained: Option<DrainedHook>,
}

impl FanOutBarrier {
    /// Create an inert barrier. Nothing can complete until `open` is called.
    pub fn new() -> Self {
        Self {
            generation: 0,
            expected: 0,
            pending: 0,
            on_drained: None,
        }
    }

    /// Create a barrier that calls `hook` once per drained generation.
    pub fn with_on_drained<F>(hook: F) -> Self
    where
        F: FnMut(Generation) + Send + 'static,
    {
        Self {
            on_drained: Some(Box::new(hook)),
            ..Self::new()
        }
    }

    /// Start a new generation waiting on `n` completions.
    ///
    /// Any generation still pending is superseded. `open(0)` drains at once.
    pub fn open(&mut self, n: usize) -> Generation {
        if self.pending > 0 {
            debug!(
                generation = self.generation,
                pending = self.pending,
                "superseding undrained batch"
            );
        }

        self.generation += 1;
        self.expected = n;
        self.pending = n;
        let token = Generation(self.generation);

        if n == 0 {
            self.fire(token);
        }

        token
    }

    /// Record one completion for `token`'s generation.
    pub fn complete(&mut self, token: Generation) -> Result<Completion, BarrierError> {
        if token.0 != self.generation {
            trace!(
                stale = token.0,
                current = self.generation,
                "ignoring completion of superseded batch"
            );
            return Ok(Completion::Stale);
        }

        if self.pending == 0 {
            return Err(BarrierError::Overuse {
                generation: self.generation,
                expected: self.expected,
            });
        }

        self.pending -= 1;
        if self.pending == 0 {
            self.fire(token);
            Ok(Completion::Drained)
        } else {
            Ok(Completion::Pending {
                remaining: self.pending,
            })
        }
    }

    /// Drop the current generation without draining it.
    ///
    /// In-flight completions of that generation become stale.
    pub fn abandon(&mut self) {
        self.generation += 1;
        self.expected = 0;
        self.pending = 0;
    }

    /// The generation new completions are counted against.
    pub fn current(&self) -> Generation {
        Generation(self.generation)
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    fn fire(&mut self, token: Generation) {
        debug!(generation = token.0, lookups = self.expected, "batch drained");
        if let Some(hook) = self.on_drained.as_mut() {
            hook(token);
        }
    }
}

impl Default for FanOutBarrier {
    fn default() -> Self {
        Self::new()
    }
}

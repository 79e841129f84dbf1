//! Step - affinity 付きのクロージャ

use std::fmt;

use crate::domain::Affinity;

/// One unit of work over a chain's context.
pub struct Step<C> {
    affinity: Affinity,
    body: Box<dyn FnMut(&mut C) + Send>,
}

impl<C> Step<C> {
    pub fn new<F>(affinity: Affinity, body: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        Self {
            affinity,
            body: Box::new(body),
        }
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub(crate) fn run(&mut self, context: &mut C) {
        (self.body)(context)
    }
}

impl<C> fmt::Debug for Step<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("affinity", &self.affinity)
            .finish_non_exhaustive()
    }
}

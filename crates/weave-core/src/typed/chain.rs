//! Chain - コンテキストを共有する step の列
//!
//! A `Chain<C>` owns its context for its whole life and hands it by `&mut`
//! to each step in turn. The step list is frozen as soon as the first step
//! runs.

use std::fmt;

use super::step::Step;
use crate::domain::{Affinity, ChainError, Status};
use crate::ports::Task;

/// An ordered, affinity-tagged sequence of steps bound to one context.
///
/// # 使用例
/// ```
/// use weave_core::ports::Task;
/// use weave_core::typed::Chain;
///
/// let mut chain = Chain::new(0u32)
///     .background(|n| *n += 40)
///     .main(|n| *n += 2);
///
/// while chain.execute() {}
/// assert_eq!(chain.into_context(), 42);
/// ```
pub struct Chain<C> {
    context: C,
    steps: Vec<Step<C>>,
    cursor: usize,
    status: Status,
}

impl<C: Send> Chain<C> {
    pub fn new(context: C) -> Self {
        Self::with_capacity(context, 0)
    }

    pub fn with_capacity(context: C, capacity: usize) -> Self {
        Self {
            context,
            steps: Vec::with_capacity(capacity),
            cursor: 0,
            status: Status::default(),
        }
    }

    /// Append a step to the tail.
    ///
    /// # Panics
    /// If any step has already executed. Chains must be fully built before
    /// they are scheduled.
    pub fn append<F>(&mut self, affinity: Affinity, body: F) -> &mut Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        if let Err(err) = self.try_append(affinity, body) {
            panic!("{err}");
        }
        self
    }

    /// Non-panicking form of [`Chain::append`].
    pub fn try_append<F>(&mut self, affinity: Affinity, body: F) -> Result<&mut Self, ChainError>
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        if self.cursor > 0 {
            return Err(ChainError::AlreadyStarted {
                cursor: self.cursor,
            });
        }
        self.steps.push(Step::new(affinity, body));
        Ok(self)
    }

    /// By-value builder form of [`Chain::append`].
    pub fn then<F>(mut self, affinity: Affinity, body: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.append(affinity, body);
        self
    }

    pub fn main<F>(self, body: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.then(Affinity::Main, body)
    }

    pub fn background<F>(self, body: F) -> Self
    where
        F: FnMut(&mut C) + Send + 'static,
    {
        self.then(Affinity::Background, body)
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Index of the next step to run.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub fn into_context(self) -> C {
        self.context
    }
}

impl<C: Send> Task for Chain<C> {
    fn status(&self) -> Status {
        self.status
    }

    fn set_status(&mut self, status: Status) {
        self.status = status;
    }

    fn current_affinity(&self) -> Option<Affinity> {
        self.steps.get(self.cursor).map(Step::affinity)
    }

    fn execute(&mut self) -> bool {
        let Some(step) = self.steps.get_mut(self.cursor) else {
            return false;
        };
        step.run(&mut self.context);
        self.cursor += 1;
        true
    }
}

impl<C> fmt::Debug for Chain<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("steps", &self.steps)
            .field("cursor", &self.cursor)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

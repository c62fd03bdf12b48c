//! Stages: the units of computation in a pipeline.
//!
//! A stage behavior implements [`Stage`]. The engine hands it a
//! [`StageContext`] holding its ports, and every stream operation a stage
//! performs goes through that context.

use std::fmt;

use crate::error::PipeError;

mod context;

pub use context::StageContext;

/// Index of a stage within its pipeline graph, in declaration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(pub u32);

impl StageId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StageId({})", self.0)
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Lifecycle of a stage within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StageState {
    #[default]
    Created,
    /// `commit` succeeded
    Committed,
    Running,
    /// `run` returned or failed, and every port has been severed
    Terminated,
}

/// Selects the input port a read or peek applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Port {
    Number(usize),
    /// Whichever input stream has a record first, lowest number preferred
    Any,
}

impl From<usize> for Port {
    fn from(n: usize) -> Self {
        Port::Number(n)
    }
}

/// Behavior of a stage.
///
/// `commit` runs sequentially over all stages before any of them starts and
/// may reject the stage's position or stream wiring. `run` executes on the
/// stage's own thread. Returning `Err` with an end-of-file condition ends the
/// stage as quietly as returning `Ok`.
pub trait Stage: Send {
    fn commit(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        let _ = ctx;
        Ok(())
    }

    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError>;
}

type CommitFn = Box<dyn FnMut(&StageContext) -> Result<(), PipeError> + Send>;

/// A stage built from closures.
pub struct FnStage<F> {
    run: F,
    commit: Option<CommitFn>,
}

impl<F> FnStage<F>
where
    F: FnMut(&StageContext) -> Result<(), PipeError> + Send,
{
    pub fn new(run: F) -> Self {
        Self { run, commit: None }
    }

    /// Set the commit check.
    pub fn with_commit<C>(mut self, commit: C) -> Self
    where
        C: FnMut(&StageContext) -> Result<(), PipeError> + Send + 'static,
    {
        self.commit = Some(Box::new(commit));
        self
    }
}

impl<F> fmt::Debug for FnStage<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStage")
            .field("has_commit", &self.commit.is_some())
            .finish()
    }
}

impl<F> Stage for FnStage<F>
where
    F: FnMut(&StageContext) -> Result<(), PipeError> + Send,
{
    fn commit(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        match self.commit.as_mut() {
            Some(commit) => commit(ctx),
            None => Ok(()),
        }
    }

    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        (self.run)(ctx)
    }
}

/// Shorthand for `FnStage::new`.
pub fn stage_fn<F>(run: F) -> FnStage<F>
where
    F: FnMut(&StageContext) -> Result<(), PipeError> + Send,
{
    FnStage::new(run)
}

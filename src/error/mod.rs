//! Error types for building and running pipelines.
//!
//! This module provides:
//! - `StreamError`: Stream-protocol conditions seen by stage code
//! - `BuildError`: Problems in the pipeline specification, found before anything runs
//! - `PipeError`: Anything a stage or the engine can fail with
//! - `Phase`: Indicates where in a run an error occurred
//! - `StageError`: A single failure with its stage context
//! - `AggregateError`: Every failure of one run, reducible to a representative

use std::fmt;

use thiserror::Error;

use crate::stream::Side;

/// Conditions raised by the stream operations of a stage.
///
/// These are control-flow signals rather than application failures: a stage
/// usually ends its `run` by letting `EndOfFile` propagate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StreamError {
    /// The peer on the other end is not connected or has severed the stream
    #[error("end of file")]
    EndOfFile,

    /// The requested port does not exist on this stage
    #[error("{side} stream {port} out of range")]
    PortOutOfRange { side: Side, port: usize },
}

/// Errors detected while turning a specification into a stage graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    #[error("label already declared: {0}")]
    DuplicateLabel(String),

    #[error("label not declared: {0}")]
    UndeclaredLabel(String),

    #[error("stage not found: {0}")]
    UnknownStage(String),

    #[error("invalid arguments for stage '{stage}': {message}")]
    InvalidArguments { stage: String, message: String },

    /// A stage separator or end character with nothing in between
    #[error("null stage at position {position} of pipeline segment {segment}")]
    EmptyStage { segment: usize, position: usize },

    #[error("pipeline specification is empty")]
    EmptyPipeline,
}

/// Return codes used to rank errors. Lower codes win.
pub mod rc {
    pub const UNKNOWN_STAGE: i32 = 27;
    pub const DUPLICATE_LABEL: i32 = 40;
    pub const UNDECLARED_LABEL: i32 = 41;
    pub const EMPTY_STAGE: i32 = 42;
    pub const EMPTY_PIPELINE: i32 = 43;
    pub const INVALID_ARGUMENTS: i32 = 44;
    pub const NOT_FIRST_STAGE: i32 = 87;
    pub const PORT_OUT_OF_RANGE: i32 = 102;
    pub const UNEXPECTED_STREAM: i32 = 264;
    pub const MISSING_STREAM: i32 = 265;
}

impl BuildError {
    pub fn code(&self) -> i32 {
        match self {
            BuildError::UnknownStage(_) => rc::UNKNOWN_STAGE,
            BuildError::DuplicateLabel(_) => rc::DUPLICATE_LABEL,
            BuildError::UndeclaredLabel(_) => rc::UNDECLARED_LABEL,
            BuildError::EmptyStage { .. } => rc::EMPTY_STAGE,
            BuildError::EmptyPipeline => rc::EMPTY_PIPELINE,
            BuildError::InvalidArguments { .. } => rc::INVALID_ARGUMENTS,
        }
    }
}

/// Any error a stage or the engine can produce.
#[derive(Debug, Error)]
pub enum PipeError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Stream(#[from] StreamError),

    /// A failure reported by stage code, optionally ranked by `code`
    #[error("{message}")]
    Stage { code: Option<i32>, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("stage panicked: {0}")]
    Panicked(String),
}

impl PipeError {
    /// A ranked stage failure. Lower codes take precedence when a run reports
    /// several failures at once.
    pub fn coded(code: i32, message: impl Into<String>) -> Self {
        PipeError::Stage {
            code: Some(code),
            message: message.into(),
        }
    }

    /// An unranked stage failure.
    pub fn message(message: impl Into<String>) -> Self {
        PipeError::Stage {
            code: None,
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<i32> {
        match self {
            PipeError::Build(e) => Some(e.code()),
            PipeError::Stream(StreamError::PortOutOfRange { .. }) => Some(rc::PORT_OUT_OF_RANGE),
            PipeError::Stream(StreamError::EndOfFile) => None,
            PipeError::Stage { code, .. } => *code,
            PipeError::Io(_) | PipeError::Panicked(_) => None,
        }
    }

    /// True for the end-of-file signal a stage uses to stop quietly.
    pub fn is_end_of_file(&self) -> bool {
        matches!(self, PipeError::Stream(StreamError::EndOfFile))
    }
}

/// Where in the life of a pipeline an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Build,
    /// Sequential precondition checks before any stage thread starts
    Commit,
    Dispatch,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Build => write!(f, "Build"),
            Phase::Commit => write!(f, "Commit"),
            Phase::Dispatch => write!(f, "Dispatch"),
        }
    }
}

#[derive(Debug)]
pub struct StageError {
    /// Phase in which the error occurred
    pub phase: Phase,
    /// Declaration index of the failing stage, if the error belongs to one
    pub index: Option<usize>,
    /// Human readable stage identification, e.g. "fanout (stage 2)"
    pub stage: String,
    /// The underlying error
    pub error: PipeError,
}

impl StageError {
    pub fn build(error: BuildError) -> Self {
        Self {
            phase: Phase::Build,
            index: None,
            stage: "pipeline".to_string(),
            error: PipeError::Build(error),
        }
    }

    pub fn code(&self) -> Option<i32> {
        self.error.code()
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.phase, self.stage, self.error)
    }
}

impl std::error::Error for StageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// Every failure collected during one run of a pipeline.
///
/// Several stages commonly fail together once one of them severs a shared
/// stream; `representative` reduces them to one report that does not depend on
/// thread scheduling.
#[derive(Debug, Error)]
pub struct AggregateError {
    /// Collection of individual errors
    pub errors: Vec<StageError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "pipeline encountered {} error(s):", self.errors.len())?;
        for (i, e) in self.errors.iter().enumerate() {
            writeln!(f, "  #{}: {}", i + 1, e)?;
        }
        Ok(())
    }
}

impl AggregateError {
    /// Create a new aggregate error with a single error.
    pub fn single(error: StageError) -> Self {
        Self {
            errors: vec![error],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// The error to surface to the user.
    ///
    /// Among errors carrying a code the lowest code wins, ties going to the
    /// lowest stage index and then to collection order. Without any code, the
    /// first collected error is chosen.
    pub fn representative(&self) -> Option<&StageError> {
        self.representative_position().map(|pos| &self.errors[pos])
    }

    /// Consume the aggregate, keeping only its representative error.
    pub fn into_representative(mut self) -> Option<StageError> {
        let pos = self.representative_position()?;
        Some(self.errors.swap_remove(pos))
    }

    fn representative_position(&self) -> Option<usize> {
        self.errors
            .iter()
            .enumerate()
            .filter_map(|(pos, e)| {
                e.code()
                    .map(|code| (code, e.index.unwrap_or(usize::MAX), pos))
            })
            .min()
            .map(|(_, _, pos)| pos)
            .or_else(|| (!self.errors.is_empty()).then_some(0))
    }
}

impl From<StageError> for AggregateError {
    fn from(error: StageError) -> Self {
        Self::single(error)
    }
}

impl From<BuildError> for AggregateError {
    fn from(error: BuildError) -> Self {
        Self::single(StageError::build(error))
    }
}

#[cfg(feature = "miette")]
mod miette_impl;

#[cfg(feature = "miette")]
pub use miette_impl::*;

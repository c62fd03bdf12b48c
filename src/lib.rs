//! # stagepipe
//!
//! A record-oriented dataflow pipeline engine.
//!
//! ## Overview
//!
//! stagepipe provides:
//! - **Stages**: Independent units of computation, each running on its own thread
//! - **Streams**: Single-slot rendezvous edges with destructive `readto` and
//!   non-destructive `peekto`, plus "read from any input"
//! - **Topologies**: Branching and merging pipelines through labels
//! - **Specifications**: A textual front-end (`literal a | fanout | console`)
//!   backed by an explicit registry of stage factories
//! - **Error handling**: Commit-time validation before anything runs and a
//!   deterministic representative error when several stages fail together
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagepipe::{Pipe, builtin_registry};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = builtin_registry();
//!     let mut pipe = Pipe::from_spec("literal world | literal hello | console", &registry)?;
//!     pipe.run()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Writing a stage
//!
//! ```rust,ignore
//! use stagepipe::{PipeError, Stage, StageContext};
//!
//! struct Upper;
//!
//! impl Stage for Upper {
//!     fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
//!         loop {
//!             let record = ctx.peekto(0)?;
//!             ctx.output(record.to_uppercase())?;
//!             ctx.readto(0)?;
//!         }
//!     }
//! }
//!
//! let registry = stagepipe::builtin_registry().with_stage("upper", |_| Ok(Box::new(Upper)));
//! ```
//!
//! ## Features
//!
//! - `yaml` - Load `PipeConfig` from YAML (enabled by default)
//! - `json` - Load `PipeConfig` from JSON
//! - `miette` - Pretty error reporting with miette
//! - `cli` - The `stagepipe` command line tool
//!
//! ## Stream semantics
//!
//! - A stream carries at most one record. `output` returns once the consumer
//!   has the record: immediately if the consumer was already blocked in
//!   `readto`, otherwise when a `readto` takes it. A `peekto` alone never
//!   releases the producer.
//! - Records on one stream arrive in the order they were written.
//! - Severing a stream is the only end-of-stream signal, in both directions.
//!   Operations on a severed stream fail with end of file at once. The one
//!   exception: a record the producer handed to a waiting reader just before
//!   severing can still be read, after which the stream reports end of file.
//! - When a stage's `run` returns, for any reason, all of its streams are
//!   severed, so shutdown spreads to its neighbours.

// Core modules
pub mod builder;
pub mod config;
pub mod error;
pub mod graph;
pub mod pipe;
pub mod record;
pub mod registry;
pub mod stage;
pub mod stages;
pub mod stream;

#[cfg(feature = "cli")]
pub mod cli;

// Re-exports for convenience
pub use builder::{Node, PipeBuilder};
pub use config::{PipeConfig, SpecSyntax, SpecToken, parse_spec};
pub use error::{AggregateError, BuildError, Phase, PipeError, StageError, StreamError};
pub use graph::{LabelBinding, PipelineGraph, StageEntry};
pub use pipe::Pipe;
pub use record::Record;
pub use registry::{StageArgs, StageFactory, StageRegistry};
pub use stage::{FnStage, Port, Stage, StageContext, StageId, StageState, stage_fn};
pub use stages::builtin_registry;
pub use stream::{Endpoint, PortStatus, Side, Stream, StreamId, StreamState};

#[cfg(feature = "miette")]
pub use error::StageDiagnostic;

/// Build and run `text` with the builtin stages, returning the representative
/// error if the run fails.
pub fn run_spec(text: &str) -> Result<(), StageError> {
    run_spec_with(text, &stages::builtin_registry())
}

/// Build and run `text` with the given registry.
pub fn run_spec_with(text: &str, registry: &StageRegistry) -> Result<(), StageError> {
    let mut pipe = Pipe::from_spec(text, registry).map_err(StageError::build)?;
    pipe.run().map_err(representative)
}

/// Build and run a pipeline from a configuration.
pub fn run_config(config: &PipeConfig, registry: &StageRegistry) -> Result<(), StageError> {
    let mut pipe = Pipe::from_config(config, registry).map_err(StageError::build)?;
    pipe.run().map_err(representative)
}

fn representative(agg: AggregateError) -> StageError {
    let fallback = || StageError {
        phase: Phase::Dispatch,
        index: None,
        stage: "pipeline".to_string(),
        error: PipeError::message("pipeline failed without an error report"),
    };
    agg.into_representative().unwrap_or_else(fallback)
}

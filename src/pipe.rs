//! Pipeline runner: commit phase, concurrent dispatch and error aggregation.

use std::any::Any;
use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;

use crate::builder::PipeBuilder;
use crate::config::{PipeConfig, SpecSyntax};
use crate::error::{AggregateError, BuildError, Phase, PipeError, StageError};
use crate::graph::{PipelineGraph, StageEntry};
use crate::registry::StageRegistry;
use crate::stage::{StageContext, StageState};
use crate::stream::{Side, Stream};

/// A built pipeline, ready to run.
#[derive(Debug)]
pub struct Pipe {
    graph: PipelineGraph,
}

impl Pipe {
    pub fn new(graph: PipelineGraph) -> Self {
        Self { graph }
    }

    /// Parse and build `text` with the default syntax.
    pub fn from_spec(text: &str, registry: &StageRegistry) -> Result<Self, BuildError> {
        Self::from_spec_with(text, SpecSyntax::default(), registry)
    }

    pub fn from_spec_with(
        text: &str,
        syntax: SpecSyntax,
        registry: &StageRegistry,
    ) -> Result<Self, BuildError> {
        let graph = PipeBuilder::from_spec(text, syntax, registry)?.build()?;
        Ok(Self::new(graph))
    }

    pub fn from_config(config: &PipeConfig, registry: &StageRegistry) -> Result<Self, BuildError> {
        Self::from_spec_with(&config.pipeline, config.syntax(), registry)
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn stage_states(&self) -> Vec<StageState> {
        self.graph.stages().iter().map(StageEntry::state).collect()
    }

    /// Commit every stage, then run them all concurrently.
    ///
    /// Any commit failure stops the run before a single stage starts. During
    /// dispatch every failure is collected; end-of-file is not a failure.
    pub fn run(&mut self) -> Result<(), AggregateError> {
        let errors = self.commit_all();
        if !errors.is_empty() {
            tracing::info!(failed = errors.len(), "commit phase failed, pipeline not started");
            return Err(AggregateError { errors });
        }

        let errors = self.dispatch_all();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregateError { errors })
        }
    }

    fn commit_all(&mut self) -> Vec<StageError> {
        let stages = self.graph.stages_mut();
        tracing::info!(stages = stages.len(), "commit phase");

        let mut errors = Vec::new();
        for (index, entry) in stages.iter_mut().enumerate() {
            match entry.behavior.commit(&entry.ctx) {
                Ok(()) => entry.state = StageState::Committed,
                Err(error) => {
                    tracing::warn!(stage = %entry.ctx.describe(), %error, "commit failed");
                    errors.push(stage_error(Phase::Commit, index, &entry.ctx, error));
                }
            }
        }
        errors
    }

    fn dispatch_all(&mut self) -> Vec<StageError> {
        let stages = self.graph.stages_mut();
        tracing::info!(stages = stages.len(), "dispatch phase");

        let errors = Mutex::new(Vec::new());
        thread::scope(|scope| {
            let mut workers = Vec::with_capacity(stages.len());
            for (index, entry) in stages.iter_mut().enumerate() {
                let describe = entry.ctx.describe();
                let errors = &errors;
                // Owned by the worker closure, so a closure that never runs
                // still severs the stage's ports when it is dropped.
                let cleanup = SeverOnDrop::new(&entry.ctx);
                entry.state = StageState::Running;
                let spawned = thread::Builder::new()
                    .name(format!("stage-{}-{}", index, entry.ctx.name()))
                    .spawn_scoped(scope, move || {
                        if let Err(error) = dispatch(entry, cleanup) {
                            tracing::warn!(stage = %entry.ctx.describe(), %error, "stage failed");
                            errors
                                .lock()
                                .push(stage_error(Phase::Dispatch, index, &entry.ctx, error));
                        }
                        entry.state = StageState::Terminated;
                    });
                match spawned {
                    Ok(handle) => workers.push((index, describe, handle)),
                    Err(e) => {
                        tracing::warn!(stage = %describe, error = %e, "stage thread not started");
                        errors.lock().push(StageError {
                            phase: Phase::Dispatch,
                            index: Some(index),
                            stage: describe,
                            error: PipeError::Io(e),
                        });
                    }
                }
            }

            for (index, describe, handle) in workers {
                if let Err(payload) = handle.join() {
                    let error = PipeError::Panicked(panic_message(payload.as_ref()));
                    tracing::warn!(stage = %describe, %error, "stage panicked");
                    errors.lock().push(StageError {
                        phase: Phase::Dispatch,
                        index: Some(index),
                        stage: describe,
                        error,
                    });
                }
            }
        });

        // A stage that panicked, or could not be spawned, never got to mark
        // itself terminated.
        for entry in self.graph.stages_mut() {
            if entry.state == StageState::Running {
                entry.ctx.sever_all();
                entry.state = StageState::Terminated;
            }
        }

        let errors = errors.into_inner();
        tracing::info!(failed = errors.len(), "dispatch phase finished");
        errors
    }
}

/// Severs every port of a stage when dropped, including during unwinding.
pub(crate) struct SeverOnDrop {
    inputs: Vec<Arc<Stream>>,
    outputs: Vec<Arc<Stream>>,
}

impl SeverOnDrop {
    pub(crate) fn new(ctx: &StageContext) -> Self {
        Self {
            inputs: ctx.inputs().to_vec(),
            outputs: ctx.outputs().to_vec(),
        }
    }
}

impl Drop for SeverOnDrop {
    fn drop(&mut self) {
        for stream in &self.inputs {
            stream.sever(Side::Input);
        }
        for stream in &self.outputs {
            stream.sever(Side::Output);
        }
    }
}

/// Run one stage; its ports are severed when `cleanup` drops on the way out.
fn dispatch(entry: &mut StageEntry, cleanup: SeverOnDrop) -> Result<(), PipeError> {
    let _cleanup = cleanup;
    tracing::debug!(stage = %entry.ctx.describe(), "stage started");
    let outcome = match entry.behavior.run(&entry.ctx) {
        Err(error) if error.is_end_of_file() => {
            tracing::debug!(stage = %entry.ctx.describe(), "stage ended at end of file");
            Ok(())
        }
        other => other,
    };
    tracing::debug!(stage = %entry.ctx.describe(), ok = outcome.is_ok(), "stage finished");
    outcome
}

fn stage_error(phase: Phase, index: usize, ctx: &StageContext, error: PipeError) -> StageError {
    StageError {
        phase,
        index: Some(index),
        stage: ctx.describe(),
        error,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

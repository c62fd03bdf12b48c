//! The finished stage and stream graph produced by a builder.

use std::fmt;
use std::sync::Arc;

use crate::stage::{Stage, StageContext, StageId, StageState};
use crate::stream::Stream;

/// A stage instance with its ports and lifecycle state.
pub struct StageEntry {
    pub(crate) behavior: Box<dyn Stage>,
    pub(crate) ctx: StageContext,
    pub(crate) state: StageState,
}

impl StageEntry {
    pub fn context(&self) -> &StageContext {
        &self.ctx
    }

    pub fn id(&self) -> StageId {
        self.ctx.id()
    }

    pub fn name(&self) -> &str {
        self.ctx.name()
    }

    pub fn state(&self) -> StageState {
        self.state
    }
}

impl fmt::Debug for StageEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StageEntry")
            .field("id", &self.ctx.id())
            .field("name", &self.ctx.name())
            .field("number", &self.ctx.stage_number())
            .field("inputs", &self.ctx.input_count())
            .field("outputs", &self.ctx.output_count())
            .field("state", &self.state)
            .finish()
    }
}

/// A label and the stage it was declared on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelBinding {
    pub name: String,
    pub stage: StageId,
    /// How many times the label was referenced after its declaration
    pub references: usize,
}

/// Stages in declaration order plus every stream connecting them.
#[derive(Debug)]
pub struct PipelineGraph {
    stages: Vec<StageEntry>,
    streams: Vec<Arc<Stream>>,
    labels: Vec<LabelBinding>,
}

impl PipelineGraph {
    pub(crate) fn new(
        stages: Vec<StageEntry>,
        streams: Vec<Arc<Stream>>,
        labels: Vec<LabelBinding>,
    ) -> Self {
        Self {
            stages,
            streams,
            labels,
        }
    }

    pub fn stages(&self) -> &[StageEntry] {
        &self.stages
    }

    pub(crate) fn stages_mut(&mut self) -> &mut [StageEntry] {
        &mut self.stages
    }

    pub fn stage(&self, id: StageId) -> Option<&StageEntry> {
        self.stages.get(id.index())
    }

    /// Every stream, including those with an unconnected end.
    pub fn streams(&self) -> &[Arc<Stream>] {
        &self.streams
    }

    /// Streams with both a producer and a consumer.
    pub fn connected_streams(&self) -> impl Iterator<Item = &Arc<Stream>> {
        self.streams.iter().filter(|s| s.is_connected())
    }

    pub fn labels(&self) -> &[LabelBinding] {
        &self.labels
    }

    pub fn label(&self, name: &str) -> Option<&LabelBinding> {
        self.labels.iter().find(|l| l.name == name)
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }
}

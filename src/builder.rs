//! Builder turning an ordered node list into a `PipelineGraph`.
//!
//! Each stage or label reference is connected to the node before it in the
//! same segment: the previous node's free output port feeds a new input port on
//! this node. Every appearance of a stage also reserves one more output port,
//! still unconnected, which the next node (if any) attaches to. An `End` node
//! starts a new segment and resets stage numbering.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::config::{SpecSyntax, SpecToken, parse_spec};
use crate::error::BuildError;
use crate::graph::{LabelBinding, PipelineGraph, StageEntry};
use crate::registry::StageRegistry;
use crate::stage::{Stage, StageContext, StageId, StageState};
use crate::stream::{Endpoint, Stream, StreamId, StreamLock};

/// One element of a pipeline description.
pub enum Node {
    /// A stage declaration, optionally bound to a label
    Stage {
        name: String,
        label: Option<String>,
        stage: Box<dyn Stage>,
    },
    /// Another connection to the stage declared under this label
    LabelRef(String),
    /// End of a pipeline segment
    End,
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Stage { name, label, .. } => f
                .debug_struct("Stage")
                .field("name", name)
                .field("label", label)
                .finish(),
            Node::LabelRef(label) => f.debug_tuple("LabelRef").field(label).finish(),
            Node::End => f.write_str("End"),
        }
    }
}

#[derive(Debug, Default)]
pub struct PipeBuilder {
    nodes: Vec<Node>,
}

impl PipeBuilder {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Build the node list from specification text, creating stages through
    /// `registry`.
    pub fn from_spec(
        text: &str,
        syntax: SpecSyntax,
        registry: &StageRegistry,
    ) -> Result<Self, BuildError> {
        Self::from_tokens(parse_spec(text, syntax)?, registry)
    }

    pub fn from_tokens(
        tokens: Vec<SpecToken>,
        registry: &StageRegistry,
    ) -> Result<Self, BuildError> {
        let mut builder = Self::new();
        for token in tokens {
            let node = match token {
                SpecToken::Stage { label, args } => Node::Stage {
                    stage: registry.create(&args)?,
                    name: args.name,
                    label,
                },
                SpecToken::LabelRef(label) => Node::LabelRef(label),
                SpecToken::End => Node::End,
            };
            builder.nodes.push(node);
        }
        Ok(builder)
    }

    pub fn add_stage(self, name: impl Into<String>, stage: impl Stage + 'static) -> Self {
        self.node(Node::Stage {
            name: name.into(),
            label: None,
            stage: Box::new(stage),
        })
    }

    pub fn add_labeled_stage(
        self,
        label: impl Into<String>,
        name: impl Into<String>,
        stage: impl Stage + 'static,
    ) -> Self {
        self.node(Node::Stage {
            name: name.into(),
            label: Some(label.into()),
            stage: Box::new(stage),
        })
    }

    pub fn label_ref(self, label: impl Into<String>) -> Self {
        self.node(Node::LabelRef(label.into()))
    }

    pub fn end(self) -> Self {
        self.node(Node::End)
    }

    pub fn node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn build(self) -> Result<PipelineGraph, BuildError> {
        let mut drafts: Vec<Draft> = Vec::new();
        let mut edges: Vec<DraftEdge> = Vec::new();
        let mut labels: Vec<LabelBinding> = Vec::new();
        let mut label_index: HashMap<String, usize> = HashMap::new();

        let mut number = 0usize;
        let mut previous: Option<usize> = None;

        for node in self.nodes {
            let current = match node {
                Node::End => {
                    number = 0;
                    previous = None;
                    continue;
                }
                Node::Stage { name, label, stage } => {
                    number += 1;
                    let index = drafts.len();
                    if let Some(label) = &label {
                        if label_index.contains_key(label) {
                            return Err(BuildError::DuplicateLabel(label.clone()));
                        }
                        label_index.insert(label.clone(), labels.len());
                        labels.push(LabelBinding {
                            name: label.clone(),
                            stage: stage_id(index),
                            references: 0,
                        });
                    }
                    tracing::debug!(stage = %name, number, label = ?label, "stage declared");
                    drafts.push(Draft {
                        name,
                        label,
                        number,
                        behavior: stage,
                        inputs: Vec::new(),
                        outputs: Vec::new(),
                        open_output: None,
                    });
                    index
                }
                Node::LabelRef(label) => {
                    number += 1;
                    let binding = label_index
                        .get(&label)
                        .map(|&i| &mut labels[i])
                        .ok_or_else(|| BuildError::UndeclaredLabel(label.clone()))?;
                    binding.references += 1;
                    tracing::debug!(label = %label, references = binding.references, "label referenced");
                    binding.stage.index()
                }
            };

            let consumer = Endpoint {
                stage: stage_id(current),
                port: drafts[current].inputs.len(),
            };
            let incoming = match previous.and_then(|p| drafts[p].open_output.take()) {
                Some(edge) => {
                    edges[edge].consumer = Some(consumer);
                    edge
                }
                None => {
                    edges.push(DraftEdge {
                        producer: None,
                        consumer: Some(consumer),
                    });
                    edges.len() - 1
                }
            };
            tracing::trace!(stream = incoming, stage = current, port = consumer.port, "input wired");
            drafts[current].inputs.push(incoming);

            let producer = Endpoint {
                stage: stage_id(current),
                port: drafts[current].outputs.len(),
            };
            edges.push(DraftEdge {
                producer: Some(producer),
                consumer: None,
            });
            let reserved = edges.len() - 1;
            drafts[current].outputs.push(reserved);
            drafts[current].open_output = Some(reserved);

            previous = Some(current);
        }

        Ok(finish(drafts, edges, labels))
    }
}

struct Draft {
    name: String,
    label: Option<String>,
    number: usize,
    behavior: Box<dyn Stage>,
    inputs: Vec<usize>,
    outputs: Vec<usize>,
    /// Reserved output port the next node in the segment will attach to
    open_output: Option<usize>,
}

struct DraftEdge {
    producer: Option<Endpoint>,
    consumer: Option<Endpoint>,
}

fn stage_id(index: usize) -> StageId {
    StageId(index as u32)
}

/// Allocate locks and streams for the drafted topology.
fn finish(drafts: Vec<Draft>, edges: Vec<DraftEdge>, labels: Vec<LabelBinding>) -> PipelineGraph {
    let locks: Vec<Arc<StreamLock>> = drafts
        .iter()
        .map(|d| {
            let connected: Vec<bool> = d
                .inputs
                .iter()
                .map(|&e| edges[e].producer.is_some())
                .collect();
            Arc::new(StreamLock::new(&connected))
        })
        .collect();

    let streams: Vec<Arc<Stream>> = edges
        .iter()
        .enumerate()
        .map(|(i, edge)| {
            let (lock, lane) = match edge.consumer {
                Some(c) => (Arc::clone(&locks[c.stage.index()]), c.port),
                None => (Arc::new(StreamLock::new(&[false])), 0),
            };
            Arc::new(Stream::new(
                StreamId(i as u32),
                edge.producer,
                edge.consumer,
                lock,
                lane,
            ))
        })
        .collect();

    let stages = drafts
        .into_iter()
        .zip(locks)
        .enumerate()
        .map(|(index, (draft, lock))| {
            let inputs = draft.inputs.iter().map(|&e| Arc::clone(&streams[e])).collect();
            let outputs = draft.outputs.iter().map(|&e| Arc::clone(&streams[e])).collect();
            StageEntry {
                behavior: draft.behavior,
                ctx: StageContext::new(
                    stage_id(index),
                    draft.name,
                    draft.label,
                    draft.number,
                    inputs,
                    outputs,
                    lock,
                ),
                state: StageState::Created,
            }
        })
        .collect();

    PipelineGraph::new(stages, streams, labels)
}

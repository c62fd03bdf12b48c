//! The port API a stage uses while committing and running.

use std::sync::Arc;

use crate::error::{PipeError, StreamError, rc};
use crate::record::Record;
use crate::stream::{PortStatus, Side, Stream, StreamLock};

use super::{Port, StageId};

/// Ports and identity of one stage, as seen by its behavior.
///
/// Input port `n` is lane `n` of `input_lock`, which is what lets
/// `Port::Any` wait on every input at once.
#[derive(Debug)]
pub struct StageContext {
    id: StageId,
    name: String,
    label: Option<String>,
    number: usize,
    inputs: Vec<Arc<Stream>>,
    outputs: Vec<Arc<Stream>>,
    input_lock: Arc<StreamLock>,
}

impl StageContext {
    pub(crate) fn new(
        id: StageId,
        name: String,
        label: Option<String>,
        number: usize,
        inputs: Vec<Arc<Stream>>,
        outputs: Vec<Arc<Stream>>,
        input_lock: Arc<StreamLock>,
    ) -> Self {
        Self {
            id,
            name,
            label,
            number,
            inputs,
            outputs,
            input_lock,
        }
    }

    pub fn id(&self) -> StageId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// 1-based position of the stage within the pipeline segment that
    /// declared it.
    pub fn stage_number(&self) -> usize {
        self.number
    }

    pub fn is_first(&self) -> bool {
        self.number == 1
    }

    pub fn input_count(&self) -> usize {
        self.inputs.len()
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn inputs(&self) -> &[Arc<Stream>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[Arc<Stream>] {
        &self.outputs
    }

    /// "name (stage n)" for messages and logs.
    pub fn describe(&self) -> String {
        format!("{} (stage {})", self.name, self.number)
    }

    fn stream(&self, side: Side, port: usize) -> Result<&Arc<Stream>, StreamError> {
        let streams = match side {
            Side::Input => &self.inputs,
            Side::Output => &self.outputs,
        };
        streams
            .get(port)
            .ok_or(StreamError::PortOutOfRange { side, port })
    }

    /// Write a record to the primary output.
    pub fn output(&self, record: impl Into<Record>) -> Result<(), StreamError> {
        self.output_to(0, record)
    }

    /// Write a record to output `port`, blocking until the consumer takes it.
    pub fn output_to(&self, port: usize, record: impl Into<Record>) -> Result<(), StreamError> {
        let stream = self.stream(Side::Output, port)?;
        if stream.consumer().is_none() {
            return Err(StreamError::EndOfFile);
        }
        stream
            .output(record.into())
            .map_err(|_| StreamError::EndOfFile)
    }

    /// Look at the next record on an input without consuming it.
    pub fn peekto(&self, port: impl Into<Port>) -> Result<Record, StreamError> {
        match port.into() {
            Port::Any => self.peekto_any().map(|(_, record)| record),
            Port::Number(n) => {
                let stream = self.input(n)?;
                stream.peek().map_err(|_| StreamError::EndOfFile)
            }
        }
    }

    /// Consume the next record on an input.
    pub fn readto(&self, port: impl Into<Port>) -> Result<Record, StreamError> {
        match port.into() {
            Port::Any => self.readto_any().map(|(_, record)| record),
            Port::Number(n) => {
                let stream = self.input(n)?;
                stream.read().map_err(|_| StreamError::EndOfFile)
            }
        }
    }

    /// Peek at whichever input has a record, returning its port number too.
    /// End of file once every input is severed.
    pub fn peekto_any(&self) -> Result<(usize, Record), StreamError> {
        self.input_lock
            .peek_any()
            .map_err(|_| StreamError::EndOfFile)
    }

    /// Read from whichever input has a record. Directly after `peekto_any`
    /// this consumes the record that was peeked.
    pub fn readto_any(&self) -> Result<(usize, Record), StreamError> {
        self.input_lock
            .read_any()
            .map_err(|_| StreamError::EndOfFile)
    }

    fn input(&self, port: usize) -> Result<&Arc<Stream>, StreamError> {
        let stream = self.stream(Side::Input, port)?;
        if stream.producer().is_none() {
            return Err(StreamError::EndOfFile);
        }
        Ok(stream)
    }

    /// Close one port. The peer sees end of file.
    pub fn sever(&self, side: Side, port: usize) -> Result<(), StreamError> {
        self.stream(side, port)?.sever(side);
        Ok(())
    }

    pub fn stream_state(&self, side: Side, port: usize) -> PortStatus {
        match self.stream(side, port) {
            Ok(stream) => stream.status(side),
            Err(_) => PortStatus::NotDefined,
        }
    }

    pub fn is_connected(&self, side: Side, port: usize) -> bool {
        !matches!(
            self.stream_state(side, port),
            PortStatus::NotConnected | PortStatus::NotDefined
        )
    }

    pub(crate) fn sever_all(&self) {
        for stream in &self.inputs {
            stream.sever(Side::Input);
        }
        for stream in &self.outputs {
            stream.sever(Side::Output);
        }
    }

    /// Commit check: the stage must be the first in its pipeline segment.
    pub fn require_first(&self) -> Result<(), PipeError> {
        if self.is_first() {
            Ok(())
        } else {
            Err(PipeError::coded(
                rc::NOT_FIRST_STAGE,
                format!("{} must be the first stage of a pipeline", self.describe()),
            ))
        }
    }

    /// Commit check: no input other than the primary one may be connected.
    pub fn require_only_primary_input(&self) -> Result<(), PipeError> {
        match (1..self.inputs.len()).find(|&port| self.is_connected(Side::Input, port)) {
            None => Ok(()),
            Some(port) => Err(PipeError::coded(
                rc::UNEXPECTED_STREAM,
                format!("{}: input stream {} must not be connected", self.describe(), port),
            )),
        }
    }

    /// Commit check: the given port must be connected.
    pub fn require_connected(&self, side: Side, port: usize) -> Result<(), PipeError> {
        if self.is_connected(side, port) {
            Ok(())
        } else {
            Err(PipeError::coded(
                rc::MISSING_STREAM,
                format!("{}: {} stream {} is not connected", self.describe(), side, port),
            ))
        }
    }
}

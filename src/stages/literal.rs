//! `literal`: write one record, then pass the primary input through.

use crate::error::PipeError;
use crate::stage::{Stage, StageContext};

#[derive(Debug, Clone)]
pub struct Literal {
    text: String,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Stage for Literal {
    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        ctx.output(self.text.as_str())?;
        // Peek, write, then read: the record stays on the input until the
        // consumer downstream has taken the copy.
        loop {
            let record = ctx.peekto(0)?;
            ctx.output(record)?;
            ctx.readto(0)?;
        }
    }
}

//! `faninany`: copy records from whichever input has one to the primary output.

use crate::error::PipeError;
use crate::stage::{Stage, StageContext};
use crate::stream::Side;

#[derive(Debug, Clone, Default)]
pub struct FaninAny;

impl Stage for FaninAny {
    fn commit(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        ctx.require_connected(Side::Output, 0)
    }

    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        loop {
            let (_, record) = ctx.peekto_any()?;
            ctx.output(record)?;
            ctx.readto_any()?;
        }
    }
}

//! `hole`: consume and discard every input record.

use crate::error::PipeError;
use crate::stage::{Port, Stage, StageContext};

#[derive(Debug, Clone, Default)]
pub struct Hole;

impl Stage for Hole {
    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        loop {
            ctx.readto(Port::Any)?;
        }
    }
}

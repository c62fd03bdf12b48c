//! `fanout`: copy each primary input record to every connected output.

use crate::error::{PipeError, StreamError};
use crate::stage::{Stage, StageContext};
use crate::stream::Side;

#[derive(Debug, Clone, Default)]
pub struct Fanout;

impl Stage for Fanout {
    fn commit(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        ctx.require_only_primary_input()
    }

    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        loop {
            let record = ctx.peekto(0)?;
            let mut delivered = false;
            for port in 0..ctx.output_count() {
                if !ctx.is_connected(Side::Output, port) {
                    continue;
                }
                match ctx.output_to(port, record.clone()) {
                    Ok(()) => delivered = true,
                    // That consumer is gone; keep feeding the others.
                    Err(StreamError::EndOfFile) => {}
                    Err(e) => return Err(e.into()),
                }
            }
            if !delivered {
                tracing::debug!(stage = %ctx.describe(), "no connected outputs left");
                return Ok(());
            }
            ctx.readto(0)?;
        }
    }
}

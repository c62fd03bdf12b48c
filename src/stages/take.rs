//! `take [n|*]`: pass the first `n` records (default 1) to the primary output.
//!
//! The remaining records go to the secondary output when it is connected;
//! otherwise the input is severed.

use crate::error::PipeError;
use crate::registry::StageArgs;
use crate::stage::{Stage, StageContext};
use crate::stream::Side;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Take {
    /// `None` takes everything
    count: Option<u64>,
}

impl Take {
    pub fn new(count: u64) -> Self {
        Self { count: Some(count) }
    }

    pub fn all() -> Self {
        Self { count: None }
    }

    pub fn from_args(args: &StageArgs) -> Result<Self, PipeError> {
        let mut words = args.words();
        let take = match words.next() {
            None => Self::new(1),
            Some("*") => Self::all(),
            Some(word) => word
                .parse::<u64>()
                .map(Self::new)
                .map_err(|_| args.invalid(format!("not a record count: {word}")))?,
        };
        if let Some(extra) = words.next() {
            return Err(args.invalid(format!("excessive operand: {extra}")));
        }
        Ok(take)
    }

    fn pass(ctx: &StageContext, port: usize) -> Result<(), PipeError> {
        let record = ctx.peekto(0)?;
        ctx.output_to(port, record)?;
        ctx.readto(0)?;
        Ok(())
    }
}

impl Stage for Take {
    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        let mut taken = 0u64;
        while self.count.is_none_or(|limit| taken < limit) {
            Self::pass(ctx, 0)?;
            taken += 1;
        }
        ctx.sever(Side::Output, 0)?;

        if ctx.is_connected(Side::Output, 1) {
            loop {
                Self::pass(ctx, 1)?;
            }
        }
        ctx.sever(Side::Input, 0)?;
        Ok(())
    }
}

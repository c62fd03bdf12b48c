//! `console`: write input records to standard output, one per line.

use std::fmt;
use std::io::{self, Write};

use crate::error::PipeError;
use crate::stage::{Stage, StageContext};
use crate::stream::Side;

pub struct Console {
    writer: Box<dyn Write + Send>,
}

impl Console {
    pub fn stdout() -> Self {
        Self::with_writer(io::stdout())
    }

    pub fn with_writer(writer: impl Write + Send + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }
}

impl fmt::Debug for Console {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Stage for Console {
    fn run(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        let result = self.copy(ctx);
        self.writer.flush()?;
        result
    }
}

impl Console {
    fn copy(&mut self, ctx: &StageContext) -> Result<(), PipeError> {
        loop {
            let record = ctx.peekto(0)?;
            writeln!(self.writer, "{record}")?;
            if ctx.is_connected(Side::Output, 0) {
                ctx.output(record)?;
            }
            ctx.readto(0)?;
        }
    }
}

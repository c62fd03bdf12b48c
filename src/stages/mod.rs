//! Builtin stages.
//!
//! - `literal <text>`: Write `<text>`, then copy the primary input
//! - `console`: Copy input records to standard output
//! - `hole`: Discard all input
//! - `take [n|*]`: Pass the first `n` records
//! - `fanout`: Copy the primary input to every connected output
//! - `faninany`: Merge all inputs onto the primary output

mod console;
mod fanout;
mod faninany;
mod hole;
mod literal;
mod take;

pub use console::Console;
pub use fanout::Fanout;
pub use faninany::FaninAny;
pub use hole::Hole;
pub use literal::Literal;
pub use take::Take;

use crate::registry::{StageArgs, StageRegistry};

fn no_operands(args: &StageArgs) -> Result<(), crate::error::PipeError> {
    if args.has_operands() {
        Err(args.invalid(format!("excessive operands: {}", args.operands)))
    } else {
        Ok(())
    }
}

/// Create a registry holding every builtin stage.
pub fn builtin_registry() -> StageRegistry {
    let mut registry = StageRegistry::new();

    registry.register("literal", |args| Ok(Box::new(Literal::new(args.operands.clone()))));
    registry.register("console", |args| {
        no_operands(args)?;
        Ok(Box::new(Console::stdout()))
    });
    registry.register("hole", |args| {
        no_operands(args)?;
        Ok(Box::new(Hole))
    });
    registry.register("take", |args| Ok(Box::new(Take::from_args(args)?)));
    registry.register("fanout", |args| {
        no_operands(args)?;
        Ok(Box::new(Fanout))
    });
    registry.register("faninany", |args| {
        no_operands(args)?;
        Ok(Box::new(FaninAny))
    });

    registry
}

use std::convert::Infallible;

use sarge::ArgumentType;

use crate::cli::SpecArg;

impl ArgumentType for SpecArg {
    type Error = Infallible;

    fn from_value(val: Option<&str>) -> sarge::ArgResult<Self> {
        let raw = val?.trim();
        if raw.is_empty() {
            return None;
        }
        // Preserve the '@' prefix so the caller can tell files from text.
        Some(Ok(SpecArg(raw.to_string())))
    }

    fn default_value() -> Option<Self> {
        None
    }
}

//! Configuration and specification front-end.
//!
//! This module provides:
//! - `SpecSyntax`, `SpecToken`, `parse_spec`: Tokenizer for pipeline specification text
//! - `PipeConfig`: Run configuration loaded from YAML/JSON

mod pipeline;
mod spec;

pub use pipeline::PipeConfig;
pub use spec::{SpecSyntax, SpecToken, parse_spec};

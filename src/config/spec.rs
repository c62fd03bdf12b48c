//! Tokenizer for textual pipeline specifications.
//!
//! ```text
//! literal hello | a: fanout | console ? a: | hole
//! ```
//!
//! Stages are separated by the stage separator (`|`), pipeline segments by the
//! end character (`?`). A first word ending in `:` is a label: alone it
//! references a stage declared earlier, followed by a stage it declares one.

use crate::error::BuildError;
use crate::registry::StageArgs;

/// Characters that structure a specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecSyntax {
    pub stage_separator: char,
    pub end_char: char,
}

impl Default for SpecSyntax {
    fn default() -> Self {
        Self {
            stage_separator: '|',
            end_char: '?',
        }
    }
}

impl SpecSyntax {
    pub fn with_stage_separator(mut self, c: char) -> Self {
        self.stage_separator = c;
        self
    }

    pub fn with_end_char(mut self, c: char) -> Self {
        self.end_char = c;
        self
    }
}

/// One element of a tokenized specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecToken {
    /// A stage declaration, optionally labelled
    Stage {
        label: Option<String>,
        args: StageArgs,
    },
    /// A reference to a previously declared label
    LabelRef(String),
    /// Boundary between pipeline segments
    End,
}

/// Split `text` into stage, label and end tokens.
pub fn parse_spec(text: &str, syntax: SpecSyntax) -> Result<Vec<SpecToken>, BuildError> {
    if text.trim().is_empty() {
        return Err(BuildError::EmptyPipeline);
    }

    let mut tokens = Vec::new();
    for (segment, segment_text) in text.split(syntax.end_char).enumerate() {
        if segment > 0 {
            tokens.push(SpecToken::End);
        }
        for (position, stage_text) in segment_text.split(syntax.stage_separator).enumerate() {
            let stage_text = stage_text.trim();
            if stage_text.is_empty() {
                return Err(BuildError::EmptyStage {
                    segment: segment + 1,
                    position: position + 1,
                });
            }
            tokens.push(parse_stage(stage_text));
        }
    }
    Ok(tokens)
}

fn split_first_word(text: &str) -> (&str, &str) {
    match text.find(char::is_whitespace) {
        Some(pos) => (&text[..pos], text[pos..].trim()),
        None => (text, ""),
    }
}

fn parse_stage(text: &str) -> SpecToken {
    let (first, rest) = split_first_word(text);

    // "a:" or "a:stage operands"
    if let Some(colon) = first.find(':').filter(|&i| i > 0) {
        let label = first[..colon].to_string();
        let after = first[colon + 1..].trim();
        let remainder = match (after.is_empty(), rest.is_empty()) {
            (true, _) => rest.to_string(),
            (false, true) => after.to_string(),
            (false, false) => format!("{after} {rest}"),
        };
        if remainder.is_empty() {
            return SpecToken::LabelRef(label);
        }
        let (name, operands) = split_first_word(&remainder);
        return SpecToken::Stage {
            label: Some(label),
            args: StageArgs::new(name, operands),
        };
    }

    SpecToken::Stage {
        label: None,
        args: StageArgs::new(first, rest),
    }
}

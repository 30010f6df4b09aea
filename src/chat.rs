//! Interactive question loop used by `pdfrag-chat`.
//!
//! The loop is written against `BufRead`/`Write` so it can be driven from
//! tests with in-memory buffers.

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::error::PipelineError;

/// Prompt printed before reading each question.
pub const PROMPT: &str = "Ask your question: ";
/// Message printed when the user submits an empty line.
pub const EMPTY_INPUT_MESSAGE: &str = "Please enter a valid question.";
const SEPARATOR_WIDTH: usize = 50;

/// Interpretation of one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatCommand<'a> {
    Exit,
    Empty,
    Question(&'a str),
}

impl<'a> ChatCommand<'a> {
    pub fn parse(line: &'a str) -> Self {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            Self::Empty
        } else if trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit") {
            Self::Exit
        } else {
            Self::Question(trimmed)
        }
    }
}

/// Counters reported when the loop ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatSummary {
    pub answered: usize,
    pub failed: usize,
}

/// Reads questions until `exit`, `quit` or end of input.
///
/// `answer` is called once per non-empty question. Its failures are printed
/// and the loop keeps going; only I/O errors on `input`/`output` end it early.
pub fn run<R, W, F>(input: R, mut output: W, mut answer: F) -> io::Result<ChatSummary>
where
    R: BufRead,
    W: Write,
    F: FnMut(&str) -> Result<String, PipelineError>,
{
    let mut summary = ChatSummary::default();
    let mut lines = input.lines();
    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;
        let Some(line) = lines.next().transpose()? else {
            writeln!(output)?;
            break;
        };
        match ChatCommand::parse(&line) {
            ChatCommand::Exit => break,
            ChatCommand::Empty => {
                writeln!(output, "{EMPTY_INPUT_MESSAGE}")?;
            }
            ChatCommand::Question(question) => match answer(question) {
                Ok(text) => {
                    summary.answered += 1;
                    writeln!(output, "QUESTION: {question}")?;
                    writeln!(output, "ANSWER: {text}")?;
                    writeln!(output, "{}", "-".repeat(SEPARATOR_WIDTH))?;
                }
                Err(err) => {
                    summary.failed += 1;
                    warn!(stage = %err.stage(), "question failed: {err}");
                    writeln!(output, "Error: {err}")?;
                }
            },
        }
    }
    writeln!(output, "Goodbye!")?;
    Ok(summary)
}

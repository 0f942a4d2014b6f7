//! Interactive shell.
//!
//! Lines are buffered until the input ends with `;`. The buffer is then split
//! into statements, which run in order until one fails.

use std::path::PathBuf;

use anyhow::{Context, Result};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::{debug, error};

use reldb::{Database, Error, Outcome};

use crate::config::Config;
use crate::display;

/// Whether the shell should keep reading after a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

pub struct Shell {
    db: Database,
    prompt: String,
    history_file: Option<PathBuf>,
}

impl Shell {
    pub fn new(db: Database, config: &Config) -> Self {
        Self {
            db,
            prompt: config.prompt.clone(),
            history_file: config.history_file.clone(),
        }
    }

    /// Runs the read-eval-print loop until EXIT or end of input.
    pub fn run(&mut self) -> Result<()> {
        let mut editor = DefaultEditor::new().context("initialising line editor")?;
        if let Some(path) = &self.history_file {
            if path.exists() {
                if let Err(e) = editor.load_history(path) {
                    debug!(error = %e, "could not load history");
                }
            }
        }

        let mut buffer = String::new();
        loop {
            let prompt = if buffer.is_empty() { self.prompt.as_str() } else { "    -> " };
            match editor.readline(prompt) {
                Ok(line) => {
                    if !buffer.is_empty() {
                        buffer.push(' ');
                    }
                    buffer.push_str(line.trim_end());
                    if !buffer.ends_with(';') {
                        continue;
                    }
                    let _ = editor.add_history_entry(buffer.as_str());
                    let batch = std::mem::take(&mut buffer);
                    if self.run_batch(&batch)? == Flow::Exit {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    buffer.clear();
                    continue;
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    error!("Readline error: {}", e);
                    break;
                }
            }
        }

        if let Some(path) = &self.history_file {
            if let Err(e) = editor.save_history(path) {
                debug!(error = %e, "could not save history");
            }
        }
        Ok(())
    }

    /// Executes every statement of `input`, printing each response.
    ///
    /// Stops at the first failed statement. Only fatal (storage) errors are
    /// returned; the others are printed.
    pub fn run_batch(&mut self, input: &str) -> Result<Flow> {
        for statement in split_statements(input) {
            match self.db.execute(&statement) {
                Ok(Outcome::Exit) => return Ok(Flow::Exit),
                Ok(outcome) => {
                    if let Some(text) = display::render(&outcome) {
                        println!("{}{}", self.prompt, text);
                    }
                }
                Err(e) => {
                    println!("{}{}", self.prompt, e);
                    if e.is_fatal() {
                        return Err(fatal(e));
                    }
                    break;
                }
            }
        }
        Ok(Flow::Continue)
    }
}

fn fatal(e: Error) -> anyhow::Error {
    anyhow::Error::new(e).context("storage failure")
}

/// Splits input on `;` outside single-quoted strings. Every statement keeps
/// its terminating `;`; blank pieces are dropped.
pub fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;

    for c in input.chars() {
        current.push(c);
        match c {
            '\'' => in_string = !in_string,
            ';' if !in_string => {
                let statement = current.trim();
                if statement != ";" {
                    statements.push(statement.to_string());
                }
                current.clear();
            }
            _ => {}
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        statements.push(format!("{rest};"));
    }
    statements
}

//! Interactive shell.
//!
//! Reads SQL-like statements from the terminal, accumulating lines until
//! a terminating `;`, and dispatches them through the [`Session`].
//! Informational lines and errors go to stderr; query results go to the
//! session's switchable output sink.

use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use crate::session::{Outcome, Session};
use crate::sql::Parser;

const PROMPT: &str = "shaledb> ";
const CONTINUATION_PROMPT: &str = "     ..> ";

/// The line-oriented shell.
pub struct Repl {
    editor: DefaultEditor,
    session: Session,
}

impl Repl {
    /// Wraps a session in a line editor.
    pub fn new(session: Session) -> rustyline::Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
            session,
        })
    }

    /// Runs the read-parse-execute loop until EXIT or end of input.
    pub fn run(&mut self) -> rustyline::Result<()> {
        let mut pending = String::new();
        loop {
            let prompt = if pending.is_empty() {
                PROMPT
            } else {
                CONTINUATION_PROMPT
            };
            match self.editor.readline(prompt) {
                Ok(line) => {
                    if pending.is_empty() && line.trim().is_empty() {
                        continue;
                    }
                    pending.push_str(&line);
                    pending.push('\n');
                    if !has_terminator(&pending) {
                        continue;
                    }
                    let _ = self.editor.add_history_entry(pending.trim());
                    let input = std::mem::take(&mut pending);
                    if !self.run_input(&input) {
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    pending.clear();
                }
                Err(ReadlineError::Eof) => break,
                Err(e) => return Err(e),
            }
        }

        if let Err(e) = self.session.close() {
            eprintln!("[Error] {}", e);
        }
        Ok(())
    }

    /// Flushes and closes the underlying session.
    pub fn close(&mut self) {
        if let Err(e) = self.session.close() {
            eprintln!("[Error] {}", e);
        }
    }

    /// Executes every statement in `input`. Returns false on EXIT.
    pub fn run_input(&mut self, input: &str) -> bool {
        for statement in split_statements(input) {
            let stmt = match Parser::parse_sql(&statement) {
                Ok(stmt) => stmt,
                Err(e) => {
                    eprintln!("[Error] {}", e);
                    continue;
                }
            };
            match self.session.execute(&stmt) {
                Ok(Outcome::None) => {}
                Ok(Outcome::Info(message)) => eprintln!("[Info] {}", message),
                Ok(Outcome::Exit) => return false,
                Err(e) => eprintln!("[Error] {}", e),
            }
        }
        true
    }
}

/// Returns true once the buffer holds a `;` outside string literals.
fn has_terminator(input: &str) -> bool {
    let mut in_string = false;
    for ch in input.chars() {
        match ch {
            '\'' => in_string = !in_string,
            ';' if !in_string => return true,
            _ => {}
        }
    }
    false
}

/// Splits the buffer into statements on `;` outside string literals.
fn split_statements(input: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut in_string = false;
    for ch in input.chars() {
        match ch {
            '\'' => {
                in_string = !in_string;
                current.push(ch);
            }
            ';' if !in_string => {
                if !current.trim().is_empty() {
                    statements.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
            _ => current.push(ch),
        }
    }
    if !current.trim().is_empty() {
        statements.push(current);
    }
    statements
}

use std::io::BufRead;

use inquire::{InquireError, Text};
use weatherapp_core::{Prompt, ResolverInputError};

/// Interactive prompt on the controlling terminal.
///
/// Falls back to plain line reads from stdin when there is no TTY, so answers
/// can be piped in.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

impl Prompt for TerminalPrompt {
    fn show_menu(&self, entries: &[&str]) {
        for (i, entry) in entries.iter().enumerate() {
            println!("{}. {entry}", i + 1);
        }
    }

    fn ask(&self, question: &str) -> Result<String, ResolverInputError> {
        match Text::new(question).prompt() {
            Ok(answer) => Ok(answer),
            Err(InquireError::NotTTY) => read_line(question),
            Err(_) => Err(ResolverInputError::Cancelled),
        }
    }
}

fn read_line(question: &str) -> Result<String, ResolverInputError> {
    println!("{question}");
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Err(ResolverInputError::Cancelled),
        Ok(_) => Ok(line.trim_end().to_string()),
    }
}

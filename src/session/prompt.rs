//! Operator input
//!
//! The runner never reads stdin directly. It asks an [`Operator`] for a
//! line, which lets tests drive whole sessions from a script.

use std::io::Write;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use crate::common::interrupt::Interrupt;

/// Answer to a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// A trimmed input line
    Line(String),
    /// Input closed or the session was interrupted; treated as quit
    Closed,
}

/// Source of operator answers
#[async_trait]
pub trait Operator: Send {
    async fn ask(&mut self, prompt: &str) -> Reply;
}

/// Reads answers from the terminal
pub struct TerminalOperator {
    lines: Lines<BufReader<Stdin>>,
    interrupt: Interrupt,
}

impl TerminalOperator {
    pub fn new(interrupt: Interrupt) -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
            interrupt,
        }
    }
}

#[async_trait]
impl Operator for TerminalOperator {
    async fn ask(&mut self, prompt: &str) -> Reply {
        if self.interrupt.is_raised() {
            return Reply::Closed;
        }

        print!("{}", prompt);
        let _ = std::io::stdout().flush();

        tokio::select! {
            line = self.lines.next_line() => match line {
                Ok(Some(line)) => Reply::Line(line.trim().to_string()),
                Ok(None) => {
                    println!();
                    Reply::Closed
                }
                Err(e) => {
                    tracing::warn!("Failed to read input: {}", e);
                    Reply::Closed
                }
            },
            _ = self.interrupt.raised() => {
                println!();
                Reply::Closed
            }
        }
    }
}

/// Plays back canned answers and records the prompts it was asked
#[cfg(test)]
#[derive(Debug, Default)]
pub struct ScriptedOperator {
    answers: std::collections::VecDeque<String>,
    pub prompts: Vec<String>,
}

#[cfg(test)]
impl ScriptedOperator {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            answers: answers.iter().map(|a| a.to_string()).collect(),
            prompts: Vec::new(),
        }
    }

    /// Answers not consumed by the session
    pub fn remaining(&self) -> usize {
        self.answers.len()
    }
}

#[cfg(test)]
#[async_trait]
impl Operator for ScriptedOperator {
    async fn ask(&mut self, prompt: &str) -> Reply {
        self.prompts.push(prompt.to_string());
        match self.answers.pop_front() {
            Some(answer) => Reply::Line(answer),
            None => Reply::Closed,
        }
    }
}

//! Abstraction over diagnostic tool invocation.
//!
//! Checks only ever see captured text; this trait is where `df`, `mpstat`
//! and friends are actually executed. Tests substitute canned output and
//! never fork anything.

use std::collections::HashMap;
use std::io;
use std::process::Command;

/// Runs a diagnostic tool and captures its standard output.
pub trait CommandRunner: Send + Sync {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String>;
}

/// Real implementation that spawns the tool and waits for it.
///
/// A non-zero exit is an error; partial output from a failing tool is
/// worse than no output.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellRunner;

impl ShellRunner {
    pub fn new() -> Self {
        Self
    }
}

impl CommandRunner for ShellRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let output = Command::new(program).args(args).output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} exited with {}",
                program, output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Canned-output implementation for tests, keyed by the full command
/// line.
#[derive(Debug, Clone, Default)]
pub struct MockRunner {
    outputs: HashMap<String, String>,
}

impl MockRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers output for one command line, e.g. `"df -k"`.
    pub fn add_output(&mut self, command_line: impl Into<String>, output: impl Into<String>) {
        self.outputs.insert(command_line.into(), output.into());
    }
}

impl CommandRunner for MockRunner {
    fn run(&self, program: &str, args: &[&str]) -> io::Result<String> {
        let mut key = String::from(program);
        for arg in args {
            key.push(' ');
            key.push_str(arg);
        }
        self.outputs.get(&key).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("no such command: {}", key))
        })
    }
}

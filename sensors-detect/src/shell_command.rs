/*
 * sensors-rs - hardware sensor monitoring library for x86 PCs
 * Copyright (C) 2026  sensors-rs contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program.  If not, see <https://www.gnu.org/licenses/>.
 */

//! Runs a fixed argv (never a shell string — `modprobe`/`udevadm` calls never need shell
//! features, so there's nothing to gain from `sh -c` and a word of injection risk to lose)
//! with a hard wall-clock timeout and a cap on how much output gets carried back.

use std::process::{Child, Command, Stdio};
use std::sync::mpsc;
use std::time::Duration;

use log::{debug, error, warn};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

const MAX_OUTPUT_LENGTH_BYTES: usize = 2_000;

pub enum CommandOutcome {
    Success { stdout: String, stderr: String },
    Error(String),
}

/// One external command and the budget it's allowed to run for.
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
}

impl ExternalCommand {
    #[must_use]
    pub fn new(program: &str, args: &[&str], timeout: Duration) -> Self {
        Self {
            program: program.to_owned(),
            args: args.iter().map(|a| (*a).to_owned()).collect(),
            timeout,
        }
    }

    fn describe(&self) -> String {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn spawn(&self) -> std::io::Result<Child> {
        Command::new(&self.program)
            .args(&self.args)
            .env("LC_ALL", "C")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
    }

    /// Runs the command to completion or until the timeout elapses, whichever comes first.
    /// A thread owns the blocking wait so the timeout is a simple channel `recv_timeout`
    /// rather than a sleep-and-poll loop.
    #[must_use]
    pub fn run(&self) -> CommandOutcome {
        debug!("running external command: {}", self.describe());
        let mut child = match self.spawn() {
            Ok(child) => child,
            Err(err) => {
                error!("failed to spawn {}: {err}", self.describe());
                return CommandOutcome::Error(err.to_string());
            }
        };

        let pid = Pid::from_raw(child.id() as i32);
        let (tx, rx) = mpsc::channel();
        let waiter = std::thread::spawn(move || {
            let result = child.wait_with_output();
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(output)) => {
                let _ = waiter.join();
                let mut stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
                let mut stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
                cap_output_length(&mut stdout);
                cap_output_length(&mut stderr);
                if output.status.success() {
                    CommandOutcome::Success { stdout, stderr }
                } else {
                    CommandOutcome::Error(stderr)
                }
            }
            Ok(Err(err)) => {
                error!("error reading output of {}: {err}", self.describe());
                CommandOutcome::Error(err.to_string())
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                warn!("{} timed out after {:?}, sending SIGKILL", self.describe(), self.timeout);
                let _ = signal::kill(pid, Signal::SIGKILL);
                let _ = waiter.join();
                CommandOutcome::Error(format!("timed out after {:?}: {}", self.timeout, self.describe()))
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                CommandOutcome::Error(format!("command thread vanished: {}", self.describe()))
            }
        }
    }
}

fn cap_output_length(output: &mut String) {
    if output.len() > MAX_OUTPUT_LENGTH_BYTES {
        output.truncate(MAX_OUTPUT_LENGTH_BYTES);
        output.push_str("...[truncated]");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_command_captures_stdout() {
        let cmd = ExternalCommand::new("echo", &["hello"], Duration::from_secs(5));
        match cmd.run() {
            CommandOutcome::Success { stdout, .. } => assert_eq!(stdout, "hello"),
            CommandOutcome::Error(e) => panic!("expected success, got error: {e}"),
        }
    }

    #[test]
    fn nonzero_exit_is_reported_as_an_error() {
        let cmd = ExternalCommand::new("false", &[], Duration::from_secs(5));
        match cmd.run() {
            CommandOutcome::Error(_) => {}
            CommandOutcome::Success { .. } => panic!("expected error"),
        }
    }

    #[test]
    fn exceeding_the_timeout_is_reported_as_an_error() {
        let cmd = ExternalCommand::new("sleep", &["60"], Duration::from_millis(200));
        match cmd.run() {
            CommandOutcome::Error(msg) => assert!(msg.contains("timed out"), "got: {msg}"),
            CommandOutcome::Success { .. } => panic!("expected timeout error"),
        }
    }

    #[test]
    fn long_output_is_truncated() {
        let cmd = ExternalCommand::new("yes", &["A"], Duration::from_millis(200));
        // `yes` never stops on its own; the timeout kills it, but whatever made it to the
        // pipe before that is still subject to the same cap applied to successful runs.
        if let CommandOutcome::Error(_) = cmd.run() {
            // timed out before producing output on some hosts; not the behavior under test
        }
        let mut huge = "A".repeat(MAX_OUTPUT_LENGTH_BYTES * 2);
        cap_output_length(&mut huge);
        assert!(huge.len() <= MAX_OUTPUT_LENGTH_BYTES + 20);
    }
}

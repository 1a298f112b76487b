//! A named console tab wrapping a [`ConsoleBackend`].

use std::future::Future;
use std::path::Path;

use anyhow::Result;
use kernel_console::{
    change_dir_command, run_file_command, ConsoleBackend, ConsoleEvent, KernelStatus,
};
use log::debug;
use tokio::sync::mpsc;

use crate::host::{Host, HostEvent};

pub struct ConsoleTab<B: ConsoleBackend> {
    name: String,
    backend: B,
    busy: bool,
}

impl<B: ConsoleBackend> ConsoleTab<B> {
    pub fn new(name: impl Into<String>, backend: B) -> Self {
        ConsoleTab {
            name: name.into(),
            backend,
            busy: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Track kernel activity from the backend's event stream.
    pub fn handle_event(&mut self, event: &ConsoleEvent) {
        if let ConsoleEvent::Status { status, .. } = event {
            match status {
                KernelStatus::Busy | KernelStatus::Starting => self.set_busy(true),
                KernelStatus::Idle | KernelStatus::Stopped => self.set_busy(false),
                KernelStatus::ShuttingDown => {}
            }
        }
    }

    /// Start the backend. The tab is idle afterwards whether or not the
    /// kernel came up.
    pub async fn start(&mut self) -> Result<()> {
        let result = self.backend.start().await;
        self.set_busy(false);
        result
    }

    pub async fn execute(&mut self, code: &str) -> Result<String> {
        let msg_id = self.backend.execute(code).await?;
        self.set_busy(true);
        Ok(msg_id)
    }

    pub async fn interrupt(&mut self) -> Result<()> {
        self.backend.interrupt().await
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        self.backend.stop().await?;
        self.set_busy(false);
        Ok(())
    }

    /// Restart the kernel and tell the host the workspace was reset.
    pub async fn restart(&mut self, host: &dyn Host) -> Result<()> {
        debug!("restarting console {}", self.name);
        self.backend.restart().await?;
        self.set_busy(false);
        host.fire(HostEvent::WorkspaceRestart {
            name: self.name.clone(),
        });
        Ok(())
    }

    pub fn write(&self, text: &str) {
        self.backend.write(text);
    }

    pub fn focus(&self) {
        self.backend.focus();
    }

    pub async fn change_dir(&mut self, path: &Path) -> Result<String> {
        let code = change_dir_command(self.backend.kernel_name(), &path.display().to_string());
        self.execute(&code).await
    }

    pub async fn run_file(&mut self, path: &Path) -> Result<String> {
        let code = run_file_command(self.backend.kernel_name(), &path.display().to_string());
        self.execute(&code).await
    }
}

/// A line typed into an interactive console.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput<'a> {
    Code(&'a str),
    Restart,
    Interrupt,
    ChangeDir(&'a str),
    RunFile(&'a str),
    Help,
    Quit,
    Unknown(&'a str),
}

impl<'a> ConsoleInput<'a> {
    /// Lines starting with `:` are console commands; anything else is code.
    pub fn parse(line: &'a str) -> Self {
        let Some(command) = line.trim_start().strip_prefix(':') else {
            return ConsoleInput::Code(line);
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command.trim(), ""),
        };
        match (name, arg) {
            ("restart", _) => ConsoleInput::Restart,
            ("interrupt", _) => ConsoleInput::Interrupt,
            ("cd", dir) if !dir.is_empty() => ConsoleInput::ChangeDir(dir),
            ("run", file) if !file.is_empty() => ConsoleInput::RunFile(file),
            ("help", _) => ConsoleInput::Help,
            ("quit" | "q" | "exit", _) => ConsoleInput::Quit,
            _ => ConsoleInput::Unknown(command),
        }
    }
}

/// Wait for the next typed line. Returns `None` at end of input, or when
/// `interrupted` resolves before a line arrives.
pub async fn next_input_line<F: Future>(
    input: &mut mpsc::UnboundedReceiver<String>,
    interrupted: F,
) -> Option<String> {
    tokio::select! {
        line = input.recv() => line,
        _ = interrupted => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_next_input_line_returns_typed_line() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.send("x = 1".to_string()).unwrap();

        let line = next_input_line(&mut rx, std::future::pending::<()>()).await;
        assert_eq!(line.as_deref(), Some("x = 1"));
    }

    #[tokio::test]
    async fn test_next_input_line_stops_on_interrupt() {
        let (_tx, mut rx) = mpsc::unbounded_channel::<String>();

        let line = next_input_line(&mut rx, std::future::ready(())).await;
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn test_next_input_line_stops_at_end_of_input() {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        drop(tx);

        let line = next_input_line(&mut rx, std::future::pending::<()>()).await;
        assert_eq!(line, None);
    }

    #[test]
    fn test_parse_code() {
        assert_eq!(ConsoleInput::parse("x = 1"), ConsoleInput::Code("x = 1"));
        assert_eq!(
            ConsoleInput::parse("d = {'a': 1}"),
            ConsoleInput::Code("d = {'a': 1}")
        );
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(ConsoleInput::parse(":restart"), ConsoleInput::Restart);
        assert_eq!(ConsoleInput::parse(":interrupt"), ConsoleInput::Interrupt);
        assert_eq!(ConsoleInput::parse(":help"), ConsoleInput::Help);
        assert_eq!(ConsoleInput::parse(":q"), ConsoleInput::Quit);
        assert_eq!(ConsoleInput::parse("  :quit"), ConsoleInput::Quit);
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!(
            ConsoleInput::parse(":cd /tmp/my data"),
            ConsoleInput::ChangeDir("/tmp/my data")
        );
        assert_eq!(
            ConsoleInput::parse(":run  experiment.py "),
            ConsoleInput::RunFile("experiment.py")
        );
    }

    #[test]
    fn test_parse_commands_missing_arguments() {
        assert_eq!(ConsoleInput::parse(":cd"), ConsoleInput::Unknown("cd"));
        assert_eq!(ConsoleInput::parse(":bogus"), ConsoleInput::Unknown("bogus"));
    }
}

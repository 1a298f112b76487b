//! The capability surface a console front end drives.

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

/// Kernel activity as seen by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum KernelStatus {
    /// Kernel process is being launched
    Starting,
    /// Kernel is ready for input
    Idle,
    /// Kernel is executing code
    Busy,
    /// Kernel is being shut down
    ShuttingDown,
    /// No kernel process
    Stopped,
}

impl std::fmt::Display for KernelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KernelStatus::Starting => write!(f, "starting"),
            KernelStatus::Idle => write!(f, "idle"),
            KernelStatus::Busy => write!(f, "busy"),
            KernelStatus::ShuttingDown => write!(f, "shutdown"),
            KernelStatus::Stopped => write!(f, "stopped"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Everything a console front end needs to render.
///
/// `parent_msg_id` ties output to the execute request that produced it;
/// text injected with [`ConsoleBackend::write`] has none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConsoleEvent {
    Output {
        stream: OutputStream,
        text: String,
        parent_msg_id: Option<String>,
    },
    Result {
        execution_count: usize,
        text: String,
        parent_msg_id: Option<String>,
    },
    Error {
        ename: String,
        evalue: String,
        traceback: Vec<String>,
        parent_msg_id: Option<String>,
    },
    Status {
        status: KernelStatus,
        parent_msg_id: Option<String>,
    },
    /// The front end should move keyboard focus to the console input
    Focus,
    Restarted {
        kernel_name: String,
    },
}

impl ConsoleEvent {
    pub fn parent_msg_id(&self) -> Option<&str> {
        match self {
            ConsoleEvent::Output { parent_msg_id, .. }
            | ConsoleEvent::Result { parent_msg_id, .. }
            | ConsoleEvent::Error { parent_msg_id, .. }
            | ConsoleEvent::Status { parent_msg_id, .. } => parent_msg_id.as_deref(),
            ConsoleEvent::Focus | ConsoleEvent::Restarted { .. } => None,
        }
    }

    /// True for the idle status that closes out the request `msg_id`.
    pub fn is_idle_for(&self, msg_id: &str) -> bool {
        matches!(
            self,
            ConsoleEvent::Status {
                status: KernelStatus::Idle,
                parent_msg_id: Some(parent),
            } if parent == msg_id
        )
    }
}

/// Narrow interface over whichever kernel library backs a console.
#[async_trait]
pub trait ConsoleBackend: Send {
    /// Name of the kernelspec this console runs (e.g. `python3`).
    fn kernel_name(&self) -> &str;

    fn is_running(&self) -> bool;

    async fn start(&mut self) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    /// Submit code for execution and return the request's msg_id.
    async fn execute(&mut self, code: &str) -> Result<String>;

    async fn interrupt(&mut self) -> Result<()>;

    async fn restart(&mut self) -> Result<()>;

    /// Inject text into the console's output.
    fn write(&self, text: &str);

    fn focus(&self);
}

use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use anyhow::Result;
use async_trait::async_trait;
use jupyter_protocol::{
    ConnectionInfo, ExecuteRequest, ExecutionState, InterruptRequest, JupyterMessage,
    JupyterMessageContent, KernelInfoRequest, MediaType, ShutdownRequest,
};
use log::{debug, error, info, warn};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::backend::{ConsoleBackend, ConsoleEvent, KernelStatus, OutputStream};

/// A console attached to a locally launched Jupyter kernel.
///
/// Kernel output arrives on the receiver returned by [`KernelConsole::new`].
pub struct KernelConsole {
    kernel_name: String,
    connection_info: Option<ConnectionInfo>,
    connection_file: Option<PathBuf>,
    session_id: String,
    iopub_task: Option<tokio::task::JoinHandle<()>>,
    shell_reader_task: Option<tokio::task::JoinHandle<()>>,
    shell_writer: Option<runtimelib::DealerSendConnection>,
    process: Option<tokio::process::Child>,
    working_dir: Option<PathBuf>,
    events: mpsc::UnboundedSender<ConsoleEvent>,
}

impl KernelConsole {
    pub fn new(kernel_name: &str) -> (Self, mpsc::UnboundedReceiver<ConsoleEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let console = KernelConsole {
            kernel_name: kernel_name.to_string(),
            connection_info: None,
            connection_file: None,
            session_id: Uuid::new_v4().to_string(),
            iopub_task: None,
            shell_reader_task: None,
            shell_writer: None,
            process: None,
            working_dir: None,
            events,
        };
        (console, rx)
    }

    /// Launch the kernel process in `dir` instead of the current directory.
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn connection_file(&self) -> Option<&Path> {
        self.connection_file.as_deref()
    }

    fn emit(&self, event: ConsoleEvent) {
        // A dropped receiver just means nobody is rendering.
        let _ = self.events.send(event);
    }

    fn emit_status(&self, status: KernelStatus) {
        self.emit(ConsoleEvent::Status {
            status,
            parent_msg_id: None,
        });
    }

    /// Write a connection file and bring the kernel up. The connection file
    /// is removed again if the kernel never becomes reachable.
    async fn launch(&mut self) -> Result<()> {
        let kernelspec = runtimelib::find_kernelspec(&self.kernel_name).await?;

        let ip = std::net::IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1));
        let ports = runtimelib::peek_ports(ip, 5).await?;

        let connection_info = ConnectionInfo {
            transport: jupyter_protocol::connection_info::Transport::TCP,
            ip: ip.to_string(),
            stdin_port: ports[0],
            control_port: ports[1],
            hb_port: ports[2],
            shell_port: ports[3],
            iopub_port: ports[4],
            signature_scheme: "hmac-sha256".to_string(),
            key: Uuid::new_v4().to_string(),
            kernel_name: Some(self.kernel_name.clone()),
        };

        let runtime_dir = runtimelib::dirs::runtime_dir();
        tokio::fs::create_dir_all(&runtime_dir).await?;

        let kernel_id: String =
            petname::petname(2, "-").unwrap_or_else(|| Uuid::new_v4().to_string());
        let connection_file_path = runtime_dir.join(format!("sesame-kernel-{}.json", kernel_id));

        tokio::fs::write(
            &connection_file_path,
            serde_json::to_string_pretty(&connection_info)?,
        )
        .await?;

        info!(
            "Starting kernel {} at {:?}",
            self.kernel_name, connection_file_path
        );

        if let Err(e) = self
            .connect(kernelspec, connection_info, &connection_file_path)
            .await
        {
            tokio::fs::remove_file(&connection_file_path).await.ok();
            return Err(e);
        }

        self.connection_file = Some(connection_file_path);
        info!("Kernel started: {}", kernel_id);
        Ok(())
    }

    /// Spawn the kernel process and open its channels. Nothing is stored on
    /// `self` unless every step succeeds; a dropped child is killed.
    async fn connect(
        &mut self,
        kernelspec: runtimelib::KernelspecDir,
        connection_info: ConnectionInfo,
        connection_file: &Path,
    ) -> Result<()> {
        let mut command =
            kernelspec.command(connection_file, Some(Stdio::null()), Some(Stdio::null()))?;
        if let Some(ref dir) = self.working_dir {
            command.current_dir(dir);
        }
        let process = command.kill_on_drop(true).spawn()?;

        // Let the kernel bind its sockets
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;

        self.session_id = Uuid::new_v4().to_string();

        let iopub =
            runtimelib::create_client_iopub_connection(&connection_info, "", &self.session_id)
                .await?;
        let iopub_task = tokio::spawn(forward_iopub(iopub, self.events.clone()));

        let shell = match open_shell(&connection_info, &self.session_id).await {
            Ok(shell) => shell,
            Err(e) => {
                iopub_task.abort();
                return Err(e);
            }
        };

        let (shell_writer, mut shell_reader) = shell.split();

        let shell_reader_task = tokio::spawn(async move {
            loop {
                match shell_reader.read().await {
                    Ok(msg) => {
                        if let JupyterMessageContent::ExecuteReply(ref reply) = msg.content {
                            debug!("execute_reply: status={:?}", reply.status);
                        } else {
                            debug!("shell reply: type={}", msg.header.msg_type);
                        }
                    }
                    Err(e) => {
                        error!("shell read error: {}", e);
                        break;
                    }
                }
            }
        });

        self.connection_info = Some(connection_info);
        self.iopub_task = Some(iopub_task);
        self.shell_reader_task = Some(shell_reader_task);
        self.shell_writer = Some(shell_writer);
        self.process = Some(process);
        Ok(())
    }

    fn abort_tasks(&mut self) {
        if let Some(task) = self.iopub_task.take() {
            task.abort();
        }
        if let Some(task) = self.shell_reader_task.take() {
            task.abort();
        }
    }
}

/// Translate iopub content into a console event.
///
/// Returns `None` for message types the console does not render.
pub fn content_to_event(
    content: &JupyterMessageContent,
    parent_msg_id: Option<String>,
) -> Option<ConsoleEvent> {
    match content {
        JupyterMessageContent::StreamContent(stream) => {
            let stream_name = match stream.name {
                jupyter_protocol::Stdio::Stdout => OutputStream::Stdout,
                jupyter_protocol::Stdio::Stderr => OutputStream::Stderr,
            };
            Some(ConsoleEvent::Output {
                stream: stream_name,
                text: stream.text.clone(),
                parent_msg_id,
            })
        }
        JupyterMessageContent::ExecuteResult(result) => {
            let text = plain_text(&result.data.content)?;
            Some(ConsoleEvent::Result {
                execution_count: result.execution_count.0,
                text,
                parent_msg_id,
            })
        }
        JupyterMessageContent::DisplayData(data) => {
            let mut text = plain_text(&data.data.content)?;
            if !text.ends_with('\n') {
                text.push('\n');
            }
            Some(ConsoleEvent::Output {
                stream: OutputStream::Stdout,
                text,
                parent_msg_id,
            })
        }
        JupyterMessageContent::ErrorOutput(err) => Some(ConsoleEvent::Error {
            ename: err.ename.clone(),
            evalue: err.evalue.clone(),
            traceback: err.traceback.clone(),
            parent_msg_id,
        }),
        JupyterMessageContent::Status(status) => {
            let status = match status.execution_state {
                ExecutionState::Busy => KernelStatus::Busy,
                ExecutionState::Idle => KernelStatus::Idle,
                _ => return None,
            };
            Some(ConsoleEvent::Status {
                status,
                parent_msg_id,
            })
        }
        _ => None,
    }
}

fn plain_text(content: &[MediaType]) -> Option<String> {
    content.iter().find_map(|media| match media {
        MediaType::Plain(text) => Some(text.clone()),
        _ => None,
    })
}

/// Forward rendered iopub messages to the console until the socket or the
/// receiver goes away.
async fn forward_iopub(
    mut iopub: runtimelib::ClientIoPubConnection,
    events: mpsc::UnboundedSender<ConsoleEvent>,
) {
    loop {
        match iopub.read().await {
            Ok(message) => {
                debug!(
                    "iopub: type={} parent_msg_id={:?}",
                    message.header.msg_type,
                    message.parent_header.as_ref().map(|h| &h.msg_id)
                );
                let parent = message.parent_header.as_ref().map(|h| h.msg_id.clone());
                if let Some(event) = content_to_event(&message.content, parent) {
                    if events.send(event).is_err() {
                        debug!("console event receiver dropped, stopping iopub listener");
                        break;
                    }
                }
            }
            Err(e) => {
                error!("iopub read error: {}", e);
                break;
            }
        }
    }
}

/// Open the shell channel and wait for a kernel_info reply.
async fn open_shell(
    connection_info: &ConnectionInfo,
    session_id: &str,
) -> Result<runtimelib::ClientShellConnection> {
    let identity = runtimelib::peer_identity_for_session(session_id)?;
    let mut shell = runtimelib::create_client_shell_connection_with_identity(
        connection_info,
        session_id,
        identity,
    )
    .await?;

    let request: JupyterMessage = KernelInfoRequest::default().into();
    shell.send(request).await?;

    match tokio::time::timeout(std::time::Duration::from_secs(30), shell.read()).await {
        Ok(Ok(msg)) => {
            info!("Kernel alive: got {} reply", msg.header.msg_type);
            Ok(shell)
        }
        Ok(Err(e)) => Err(anyhow::anyhow!("Kernel did not respond: {}", e)),
        Err(_) => Err(anyhow::anyhow!("Kernel did not respond within 30s")),
    }
}

#[async_trait]
impl ConsoleBackend for KernelConsole {
    fn kernel_name(&self) -> &str {
        &self.kernel_name
    }

    fn is_running(&self) -> bool {
        self.shell_writer.is_some()
    }

    async fn start(&mut self) -> Result<()> {
        if self.is_running() {
            self.stop().await.ok();
        }
        self.emit_status(KernelStatus::Starting);

        if let Err(e) = self.launch().await {
            error!("Failed to start kernel {}: {}", self.kernel_name, e);
            self.emit_status(KernelStatus::Stopped);
            return Err(e);
        }

        self.emit_status(KernelStatus::Idle);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        debug!("shutting down kernel");
        self.emit_status(KernelStatus::ShuttingDown);
        self.abort_tasks();
        self.shell_writer = None;

        if let Some(connection_info) = &self.connection_info {
            match runtimelib::create_client_control_connection(connection_info, &self.session_id)
                .await
            {
                Ok(mut control) => {
                    let request: JupyterMessage = ShutdownRequest { restart: false }.into();
                    control.send(request).await.ok();
                }
                Err(e) => warn!("Could not reach control channel for shutdown: {}", e),
            }
        }

        if let Some(ref path) = self.connection_file {
            tokio::fs::remove_file(path).await.ok();
        }

        self.connection_info = None;
        self.connection_file = None;
        self.process = None;

        self.emit_status(KernelStatus::Stopped);
        Ok(())
    }

    async fn execute(&mut self, code: &str) -> Result<String> {
        let shell = self
            .shell_writer
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("No kernel running"))?;

        let message: JupyterMessage = ExecuteRequest::new(code.to_string()).into();
        let msg_id = message.header.msg_id.clone();

        shell.send(message).await?;
        info!("Sent execute_request: msg_id={}", msg_id);

        Ok(msg_id)
    }

    async fn interrupt(&mut self) -> Result<()> {
        debug!("interrupting kernel");
        let connection_info = self
            .connection_info
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("No kernel running"))?;

        let mut control =
            runtimelib::create_client_control_connection(connection_info, &self.session_id).await?;

        let request: JupyterMessage = InterruptRequest {}.into();
        control.send(request).await?;
        info!("Sent interrupt_request");

        Ok(())
    }

    async fn restart(&mut self) -> Result<()> {
        debug!("restarting kernel");
        self.stop().await?;
        self.start().await?;
        self.emit(ConsoleEvent::Restarted {
            kernel_name: self.kernel_name.clone(),
        });
        Ok(())
    }

    fn write(&self, text: &str) {
        self.emit(ConsoleEvent::Output {
            stream: OutputStream::Stdout,
            text: text.to_string(),
            parent_msg_id: None,
        });
    }

    fn focus(&self) {
        self.emit(ConsoleEvent::Focus);
    }
}

impl Drop for KernelConsole {
    fn drop(&mut self) {
        self.abort_tasks();
        if let Some(ref path) = self.connection_file {
            let _ = std::fs::remove_file(path);
        }
    }
}

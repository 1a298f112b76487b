//! Interactive console over a Jupyter kernel.
//!
//! [`ConsoleBackend`] is the narrow capability set a console front end uses
//! (start, stop, execute, interrupt, restart, write, focus). [`KernelConsole`]
//! implements it by launching a kernelspec locally through runtimelib and
//! forwarding iopub traffic as [`ConsoleEvent`]s.

pub mod backend;
pub mod commands;
pub mod kernel;

pub use backend::{ConsoleBackend, ConsoleEvent, KernelStatus, OutputStream};
pub use commands::{change_dir_command, run_file_command};
pub use kernel::{content_to_event, KernelConsole};

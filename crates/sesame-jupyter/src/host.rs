//! The slice of the embedding application that the extensions talk to.

use std::path::{Path, PathBuf};

use serde::Serialize;

/// Events the extensions fire at the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum HostEvent {
    /// Open a new editor buffer holding `source`
    NewFile { source: String },
    /// The console named `name` lost its kernel state
    WorkspaceRestart { name: String },
    /// Show a short user-facing message
    Notify { message: String },
}

/// Host services injected into the extensions.
///
/// The file pickers return `None` when the user cancels.
pub trait Host {
    fn fire(&self, event: HostEvent);

    /// Source text of the active editor, if any.
    fn current_source(&self) -> Option<String>;

    fn pick_notebook_to_open(&self, start_dir: &Path) -> Option<PathBuf>;

    fn pick_notebook_to_save(&self, start_dir: &Path) -> Option<PathBuf>;

    fn notify(&self, message: &str) {
        self.fire(HostEvent::Notify {
            message: message.to_string(),
        });
    }

    fn set_current_source(&self, source: String) {
        self.fire(HostEvent::NewFile { source });
    }
}

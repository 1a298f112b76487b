//! Notebook import/export actions.
//!
//! Import opens an `.ipynb` file as a flat-text editor buffer; export writes
//! the active buffer's delimited cells to an `.ipynb` file.

use std::path::{Path, PathBuf};

use log::{error, info, warn};
use notebook_cells::{Cell, CellType};

use crate::host::Host;
use crate::settings::{self, Settings};

pub const READ_FAILED_MESSAGE: &str = "Failed to read notebook. See console for details.";
pub const WRITE_FAILED_MESSAGE: &str = "Failed to write notebook. See console for details.";

/// How an import or export action ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The host received a new buffer or the notebook was written
    Done,
    /// The user dismissed the file picker
    Cancelled,
    /// There was nothing to convert
    Empty,
    /// The user was notified; the detail was logged
    Failed(String),
}

pub struct NotebookExtension {
    settings: Settings,
    settings_path: Option<PathBuf>,
}

impl NotebookExtension {
    /// An extension whose remembered directory lives only in memory.
    pub fn new(settings: Settings) -> Self {
        NotebookExtension {
            settings,
            settings_path: None,
        }
    }

    /// Persist the remembered directory to `path` whenever it changes.
    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Cells found in `code`, optionally restricted to `cell_types`.
    pub fn provide_cells(&self, code: &str, cell_types: Option<&[CellType]>) -> Vec<Cell> {
        notebook_cells::scan_cells(code, cell_types).collect()
    }

    /// Ask the host for a notebook and open it as a new buffer.
    pub fn import_notebook(&mut self, host: &dyn Host) -> ActionOutcome {
        let Some(path) = host.pick_notebook_to_open(&self.settings.dialog_dir()) else {
            return ActionOutcome::Cancelled;
        };
        self.remember_dir(&path);
        self.import_from(host, &path)
    }

    pub fn import_from(&self, host: &dyn Host, path: &Path) -> ActionOutcome {
        let text = match notebook_cells::import_notebook(path) {
            Ok(text) => text,
            Err(e) => {
                host.notify(READ_FAILED_MESSAGE);
                error!("{}", e);
                return ActionOutcome::Failed(e.to_string());
            }
        };
        if text.is_empty() {
            info!("Notebook {:?} has no code or markdown cells", path);
            return ActionOutcome::Empty;
        }
        host.set_current_source(text);
        ActionOutcome::Done
    }

    /// Ask the host for a destination and export the active buffer to it.
    pub fn export_notebook(&mut self, host: &dyn Host) -> ActionOutcome {
        let Some(path) = host.pick_notebook_to_save(&self.settings.dialog_dir()) else {
            return ActionOutcome::Cancelled;
        };
        self.remember_dir(&path);
        self.export_to(host, &path)
    }

    pub fn export_to(&self, host: &dyn Host, path: &Path) -> ActionOutcome {
        let Some(source) = host.current_source() else {
            info!("No active source to export");
            return ActionOutcome::Empty;
        };
        match notebook_cells::export_notebook(&source, path) {
            Ok(_) => ActionOutcome::Done,
            Err(e) => {
                host.notify(WRITE_FAILED_MESSAGE);
                error!("{}", e);
                ActionOutcome::Failed(e.to_string())
            }
        }
    }

    fn remember_dir(&mut self, path: &Path) {
        let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) else {
            return;
        };
        self.settings.file_dialog_path = Some(dir.to_path_buf());
        if let Some(ref settings_path) = self.settings_path {
            if let Err(e) = settings::save_settings_to(settings_path, &self.settings) {
                warn!("Failed to save settings to {:?}: {}", settings_path, e);
            }
        }
    }
}

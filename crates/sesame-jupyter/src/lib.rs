//! Jupyter extensions for the OpenSesame IDE.
//!
//! - [`NotebookExtension`]: import `.ipynb` notebooks as cell-annotated
//!   flat text and export flat text back to notebooks
//! - [`ConsoleTab`]: a named interactive console over a kernel backend
//!
//! Both talk to the embedding application only through the [`Host`] trait.

pub mod console_tab;
pub mod host;
pub mod notebook_extension;
pub mod settings;

pub use console_tab::{ConsoleInput, ConsoleTab};
pub use host::{Host, HostEvent};
pub use notebook_extension::{ActionOutcome, NotebookExtension};
pub use settings::Settings;

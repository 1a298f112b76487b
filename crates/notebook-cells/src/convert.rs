//! Notebook file ⇄ flat text conversion.
//!
//! Import renders every code and markdown cell of an `.ipynb` notebook into a
//! delimited block. Raw cells have no flat-text form and are dropped.
//!
//! Export scans delimited blocks back out of flat text and writes a fresh
//! nbformat 4.5 notebook with cleared execution state.

use std::collections::HashMap;
use std::path::Path;

use log::{debug, info};
use nbformat::v4::{Cell as NbCell, CellId, CellMetadata, Metadata, Notebook};
use uuid::Uuid;

use crate::cell::CellType;
use crate::error::ConvertError;
use crate::scanner::scan_cells;

pub const CODE_CELL_OPEN: &str = "# <codecell>\n";
pub const CODE_CELL_CLOSE: &str = "\n# </codecell>\n";
pub const MARKDOWN_CELL_OPEN: &str = "# <markdowncell>\n\"\"\"\n";
pub const MARKDOWN_CELL_CLOSE: &str = "\n\"\"\"\n# </markdowncell>\n";

/// Read and upgrade an `.ipynb` file to the v4 model.
pub fn read_notebook(path: &Path) -> Result<Notebook, ConvertError> {
    let content = std::fs::read_to_string(path).map_err(|e| read_error(path, e))?;
    let nb = nbformat::parse_notebook(&content).map_err(|e| read_error(path, e))?;
    match nb {
        nbformat::Notebook::V4(nb) => Ok(nb),
        nbformat::Notebook::Legacy(legacy) => {
            debug!("Upgrading legacy notebook {:?}", path);
            nbformat::upgrade_legacy_notebook(legacy).map_err(|e| read_error(path, e))
        }
        nbformat::Notebook::V3(v3) => {
            debug!("Upgrading v3 notebook {:?}", path);
            nbformat::upgrade_v3_notebook(v3).map_err(|e| read_error(path, e))
        }
    }
}

/// Render the code and markdown cells of `notebook` as flat text.
///
/// Blocks are separated by a blank line. Returns an empty string when the
/// notebook has no code or markdown cells.
pub fn notebook_to_flat_text(notebook: &Notebook) -> String {
    let mut dropped = 0usize;
    let blocks: Vec<String> = notebook
        .cells
        .iter()
        .filter_map(|cell| match cell {
            NbCell::Code { source, .. } => Some(code_block(&source.join(""))),
            NbCell::Markdown { source, .. } => Some(markdown_block(&source.join(""))),
            NbCell::Raw { .. } => {
                dropped += 1;
                None
            }
        })
        .collect();

    if dropped > 0 {
        debug!("Dropped {} raw cell(s) without a flat-text form", dropped);
    }
    blocks.join("\n")
}

/// Convert an `.ipynb` file into flat text.
pub fn import_notebook(path: &Path) -> Result<String, ConvertError> {
    let notebook = read_notebook(path)?;
    let text = notebook_to_flat_text(&notebook);
    info!(
        "Imported {} cell(s) from {:?}",
        notebook.cells.len(),
        path
    );
    Ok(text)
}

/// Build a notebook from the delimited blocks in `text`.
///
/// Code cells get `execution_count = 0` and no outputs. Markdown cells lose
/// their triple-quote wrapper.
pub fn flat_text_to_notebook(text: &str) -> Notebook {
    let cells = scan_cells(text, None)
        .map(|cell| match cell.cell_type {
            CellType::Code => NbCell::Code {
                id: CellId::from(Uuid::new_v4()),
                metadata: empty_cell_metadata(),
                execution_count: Some(0),
                source: source_to_lines(&cell.source),
                outputs: Vec::new(),
            },
            CellType::Markdown => NbCell::Markdown {
                id: CellId::from(Uuid::new_v4()),
                metadata: empty_cell_metadata(),
                source: source_to_lines(strip_markdown_wrapper(&cell.source)),
                attachments: None,
            },
        })
        .collect();

    Notebook {
        metadata: Metadata {
            kernelspec: None,
            language_info: None,
            authors: None,
            additional: HashMap::new(),
        },
        nbformat: 4,
        nbformat_minor: 5,
        cells,
    }
}

/// Serialize `notebook` to `path`.
///
/// The JSON goes to a sibling temp file that is renamed over the
/// destination, so a failed write leaves nothing behind.
pub fn write_notebook(notebook: Notebook, path: &Path) -> Result<(), ConvertError> {
    let nb = nbformat::Notebook::V4(notebook);
    let content = nbformat::serialize_notebook(&nb).map_err(|e| write_error(path, e))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp_path = dir.join(format!(".tmp.{}.ipynb", Uuid::new_v4()));

    if let Err(e) =
        std::fs::write(&tmp_path, content).and_then(|_| std::fs::rename(&tmp_path, path))
    {
        std::fs::remove_file(&tmp_path).ok();
        return Err(write_error(path, e));
    }
    Ok(())
}

/// Convert flat text into an `.ipynb` file at `path`. Returns the cell count.
pub fn export_notebook(text: &str, path: &Path) -> Result<usize, ConvertError> {
    let notebook = flat_text_to_notebook(text);
    let count = notebook.cells.len();
    write_notebook(notebook, path)?;
    info!("Exported {} cell(s) to {:?}", count, path);
    Ok(count)
}

fn code_block(source: &str) -> String {
    format!("{}{}{}", CODE_CELL_OPEN, source, CODE_CELL_CLOSE)
}

fn markdown_block(source: &str) -> String {
    format!("{}{}{}", MARKDOWN_CELL_OPEN, source, MARKDOWN_CELL_CLOSE)
}

/// Trims any run of quotes and newlines from both ends, not just the
/// wrapper itself. Markdown that starts or ends with `"` or a newline loses
/// those characters.
fn strip_markdown_wrapper(source: &str) -> &str {
    source
        .trim_start_matches(['"', '\n'])
        .trim_end_matches(['\n', '"'])
}

/// Split a source string into nbformat's line list (newlines kept).
fn source_to_lines(source: &str) -> Vec<String> {
    if source.is_empty() {
        return Vec::new();
    }
    source.split_inclusive('\n').map(|s| s.to_string()).collect()
}

fn empty_cell_metadata() -> CellMetadata {
    CellMetadata {
        id: None,
        collapsed: None,
        scrolled: None,
        deletable: None,
        editable: None,
        format: None,
        name: None,
        tags: None,
        jupyter: None,
        execution: None,
        additional: HashMap::new(),
    }
}

fn read_error(path: &Path, reason: impl std::fmt::Display) -> ConvertError {
    ConvertError::Read {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn write_error(path: &Path, reason: impl std::fmt::Display) -> ConvertError {
    ConvertError::Write {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

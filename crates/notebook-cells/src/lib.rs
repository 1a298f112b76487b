//! Conversion between Jupyter notebooks and cell-annotated flat text.
//!
//! The flat-text format lets a notebook be edited as an ordinary source file.
//! Each cell is wrapped in comment delimiters:
//!
//! ```text
//! # <codecell>
//! print("hello")
//! # </codecell>
//!
//! # <markdowncell>
//! """
//! Some *markdown*
//! """
//! # </markdowncell>
//! ```
//!
//! - [`scan_cells`] lazily extracts delimited blocks from flat text
//! - [`import_notebook`] turns an `.ipynb` file into flat text
//! - [`export_notebook`] writes flat text back out as an `.ipynb` file

pub mod cell;
pub mod convert;
pub mod error;
pub mod scanner;

pub use cell::{Cell, CellType};
pub use convert::{
    export_notebook, flat_text_to_notebook, import_notebook, notebook_to_flat_text,
    read_notebook, write_notebook, CODE_CELL_CLOSE, CODE_CELL_OPEN, MARKDOWN_CELL_CLOSE,
    MARKDOWN_CELL_OPEN,
};
pub use error::ConvertError;
pub use scanner::{scan_cells, CellScanner};

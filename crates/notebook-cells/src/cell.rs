//! Cell records exchanged between flat text and structured notebooks.

use serde::Serialize;

/// The cell kinds that survive the trip through flat text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CellType {
    Code,
    Markdown,
}

impl CellType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CellType::Code => "code",
            CellType::Markdown => "markdown",
        }
    }
}

impl std::fmt::Display for CellType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CellType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "code" => Ok(CellType::Code),
            "markdown" | "md" => Ok(CellType::Markdown),
            _ => Err(format!("Unknown cell type: {}", s)),
        }
    }
}

/// A single cell found in (or destined for) a flat-text document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    pub cell_type: CellType,
    /// Text between the delimiters, untrimmed
    pub source: String,
    /// Byte offset where the matched block starts (scanned cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<usize>,
    /// Byte offset just past the matched block (scanned cells only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<usize>,
}

impl Cell {
    /// A cell that did not come from a scanned document.
    pub fn new(cell_type: CellType, source: impl Into<String>) -> Self {
        Cell {
            cell_type,
            source: source.into(),
            start: None,
            end: None,
        }
    }

    pub fn span(&self) -> Option<std::ops::Range<usize>> {
        Some(self.start?..self.end?)
    }
}

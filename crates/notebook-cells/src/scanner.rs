//! Lazy extraction of delimited cells from flat text.

use std::sync::OnceLock;

use regex::{CaptureMatches, Regex};

use crate::cell::{Cell, CellType};

/// Opening tag line, non-greedy body, closing tag line.
///
/// The closing tag's type is not required to match the opening tag.
const CELL_PATTERN: &str = r"(?ms)^#[ \t]*<(?P<cell_type>code|markdown)cell>[ \t]*\n(?P<source>.*?)\n^#[ \t]*</(?:code|markdown)cell>";

static CELL_REGEX: OnceLock<Regex> = OnceLock::new();

fn cell_regex() -> &'static Regex {
    CELL_REGEX.get_or_init(|| Regex::new(CELL_PATTERN).expect("cell pattern is a valid regex"))
}

/// Iterator over the cells of a flat-text document, in document order.
pub struct CellScanner<'t> {
    matches: CaptureMatches<'static, 't>,
    cell_types: Option<Vec<CellType>>,
}

/// Scan `text` for delimited cells.
///
/// When `cell_types` is given, cells of other types are skipped. Regions that
/// do not form a complete block are ignored.
pub fn scan_cells<'t>(text: &'t str, cell_types: Option<&[CellType]>) -> CellScanner<'t> {
    CellScanner {
        matches: cell_regex().captures_iter(text),
        cell_types: cell_types.map(|types| types.to_vec()),
    }
}

impl CellScanner<'_> {
    fn allows(&self, cell_type: CellType) -> bool {
        match &self.cell_types {
            Some(types) => types.contains(&cell_type),
            None => true,
        }
    }
}

impl Iterator for CellScanner<'_> {
    type Item = Cell;

    fn next(&mut self) -> Option<Cell> {
        loop {
            let caps = self.matches.next()?;
            let whole = caps.get(0)?;

            let cell_type = match caps.name("cell_type").map(|m| m.as_str()) {
                Some("code") => CellType::Code,
                Some("markdown") => CellType::Markdown,
                _ => continue,
            };
            if !self.allows(cell_type) {
                continue;
            }

            let source = caps
                .name("source")
                .map(|m| m.as_str())
                .unwrap_or_default();

            return Some(Cell {
                cell_type,
                source: source.to_string(),
                start: Some(whole.start()),
                end: Some(whole.end()),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_CELLS: &str = "# <codecell>\nx = 1\n# </codecell>\n\n# <markdowncell>\n\"\"\"\nHello\n\"\"\"\n# </markdowncell>\n";

    #[test]
    fn test_scan_finds_cells_in_order() {
        let cells: Vec<Cell> = scan_cells(TWO_CELLS, None).collect();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].cell_type, CellType::Code);
        assert_eq!(cells[0].source, "x = 1");
        assert_eq!(cells[1].cell_type, CellType::Markdown);
        assert_eq!(cells[1].source, "\"\"\"\nHello\n\"\"\"");
    }

    #[test]
    fn test_scan_reports_offsets() {
        let cells: Vec<Cell> = scan_cells(TWO_CELLS, None).collect();

        assert_eq!(cells[0].start, Some(0));
        let first_end = cells[0].end.unwrap();
        assert_eq!(&TWO_CELLS[..first_end], "# <codecell>\nx = 1\n# </codecell>");

        let second = cells[1].span().unwrap();
        assert!(TWO_CELLS[second.clone()].starts_with("# <markdowncell>"));
        assert!(TWO_CELLS[second].ends_with("# </markdowncell>"));
    }

    #[test]
    fn test_scan_ignores_filler_text() {
        let text = format!("import os\n\nsome preamble\n{}trailing junk\n", TWO_CELLS);
        let cells: Vec<Cell> = scan_cells(&text, None).collect();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].source, "x = 1");
    }

    #[test]
    fn test_scan_type_filter_keeps_order() {
        let text = "# <codecell>\na\n# </codecell>\n\
                    # <markdowncell>\nm\n# </markdowncell>\n\
                    # <codecell>\nb\n# </codecell>\n";

        let cells: Vec<Cell> = scan_cells(text, Some(&[CellType::Code])).collect();

        assert_eq!(cells.len(), 2);
        assert!(cells.iter().all(|c| c.cell_type == CellType::Code));
        assert_eq!(cells[0].source, "a");
        assert_eq!(cells[1].source, "b");
    }

    #[test]
    fn test_scan_empty_filter_yields_nothing() {
        assert_eq!(scan_cells(TWO_CELLS, Some(&[])).count(), 0);
    }

    #[test]
    fn test_scan_missing_closing_tag_yields_nothing() {
        let text = "# <codecell>\nx = 1\nprint(x)\n";
        assert_eq!(scan_cells(text, None).count(), 0);
    }

    #[test]
    fn test_scan_empty_document() {
        assert_eq!(scan_cells("", None).count(), 0);
    }

    #[test]
    fn test_scan_allows_whitespace_in_tags() {
        let text = "#   <codecell>  \nx\n#\t</codecell>\n";
        let cells: Vec<Cell> = scan_cells(text, None).collect();

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].source, "x");
    }

    #[test]
    fn test_scan_tag_must_start_line() {
        let text = "x = 1  # <codecell>\ny\n# </codecell>\n";
        assert_eq!(scan_cells(text, None).count(), 0);
    }

    #[test]
    fn test_scan_accepts_mismatched_closing_tag() {
        let text = "# <codecell>\nx = 1\n# </markdowncell>\n";
        let cells: Vec<Cell> = scan_cells(text, None).collect();

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].cell_type, CellType::Code);
    }

    #[test]
    fn test_scan_stops_at_first_closing_tag() {
        let text = "# <codecell>\na\n# </codecell>\nb\n# </codecell>\n";
        let cells: Vec<Cell> = scan_cells(text, None).collect();

        assert_eq!(cells.len(), 1);
        assert_eq!(cells[0].source, "a");
    }

    #[test]
    fn test_scan_multiline_and_empty_sources() {
        let text = "# <codecell>\n\n# </codecell>\n# <codecell>\nfor i in x:\n    print(i)\n# </codecell>\n";
        let cells: Vec<Cell> = scan_cells(text, None).collect();

        assert_eq!(cells.len(), 2);
        assert_eq!(cells[0].source, "");
        assert_eq!(cells[1].source, "for i in x:\n    print(i)");
    }

    #[test]
    fn test_scan_is_lazy() {
        let mut scanner = scan_cells(TWO_CELLS, None);
        assert_eq!(scanner.next().unwrap().cell_type, CellType::Code);
        assert_eq!(scanner.next().unwrap().cell_type, CellType::Markdown);
        assert!(scanner.next().is_none());
    }
}

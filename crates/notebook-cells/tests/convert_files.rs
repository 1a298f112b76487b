//! File-level import/export tests.

use std::path::Path;

use notebook_cells::{
    export_notebook, import_notebook, read_notebook, scan_cells, CellType, ConvertError,
};
use tempfile::TempDir;

const MIXED_NOTEBOOK: &str = r##"{
 "cells": [
  {
   "cell_type": "markdown",
   "id": "intro",
   "metadata": {},
   "source": ["# Analysis\n", "\n", "Loads the data."]
  },
  {
   "cell_type": "code",
   "execution_count": 3,
   "id": "load",
   "metadata": {},
   "outputs": [
    {"name": "stdout", "output_type": "stream", "text": ["42\n"]}
   ],
   "source": ["import json\n", "print(42)"]
  },
  {
   "cell_type": "raw",
   "id": "raw-one",
   "metadata": {},
   "source": ["\\begin{raw}"]
  },
  {
   "cell_type": "code",
   "execution_count": null,
   "id": "plot",
   "metadata": {},
   "outputs": [],
   "source": ["plot()"]
  }
 ],
 "metadata": {},
 "nbformat": 4,
 "nbformat_minor": 5
}
"##;

const EMPTY_NOTEBOOK: &str = r#"{"cells": [], "metadata": {}, "nbformat": 4, "nbformat_minor": 5}"#;

fn write_fixture(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn cell_pairs(path: &Path) -> Vec<(String, String)> {
    let nb = read_notebook(path).unwrap();
    nb.cells
        .iter()
        .map(|cell| {
            let kind = match cell {
                nbformat::v4::Cell::Code { .. } => "code",
                nbformat::v4::Cell::Markdown { .. } => "markdown",
                nbformat::v4::Cell::Raw { .. } => "raw",
            };
            (kind.to_string(), cell.source().join(""))
        })
        .collect()
}

#[test]
fn test_import_renders_code_and_markdown_in_order() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(&tmp, "mixed.ipynb", MIXED_NOTEBOOK);

    let text = import_notebook(&path).unwrap();
    let cells: Vec<_> = scan_cells(&text, None).collect();

    assert_eq!(cells.len(), 3);
    assert_eq!(cells[0].cell_type, CellType::Markdown);
    assert_eq!(cells[1].cell_type, CellType::Code);
    assert_eq!(cells[1].source, "import json\nprint(42)");
    assert_eq!(cells[2].source, "plot()");
    assert!(!text.contains("begin{raw}"));
}

#[test]
fn test_round_trip_preserves_code_and_markdown() {
    let tmp = TempDir::new().unwrap();
    let original = write_fixture(&tmp, "mixed.ipynb", MIXED_NOTEBOOK);
    let exported = tmp.path().join("exported.ipynb");

    let text = import_notebook(&original).unwrap();
    let count = export_notebook(&text, &exported).unwrap();
    assert_eq!(count, 3);

    let expected: Vec<_> = cell_pairs(&original)
        .into_iter()
        .filter(|(kind, _)| kind != "raw")
        .collect();
    assert_eq!(cell_pairs(&exported), expected);
}

#[test]
fn test_export_clears_execution_state() {
    let tmp = TempDir::new().unwrap();
    let original = write_fixture(&tmp, "mixed.ipynb", MIXED_NOTEBOOK);
    let exported = tmp.path().join("exported.ipynb");

    let text = import_notebook(&original).unwrap();
    export_notebook(&text, &exported).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&exported).unwrap()).unwrap();
    assert_eq!(json["nbformat"], 4);
    for cell in json["cells"].as_array().unwrap() {
        if cell["cell_type"] == "code" {
            assert_eq!(cell["execution_count"], 0);
            assert_eq!(cell["outputs"].as_array().unwrap().len(), 0);
        }
    }
}

#[test]
fn test_markdown_wrapper_symmetry() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("hello.ipynb");
    let flat = "# <markdowncell>\n\"\"\"\nHello\n\"\"\"\n# </markdowncell>\n";

    export_notebook(flat, &path).unwrap();
    assert_eq!(
        cell_pairs(&path),
        vec![("markdown".to_string(), "Hello".to_string())]
    );

    assert_eq!(import_notebook(&path).unwrap(), flat);
}

#[test]
fn test_import_empty_notebook_gives_empty_text() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(&tmp, "empty.ipynb", EMPTY_NOTEBOOK);

    assert_eq!(import_notebook(&path).unwrap(), "");
}

#[test]
fn test_export_text_without_cells_writes_empty_notebook() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("none.ipynb");

    let count = export_notebook("just some code\nwith no markers\n", &path).unwrap();

    assert_eq!(count, 0);
    assert!(cell_pairs(&path).is_empty());
}

#[test]
fn test_import_missing_file_is_read_error() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("missing.ipynb");

    let err = import_notebook(&path).unwrap_err();
    assert!(matches!(err, ConvertError::Read { path: ref p, .. } if *p == path));
}

#[test]
fn test_import_invalid_json_is_read_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(&tmp, "broken.ipynb", "{ not json");

    let err = import_notebook(&path).unwrap_err();
    assert!(matches!(err, ConvertError::Read { .. }));
}

#[test]
fn test_import_v3_notebook_is_upgraded() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(
        &tmp,
        "old.ipynb",
        r#"{
  "metadata": {"name": ""},
  "nbformat": 3,
  "nbformat_minor": 0,
  "worksheets": [
    {
      "metadata": {},
      "cells": [
        {
          "cell_type": "markdown",
          "metadata": {},
          "source": ["Intro"]
        },
        {
          "cell_type": "code",
          "metadata": {},
          "language": "python",
          "prompt_number": 4,
          "input": ["x = 1"],
          "outputs": []
        }
      ]
    }
  ]
}"#,
    );

    let text = import_notebook(&path).unwrap();

    assert_eq!(
        text,
        "# <markdowncell>\n\"\"\"\nIntro\n\"\"\"\n# </markdowncell>\n\n# <codecell>\nx = 1\n# </codecell>\n"
    );
}

#[test]
fn test_import_unsupported_version_is_read_error() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(
        &tmp,
        "future.ipynb",
        r#"{"metadata": {}, "nbformat": 5, "nbformat_minor": 0, "cells": []}"#,
    );

    let err = import_notebook(&path).unwrap_err();
    assert!(matches!(err, ConvertError::Read { path: ref p, .. } if *p == path));
}

#[test]
fn test_export_to_missing_directory_leaves_nothing() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("does-not-exist");
    let path = dir.join("out.ipynb");

    let err = export_notebook("# <codecell>\nx\n# </codecell>\n", &path).unwrap_err();

    assert!(matches!(err, ConvertError::Write { .. }));
    assert!(!path.exists());
    assert!(!dir.exists());
}

#[test]
fn test_export_leaves_no_temp_files() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("out.ipynb");

    export_notebook("# <codecell>\nx\n# </codecell>\n", &path).unwrap();

    let names: Vec<_> = std::fs::read_dir(tmp.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["out.ipynb".to_string()]);
}

#[test]
fn test_export_overwrites_existing_notebook() {
    let tmp = TempDir::new().unwrap();
    let path = write_fixture(&tmp, "out.ipynb", MIXED_NOTEBOOK);

    export_notebook("# <codecell>\nonly\n# </codecell>\n", &path).unwrap();

    assert_eq!(
        cell_pairs(&path),
        vec![("code".to_string(), "only".to_string())]
    );
}

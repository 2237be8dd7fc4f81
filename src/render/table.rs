//! Markdown table rendering.

use crate::error::{Error, Result};
use crate::model::Table;

const MIN_COLUMN_WIDTH: usize = 3;

/// Render a table grid as a pipe table.
///
/// Row 0 is the header, followed by a dash separator and the remaining rows.
/// Short rows are padded with empty cells up to the widest row. The output has
/// one line per row plus the separator, without a trailing newline.
pub fn render_table(table: &Table) -> Result<String> {
    let col_count = table.column_count();
    if table.row_count() == 0 || col_count == 0 {
        return Err(Error::Render(format!(
            "table on page {} has an empty grid ({} rows, {} columns)",
            table.page,
            table.row_count(),
            col_count
        )));
    }

    let rows: Vec<Vec<String>> = table
        .rows
        .iter()
        .map(|row| {
            (0..col_count)
                .map(|c| row.get(c).map(|cell| clean_cell(cell)).unwrap_or_default())
                .collect()
        })
        .collect();

    let mut widths = vec![MIN_COLUMN_WIDTH; col_count];
    for row in &rows {
        for (c, cell) in row.iter().enumerate() {
            widths[c] = widths[c].max(cell.chars().count());
        }
    }

    let mut lines = Vec::with_capacity(rows.len() + 1);
    for (i, row) in rows.iter().enumerate() {
        lines.push(render_row(row, &widths));
        if i == 0 {
            let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            lines.push(render_row(&dashes, &widths));
        }
    }

    Ok(lines.join("\n"))
}

fn render_row(cells: &[String], widths: &[usize]) -> String {
    let mut line = String::from("|");
    for (cell, width) in cells.iter().zip(widths) {
        let pad = width.saturating_sub(cell.chars().count());
        line.push(' ');
        line.push_str(cell);
        line.push_str(&" ".repeat(pad));
        line.push_str(" |");
    }
    line
}

/// Flatten a cell to a single line and escape pipes.
fn clean_cell(text: &str) -> String {
    text.replace("\r\n", " ")
        .replace(['\r', '\n'], " ")
        .replace('|', "\\|")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BBox;

    fn table(rows: Vec<Vec<&str>>) -> Table {
        Table::new(
            1,
            BBox::default(),
            rows.into_iter()
                .map(|r| r.into_iter().map(String::from).collect())
                .collect(),
        )
    }

    #[test]
    fn test_simple_table() {
        let md = render_table(&table(vec![
            vec!["Name", "HP"],
            vec!["Goblin", "12"],
            vec!["Dragon", "300"],
        ]))
        .unwrap();
        assert_eq!(
            md,
            "| Name   | HP  |\n\
             | ------ | --- |\n\
             | Goblin | 12  |\n\
             | Dragon | 300 |"
        );
    }

    #[test]
    fn test_line_and_separator_counts() {
        let t = table(vec![
            vec!["a", "b", "c"],
            vec!["1", "2", "3"],
            vec!["4", "5", "6"],
            vec!["7", "8", "9"],
        ]);
        let md = render_table(&t).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines.len(), t.row_count() + 1);
        assert!(lines.iter().all(|l| !l.trim().is_empty()));
        let separator_cells = lines[1].trim_matches('|').split('|').count();
        assert_eq!(separator_cells, 3);
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let md = render_table(&table(vec![vec!["a"], vec!["1", "2", "3"]])).unwrap();
        let lines: Vec<&str> = md.lines().collect();
        assert_eq!(lines[0], "| a   |     |     |");
        assert_eq!(lines[1].matches("---").count(), 3);
    }

    #[test]
    fn test_cell_escaping() {
        let md = render_table(&table(vec![vec!["a|b", "line\none"], vec!["x\r\ny", " z "]]))
            .unwrap();
        assert!(md.contains("a\\|b"));
        assert!(md.contains("line one"));
        assert!(md.contains("x y"));
        assert_eq!(md.lines().count(), 3);
    }

    #[test]
    fn test_single_row_is_header_only() {
        let md = render_table(&table(vec![vec!["only", "row"]])).unwrap();
        assert_eq!(md.lines().count(), 2);
    }

    #[test]
    fn test_empty_grid_is_render_error() {
        let err = render_table(&table(vec![])).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
        let err = render_table(&table(vec![vec![], vec![]])).unwrap_err();
        assert!(matches!(err, Error::Render(_)));
    }
}

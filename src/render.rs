//! Rendering options and the plain-text table used by state reports.

use serde::{Deserialize, Serialize};

const DEFAULT_DATETIME_FORMAT: &str = "%d.%m.%y %H:%M:%S";

/// How periods and states are rendered as text.
///
/// Deserializable so it can live in application configuration; missing
/// fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// strftime-style format for instants. The UTC offset is appended
    /// separately.
    pub datetime_format: String,
    /// Spaces prepended to every rendered line.
    pub indent: usize,
    /// Render closed periods as `start – end` rather than
    /// `from start through end`.
    pub dash_if_closed: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            datetime_format: DEFAULT_DATETIME_FORMAT.to_string(),
            indent: 0,
            dash_if_closed: true,
        }
    }
}

impl RenderOptions {
    /// Set the datetime format.
    pub fn with_datetime_format(mut self, format: impl Into<String>) -> Self {
        self.datetime_format = format.into();
        self
    }

    /// Set the indentation.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Choose between dash and "from ... through ..." for closed periods.
    pub fn with_dash_if_closed(mut self, dash_if_closed: bool) -> Self {
        self.dash_if_closed = dash_if_closed;
        self
    }

    pub(crate) fn nested(&self, extra: usize) -> Self {
        Self {
            indent: self.indent + extra,
            ..self.clone()
        }
    }

    pub(crate) fn indent_lines<I, S>(&self, lines: I) -> String
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pad = " ".repeat(self.indent);
        lines
            .into_iter()
            .map(|line| format!("{pad}{}", line.as_ref()))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Fixed-column text table.
///
/// Columns are as wide as their widest cell; cells are left-aligned.
#[derive(Debug, Clone, Default)]
pub(crate) struct Table {
    headers: Vec<&'static str>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub(crate) fn new(headers: Vec<&'static str>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub(crate) fn push_row(&mut self, row: Vec<String>) {
        debug_assert_eq!(row.len(), self.headers.len());
        self.rows.push(row);
    }

    pub(crate) fn render(&self, options: &RenderOptions) -> String {
        let mut widths: Vec<usize> = self.headers.iter().map(|h| h.chars().count()).collect();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut lines = Vec::with_capacity(self.rows.len() + 2);
        lines.push(format_row(self.headers.iter().copied(), &widths));
        lines.push(
            widths
                .iter()
                .map(|width| "-".repeat(*width))
                .collect::<Vec<_>>()
                .join("-+-"),
        );
        for row in &self.rows {
            lines.push(format_row(row.iter().map(String::as_str), &widths));
        }
        options.indent_lines(lines)
    }
}

fn format_row<'a>(cells: impl Iterator<Item = &'a str>, widths: &[usize]) -> String {
    cells
        .zip(widths)
        .map(|(cell, &width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = RenderOptions::default();
        assert_eq!(options.datetime_format, "%d.%m.%y %H:%M:%S");
        assert_eq!(options.indent, 0);
        assert!(options.dash_if_closed);
    }

    #[test]
    fn test_deserialize_partial() {
        let options: RenderOptions = serde_json::from_str(r#"{"indent": 4}"#).unwrap();
        assert_eq!(options, RenderOptions::default().with_indent(4));
    }

    #[test]
    fn test_table_columns_align() {
        let mut table = Table::new(vec!["Limit", "Spent"]);
        table.push_row(vec!["10-day-cal".to_string(), "4".to_string()]);
        table.push_row(vec!["unlimited".to_string(), String::new()]);

        let rendered = table.render(&RenderOptions::default());
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "Limit      | Spent");
        assert_eq!(lines[1], "-----------+------");
        assert_eq!(lines[2], "10-day-cal | 4");
        assert_eq!(lines[3], "unlimited  |");
    }

    #[test]
    fn test_indent() {
        let options = RenderOptions::default().with_indent(2);
        assert_eq!(options.indent_lines(["a", "b"]), "  a\n  b");
        assert_eq!(options.nested(2).indent, 4);
    }
}

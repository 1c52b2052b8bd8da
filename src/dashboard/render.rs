//! Plain-text rendering of results for the terminal.
//!
//! Tables are built from ratatui lines with auto-sized columns; charts are
//! drawn into an offscreen ratatui buffer. Both end up as plain strings so
//! they can be printed between prompts or written to a file.

use ratatui::{
    buffer::Buffer,
    style::{Color, Modifier, Style},
    text::{Line, Span},
};

use crate::db::{QueryResult, Value};

/// Maximum width for any column.
const MAX_COLUMN_WIDTH: usize = 40;

/// Minimum width for any column.
const MIN_COLUMN_WIDTH: usize = 4;

/// Width used when the terminal size is unknown.
pub const DEFAULT_WIDTH: u16 = 120;

/// Returns the current terminal width, or [`DEFAULT_WIDTH`] when not a tty.
pub fn terminal_width() -> u16 {
    crossterm::terminal::size()
        .map(|(width, _)| width)
        .unwrap_or(DEFAULT_WIDTH)
}

/// A query result laid out as a bordered table.
pub struct ResultTable<'a> {
    result: &'a QueryResult,
    max_rows: Option<usize>,
}

impl<'a> ResultTable<'a> {
    /// Creates a table showing every row.
    pub fn new(result: &'a QueryResult) -> Self {
        Self {
            result,
            max_rows: None,
        }
    }

    /// Shows at most `max_rows` rows, followed by a "more rows" note.
    pub fn with_max_rows(mut self, max_rows: usize) -> Self {
        self.max_rows = Some(max_rows);
        self
    }

    /// Calculates the optimal width for each column.
    fn calculate_column_widths(&self) -> Vec<usize> {
        let mut widths: Vec<usize> = self
            .result
            .columns
            .iter()
            .map(|col| col.name.chars().count().max(MIN_COLUMN_WIDTH))
            .collect();

        for row in self.visible_rows() {
            for (i, value) in row.iter().enumerate() {
                if let Some(width) = widths.get_mut(i) {
                    *width = (*width).max(value.to_display_string().chars().count());
                }
            }
        }

        widths.iter().map(|&w| w.min(MAX_COLUMN_WIDTH)).collect()
    }

    fn visible_rows(&self) -> impl Iterator<Item = &'a Vec<Value>> {
        let limit = self.max_rows.unwrap_or(usize::MAX);
        self.result.rows.iter().take(limit)
    }

    /// Truncates a string to `max_width` characters, adding an ellipsis.
    fn truncate(s: &str, max_width: usize) -> String {
        if s.chars().count() <= max_width {
            s.to_string()
        } else if max_width <= 3 {
            s.chars().take(max_width).collect()
        } else {
            let kept: String = s.chars().take(max_width - 3).collect();
            format!("{kept}...")
        }
    }

    /// Renders the table to styled lines.
    pub fn render_to_lines(&self, available_width: usize) -> Vec<Line<'static>> {
        let mut lines = Vec::new();

        if self.result.columns.is_empty() {
            lines.push(Line::from(Span::styled(
                "(empty result)",
                Style::default().fg(Color::DarkGray),
            )));
            return lines;
        }

        let widths = self.calculate_column_widths();

        // Borders and padding take three characters per column plus one
        let total_width: usize = widths.iter().sum::<usize>() + widths.len() * 3 + 1;
        let scale_factor = if total_width > available_width && available_width > 0 {
            available_width as f64 / total_width as f64
        } else {
            1.0
        };

        let widths: Vec<usize> = widths
            .iter()
            .map(|&w| ((w as f64 * scale_factor) as usize).max(MIN_COLUMN_WIDTH))
            .collect();

        lines.push(Self::border(&widths, '┌', '┬', '┐'));
        lines.push(self.header_row(&widths));
        lines.push(Self::border(&widths, '├', '┼', '┤'));
        for row in self.visible_rows() {
            lines.push(Self::data_row(row, &widths));
        }
        lines.push(Self::border(&widths, '└', '┴', '┘'));

        let hidden = self.result.rows.len().saturating_sub(self.max_rows.unwrap_or(usize::MAX));
        if hidden > 0 {
            lines.push(Line::from(Span::styled(
                format!("... {hidden} more row(s) not shown"),
                Style::default().fg(Color::DarkGray),
            )));
        }

        lines.push(Line::from(Span::styled(
            self.result.summary(),
            Style::default().fg(Color::DarkGray),
        )));

        lines
    }

    /// Renders the table as plain text.
    pub fn render_to_string(&self, available_width: usize) -> String {
        lines_to_text(&self.render_to_lines(available_width))
    }

    fn border(widths: &[usize], left: char, mid: char, right: char) -> Line<'static> {
        let inner: Vec<String> = widths.iter().map(|&w| "─".repeat(w + 2)).collect();
        let border = format!("{left}{}{right}", inner.join(&mid.to_string()));
        Line::from(Span::styled(border, Style::default().fg(Color::DarkGray)))
    }

    fn header_row(&self, widths: &[usize]) -> Line<'static> {
        let mut spans = vec![Span::styled("│", Style::default().fg(Color::DarkGray))];

        for (i, col) in self.result.columns.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(MIN_COLUMN_WIDTH);
            spans.push(Span::styled(
                pad(&Self::truncate(&col.name, width), width),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }

    fn data_row(row: &[Value], widths: &[usize]) -> Line<'static> {
        let mut spans = vec![Span::styled("│", Style::default().fg(Color::DarkGray))];

        for (i, &width) in widths.iter().enumerate() {
            let value = row.get(i).unwrap_or(&Value::Null);
            let style = if value.is_null() {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC)
            } else {
                Style::default()
            };

            spans.push(Span::styled(
                pad(&Self::truncate(&value.to_display_string(), width), width),
                style,
            ));
            spans.push(Span::styled("│", Style::default().fg(Color::DarkGray)));
        }

        Line::from(spans)
    }
}

/// Pads to `width` characters with one space of margin on each side.
fn pad(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(text.chars().count());
    format!(" {text}{} ", " ".repeat(fill))
}

/// Joins styled lines into plain text, one line per row.
pub fn lines_to_text(lines: &[Line<'_>]) -> String {
    let mut text = String::new();
    for line in lines {
        for span in &line.spans {
            text.push_str(&span.content);
        }
        text.push('\n');
    }
    text
}

/// Converts a rendered buffer to plain text, trimming trailing blanks.
pub fn buffer_to_text(buffer: &Buffer) -> String {
    let area = buffer.area;

    let lines: Vec<String> = (0..area.height)
        .map(|y| {
            let line: String = (0..area.width)
                .filter_map(|x| buffer.cell((area.x + x, area.y + y)))
                .map(|cell| cell.symbol())
                .collect();
            line.trim_end().to_string()
        })
        .collect();

    let last = lines.iter().rposition(|line| !line.is_empty());
    match last {
        Some(last) => {
            let mut text = lines[..=last].join("\n");
            text.push('\n');
            text
        }
        None => String::new(),
    }
}

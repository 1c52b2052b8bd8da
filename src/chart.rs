//! Charts over query results.
//!
//! A [`ChartConfig`] names the chart kind and the columns to plot. It is
//! validated against a [`QueryResult`], turned into [`ChartData`] (panels of
//! series of points) and drawn with ratatui's chart widgets into plain text.

use std::fmt;
use std::str::FromStr;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    symbols::Marker,
    text::{Line, Span},
    widgets::{Axis, Bar, BarChart, BarGroup, Block, Chart, Dataset, GraphType, Widget},
};

use crate::dashboard::render::buffer_to_text;
use crate::db::{QueryResult, Value};
use crate::error::{FlightError, Result};

const SERIES_COLORS: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Magenta,
    Color::Green,
    Color::Red,
    Color::Blue,
];

const SERIES_MARKERS: [Marker; 4] = [Marker::Dot, Marker::Block, Marker::Bar, Marker::HalfBlock];

/// The kind of chart to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Bar,
    Line,
    Scatter,
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bar => write!(f, "bar"),
            Self::Line => write!(f, "line"),
            Self::Scatter => write!(f, "scatter"),
        }
    }
}

impl FromStr for ChartKind {
    type Err = FlightError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "bar" => Ok(Self::Bar),
            "line" => Ok(Self::Line),
            "scatter" => Ok(Self::Scatter),
            other => Err(FlightError::invalid_input(format!(
                "unknown chart type '{other}' (expected bar, line or scatter)"
            ))),
        }
    }
}

/// Which columns to plot and how.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChartConfig {
    pub kind: ChartKind,
    pub x: String,
    pub y: String,
    /// Column whose values split the data into series.
    pub color: Option<String>,
    /// Column whose values split the data into separate panels.
    /// Line charts ignore it.
    pub facet: Option<String>,
}

impl ChartConfig {
    /// Creates a configuration with no color or facet column.
    pub fn new(kind: ChartKind, x: impl Into<String>, y: impl Into<String>) -> Self {
        Self {
            kind,
            x: x.into(),
            y: y.into(),
            color: None,
            facet: None,
        }
    }

    /// Sets the color column.
    pub fn with_color(mut self, column: impl Into<String>) -> Self {
        self.color = Some(column.into());
        self
    }

    /// Sets the facet column.
    pub fn with_facet(mut self, column: impl Into<String>) -> Self {
        self.facet = Some(column.into());
        self
    }

    /// Checks that the configured columns can be plotted from `result`.
    pub fn validate(&self, result: &QueryResult) -> Result<()> {
        if result.columns.len() < 2 {
            return Err(FlightError::invalid_input(
                "charts need a result with at least two columns",
            ));
        }

        let require = |column: &str| -> Result<()> {
            if result.column_index(column).is_some() {
                Ok(())
            } else {
                Err(FlightError::invalid_input(format!(
                    "column '{column}' is not in the result"
                )))
            }
        };

        require(self.x.as_str())?;
        require(self.y.as_str())?;
        if !result.numeric_columns().contains(&self.y.as_str()) {
            return Err(FlightError::invalid_input(format!(
                "y-axis column '{}' is not numeric",
                self.y
            )));
        }
        if let Some(color) = &self.color {
            require(color.as_str())?;
        }
        if let Some(facet) = &self.facet {
            require(facet.as_str())?;
        }
        Ok(())
    }

    /// Validates the configuration and extracts the data to plot.
    pub fn build(&self, result: &QueryResult) -> Result<ChartData> {
        self.validate(result)?;

        let x_index = column(result, &self.x)?;
        let y_index = column(result, &self.y)?;
        let color_index = self.color.as_deref().map(|c| column(result, c)).transpose()?;
        let facet_index = match self.kind {
            ChartKind::Line => None,
            ChartKind::Bar | ChartKind::Scatter => {
                self.facet.as_deref().map(|c| column(result, c)).transpose()?
            }
        };

        let categorical = self.kind == ChartKind::Bar
            || !result.numeric_columns().contains(&self.x.as_str());
        let mut categories: Vec<String> = Vec::new();
        let mut panels: Vec<Panel> = Vec::new();

        for row in &result.rows {
            let (Some(x), Some(y)) = (row.get(x_index), row.get(y_index).and_then(Value::as_f64))
            else {
                continue;
            };
            if x.is_null() {
                continue;
            }

            let x_pos = if categorical {
                position_or_push(&mut categories, x.to_display_string()) as f64
            } else {
                match x.as_f64() {
                    Some(x) => x,
                    None => continue,
                }
            };

            let panel_title = facet_index.map(|i| cell_label(row.get(i)));
            let series_name = color_index
                .map(|i| cell_label(row.get(i)))
                .unwrap_or_else(|| self.y.clone());

            let panel = find_or_insert(&mut panels, |p| p.title == panel_title, || Panel {
                title: panel_title.clone(),
                series: Vec::new(),
            });
            let series = find_or_insert(&mut panel.series, |s| s.name == series_name, || Series {
                name: series_name.clone(),
                points: Vec::new(),
            });

            if self.kind == ChartKind::Bar {
                // Repeated x values within a series stack into one bar
                match series.points.iter_mut().find(|(px, _)| *px == x_pos) {
                    Some(point) => point.1 += y,
                    None => series.points.push((x_pos, y)),
                }
            } else {
                series.points.push((x_pos, y));
            }
        }

        Ok(ChartData {
            kind: self.kind,
            x_label: self.x.clone(),
            y_label: self.y.clone(),
            categories: if categorical { Some(categories) } else { None },
            panels,
        })
    }
}

fn column(result: &QueryResult, name: &str) -> Result<usize> {
    result
        .column_index(name)
        .ok_or_else(|| FlightError::invalid_input(format!("column '{name}' is not in the result")))
}

fn cell_label(value: Option<&Value>) -> String {
    value.map(Value::to_display_string).unwrap_or_else(|| "NULL".to_string())
}

fn position_or_push(items: &mut Vec<String>, item: String) -> usize {
    match items.iter().position(|existing| *existing == item) {
        Some(i) => i,
        None => {
            items.push(item);
            items.len() - 1
        }
    }
}

fn find_or_insert<T>(
    items: &mut Vec<T>,
    matches: impl Fn(&T) -> bool,
    make: impl FnOnce() -> T,
) -> &mut T {
    let index = match items.iter().position(matches) {
        Some(i) => i,
        None => {
            items.push(make());
            items.len() - 1
        }
    };
    &mut items[index]
}

/// Points extracted from a result, ready to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartData {
    pub kind: ChartKind,
    pub x_label: String,
    pub y_label: String,
    /// Distinct x labels, in first-seen order, when x is categorical.
    /// Point x coordinates are then indexes into this list.
    pub categories: Option<Vec<String>>,
    pub panels: Vec<Panel>,
}

/// One facet of a chart. `title` is `None` when there is no facet column.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub series: Vec<Series>,
}

/// Points sharing one color value.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: String,
    pub points: Vec<(f64, f64)>,
}

impl ChartData {
    /// Returns true if no row produced a point.
    pub fn is_empty(&self) -> bool {
        self.panels
            .iter()
            .all(|panel| panel.series.iter().all(|s| s.points.is_empty()))
    }

    /// Draws every panel, stacked, as plain text `width` columns wide.
    pub fn render(&self, width: u16, panel_height: u16) -> String {
        if self.is_empty() {
            return "(nothing to plot)\n".to_string();
        }

        self.panels
            .iter()
            .map(|panel| {
                let area = Rect::new(0, 0, width, panel_height);
                let mut buffer = Buffer::empty(area);
                match self.kind {
                    ChartKind::Bar => self.draw_bars(panel, area, &mut buffer),
                    ChartKind::Line | ChartKind::Scatter => {
                        self.draw_points(panel, area, &mut buffer)
                    }
                }
                buffer_to_text(&buffer)
            })
            .collect()
    }

    fn panel_block(&self, panel: &Panel) -> Block<'static> {
        let title = match &panel.title {
            Some(facet) => format!(" {} by {} [{}] ", self.y_label, self.x_label, facet),
            None => format!(" {} by {} ", self.y_label, self.x_label),
        };
        Block::bordered().title(title)
    }

    fn category(&self, x: f64) -> String {
        self.categories
            .as_ref()
            .and_then(|c| c.get(x as usize))
            .cloned()
            .unwrap_or_else(|| format_number(x))
    }

    /// Bar heights are unsigned; negative sums are drawn as zero-height bars
    /// but keep their value label.
    fn draw_bars(&self, panel: &Panel, area: Rect, buffer: &mut Buffer) {
        let category_count = self.categories.as_ref().map(Vec::len).unwrap_or(0);
        let max = panel
            .series
            .iter()
            .flat_map(|s| s.points.iter().map(|(_, y)| *y))
            .fold(0.0_f64, f64::max);
        let scale = if max > 0.0 { 1000.0 / max } else { 0.0 };

        let mut chart = BarChart::default()
            .block(self.panel_block(panel))
            .bar_width(3)
            .bar_gap(1)
            .group_gap(2);

        for index in 0..category_count {
            let bars: Vec<Bar> = panel
                .series
                .iter()
                .enumerate()
                .filter_map(|(i, series)| {
                    let y = series
                        .points
                        .iter()
                        .find(|(x, _)| *x as usize == index)
                        .map(|&(_, y)| y)?;
                    Some(
                        Bar::default()
                            .value((y.max(0.0) * scale).round() as u64)
                            .text_value(format_number(y))
                            .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()])),
                    )
                })
                .collect();
            if bars.is_empty() {
                continue;
            }
            chart = chart.data(
                BarGroup::default()
                    .label(Line::from(self.category(index as f64)))
                    .bars(&bars),
            );
        }

        chart.render(area, buffer);
    }

    fn draw_points(&self, panel: &Panel, area: Rect, buffer: &mut Buffer) {
        let (x_min, x_max) = bounds(panel.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)));
        let (y_min, y_max) = bounds(panel.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)));

        let graph_type = match self.kind {
            ChartKind::Line => GraphType::Line,
            ChartKind::Bar | ChartKind::Scatter => GraphType::Scatter,
        };

        let datasets: Vec<Dataset> = panel
            .series
            .iter()
            .enumerate()
            .map(|(i, series)| {
                Dataset::default()
                    .name(series.name.clone())
                    .marker(SERIES_MARKERS[i % SERIES_MARKERS.len()])
                    .graph_type(graph_type)
                    .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                    .data(&series.points)
            })
            .collect();

        Chart::new(datasets)
            .block(self.panel_block(panel))
            .x_axis(
                Axis::default()
                    .title(self.x_label.clone())
                    .bounds([x_min, x_max])
                    .labels(vec![
                        Span::raw(self.category(x_min)),
                        Span::raw(self.category(x_max)),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title(self.y_label.clone())
                    .bounds([y_min, y_max])
                    .labels(vec![
                        Span::raw(format_number(y_min)),
                        Span::raw(format_number(y_max)),
                    ]),
            )
            .render(area, buffer);
    }
}

/// Returns the min and max, widened so a single value still spans an axis.
fn bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (min, max) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else if min == max {
        (min - 1.0, max + 1.0)
    } else {
        (min, max)
    }
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value:.2}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ColumnInfo;
    use pretty_assertions::assert_eq;

    fn delays() -> QueryResult {
        QueryResult::with_data(
            vec![
                ColumnInfo::new("airline", "TEXT"),
                ColumnInfo::new("delay_minutes", "INT4"),
                ColumnInfo::new("status", "TEXT"),
                ColumnInfo::new("year", "INT4"),
            ],
            vec![
                vec![Value::from("Fly"), Value::Int(10), Value::from("Delayed"), Value::Int(2023)],
                vec![Value::from("Fly"), Value::Int(5), Value::from("Delayed"), Value::Int(2024)],
                vec![Value::from("Jet"), Value::Int(0), Value::from("On Time"), Value::Int(2023)],
                vec![Value::from("Jet"), Value::Null, Value::from("On Time"), Value::Int(2024)],
            ],
        )
    }

    #[test]
    fn test_chart_kind_parse() {
        assert_eq!("Bar".parse::<ChartKind>().unwrap(), ChartKind::Bar);
        assert_eq!("scatter".parse::<ChartKind>().unwrap(), ChartKind::Scatter);
        assert!("pie".parse::<ChartKind>().is_err());
    }

    #[test]
    fn test_validate_requires_two_columns() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("n", "INT4")],
            vec![vec![Value::Int(1)]],
        );
        let err = ChartConfig::new(ChartKind::Bar, "n", "n")
            .validate(&result)
            .unwrap_err();
        assert!(err.message().contains("two columns"));
    }

    #[test]
    fn test_validate_rejects_non_numeric_y() {
        let err = ChartConfig::new(ChartKind::Bar, "delay_minutes", "airline")
            .validate(&delays())
            .unwrap_err();
        assert!(err.message().contains("not numeric"));
    }

    #[test]
    fn test_validate_rejects_unknown_columns() {
        let config = ChartConfig::new(ChartKind::Bar, "airline", "delay_minutes");
        assert!(config.clone().with_color("gate").validate(&delays()).is_err());
        assert!(config.clone().with_facet("gate").validate(&delays()).is_err());
        assert!(ChartConfig::new(ChartKind::Bar, "gate", "delay_minutes")
            .validate(&delays())
            .is_err());
        assert!(config.validate(&delays()).is_ok());
    }

    #[test]
    fn test_bar_sums_repeated_x_and_skips_nulls() {
        let data = ChartConfig::new(ChartKind::Bar, "airline", "delay_minutes")
            .build(&delays())
            .unwrap();

        assert_eq!(
            data.categories,
            Some(vec!["Fly".to_string(), "Jet".to_string()])
        );
        assert_eq!(data.panels.len(), 1);
        assert_eq!(data.panels[0].series.len(), 1);
        assert_eq!(data.panels[0].series[0].name, "delay_minutes");
        assert_eq!(data.panels[0].series[0].points, vec![(0.0, 15.0), (1.0, 0.0)]);
    }

    #[test]
    fn test_color_groups_series() {
        let data = ChartConfig::new(ChartKind::Scatter, "year", "delay_minutes")
            .with_color("airline")
            .build(&delays())
            .unwrap();

        assert_eq!(data.categories, None);
        let names: Vec<&str> = data.panels[0].series.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Fly", "Jet"]);
        assert_eq!(
            data.panels[0].series[0].points,
            vec![(2023.0, 10.0), (2024.0, 5.0)]
        );
    }

    #[test]
    fn test_facet_splits_panels_except_for_line() {
        let config = ChartConfig::new(ChartKind::Scatter, "year", "delay_minutes").with_facet("status");
        let data = config.build(&delays()).unwrap();
        let titles: Vec<Option<String>> = data.panels.iter().map(|p| p.title.clone()).collect();
        assert_eq!(
            titles,
            vec![Some("Delayed".to_string()), Some("On Time".to_string())]
        );

        let line = ChartConfig {
            kind: ChartKind::Line,
            ..config
        }
        .build(&delays())
        .unwrap();
        assert_eq!(line.panels.len(), 1);
        assert_eq!(line.panels[0].title, None);
    }

    #[test]
    fn test_render_contains_title_and_labels() {
        let data = ChartConfig::new(ChartKind::Bar, "airline", "delay_minutes")
            .build(&delays())
            .unwrap();
        let text = data.render(60, 14);
        assert!(text.contains("delay_minutes by airline"));
        assert!(text.contains("Fly"));
        assert!(text.contains("Jet"));

        let text = ChartConfig::new(ChartKind::Line, "year", "delay_minutes")
            .build(&delays())
            .unwrap()
            .render(60, 14);
        assert!(text.contains("2023"));
    }

    #[test]
    fn test_render_empty() {
        let result = QueryResult::with_data(
            vec![ColumnInfo::new("x", "TEXT"), ColumnInfo::new("y", "INT4")],
            vec![],
        );
        let data = ChartConfig::new(ChartKind::Bar, "x", "y").build(&result).unwrap();
        assert!(data.is_empty());
        assert_eq!(data.render(40, 10), "(nothing to plot)\n");
    }

    #[test]
    fn test_bounds() {
        assert_eq!(bounds([3.0, 1.0, 2.0].into_iter()), (1.0, 3.0));
        assert_eq!(bounds([5.0].into_iter()), (4.0, 6.0));
        assert_eq!(bounds(std::iter::empty()), (0.0, 1.0));
    }
}

//! Interactive dashboard.
//!
//! A line-oriented shell over a [`DataSource`]: preview tables, run SQL,
//! search, export and chart the current result. Each [`Dashboard`] owns one
//! [`Session`]; nothing is shared between users.

pub mod command;
pub mod output;
pub mod render;
pub mod source;

pub use command::{Command, CommandRouter, COMMANDS};
pub use output::Output;
pub use source::DataSource;

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use crate::catalog::{self, FlightTable, EXAMPLE_QUERIES};
use crate::chart::ChartConfig;
use crate::config::Config;
use crate::db::QueryResult;
use crate::error::{FlightError, Result};
use crate::export;
use crate::safety::{classify_sql, StatementKind};
use crate::secrets::passwords_match;
use crate::session::Session;

use render::ResultTable;

/// Height of one chart panel, in terminal rows.
const CHART_PANEL_HEIGHT: u16 = 16;

const PROMPT: &str = "flights> ";
const CONTINUATION_PROMPT: &str = "      -> ";

const WRITE_LOCKED: &str = "Write statements require admin access. Use \\admin <password>.";

/// Dashboard settings taken from the configuration.
#[derive(Debug, Clone)]
pub struct DashboardSettings {
    /// Entries shown by `\history`.
    pub history_display: usize,
    /// Password that unlocks write statements.
    pub admin_password: Option<String>,
    /// Width used to lay out tables and charts.
    pub width: u16,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            history_display: 5,
            admin_password: None,
            width: render::DEFAULT_WIDTH,
        }
    }
}

impl DashboardSettings {
    /// Reads settings from the configuration and sizes output to the terminal.
    pub fn from_config(config: &Config) -> Self {
        Self {
            history_display: config.dashboard.history_display,
            admin_password: config.admin.password.clone(),
            width: render::terminal_width(),
        }
    }
}

/// One user's dashboard.
pub struct Dashboard {
    source: DataSource,
    session: Session,
    settings: DashboardSettings,
    /// Password given to `\admin`, forwarded with remote writes.
    unlocked_with: Option<String>,
}

impl Dashboard {
    /// Creates a dashboard with a fresh session.
    pub fn new(source: DataSource, settings: DashboardSettings) -> Self {
        Self {
            source,
            session: Session::new(),
            settings,
            unlocked_with: None,
        }
    }

    /// Returns the session state.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Greeting shown when the shell starts.
    pub fn banner(&self) -> Output {
        Output::Multiple(vec![
            Output::info(format!(
                "✈️  Flight Explorer, connected to {}",
                self.source.describe()
            )),
            Output::info("Type SQL ending with ';' or \\help for commands."),
        ])
    }

    /// Parses and handles one line of input.
    pub async fn handle_line(&mut self, line: &str) -> Output {
        let command = CommandRouter::parse(line);
        debug!(?command, "Dashboard command");
        self.handle(command).await
    }

    /// Handles a parsed command.
    pub async fn handle(&mut self, command: Command) -> Output {
        match command {
            Command::Empty => Output::None,
            Command::Sql(sql) => self.run_sql(&sql).await,
            Command::Tables => self.list_tables(),
            Command::Table(name) => self.load_table(&name).await,
            Command::History => self.show_history(),
            Command::Examples => Self::list_examples(),
            Command::Example(n) => self.load_example(n),
            Command::Run => match self.session.example_query.clone() {
                Some(sql) => self.run_sql(&sql).await,
                None => Output::warning("No example loaded. Use \\example <n> first."),
            },
            Command::Csv(path) => self.export_csv(path),
            Command::Chart(config) => self.chart(&config),
            Command::Search(term) => self.search(&term),
            Command::Admin(password) => self.unlock(password),
            Command::Lock => {
                self.session.admin_unlocked = false;
                self.unlocked_with = None;
                Output::info("Write statements locked.")
            }
            Command::Help => Self::help(),
            Command::Quit => Output::Quit,
            Command::Invalid { message, usage } => {
                Output::error(format!("{message}. Usage: {usage}"))
            }
            Command::Unknown(name) => Output::error(format!(
                "Unknown command {name}. Type \\help for a list of commands."
            )),
        }
    }

    async fn run_sql(&mut self, sql: &str) -> Output {
        if sql.trim().is_empty() {
            return Output::warning("Please enter a SQL query.");
        }

        let classification = classify_sql(sql);
        if classification.kind == StatementKind::Write && !self.session.admin_unlocked {
            warn!(statement = %classification.statement_type, "Write refused while locked");
            return Output::warning(WRITE_LOCKED);
        }

        let result = self
            .source
            .execute(sql, classification.kind, self.unlocked_with.as_deref())
            .await;

        match result {
            Err(e) => Output::error(format!("Query failed: {}", e.message())),
            Ok(result) if classification.kind == StatementKind::Write => {
                let message = match result.rows_affected {
                    Some(n) => format!("Statement executed, {n} row(s) affected."),
                    None => "Statement executed.".to_string(),
                };
                Output::success(message)
            }
            Ok(result) => {
                if self.session.record_query(sql, result) {
                    self.show_current()
                } else {
                    Output::info("Query returned no data.")
                }
            }
        }
    }

    fn list_tables(&self) -> Output {
        let mut text = String::from("Tables:\n");
        for table in FlightTable::ALL {
            text.push_str(&format!("  {table}\n"));
        }
        Output::text(text)
    }

    async fn load_table(&mut self, name: &str) -> Output {
        let table = match name.parse::<FlightTable>() {
            Ok(table) => table,
            Err(e) => {
                return Output::error(format!("{}. Use \\tables to list tables.", e.message()))
            }
        };

        match self.source.preview(table).await {
            Err(e) => Output::error(format!("Error loading table `{table}`: {}", e.message())),
            Ok(result) if result.is_empty() => Output::info("No data returned."),
            Ok(result) => {
                let rows = result.row_count;
                info!(%table, rows, "Table loaded");
                self.session.record_table(table, result);
                Output::Multiple(vec![
                    Output::success(format!("`{table}` loaded with {rows} rows")),
                    self.show_current(),
                ])
            }
        }
    }

    fn show_history(&self) -> Output {
        let recent = self.session.history.recent(self.settings.history_display);
        if recent.is_empty() {
            return Output::info("No queries yet.");
        }

        let mut text = String::from("Recent queries (newest first):\n");
        for (i, sql) in recent.iter().enumerate() {
            text.push_str(&format!("{:>3}. {}\n", i + 1, sql.trim()));
        }
        Output::text(text)
    }

    fn list_examples() -> Output {
        let mut text = String::from("Example queries:\n");
        for (i, example) in EXAMPLE_QUERIES.iter().enumerate() {
            text.push_str(&format!("  {}. {}\n", i + 1, example.title));
        }
        Output::text(text)
    }

    fn load_example(&mut self, n: usize) -> Output {
        let Some(example) = catalog::example(n) else {
            return Output::error(format!(
                "No example {n}. There are {} examples.",
                EXAMPLE_QUERIES.len()
            ));
        };

        self.session.example_query = Some(example.sql.to_string());
        Output::Multiple(vec![
            Output::info(example.title),
            Output::text(format!("{}\n", example.sql)),
            Output::info("Use \\run to execute it."),
        ])
    }

    fn export_csv(&self, path: Option<PathBuf>) -> Output {
        let Some(current) = self.session.current() else {
            return Output::warning("No result to export. Load a table or run a query first.");
        };

        let path = path.unwrap_or_else(|| PathBuf::from(current.csv_file_name()));
        match export::export_to_file(&current.result, &path) {
            Ok(rows) => Output::success(format!("Exported {rows} row(s) to {}", path.display())),
            Err(e) => Output::error(e.message().to_string()),
        }
    }

    fn chart(&self, config: &ChartConfig) -> Output {
        let Some(current) = self.session.current() else {
            return Output::warning("No result to chart. Load a table or run a query first.");
        };

        match config.build(&current.result) {
            Ok(data) => Output::text(data.render(self.settings.width, CHART_PANEL_HEIGHT)),
            Err(e) => Output::error(e.message().to_string()),
        }
    }

    fn search(&self, term: &str) -> Output {
        let Some(current) = self.session.current() else {
            return Output::warning("No result to search. Load a table or run a query first.");
        };

        let matches = current.result.filter_rows(term);
        let summary = Output::info(format!("{} result(s) found.", matches.row_count));
        if matches.is_empty() {
            summary
        } else {
            Output::Multiple(vec![summary, self.render(&matches)])
        }
    }

    fn unlock(&mut self, password: String) -> Output {
        let configured = self.settings.admin_password.as_deref();

        // A forwarder checks the password itself when none is configured here
        let accepted = if configured.is_none() && self.source.is_remote() {
            !password.is_empty()
        } else {
            passwords_match(configured, &password)
        };

        if accepted {
            info!("Admin access unlocked");
            self.session.admin_unlocked = true;
            self.unlocked_with = Some(password);
            Output::success("Admin access unlocked. Write statements are enabled.")
        } else {
            warn!("Rejected admin password");
            Output::error("Incorrect admin password.")
        }
    }

    fn help() -> Output {
        let width = COMMANDS.iter().map(|c| c.usage.len()).max().unwrap_or(0);
        let mut text = String::from("Commands:\n");
        for def in COMMANDS {
            text.push_str(&format!("  {:<width$}  {}\n", def.usage, def.description));
        }
        text.push_str("\nAny other input is run as SQL. End statements with ';' or a blank line.\n");
        Output::text(text)
    }

    fn show_current(&self) -> Output {
        match self.session.current() {
            Some(current) => self.render(&current.result),
            None => Output::None,
        }
    }

    fn render(&self, result: &QueryResult) -> Output {
        Output::text(ResultTable::new(result).render_to_string(usize::from(self.settings.width)))
    }

    /// Reads commands and SQL from `input` until `\quit` or end of input.
    ///
    /// Commands run as soon as their line is read. SQL may span lines and
    /// runs at a line ending in `;` or at a blank line.
    pub async fn run_shell<R, W>(&mut self, input: R, out: &mut W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: Write,
    {
        emit(&self.banner(), out)?;
        prompt(out, PROMPT)?;

        let mut lines = input.lines();
        let mut pending = String::new();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| FlightError::internal(format!("Failed to read input: {e}")))?
        {
            let trimmed = line.trim();
            // Commands run immediately, even in the middle of a statement;
            // the buffered SQL is kept.
            let ready = if trimmed.starts_with('\\') {
                Some(line)
            } else if trimmed.is_empty() {
                Some(std::mem::take(&mut pending))
            } else {
                if !pending.is_empty() {
                    pending.push('\n');
                }
                pending.push_str(&line);
                trimmed.ends_with(';').then(|| std::mem::take(&mut pending))
            };

            if let Some(input) = ready {
                let output = self.handle_line(&input).await;
                emit(&output, out)?;
                if output.is_quit() {
                    return Ok(());
                }
            }

            if pending.is_empty() {
                prompt(out, PROMPT)?;
            } else {
                prompt(out, CONTINUATION_PROMPT)?;
            }
        }

        // End of input runs whatever is still buffered
        if !pending.trim().is_empty() {
            let output = self.handle_line(&pending).await;
            emit(&output, out)?;
        }
        Ok(())
    }
}

/// Reloads and prints `table` every `interval` until Ctrl-C.
///
/// `iterations` bounds the number of loads; `None` runs until interrupted.
/// A failed reload is printed and the loop keeps going.
pub async fn watch_table<W: Write>(
    source: &DataSource,
    table: FlightTable,
    interval: Duration,
    width: u16,
    out: &mut W,
    iterations: Option<usize>,
) -> Result<()> {
    let mut loads = 0usize;

    loop {
        let stamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S");
        let output = match source.preview(table).await {
            Ok(result) if result.is_empty() => Output::info(format!("[{stamp}] No data returned.")),
            Ok(result) => Output::Multiple(vec![
                Output::info(format!("[{stamp}] `{table}` loaded with {} rows", result.row_count)),
                Output::text(ResultTable::new(&result).render_to_string(usize::from(width))),
            ]),
            Err(e) => Output::error(format!("[{stamp}] Error loading table `{table}`: {}", e.message())),
        };
        emit(&output, out)?;

        loads += 1;
        if iterations.is_some_and(|max| loads >= max) {
            return Ok(());
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = tokio::signal::ctrl_c() => {
                info!(%table, "Stopped watching");
                return Ok(());
            }
        }
    }
}

fn emit<W: Write>(output: &Output, out: &mut W) -> Result<()> {
    output
        .write_to(out)
        .and_then(|()| out.flush())
        .map_err(|e| FlightError::internal(format!("Failed to write output: {e}")))
}

fn prompt<W: Write>(out: &mut W, prompt: &str) -> Result<()> {
    write!(out, "{prompt}")
        .and_then(|()| out.flush())
        .map_err(|e| FlightError::internal(format!("Failed to write output: {e}")))
}

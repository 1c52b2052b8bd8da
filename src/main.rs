//! Flight Explorer - explore a flight-operations database locally or over HTTP.

use std::io::{self, BufRead, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use flight_explorer::catalog::FlightTable;
use flight_explorer::cli::{self, Cli, Commands, OutputFormat, SecretAction};
use flight_explorer::config::Config;
use flight_explorer::dashboard::{self, render, Dashboard, DashboardSettings, DataSource};
use flight_explorer::db::{self, DatabaseClient, QueryResult};
use flight_explorer::error::{FlightError, Result};
use flight_explorer::logging;
use flight_explorer::remote::RemoteClient;
use flight_explorer::secrets::{SecretKey, SecretStorage};
use flight_explorer::server::{self, AppState};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.is_interactive() {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(&cli).await {
        error!("{}: {}", e.category(), e.message());
        if cli.is_interactive() {
            eprintln!("{}: {}", e.category(), e.message());
        }
        std::process::exit(1);
    }
}

async fn run(cli: &Cli) -> Result<()> {
    // Secrets are managed without loading the rest of the configuration
    let config = || load_config(cli);

    match cli.command() {
        Commands::Secret { action } => run_secret(action),
        Commands::Serve { .. } => {
            let config = config()?;
            let addr = cli::bind_address(&config)?;
            let db = connect_database(&config).await?;
            server::serve(addr, AppState::from_config(db, &config)).await
        }
        Commands::Query {
            sql,
            format,
            out,
            admin_password,
        } => {
            let config = config()?;
            let source = open_source(&config).await?;
            let result = cli::execute_one_shot(
                &source,
                &sql,
                admin_password.as_deref(),
                config.admin.password.as_deref(),
            )
            .await?;
            print_result(&result, format, out.as_deref())
        }
        Commands::Table {
            name,
            watch,
            interval,
            format,
            out,
        } => {
            let table: FlightTable = name.parse()?;
            let config = config()?;
            let source = open_source(&config).await?;

            if watch {
                let interval = interval.unwrap_or(config.dashboard.auto_refresh_secs);
                info!(%table, interval, "Watching table");
                return dashboard::watch_table(
                    &source,
                    table,
                    Duration::from_secs(interval.max(1)),
                    render::terminal_width(),
                    &mut io::stdout(),
                    None,
                )
                .await;
            }

            let result = source.preview(table).await?;
            print_result(&result, format, out.as_deref())
        }
        Commands::Shell => {
            let config = config()?;
            let source = open_source(&config).await?;
            let mut dashboard = Dashboard::new(source, DashboardSettings::from_config(&config));
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            dashboard.run_shell(stdin, &mut io::stdout()).await
        }
    }
}

/// Loads configuration: file, then environment, then CLI flags, then the
/// keyring for anything still missing.
fn load_config(cli: &Cli) -> Result<Config> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());

    let mut config = Config::load_from_file(&config_path)?;
    config.apply_env_defaults();
    cli.apply_overrides(&mut config);
    SecretStorage::new().fill_missing(&mut config);
    Ok(config)
}

async fn connect_database(config: &Config) -> Result<Arc<dyn DatabaseClient>> {
    if !config.database.is_configured() {
        return Err(FlightError::config(
            "No database configured. Set DATABASE_URL, pass --database-url, or add [database] to the config file",
        ));
    }

    info!("Connecting to {}", config.database.display_string());
    let client = db::connect(&config.database).await?;
    Ok(Arc::from(client))
}

async fn open_source(config: &Config) -> Result<DataSource> {
    match &config.dashboard.remote_url {
        Some(url) => {
            info!(%url, "Using remote forwarder");
            Ok(DataSource::Remote(RemoteClient::new(url)?))
        }
        None => Ok(DataSource::Local(connect_database(config).await?)),
    }
}

fn print_result(result: &QueryResult, format: OutputFormat, out: Option<&Path>) -> Result<()> {
    let rendered = format.render(result, usize::from(render::terminal_width()))?;

    match out {
        Some(path) => {
            std::fs::write(path, rendered).map_err(|e| {
                FlightError::export(format!("Failed to write {}: {e}", path.display()))
            })?;
            info!(path = %path.display(), rows = result.row_count, "Wrote result");
            Ok(())
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .and_then(|()| stdout.flush())
                .map_err(|e| FlightError::internal(format!("Failed to write output: {e}")))
        }
    }
}

fn run_secret(action: SecretAction) -> Result<()> {
    match action {
        SecretAction::Set { key, value } => {
            let value = match value {
                Some(value) => value,
                None => read_secret(key)?,
            };
            if value.is_empty() {
                return Err(FlightError::invalid_input("Secret must not be empty"));
            }

            SecretStorage::new().store(key, &value)?;
            println!(
                "Stored {key} ({}) in the OS keyring",
                SecretStorage::mask_secret(&value)
            );
            Ok(())
        }
    }
}

fn read_secret(key: SecretKey) -> Result<String> {
    eprint!("Enter {key}: ");
    io::stderr()
        .flush()
        .map_err(|e| FlightError::internal(format!("Failed to write prompt: {e}")))?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .map_err(|e| FlightError::internal(format!("Failed to read stdin: {e}")))?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bibkeeper::cli::{Cli, Commands, ConfigAction};
use bibkeeper::commands::{
    ListOptions, cmd_add, cmd_browse, cmd_config_get, cmd_config_set, cmd_config_show, cmd_edit,
    cmd_list, cmd_remove, cmd_search, cmd_show,
};
use bibkeeper::{BibError, Collection, Config, HttpBackend, Result};

const LOG_ENV: &str = "BIBKEEPER_LOG";

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("bibkeeper=debug")
    } else {
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn open_collection() -> Result<(Config, Collection<HttpBackend>)> {
    let config = Config::load()?;
    let collection = Collection::from_config(&config)?;
    Ok((config, collection))
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::List {
            page,
            all,
            filters,
            output,
        } => {
            let (_, collection) = open_collection()?;
            let options = ListOptions {
                page,
                all,
                criteria: filters.into_criteria(),
            };
            cmd_list(&collection, options, output).await
        }
        Commands::Search {
            query,
            filters,
            output,
        } => {
            let (_, collection) = open_collection()?;
            cmd_search(&collection, &query, filters.into_criteria(), output).await
        }
        Commands::Show { id, local, output } => {
            let (_, collection) = open_collection()?;
            cmd_show(&collection, &id, local, output).await
        }
        Commands::Add { fields, output } => {
            let (_, collection) = open_collection()?;
            cmd_add(&collection, fields, output).await
        }
        Commands::Edit { id, fields, output } => {
            let (_, collection) = open_collection()?;
            cmd_edit(&collection, &id, fields, output).await
        }
        Commands::Rm { id, output } => {
            let (_, collection) = open_collection()?;
            cmd_remove(&collection, &id, output).await
        }
        Commands::Browse { filters } => {
            let (config, collection) = open_collection()?;
            cmd_browse(
                Arc::new(collection),
                filters.into_criteria(),
                config.search_debounce(),
            )
            .await
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { output } => cmd_config_show(output),
            ConfigAction::Get { key, output } => cmd_config_get(&key, output),
            ConfigAction::Set { key, value, output } => cmd_config_set(&key, &value, output),
        },
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = match &e {
                // Network failures get the friendly wording, details go to the log
                BibError::Offline(_)
                | BibError::Unauthorized
                | BibError::Forbidden
                | BibError::Server { .. }
                | BibError::Decoding(_) => {
                    tracing::debug!(error = %e, "command failed");
                    e.user_message()
                }
                _ => e.to_string(),
            };
            eprintln!("Error: {message}");
            ExitCode::FAILURE
        }
    }
}

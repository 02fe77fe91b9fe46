mod dao;
mod model;
mod service;

use std::sync::Arc;

use crate::dao::billing::BillingDao;
use crate::dao::connection::MongoConnection;
use crate::model::apperror::{ApplicationError, ErrorType};
use crate::model::config::{ApplicationArguments, Command, Config, DatabaseSettings, LoggingConfig};
use crate::service::provisioner::SchemaProvisioner;
use crate::service::seeder::{SeedData, SeedService};
use crate::service::verifier::RelationVerifier;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/**
 * Entry point. Opens the connection once, runs the requested command and closes the connection on every path.
 */
#[tokio::main]
async fn main() -> std::io::Result<()> {
    dotenv::dotenv().ok();
    let args = ApplicationArguments::parse();

    let config = get_config(args.config_file.as_deref())?;

    init_tracing(&config.logging)?;

    let settings = DatabaseSettings::resolve(&args, &config.database).inspect_err(|err| tracing::error!("Fatal error: {err}"))?;
    let connection = MongoConnection::open(&settings).await.inspect_err(|err| tracing::error!("Fatal error: {err}"))?;

    let result = run_command(args.command, &config, &connection).await;
    connection.close().await;

    if let Err(err) = result {
        tracing::error!("Fatal error: {err}");
        return Err(err.into());
    }
    Ok(())
}

/**
 * Runs one command against an open connection.
 *
 * #Arguments
 * `command`: The command to run.
 * `config`: Application configuration.
 * `connection`: The open connection.
 *
 * #Returns
 * A `Result` indicating success or the fatal `ApplicationError`.
 */
async fn run_command(command: Command, config: &Config, connection: &MongoConnection) -> Result<(), ApplicationError> {
    let billing_dao = BillingDao::new(connection.database().clone());
    let verifier = RelationVerifier::new(config.data.sample_size);
    match command {
        Command::Provision => SchemaProvisioner::new().provision(&billing_dao).await,
        Command::Seed => seed(config, &billing_dao, &verifier).await,
        Command::Verify => verifier.verify(&billing_dao).await.map(|_| ()),
        Command::All => {
            SchemaProvisioner::new().provision(&billing_dao).await?;
            seed(config, &billing_dao, &verifier).await
        }
    }
}

async fn seed(config: &Config, billing_dao: &BillingDao, verifier: &RelationVerifier) -> Result<(), ApplicationError> {
    let seed_data = SeedData::read(&config.data)?;
    SeedService::new().seed(billing_dao, seed_data).await?;
    verifier.verify(billing_dao).await?;
    Ok(())
}

/**
 * Initializes logging to stdout and, when configured, to a log file.
 *
 * #Arguments
 * `logging_config`: Logging configuration.
 *
 * #Returns
 * A `Result` indicating success or failure.
 */
fn init_tracing(logging_config: &LoggingConfig) -> Result<(), std::io::Error> {
    let mut env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    for directive in &logging_config.directives {
        env_filter = env_filter.add_directive(directive.parse().map_err(|err| std::io::Error::other(format!("Invalid logging directive {directive}: {err}")))?);
    }

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_target(logging_config.target)
        .with_thread_ids(logging_config.thread_ids)
        .with_line_number(logging_config.line_number)
        .with_level(logging_config.level)
        .with_ansi(logging_config.ansi);

    let file_layer = match &logging_config.logfile {
        Some(logfile) => {
            let file = std::fs::OpenOptions::new().create(true).append(true).open(logfile).map_err(|err| std::io::Error::other(format!("Failed to open log file {logfile}: {err}")))?;
            Some(tracing_subscriber::fmt::layer().with_ansi(false).with_target(logging_config.target).with_line_number(logging_config.line_number).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry().with(env_filter).with(stdout_layer).with(file_layer).try_init().map_err(|err| std::io::Error::other(format!("Failed to initialize logging: {err}")))?;
    Ok(())
}

/**
 * Reads the configuration from the specified file, or returns the defaults.
 *
 * #Arguments
 * `config_file`: The path to the configuration file.
 *
 * #Returns
 * A `Result` containing the parsed `Config` or an `ApplicationError` if reading or parsing fails.
*/
fn get_config(config_file: Option<&str>) -> Result<Config, ApplicationError> {
    let Some(config_file) = config_file else {
        return Ok(Config::default());
    };
    let config_str: String = std::fs::read_to_string(config_file).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to read config file: {err}")))?;
    let config: Config = toml::from_str(&config_str).map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to parse config file: {err}")))?;
    Ok(config)
}

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Command-line arguments for the application.
 */
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct ApplicationArguments {
    /**
     * Path to the configuration file. Defaults are used when omitted.
     */
    #[arg(short, long)]
    pub config_file: Option<String>,
    /**
     * MongoDB connection string.
     */
    #[arg(long, env = "MONGO_URI")]
    pub mongo_uri: Option<String>,
    /**
     * Name of the database to provision and seed.
     */
    #[arg(long, env = "MONGO_DB_NAME")]
    pub db_name: Option<String>,
    /**
     * Step to run.
     */
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drop and recreate the collections with validators and indexes
    Provision,
    /// Clear the collections, load the seed files and verify the relations
    Seed,
    /// Verify that every expense record references an existing building
    Verify,
    /// Provision followed by seed
    All,
}

/**
 * Represents the configuration for the application.
 */
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /**
     * Logging configuration for the application.
     */
    pub logging: LoggingConfig,
    /**
     * Location of the seed files.
     */
    pub data: DataConfig,
    /**
     * Database configuration for the application.
     */
    pub database: DatabaseConfig,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /**
     * Whether to log the target of the log message.
     */
    pub target: bool,
    /**
     * Whether to log thread IDs .
     */
    pub thread_ids: bool,
    /**
     * Whether to log line numbers.
     */
    pub line_number: bool,
    /**
     * Whether to log the log level.
     */
    pub level: bool,
    /**
     * Whether to use ANSI colors in logs.
     */
    pub ansi: bool,
    /**
     * Optional log file written in addition to stdout.
     */
    pub logfile: Option<String>,
    /**
     * Additional directives for logging configuration.
     */
    pub directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig { target: false, thread_ids: false, line_number: false, level: true, ansi: true, logfile: None, directives: vec![] }
    }
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataConfig {
    /**
     * JSON array of administrators.
     */
    pub administrators_file: String,
    /**
     * JSON array of buildings with embedded apartments.
     */
    pub buildings_file: String,
    /**
     * JSON array of common-expense records.
     */
    pub expenses_file: String,
    /**
     * Number of valid relations printed by the verifier.
     */
    pub sample_size: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            administrators_file: "data/administradores.json".to_string(),
            buildings_file: "data/edificios.json".to_string(),
            expenses_file: "data/gastos_comunes.json".to_string(),
            sample_size: 5,
        }
    }
}

#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseConfig {
    pub connection_string: Option<String>,
    pub database_name: Option<String>,
}

/**
 * Resolved connection settings.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseSettings {
    pub connection_string: String,
    pub database_name: String,
}

impl DatabaseSettings {
    /**
     * Resolves the connection settings. Command line and environment take precedence over the configuration file.
     *
     * #Arguments
     * `args`: Parsed command line arguments.
     * `database_config`: Database section of the configuration file.
     *
     * #Returns
     * The settings, or an `ApplicationError` naming the missing value.
     */
    pub fn resolve(args: &ApplicationArguments, database_config: &DatabaseConfig) -> Result<Self, ApplicationError> {
        let connection_string = args
            .mongo_uri
            .clone()
            .or_else(|| database_config.connection_string.clone())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "MONGO_URI is not set".to_string()))?;
        let database_name = args
            .db_name
            .clone()
            .or_else(|| database_config.database_name.clone())
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ApplicationError::new(ErrorType::Initialization, "MONGO_DB_NAME is not set".to_string()))?;
        Ok(DatabaseSettings { connection_string, database_name })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn arguments(mongo_uri: Option<&str>, db_name: Option<&str>) -> ApplicationArguments {
        ApplicationArguments { config_file: None, mongo_uri: mongo_uri.map(str::to_string), db_name: db_name.map(str::to_string), command: Command::Seed }
    }

    #[test]
    fn test_config_serialization() {
        let config = Config {
            logging: LoggingConfig { logfile: Some("/tmp/seeder.log".to_string()), directives: vec!["gastos_comunes_seeder=debug".to_string()], ..LoggingConfig::default() },
            data: DataConfig { sample_size: 3, ..DataConfig::default() },
            database: DatabaseConfig { connection_string: Some("mongodb://localhost:27017".to_string()), database_name: Some("gastos".to_string()) },
        };
        let serialized = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(config.logging.target, deserialized.logging.target);
        assert_eq!(config.logging.thread_ids, deserialized.logging.thread_ids);
        assert_eq!(config.logging.line_number, deserialized.logging.line_number);
        assert_eq!(config.logging.level, deserialized.logging.level);
        assert_eq!(config.logging.ansi, deserialized.logging.ansi);
        assert_eq!(config.logging.logfile, deserialized.logging.logfile);
        assert_eq!(config.logging.directives, deserialized.logging.directives);
        assert_eq!(deserialized.data.administrators_file, "data/administradores.json");
        assert_eq!(deserialized.data.sample_size, 3);
        assert_eq!(deserialized.database.database_name, Some("gastos".to_string()));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let deserialized: Config = toml::from_str("[data]\nexpensesFile = \"other.json\"\n").unwrap();
        assert_eq!(deserialized.data.expenses_file, "other.json");
        assert_eq!(deserialized.data.buildings_file, "data/edificios.json");
        assert_eq!(deserialized.data.sample_size, 5);
        assert!(deserialized.logging.level);
        assert!(deserialized.database.connection_string.is_none());
    }

    #[test]
    fn test_resolve_prefers_arguments() {
        let database_config = DatabaseConfig { connection_string: Some("mongodb://file:27017".to_string()), database_name: Some("file_db".to_string()) };
        let settings = DatabaseSettings::resolve(&arguments(Some("mongodb://env:27017"), None), &database_config).unwrap();
        assert_eq!(settings.connection_string, "mongodb://env:27017");
        assert_eq!(settings.database_name, "file_db");
    }

    #[test]
    fn test_resolve_missing_uri() {
        let err = DatabaseSettings::resolve(&arguments(None, Some("gastos")), &DatabaseConfig::default()).unwrap_err();
        assert_eq!(err.error_type, ErrorType::Initialization);
        assert!(err.message.contains("MONGO_URI"));
    }

    #[test]
    fn test_resolve_blank_database_name() {
        let err = DatabaseSettings::resolve(&arguments(Some("mongodb://localhost"), Some("  ")), &DatabaseConfig::default()).unwrap_err();
        assert!(err.message.contains("MONGO_DB_NAME"));
    }

    #[test]
    fn test_parse_subcommand() {
        let args = ApplicationArguments::try_parse_from(["gastos_comunes_seeder", "--mongo-uri", "mongodb://localhost", "--db-name", "gastos", "all"]).unwrap();
        assert_eq!(args.command, Command::All);
        assert_eq!(args.db_name, Some("gastos".to_string()));
    }
}

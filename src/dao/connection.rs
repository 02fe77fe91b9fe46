use mongodb::{Client, Database, bson::doc};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    config::DatabaseSettings,
};

/**
 * Connection opened once per run and passed to each component.
 */
pub struct MongoConnection {
    client: Client,
    database: Database,
}

impl MongoConnection {
    /**
     * Connects to MongoDB and pings the server so that a bad connection string fails immediately.
     *
     * # Arguments
     * `settings`: Connection string and database name.
     *
     * # Returns
     * The open connection or an `Initialization` error.
     */
    pub async fn open(settings: &DatabaseSettings) -> Result<Self, ApplicationError> {
        let client = Client::with_uri_str(&settings.connection_string)
            .await
            .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to create MongoDB client: {err}")))?;
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|err| ApplicationError::new(ErrorType::Initialization, format!("Failed to ping MongoDB: {err}")))?;
        tracing::info!("Connected to MongoDB, database {}", settings.database_name);
        let database = client.database(&settings.database_name);
        Ok(MongoConnection { client, database })
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    /**
     * Closes the connection. Consumes the handle.
     */
    pub async fn close(self) {
        self.client.shutdown().await;
        tracing::info!("Connection closed");
    }
}

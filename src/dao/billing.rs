use futures_util::TryStreamExt;
use mongodb::{
    Collection, Database, IndexModel,
    bson::{self, Document, doc, oid::ObjectId},
    error::{ErrorKind, WriteFailure},
    options::{ValidationAction, ValidationLevel},
};
use serde::Serialize;
use tracing::instrument;

use crate::dao::{
    schema::{ADMINISTRATORS, BUILDINGS, EXPENSES},
    store::{DocumentStore, SchemaStore},
};
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    db::{AdministratorDocument, BuildingDocument, ExpenseDocument},
    models::RelationCheck,
};

/**
 * Server error code for a unique index violation.
 */
const DUPLICATE_KEY: i32 = 11000;

/**
 * Server error code for a document rejected by the collection validator.
 */
const DOCUMENT_VALIDATION_FAILURE: i32 = 121;

/**
 * Server error code returned when dropping a collection that does not exist.
 */
const NAMESPACE_NOT_FOUND: i32 = 26;

/**
 * DAO for the billing collections.
 */
pub struct BillingDao {
    /**
     * Database holding the three collections.
     */
    database: Database,
}

impl BillingDao {
    /**
     * Creates a new instance of `BillingDao`.
     *
     * # Arguments
     * `database`: Handle of the database to operate on.
     *
     * # Returns
     * A new instance of `BillingDao`.
     */
    pub fn new(database: Database) -> Self {
        BillingDao { database }
    }

    fn documents(&self, name: &str) -> Collection<Document> {
        self.database.collection::<Document>(name)
    }

    async fn insert<T: Serialize + Send + Sync>(&self, name: &str, document: &T) -> Result<ObjectId, ApplicationError> {
        let result = self.database.collection::<T>(name).insert_one(document).await.map_err(|err| Self::handle_database_error(&err, name))?;
        result.inserted_id.as_object_id().ok_or_else(|| ApplicationError::new(ErrorType::DatabaseError, format!("Inserted id in {name} is not an ObjectId: {}", result.inserted_id)))
    }

    /**
     * Handles database errors and maps them to application errors.
     *
     * # Arguments
     * `error`: The driver error.
     * `collection`: Collection the operation ran against.
     *
     * # Returns
     * An `ApplicationError` corresponding to the database error.
     */
    fn handle_database_error(error: &mongodb::error::Error, collection: &str) -> ApplicationError {
        if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = error.kind.as_ref() {
            tracing::debug!("Write error in {}: {:?}", collection, write_error);
            if write_error.code == DUPLICATE_KEY {
                return ApplicationError::new(ErrorType::ConstraintViolation, format!("Already exists in {collection}: {}", write_error.message));
            } else if write_error.code == DOCUMENT_VALIDATION_FAILURE {
                return ApplicationError::new(ErrorType::Validation, format!("Document failed validation for {collection}"));
            }
        }
        tracing::error!("Unhandled database error in {}: {}", collection, error);
        ApplicationError::new(ErrorType::DatabaseError, format!("Database operation on {collection} failed: {error}"))
    }

    fn is_namespace_not_found(error: &mongodb::error::Error) -> bool {
        matches!(error.kind.as_ref(), ErrorKind::Command(command_error) if command_error.code == NAMESPACE_NOT_FOUND)
    }
}

impl SchemaStore for BillingDao {
    #[instrument(skip(self))]
    async fn drop_collection(&self, name: &str) -> Result<(), ApplicationError> {
        match self.documents(name).drop().await {
            Ok(()) => Ok(()),
            Err(err) if Self::is_namespace_not_found(&err) => {
                tracing::debug!("Collection {} did not exist", name);
                Ok(())
            }
            Err(err) => Err(Self::handle_database_error(&err, name)),
        }
    }

    #[instrument(skip(self, validator))]
    async fn create_collection(&self, name: &str, validator: Document) -> Result<(), ApplicationError> {
        self.database
            .create_collection(name)
            .validator(validator)
            .validation_level(ValidationLevel::Strict)
            .validation_action(ValidationAction::Error)
            .await
            .map_err(|err| Self::handle_database_error(&err, name))
    }

    #[instrument(skip(self, index))]
    async fn create_index(&self, name: &str, index: IndexModel) -> Result<(), ApplicationError> {
        let result = self.documents(name).create_index(index).await.map_err(|err| Self::handle_database_error(&err, name))?;
        tracing::debug!("Created index {} on {}", result.index_name, name);
        Ok(())
    }
}

impl DocumentStore for BillingDao {
    #[instrument(skip(self))]
    async fn collection_names(&self) -> Result<Vec<String>, ApplicationError> {
        self.database.list_collection_names().await.map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to list collections: {err}")))
    }

    #[instrument(skip(self))]
    async fn clear_collection(&self, name: &str) -> Result<u64, ApplicationError> {
        let result = self.documents(name).delete_many(doc! {}).await.map_err(|err| Self::handle_database_error(&err, name))?;
        Ok(result.deleted_count)
    }

    #[instrument(skip(self, document), fields(numrun = document.numrun))]
    async fn insert_administrator(&self, document: &AdministratorDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(ADMINISTRATORS, document).await
    }

    #[instrument(skip(self, document), fields(id_edificio_sql = document.id_edificio_sql))]
    async fn insert_building(&self, document: &BuildingDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(BUILDINGS, document).await
    }

    #[instrument(skip(self, document), fields(nro_depto = document.nro_depto, anno_mes = document.anno_mes))]
    async fn insert_expense(&self, document: &ExpenseDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(EXPENSES, document).await
    }

    #[instrument(skip(self))]
    async fn count_documents(&self, name: &str) -> Result<u64, ApplicationError> {
        self.documents(name).count_documents(doc! {}).await.map_err(|err| Self::handle_database_error(&err, name))
    }

    #[instrument(skip(self))]
    async fn relation_checks(&self) -> Result<Vec<RelationCheck>, ApplicationError> {
        let pipeline = vec![
            doc! { "$lookup": { "from": BUILDINGS, "localField": "edificio_id", "foreignField": "_id", "as": "edificio" } },
            doc! {
                "$project": {
                    "nro_depto": 1,
                    "monto_total": 1,
                    "edificio_id": 1,
                    "edificio_nombre": { "$arrayElemAt": ["$edificio.nombre", 0] },
                    "tiene_relacion": { "$gt": [{ "$size": "$edificio" }, 0] }
                }
            },
        ];
        let cursor = self.documents(EXPENSES).aggregate(pipeline).await.map_err(|err| Self::handle_database_error(&err, EXPENSES))?;
        let documents: Vec<Document> = cursor.try_collect().await.map_err(|err| Self::handle_database_error(&err, EXPENSES))?;
        documents
            .into_iter()
            .map(|document| bson::from_document(document).map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("Failed to read relation check: {err}"))))
            .collect()
    }
}

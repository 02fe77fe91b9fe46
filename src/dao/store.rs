use std::future::Future;

use mongodb::{IndexModel, bson::Document, bson::oid::ObjectId};

use crate::model::{
    apperror::ApplicationError,
    db::{AdministratorDocument, BuildingDocument, ExpenseDocument},
    models::RelationCheck,
};

/**
 * Operations used by the schema provisioner.
 */
pub trait SchemaStore {
    /**
     * Drops a collection. A collection that does not exist is not an error.
     */
    fn drop_collection(&self, name: &str) -> impl Future<Output = Result<(), ApplicationError>>;

    /**
     * Creates a collection with a `$jsonSchema` validator.
     */
    fn create_collection(&self, name: &str, validator: Document) -> impl Future<Output = Result<(), ApplicationError>>;

    /**
     * Creates one index on a collection.
     */
    fn create_index(&self, name: &str, index: IndexModel) -> impl Future<Output = Result<(), ApplicationError>>;
}

/**
 * Operations used by the seed loader and the relation verifier.
 */
pub trait DocumentStore {
    /**
     * Names of the collections that exist in the database.
     */
    fn collection_names(&self) -> impl Future<Output = Result<Vec<String>, ApplicationError>>;

    /**
     * Deletes every document in a collection and returns how many were removed.
     */
    fn clear_collection(&self, name: &str) -> impl Future<Output = Result<u64, ApplicationError>>;

    fn insert_administrator(&self, document: &AdministratorDocument) -> impl Future<Output = Result<ObjectId, ApplicationError>>;

    fn insert_building(&self, document: &BuildingDocument) -> impl Future<Output = Result<ObjectId, ApplicationError>>;

    fn insert_expense(&self, document: &ExpenseDocument) -> impl Future<Output = Result<ObjectId, ApplicationError>>;

    fn count_documents(&self, name: &str) -> impl Future<Output = Result<u64, ApplicationError>>;

    /**
     * Joins every expense record against the buildings collection on `edificio_id`.
     */
    fn relation_checks(&self) -> impl Future<Output = Result<Vec<RelationCheck>, ApplicationError>>;
}

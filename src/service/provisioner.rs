use crate::{
    dao::{
        schema::{CollectionSchema, collection_schemas},
        store::SchemaStore,
    },
    model::apperror::ApplicationError,
};

/**
 * Drops and recreates the billing collections with validators and indexes.
 */
pub struct SchemaProvisioner {
    /**
     * Collections to provision, parents first.
     */
    schemas: Vec<CollectionSchema>,
}

impl SchemaProvisioner {
    /**
     * Creates a new instance of `SchemaProvisioner` for the administrator, building and expense collections.
     *
     * # Returns
     * A new instance of `SchemaProvisioner`.
     */
    pub fn new() -> Self {
        SchemaProvisioner { schemas: collection_schemas() }
    }

    /**
     * Provisions every collection. Destroys existing data. The first failure aborts and nothing is rolled back.
     *
     * # Arguments
     * `store`: Store to provision.
     *
     * # Returns
     * A Result indicating success or the first `ApplicationError`.
     */
    pub async fn provision<S: SchemaStore>(&self, store: &S) -> Result<(), ApplicationError> {
        for schema in &self.schemas {
            store.drop_collection(schema.name).await?;
            tracing::info!("Collection {} dropped", schema.name);
            store.create_collection(schema.name, schema.validator.clone()).await?;
            for index in &schema.indexes {
                store.create_index(schema.name, index.clone()).await?;
            }
            tracing::info!("Collection {} created with {} indexes", schema.name, schema.indexes.len());
        }
        tracing::info!("All collections created");
        Ok(())
    }
}

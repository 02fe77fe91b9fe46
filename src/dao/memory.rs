use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use mongodb::{
    IndexModel,
    bson::{self, Bson, Document, oid::ObjectId},
};
use serde::Serialize;

use crate::dao::{
    schema::{self, BUILDINGS, EXPENSES},
    store::{DocumentStore, SchemaStore},
};
use crate::model::{
    apperror::{ApplicationError, ErrorType},
    db::{AdministratorDocument, BuildingDocument, ExpenseDocument},
    models::{Amount, RelationCheck},
};

fn amount(document: &Document, key: &str) -> Result<Amount, ApplicationError> {
    match document.get(key) {
        Some(Bson::Int32(value)) => Ok(Amount::Integer(i64::from(*value))),
        Some(Bson::Int64(value)) => Ok(Amount::Integer(*value)),
        Some(Bson::Double(value)) => Ok(Amount::Decimal(*value)),
        other => Err(ApplicationError::new(ErrorType::DatabaseError, format!("{key} is not a number: {other:?}"))),
    }
}

/**
 * Fields listed as required by a `$jsonSchema` validator.
 */
pub fn required_fields(validator: &Document) -> Vec<String> {
    validator
        .get_document("$jsonSchema")
        .and_then(|schema| schema.get_array("required"))
        .map(|required| required.iter().filter_map(Bson::as_str).map(str::to_string).collect())
        .unwrap_or_default()
}

#[derive(Default)]
struct Collection {
    documents: Vec<Document>,
    required: Vec<String>,
    unique_keys: Vec<String>,
}

#[derive(Default)]
struct State {
    collections: BTreeMap<String, Collection>,
    operations: Vec<String>,
    fail_on: Option<String>,
}

/**
 * In-memory store emulating the required-field validators, the unique indexes and the `$lookup` join.
 */
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    /**
     * Store with all collections created as the provisioner would.
     */
    pub fn provisioned() -> Self {
        let store = MemoryStore::new();
        {
            let mut state = store.state.lock().unwrap();
            for collection_schema in schema::collection_schemas() {
                let collection = state.collections.entry(collection_schema.name.to_string()).or_default();
                collection.required = required_fields(&collection_schema.validator);
                collection.unique_keys = collection_schema.indexes.iter().filter(|index| is_unique(index)).flat_map(|index| index.keys.keys().cloned()).collect();
            }
        }
        store
    }

    /**
     * Makes the named operation fail, e.g. `index:edificios:administrador_id`.
     */
    pub fn fail_on(&self, operation: &str) {
        self.state.lock().unwrap().fail_on = Some(operation.to_string());
    }

    /**
     * Operations executed so far, in order.
     */
    pub fn operations(&self) -> Vec<String> {
        self.state.lock().unwrap().operations.clone()
    }

    pub fn documents(&self, name: &str) -> Vec<Document> {
        self.state.lock().unwrap().collections.get(name).map(|collection| collection.documents.clone()).unwrap_or_default()
    }

    pub fn create_unvalidated(&self, name: &str) {
        self.state.lock().unwrap().collections.entry(name.to_string()).or_default();
    }

    /**
     * Removes a building behind the loader's back to produce a dangling reference.
     */
    pub fn remove_building(&self, id_edificio_sql: i64) {
        let mut state = self.state.lock().unwrap();
        if let Some(collection) = state.collections.get_mut(BUILDINGS) {
            collection.documents.retain(|document| document.get_i64("id_edificio_sql").ok() != Some(id_edificio_sql));
        }
    }

    fn run(&self, operation: String) -> Result<std::sync::MutexGuard<'_, State>, ApplicationError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_on.as_deref() == Some(operation.as_str()) {
            return Err(ApplicationError::new(ErrorType::DatabaseError, format!("Injected failure for {operation}")));
        }
        state.operations.push(operation);
        Ok(state)
    }

    fn insert<T: Serialize>(&self, name: &str, value: &T) -> Result<ObjectId, ApplicationError> {
        let mut state = self.run(format!("insert:{name}"))?;
        let mut document = bson::to_document(value).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Failed to serialize document: {err}")))?;
        let collection = state.collections.entry(name.to_string()).or_default();
        if let Some(field) = collection.required.iter().find(|field| matches!(document.get(field.as_str()), None | Some(Bson::Null))) {
            return Err(ApplicationError::new(ErrorType::Validation, format!("Document failed validation, missing {field}")));
        }
        for key in &collection.unique_keys {
            if let Some(value) = document.get(key) {
                if collection.documents.iter().any(|existing| existing.get(key) == Some(value)) {
                    return Err(ApplicationError::new(ErrorType::ConstraintViolation, format!("Duplicate key {key}: {value}")));
                }
            }
        }
        let id = ObjectId::new();
        document.insert("_id", id);
        collection.documents.push(document);
        Ok(id)
    }
}

fn is_unique(index: &IndexModel) -> bool {
    index.options.as_ref().and_then(|options| options.unique).unwrap_or(false)
}

impl SchemaStore for MemoryStore {
    async fn drop_collection(&self, name: &str) -> Result<(), ApplicationError> {
        let mut state = self.run(format!("drop:{name}"))?;
        state.collections.remove(name);
        Ok(())
    }

    async fn create_collection(&self, name: &str, validator: Document) -> Result<(), ApplicationError> {
        let mut state = self.run(format!("create:{name}"))?;
        if state.collections.contains_key(name) {
            return Err(ApplicationError::new(ErrorType::DatabaseError, format!("Collection {name} already exists")));
        }
        state.collections.insert(name.to_string(), Collection { required: required_fields(&validator), ..Collection::default() });
        Ok(())
    }

    async fn create_index(&self, name: &str, index: IndexModel) -> Result<(), ApplicationError> {
        let index_name = index.options.as_ref().and_then(|options| options.name.clone()).unwrap_or_default();
        let mut state = self.run(format!("index:{name}:{index_name}"))?;
        let collection = state.collections.entry(name.to_string()).or_default();
        if is_unique(&index) {
            collection.unique_keys.extend(index.keys.keys().cloned());
        }
        Ok(())
    }
}

impl DocumentStore for MemoryStore {
    async fn collection_names(&self) -> Result<Vec<String>, ApplicationError> {
        Ok(self.state.lock().unwrap().collections.keys().cloned().collect())
    }

    async fn clear_collection(&self, name: &str) -> Result<u64, ApplicationError> {
        let mut state = self.run(format!("clear:{name}"))?;
        let removed = state.collections.get_mut(name).map(|collection| collection.documents.drain(..).count()).unwrap_or(0);
        Ok(removed as u64)
    }

    async fn insert_administrator(&self, document: &AdministratorDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(schema::ADMINISTRATORS, document)
    }

    async fn insert_building(&self, document: &BuildingDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(BUILDINGS, document)
    }

    async fn insert_expense(&self, document: &ExpenseDocument) -> Result<ObjectId, ApplicationError> {
        self.insert(EXPENSES, document)
    }

    async fn count_documents(&self, name: &str) -> Result<u64, ApplicationError> {
        Ok(self.documents(name).len() as u64)
    }

    async fn relation_checks(&self) -> Result<Vec<RelationCheck>, ApplicationError> {
        let buildings: HashMap<ObjectId, String> = self
            .documents(BUILDINGS)
            .iter()
            .filter_map(|building| Some((building.get_object_id("_id").ok()?, building.get_str("nombre").ok()?.to_string())))
            .collect();
        self.documents(EXPENSES)
            .iter()
            .map(|expense| {
                let edificio_id = expense.get_object_id("edificio_id").map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("{err}")))?;
                let edificio_nombre = buildings.get(&edificio_id).cloned();
                Ok(RelationCheck {
                    nro_depto: expense.get_i32("nro_depto").map_err(|err| ApplicationError::new(ErrorType::DatabaseError, format!("{err}")))?,
                    monto_total: amount(expense, "monto_total")?,
                    edificio_id,
                    tiene_relacion: edificio_nombre.is_some(),
                    edificio_nombre,
                })
            })
            .collect()
    }
}

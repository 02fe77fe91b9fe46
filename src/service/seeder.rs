use std::collections::HashMap;

use mongodb::bson::oid::ObjectId;
use serde_json::Value;

use crate::{
    dao::{
        schema::{ADMINISTRATORS, BUILDINGS, CLEAR_ORDER, EXPENSES},
        seedfile::{parse_record, read_seed_file, record_key},
        store::DocumentStore,
    },
    model::{
        apperror::{ApplicationError, ErrorType},
        config::DataConfig,
        db::{AdministratorDocument, BuildingDocument, ExpenseDocument},
        models::{AdministratorSeed, BuildingSeed, ExpenseSeed, ItemOutcome, SeedReport, StageReport},
    },
};

/**
 * Lookup table from a legacy numeric identifier to the generated document id. Lives for one run.
 */
#[derive(Debug, Default)]
pub struct IdentifierMap {
    ids: HashMap<i64, ObjectId>,
}

impl IdentifierMap {
    pub fn register(&mut self, legacy_id: i64, id: ObjectId) {
        self.ids.insert(legacy_id, id);
    }

    pub fn resolve(&self, legacy_id: i64) -> Option<ObjectId> {
        self.ids.get(&legacy_id).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /**
     * Entries ordered by legacy identifier.
     */
    pub fn sorted(&self) -> Vec<(i64, ObjectId)> {
        let mut entries: Vec<(i64, ObjectId)> = self.ids.iter().map(|(legacy_id, id)| (*legacy_id, *id)).collect();
        entries.sort_by_key(|(legacy_id, _)| *legacy_id);
        entries
    }
}

/**
 * Raw records of the three seed files. Each record is converted while it is loaded.
 */
#[derive(Debug, Default)]
pub struct SeedData {
    pub administrators: Vec<Value>,
    pub buildings: Vec<Value>,
    pub expenses: Vec<Value>,
}

impl SeedData {
    /**
     * Reads the seed files. A missing file, or one that is not a JSON array, is fatal.
     *
     * # Arguments
     * `data_config`: Paths of the seed files.
     */
    pub fn read(data_config: &DataConfig) -> Result<Self, ApplicationError> {
        Ok(SeedData {
            administrators: read_seed_file(&data_config.administrators_file)?,
            buildings: read_seed_file(&data_config.buildings_file)?,
            expenses: read_seed_file(&data_config.expenses_file)?,
        })
    }
}

/**
 * Loads the seed data in dependency order, translating legacy identifiers into generated ids.
 */
pub struct SeedService;

impl SeedService {
    pub fn new() -> Self {
        SeedService
    }

    /**
     * Clears the collections and loads administrators, buildings and expense records.
     *
     * # Arguments
     * `store`: Store holding the provisioned collections.
     * `seed_data`: Parsed seed files.
     *
     * # Returns
     * Per-stage counters, or an `ApplicationError` if the collections are missing or cannot be cleared.
     * Failures of single records are counted, never returned.
     */
    pub async fn seed<S: DocumentStore>(&self, store: &S, seed_data: SeedData) -> Result<SeedReport, ApplicationError> {
        Self::ensure_collections(store).await?;
        Self::clear(store).await?;

        tracing::info!("Loading {} administrators", seed_data.administrators.len());
        let (administrator_ids, administrators) = self.load_administrators(store, seed_data.administrators).await;
        tracing::info!("Loading {} buildings", seed_data.buildings.len());
        let (building_ids, buildings) = self.load_buildings(store, seed_data.buildings, &administrator_ids).await;
        tracing::debug!("Building mapping holds {} entries", building_ids.len());
        for (id_edificio_sql, id) in building_ids.sorted() {
            tracing::debug!("Building mapping {} -> {}", id_edificio_sql, id);
        }
        tracing::info!("Loading {} expense records", seed_data.expenses.len());
        let expenses = self.load_expenses(store, seed_data.expenses, &building_ids).await;

        let report = SeedReport { administrators, buildings, expenses };
        Self::log_report(&report);
        Ok(report)
    }

    /**
     * Inserts administrators and maps `numrun` to the generated id. A malformed record or a duplicate `numrun` fails only that record.
     */
    pub async fn load_administrators<S: DocumentStore>(&self, store: &S, administrators: Vec<Value>) -> (IdentifierMap, StageReport) {
        let mut administrator_ids = IdentifierMap::default();
        let mut report = StageReport::default();
        for record in administrators {
            let outcome = self.load_administrator(store, record, &mut administrator_ids).await;
            report.record(&outcome);
        }
        (administrator_ids, report)
    }

    async fn load_administrator<S: DocumentStore>(&self, store: &S, record: Value, administrator_ids: &mut IdentifierMap) -> ItemOutcome {
        let administrator: AdministratorSeed = match parse_record(record.clone()) {
            Ok(administrator) => administrator,
            Err(err) => {
                tracing::error!("Invalid administrator record RUN {}: {}", record_key(&record, "numrun"), err);
                return ItemOutcome::Failed(err);
            }
        };
        let numrun = administrator.numrun;
        let name = format!("{} {}", administrator.pnombre, administrator.appaterno);
        match store.insert_administrator(&AdministratorDocument::from(administrator)).await {
            Ok(id) => {
                administrator_ids.register(numrun, id);
                tracing::info!("Inserted administrator {} (RUN {})", name, numrun);
                ItemOutcome::Inserted(id)
            }
            Err(err) => {
                tracing::error!("Failed to insert administrator RUN {}: {}", numrun, err);
                ItemOutcome::Failed(err)
            }
        }
    }

    /**
     * Inserts buildings whose administrator resolves and maps `id_edificio_sql` to the generated id.
     */
    pub async fn load_buildings<S: DocumentStore>(&self, store: &S, buildings: Vec<Value>, administrator_ids: &IdentifierMap) -> (IdentifierMap, StageReport) {
        let mut building_ids = IdentifierMap::default();
        let mut report = StageReport::default();
        for record in buildings {
            let outcome = match parse_record::<BuildingSeed>(record.clone()) {
                Ok(building) => self.load_building(store, building, administrator_ids, &mut building_ids).await,
                Err(err) => {
                    tracing::error!("Invalid building record ID SQL {}: {}", record_key(&record, "id_edificio_sql"), err);
                    ItemOutcome::Failed(err)
                }
            };
            report.record(&outcome);
        }
        (building_ids, report)
    }

    async fn load_building<S: DocumentStore>(&self, store: &S, building: BuildingSeed, administrator_ids: &IdentifierMap, building_ids: &mut IdentifierMap) -> ItemOutcome {
        let Some(administrador_id) = administrator_ids.resolve(building.numrun_administrador) else {
            tracing::warn!("Administrator not found: RUN {} for building {} (ID SQL {})", building.numrun_administrador, building.nombre, building.id_edificio_sql);
            return ItemOutcome::Skipped(format!("administrator {} not found", building.numrun_administrador));
        };
        let id_edificio_sql = building.id_edificio_sql;
        let nombre = building.nombre.clone();
        let document = BuildingDocument::from_seed(building, administrador_id);
        let apartments = document.departamentos.len();
        match store.insert_building(&document).await {
            Ok(id) => {
                building_ids.register(id_edificio_sql, id);
                tracing::info!("Inserted building {} (ID SQL {}) as {} with {} apartments", nombre, id_edificio_sql, id, apartments);
                ItemOutcome::Inserted(id)
            }
            Err(err) => {
                tracing::error!("Failed to insert building {} (ID SQL {}): {}", nombre, id_edificio_sql, err);
                ItemOutcome::Failed(err)
            }
        }
    }

    /**
     * Inserts expense records whose building resolves. Malformed, unresolved and rejected records are counted and skipped.
     */
    pub async fn load_expenses<S: DocumentStore>(&self, store: &S, expenses: Vec<Value>, building_ids: &IdentifierMap) -> StageReport {
        let mut report = StageReport::default();
        for record in expenses {
            let outcome = match parse_record::<ExpenseSeed>(record.clone()) {
                Ok(expense) => self.load_expense(store, expense, building_ids).await,
                Err(err) => {
                    tracing::error!("Invalid expense record depto {} period {}: {}", record_key(&record, "nro_depto"), record_key(&record, "anno_mes"), err);
                    ItemOutcome::Failed(err)
                }
            };
            report.record(&outcome);
        }
        report
    }

    async fn load_expense<S: DocumentStore>(&self, store: &S, expense: ExpenseSeed, building_ids: &IdentifierMap) -> ItemOutcome {
        let (nro_depto, anno_mes, monto_total) = (expense.nro_depto, expense.anno_mes, expense.monto_total);
        let Some(edificio_id) = building_ids.resolve(expense.id_edificio_sql) else {
            tracing::warn!("Building not found: ID SQL {} (depto {}, period {})", expense.id_edificio_sql, nro_depto, anno_mes);
            return ItemOutcome::Skipped(format!("building {} not found", expense.id_edificio_sql));
        };
        let document = match ExpenseDocument::from_seed(expense, edificio_id) {
            Ok(document) => document,
            Err(err) => {
                tracing::error!("Invalid expense record depto {} period {}: {}", nro_depto, anno_mes, err);
                return ItemOutcome::Failed(err);
            }
        };
        match store.insert_expense(&document).await {
            Ok(id) => {
                tracing::info!("Inserted expense depto {} period {} total {} building {}", nro_depto, anno_mes, monto_total, edificio_id);
                ItemOutcome::Inserted(id)
            }
            Err(err) => {
                tracing::error!("Failed to insert expense depto {} period {}: {}", nro_depto, anno_mes, err);
                ItemOutcome::Failed(err)
            }
        }
    }

    async fn ensure_collections<S: DocumentStore>(store: &S) -> Result<(), ApplicationError> {
        let existing = store.collection_names().await?;
        for name in [ADMINISTRATORS, BUILDINGS, EXPENSES] {
            if !existing.iter().any(|collection| collection == name) {
                return Err(ApplicationError::new(ErrorType::MissingCollection, format!("Collection {name} does not exist. Run the provision command first")));
            }
        }
        Ok(())
    }

    async fn clear<S: DocumentStore>(store: &S) -> Result<(), ApplicationError> {
        for name in CLEAR_ORDER {
            let deleted = store.clear_collection(name).await?;
            tracing::info!("Cleared {} documents from {}", deleted, name);
        }
        Ok(())
    }

    fn log_report(report: &SeedReport) {
        tracing::info!("Administrators: {} inserted, {} failed", report.administrators.inserted, report.administrators.failed);
        tracing::info!("Buildings: {} inserted, {} skipped, {} failed", report.buildings.inserted, report.buildings.skipped, report.buildings.failed);
        tracing::info!("Expense records: {} inserted, {} errors", report.expenses.inserted, report.expenses.errors());
    }
}

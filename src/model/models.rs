use std::fmt;

use mongodb::bson::{Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::model::apperror::ApplicationError;

/**
 * Administrator as read from the seed file.
 */
#[derive(Debug, Clone, Deserialize)]
pub struct AdministratorSeed {
    /**
     * National identification number (RUN) without verifier digit.
     */
    pub numrun: i64,
    pub dvrun: String,
    pub pnombre: String,
    #[serde(default)]
    pub snombre: Option<String>,
    pub appaterno: String,
    #[serde(default)]
    pub apmaterno: Option<String>,
    /**
     * Any other field of the source record. Stored unchanged.
     */
    #[serde(flatten)]
    pub extra: Document,
}

/**
 * Building as read from the seed file. The administrator is referenced by RUN.
 */
#[derive(Debug, Clone, Deserialize)]
pub struct BuildingSeed {
    /**
     * Legacy identifier from the relational source.
     */
    pub id_edificio_sql: i64,
    pub nombre: String,
    pub direccion: String,
    pub comuna: String,
    pub numrun_administrador: i64,
    #[serde(default)]
    pub departamentos: Vec<ApartmentSeed>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApartmentSeed {
    pub nro_depto: i32,
    #[serde(default)]
    pub total_dormitorios: Option<i32>,
    #[serde(default)]
    pub total_banos: Option<i32>,
    #[serde(default)]
    pub superficie_m2: Option<f64>,
    #[serde(default)]
    pub porcentaje_prorrateo: Option<f64>,
}

/**
 * Monetary amount as it appears in the seed file. Integers stay integers and fractional values stay doubles.
 */
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Integer(i64),
    Decimal(f64),
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Amount::Integer(value) => write!(f, "{value}"),
            Amount::Decimal(value) => write!(f, "{value}"),
        }
    }
}

/**
 * Common-expense record as read from the seed file. The building is referenced by its legacy identifier and dates are strings.
 */
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseSeed {
    pub id_edificio_sql: i64,
    /**
     * Billing period, e.g. 202401.
     */
    pub anno_mes: i32,
    pub nro_depto: i32,
    pub fecha_desde: String,
    pub fecha_hasta: String,
    #[serde(default)]
    pub prorrateado: Option<Amount>,
    #[serde(default)]
    pub fondo_reserva: Option<Amount>,
    #[serde(default)]
    pub agua_individual: Option<Amount>,
    #[serde(default)]
    pub combustible_individual: Option<Amount>,
    #[serde(default)]
    pub lavanderia: Option<Amount>,
    #[serde(default)]
    pub evento: Option<Amount>,
    #[serde(default)]
    pub servicio: Option<Amount>,
    #[serde(default)]
    pub monto_atrasado: Option<Amount>,
    #[serde(default)]
    pub multa: Option<Amount>,
    pub monto_total: Amount,
    #[serde(default)]
    pub fecha_pago: Option<String>,
}

/**
 * Result of processing a single seed record.
 */
#[derive(Debug)]
pub enum ItemOutcome {
    /**
     * Inserted with the generated id.
     */
    Inserted(ObjectId),
    /**
     * Not inserted because its parent reference could not be resolved.
     */
    Skipped(String),
    /**
     * Not inserted because conversion or insertion failed.
     */
    Failed(ApplicationError),
}

/**
 * Counters for one loading stage.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageReport {
    pub read: usize,
    pub inserted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl StageReport {
    /**
     * Adds the outcome of one record to the counters.
     *
     * #Arguments
     * `outcome`: Outcome of the record.
     */
    pub fn record(&mut self, outcome: &ItemOutcome) {
        self.read += 1;
        match outcome {
            ItemOutcome::Inserted(_) => self.inserted += 1,
            ItemOutcome::Skipped(_) => self.skipped += 1,
            ItemOutcome::Failed(_) => self.failed += 1,
        }
    }

    /**
     * Records that were read but not inserted.
     */
    pub fn errors(&self) -> usize {
        self.skipped + self.failed
    }
}

/**
 * Counters for a complete seeding run.
 */
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub administrators: StageReport,
    pub buildings: StageReport,
    pub expenses: StageReport,
}

/**
 * One expense record joined against the buildings collection.
 */
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RelationCheck {
    pub nro_depto: i32,
    pub monto_total: Amount,
    pub edificio_id: ObjectId,
    #[serde(default)]
    pub edificio_nombre: Option<String>,
    pub tiene_relacion: bool,
}

/**
 * Outcome of the relational integrity check.
 */
#[derive(Debug, Clone, Default)]
pub struct VerificationReport {
    pub valid_relations: usize,
    pub invalid_relations: usize,
    /**
     * First valid relations, bounded by the configured sample size.
     */
    pub sample: Vec<RelationCheck>,
    pub administrator_count: u64,
    pub building_count: u64,
    pub expense_count: u64,
}

impl VerificationReport {
    /**
     * True when every stored expense record resolves to a building and at least one exists.
     */
    pub fn is_consistent(&self) -> bool {
        self.expense_count > 0 && u64::try_from(self.valid_relations).is_ok_and(|valid| valid == self.expense_count)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::model::apperror::ErrorType;

    #[test]
    fn test_stage_report_counts_outcomes() {
        let mut report = StageReport::default();
        report.record(&ItemOutcome::Inserted(ObjectId::new()));
        report.record(&ItemOutcome::Skipped("edificio 99".to_string()));
        report.record(&ItemOutcome::Failed(ApplicationError::new(ErrorType::Validation, "rejected".to_string())));
        report.record(&ItemOutcome::Inserted(ObjectId::new()));
        assert_eq!(report, StageReport { read: 4, inserted: 2, skipped: 1, failed: 1 });
        assert_eq!(report.errors(), 2);
    }

    #[test]
    fn test_expense_seed_optional_fields() {
        let seed: ExpenseSeed = serde_json::from_str(r#"{"id_edificio_sql": 1, "anno_mes": 202401, "nro_depto": 101, "fecha_desde": "2024-01-01", "fecha_hasta": "2024-01-31", "monto_total": 50000}"#).unwrap();
        assert_eq!(seed.monto_total, Amount::Integer(50000));
        assert!(seed.fecha_pago.is_none());
        assert!(seed.multa.is_none());
    }

    #[test]
    fn test_amount_keeps_fraction() {
        let seed: ExpenseSeed = serde_json::from_str(r#"{"id_edificio_sql": 1, "anno_mes": 202401, "nro_depto": 101, "fecha_desde": "2024-01-01", "fecha_hasta": "2024-01-31", "monto_total": 51500.5, "multa": 1500.5}"#).unwrap();
        assert_eq!(seed.multa, Some(Amount::Decimal(1500.5)));
        assert_eq!(seed.monto_total.to_string(), "51500.5");
    }

    #[test]
    fn test_administrator_seed_keeps_unknown_fields() {
        let seed: AdministratorSeed = serde_json::from_str(r#"{"numrun": 11111111, "dvrun": "1", "pnombre": "Ana", "appaterno": "Rojas", "email": "ana@example.cl"}"#).unwrap();
        assert_eq!(seed.extra.get_str("email").unwrap(), "ana@example.cl");
        assert!(!seed.extra.contains_key("numrun"));
    }

    #[test]
    fn test_building_seed_without_apartments() {
        let seed: BuildingSeed = serde_json::from_str(r#"{"id_edificio_sql": 1, "nombre": "Torre A", "direccion": "Av. Siempre Viva 742", "comuna": "Providencia", "numrun_administrador": 11111111}"#).unwrap();
        assert!(seed.departamentos.is_empty());
    }

    #[test]
    fn test_verification_report_consistency() {
        let mut report = VerificationReport { valid_relations: 1, expense_count: 1, ..VerificationReport::default() };
        assert!(report.is_consistent());
        report.expense_count = 2;
        assert!(!report.is_consistent());
        let empty = VerificationReport::default();
        assert!(!empty.is_consistent());
    }
}

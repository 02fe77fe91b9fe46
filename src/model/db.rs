use chrono::{DateTime, NaiveDate, NaiveDateTime};
use mongodb::bson::{self, Document, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::model::{
    apperror::{ApplicationError, ErrorType},
    models::{AdministratorSeed, Amount, ApartmentSeed, BuildingSeed, ExpenseSeed},
};

/**
 * Document stored in `administradores`.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdministratorDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub numrun: i64,
    pub dvrun: String,
    pub pnombre: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snombre: Option<String>,
    pub appaterno: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apmaterno: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

impl From<AdministratorSeed> for AdministratorDocument {
    fn from(seed: AdministratorSeed) -> Self {
        AdministratorDocument {
            id: None,
            numrun: seed.numrun,
            dvrun: seed.dvrun,
            pnombre: seed.pnombre,
            snombre: seed.snombre,
            appaterno: seed.appaterno,
            apmaterno: seed.apmaterno,
            extra: seed.extra,
        }
    }
}

/**
 * Document stored in `edificios`. Owns its apartments.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub id_edificio_sql: i64,
    pub nombre: String,
    pub direccion: String,
    pub comuna: String,
    pub administrador_id: ObjectId,
    pub departamentos: Vec<ApartmentDocument>,
}

impl BuildingDocument {
    /**
     * Builds the stored document for a seed building whose administrator was resolved.
     *
     * #Arguments
     * `seed`: Building from the seed file.
     * `administrador_id`: Generated id of the administrator.
     */
    pub fn from_seed(seed: BuildingSeed, administrador_id: ObjectId) -> Self {
        BuildingDocument {
            id: None,
            id_edificio_sql: seed.id_edificio_sql,
            nombre: seed.nombre,
            direccion: seed.direccion,
            comuna: seed.comuna,
            administrador_id,
            departamentos: seed.departamentos.into_iter().map(ApartmentDocument::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApartmentDocument {
    pub nro_depto: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_dormitorios: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_banos: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub superficie_m2: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub porcentaje_prorrateo: Option<f64>,
}

impl From<ApartmentSeed> for ApartmentDocument {
    fn from(seed: ApartmentSeed) -> Self {
        ApartmentDocument {
            nro_depto: seed.nro_depto,
            total_dormitorios: seed.total_dormitorios,
            total_banos: seed.total_banos,
            superficie_m2: seed.superficie_m2,
            porcentaje_prorrateo: seed.porcentaje_prorrateo,
        }
    }
}

/**
 * Document stored in `gastos_comunes`.
 */
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseDocument {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub anno_mes: i32,
    pub edificio_id: ObjectId,
    pub nro_depto: i32,
    pub fecha_desde: bson::DateTime,
    pub fecha_hasta: bson::DateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prorrateado: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fondo_reserva: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agua_individual: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub combustible_individual: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lavanderia: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evento: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servicio: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub monto_atrasado: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multa: Option<Amount>,
    pub monto_total: Amount,
    /**
     * Stored as null when the record is unpaid.
     */
    pub fecha_pago: Option<bson::DateTime>,
}

impl ExpenseDocument {
    /**
     * Builds the stored document for a seed expense whose building was resolved.
     *
     * #Arguments
     * `seed`: Expense record from the seed file.
     * `edificio_id`: Generated id of the building.
     *
     * #Returns
     * The document, or a `Validation` error if one of the dates cannot be parsed.
     */
    pub fn from_seed(seed: ExpenseSeed, edificio_id: ObjectId) -> Result<Self, ApplicationError> {
        let fecha_desde = parse_date(&seed.fecha_desde)?;
        let fecha_hasta = parse_date(&seed.fecha_hasta)?;
        let fecha_pago = match seed.fecha_pago.as_deref().map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => Some(parse_date(value)?),
            None => None,
        };
        Ok(ExpenseDocument {
            id: None,
            anno_mes: seed.anno_mes,
            edificio_id,
            nro_depto: seed.nro_depto,
            fecha_desde,
            fecha_hasta,
            prorrateado: seed.prorrateado,
            fondo_reserva: seed.fondo_reserva,
            agua_individual: seed.agua_individual,
            combustible_individual: seed.combustible_individual,
            lavanderia: seed.lavanderia,
            evento: seed.evento,
            servicio: seed.servicio,
            monto_atrasado: seed.monto_atrasado,
            multa: seed.multa,
            monto_total: seed.monto_total,
            fecha_pago,
        })
    }
}

/**
 * Parses a seed date. Plain dates and timestamps without offset are taken as UTC.
 *
 * #Arguments
 * `value`: `YYYY-MM-DD`, RFC 3339, or `YYYY-MM-DDTHH:MM:SS`.
 *
 * #Returns
 * The BSON date, or a `Validation` error.
 */
pub fn parse_date(value: &str) -> Result<bson::DateTime, ApplicationError> {
    let value = value.trim();
    let millis = if let Ok(date_time) = DateTime::parse_from_rfc3339(value) {
        date_time.timestamp_millis()
    } else if let Ok(date_time) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S") {
        date_time.and_utc().timestamp_millis()
    } else {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid date '{value}': {err}")))?
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp_millis()
    };
    Ok(bson::DateTime::from_millis(millis))
}

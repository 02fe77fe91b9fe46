use mongodb::{
    IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};

/**
 * Collection holding administrators.
 */
pub const ADMINISTRATORS: &str = "administradores";

/**
 * Collection holding buildings with embedded apartments.
 */
pub const BUILDINGS: &str = "edificios";

/**
 * Collection holding common-expense records.
 */
pub const EXPENSES: &str = "gastos_comunes";

/**
 * Deletion order for a reseed. Children before parents.
 */
pub const CLEAR_ORDER: [&str; 3] = [EXPENSES, BUILDINGS, ADMINISTRATORS];

const INTEGER: [&str; 2] = ["int", "long"];
const NUMBER: [&str; 3] = ["int", "long", "double"];

/**
 * A collection together with its validator and indexes.
 */
pub struct CollectionSchema {
    pub name: &'static str,
    /**
     * Validator document, `{ "$jsonSchema": ... }`.
     */
    pub validator: Document,
    pub indexes: Vec<IndexModel>,
}

/**
 * All collections in creation order, parents first.
 */
pub fn collection_schemas() -> Vec<CollectionSchema> {
    vec![
        CollectionSchema { name: ADMINISTRATORS, validator: administrator_validator(), indexes: vec![index(doc! { "numrun": 1 }, "numrun_unique", true)] },
        CollectionSchema {
            name: BUILDINGS,
            validator: building_validator(),
            indexes: vec![index(doc! { "id_edificio_sql": 1 }, "id_edificio_sql_unique", true), index(doc! { "administrador_id": 1 }, "administrador_id", false)],
        },
        CollectionSchema {
            name: EXPENSES,
            validator: expense_validator(),
            indexes: vec![
                index(doc! { "edificio_id": 1, "anno_mes": 1 }, "edificio_id_anno_mes", false),
                index(doc! { "edificio_id": 1, "nro_depto": 1 }, "edificio_id_nro_depto", false),
            ],
        },
    ]
}

fn index(keys: Document, name: &str, unique: bool) -> IndexModel {
    IndexModel::builder().keys(keys).options(IndexOptions::builder().name(name.to_string()).unique(unique).build()).build()
}

fn string(max_length: i32) -> Document {
    doc! { "bsonType": "string", "maxLength": max_length }
}

pub fn administrator_validator() -> Document {
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["numrun", "dvrun", "pnombre", "appaterno"],
            "properties": {
                "numrun": { "bsonType": INTEGER.to_vec(), "description": "RUN without verifier digit" },
                "dvrun": string(1),
                "pnombre": string(50),
                "snombre": string(50),
                "appaterno": string(50),
                "apmaterno": string(50)
            }
        }
    }
}

pub fn building_validator() -> Document {
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["id_edificio_sql", "nombre", "direccion", "comuna", "administrador_id", "departamentos"],
            "properties": {
                "id_edificio_sql": { "bsonType": INTEGER.to_vec(), "description": "legacy identifier" },
                "nombre": string(100),
                "direccion": string(200),
                "comuna": string(50),
                "administrador_id": { "bsonType": "objectId" },
                "departamentos": {
                    "bsonType": "array",
                    "items": {
                        "bsonType": "object",
                        "required": ["nro_depto"],
                        "properties": {
                            "nro_depto": { "bsonType": INTEGER.to_vec() },
                            "total_dormitorios": { "bsonType": INTEGER.to_vec() },
                            "total_banos": { "bsonType": INTEGER.to_vec() },
                            "superficie_m2": { "bsonType": NUMBER.to_vec() },
                            "porcentaje_prorrateo": { "bsonType": NUMBER.to_vec() }
                        }
                    }
                }
            }
        }
    }
}

pub fn expense_validator() -> Document {
    let charge = doc! { "bsonType": NUMBER.to_vec() };
    doc! {
        "$jsonSchema": {
            "bsonType": "object",
            "required": ["anno_mes", "edificio_id", "nro_depto", "fecha_desde", "fecha_hasta", "monto_total"],
            "properties": {
                "anno_mes": { "bsonType": INTEGER.to_vec(), "description": "billing period YYYYMM" },
                "edificio_id": { "bsonType": "objectId" },
                "nro_depto": { "bsonType": INTEGER.to_vec() },
                "fecha_desde": { "bsonType": "date" },
                "fecha_hasta": { "bsonType": "date" },
                "prorrateado": charge.clone(),
                "fondo_reserva": charge.clone(),
                "agua_individual": charge.clone(),
                "combustible_individual": charge.clone(),
                "lavanderia": charge.clone(),
                "evento": charge.clone(),
                "servicio": charge.clone(),
                "monto_atrasado": charge.clone(),
                "multa": charge,
                "monto_total": { "bsonType": NUMBER.to_vec() },
                "fecha_pago": { "bsonType": ["date", "null"] }
            }
        }
    }
}

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::model::apperror::{ApplicationError, ErrorType};

/**
 * Reads a seed file containing a top-level JSON array. Records are kept untyped so that one bad record
 * can be rejected on its own while loading.
 *
 * #Arguments
 * `path`: Path to the file.
 *
 * #Returns
 * The raw records, or an `Input` error if the file cannot be read or is not a JSON array.
 */
pub fn read_seed_file(path: &str) -> Result<Vec<Value>, ApplicationError> {
    let contents = std::fs::read_to_string(path).map_err(|err| ApplicationError::new(ErrorType::Input, format!("Failed to read seed file {path}: {err}")))?;
    let records = parse_seed(&contents, path)?;
    tracing::debug!("Read {} records from {}", records.len(), path);
    Ok(records)
}

/**
 * Parses the contents of a seed file.
 *
 * #Arguments
 * `contents`: The JSON text.
 * `source`: Name used in error messages.
 */
pub fn parse_seed(contents: &str, source: &str) -> Result<Vec<Value>, ApplicationError> {
    serde_json::from_str(contents).map_err(|err| ApplicationError::new(ErrorType::Input, format!("Failed to parse seed file {source}: {err}")))
}

/**
 * Converts one raw record into its typed form.
 *
 * #Arguments
 * `record`: The raw record.
 *
 * #Returns
 * The typed record, or a `Validation` error naming the offending field.
 */
pub fn parse_record<T: DeserializeOwned>(record: Value) -> Result<T, ApplicationError> {
    serde_json::from_value(record).map_err(|err| ApplicationError::new(ErrorType::Validation, format!("Invalid record: {err}")))
}

/**
 * Renders a field of a raw record for log messages. Absent fields render as `?`.
 */
pub fn record_key(record: &Value, field: &str) -> String {
    match record.get(field) {
        Some(Value::String(value)) => value.clone(),
        Some(value) => value.to_string(),
        None => "?".to_string(),
    }
}

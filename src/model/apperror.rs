use std::fmt;

/**
 * Represents the type of error that can occur within the application.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorType {
    /**
     * Missing or invalid configuration, or failure to connect.
     */
    Initialization,
    /**
     * Seed file missing or not a JSON array.
     */
    Input,
    /**
     * Any other failure reported by the database or its driver.
     */
    DatabaseError,
    /**
     * Unique index violation.
     */
    ConstraintViolation,
    /**
     * Document rejected by the collection validator or a value could not be converted.
     */
    Validation,
    /**
     * A collection required for seeding does not exist.
     */
    MissingCollection,
}

/**
 * Represents an error that occurs within the application.
 */
#[derive(Debug, Clone)]
pub struct ApplicationError {
    /**
     * Error type.
     */
    pub error_type: ErrorType,
    /**
     * Error message describing problem.
     */
    pub message: String,
}

impl ApplicationError {
    /**
     * Creates a new ApplicationError.
     *
     * #Arguments
     * `error_type`: The type of error.
     * `message`: A description of the error.
     */
    pub fn new(error_type: ErrorType, message: String) -> Self {
        ApplicationError { error_type, message }
    }
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.error_type, self.message)
    }
}

impl std::error::Error for ApplicationError {}

impl From<ApplicationError> for std::io::Error {
    fn from(err: ApplicationError) -> Self {
        std::io::Error::other(err.to_string())
    }
}

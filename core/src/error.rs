use thiserror::Error;

#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Table '{table}' is missing mandatory column '{column}'")]
    MissingColumn { table: String, column: String },

    #[error("Invalid value '{value}' in column '{column}' at row {row}")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    #[error("Duplicate customer_id '{customer_id}'")]
    DuplicateCustomer { customer_id: String },

    #[error("Table '{table}' not found")]
    UnknownTable { table: String },

    #[error("Table '{table}' already exists")]
    TableExists { table: String },

    #[error("Invalid policy: {reason}")]
    InvalidPolicy { reason: String },

    #[error("'{name}' is not a valid SQL identifier")]
    InvalidIdentifier { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type PortfolioResult<T> = Result<T, PortfolioError>;

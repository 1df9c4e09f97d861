//! Shared primitive types used across the engine and the data access layer.

/// Stable customer identifier as it appears in the source files.
pub type CustomerId = String;

/// Name of a table in the relational store.
pub type TableName = String;

/// Identifier assigned to a loaded snapshot or a store load.
pub type LoadId = String;


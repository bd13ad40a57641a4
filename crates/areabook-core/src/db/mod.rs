//! Database layer for AreaBook sync

mod connection;
mod document_store;
mod migrations;

pub use connection::Database;
pub use document_store::LibSqlStore;

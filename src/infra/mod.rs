// Infrastructure adapters: relational store, SQL dump, and CSV output files

pub mod csv_output_adapter;
pub mod sql_dump;
pub mod sqlite_store;

pub use csv_output_adapter::CsvOutputAdapter;
pub use sql_dump::{DumpStats, SqlDumper};
pub use sqlite_store::SqliteStore;

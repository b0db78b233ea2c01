//! Reference [`TableDataReader`](tabcompare_common::TableDataReader) implementations

mod csv;
mod memory;

pub use self::csv::{CsvDataReader, CsvFileReader};
pub use self::memory::MemoryDataReader;

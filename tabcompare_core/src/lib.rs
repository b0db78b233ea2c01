pub mod comparison_utils;
pub mod values;
pub mod rows;
pub mod matcher;
pub mod indexed_data;
pub mod table_comparator;
pub mod readers;
pub mod result;
pub mod detail_writer;
pub mod result_writer;
pub mod tool;
pub mod task;

#[cfg(test)]
mod tests_tool;

pub use comparison_utils::ComparisonUtils;
pub use values::{DecimalValueTransformer, ValueTransformer, ValuesComparator};
pub use rows::RowsComparator;
pub use matcher::{PrimaryKey, TableRowMatcher};
pub use indexed_data::IndexedTableData;
pub use table_comparator::{DataComparator, IndexedTableDataComparator, TableDataComparator};
pub use readers::{CsvDataReader, CsvFileReader, MemoryDataReader};
pub use result::ComparisonResult;
pub use detail_writer::{CsvComparisonWriter, ErrorsWriter};
pub use result_writer::ComparisonResultWriter;
pub use tool::{CancellationToken, ComparisonSettings, DataComparatorTool, ProgressCallback};
pub use task::DataComparisonTask;

use crate::{TabCompareError, TableHeader, TableRow};
use std::sync::Arc;

/// Source of table rows for a comparison
///
/// This trait lets the comparison engine treat CSV files, in-memory tables and
/// database cursors uniformly. Implementations must be `Send` so a comparison
/// can run on a background task.
pub trait TableDataReader: Send {
    /// Prepares the source and reads its header
    fn start(&mut self) -> Result<(), TabCompareError>;

    /// Header of the source, available after [`start`](Self::start)
    fn header(&self) -> Result<Arc<TableHeader>, TabCompareError>;

    /// Checks if another row can be read
    fn has_more_data(&mut self) -> Result<bool, TabCompareError>;

    /// Reads the next row, `None` at end of data
    fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError>;

    /// Releases the underlying resources. Must be safe to call more than once.
    fn close(&mut self) -> Result<(), TabCompareError> {
        Ok(())
    }
}

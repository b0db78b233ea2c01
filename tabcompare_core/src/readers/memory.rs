use std::collections::VecDeque;
use std::sync::Arc;
use tabcompare_common::{TabCompareError, TableDataReader, TableHeader, TableRow};

/// Serves rows held in memory
#[derive(Debug, Clone)]
pub struct MemoryDataReader {
    header: Arc<TableHeader>,
    rows: VecDeque<TableRow>,
}

impl MemoryDataReader {
    pub fn new(header: Arc<TableHeader>, rows: Vec<TableRow>) -> Self {
        Self {
            header,
            rows: rows.into(),
        }
    }

    pub fn from_strings(columns: &[&str], rows: &[&[&str]]) -> Self {
        let header = Arc::new(TableHeader::new(columns.iter().copied()));
        let rows = rows
            .iter()
            .map(|values| TableRow::from_strings(header.clone(), values.iter().copied()))
            .collect();
        Self::new(header, rows)
    }
}

impl TableDataReader for MemoryDataReader {
    fn start(&mut self) -> Result<(), TabCompareError> {
        Ok(())
    }

    fn header(&self) -> Result<Arc<TableHeader>, TabCompareError> {
        Ok(self.header.clone())
    }

    fn has_more_data(&mut self) -> Result<bool, TabCompareError> {
        Ok(!self.rows.is_empty())
    }

    fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError> {
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<(), TabCompareError> {
        self.rows.clear();
        Ok(())
    }
}

use csv::{Reader, ReaderBuilder, StringRecord};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tabcompare_common::{TabCompareError, TableDataReader, TableHeader, TableRow};
use tracing::debug;

/// Streams rows of a delimited text file, first record being the header
pub struct CsvDataReader<R: Read> {
    name: String,
    source: Option<R>,
    delimiter: u8,
    reader: Option<Reader<R>>,
    header: Option<Arc<TableHeader>>,
    pending: Option<StringRecord>,
}

impl CsvDataReader<File> {
    pub fn from_path(path: &Path) -> Result<Self, TabCompareError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(path.display().to_string(), file))
    }
}

impl<R: Read> CsvDataReader<R> {
    pub fn from_reader(name: impl Into<String>, source: R) -> Self {
        Self {
            name: name.into(),
            source: Some(source),
            delimiter: b',',
            reader: None,
            header: None,
            pending: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn reader(&mut self) -> Result<&mut Reader<R>, TabCompareError> {
        self.reader.as_mut().ok_or_else(|| {
            TabCompareError::Comparison("CSV reader is not started or already closed".to_string())
        })
    }
}

impl<R: Read + Send> TableDataReader for CsvDataReader<R> {
    fn start(&mut self) -> Result<(), TabCompareError> {
        let source = match self.source.take() {
            Some(source) => source,
            None => return Ok(()),
        };
        let mut reader = ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(source);

        let record = reader.headers()?.clone();
        let header = TableHeader::new(record.iter().map(|c| c.trim()));
        if header.len() != record.len() {
            return Err(TabCompareError::Config(format!(
                "Header of {} contains duplicate column names",
                self.name
            )));
        }
        debug!("Opened {} with {} column(s)", self.name, header.len());

        self.header = Some(Arc::new(header));
        self.reader = Some(reader);
        Ok(())
    }

    fn header(&self) -> Result<Arc<TableHeader>, TabCompareError> {
        self.header.clone().ok_or_else(|| {
            TabCompareError::Comparison(format!("Header of {} is not read yet", self.name))
        })
    }

    fn has_more_data(&mut self) -> Result<bool, TabCompareError> {
        if self.pending.is_some() {
            return Ok(true);
        }
        if self.reader.is_none() && self.header.is_some() {
            return Ok(false);
        }
        let mut record = StringRecord::new();
        if self.reader()?.read_record(&mut record)? {
            self.pending = Some(record);
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError> {
        if !self.has_more_data()? {
            return Ok(None);
        }
        let header = self.header()?;
        Ok(self
            .pending
            .take()
            .map(|record| TableRow::from_strings(header, record.iter())))
    }

    fn close(&mut self) -> Result<(), TabCompareError> {
        self.reader = None;
        self.pending = None;
        self.source = None;
        Ok(())
    }
}

/// Reader for a CSV file that is opened only when the comparison starts
pub struct CsvFileReader {
    path: PathBuf,
    delimiter: u8,
    inner: Option<CsvDataReader<File>>,
}

impl CsvFileReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            delimiter: b',',
            inner: None,
        }
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    fn inner(&mut self) -> Result<&mut CsvDataReader<File>, TabCompareError> {
        let path = &self.path;
        self.inner.as_mut().ok_or_else(|| {
            TabCompareError::Comparison(format!("{} is not opened", path.display()))
        })
    }
}

impl TableDataReader for CsvFileReader {
    fn start(&mut self) -> Result<(), TabCompareError> {
        if self.inner.is_none() {
            let mut reader = CsvDataReader::from_path(&self.path)?.with_delimiter(self.delimiter);
            reader.start()?;
            self.inner = Some(reader);
        }
        Ok(())
    }

    fn header(&self) -> Result<Arc<TableHeader>, TabCompareError> {
        match &self.inner {
            Some(reader) => reader.header(),
            None => Err(TabCompareError::Comparison(format!(
                "{} is not opened",
                self.path.display()
            ))),
        }
    }

    fn has_more_data(&mut self) -> Result<bool, TabCompareError> {
        self.inner()?.has_more_data()
    }

    fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError> {
        self.inner()?.read_row()
    }

    fn close(&mut self) -> Result<(), TabCompareError> {
        match self.inner.take() {
            Some(mut reader) => reader.close(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::readers::MemoryDataReader;
    use crate::result_writer::ComparisonResultWriter;
    use crate::task::DataComparisonTask;
    use crate::tool::{CancellationToken, ComparisonSettings, DataComparatorTool};
    use crate::ComparisonUtils;
    use std::fs::File;
    use std::io::Read;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tabcompare_common::{
        DataMapping, FieldDesc, MappingDesc, ResultType, TabCompareError, TableDataReader,
        TableHeader, TableRow,
    };
    use tempfile::TempDir;
    use zip::ZipArchive;

    fn reader(columns: &[&str], rows: &[&[&str]]) -> Box<dyn TableDataReader> {
        Box::new(MemoryDataReader::from_strings(columns, rows))
    }

    fn keyed(output: &Path, fields: Vec<FieldDesc>) -> ComparisonSettings {
        let mapping = DataMapping::new(&MappingDesc { fields }).expect("valid mapping");
        ComparisonSettings::new(output).with_mapping(mapping)
    }

    fn entry_text(archive_path: &Path, name: Option<&str>) -> String {
        let mut archive = ZipArchive::new(File::open(archive_path).unwrap()).unwrap();
        let mut entry = match name {
            Some(name) => archive.by_name(name).unwrap(),
            None => archive.by_index(0).unwrap(),
        };
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        text
    }

    fn assert_counts_consistent(result: &crate::ComparisonResult) {
        assert_eq!(
            result.total(),
            result.passed() + result.failed() + result.not_found() + result.extra()
        );
    }

    // ============================================================================
    // Keyed scenarios
    // ============================================================================

    #[test]
    fn test_keyed_match_passes() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(temp.path(), vec![FieldDesc::new("id").key()]);
        let result = DataComparatorTool::new()
            .compare(
                reader(&["id", "v"], &[&["1", "5"]]),
                reader(&["id", "v"], &[&["1", "5"]]),
                &settings,
            )
            .unwrap();

        assert_eq!(result.total(), 1);
        assert_eq!(result.passed(), 1);
        assert_eq!(result.failed(), 0);
        assert!(result.is_success());
        assert!(result.details_path(ResultType::Passed).is_some());
        assert!(result.details_path(ResultType::Failed).is_none());
        assert!(result.errors_path().is_none());
    }

    #[test]
    fn test_keyed_mismatch_fails() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(temp.path(), vec![FieldDesc::new("id").key()]);
        let result = DataComparatorTool::new()
            .compare(
                reader(&["id", "v"], &[&["1", "5"]]),
                reader(&["id", "v"], &[&["1", "6"]]),
                &settings,
            )
            .unwrap();

        assert_eq!(result.failed(), 1);
        let failed = result.details_path(ResultType::Failed).unwrap();
        assert!(failed.starts_with(temp.path().join("details")));
        assert_eq!(
            entry_text(failed, Some("failed.csv")),
            "Comparison name,Comparison result,Row kind,id,v\n\
             Row #1,FAILED,EXPECTED,1,5\n\
             Row #1,FAILED,ACTUAL,1,6\n"
        );
    }

    #[test]
    fn test_keyed_disjoint_rows() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(temp.path(), vec![FieldDesc::new("id").key()]);
        let result = DataComparatorTool::new()
            .compare(reader(&["id"], &[&["1"]]), reader(&["id"], &[&["2"]]), &settings)
            .unwrap();

        assert_eq!(result.total(), 2);
        assert_eq!(result.not_found(), 1);
        assert_eq!(result.extra(), 1);
        assert_counts_consistent(&result);
    }

    #[test]
    fn test_numeric_tolerance() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(
            temp.path(),
            vec![FieldDesc::new("id").key(), FieldDesc::new("v").numeric("0.5")],
        );
        let result = DataComparatorTool::new()
            .compare(
                reader(&["id", "v"], &[&["1", "5.0"], &["2", "5.0"]]),
                reader(&["id", "v"], &[&["2", "6.0"], &["1", "5.3"]]),
                &settings,
            )
            .unwrap();

        assert_eq!(result.passed(), 1);
        assert_eq!(result.failed(), 1);
        let failed = entry_text(result.details_path(ResultType::Failed).unwrap(), None);
        assert!(failed.contains("FAILED,EXPECTED,2,5.0"));
    }

    #[test]
    fn test_keyed_counts_with_duplicates_and_reordering() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(temp.path(), vec![FieldDesc::new("id").key()]);
        let result = DataComparatorTool::new()
            .compare(
                reader(
                    &["id", "v"],
                    &[&["1", "a"], &["2", "b"], &["2", "b"], &["3", "c"], &["5", "e"]],
                ),
                reader(
                    &["id", "v"],
                    &[&["3", "c"], &["2", "b"], &["1", "x"], &["4", "d"]],
                ),
                &settings,
            )
            .unwrap();

        assert_eq!(result.total(), 6);
        assert_eq!(result.passed(), 2);
        assert_eq!(result.failed(), 1);
        assert_eq!(result.not_found(), 2);
        assert_eq!(result.extra(), 1);
        assert_counts_consistent(&result);
    }

    // ============================================================================
    // Positional mode
    // ============================================================================

    #[test]
    fn test_positional_insert_shifts_pairings() {
        let temp = TempDir::new().unwrap();
        let settings = ComparisonSettings::new(temp.path());
        let rows: &[&[&str]] = &[&["1", "a"], &["2", "b"], &["3", "c"]];
        let shifted: &[&[&str]] = &[&["0", "z"], &["1", "a"], &["2", "b"], &["3", "c"]];

        let same = DataComparatorTool::new()
            .compare(reader(&["id", "v"], rows), reader(&["id", "v"], rows), &settings)
            .unwrap();
        assert_eq!(same.passed(), 3);

        let result = DataComparatorTool::new()
            .compare(reader(&["id", "v"], rows), reader(&["id", "v"], shifted), &settings)
            .unwrap();
        assert_eq!(result.total(), 4);
        assert_eq!(result.passed(), 0);
        assert_eq!(result.failed(), 3);
        assert_eq!(result.extra(), 1);
    }

    #[test]
    fn test_both_empty_creates_nothing() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out");
        let settings = ComparisonSettings::new(&output);
        let result = DataComparatorTool::new()
            .compare(reader(&["id"], &[]), reader(&["id"], &[]), &settings)
            .unwrap();

        assert_eq!(result.total(), 0);
        assert_eq!(result.description(), Some("Both datasets are empty"));
        assert!(!output.exists());
    }

    #[test]
    fn test_one_side_empty() {
        let temp = TempDir::new().unwrap();
        let settings = ComparisonSettings::new(temp.path());
        let result = DataComparatorTool::new()
            .compare(reader(&["id"], &[&["1"], &["2"]]), reader(&["id"], &[]), &settings)
            .unwrap();
        assert_eq!(result.not_found(), 2);
        assert_eq!(result.total(), 2);
    }

    // ============================================================================
    // Reports
    // ============================================================================

    #[test]
    fn test_errors_file_lists_field_errors_by_row() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(
            temp.path(),
            vec![FieldDesc::new("id").key(), FieldDesc::new("v").numeric("0.1")],
        );
        let result = DataComparatorTool::new()
            .compare(
                reader(&["id", "v"], &[&["1", "1.0"], &["2", "abc"]]),
                reader(&["id", "v"], &[&["1", "1.0"], &["2", "2.0"]]),
                &settings,
            )
            .unwrap();

        assert_eq!(result.passed(), 1);
        assert_eq!(result.failed(), 1);
        let errors = result.errors_path().unwrap();
        assert_eq!(errors, temp.path().join("errors.txt"));
        assert_eq!(
            std::fs::read_to_string(errors).unwrap(),
            "Row #2:\n  Column 'v': value 'abc' is not a number\n"
        );
    }

    #[test]
    fn test_result_archive_layout() {
        let temp = TempDir::new().unwrap();
        let settings = keyed(
            &temp.path().join("run"),
            vec![FieldDesc::new("id").key(), FieldDesc::new("v").numeric("0")],
        );
        let result = DataComparatorTool::new()
            .compare(
                reader(&["id", "v"], &[&["1", "1"], &["2", "x"], &["3", "3"]]),
                reader(&["id", "v"], &[&["1", "1"], &["2", "2"], &["4", "4"]]),
                &settings,
            )
            .unwrap();

        let archive_path = temp.path().join("reports").join("result.zip");
        ComparisonResultWriter::new()
            .write(&result, &archive_path)
            .unwrap();

        let archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(
            names,
            vec![
                "errors.txt",
                "extra.csv",
                "failed.csv",
                "not_found.csv",
                "passed.csv",
                "summary.txt"
            ]
        );

        let summary = entry_text(&archive_path, Some("summary.txt"));
        assert!(summary.starts_with("Comparison started: "));
        assert!(summary.ends_with(
            "Rows compared: 4\nPassed: 1\nFailed: 1\nNot found in actual data: 1\nExtra in actual data: 1\n"
        ));
        assert!(entry_text(&archive_path, Some("extra.csv")).contains("Row #4,EXTRA,ACTUAL,4,4"));
    }

    #[test]
    fn test_archive_without_differences_holds_summary_and_passed() {
        let temp = TempDir::new().unwrap();
        let settings = ComparisonSettings::new(temp.path().join("run"));
        let result = DataComparatorTool::new()
            .compare(reader(&["id"], &[&["1"]]), reader(&["id"], &[&["1"]]), &settings)
            .unwrap();

        let archive_path = temp.path().join("result.zip");
        ComparisonResultWriter::new()
            .write(&result, &archive_path)
            .unwrap();
        let archive = ZipArchive::new(File::open(&archive_path).unwrap()).unwrap();
        let mut names: Vec<&str> = archive.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["passed.csv", "summary.txt"]);
    }

    #[test]
    fn test_runs_are_deterministic() {
        let expected: &[&[&str]] = &[&["1", "a"], &["2", "b"], &["2", "c"], &["3", "c"], &["6", "f"]];
        let actual: &[&[&str]] = &[&["2", "c"], &["3", "x"], &["2", "b"], &["7", "g"], &["8", "h"]];

        let run = || {
            let temp = TempDir::new().unwrap();
            let settings = keyed(temp.path(), vec![FieldDesc::new("id").key()]);
            let result = DataComparatorTool::new()
                .compare(reader(&["id", "v"], expected), reader(&["id", "v"], actual), &settings)
                .unwrap();
            let reports: Vec<String> = ResultType::ALL
                .iter()
                .filter_map(|rt| result.details_path(*rt))
                .map(|path| entry_text(path, None))
                .collect();
            (result.total(), result.passed(), result.failed(), result.not_found(), result.extra(), reports)
        };

        let first = run();
        let second = run();
        assert_eq!(first, second);
        assert_eq!((first.0, first.3, first.4), (7, 2, 2));
    }

    // ============================================================================
    // Cancellation and failures
    // ============================================================================

    /// Serves memory rows and raises the token once `cancel_after` rows were read
    struct CancellingReader {
        inner: MemoryDataReader,
        token: CancellationToken,
        cancel_after: usize,
        read: usize,
    }

    impl TableDataReader for CancellingReader {
        fn start(&mut self) -> Result<(), TabCompareError> {
            self.inner.start()
        }
        fn header(&self) -> Result<Arc<TableHeader>, TabCompareError> {
            self.inner.header()
        }
        fn has_more_data(&mut self) -> Result<bool, TabCompareError> {
            self.inner.has_more_data()
        }
        fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError> {
            self.read += 1;
            if self.read == self.cancel_after {
                self.token.cancel();
            }
            self.inner.read_row()
        }
    }

    fn numbered_rows(count: usize) -> Vec<Vec<String>> {
        (0..count).map(|i| vec![i.to_string()]).collect()
    }

    fn memory(rows: &[Vec<String>]) -> MemoryDataReader {
        let header = Arc::new(TableHeader::new(["id"]));
        let rows = rows
            .iter()
            .map(|r| TableRow::from_strings(header.clone(), r.iter().map(String::as_str)))
            .collect();
        MemoryDataReader::new(header, rows)
    }

    #[test]
    fn test_cancellation_returns_partial_result() {
        let temp = TempDir::new().unwrap();
        let rows = numbered_rows(10);
        let token = CancellationToken::new();
        let expected = CancellingReader {
            inner: memory(&rows),
            token: token.clone(),
            cancel_after: 4,
            read: 0,
        };

        let result = DataComparatorTool::new()
            .compare_with_cancel(
                Box::new(expected),
                Box::new(memory(&rows)),
                &ComparisonSettings::new(temp.path()),
                Some(&token),
            )
            .unwrap();

        assert_eq!(result.total(), 4);
        assert_eq!(result.passed(), 4);
        assert!(result.finished().is_some());
        assert!(result.details_path(ResultType::Passed).is_some());
    }

    struct FailingReader {
        inner: MemoryDataReader,
        fail_at: usize,
        read: usize,
        closes: Arc<AtomicUsize>,
    }

    impl FailingReader {
        fn new(inner: MemoryDataReader, fail_at: usize, closes: &Arc<AtomicUsize>) -> Self {
            Self {
                inner,
                fail_at,
                read: 0,
                closes: closes.clone(),
            }
        }
    }

    impl TableDataReader for FailingReader {
        fn start(&mut self) -> Result<(), TabCompareError> {
            self.inner.start()
        }
        fn header(&self) -> Result<Arc<TableHeader>, TabCompareError> {
            self.inner.header()
        }
        fn has_more_data(&mut self) -> Result<bool, TabCompareError> {
            self.inner.has_more_data()
        }
        fn read_row(&mut self) -> Result<Option<TableRow>, TabCompareError> {
            self.read += 1;
            if self.read == self.fail_at {
                return Err(TabCompareError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "source truncated",
                )));
            }
            self.inner.read_row()
        }
        fn close(&mut self) -> Result<(), TabCompareError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            self.inner.close()
        }
    }

    #[test]
    fn test_io_error_aborts_and_removes_partial_details() {
        let temp = TempDir::new().unwrap();
        let closes = Arc::new(AtomicUsize::new(0));
        let mut expected_rows = numbered_rows(5);
        expected_rows[0] = vec!["x".to_string()];
        let rows = numbered_rows(5);

        let mapping = DataMapping::new(&MappingDesc {
            fields: vec![FieldDesc::new("id").numeric("0")],
        })
        .unwrap();
        let settings = ComparisonSettings::new(temp.path()).with_mapping(mapping);

        let err = DataComparatorTool::new()
            .compare(
                Box::new(FailingReader::new(memory(&expected_rows), usize::MAX, &closes)),
                Box::new(FailingReader::new(memory(&rows), 3, &closes)),
                &settings,
            )
            .unwrap_err();
        assert!(matches!(err, TabCompareError::Io(_)));
        assert_eq!(closes.load(Ordering::SeqCst), 2);

        let leftovers = std::fs::read_dir(temp.path().join("details")).unwrap().count();
        assert_eq!(leftovers, 0);
        let names: Vec<String> = std::fs::read_dir(temp.path())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["details"]);
    }

    #[test]
    fn test_missing_key_fails_before_reading() {
        let temp = TempDir::new().unwrap();
        let output = temp.path().join("out");
        let settings = keyed(&output, vec![FieldDesc::new("id").key()]);
        let err = DataComparatorTool::new()
            .compare(reader(&["id"], &[&["1"]]), reader(&["key"], &[&["1"]]), &settings)
            .unwrap_err();
        assert!(matches!(err, TabCompareError::Config(_)));
        assert!(!output.exists());
    }

    #[test]
    fn test_special_values_can_be_disabled() {
        let temp = TempDir::new().unwrap();
        let enabled = ComparisonSettings::new(temp.path());
        let disabled = ComparisonSettings::new(temp.path())
            .with_comparison_utils(ComparisonUtils::new().with_special_values(false));

        let run = |settings: &ComparisonSettings| {
            DataComparatorTool::new()
                .compare(
                    reader(&["v"], &[&["@{isNotEmpty}"]]),
                    reader(&["v"], &[&["anything"]]),
                    settings,
                )
                .unwrap()
        };
        assert_eq!(run(&enabled).passed(), 1);
        assert_eq!(run(&disabled).failed(), 1);
    }

    // ============================================================================
    // Background task
    // ============================================================================

    #[test]
    fn test_task_completes_with_result() {
        let temp = TempDir::new().unwrap();
        let mut task = DataComparisonTask::start(
            reader(&["id"], &[&["1"], &["2"]]),
            reader(&["id"], &[&["1"], &["3"]]),
            ComparisonSettings::new(temp.path()),
        )
        .unwrap();
        task.wait().unwrap();

        assert!(!task.is_running());
        assert!(task.error().is_none());
        let result = task.result().unwrap();
        assert_eq!(result.total(), 2);
        assert_eq!(result.passed(), 1);
        assert_eq!(result.failed(), 1);
    }

    #[test]
    fn test_task_reports_error() {
        let temp = TempDir::new().unwrap();
        let mut task = DataComparisonTask::start(
            reader(&["id"], &[&["1"]]),
            reader(&["other"], &[&["1"]]),
            keyed(temp.path(), vec![FieldDesc::new("id").key()]),
        )
        .unwrap();
        task.wait().unwrap();

        assert!(task.result().is_none());
        assert!(task.error().unwrap().contains("key column"));
    }

    #[test]
    fn test_interrupted_task_keeps_partial_result() {
        let temp = TempDir::new().unwrap();
        let rows = numbered_rows(1000);
        let mut task = DataComparisonTask::start(
            Box::new(memory(&rows)),
            Box::new(memory(&rows)),
            ComparisonSettings::new(temp.path()),
        )
        .unwrap();
        task.interrupt();
        task.wait().unwrap();

        let result = task.result().unwrap();
        assert!(result.total() >= 1 && result.total() <= 1000);
        assert_eq!(result.total(), result.passed());
    }
}

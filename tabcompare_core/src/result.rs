use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabcompare_common::ResultType;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Aggregate outcome of one comparison run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ComparisonResult {
    total: u64,
    passed: u64,
    failed: u64,
    not_found: u64,
    extra: u64,
    description: Option<String>,
    passed_details: Option<PathBuf>,
    failed_details: Option<PathBuf>,
    not_found_details: Option<PathBuf>,
    extra_details: Option<PathBuf>,
    errors: Option<PathBuf>,
    started: Option<NaiveDateTime>,
    finished: Option<NaiveDateTime>,
}

impl ComparisonResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Result of a run where neither side had any row
    pub fn nothing_to_compare() -> Self {
        let now = Local::now().naive_local();
        Self {
            description: Some("Both datasets are empty".to_string()),
            started: Some(now),
            finished: Some(now),
            ..Self::default()
        }
    }

    /// Counts one more row of the given category
    pub fn record(&mut self, result_type: ResultType) {
        self.total += 1;
        match result_type {
            ResultType::Passed => self.passed += 1,
            ResultType::Failed => self.failed += 1,
            ResultType::NotFound => self.not_found += 1,
            ResultType::Extra => self.extra += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn passed(&self) -> u64 {
        self.passed
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn not_found(&self) -> u64 {
        self.not_found
    }

    pub fn extra(&self) -> u64 {
        self.extra
    }

    pub fn count(&self, result_type: ResultType) -> u64 {
        match result_type {
            ResultType::Passed => self.passed,
            ResultType::Failed => self.failed,
            ResultType::NotFound => self.not_found,
            ResultType::Extra => self.extra,
        }
    }

    /// True if no compared row differs; an empty comparison is a success
    pub fn is_success(&self) -> bool {
        self.total == self.passed
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    pub fn details_path(&self, result_type: ResultType) -> Option<&Path> {
        match result_type {
            ResultType::Passed => self.passed_details.as_deref(),
            ResultType::Failed => self.failed_details.as_deref(),
            ResultType::NotFound => self.not_found_details.as_deref(),
            ResultType::Extra => self.extra_details.as_deref(),
        }
    }

    pub fn set_details_path(&mut self, result_type: ResultType, path: PathBuf) {
        let slot = match result_type {
            ResultType::Passed => &mut self.passed_details,
            ResultType::Failed => &mut self.failed_details,
            ResultType::NotFound => &mut self.not_found_details,
            ResultType::Extra => &mut self.extra_details,
        };
        *slot = Some(path);
    }

    pub fn errors_path(&self) -> Option<&Path> {
        self.errors.as_deref()
    }

    pub fn set_errors_path(&mut self, path: PathBuf) {
        self.errors = Some(path);
    }

    pub fn started(&self) -> Option<NaiveDateTime> {
        self.started
    }

    pub fn finished(&self) -> Option<NaiveDateTime> {
        self.finished
    }

    pub fn mark_started(&mut self) {
        self.started = Some(Local::now().naive_local());
    }

    pub fn mark_finished(&mut self) {
        self.finished = Some(Local::now().naive_local());
    }
}

use crate::result::ComparisonResult;
use crate::tool::{CancellationToken, ComparisonSettings, DataComparatorTool};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use tabcompare_common::{TabCompareError, TableDataReader, TaskId};
use tracing::{error, info};

#[derive(Debug, Default)]
struct TaskState {
    running: bool,
    result: Option<ComparisonResult>,
    error: Option<String>,
}

/// One comparison running on its own worker thread
pub struct DataComparisonTask {
    id: TaskId,
    token: CancellationToken,
    state: Arc<Mutex<TaskState>>,
    handle: Option<JoinHandle<()>>,
}

impl DataComparisonTask {
    pub fn start(
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        settings: ComparisonSettings,
    ) -> Result<Self, TabCompareError> {
        Self::start_with_tool(DataComparatorTool::new(), expected, actual, settings)
    }

    pub fn start_with_tool(
        tool: DataComparatorTool,
        expected: Box<dyn TableDataReader>,
        actual: Box<dyn TableDataReader>,
        settings: ComparisonSettings,
    ) -> Result<Self, TabCompareError> {
        let id = TaskId::new();
        let token = CancellationToken::new();
        let state = Arc::new(Mutex::new(TaskState {
            running: true,
            ..TaskState::default()
        }));

        let worker_token = token.clone();
        let worker_state = state.clone();
        let handle = thread::Builder::new()
            .name(format!("table-comparison-{}", id))
            .spawn(move || {
                info!("Comparison task {} started", id);
                let outcome = tool.compare_with_cancel(expected, actual, &settings, Some(&worker_token));
                let mut state = lock(&worker_state);
                match outcome {
                    Ok(result) => state.result = Some(result),
                    Err(e) => {
                        error!("Comparison task {} failed: {}", id, e);
                        state.error = Some(e.to_string());
                    }
                }
                state.running = false;
            })?;

        Ok(Self {
            id,
            token,
            state,
            handle: Some(handle),
        })
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn is_running(&self) -> bool {
        lock(&self.state).running
    }

    /// Result of a completed or cancelled run
    pub fn result(&self) -> Option<ComparisonResult> {
        lock(&self.state).result.clone()
    }

    pub fn error(&self) -> Option<String> {
        lock(&self.state).error.clone()
    }

    /// Asks the worker to stop after the row it is processing
    pub fn interrupt(&self) {
        info!("Interrupting comparison task {}", self.id);
        self.token.cancel();
    }

    /// Blocks until the worker has finished
    pub fn wait(&mut self) -> Result<(), TabCompareError> {
        if let Some(handle) = self.handle.take() {
            handle.join().map_err(|_| {
                TabCompareError::Comparison(format!("Comparison task {} panicked", self.id))
            })?;
        }
        Ok(())
    }
}

fn lock(state: &Mutex<TaskState>) -> MutexGuard<'_, TaskState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

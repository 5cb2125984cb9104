//! Fake driver implementation for testing
//!
//! Records every call and plays back scripted results, replacing the
//! generated mocks used against the driver contract elsewhere. One-shot
//! results are queued and consumed in order; when the queue is empty the
//! driver answers with its default output.

use crate::{DeleteRequest, DriverError, ExecuteRequest, RecipeDriver};
use async_trait::async_trait;
use canopy_core::{RecipeOutput, ResourceId};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Recorded call to a driver method
#[derive(Debug, Clone, PartialEq)]
pub enum DriverCall {
    Execute {
        resource_id: ResourceId,
        recipe: String,
        parameters: Map<String, Value>,
        dependencies: BTreeMap<String, Map<String, Value>>,
        prior_output: Option<RecipeOutput>,
    },
    Delete {
        resource_id: ResourceId,
        outputs: RecipeOutput,
    },
}

#[derive(Default)]
struct FakeState {
    calls: Vec<DriverCall>,
    /// One-shot results consumed before the default output
    execute_queue: VecDeque<Result<RecipeOutput, DriverError>>,
    default_output: RecipeOutput,
    delete_error: Option<DriverError>,
    execute_delay: Option<Duration>,
}

/// Fake driver with call recording and scriptable results
#[derive(Clone, Default)]
pub struct FakeDriver {
    state: Arc<Mutex<FakeState>>,
}

impl FakeDriver {
    /// A driver that succeeds with an empty output
    pub fn new() -> Self {
        Self::default()
    }

    /// A driver that succeeds with the given output
    pub fn succeeding_with(output: RecipeOutput) -> Self {
        let driver = Self::new();
        driver.set_default_output(output);
        driver
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Output returned once scripted results are exhausted
    pub fn set_default_output(&self, output: RecipeOutput) {
        self.lock().default_output = output;
    }

    /// Queue a one-shot execute result
    pub fn push_execute_result(&self, result: Result<RecipeOutput, DriverError>) {
        self.lock().execute_queue.push_back(result);
    }

    /// Queue `n` transient failures ahead of the default output
    pub fn fail_transient_times(&self, n: usize, reason: &str) {
        let mut state = self.lock();
        for _ in 0..n {
            state
                .execute_queue
                .push_back(Err(DriverError::transient(reason)));
        }
    }

    /// Make delete fail with the given error until cleared
    pub fn set_delete_error(&self, error: Option<DriverError>) {
        self.lock().delete_error = error;
    }

    /// Delay every execute call, for deadline tests
    pub fn set_execute_delay(&self, delay: Duration) {
        self.lock().execute_delay = Some(delay);
    }

    /// All recorded calls, in order
    pub fn calls(&self) -> Vec<DriverCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn execute_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Execute { .. }))
            .count()
    }

    pub fn delete_calls(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, DriverCall::Delete { .. }))
            .count()
    }

    /// Outputs passed to recorded delete calls, in order
    pub fn deleted_outputs(&self) -> Vec<RecipeOutput> {
        self.lock()
            .calls
            .iter()
            .filter_map(|c| match c {
                DriverCall::Delete { outputs, .. } => Some(outputs.clone()),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl RecipeDriver for FakeDriver {
    async fn execute(&self, request: ExecuteRequest) -> Result<RecipeOutput, DriverError> {
        let delay = self.lock().execute_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.lock();
        state.calls.push(DriverCall::Execute {
            resource_id: request.resource_id.clone(),
            recipe: request.recipe.to_string(),
            parameters: request.parameters.clone(),
            dependencies: request.dependencies.clone(),
            prior_output: request.prior_output.clone(),
        });

        match state.execute_queue.pop_front() {
            Some(result) => result,
            None => Ok(state.default_output.clone()),
        }
    }

    async fn delete(&self, request: DeleteRequest) -> Result<(), DriverError> {
        let mut state = self.lock();
        state.calls.push(DriverCall::Delete {
            resource_id: request.resource_id.clone(),
            outputs: request.outputs.clone(),
        });

        match &state.delete_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }
}

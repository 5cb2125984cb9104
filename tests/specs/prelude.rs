//! Shared harness for the engine specs

use canopy_core::{
    EngineConfig, OperationId, OperationRecord, RecipeRef, ResourceId, ResourceSpec,
    SequentialIdGen,
};
use canopy_drivers::{DriverRegistry, FakeDriver};
use canopy_engine::OperationEngine;
use canopy_store::JsonStore;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

pub const WEB: &str =
    "/subscriptions/s1/resourceGroups/rg1/providers/Applications.Core/containers/web";
pub const CACHE: &str =
    "/subscriptions/s1/resourceGroups/rg1/providers/Applications.Core/caches/db";

pub struct Harness {
    // keeps the store directory alive for the test's duration
    _dir: tempfile::TempDir,
    pub store: JsonStore,
    pub driver: FakeDriver,
    pub engine: OperationEngine<JsonStore, SequentialIdGen>,
}

impl Harness {
    pub fn store_path(&self) -> &std::path::Path {
        self._dir.path()
    }
}

pub fn harness() -> Harness {
    harness_with_config(
        EngineConfig::default()
            .with_max_attempts(3)
            .with_retry_base(Duration::from_millis(5))
            .with_retry_cap(Duration::from_millis(20))
            .with_driver_timeout(Duration::from_secs(2)),
    )
}

pub fn harness_with_config(config: EngineConfig) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let store = JsonStore::open(dir.path()).unwrap();
    let driver = FakeDriver::new();
    let registry = Arc::new(
        DriverRegistry::new()
            .with_driver("Applications.Core/containers", Arc::new(driver.clone()))
            .with_driver("Applications.Core/caches", Arc::new(driver.clone())),
    );
    let engine = OperationEngine::new(store.clone(), registry, config)
        .with_id_gen(SequentialIdGen::new("op"));
    Harness {
        _dir: dir,
        store,
        driver,
        engine,
    }
}

pub fn rid(s: &str) -> ResourceId {
    ResourceId::parse(s).unwrap()
}

pub fn container_spec(properties: Value) -> ResourceSpec {
    ResourceSpec::new(RecipeRef::new("container").with_version("1"), properties)
}

pub async fn wait_terminal(
    engine: &OperationEngine<JsonStore, SequentialIdGen>,
    id: &OperationId,
) -> OperationRecord {
    for _ in 0..400 {
        let op = engine.get_status(id).await.unwrap();
        if op.is_terminal() {
            return op;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("operation {id} did not reach a terminal state");
}

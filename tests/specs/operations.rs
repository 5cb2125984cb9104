//! Operation lifecycle specs

use crate::prelude::*;
use canopy_core::{OperationStatus, ProvisioningState, RecipeOutput};
use canopy_engine::EngineError;
use serde_json::json;

#[tokio::test]
async fn create_reaches_succeeded_and_computed_properties_are_readable() {
    let h = harness();
    h.driver
        .set_default_output(RecipeOutput::new().with_value("endpoint", "x"));
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx", "recipe": "r1"})))
        .await
        .unwrap();

    let op = wait_terminal(&h.engine, &op_id).await;
    assert_eq!(op.status, OperationStatus::Succeeded);

    let record = h.engine.get_resource(&id).await.unwrap().unwrap();
    assert_eq!(record.computed_values["endpoint"], json!("x"));
    assert_eq!(record.provisioning_state, ProvisioningState::Provisioned);
}

#[tokio::test]
async fn concurrent_updates_admit_exactly_one() {
    let h = harness();
    h.driver.set_execute_delay(std::time::Duration::from_millis(100));
    let id = rid(WEB);

    let (first, second) = tokio::join!(
        h.engine
            .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx:1"}))),
        h.engine
            .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx:2"}))),
    );

    // one operation id, one immediate conflict
    assert!(first.is_ok() ^ second.is_ok());
    let conflict = if first.is_err() { first } else { second };
    assert!(matches!(
        conflict,
        Err(EngineError::OperationInFlight(_))
    ));
}

#[tokio::test]
async fn update_replaces_declared_properties() {
    let h = harness();
    h.driver
        .set_default_output(RecipeOutput::new().with_value("endpoint", "v1"));
    let id = rid(WEB);

    let op = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx:1"})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op).await;

    h.driver
        .set_default_output(RecipeOutput::new().with_value("endpoint", "v2"));
    let op = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx:2"})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op).await;

    let record = h.engine.get_resource(&id).await.unwrap().unwrap();
    assert_eq!(record.properties["image"], json!("nginx:2"));
    assert_eq!(record.computed_values["endpoint"], json!("v2"));
}

#[tokio::test]
async fn always_transient_driver_exhausts_the_attempt_ceiling() {
    let h = harness();
    h.driver.fail_transient_times(10, "rate limited");
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;

    assert_eq!(op.status, OperationStatus::Failed);
    assert_eq!(op.attempts, 3);
    assert_eq!(h.driver.execute_calls(), 3);
    assert!(op.error.unwrap().message.contains("rate limited"));
}

#[tokio::test]
async fn dependency_outputs_flow_into_the_connected_resource() {
    let h = harness();
    let cache_id = rid(CACHE);
    let web_id = rid(WEB);

    h.driver
        .set_default_output(RecipeOutput::new().with_value("host", "redis.internal"));
    let op = h
        .engine
        .enqueue_create_or_update(&cache_id, container_spec(json!({})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op).await;

    // the caller sequences dependents after their dependencies
    h.driver.set_default_output(RecipeOutput::new().with_value("endpoint", "x"));
    let op = h
        .engine
        .enqueue_create_or_update(
            &web_id,
            container_spec(json!({
                "image": "nginx",
                "connections": { "db": { "source": CACHE } }
            })),
        )
        .await
        .unwrap();
    let op = wait_terminal(&h.engine, &op).await;
    assert_eq!(op.status, OperationStatus::Succeeded);

    // the driver saw the cache's computed values under the connection name
    let calls = h.driver.calls();
    let last_execute = calls
        .iter()
        .rev()
        .find_map(|c| match c {
            canopy_drivers::DriverCall::Execute { dependencies, .. } => Some(dependencies.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(last_execute["db"]["host"], json!("redis.internal"));
}

#[tokio::test]
async fn delete_then_read_returns_nothing() {
    let h = harness();
    let id = rid(WEB);

    let op = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op).await;

    let op = h.engine.enqueue_delete(&id).await.unwrap();
    let op = wait_terminal(&h.engine, &op).await;
    assert_eq!(op.status, OperationStatus::Succeeded);

    assert!(h.engine.get_resource(&id).await.unwrap().is_none());
    let listed = h
        .engine
        .list_resources(&rid(
            "/subscriptions/s1/resourceGroups/rg1/providers/Applications.Core/containers/web",
        ))
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn operation_status_survives_a_store_reopen() {
    let h = harness();
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op_id).await;

    // a fresh engine over the same directory sees the terminal operation
    let reopened = canopy_store::JsonStore::open(h.store_path()).unwrap();
    let engine = canopy_engine::OperationEngine::new(
        reopened,
        std::sync::Arc::new(canopy_drivers::DriverRegistry::new()),
        canopy_core::EngineConfig::default(),
    );
    let op = engine.get_status(&op_id).await.unwrap();
    assert_eq!(op.status, OperationStatus::Succeeded);
}

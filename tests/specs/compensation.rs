//! Compensation specs: failed deploys never orphan infrastructure

use crate::prelude::*;
use canopy_core::{OperationStatus, ProvisioningState, RecipeOutput};
use canopy_drivers::DriverError;
use serde_json::json;

#[tokio::test]
async fn partial_failure_compensates_before_the_error_is_reported() {
    let h = harness();
    let partial = RecipeOutput::new().with_resource("half-created-lb");
    h.driver.push_execute_result(Err(DriverError::Failed {
        reason: "provisioner died mid-apply".into(),
        partial_output: Some(partial.clone()),
    }));
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;

    // the operation failed with the original driver error
    assert_eq!(op.status, OperationStatus::Failed);
    let error = op.error.unwrap();
    assert!(error.message.contains("provisioner died mid-apply"));

    // exactly one compensating delete, carrying exactly the partial output
    assert_eq!(h.driver.delete_calls(), 1);
    assert_eq!(h.driver.deleted_outputs(), vec![partial]);

    // nothing half-persisted, checked against the raw stored record
    use canopy_store::ResourceStore;
    let stored = h.store.get_resource(&id).await.unwrap().unwrap();
    assert!(stored.record.computed_values.is_empty());
    assert!(stored.record.output_resources.is_empty());
    assert!(stored.record.secrets.is_empty());
    assert_eq!(stored.record.provisioning_state, ProvisioningState::Failed);
}

#[tokio::test]
async fn compensation_runs_once_per_failed_attempt() {
    let h = harness();
    let partial = RecipeOutput::new().with_resource("orphan");
    for _ in 0..2 {
        h.driver.push_execute_result(Err(DriverError::Transient {
            reason: "timed out applying".into(),
            partial_output: Some(partial.clone()),
        }));
    }
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;

    // two failed attempts, then the third succeeds with the default output
    assert_eq!(op.status, OperationStatus::Succeeded);
    assert_eq!(h.driver.execute_calls(), 3);
    assert_eq!(h.driver.delete_calls(), 2);
}

#[tokio::test]
async fn delete_after_a_failed_deploy_cleans_up() {
    let h = harness();
    h.driver
        .push_execute_result(Err(DriverError::failed("bad template")));
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;
    assert_eq!(op.status, OperationStatus::Failed);

    // the record is still there, so the caller can issue a delete
    let op_id = h.engine.enqueue_delete(&id).await.unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;
    assert_eq!(op.status, OperationStatus::Succeeded);
    assert!(h.engine.get_resource(&id).await.unwrap().is_none());
}

#[tokio::test]
async fn failed_delete_keeps_the_record_for_retry() {
    let h = harness();
    let id = rid(WEB);

    let op_id = h
        .engine
        .enqueue_create_or_update(&id, container_spec(json!({"image": "nginx"})))
        .await
        .unwrap();
    wait_terminal(&h.engine, &op_id).await;

    // every delete attempt fails permanently
    h.driver
        .set_delete_error(Some(DriverError::failed("still attached")));
    let op_id = h.engine.enqueue_delete(&id).await.unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;
    assert_eq!(op.status, OperationStatus::Failed);
    assert!(h.engine.get_resource(&id).await.unwrap().is_some());

    // clearing the failure lets a retried delete finish the job
    h.driver.set_delete_error(None);
    let op_id = h.engine.enqueue_delete(&id).await.unwrap();
    let op = wait_terminal(&h.engine, &op_id).await;
    assert_eq!(op.status, OperationStatus::Succeeded);
    assert!(h.engine.get_resource(&id).await.unwrap().is_none());

    // one execute for the create, one driver delete per delete attempt
    assert_eq!(h.driver.execute_calls(), 1);
    assert_eq!(h.driver.delete_calls(), 2);
}

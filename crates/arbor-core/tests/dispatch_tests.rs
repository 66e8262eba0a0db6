//! Dispatch Tests
//!
//! ## Scenarios Covered
//!
//! 1. A registered handler is invoked exactly once
//! 2. Unknown addresses and operations become typed failures
//! 3. Inherited handlers apply below their node
//! 4. Template bindings reach the handler
//! 5. Handler failures surface verbatim

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::atomic::Ordering;

use arbor_core::errors::{ArborError, FailureKind, Result};
use arbor_core::model::{ReadResourceModel, ResultValue};
use arbor_core::operation::{names, OperationContext};
use arbor_core::{ManagementRequest, PathAddress, ResourceRegistry};

fn test_service_registry() -> (ResourceRegistry, std::sync::Arc<std::sync::atomic::AtomicUsize>) {
    let (handler, calls) = common::counting_handler();
    let mut registry = ResourceRegistry::new();
    registry
        .register_sub_resource("test-service", "Test service")
        .unwrap()
        .register_sub_resource("foo", "Foo")
        .unwrap()
        .register_operation_handler(names::READ_RESOURCE, handler, "counting read")
        .unwrap();
    (registry, calls)
}

#[test]
fn test_registered_handler_invoked_once() {
    // GIVEN a counting read-resource handler at /test-service/foo
    let (registry, calls) = test_service_registry();
    let controller = common::controller(registry);

    // WHEN read-resource is executed there
    let response = controller.execute(ManagementRequest::read_resource(PathAddress::parse(
        "/test-service/foo",
    )));

    // THEN the handler ran once and the outcome is a success
    assert!(response.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_unknown_address_is_resource_not_found() {
    let (registry, calls) = test_service_registry();
    let controller = common::controller(registry);

    let response = controller.execute(ManagementRequest::read_resource(PathAddress::parse(
        "/test-service/unknown",
    )));

    let failure = response.failure().expect("failure outcome");
    assert_eq!(failure.kind(), FailureKind::ResourceNotFound);
    assert_eq!(failure.code(), "ERR_RESOURCE_NOT_FOUND");
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unknown_operation_is_operation_not_found() {
    let (registry, _) = test_service_registry();
    let controller = common::controller(registry);

    let err = controller
        .invoke(ManagementRequest::new(
            "restart",
            PathAddress::parse("/test-service/foo"),
        ))
        .unwrap_err();

    assert_eq!(
        err,
        ArborError::OperationNotFound {
            operation: "restart".to_string(),
            address: PathAddress::parse("/test-service/foo"),
        }
    );
}

#[test]
fn test_global_read_resource_lists_children() {
    // GIVEN a node without its own read-resource handler
    let (registry, _) = test_service_registry();
    let controller = common::controller(registry);

    // WHEN read-resource runs there
    let value = controller
        .invoke(ManagementRequest::read_resource(PathAddress::parse(
            "/test-service",
        )))
        .unwrap();

    // THEN the inherited global handler describes it
    assert_eq!(
        value.as_read_resource(),
        Some(&ReadResourceModel::new("Test service", vec!["foo".to_string()]))
    );
}

#[test]
fn test_template_bindings_reach_handler() {
    // GIVEN a handler below two template slots
    let mut registry = ResourceRegistry::new();
    registry
        .register_sub_resource("content", "")
        .unwrap()
        .register_sub_resource("{site-type}", "")
        .unwrap()
        .register_sub_resource("{site-name}", "")
        .unwrap()
        .register_operation_handler(
            names::READ_CONFIG,
            |ctx: &OperationContext<'_>| -> Result<ResultValue> {
                Ok(ResultValue::Value(serde_json::json!({
                    "type": ctx.require_path_template("site-type")?,
                    "name": ctx.require_path_template("site-name")?,
                    "address": ctx.address().to_string(),
                })))
            },
            "",
        )
        .unwrap();
    let controller = common::controller(registry);

    // WHEN invoked at a concrete address
    let value = controller
        .invoke(ManagementRequest::new(
            names::READ_CONFIG,
            PathAddress::parse("/content/portal/classic"),
        ))
        .unwrap();

    // THEN each slot is bound to its segment
    assert_eq!(
        value.as_value().unwrap(),
        &serde_json::json!({"type": "portal", "name": "classic", "address": "/content/portal/classic"})
    );
}

#[test]
fn test_handler_failure_surfaces_verbatim() {
    let mut registry = ResourceRegistry::new();
    registry
        .register_sub_resource("broken", "")
        .unwrap()
        .register_operation_handler(names::READ_CONFIG, common::failing_handler("backend down"), "")
        .unwrap();
    let controller = common::controller(registry);

    let response = controller.execute(ManagementRequest::new(
        names::READ_CONFIG,
        PathAddress::parse("/broken"),
    ));

    let failure = response.failure().unwrap();
    assert_eq!(failure.kind(), FailureKind::OperationFailure);
    assert_eq!(failure.message(), "backend down");
    assert_eq!(failure.op(), Some(names::READ_CONFIG));
    assert_eq!(failure.address(), Some(&PathAddress::parse("/broken")));

    let mut out = Vec::new();
    response.write_to(&mut out).unwrap();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["code"], "ERR_OPERATION_FAILURE");
}

#[test]
fn test_get_children_for_completion() {
    let (registry, _) = test_service_registry();
    let controller = common::controller(registry);

    assert_eq!(
        controller.get_children(&PathAddress::root()).unwrap(),
        vec!["test-service".to_string()]
    );
    assert!(matches!(
        controller.get_children(&PathAddress::parse("/missing")),
        Err(ArborError::ResourceNotFound { .. })
    ));
}

#[test]
fn test_delegation_shares_request() {
    // GIVEN a handler that delegates read-resource to its parent
    let mut registry = ResourceRegistry::new();
    let parent = registry.register_sub_resource("parent", "the parent").unwrap();
    parent.register_sub_resource("a", "").unwrap();
    parent
        .register_sub_resource("child", "")
        .unwrap()
        .register_operation_handler(
            "describe-parent",
            |ctx: &OperationContext<'_>| -> Result<ResultValue> {
                let parent = ctx.address().parent().unwrap();
                ctx.delegate(&parent, names::READ_RESOURCE)
            },
            "",
        )
        .unwrap();
    let controller = common::controller(registry);

    // WHEN the delegating operation runs
    let value = controller
        .invoke(ManagementRequest::new(
            "describe-parent",
            PathAddress::parse("/parent/child"),
        ))
        .unwrap();

    // THEN the parent's description comes back
    let model = value.as_read_resource().unwrap();
    assert_eq!(model.description, "the parent");
    assert_eq!(model.children, vec!["a", "child"]);
}

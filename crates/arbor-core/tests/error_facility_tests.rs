use arbor_core::address::PathAddress;
use arbor_core::errors::{ArborError, FailureDescription, FailureKind};

#[test]
fn test_resource_not_found_verifiable_by_kind() {
    let err = ArborError::ResourceNotFound {
        address: PathAddress::parse("/content/unknown"),
    };

    let failure: FailureDescription = err.into();

    assert_eq!(failure.kind(), FailureKind::ResourceNotFound);
    assert_eq!(failure.code(), "ERR_RESOURCE_NOT_FOUND");
    assert_eq!(failure.address(), Some(&PathAddress::parse("/content/unknown")));
}

#[test]
fn test_step_address_carried_into_description() {
    let err = ArborError::operation_failed("bad payload").at_step(PathAddress::parse("/a/b"));

    let failure = FailureDescription::from(&err);

    assert_eq!(failure.kind(), FailureKind::OperationFailure);
    assert_eq!(failure.step_address(), Some(&PathAddress::parse("/a/b")));
    assert!(failure.message().ends_with("[Step Address: /a/b]"));
}

#[test]
fn test_import_failure_reports_rollback_outcome() {
    let err = ArborError::ImportFailed {
        site: "portal/classic".to_string(),
        kind: "navigation".to_string(),
        message: "store offline".to_string(),
        rollback_succeeded: false,
        rollback_errors: vec!["portal/classic pages: locked".to_string()],
    };

    let failure = FailureDescription::from(&err);

    assert_eq!(failure.kind(), FailureKind::ImportFailure);
    assert_eq!(failure.rollback_succeeded(), Some(false));
    assert!(failure.message().contains("data may be inconsistent"));
}

#[test]
fn test_registration_errors_share_kind() {
    let duplicate = ArborError::DuplicateOperation {
        operation: "read-config".to_string(),
        address: PathAddress::parse("/x"),
    };
    let ambiguous = ArborError::AmbiguousTemplate {
        address: PathAddress::parse("/x"),
        existing: "{a}".to_string(),
        requested: "{b}".to_string(),
    };

    assert_eq!(duplicate.kind(), FailureKind::Registration);
    assert_eq!(ambiguous.kind(), FailureKind::Registration);
}

#[test]
fn test_error_kind_code_mapping() {
    let kinds = vec![
        (FailureKind::ResourceNotFound, "ERR_RESOURCE_NOT_FOUND"),
        (FailureKind::OperationNotFound, "ERR_OPERATION_NOT_FOUND"),
        (FailureKind::OperationFailure, "ERR_OPERATION_FAILURE"),
        (FailureKind::ImportFailure, "ERR_IMPORT_FAILURE"),
        (FailureKind::Parse, "ERR_PARSE"),
        (FailureKind::InvalidInput, "ERR_INVALID_INPUT"),
        (FailureKind::AttachmentMissing, "ERR_ATTACHMENT_MISSING"),
        (FailureKind::Registration, "ERR_REGISTRATION"),
        (FailureKind::Configuration, "ERR_CONFIGURATION"),
        (FailureKind::Persistence, "ERR_PERSISTENCE"),
        (FailureKind::Serialization, "ERR_SERIALIZATION"),
        (FailureKind::Io, "ERR_IO"),
        (FailureKind::Internal, "ERR_INTERNAL"),
    ];

    let mut codes = std::collections::HashSet::new();
    for (kind, code) in kinds {
        assert_eq!(kind.code(), code);
        assert!(codes.insert(code), "duplicate code {code}");
    }
}

#[test]
fn test_failure_display() {
    let failure = FailureDescription::new(FailureKind::OperationNotFound)
        .with_op("restart")
        .with_address(PathAddress::parse("/svc"))
        .with_message("no such operation");

    assert_eq!(
        failure.to_string(),
        "[ERR_OPERATION_NOT_FOUND] in operation 'restart' at /svc: no such operation"
    );
}

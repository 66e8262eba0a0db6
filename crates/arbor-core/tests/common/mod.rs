use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arbor_core::errors::{ArborError, Result};
use arbor_core::marshal::MarshallerRegistry;
use arbor_core::model::{BytesExportTask, ExportResourceModel, ResultValue};
use arbor_core::operation::{OperationContext, OperationHandler};
use arbor_core::registry::ResourceRegistry;
use arbor_core::runtime::RuntimeContext;
use arbor_core::ManagementController;

/// Controller over `registry` with default marshallers and no components
#[allow(dead_code)]
pub fn controller(registry: ResourceRegistry) -> ManagementController {
    ManagementController::new(
        registry,
        RuntimeContext::new(),
        MarshallerRegistry::with_defaults(),
    )
}

/// Handler that counts its invocations and returns no result
#[allow(dead_code)]
pub fn counting_handler() -> (impl OperationHandler + 'static, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let handler = move |_ctx: &OperationContext<'_>| -> Result<ResultValue> {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(ResultValue::NoResult)
    };
    (handler, calls)
}

/// Export handler producing one in-memory entry
#[allow(dead_code)]
pub fn fixed_export(path: &'static str, data: &'static str) -> impl OperationHandler + 'static {
    move |_ctx: &OperationContext<'_>| -> Result<ResultValue> {
        Ok(ResultValue::Export(ExportResourceModel::single(Arc::new(
            BytesExportTask::new(path, data),
        ))))
    }
}

/// Export handler named after the template value bound at its node
#[allow(dead_code)]
pub fn templated_export(template: &'static str) -> impl OperationHandler + 'static {
    move |ctx: &OperationContext<'_>| -> Result<ResultValue> {
        let value = ctx.require_path_template(template)?;
        Ok(ResultValue::Export(ExportResourceModel::single(Arc::new(
            BytesExportTask::new(format!("{}/{}.json", template, value), value),
        ))))
    }
}

/// Handler that always fails with `message`
#[allow(dead_code)]
pub fn failing_handler(message: &'static str) -> impl OperationHandler + 'static {
    move |_ctx: &OperationContext<'_>| -> Result<ResultValue> {
        Err(ArborError::operation_failed(message))
    }
}

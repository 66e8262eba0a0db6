use tracing::debug;

use crate::address::PathAddress;
use crate::errors::{ArborError, Result};
use crate::filter::PathTemplateFilter;
use crate::model::{ExportResourceModel, ResultValue};
use crate::operation::{attributes, names, OperationContext, OperationHandler};

/// Generic subtree export
///
/// A node with its own `export-resource` handler exports itself and ends
/// the recursion, provided its template bindings pass the `filter`
/// attribute. Every other node is walked through `read-resource`. Tasks
/// are concatenated depth-first in child order.
///
/// A failure below the invoked address is reported as `OperationFailed`
/// carrying the address of the failing step.
#[derive(Debug, Clone, Copy, Default)]
pub struct ExportResourceHandler;

/// Failure together with the address being processed when it happened
struct StepFailure {
    step: PathAddress,
    error: ArborError,
}

impl StepFailure {
    fn at(step: &PathAddress) -> impl FnOnce(ArborError) -> StepFailure + '_ {
        move |error| StepFailure {
            step: step.clone(),
            error,
        }
    }
}

impl OperationHandler for ExportResourceHandler {
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<ResultValue> {
        let filter = PathTemplateFilter::parse_optional(ctx.attributes().get_all(attributes::FILTER))?;
        let origin = ctx.address();

        let mut model = ExportResourceModel::default();
        match export_branch(ctx, &filter, &mut model) {
            Ok(()) => {
                debug!(address = %origin, task_count = model.len(), "export collected");
                Ok(ResultValue::Export(model))
            }
            Err(StepFailure { step, error }) if &step == origin => Err(error),
            Err(StepFailure { step, error }) => Err(error.at_step(step)),
        }
    }
}

fn export_branch(
    ctx: &OperationContext<'_>,
    filter: &PathTemplateFilter,
    model: &mut ExportResourceModel,
) -> std::result::Result<(), StepFailure> {
    let address = ctx.address();

    if let Some(handler) = ctx.resource().own_operation_handler(names::EXPORT_RESOURCE) {
        if !address.accepts(filter, ctx.resolution()) {
            debug!(address = %address, "export branch filtered out");
            return Ok(());
        }
        let exported = handler.execute(ctx).map_err(StepFailure::at(address))?;
        return collect(exported, model).map_err(StepFailure::at(address));
    }

    let children = match ctx
        .delegate(address, names::READ_RESOURCE)
        .map_err(StepFailure::at(address))?
    {
        ResultValue::ReadResource(read) => read.children,
        other => {
            return Err(StepFailure::at(address)(ArborError::operation_failed(
                format!(
                    "read-resource returned {} instead of a resource description",
                    other.kind_name()
                ),
            )))
        }
    };

    for child in children {
        let child_address = address.append_segment(&child);
        let child_ctx = ctx
            .derive(child_address.clone(), names::EXPORT_RESOURCE)
            .map_err(StepFailure::at(&child_address))?;
        export_branch(&child_ctx, filter, model)?;
    }
    Ok(())
}

fn collect(exported: ResultValue, model: &mut ExportResourceModel) -> Result<()> {
    match exported {
        ResultValue::Export(tasks) => {
            model.extend(tasks);
            Ok(())
        }
        ResultValue::NoResult => Ok(()),
        other => Err(ArborError::operation_failed(format!(
            "export handler returned {} instead of export tasks",
            other.kind_name()
        ))),
    }
}

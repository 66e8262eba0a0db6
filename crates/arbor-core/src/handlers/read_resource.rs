use crate::errors::Result;
use crate::model::{ReadResourceModel, ResultValue};
use crate::operation::{OperationContext, OperationHandler};

/// Describes the matched node and lists its literal children. Never
/// recurses.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadResourceHandler;

impl OperationHandler for ReadResourceHandler {
    fn execute(&self, ctx: &OperationContext<'_>) -> Result<ResultValue> {
        let resource = ctx.resource();
        Ok(ResultValue::ReadResource(ReadResourceModel::new(
            resource.description(),
            resource.literal_child_names(),
        )))
    }
}

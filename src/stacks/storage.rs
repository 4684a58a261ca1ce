//! Bucket hosting the build component documents.

use super::{Stack, StackBuilder};
use crate::context::ContextStore;
use crate::error::Result;
use crate::parameters::Parameters;
use crate::resources::s3::Bucket;
use crate::template::Expr;

/// Name of the storage stack
pub const STACK_NAME: &str = "s3ops";

/// Declares the component bucket
pub struct StorageStack<'a> {
    parameters: &'a Parameters,
}

impl<'a> StorageStack<'a> {
    pub fn new(parameters: &'a Parameters) -> Self {
        Self { parameters }
    }
}

impl StackBuilder for StorageStack<'_> {
    fn stack_name(&self) -> String {
        STACK_NAME.to_string()
    }

    fn description(&self) -> Option<String> {
        Some("Bucket holding Image Builder component documents".to_string())
    }

    fn declare(&self, stack: &mut Stack, _context: &ContextStore) -> Result<()> {
        let bucket = stack.add(
            "components-bucket",
            &Bucket::named(&self.parameters.component_bucket_name),
        )?;

        stack.add_output("BucketName", bucket.reference(), Some("Component bucket"))?;
        stack.add_output(
            "ComponentsUri",
            Expr::from(self.parameters.components_uri()),
            Some("Prefix under which component documents are stored"),
        )?;
        Ok(())
    }
}

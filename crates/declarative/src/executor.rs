//! Execution engine - applies resources in order, stopping at the first failure

use crate::context::ApplyContext;
use crate::error::Result;
use crate::resource::Resource;
use crate::types::{ApplyResult, ExecuteSummary};

/// Apply a single resource, reporting start and completion
///
/// Errors are returned untouched; the caller decides whether the run goes on.
pub fn apply_resource<R>(resource: &R, ctx: &mut ApplyContext) -> Result<ApplyResult>
where
    R: Resource + ?Sized,
{
    let id = resource.id();
    ctx.reporter
        .on_resource_start(resource.resource_type(), &id, &resource.description());
    ctx.enter(id.clone());

    let result = resource.apply(ctx)?;

    ctx.reporter.on_resource_complete(&id, &result);
    Ok(result)
}

/// Converge a list of resources sequentially
///
/// Resources are applied strictly in the given order. The first error aborts
/// the pass: resources already converged stay converged, the rest are not
/// touched.
pub fn converge<'r, R, I>(resources: I, ctx: &mut ApplyContext) -> Result<ExecuteSummary>
where
    R: Resource + ?Sized + 'r,
    I: IntoIterator<Item = &'r R>,
{
    let mut summary = ExecuteSummary::default();
    for resource in resources {
        let result = apply_resource(resource, ctx)?;
        summary.add_result(&result);
    }
    Ok(summary)
}

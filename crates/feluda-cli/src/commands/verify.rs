use anyhow::Context;
use feluda_core::entities::EstimationResult;
use feluda_engine::audit;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::VerifyArgs;
use crate::commands::request::read_json;
use crate::output::output;

/// Handle `feluda verify`. Checks the record's digest, its re-evaluation and
/// the result's summary fields. Exits non-zero on mismatch.
pub fn handle(args: &VerifyArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let result: EstimationResult = read_json(&args.result)?;
    let expected = args.hash.as_deref().unwrap_or(&result.audit_hash);
    let verification = audit::verify_result(&result, expected)?;
    output(&verification, flags.format)?;
    verification
        .into_result()
        .with_context(|| format!("result {} failed verification", result.id))
}

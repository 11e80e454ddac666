use anyhow::{Context, bail};
use feluda_config::FeludaConfig;
use feluda_core::entities::EstimationResult;
use feluda_engine::{EstimateOptions, MrvService, SubmitApplication};
use feluda_env::{EnvironmentalSource, UnavailableSource};

use crate::cli::GlobalFlags;
use crate::cli::root_commands::EstimateArgs;
use crate::commands::request::{Dose, EstimateRequest, read_json};
use crate::output::output;

/// Handle `feluda estimate`.
///
/// With `--fetch` the configured providers are queried; otherwise the request's
/// embedded snapshot is used, or site defaults with an unavailable-data penalty.
pub async fn handle(
    args: &EstimateArgs,
    config: &FeludaConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let request: EstimateRequest = read_json(&args.request)?;
    if args.fetch && request.snapshot.is_some() {
        bail!("--fetch cannot be used with a request that embeds a snapshot");
    }

    let result = if args.fetch {
        let source = feluda_env::configured_source(&config.provider)
            .context("failed to build environmental data providers")?;
        run(request, args, config, source).await?
    } else {
        run(request, args, config, UnavailableSource).await?
    };
    output(&result, flags.format)
}

pub(crate) async fn run<S: EnvironmentalSource>(
    request: EstimateRequest,
    args: &EstimateArgs,
    config: &FeludaConfig,
    source: S,
) -> anyhow::Result<EstimationResult> {
    let service = MrvService::from_config(config, source)?;
    let farm = service.register_farm(&request.farm.name, &request.farm.boundary)?;

    let application = request.application;
    let application_id = match application.dose()? {
        Dose::Explicit {
            basalt_mass_kg,
            particle_size_mm,
        } => service.submit_application(SubmitApplication {
            farm_id: farm.farm_id.clone(),
            applied_at: application.applied_at,
            basalt_mass_kg,
            particle_size_mm,
            location: application.location,
            photo_ref: application.photo_ref.clone(),
        })?,
        Dose::Scenario(name) => service.submit_scenario(
            &farm.farm_id,
            name,
            application.applied_at,
            application.location,
        )?,
    };

    let options = EstimateOptions {
        as_of: args.as_of.or(request.as_of),
        snapshot: request.snapshot,
    };
    let result = service
        .estimate(&application_id, options)
        .await
        .with_context(|| format!("estimation failed for application {application_id}"))?;
    Ok(result)
}

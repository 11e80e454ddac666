pub mod area;
pub mod estimate;
pub mod request;
pub mod scenarios;
pub mod verify;

use feluda_config::FeludaConfig;

use crate::cli::{Commands, GlobalFlags};

/// Route a parsed command to its handler.
pub async fn dispatch(
    command: Commands,
    config: &FeludaConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Area(args) => area::handle(&args, flags),
        Commands::Estimate(args) => estimate::handle(&args, config, flags).await,
        Commands::Verify(args) => verify::handle(&args, flags),
        Commands::Scenarios => scenarios::handle(config, flags),
    }
}

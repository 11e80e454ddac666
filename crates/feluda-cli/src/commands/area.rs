use feluda_core::geo::GeoPoint;
use feluda_engine::geometry::Boundary;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::AreaArgs;
use crate::commands::request::{BoundaryFile, read_json};
use crate::output::output;

#[derive(Debug, Serialize)]
struct AreaResponse {
    area_ha: f64,
    /// Distinct vertices, closing vertex excluded.
    vertices: usize,
    ring: Vec<GeoPoint>,
}

/// Handle `feluda area`.
pub fn handle(args: &AreaArgs, flags: &GlobalFlags) -> anyhow::Result<()> {
    let ring = read_json::<BoundaryFile>(&args.boundary)?.into_ring();
    let boundary = Boundary::new(&ring)?;
    let response = AreaResponse {
        area_ha: boundary.area_ha(),
        vertices: boundary.ring().len() - 1,
        ring: boundary.into_ring(),
    };
    output(&response, flags.format)
}

// Structure validation: does a candidate box of blocks form a tank?
//
// `check_structure()` walks every cell of a dimension's footprint and applies
// the tank's material rules:
//
// - Size: the box must have an interior on every axis. Checked before any
//   cell is read.
// - Self rotation: the valve at the origin must face along the tank's axis
//   family (rotation bit unset for X-axis tanks, set for Z-axis tanks).
// - Corner columns: the four vertical edges never hold a valve.
// - Ring layers (strictly between floor and ceiling): side-wall cells are
//   glass, wall material or a correctly rotated valve; interior cells are
//   clear.
// - Floor and ceiling: every cell is glass or wall material. Valves are not
//   accepted here.
// - Boundary valves: a valve on one of the two lateral side planes must have
//   its rotation bit set for X-axis tanks and unset for Z-axis tanks.
// - Membership: during setup, a cell already claimed by another tank fails.
//   Re-validation of a committed tank skips this rule.
//
// The first violation ends the walk. The walk is read-only.
//
// See also: `geometry.rs` for the footprint, `manager.rs` which calls this
// before every commit and on every neighbor change.

use crate::config::TankConfig;
use crate::geometry::{CoordRange, Dimension};
use crate::types::{BlockKind, Orientation, Voxel, VoxelCoord};
use crate::world::VoxelGrid;

/// Rotation a valve at `origin` needs to set up a tank growing along
/// `orientation`.
fn self_rotation_ok(voxel: Voxel, orientation: Orientation) -> bool {
    match voxel.valve_rotation() {
        Some(rotated) => rotated != orientation.is_x_axis(),
        None => false,
    }
}

/// Rotation rule for valves inside the shell. Only valves on the two lateral
/// side planes are constrained.
fn boundary_rotation_ok(
    coord: VoxelCoord,
    rotated: bool,
    origin: VoxelCoord,
    dimension: &Dimension,
) -> bool {
    if dimension.orientation.is_x_axis() {
        let on_side = coord.z == origin.z - dimension.negative_width
            || coord.z == origin.z + dimension.positive_width;
        !on_side || rotated
    } else {
        let on_side = coord.x == origin.x - dimension.negative_width
            || coord.x == origin.x + dimension.positive_width;
        !on_side || !rotated
    }
}

/// Is `voxel` acceptable as a wall cell of the shell?
fn is_valid_wall(
    config: &TankConfig,
    coord: VoxelCoord,
    voxel: Voxel,
    origin: VoxelCoord,
    dimension: &Dimension,
    check_membership: bool,
    allow_valve: bool,
) -> bool {
    let material_ok = match voxel.kind {
        BlockKind::GlassWall | BlockKind::WallMaterial => true,
        BlockKind::Valve { rotated } => {
            let rotation = boundary_rotation_ok(coord, rotated, origin, dimension);
            if config.logs_cells() {
                log::trace!("Checking valve rotation at {coord}: {rotation}");
            }
            allow_valve && rotation
        }
        BlockKind::Empty | BlockKind::RenderProxy | BlockKind::Other => false,
    };
    material_ok && !(check_membership && voxel.is_part)
}

/// Check the candidate tank `dimension` with its valve at `origin`.
///
/// With `check_membership` set, cells that already belong to a tank are
/// rejected; setup uses this. Re-validation of a committed tank passes
/// `false`, since its own cells are marked.
pub fn check_structure<G: VoxelGrid + ?Sized>(
    grid: &G,
    config: &TankConfig,
    origin: VoxelCoord,
    dimension: &Dimension,
    check_membership: bool,
) -> bool {
    let range = CoordRange::new(origin, dimension);
    if config.logs_structure() {
        log::debug!(
            "Structure dimensions: start {}, end {}",
            range.start,
            range.end
        );
    }

    let good_size = dimension.is_formable();
    if config.logs_structure() {
        log::debug!("Is the size okay: {good_size}");
    }
    if !good_size {
        return false;
    }

    if !self_rotation_ok(grid.voxel(origin), dimension.orientation) {
        if config.logs_structure() {
            log::debug!("Valve at {origin} is not rotated along {:?}", dimension.orientation);
        }
        return false;
    }

    for coord in range.cells() {
        let voxel = grid.voxel(coord);

        if range.is_corner_column(coord) && voxel.is_valve() {
            return false;
        }

        let ok = if range.is_cap_layer(coord) {
            is_valid_wall(config, coord, voxel, origin, dimension, check_membership, false)
        } else if range.is_perimeter(coord) {
            is_valid_wall(config, coord, voxel, origin, dimension, check_membership, true)
        } else {
            voxel.is_clear()
        };
        if !ok {
            if config.logs_cells() {
                log::trace!("Structure rejected at {coord}: {:?}", voxel.kind);
            }
            return false;
        }
    }
    true
}

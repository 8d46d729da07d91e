// Tank geometry: dimensions, footprints and the outward probe.
//
// A tank is an axis-aligned box of walls around an empty interior. The valve
// that sets it up sits in the middle of one of the two short ends; the box's
// depth grows away from it along the `Orientation` axis, its width spreads to
// both sides of the valve, and its height runs from a floor below the valve
// to a ceiling above it.
//
// `scan_dimensions()` discovers a candidate box by probing empty space from
// the valve outward: sideways on the layer just past the valve, straight
// along the depth axis, and up/down. Each probe stops at the first cell that
// is neither empty nor a render proxy, or after `max_dimension - 2` steps.
// Raw counts are then widened to wall-to-wall measurements.
//
// `Dimension` is an immutable value. A slave valve's elevation inside a tank
// is a separate `Elevation` value derived from it.
//
// `CoordRange` is the inclusive footprint of a dimension placed at an
// origin. It is never stored; every caller recomputes it.
//
// See also: `validator.rs` which checks the cells of a footprint,
// `manager.rs` which commits and tears down structures.

use crate::config::TankConfig;
use crate::types::{Orientation, VoxelCoord};
use crate::world::VoxelGrid;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Dimension
// ---------------------------------------------------------------------------

/// Wall-to-wall measurements of one tank, relative to the valve that set it
/// up.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub orientation: Orientation,
    /// Cells to the negative side of the valve's column, far wall included.
    pub negative_width: i32,
    /// Cells to the positive side of the valve's column, far wall included.
    pub positive_width: i32,
    /// Cells along the growth axis including both end walls; 0 means no
    /// interior was found.
    pub depth: i32,
    /// Cells from the valve's layer up to and including the ceiling.
    pub to_top: i32,
    /// Cells below the valve's layer down to and including the floor.
    pub to_bottom: i32,
}

impl Dimension {
    pub fn new(
        orientation: Orientation,
        negative_width: i32,
        positive_width: i32,
        depth: i32,
        to_top: i32,
        to_bottom: i32,
    ) -> Self {
        Self {
            orientation,
            negative_width,
            positive_width,
            depth,
            to_top,
            to_bottom,
        }
    }

    /// Total width, both side walls included.
    pub fn width(&self) -> i32 {
        self.negative_width
            .saturating_add(self.positive_width)
            .saturating_add(1)
    }

    /// Total height, floor and ceiling included.
    pub fn height(&self) -> i32 {
        self.to_top.saturating_add(self.to_bottom)
    }

    /// A tank needs at least one interior cell on every axis.
    pub fn is_formable(&self) -> bool {
        self.width() > 2 && self.height() > 2 && self.depth > 2
    }

    /// Number of interior cells; 0 when the dimension is not formable.
    pub fn interior_volume(&self) -> u64 {
        if !self.is_formable() {
            return 0;
        }
        // All three factors are positive here.
        let w = u64::from((self.width() - 2).unsigned_abs());
        let h = u64::from((self.height() - 2).unsigned_abs());
        let d = u64::from((self.depth - 2).unsigned_abs());
        w * h * d
    }

    /// The valve's own elevation inside the tank.
    pub fn elevation(&self) -> Elevation {
        Elevation {
            to_bottom: self.to_bottom,
            to_top: self.to_top,
        }
    }

    /// Elevation of a member cell `delta_y` layers above the valve that set
    /// the tank up.
    pub fn elevation_at(&self, delta_y: i32) -> Elevation {
        Elevation {
            to_bottom: self.to_bottom + delta_y,
            to_top: self.to_top - delta_y,
        }
    }

    /// Inclusive footprint of this dimension with the valve at `origin`.
    pub fn footprint(&self, origin: VoxelCoord) -> CoordRange {
        CoordRange::new(origin, self)
    }

    /// X offset of the horizontal centre from the footprint's near corner.
    pub fn center_offset_x(&self) -> i32 {
        let side = if self.orientation.is_x_axis() {
            self.depth
        } else {
            self.width()
        };
        side.div_euclid(2)
    }

    /// Z offset of the horizontal centre from the footprint's near corner.
    pub fn center_offset_z(&self) -> i32 {
        let side = if self.orientation.is_x_axis() {
            self.width()
        } else {
            self.depth
        };
        side.div_euclid(2)
    }

    /// Where the render proxy of a tank set up at `origin` lives: the
    /// horizontal centre of the footprint, halfway between floor and ceiling.
    pub fn render_coord(&self, origin: VoxelCoord) -> VoxelCoord {
        let range = self.footprint(origin);
        VoxelCoord::new(
            range.start.x + self.center_offset_x(),
            (range.start.y + range.end.y) / 2,
            range.start.z + self.center_offset_z(),
        )
    }
}

/// How far a valve sits above the floor and below the ceiling of its tank,
/// walls included. Every member has the same `height()`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Elevation {
    pub to_bottom: i32,
    pub to_top: i32,
}

impl Elevation {
    pub fn height(&self) -> i32 {
        self.to_bottom.saturating_add(self.to_top)
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// Inclusive axis-aligned bounds `[start, end]` of a tank, walls included.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordRange {
    pub start: VoxelCoord,
    pub end: VoxelCoord,
}

impl CoordRange {
    /// Place `dimension` with its valve at `origin`.
    pub fn new(origin: VoxelCoord, dimension: &Dimension) -> Self {
        let start_y = origin.y - dimension.to_bottom;
        let end_y = origin.y + (dimension.to_top - 1);
        let (start_x, end_x, start_z, end_z) = match dimension.orientation {
            Orientation::XNeg => (
                origin.x - dimension.depth + 1,
                origin.x,
                origin.z - dimension.negative_width,
                origin.z + dimension.positive_width,
            ),
            Orientation::XPos => (
                origin.x,
                origin.x + dimension.depth - 1,
                origin.z - dimension.negative_width,
                origin.z + dimension.positive_width,
            ),
            Orientation::ZNeg => (
                origin.x - dimension.negative_width,
                origin.x + dimension.positive_width,
                origin.z - dimension.depth + 1,
                origin.z,
            ),
            Orientation::ZPos => (
                origin.x - dimension.negative_width,
                origin.x + dimension.positive_width,
                origin.z,
                origin.z + dimension.depth - 1,
            ),
        };
        Self {
            start: VoxelCoord::new(start_x, start_y, start_z),
            end: VoxelCoord::new(end_x, end_y, end_z),
        }
    }

    pub fn contains(&self, coord: VoxelCoord) -> bool {
        (self.start.x..=self.end.x).contains(&coord.x)
            && (self.start.y..=self.end.y).contains(&coord.y)
            && (self.start.z..=self.end.z).contains(&coord.z)
    }

    /// This range grown by `margin` cells on every side.
    pub fn expanded(&self, margin: i32) -> Self {
        Self {
            start: VoxelCoord::new(
                self.start.x - margin,
                self.start.y - margin,
                self.start.z - margin,
            ),
            end: VoxelCoord::new(self.end.x + margin, self.end.y + margin, self.end.z + margin),
        }
    }

    /// True on the four vertical edges of the box.
    pub fn is_corner_column(&self, coord: VoxelCoord) -> bool {
        (coord.x == self.start.x || coord.x == self.end.x)
            && (coord.z == self.start.z || coord.z == self.end.z)
    }

    /// True for the floor and ceiling layers.
    pub fn is_cap_layer(&self, coord: VoxelCoord) -> bool {
        coord.y == self.start.y || coord.y == self.end.y
    }

    /// True on the side walls (any layer).
    pub fn is_perimeter(&self, coord: VoxelCoord) -> bool {
        coord.x == self.start.x
            || coord.x == self.end.x
            || coord.z == self.start.z
            || coord.z == self.end.z
    }

    /// True for cells that make up the shell: floor, ceiling and side walls.
    pub fn is_member(&self, coord: VoxelCoord) -> bool {
        self.contains(coord) && (self.is_cap_layer(coord) || self.is_perimeter(coord))
    }

    /// Every cell in the range, y outermost, then x, then z.
    pub fn cells(&self) -> impl Iterator<Item = VoxelCoord> + use<> {
        let (start, end) = (self.start, self.end);
        (start.y..=end.y).flat_map(move |y| {
            (start.x..=end.x)
                .flat_map(move |x| (start.z..=end.z).map(move |z| VoxelCoord::new(x, y, z)))
        })
    }

    /// Every shell cell, in the same order as `cells()`.
    pub fn members(&self) -> impl Iterator<Item = VoxelCoord> + use<> {
        let range = *self;
        self.cells().filter(move |&c| range.is_member(c))
    }

    /// Interior cells: strictly inside the shell.
    pub fn interior(&self) -> impl Iterator<Item = VoxelCoord> + use<> {
        let range = *self;
        self.cells().filter(move |&c| !range.is_member(c))
    }
}

// ---------------------------------------------------------------------------
// Outward probe
// ---------------------------------------------------------------------------

/// Count consecutive clear cells from `from + step * first` through
/// `from + step * last`, stopping at the first blocked cell.
fn count_clear<G: VoxelGrid + ?Sized>(
    grid: &G,
    config: &TankConfig,
    from: VoxelCoord,
    step: VoxelCoord,
    first: i32,
    last: i32,
) -> i32 {
    let mut count = 0;
    for i in first..=last {
        let coord = from + step.scaled(i);
        let clear = grid.voxel(coord).is_clear();
        if config.logs_cells() {
            log::trace!("Is block at {coord} clear: {clear}");
        }
        if !clear {
            break;
        }
        count += 1;
    }
    count
}

/// Discover the candidate dimension of a tank whose valve sits at `origin`
/// and whose depth grows along `orientation`.
///
/// Pure: reads the grid, never writes it. Identical grids give identical
/// dimensions. The result may be too small to form; `validator.rs` decides.
pub fn scan_dimensions<G: VoxelGrid + ?Sized>(
    grid: &G,
    config: &TankConfig,
    origin: VoxelCoord,
    orientation: Orientation,
) -> Dimension {
    let reach = i32::try_from(config.max_dimension)
        .unwrap_or(i32::MAX)
        .saturating_sub(2);
    let depth_step = orientation.depth_step();
    let lateral = orientation.lateral_step();
    // Width and height are probed on the first layer past the valve.
    let inside = origin + depth_step;

    let negative_width = count_clear(grid, config, inside, lateral.scaled(-1), 1, reach);
    let positive_width = count_clear(grid, config, inside, lateral, 1, reach);
    let depth = count_clear(grid, config, origin, depth_step, 1, reach);
    let to_top = count_clear(grid, config, inside, VoxelCoord::UP, 0, reach);
    let to_bottom = count_clear(grid, config, inside, VoxelCoord::UP.scaled(-1), 1, reach);

    // Counts are of empty cells; widen them to include the walls.
    let dimension = Dimension::new(
        orientation,
        negative_width + 1,
        positive_width + 1,
        if depth > 0 { depth + 2 } else { 0 },
        to_top + 1,
        to_bottom + 1,
    );

    if config.logs_structure() {
        log::debug!("Valve elevation: {}", dimension.to_bottom);
    }
    dimension
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BlockKind, Voxel};
    use crate::world::VoxelWorld;

    /// Fill the shell of `range` with glass.
    fn build_shell(world: &mut VoxelWorld, range: CoordRange) {
        for coord in range.members() {
            world.set_voxel(coord, Voxel::new(BlockKind::GlassWall));
        }
    }

    #[test]
    fn dimension_derived_measurements() {
        let d = Dimension::new(Orientation::ZPos, 2, 2, 5, 3, 1);
        assert_eq!(d.width(), 5);
        assert_eq!(d.height(), 4);
        assert!(d.is_formable());
        assert_eq!(d.interior_volume(), 3 * 2 * 3);
    }

    #[test]
    fn footprint_for_each_orientation() {
        let origin = VoxelCoord::new(10, 5, 20);
        let d = |o| Dimension::new(o, 1, 2, 4, 2, 1);

        let r = d(Orientation::XPos).footprint(origin);
        assert_eq!(r.start, VoxelCoord::new(10, 4, 19));
        assert_eq!(r.end, VoxelCoord::new(13, 6, 22));

        let r = d(Orientation::XNeg).footprint(origin);
        assert_eq!(r.start, VoxelCoord::new(7, 4, 19));
        assert_eq!(r.end, VoxelCoord::new(10, 6, 22));

        let r = d(Orientation::ZPos).footprint(origin);
        assert_eq!(r.start, VoxelCoord::new(9, 4, 20));
        assert_eq!(r.end, VoxelCoord::new(12, 6, 23));

        let r = d(Orientation::ZNeg).footprint(origin);
        assert_eq!(r.start, VoxelCoord::new(9, 4, 17));
        assert_eq!(r.end, VoxelCoord::new(12, 6, 20));
    }

    #[test]
    fn members_and_interior_partition_the_range() {
        let d = Dimension::new(Orientation::XPos, 2, 2, 5, 3, 1);
        let range = d.footprint(VoxelCoord::new(0, 1, 0));
        let all = range.cells().count();
        let members = range.members().count();
        let interior = range.interior().count();
        assert_eq!(all, 5 * 4 * 5);
        assert_eq!(interior, 3 * 2 * 3);
        assert_eq!(members + interior, all);
    }

    #[test]
    fn render_coord_is_footprint_centre() {
        let origin = VoxelCoord::new(0, 1, 2);
        let d = Dimension::new(Orientation::XPos, 2, 2, 5, 3, 1);
        // Footprint x 0..=4, y 0..=3, z 0..=4.
        assert_eq!(d.render_coord(origin), VoxelCoord::new(2, 1, 2));
    }

    #[test]
    fn elevation_follows_member_height() {
        let d = Dimension::new(Orientation::ZNeg, 1, 1, 4, 3, 2);
        assert_eq!(d.elevation(), Elevation { to_bottom: 2, to_top: 3 });
        let above = d.elevation_at(1);
        assert_eq!(above, Elevation { to_bottom: 3, to_top: 2 });
        assert_eq!(above.height(), d.height());
    }

    #[test]
    fn extreme_extents_saturate_instead_of_overflowing() {
        let d = Dimension::new(Orientation::XPos, i32::MAX, i32::MAX, 5, i32::MAX, 1);
        assert_eq!(d.width(), i32::MAX);
        assert_eq!(d.height(), i32::MAX);
        let e = Elevation {
            to_bottom: i32::MIN,
            to_top: i32::MIN,
        };
        assert_eq!(e.height(), i32::MIN);
    }

    #[test]
    fn scan_measures_enclosed_chamber() {
        let config = TankConfig::default();
        let mut world = VoxelWorld::new();
        // Valve at (0,1,2) on the -X short end; tank grows along +X.
        let expected = Dimension::new(Orientation::XPos, 2, 2, 5, 3, 1);
        let origin = VoxelCoord::new(0, 1, 2);
        build_shell(&mut world, expected.footprint(origin));
        world.set_voxel(origin, Voxel::valve(false));

        let scanned = scan_dimensions(&world, &config, origin, Orientation::XPos);
        assert_eq!(scanned, expected);
    }

    #[test]
    fn scan_is_deterministic() {
        let config = TankConfig::default();
        let mut world = VoxelWorld::new();
        let origin = VoxelCoord::new(3, 3, 3);
        let shape = Dimension::new(Orientation::ZNeg, 1, 3, 6, 2, 2);
        build_shell(&mut world, shape.footprint(origin));
        world.set_voxel(origin, Voxel::valve(true));

        let first = scan_dimensions(&world, &config, origin, Orientation::ZNeg);
        for _ in 0..10 {
            assert_eq!(scan_dimensions(&world, &config, origin, Orientation::ZNeg), first);
        }
        assert_eq!(first, shape);
    }

    #[test]
    fn scan_into_wall_reports_zero_depth() {
        let config = TankConfig::default();
        let mut world = VoxelWorld::new();
        let origin = VoxelCoord::new(0, 0, 0);
        world.set_voxel(origin, Voxel::valve(false));
        world.set_voxel(VoxelCoord::new(1, 0, 0), Voxel::new(BlockKind::WallMaterial));

        let d = scan_dimensions(&world, &config, origin, Orientation::XPos);
        assert_eq!(d.depth, 0);
        assert!(!d.is_formable());
    }

    #[test]
    fn scan_in_open_space_is_bounded_by_max_dimension() {
        let config = TankConfig {
            max_dimension: 8,
            ..TankConfig::default()
        };
        let world = VoxelWorld::new();
        let d = scan_dimensions(&world, &config, VoxelCoord::new(0, 0, 0), Orientation::ZPos);
        // Every probe runs the full `max_dimension - 2` steps.
        assert_eq!(d.negative_width, 7);
        assert_eq!(d.positive_width, 7);
        assert_eq!(d.depth, 8);
        // The upward probe also counts the valve's own layer.
        assert_eq!(d.to_top, 8);
        assert_eq!(d.to_bottom, 7);
    }

    #[test]
    fn render_proxies_do_not_stop_probes() {
        let config = TankConfig::default();
        let mut world = VoxelWorld::new();
        let origin = VoxelCoord::new(0, 1, 2);
        let expected = Dimension::new(Orientation::XPos, 2, 2, 5, 3, 1);
        build_shell(&mut world, expected.footprint(origin));
        world.set_voxel(origin, Voxel::valve(false));
        // A stale proxy right in the depth probe's path.
        world.set_voxel(VoxelCoord::new(2, 1, 2), Voxel::new(BlockKind::RenderProxy));

        assert_eq!(
            scan_dimensions(&world, &config, origin, Orientation::XPos),
            expected
        );
    }
}

// Test-only chamber builders for tank integration tests.
//
// Builds well-formed tank chambers into a real `TankSite`, in every
// orientation, through the same `TankCommand` path a host uses. The only
// test-specific code here is choosing where the blocks go; all structure,
// validation and fluid logic runs through `hextank_sim` unchanged.
//
// See also: `tests/scenarios.rs` for the scenarios that use these.

use hextank_sim::command::{TankAction, TankCommand};
use hextank_sim::config::TankConfig;
use hextank_sim::event::StepResult;
use hextank_sim::geometry::Dimension;
use hextank_sim::site::TankSite;
use hextank_sim::types::{BlockKind, Face, Orientation, VoxelCoord};

/// Every growth orientation.
pub const ORIENTATIONS: [Orientation; 4] = [
    Orientation::XPos,
    Orientation::XNeg,
    Orientation::ZPos,
    Orientation::ZNeg,
];

/// A planned chamber: where its valve sits and what shape it has.
#[derive(Clone, Copy, Debug)]
pub struct Chamber {
    pub origin: VoxelCoord,
    pub dimension: Dimension,
}

impl Chamber {
    /// The 5 wide, 4 tall, 5 deep chamber with its valve centered on a short
    /// face at `origin`, one layer above the floor.
    pub fn standard(origin: VoxelCoord, orientation: Orientation) -> Self {
        Self {
            origin,
            dimension: Dimension::new(orientation, 2, 2, 5, 3, 1),
        }
    }

    pub fn orientation(&self) -> Orientation {
        self.dimension.orientation
    }

    /// The face a player clicks to grow this chamber.
    pub fn setup_face(&self) -> Face {
        clicked_face(self.orientation())
    }

    /// Rotation bit the origin valve needs.
    pub fn valve_rotated(&self) -> bool {
        !self.orientation().is_x_axis()
    }

    /// The two faces that accept pumped fluid on the origin valve.
    pub fn open_faces(&self) -> [Face; 2] {
        if self.valve_rotated() {
            [Face::North, Face::South]
        } else {
            [Face::West, Face::East]
        }
    }

    /// The four faces that never accept pumped fluid on the origin valve.
    pub fn closed_faces(&self) -> Vec<Face> {
        let open = self.open_faces();
        Face::ALL.into_iter().filter(|f| !open.contains(f)).collect()
    }

    /// Commands placing every shell block, `wall` everywhere except the
    /// correctly rotated valve at the origin.
    pub fn build_commands(&self, wall: BlockKind, tick: u64) -> Vec<TankCommand> {
        let mut commands: Vec<TankCommand> = self
            .dimension
            .footprint(self.origin)
            .members()
            .filter(|&c| c != self.origin)
            .map(|coord| place(tick, coord, wall))
            .collect();
        commands.push(place(
            tick,
            self.origin,
            BlockKind::Valve {
                rotated: self.valve_rotated(),
            },
        ));
        commands
    }

    /// The setup click for this chamber.
    pub fn setup_command(&self, tick: u64) -> TankCommand {
        TankCommand {
            tick,
            action: TankAction::SetupMultiTank {
                valve: self.origin,
                face: self.setup_face(),
            },
        }
    }

    /// Build the chamber into `site` at `tick` and click it at `tick + 1`.
    pub fn build_and_setup(&self, site: &mut TankSite, wall: BlockKind, tick: u64) -> StepResult {
        let mut commands = self.build_commands(wall, tick);
        commands.push(self.setup_command(tick + 1));
        site.step(&commands, tick + 1)
    }
}

/// The face whose click grows a tank along `orientation`.
pub fn clicked_face(orientation: Orientation) -> Face {
    match orientation {
        Orientation::XPos => Face::West,
        Orientation::XNeg => Face::East,
        Orientation::ZPos => Face::North,
        Orientation::ZNeg => Face::South,
    }
}

/// A `PlaceBlock` command.
pub fn place(tick: u64, coord: VoxelCoord, block: BlockKind) -> TankCommand {
    TankCommand {
        tick,
        action: TankAction::PlaceBlock { coord, block },
    }
}

/// A `RemoveBlock` command.
pub fn remove(tick: u64, coord: VoxelCoord) -> TankCommand {
    TankCommand {
        tick,
        action: TankAction::RemoveBlock { coord },
    }
}

/// A fresh site with debug logging on, so scenarios exercise the log paths.
pub fn debug_site() -> TankSite {
    TankSite::new(TankConfig {
        debug: true,
        verbose_debug: true,
        ..TankConfig::default()
    })
}

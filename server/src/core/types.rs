// grid_map_server/server/src/core/types.rs
use crate::core::constants::{MAX_NUMBER_OF_CELLS, MAX_NUMBER_OF_GRIDS, TOTAL_NUMBER_OF_CELLS_PER_MAP};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

pub type MapId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectGuid(pub u64);

impl fmt::Display for ObjectGuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Guid({:#x})", self.0)
    }
}

// --- Basic Geometric Types ---
#[derive(Clone, Debug, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
    #[serde(default)]
    pub orientation: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self { Position { x, y, z: 0.0, orientation: 0.0 } }

    pub fn distance_2d_sq(&self, other: &Position) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }
}

// --- Object categories ---
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectCategory {
    Player,
    Creature,
    GameObject,
    DynamicObject,
    Corpse,
    AreaTrigger,
    SceneObject,
    Conversation,
}

impl ObjectCategory {
    pub const COUNT: usize = 8;

    pub const ALL: [ObjectCategory; Self::COUNT] = [
        ObjectCategory::Player,
        ObjectCategory::Creature,
        ObjectCategory::GameObject,
        ObjectCategory::DynamicObject,
        ObjectCategory::Corpse,
        ObjectCategory::AreaTrigger,
        ObjectCategory::SceneObject,
        ObjectCategory::Conversation,
    ];

    pub fn mask(self) -> CategoryMask {
        match self {
            ObjectCategory::Corpse => CategoryMask::CORPSE,
            ObjectCategory::Creature => CategoryMask::CREATURE,
            ObjectCategory::DynamicObject => CategoryMask::DYNAMIC_OBJECT,
            ObjectCategory::GameObject => CategoryMask::GAME_OBJECT,
            ObjectCategory::Player => CategoryMask::PLAYER,
            ObjectCategory::AreaTrigger => CategoryMask::AREA_TRIGGER,
            ObjectCategory::SceneObject => CategoryMask::SCENE_OBJECT,
            ObjectCategory::Conversation => CategoryMask::CONVERSATION,
        }
    }
}

bitflags! {
    /// Selects which per-category lists a visit touches. Bit values match the
    /// legacy grid type masks.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CategoryMask: u8 {
        const CORPSE         = 0x01;
        const CREATURE       = 0x02;
        const DYNAMIC_OBJECT = 0x04;
        const GAME_OBJECT    = 0x08;
        const PLAYER         = 0x10;
        const AREA_TRIGGER   = 0x20;
        const SCENE_OBJECT   = 0x40;
        const CONVERSATION   = 0x80;
    }
}

impl CategoryMask {
    pub fn categories(self) -> impl Iterator<Item = ObjectCategory> {
        ObjectCategory::ALL.into_iter().filter(move |c| self.contains(c.mask()))
    }

    pub fn includes(self, category: ObjectCategory) -> bool {
        self.contains(category.mask())
    }
}

impl From<ObjectCategory> for CategoryMask {
    fn from(category: ObjectCategory) -> Self {
        category.mask()
    }
}

// --- Discrete coordinates ---

/// Integer coordinate pair bounded by `LIMIT` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct CoordPair<const LIMIT: u32> {
    pub x: u32,
    pub y: u32,
}

pub type GridCoord = CoordPair<MAX_NUMBER_OF_GRIDS>;
pub type CellCoord = CoordPair<TOTAL_NUMBER_OF_CELLS_PER_MAP>;

impl<const LIMIT: u32> CoordPair<LIMIT> {
    pub const fn new(x: u32, y: u32) -> Self {
        CoordPair { x, y }
    }

    pub fn dec_x(&mut self, val: u32) {
        self.x = self.x.saturating_sub(val);
    }

    pub fn inc_x(&mut self, val: u32) {
        self.x = self.x.saturating_add(val).min(LIMIT - 1);
    }

    pub fn dec_y(&mut self, val: u32) {
        self.y = self.y.saturating_sub(val);
    }

    pub fn inc_y(&mut self, val: u32) {
        self.y = self.y.saturating_add(val).min(LIMIT - 1);
    }

    pub fn is_coord_valid(&self) -> bool {
        self.x < LIMIT && self.y < LIMIT
    }

    #[must_use]
    pub fn normalize(mut self) -> Self {
        self.x = self.x.min(LIMIT - 1);
        self.y = self.y.min(LIMIT - 1);
        self
    }

    pub fn id(&self) -> u32 {
        self.y * LIMIT + self.x
    }
}

impl CellCoord {
    /// Grid containing this cell.
    pub fn grid_coord(&self) -> GridCoord {
        GridCoord::new(self.x / MAX_NUMBER_OF_CELLS, self.y / MAX_NUMBER_OF_CELLS)
    }

    /// Position of this cell inside its grid's matrix.
    pub fn local(&self) -> (usize, usize) {
        ((self.x % MAX_NUMBER_OF_CELLS) as usize, (self.y % MAX_NUMBER_OF_CELLS) as usize)
    }
}

impl GridCoord {
    pub fn cell_at(&self, local_x: usize, local_y: usize) -> CellCoord {
        CellCoord::new(
            self.x * MAX_NUMBER_OF_CELLS + local_x as u32,
            self.y * MAX_NUMBER_OF_CELLS + local_y as u32,
        )
    }
}

// --- Static content and query snapshots ---

/// One object produced by loading a grid's static content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    pub guid: ObjectGuid,
    pub category: ObjectCategory,
    pub position: Position,
    #[serde(default)]
    pub active: bool,
}

/// Read-only copy of an indexed object, handed to collaborators instead of
/// container handles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyObject {
    pub guid: ObjectGuid,
    pub category: ObjectCategory,
    pub position: Position,
    pub cell: CellCoord,
}

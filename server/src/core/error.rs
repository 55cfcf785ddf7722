// grid_map_server/server/src/core/error.rs
use crate::core::types::{GridCoord, ObjectGuid};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum GridError {
    #[error("Invalid map coordinate: ({x}, {y})")]
    InvalidCoordinate { x: f32, y: f32 },

    #[error("Reference is already linked into a list")]
    AlreadyLinked,

    #[error("Reference belongs to a different list")]
    ForeignReference,

    #[error("Unknown object: {0}")]
    UnknownObject(ObjectGuid),

    #[error("Object already present in the index: {0}")]
    DuplicateObject(ObjectGuid),

    #[error("Grid {0:?} is not loaded")]
    GridNotLoaded(GridCoord),

    #[error("Loading grid {coord:?} failed: {reason}")]
    LoadFailed { coord: GridCoord, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl GridError {
    /// Structural errors mean a caller broke the linking protocol. They are never
    /// recovered from locally.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            GridError::AlreadyLinked | GridError::ForeignReference | GridError::DuplicateObject(_)
        )
    }

    /// Stops development builds at the violation site. Release builds get the
    /// error back and keep running.
    #[track_caller]
    pub(crate) fn fail_loudly(self) -> Self {
        debug_assert!(!self.is_protocol_violation(), "grid protocol violation: {}", self);
        self
    }
}

impl From<serde_json::Error> for GridError {
    fn from(e: serde_json::Error) -> Self {
        GridError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for GridError {
    fn from(e: serde_yaml::Error) -> Self {
        GridError::Serialization(e.to_string())
    }
}

pub type GridResult<T> = Result<T, GridError>;

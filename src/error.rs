// Error module for the robot room

use thiserror::Error;

use crate::scene::NodeKey;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// The assembler was handed the wrong number of renderables for a rig
    #[error("{rig} expects {expected} parts, got {found}")]
    PartCount {
        rig: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("node {0:?} is not in the scene graph")]
    NodeNotFound(NodeKey),

    #[error("node {0:?} has no local transform")]
    NotATransform(NodeKey),

    /// The tree shape is frozen once the first update pass has run
    #[error("scene graph is sealed, cannot attach {0:?}")]
    Sealed(NodeKey),

    #[error("node {0:?} already has a parent")]
    AlreadyParented(NodeKey),

    #[error("the root node cannot be attached as a child")]
    RootAsChild,

    #[error("attaching {0:?} would create a cycle")]
    WouldCycle(NodeKey),
}

pub type Result<T> = std::result::Result<T, SceneError>;

//! Scene error types

use crate::foundation::collections::NodeKey;
use crate::scene::identity::ObjectId;
use thiserror::Error;

/// Misuse of the scene graph or a broken layer invariant
///
/// The plain mutation methods treat these as programmer errors and panic;
/// the `try_*` variants hand them back instead.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// Key does not name a live node of this graph
    #[error("Unknown node {0:?}")]
    UnknownNode(NodeKey),

    /// Reparenting would make a node its own ancestor
    #[error("Adding {child:?} under {parent:?} would create a cycle")]
    Cycle {
        /// Requested parent
        parent: NodeKey,
        /// Node being reparented
        child: NodeKey,
    },

    /// Only groups own children
    #[error("Node {0:?} is not a group and cannot own children")]
    NotAGroup(NodeKey),

    /// The scene root never has a parent
    #[error("The scene root cannot be reparented")]
    RootReparent,

    /// Layer content and membership index disagree
    #[error("Layer {layer} and the membership index disagree on object {object}")]
    IndexMismatch {
        /// Layer identity
        layer: ObjectId,
        /// Object identity
        object: ObjectId,
    },
}

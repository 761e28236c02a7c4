//! Commands applied to the graph between traversals

use super::NodeKey;
use crate::foundation::math::Mat4;

/// A queued scene mutation
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    /// Replace a group's local transform wholesale
    SetLocalTransform {
        /// Target group
        group: NodeKey,
        /// New local transform
        transform: Mat4,
    },
}

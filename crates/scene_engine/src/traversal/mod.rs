//! # Scene Traversal
//!
//! Every frame, pick and headless trace walks the graph in three depth-first
//! passes over the same tree:
//!
//! 1. camera pass: the first camera found fixes the view and projection
//! 2. light pass: each light records its world and view space position
//! 3. render pass: each geometry leaf is handed to a [`RenderStrategy`]
//!    with its accumulated model transform
//!
//! Groups only push their transform onto a [`TransformStack`] and recurse.
//! [`traverse`] is the one place that matches on the node variant; passes
//! implement [`SceneVisitor`] for the variants they need.

mod frame;
mod stack;
mod visitor;

pub use frame::{discover, run_frame, ActiveCamera, FrameContext, LightSample, RenderStrategy};
pub use stack::TransformStack;
pub use visitor::{traverse, GeometryRef, NodeRef, SceneVisitor};

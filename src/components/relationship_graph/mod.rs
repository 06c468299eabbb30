//! Relationship graph: force layout, structural rendering and communication pulses.

mod component;
mod config;
mod emphasis;
mod fps;
mod frame_loop;
mod geometry;
mod interchange;
mod pulses;
mod render;
mod scene;
mod simulation;
mod state;
mod store;
mod types;

pub use component::RelationshipGraph;
pub use interchange::{StoryMeta, Viewport, export_json, import_json};
pub use types::{GraphData, NodeId};

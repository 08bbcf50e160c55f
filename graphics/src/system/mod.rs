//! Per-context GPU systems.
//!
//! - [`buffer`]: native buffer objects keyed by buffer id, upload sync and ref counts
//! - [`geometry`]: vertex array caching, binding and draw dispatch
//! - [`instance_sync`]: base-instance emulation for instance-rate attributes

pub mod buffer;
pub mod geometry;
pub mod instance_sync;

pub use buffer::GlBufferSystem;
pub use geometry::GlGeometrySystem;
pub use instance_sync::{InstanceSyncProgram, SyncAttribute, SyncStep};

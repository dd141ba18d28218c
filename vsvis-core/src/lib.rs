//! vsvis-core: Core types for the detection overlay viewer.
//!
//! This crate provides the virtual dataset indices, marker values, the
//! arena-backed marker tree, the bounded marker scene cache and the
//! controller that ties frame navigation and table selection to it.
//!

pub mod canvas;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame;
pub mod index;
pub mod marker;
pub mod scene;
pub mod selection;
pub mod tree;

pub use canvas::{Canvas, CanvasEvent, NullCanvas, RecordingCanvas};
pub use config::{Category, EvictionPolicy, MarkerStyleConfig, ViewerConfig, MIN_BUFFER_SIZE};
pub use controller::Controller;
pub use error::{Error, Result};
pub use frame::{FrameCoordinates, FrameSource, VecFrameSource};
pub use index::{DatasetIndex, DatasetShape, DatasetSlice, Extent, GroupIndex, VirtualIndex};
pub use marker::{Color, MarkerFactory, MarkerRecord, MarkerStyle, Shape};
pub use scene::{CacheStats, FetchOutcome, FetchTicket, FrameStatus, MarkerScene};
pub use selection::{Selection, VisibilityDelta};
pub use tree::{MarkerTree, NodeId, NodeKind};

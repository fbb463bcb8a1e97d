//! Core library for the Loudness Scope.
//!
//! A real-time producer pushes one loudness value per audio block into a
//! lock-free queue. A periodic consumer drains it into a multi-resolution
//! history, and the renderer turns that history plus the current zoom into
//! per-frame geometry for whatever drawing backend sits downstream.
//!
//! ```text
//! producer ──push──▶ queue ──tick──▶ HistoryStore ──render──▶ Frame
//!                                          ▲
//!                               ZoomController (scroll events)
//! ```

pub mod clock;
pub mod config;
pub mod error;
pub mod history;
pub mod loudness;
pub mod queue;
pub mod render;
pub mod scope;
pub mod zoom;

pub use clock::FrameClock;
pub use config::{HistoryConfig, QueueConfig, RenderConfig, ScopeConfig, ZoomConfig};
pub use error::{Result, ScopeError};
pub use history::{HistoryStore, MinMax};
pub use loudness::{block_loudness, interleaved_loudness};
pub use queue::{loudness_queue, LoudnessConsumer, LoudnessProducer};
pub use render::{DisplayList, Frame, Point, Viewport, ViewportRenderer, Zone};
pub use scope::{Scope, TickReport};
pub use zoom::{ZoomController, ZoomEvent, ZoomState};

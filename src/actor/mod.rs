//! Actor system for the live preview pipeline.
//!
//! Message-passing concurrency for watch mode:
//!
//! ```text
//! FsActor --> WsActor --> viewers
//! (watch +     (fan-out)
//!  render)
//! ```
//!
//! # Module Structure
//!
//! - `messages` - Message types for inter-actor communication
//! - `fs` - File system watcher with debouncing and re-render
//! - `ws` - WebSocket push-channel fan-out
//! - `coordinator` - Wires up and runs actors

pub mod coordinator;
pub mod fs;
pub mod messages;
pub mod ws;

pub use coordinator::Coordinator;

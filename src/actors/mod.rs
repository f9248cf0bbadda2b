//! Actor-based action scheduling
//!
//! Each configured action runs as an independent tokio task that owns its
//! configuration and its random source. Actors share nothing mutable; the
//! supervisor talks to them only through their command channels.
//!
//! ## Architecture Overview
//!
//! ```text
//!                 ┌──────────────────┐
//!                 │    Supervisor    │
//!                 └────────┬─────────┘
//!                          │ spawns, broadcasts Shutdown
//!           ┌──────────────┼──────────────┐
//!           │              │              │
//!   ┌───────▼──────┐ ┌─────▼──────┐ ┌─────▼──────┐
//!   │ ActionActor  │ │ActionActor │ │ActionActor │
//!   │  (disk)      │ │ (load)     │ │  (...)     │
//!   └───────┬──────┘ └─────┬──────┘ └─────┬──────┘
//!           │ fetch        │              │
//!           ▼              ▼              ▼
//!      graphite render API          CommandTrigger
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: Each actor has an mpsc command channel for control messages
//! 2. **Request/Response**: oneshot channels carry check reports back

pub mod action;
pub mod messages;
pub mod supervisor;

//! Phone rotation for campaign links.
//!
//! `Selector` picks the phone that receives a click: bots and empty pools get
//! the campaign default, returning visitors get their sticky phone, everyone
//! else walks a seeded shuffle of the pool with a per-campaign counter.

pub mod clock;
pub mod config;
pub mod derive;
pub mod engine;
pub mod memory;
pub mod metrics_defs;
pub mod shuffle;
pub mod sticky;
pub mod store;
pub mod sweeper;
pub mod types;

pub use engine::{Collaborators, Selector, Visitor};
pub use types::{Campaign, PhoneEntry, PhoneStatus, Provenance, RotationMode, Selection};

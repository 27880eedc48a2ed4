//! Event system for session progress reporting.
//!
//! The session orchestrator publishes every state transition here as a
//! human-readable progress event; the presentation layer subscribes. This
//! keeps the state machine free of UI concerns: the bus is the only coupling
//! between the two.

mod event_bus;

pub use event_bus::{BusEvent, EventBus};

//! # Handshake Gating
//!
//! Serializes rate-limited identify handshakes across concurrent callers.
//!
//! ## Components
//! - **Gate**: capacity-bounded permits with self-expiring holds
//! - **Registry**: one shared gate per owner key
//!
//! A session manager acquires before sending its handshake and, once the
//! server confirms it, calls `extend_release` with the cool-down the server
//! asked for. A caller that never confirms still gets its permit returned by
//! the default hold timer.

pub mod gate;
pub mod registry;

#[cfg(test)]
mod tests;

//! # Utility Modules
//!
//! Supporting utilities for encryption, logging and metrics.
//!
//! ## Components
//! - **Crypto**: cipher seam and packet seal/open on top of the nonce layout
//! - **Logging**: structured logging configuration
//! - **Metrics**: thread-safe observability counters
//!
//! ## Security
//! - Cryptographically secure RNG (getrandom) for suffix nonces
//! - Authenticated encryption only; tampered packets are rejected

pub mod crypto;
pub mod logging;
pub mod metrics;

// Re-export public types for advanced users
pub use crypto::{PacketCipher, XChaChaCipher, XSalsaCipher};
pub use metrics::{Metrics, MetricsSnapshot};

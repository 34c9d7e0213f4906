//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `analyze.rs`: one-shot analyze, health, normalize and gate commands.
//! - `session.rs`: interactive session driver over stdin.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate lifecycle decisions to `services::session` and I/O to `services/*`.
//! - Keep behavior and output schema stable.

pub mod analyze;
pub mod session;

pub use analyze::{handle_analyze, handle_gate, handle_health, handle_normalize};
pub use session::handle_session;

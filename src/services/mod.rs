//! Service layer containing the session logic and side-effect helpers.
//!
//! ## Service map
//! - `session.rs`: request lifecycle state machine (submit/recalculate/override/retry/reset).
//! - `client.rs`: analysis service seam + HTTP multipart implementation.
//! - `geometry.rs`: click to normalized coordinate mapping and bounds policy.
//! - `gate.rs`: decides from warnings whether manual Tr placement is offered.
//! - `images.rs`: reading selected photos from disk.
//! - `config.rs`: config file + flag/env layering.
//! - `output.rs`: JSON/text output helpers.
//!
//! ## Conventions
//! - `session`, `geometry` and `gate` do no I/O; tests drive them directly.
//! - Network access goes through the `AnalysisService` trait only.

pub mod client;
pub mod config;
pub mod gate;
pub mod geometry;
pub mod images;
pub mod output;
pub mod session;

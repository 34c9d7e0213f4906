//! Shared data model layer (types/constants only).
//!
//! ## Files
//! - `models.rs`: analysis input, analysis result, output envelopes.
//! - `errors.rs`: validation, request and session-action errors.
//! - `constants.rs`: wire paths, keywords and defaults shared across services.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! `AnalysisResult` mirrors the analysis service response. Field names are part of the wire
//! contract and of the `--json` output; keep `docs/contracts/*` in sync.

pub mod constants;
pub mod errors;
pub mod models;

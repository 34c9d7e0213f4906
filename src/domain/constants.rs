pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

pub const ANALYZE_PATH: &str = "/api/analyze";
pub const HEALTH_PATH: &str = "/api/health";

/// Warning keyword the service uses when the hairline reference could not be detected.
pub const TRICHION_KEYWORD: &str = "trichion";

/// Annotated image keys prefixed with this are debug-only output.
pub const DEBUG_IMAGE_PREFIX: &str = "tr_";

pub const CORE_IMAGE_KEYS: [&str; 4] = ["front", "side", "front_all", "side_all"];

pub const ANALYSIS_FAILED_FALLBACK: &str = "Analysis failed";

//! Global Constants
//!
//! Centralized constants for scoring weights and tuning.
//! All magic numbers should be defined here with documentation.

/// Scoring engine constants
pub mod scoring {
    /// Quality score penalties per finding severity
    pub const QUALITY_CRITICAL_PENALTY: i32 = 30;
    pub const QUALITY_HIGH_PENALTY: i32 = 15;
    pub const QUALITY_MEDIUM_PENALTY: i32 = 5;

    /// Accessibility penalties applied inside a single run's own score
    pub const A11Y_CRITICAL_PENALTY: i32 = 25;
    pub const A11Y_HIGH_PENALTY: i32 = 10;

    /// Performance score penalties per finding severity (critical, high,
    /// medium, low)
    pub const PERF_PENALTIES: [i32; 4] = [25, 15, 10, 5];

    /// Mean api_response_time above this loses 20 points
    pub const PERF_SLOW_MS: f64 = 3000.0;
    /// Mean api_response_time above this loses 50 points cumulative
    pub const PERF_VERY_SLOW_MS: f64 = 5000.0;
    pub const PERF_SLOW_PENALTY: i32 = 20;
    pub const PERF_VERY_SLOW_EXTRA_PENALTY: i32 = 30;

    /// Security score penalties per finding severity (critical, high,
    /// medium, low)
    pub const SECURITY_PENALTIES: [i32; 4] = [50, 25, 10, 5];

    /// Maximum recommendations kept after ranking
    pub const MAX_RECOMMENDATIONS: usize = 10;

    /// Findings on one component before a reliability recommendation fires
    pub const COMPONENT_RELIABILITY_THRESHOLD: usize = 3;
}

/// Alert threshold defaults (overridable via configuration)
pub mod alerts {
    pub const MIN_SUCCESS_RATE: f64 = 95.0;
    pub const MIN_PERFORMANCE_SCORE: u8 = 80;
    pub const MIN_ACCESSIBILITY_SCORE: u8 = 90;
    pub const MIN_SECURITY_SCORE: u8 = 90;
}

/// Trend analytics constants
pub mod trends {
    /// Default rolling window of reports for trend queries
    pub const DEFAULT_WINDOW: usize = 30;

    /// Dashboard turns red below this security score
    pub const RED_SECURITY_SCORE: u8 = 80;
    /// Dashboard turns yellow below this success rate
    pub const YELLOW_SUCCESS_RATE: f64 = 90.0;
    /// Dashboard turns yellow below this quality score
    pub const YELLOW_QUALITY_SCORE: u8 = 80;
}

/// AI quality scoring constants
pub mod ai_quality {
    /// Minimum score for a quality dimension marked critical-importance
    pub const CRITICAL_DIMENSION_BAR: u32 = 70;

    /// Oversized adversarial prompt length
    pub const OVERSIZED_PROMPT_CHARS: usize = 20_000;
}

/// Load agent constants
pub mod load {
    /// Second-half latency above first-half by more than this flags degradation
    pub const SUSTAINED_LATENCY_MARGIN: f64 = 0.20;
    /// Second-half memory above first-half by more than this flags a leak
    pub const SUSTAINED_MEMORY_MARGIN: f64 = 0.15;

    /// Capacity search stops at this error rate (fraction)
    pub const BREAKING_ERROR_RATE: f64 = 0.05;
    /// Capacity search stops above this p95 latency (ms)
    pub const BREAKING_P95_MS: f64 = 8000.0;
    /// Concurrency step size for the capacity search
    pub const CAPACITY_STEP: u32 = 25;
    /// Capacity search hard ceiling
    pub const CAPACITY_CEILING: u32 = 500;

    /// Sample spacing along a synthesized run (seconds)
    pub const SAMPLE_TICK_SECS: u64 = 10;
    /// Probe window per capacity-search step (seconds)
    pub const CAPACITY_PROBE_SECS: u64 = 60;
    /// Soak run length for the two-half comparison (seconds)
    pub const SOAK_DURATION_SECS: u64 = 1800;
}

/// Visual regression constants
pub mod visual {
    /// Difference-over-threshold buckets, in percentage points
    pub const CRITICAL_OVERSHOOT_PP: f64 = 20.0;
    pub const HIGH_OVERSHOOT_PP: f64 = 10.0;
    pub const MEDIUM_OVERSHOOT_PP: f64 = 5.0;
}

/// HTTP/Network constants
pub mod network {
    /// Default LLM request timeout (seconds)
    pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

    /// Maximum retries for LLM requests
    pub const MAX_LLM_RETRIES: usize = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 500;
}

//! # System Constants
//!
//! Stage names, progress checkpoints, capability names and the default values
//! shared by configuration and the orchestration services.

/// Stage names as they appear in an analysis result
pub mod stages {
    pub const BRAND_INFO: &str = "brand_info";
    pub const NEWS_ANALYSIS: &str = "news_analysis";
    pub const CAMPAIGN_ANALYSIS: &str = "campaign_analysis";
    pub const LLM_INSIGHTS: &str = "llm_insights";
    pub const VISUAL_ANALYSIS: &str = "visual_analysis";
}

/// Dependency names used as circuit breaker and metrics keys
pub mod dependencies {
    pub const BRAND_ASSETS: &str = "brand_assets";
    pub const NEWS: &str = "news";
    pub const CAMPAIGNS: &str = "campaigns";
    pub const LLM: &str = "llm";
    pub const VISUAL: &str = "visual";
}

/// Operation names paired with dependencies
pub mod operations {
    pub const GET_COMPANY_INFO: &str = "get_company_info";
    pub const SEARCH_NEWS: &str = "search_news";
    pub const DISCOVER_CAMPAIGNS: &str = "discover_campaigns";
    pub const ANALYZE_BRAND_SENTIMENT: &str = "analyze_brand_sentiment";
    pub const ANALYZE_BRAND_VISUALS: &str = "analyze_brand_visuals";
}

/// Caller-visible progress checkpoints
pub mod progress {
    pub const INITIALIZED: u8 = 10;
    pub const COLLECTING: u8 = 20;
    pub const LLM_ANALYSIS: u8 = 50;
    pub const VISUAL_ANALYSIS: u8 = 70;
    pub const FINALIZED: u8 = 100;
}

/// Capability names reported by `get_capabilities`
pub mod capabilities {
    pub const LLM_ANALYSIS: &str = "llm_analysis";
    pub const NEWS_SEARCH: &str = "news_search";
    pub const CAMPAIGN_DISCOVERY: &str = "campaign_discovery";
    pub const BRAND_ASSETS: &str = "brand_assets";
    pub const VISUAL_ANALYSIS: &str = "visual_analysis";
}

/// Default tuning values
pub mod defaults {
    pub const MAX_CONCURRENT_CALLS: usize = 3;
    pub const WORKER_POOL_SIZE: usize = 4;
    pub const OPERATION_TIMEOUT_SECONDS: u64 = 30;
    pub const PROGRESS_CALLBACK_TIMEOUT_MS: u64 = 5_000;
    pub const NEWS_DAYS_BACK: u32 = 30;

    pub const MAX_RETRIES: u32 = 3;
    pub const RETRY_BASE_DELAY_MS: u64 = 1_000;
    pub const RETRY_MAX_DELAY_MS: u64 = 30_000;
    pub const RETRY_BACKOFF_MULTIPLIER: f64 = 2.0;

    pub const CIRCUIT_FAILURE_THRESHOLD: u32 = 5;
    pub const CIRCUIT_COOLDOWN_SECONDS: u64 = 300;

    pub const PERFORMANCE_MAX_SAMPLES: usize = 100;
    pub const PERFORMANCE_WINDOW_HOURS: u64 = 24;
}

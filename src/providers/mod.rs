//! # Analysis Providers
//!
//! Inbound collaborator interfaces the orchestrator calls out to. Brand info,
//! news, campaign and LLM providers are synchronous and run on the blocking
//! worker pool; the visual analysis provider is already asynchronous.
//!
//! Payload types are deliberately narrow: they hold the fields the
//! orchestrator composes with, plus a `details` value carrying whatever else
//! the upstream API returned.

pub mod types;

pub use types::{
    domain_from_url, BrandInfo, Campaign, CampaignResult, LlmInsight, NewsArticle, NewsResult,
    VisualResult,
};

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Failure reported by a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid response data: {0}")]
    InvalidData(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ProviderError {
    pub fn other(message: impl std::fmt::Display) -> Self {
        ProviderError::Other(anyhow::anyhow!(message.to_string()))
    }
}

/// Company profile and brand assets lookup
pub trait BrandInfoProvider: Send + Sync {
    fn get_company_info(
        &self,
        company_name: &str,
        website_url: Option<&str>,
    ) -> Result<BrandInfo, ProviderError>;
}

/// Press coverage search
pub trait NewsProvider: Send + Sync {
    fn search_news(&self, company_name: &str, days_back: u32) -> Result<NewsResult, ProviderError>;
}

/// Marketing campaign discovery
pub trait CampaignProvider: Send + Sync {
    fn discover_campaigns(&self, company_name: &str) -> Result<CampaignResult, ProviderError>;
}

/// LLM-backed brand sentiment analysis
pub trait LlmProvider: Send + Sync {
    fn analyze_brand_sentiment(
        &self,
        context: &str,
        company_name: &str,
    ) -> Result<LlmInsight, ProviderError>;
}

/// Screenshot capture and visual consistency analysis
#[async_trait]
pub trait VisualAnalysisProvider: Send + Sync {
    async fn analyze_brand_visuals(
        &self,
        company_name: &str,
        website_url: Option<&str>,
        brand_info: Option<&BrandInfo>,
    ) -> Result<VisualResult, ProviderError>;
}

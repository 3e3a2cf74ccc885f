//! Shared fixtures: scriptable providers and a fast-retry configuration.

#![allow(dead_code)]

use async_trait::async_trait;
use brand_audit_core::config::{AuditConfig, ConfigManager};
use brand_audit_core::orchestration::AnalysisProviders;
use brand_audit_core::providers::{
    domain_from_url, BrandInfo, BrandInfoProvider, Campaign, CampaignProvider, CampaignResult,
    LlmInsight, LlmProvider, NewsArticle, NewsProvider, NewsResult, ProviderError,
    VisualAnalysisProvider, VisualResult,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How a mock provider responds to every call
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Behavior {
    Succeed,
    Timeout,
    Network,
    RateLimited,
    Authentication,
    InvalidData,
    Unknown,
    Panic,
    Slow(Duration),
}

impl Behavior {
    fn apply_sync(self) -> Result<(), ProviderError> {
        if let Behavior::Slow(delay) = self {
            std::thread::sleep(delay);
        }
        self.result()
    }

    async fn apply_async(self) -> Result<(), ProviderError> {
        if let Behavior::Slow(delay) = self {
            tokio::time::sleep(delay).await;
        }
        self.result()
    }

    fn result(self) -> Result<(), ProviderError> {
        match self {
            Behavior::Succeed | Behavior::Slow(_) => Ok(()),
            Behavior::Timeout => Err(ProviderError::Timeout("upstream took 31s".into())),
            Behavior::Network => Err(ProviderError::Network("connection reset by peer".into())),
            Behavior::RateLimited => Err(ProviderError::RateLimited {
                message: "quota exhausted".into(),
                retry_after: None,
            }),
            Behavior::Authentication => {
                Err(ProviderError::Authentication("API key rejected".into()))
            }
            Behavior::InvalidData => Err(ProviderError::InvalidData("empty payload".into())),
            Behavior::Unknown => Err(ProviderError::other("upstream returned status 500")),
            Behavior::Panic => panic!("provider crashed"),
        }
    }
}

pub struct MockBrandInfo {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl BrandInfoProvider for MockBrandInfo {
    fn get_company_info(
        &self,
        company_name: &str,
        website_url: Option<&str>,
    ) -> Result<BrandInfo, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply_sync()?;
        Ok(BrandInfo {
            name: company_name.to_string(),
            domain: website_url.and_then(domain_from_url),
            description: Some(format!("{company_name} builds electric vehicles")),
            industry: Some("Automotive".to_string()),
            logo_url: None,
            colors: vec!["#cc0000".to_string(), "#ffffff".to_string()],
            details: serde_json::Value::Null,
            degraded: false,
        })
    }
}

pub struct MockNews {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
    pub days_back: Mutex<Option<u32>>,
}

impl NewsProvider for MockNews {
    fn search_news(&self, company_name: &str, days_back: u32) -> Result<NewsResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.days_back.lock() = Some(days_back);
        self.behavior.apply_sync()?;
        Ok(NewsResult {
            articles: vec![NewsArticle {
                title: format!("{company_name} unveils new model"),
                source: Some("Reuters".to_string()),
                url: None,
                published_at: None,
                sentiment: Some(0.4),
            }],
            total_results: 1,
            sentiment_score: Some(0.4),
            degraded: false,
        })
    }
}

pub struct MockCampaigns {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
}

impl CampaignProvider for MockCampaigns {
    fn discover_campaigns(&self, company_name: &str) -> Result<CampaignResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.behavior.apply_sync()?;
        Ok(CampaignResult {
            campaigns: vec![Campaign {
                name: format!("{company_name} Summer Launch"),
                channel: Some("social".to_string()),
                summary: None,
            }],
            details: serde_json::Value::Null,
            degraded: false,
        })
    }
}

pub struct MockLlm {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
    pub contexts: Mutex<Vec<String>>,
}

impl LlmProvider for MockLlm {
    fn analyze_brand_sentiment(
        &self,
        context: &str,
        company_name: &str,
    ) -> Result<LlmInsight, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.contexts.lock().push(context.to_string());
        self.behavior.apply_sync()?;
        Ok(LlmInsight {
            summary: format!("{company_name} is perceived as innovative"),
            sentiment_score: Some(0.6),
            strengths: vec!["innovation".to_string()],
            weaknesses: vec!["service".to_string()],
            recommendations: vec!["expand service network".to_string()],
            degraded: false,
        })
    }
}

pub struct MockVisual {
    pub behavior: Behavior,
    pub calls: AtomicUsize,
    pub received_brand_info: Mutex<Vec<Option<BrandInfo>>>,
}

#[async_trait]
impl VisualAnalysisProvider for MockVisual {
    async fn analyze_brand_visuals(
        &self,
        _company_name: &str,
        website_url: Option<&str>,
        brand_info: Option<&BrandInfo>,
    ) -> Result<VisualResult, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received_brand_info.lock().push(brand_info.cloned());
        self.behavior.apply_async().await?;
        Ok(VisualResult {
            screenshots: website_url.map(str::to_string).into_iter().collect(),
            primary_colors: brand_info.map(|b| b.colors.clone()).unwrap_or_default(),
            consistency_score: Some(0.85),
            details: serde_json::Value::Null,
            degraded: false,
        })
    }
}

/// One scriptable mock per data source
pub struct MockSet {
    pub brand_info: Arc<MockBrandInfo>,
    pub news: Arc<MockNews>,
    pub campaigns: Arc<MockCampaigns>,
    pub llm: Arc<MockLlm>,
    pub visual: Arc<MockVisual>,
}

impl MockSet {
    pub fn healthy() -> Self {
        Self {
            brand_info: Arc::new(MockBrandInfo {
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
            }),
            news: Arc::new(MockNews {
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
                days_back: Mutex::new(None),
            }),
            campaigns: Arc::new(MockCampaigns {
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
            }),
            llm: Arc::new(MockLlm {
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
                contexts: Mutex::new(Vec::new()),
            }),
            visual: Arc::new(MockVisual {
                behavior: Behavior::Succeed,
                calls: AtomicUsize::new(0),
                received_brand_info: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn with_brand_info(mut self, behavior: Behavior) -> Self {
        self.brand_info = Arc::new(MockBrandInfo {
            behavior,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_news(mut self, behavior: Behavior) -> Self {
        self.news = Arc::new(MockNews {
            behavior,
            calls: AtomicUsize::new(0),
            days_back: Mutex::new(None),
        });
        self
    }

    pub fn with_campaigns(mut self, behavior: Behavior) -> Self {
        self.campaigns = Arc::new(MockCampaigns {
            behavior,
            calls: AtomicUsize::new(0),
        });
        self
    }

    pub fn with_llm(mut self, behavior: Behavior) -> Self {
        self.llm = Arc::new(MockLlm {
            behavior,
            calls: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        });
        self
    }

    pub fn with_visual(mut self, behavior: Behavior) -> Self {
        self.visual = Arc::new(MockVisual {
            behavior,
            calls: AtomicUsize::new(0),
            received_brand_info: Mutex::new(Vec::new()),
        });
        self
    }

    pub fn providers(&self) -> AnalysisProviders {
        AnalysisProviders {
            brand_info: self.brand_info.clone(),
            news: self.news.clone(),
            campaigns: self.campaigns.clone(),
            llm: self.llm.clone(),
            visual: self.visual.clone(),
        }
    }
}

/// Default configuration with millisecond retry backoff
pub fn fast_audit_config() -> AuditConfig {
    let mut config = AuditConfig::default();
    config.retry.base_delay_ms = 1;
    config.retry.max_delay_ms = 10;
    config.orchestration.progress_callback_timeout_ms = 200;
    config
}

pub fn fast_config() -> Arc<ConfigManager> {
    ConfigManager::from_config(fast_audit_config(), "test").expect("test configuration is valid")
}

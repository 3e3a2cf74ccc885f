use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

/// Company profile and brand assets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BrandInfo {
    pub name: String,
    pub domain: Option<String>,
    pub description: Option<String>,
    pub industry: Option<String>,
    pub logo_url: Option<String>,
    pub colors: Vec<String>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub degraded: bool,
}

impl BrandInfo {
    /// Minimal profile derived from the request alone
    pub fn degraded(company_name: &str, website_url: Option<&str>) -> Self {
        Self {
            name: company_name.to_string(),
            domain: website_url.and_then(domain_from_url),
            degraded: true,
            ..Default::default()
        }
    }
}

/// Host part of a URL, lowercased and without a leading `www.`
///
/// Bare hosts such as `tesla.com/models` are parsed as `https` URLs.
pub fn domain_from_url(url: &str) -> Option<String> {
    let url = url.trim();
    let parsed = if url.contains("://") {
        Url::parse(url).ok()?
    } else {
        Url::parse(&format!("https://{url}")).ok()?
    };

    let host = parsed.host_str()?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    (!host.is_empty()).then(|| host.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub source: Option<String>,
    pub url: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    /// -1.0 (negative) to 1.0 (positive)
    pub sentiment: Option<f64>,
}

/// Press coverage for the requested lookback
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewsResult {
    pub articles: Vec<NewsArticle>,
    pub total_results: u32,
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub degraded: bool,
}

impl NewsResult {
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Default::default()
        }
    }

    /// Up to `limit` article titles, most relevant first
    pub fn headlines(&self, limit: usize) -> Vec<&str> {
        self.articles
            .iter()
            .take(limit)
            .map(|article| article.title.as_str())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub name: String,
    pub channel: Option<String>,
    pub summary: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CampaignResult {
    pub campaigns: Vec<Campaign>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub degraded: bool,
}

impl CampaignResult {
    pub fn degraded() -> Self {
        Self {
            degraded: true,
            ..Default::default()
        }
    }
}

/// LLM brand perception analysis
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LlmInsight {
    pub summary: String,
    pub sentiment_score: Option<f64>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(default)]
    pub degraded: bool,
}

impl LlmInsight {
    pub fn degraded(company_name: &str) -> Self {
        Self {
            summary: format!(
                "Detailed brand perception analysis for {company_name} is currently unavailable."
            ),
            degraded: true,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualResult {
    pub screenshots: Vec<String>,
    pub primary_colors: Vec<String>,
    pub consistency_score: Option<f64>,
    #[serde(default)]
    pub details: serde_json::Value,
    #[serde(default)]
    pub degraded: bool,
}

impl VisualResult {
    /// Palette carried over from brand info, no capture or scoring
    pub fn degraded(brand_info: Option<&BrandInfo>) -> Self {
        Self {
            primary_colors: brand_info
                .map(|info| info.colors.clone())
                .unwrap_or_default(),
            degraded: true,
            ..Default::default()
        }
    }
}

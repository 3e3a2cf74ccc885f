//! # Analysis Data Model
//!
//! Requests, per-stage outcomes and the accumulated result of an analysis run.

use crate::constants::{dependencies, operations, stages};
use crate::error::{BrandAuditError, Result};
use crate::providers::{BrandInfo, CampaignResult, LlmInsight, NewsResult, VisualResult};
use crate::recovery::ErrorCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// One named unit of analysis work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BrandInfo,
    NewsAnalysis,
    CampaignAnalysis,
    LlmInsights,
    VisualAnalysis,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::BrandInfo,
        Stage::NewsAnalysis,
        Stage::CampaignAnalysis,
        Stage::LlmInsights,
        Stage::VisualAnalysis,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::BrandInfo => stages::BRAND_INFO,
            Stage::NewsAnalysis => stages::NEWS_ANALYSIS,
            Stage::CampaignAnalysis => stages::CAMPAIGN_ANALYSIS,
            Stage::LlmInsights => stages::LLM_INSIGHTS,
            Stage::VisualAnalysis => stages::VISUAL_ANALYSIS,
        }
    }

    pub fn from_name(name: &str) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.as_str() == name)
    }

    /// Dependency whose circuit breaker guards this stage
    pub fn dependency(self) -> &'static str {
        match self {
            Stage::BrandInfo => dependencies::BRAND_ASSETS,
            Stage::NewsAnalysis => dependencies::NEWS,
            Stage::CampaignAnalysis => dependencies::CAMPAIGNS,
            Stage::LlmInsights => dependencies::LLM,
            Stage::VisualAnalysis => dependencies::VISUAL,
        }
    }

    pub fn operation(self) -> &'static str {
        match self {
            Stage::BrandInfo => operations::GET_COMPANY_INFO,
            Stage::NewsAnalysis => operations::SEARCH_NEWS,
            Stage::CampaignAnalysis => operations::DISCOVER_CAMPAIGNS,
            Stage::LlmInsights => operations::ANALYZE_BRAND_SENTIMENT,
            Stage::VisualAnalysis => operations::ANALYZE_BRAND_VISUALS,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Named analysis switches sent by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisOptions {
    pub brand_perception: bool,
    pub competitive_analysis: bool,
    pub visual_consistency: bool,
    pub visual_analysis: bool,
    pub press_coverage: bool,
    pub social_sentiment: bool,
}

impl AnalysisOptions {
    /// Every option enabled
    pub fn all() -> Self {
        Self {
            brand_perception: true,
            competitive_analysis: true,
            visual_consistency: true,
            visual_analysis: true,
            press_coverage: true,
            social_sentiment: true,
        }
    }

    /// No option enabled
    pub fn none() -> Self {
        Self {
            brand_perception: false,
            competitive_analysis: false,
            visual_consistency: false,
            visual_analysis: false,
            press_coverage: false,
            social_sentiment: false,
        }
    }
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            brand_perception: true,
            competitive_analysis: true,
            press_coverage: true,
            ..Self::none()
        }
    }
}

/// Immutable description of one unit of analysis work
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnalysisRequest {
    analysis_id: String,
    company_name: String,
    website_url: Option<String>,
    options: AnalysisOptions,
}

impl AnalysisRequest {
    /// Build a request with a generated analysis id. The company name must
    /// not be blank; a blank website is treated as absent.
    pub fn new(
        company_name: impl Into<String>,
        website_url: Option<String>,
        options: AnalysisOptions,
    ) -> Result<Self> {
        let company_name = company_name.into().trim().to_string();
        if company_name.is_empty() {
            return Err(BrandAuditError::ValidationError(
                "company_name is required".to_string(),
            ));
        }

        let website_url = website_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty());

        Ok(Self {
            analysis_id: Uuid::new_v4().to_string(),
            company_name,
            website_url,
            options,
        })
    }

    /// Replace the generated id with a caller-supplied correlation id
    pub fn with_analysis_id(mut self, analysis_id: impl Into<String>) -> Self {
        self.analysis_id = analysis_id.into();
        self
    }

    pub fn analysis_id(&self) -> &str {
        &self.analysis_id
    }

    pub fn company_name(&self) -> &str {
        &self.company_name
    }

    pub fn website_url(&self) -> Option<&str> {
        self.website_url.as_deref()
    }

    pub fn options(&self) -> &AnalysisOptions {
        &self.options
    }

    /// Stages implied by the website and options, in execution order
    pub fn requested_stages(&self) -> Vec<Stage> {
        let o = &self.options;
        let mut requested = Vec::with_capacity(Stage::ALL.len());

        if self.website_url.is_some() {
            requested.push(Stage::BrandInfo);
        }
        if o.press_coverage || o.social_sentiment {
            requested.push(Stage::NewsAnalysis);
        }
        if o.competitive_analysis {
            requested.push(Stage::CampaignAnalysis);
        }
        if o.brand_perception || o.social_sentiment {
            requested.push(Stage::LlmInsights);
        }
        if o.visual_analysis || o.visual_consistency {
            requested.push(Stage::VisualAnalysis);
        }

        requested
    }

    pub fn is_requested(&self, stage: Stage) -> bool {
        self.requested_stages().contains(&stage)
    }
}

/// Stage-specific success payloads
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StagePayload {
    BrandInfo(BrandInfo),
    NewsResult(NewsResult),
    CampaignResult(CampaignResult),
    LlmInsight(LlmInsight),
    VisualResult(VisualResult),
}

impl StagePayload {
    pub fn is_degraded(&self) -> bool {
        match self {
            StagePayload::BrandInfo(p) => p.degraded,
            StagePayload::NewsResult(p) => p.degraded,
            StagePayload::CampaignResult(p) => p.degraded,
            StagePayload::LlmInsight(p) => p.degraded,
            StagePayload::VisualResult(p) => p.degraded,
        }
    }

    /// Stage a payload variant belongs to
    pub fn stage(&self) -> Stage {
        match self {
            StagePayload::BrandInfo(_) => Stage::BrandInfo,
            StagePayload::NewsResult(_) => Stage::NewsAnalysis,
            StagePayload::CampaignResult(_) => Stage::CampaignAnalysis,
            StagePayload::LlmInsight(_) => Stage::LlmInsights,
            StagePayload::VisualResult(_) => Stage::VisualAnalysis,
        }
    }
}

/// Success or failure of one stage; never both, never neither
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StageOutcome {
    Success(StagePayload),
    Failure {
        error: String,
        category: ErrorCategory,
        /// Set when the dependency's circuit was open
        #[serde(default, skip_serializing_if = "Option::is_none")]
        retry_after_seconds: Option<u64>,
    },
}

impl StageOutcome {
    pub fn failure(error: impl Into<String>, category: ErrorCategory) -> Self {
        StageOutcome::Failure {
            error: error.into(),
            category,
            retry_after_seconds: None,
        }
    }

    /// Failure for a call short-circuited by an open circuit
    pub fn circuit_open(error: impl Into<String>, retry_after: std::time::Duration) -> Self {
        StageOutcome::Failure {
            error: error.into(),
            category: ErrorCategory::Unknown,
            retry_after_seconds: Some(retry_after.as_secs().max(1)),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success(_))
    }

    pub fn payload(&self) -> Option<&StagePayload> {
        match self {
            StageOutcome::Success(payload) => Some(payload),
            StageOutcome::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            StageOutcome::Success(_) => None,
            StageOutcome::Failure { error, .. } => Some(error),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub total_duration_seconds: f64,
    /// Stage tasks run through the batch executor during the run
    pub concurrent_tasks_executed: usize,
}

/// Accumulated result of one analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: String,
    pub company_name: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    /// 0-100, non-decreasing within a run
    pub progress: u8,
    pub stages: BTreeMap<Stage, StageOutcome>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub performance_metrics: PerformanceMetrics,
}

impl AnalysisResult {
    pub fn new(request: &AnalysisRequest) -> Self {
        Self {
            analysis_id: request.analysis_id().to_string(),
            company_name: request.company_name().to_string(),
            started_at: Utc::now(),
            completed_at: None,
            progress: 0,
            stages: BTreeMap::new(),
            errors: Vec::new(),
            warnings: Vec::new(),
            performance_metrics: PerformanceMetrics::default(),
        }
    }

    /// Store a stage outcome, adding failures to the error list. A stage
    /// keeps its first outcome.
    pub fn record_stage(&mut self, stage: Stage, outcome: StageOutcome) {
        if self.stages.contains_key(&stage) {
            return;
        }
        if let StageOutcome::Failure { error, .. } = &outcome {
            self.errors.push(format!("{stage}: {error}"));
        }
        self.stages.insert(stage, outcome);
    }

    /// Raise progress; lower values are ignored
    pub fn advance_progress(&mut self, percent: u8) -> bool {
        let percent = percent.min(100);
        if percent > self.progress {
            self.progress = percent;
            true
        } else {
            false
        }
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageOutcome> {
        self.stages.get(&stage)
    }

    pub fn is_stage_success(&self, stage: Stage) -> bool {
        self.stage(stage).is_some_and(StageOutcome::is_success)
    }

    pub fn brand_info(&self) -> Option<&BrandInfo> {
        match self.stage(Stage::BrandInfo)?.payload()? {
            StagePayload::BrandInfo(info) => Some(info),
            _ => None,
        }
    }

    pub fn news(&self) -> Option<&NewsResult> {
        match self.stage(Stage::NewsAnalysis)?.payload()? {
            StagePayload::NewsResult(news) => Some(news),
            _ => None,
        }
    }

    pub fn llm_insights(&self) -> Option<&LlmInsight> {
        match self.stage(Stage::LlmInsights)?.payload()? {
            StagePayload::LlmInsight(insight) => Some(insight),
            _ => None,
        }
    }

    /// True when no stage failed
    pub fn is_complete_success(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_company_name_rejected() {
        let result = AnalysisRequest::new("   ", None, AnalysisOptions::default());
        assert!(matches!(result, Err(BrandAuditError::ValidationError(_))));
    }

    #[test]
    fn test_requested_stages_follow_options() {
        let options = AnalysisOptions {
            press_coverage: true,
            competitive_analysis: true,
            brand_perception: true,
            visual_analysis: true,
            ..AnalysisOptions::none()
        };
        let request = AnalysisRequest::new("Tesla", None, options).unwrap();
        assert_eq!(
            request.requested_stages(),
            vec![
                Stage::NewsAnalysis,
                Stage::CampaignAnalysis,
                Stage::LlmInsights,
                Stage::VisualAnalysis
            ]
        );

        let request = AnalysisRequest::new(
            "Tesla",
            Some("https://tesla.com".to_string()),
            AnalysisOptions::none(),
        )
        .unwrap();
        assert_eq!(request.requested_stages(), vec![Stage::BrandInfo]);
    }

    #[test]
    fn test_blank_website_is_absent() {
        let request =
            AnalysisRequest::new("Tesla", Some("  ".to_string()), AnalysisOptions::default())
                .unwrap();
        assert!(request.website_url().is_none());
        assert!(!request.is_requested(Stage::BrandInfo));
    }

    #[test]
    fn test_options_deserialize_from_camel_case() {
        let options: AnalysisOptions =
            serde_json::from_str(r#"{"visualAnalysis": true, "pressCoverage": false}"#).unwrap();
        assert!(options.visual_analysis);
        assert!(!options.press_coverage);
        // Unspecified options keep their defaults
        assert!(options.brand_perception);
    }

    #[test]
    fn test_failure_serializes_as_error_object() {
        let outcome = StageOutcome::failure("timed out", ErrorCategory::Timeout);
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["error"], "timed out");
        assert_eq!(value["category"], "timeout");
        assert!(value.get("retry_after_seconds").is_none());

        let open = StageOutcome::circuit_open("unavailable", std::time::Duration::from_secs(42));
        assert_eq!(serde_json::to_value(&open).unwrap()["retry_after_seconds"], 42);
    }

    #[test]
    fn test_record_stage_keeps_first_outcome_and_collects_errors() {
        let request = AnalysisRequest::new("Tesla", None, AnalysisOptions::default()).unwrap();
        let mut result = AnalysisResult::new(&request);

        result.record_stage(
            Stage::NewsAnalysis,
            StageOutcome::failure("timed out", ErrorCategory::Timeout),
        );
        result.record_stage(
            Stage::NewsAnalysis,
            StageOutcome::Success(StagePayload::NewsResult(NewsResult::default())),
        );

        assert!(!result.is_stage_success(Stage::NewsAnalysis));
        assert_eq!(result.errors, vec!["news_analysis: timed out".to_string()]);
    }

    #[test]
    fn test_progress_never_decreases() {
        let request = AnalysisRequest::new("Tesla", None, AnalysisOptions::default()).unwrap();
        let mut result = AnalysisResult::new(&request);

        assert!(result.advance_progress(50));
        assert!(!result.advance_progress(20));
        assert_eq!(result.progress, 50);
        assert!(result.advance_progress(200));
        assert_eq!(result.progress, 100);
    }
}

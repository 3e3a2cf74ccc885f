//! # Analysis Orchestrator
//!
//! Coordinates one brand analysis across every data source in two dependent
//! batches:
//!
//! 1. **Collecting**: brand info, news and campaigns run concurrently.
//! 2. **Enriching**: LLM insights (fed by brand info and news headlines) and
//!    visual analysis (fed by brand info) run concurrently once every
//!    collecting stage has resolved.
//!
//! Every provider call goes through the [`ErrorManagementService`], so
//! circuit breakers, retries, fallbacks and performance recording apply
//! uniformly. A failing stage never aborts the run; it is reported in the
//! result next to the stages that succeeded.

use super::batch_executor::{BatchResults, BatchTask, TaskBatchExecutor, TaskFailure};
use super::progress::{ProgressCallback, ProgressTracker};
use super::types::{AnalysisRequest, AnalysisResult, Stage, StageOutcome, StagePayload};
use super::worker_pool::BlockingWorkerPool;
use crate::config::{ConfigManager, CredentialsConfig};
use crate::constants::{capabilities, progress};
use crate::logging::log_stage_operation;
use crate::metrics::{PerformanceRecorder, PerformanceStats};
use crate::providers::{
    BrandInfo, BrandInfoProvider, CampaignProvider, CampaignResult, LlmInsight, LlmProvider,
    NewsProvider, NewsResult, ProviderError, VisualAnalysisProvider, VisualResult,
};
use crate::recovery::{
    DegradeFn, ErrorCategory, ErrorManagementService, FallbackProvider, Recovered, RecoveryContext,
    RecoveryFailure, RecoveryStrategy,
};
use crate::resilience::{CircuitBreakerManager, CircuitBreakerState};
use chrono::Utc;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Headlines included in the LLM context
const LLM_CONTEXT_HEADLINES: usize = 5;

/// The data sources an orchestrator calls
#[derive(Clone)]
pub struct AnalysisProviders {
    pub brand_info: Arc<dyn BrandInfoProvider>,
    pub news: Arc<dyn NewsProvider>,
    pub campaigns: Arc<dyn CampaignProvider>,
    pub llm: Arc<dyn LlmProvider>,
    pub visual: Arc<dyn VisualAnalysisProvider>,
}

/// What a stage task hands back to the orchestrator
struct StageRun {
    stage: Stage,
    result: Result<Recovered, RecoveryFailure>,
}

pub struct AnalysisOrchestrator {
    config: Arc<ConfigManager>,
    providers: AnalysisProviders,
    recovery: Arc<ErrorManagementService>,
    executor: TaskBatchExecutor,
    workers: BlockingWorkerPool,
}

impl std::fmt::Debug for AnalysisOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalysisOrchestrator")
            .field("environment", &self.config.environment())
            .field("recovery", &self.recovery)
            .field("executor", &self.executor)
            .field("workers", &self.workers)
            .finish()
    }
}

impl AnalysisOrchestrator {
    /// Create an orchestrator with its own circuit breakers and recorder
    pub fn new(config: Arc<ConfigManager>, providers: AnalysisProviders) -> Self {
        let settings = config.config();
        let circuit_breakers = CircuitBreakerManager::new(settings.circuit_breakers.clone());
        let performance = Arc::new(PerformanceRecorder::new(settings.performance.max_samples));
        let recovery = Arc::new(ErrorManagementService::new(
            settings,
            circuit_breakers,
            performance,
        ));

        Self::with_recovery(config, providers, recovery)
    }

    /// Create an orchestrator around an existing recovery service, sharing
    /// its breakers, recorder and fallbacks
    pub fn with_recovery(
        config: Arc<ConfigManager>,
        providers: AnalysisProviders,
        recovery: Arc<ErrorManagementService>,
    ) -> Self {
        let orchestration = &config.config().orchestration;
        let executor = TaskBatchExecutor::new(orchestration.max_concurrent_calls);
        let workers = BlockingWorkerPool::new(orchestration.worker_pool_size);

        for stage in Stage::ALL {
            recovery
                .circuit_breakers()
                .get_circuit_breaker(stage.dependency());
        }

        info!(
            environment = %config.environment(),
            max_concurrent_calls = executor.max_concurrent(),
            worker_pool_size = workers.size(),
            "🚀 Analysis orchestrator ready"
        );

        Self {
            config,
            providers,
            recovery,
            executor,
            workers,
        }
    }

    /// Run every requested stage and assemble the result.
    ///
    /// Never fails as a whole: stage failures are recorded in the result and
    /// progress callback problems become warnings.
    pub async fn run_concurrent_analysis(
        &self,
        request: &AnalysisRequest,
        progress_callback: Option<Arc<dyn ProgressCallback>>,
    ) -> AnalysisResult {
        let started = Instant::now();
        let orchestration = &self.config.config().orchestration;
        let tracker = ProgressTracker::new(
            progress_callback,
            orchestration.progress_callback_timeout(),
        );
        let mut result = AnalysisResult::new(request);
        let requested = request.requested_stages();

        info!(
            analysis_id = %request.analysis_id(),
            company = %request.company_name(),
            stages = ?requested,
            "🎯 Starting brand analysis"
        );
        tracker
            .checkpoint(&mut result, progress::INITIALIZED, "Analysis initialized")
            .await;

        // Collecting
        tracker
            .checkpoint(
                &mut result,
                progress::COLLECTING,
                "Collecting brand, news and campaign data",
            )
            .await;
        let collecting: Vec<_> = [Stage::BrandInfo, Stage::NewsAnalysis, Stage::CampaignAnalysis]
            .into_iter()
            .filter(|stage| requested.contains(stage))
            .map(|stage| self.stage_task(stage, request, None, None))
            .collect();
        let mut tasks_executed = collecting.len();
        let batch = self.executor.execute_batch(collecting).await;
        self.absorb_batch(&mut result, batch);

        // Enriching
        let brand_info = result.brand_info().cloned();
        let llm_context = build_llm_context(request, brand_info.as_ref(), result.news());

        tracker
            .checkpoint(&mut result, progress::LLM_ANALYSIS, "Generating brand insights")
            .await;
        tracker
            .checkpoint(
                &mut result,
                progress::VISUAL_ANALYSIS,
                "Analyzing visual identity",
            )
            .await;
        let enriching: Vec<_> = [Stage::LlmInsights, Stage::VisualAnalysis]
            .into_iter()
            .filter(|stage| requested.contains(stage))
            .map(|stage| {
                self.stage_task(stage, request, Some(&llm_context), brand_info.clone())
            })
            .collect();
        tasks_executed += enriching.len();
        let batch = self.executor.execute_batch(enriching).await;
        self.absorb_batch(&mut result, batch);

        for stage in requested {
            if result.stage(stage).is_none() {
                result.record_stage(
                    stage,
                    StageOutcome::failure(
                        "stage produced no result",
                        ErrorCategory::Unknown,
                    ),
                );
            }
        }

        result.performance_metrics.total_duration_seconds = started.elapsed().as_secs_f64();
        result.performance_metrics.concurrent_tasks_executed = tasks_executed;
        result.completed_at = Some(Utc::now());
        tracker
            .checkpoint(&mut result, progress::FINALIZED, "Analysis complete")
            .await;

        info!(
            analysis_id = %result.analysis_id,
            succeeded = result.stages.values().filter(|o| o.is_success()).count(),
            failed = result.errors.len(),
            warnings = result.warnings.len(),
            duration_ms = started.elapsed().as_millis() as u64,
            "🏁 Brand analysis finished"
        );

        result
    }

    fn stage_task(
        &self,
        stage: Stage,
        request: &AnalysisRequest,
        llm_context: Option<&str>,
        brand_info: Option<BrandInfo>,
    ) -> BatchTask<StageRun> {
        let recovery = Arc::clone(&self.recovery);
        let workers = self.workers.clone();
        let company = request.company_name().to_string();
        let website = request.website_url().map(str::to_string);
        let context = RecoveryContext::new(stage.dependency(), stage.operation(), &company)
            .with_website_url(request.website_url());
        let analysis_id = request.analysis_id().to_string();

        match stage {
            Stage::BrandInfo => {
                let provider = Arc::clone(&self.providers.brand_info);
                let (degrade_company, degrade_website) = (company.clone(), website.clone());
                let degrade: DegradeFn = Box::new(move || {
                    StagePayload::BrandInfo(BrandInfo::degraded(
                        &degrade_company,
                        degrade_website.as_deref(),
                    ))
                });
                let operation = move || {
                    let provider = Arc::clone(&provider);
                    let (company, website) = (company.clone(), website.clone());
                    let workers = workers.clone();
                    async move {
                        workers
                            .run(move || provider.get_company_info(&company, website.as_deref()))
                            .await
                            .map(StagePayload::BrandInfo)
                    }
                };
                BatchTask::new(
                    stage.as_str(),
                    run_stage(recovery, stage, context, analysis_id, Some(degrade), operation),
                )
            }
            Stage::NewsAnalysis => {
                let provider = Arc::clone(&self.providers.news);
                let days_back = self.config.config().orchestration.news_days_back;
                let degrade: DegradeFn =
                    Box::new(|| StagePayload::NewsResult(NewsResult::degraded()));
                let operation = move || {
                    let provider = Arc::clone(&provider);
                    let company = company.clone();
                    let workers = workers.clone();
                    async move {
                        workers
                            .run(move || provider.search_news(&company, days_back))
                            .await
                            .map(StagePayload::NewsResult)
                    }
                };
                BatchTask::new(
                    stage.as_str(),
                    run_stage(recovery, stage, context, analysis_id, Some(degrade), operation),
                )
            }
            Stage::CampaignAnalysis => {
                let provider = Arc::clone(&self.providers.campaigns);
                let degrade: DegradeFn =
                    Box::new(|| StagePayload::CampaignResult(CampaignResult::degraded()));
                let operation = move || {
                    let provider = Arc::clone(&provider);
                    let company = company.clone();
                    let workers = workers.clone();
                    async move {
                        workers
                            .run(move || provider.discover_campaigns(&company))
                            .await
                            .map(StagePayload::CampaignResult)
                    }
                };
                BatchTask::new(
                    stage.as_str(),
                    run_stage(recovery, stage, context, analysis_id, Some(degrade), operation),
                )
            }
            Stage::LlmInsights => {
                let provider = Arc::clone(&self.providers.llm);
                let llm_context = llm_context.unwrap_or_default().to_string();
                let degrade_company = company.clone();
                let degrade: DegradeFn = Box::new(move || {
                    StagePayload::LlmInsight(LlmInsight::degraded(&degrade_company))
                });
                let operation = move || {
                    let provider = Arc::clone(&provider);
                    let (company, llm_context) = (company.clone(), llm_context.clone());
                    let workers = workers.clone();
                    async move {
                        workers
                            .run(move || provider.analyze_brand_sentiment(&llm_context, &company))
                            .await
                            .map(StagePayload::LlmInsight)
                    }
                };
                BatchTask::new(
                    stage.as_str(),
                    run_stage(recovery, stage, context, analysis_id, Some(degrade), operation),
                )
            }
            Stage::VisualAnalysis => {
                let provider = Arc::clone(&self.providers.visual);
                let degrade_brand = brand_info.clone();
                let degrade: DegradeFn = Box::new(move || {
                    StagePayload::VisualResult(VisualResult::degraded(degrade_brand.as_ref()))
                });
                let operation = move || {
                    let provider = Arc::clone(&provider);
                    let (company, website) = (company.clone(), website.clone());
                    let brand_info = brand_info.clone();
                    async move {
                        provider
                            .analyze_brand_visuals(&company, website.as_deref(), brand_info.as_ref())
                            .await
                            .map(StagePayload::VisualResult)
                    }
                };
                BatchTask::new(
                    stage.as_str(),
                    run_stage(recovery, stage, context, analysis_id, Some(degrade), operation),
                )
            }
        }
    }

    fn absorb_batch(&self, result: &mut AnalysisResult, batch: BatchResults<StageRun>) {
        for (name, joined) in batch {
            match joined {
                Ok(run) => {
                    let stage = run.stage;
                    let outcome = match run.result {
                        Ok(recovered) => {
                            match recovered.via {
                                Some(RecoveryStrategy::Fallback) => result
                                    .warnings
                                    .push(format!("{stage}: served by fallback provider")),
                                Some(RecoveryStrategy::Degrade) => result
                                    .warnings
                                    .push(format!("{stage}: returned degraded result")),
                                _ => {}
                            }
                            StageOutcome::Success(recovered.payload)
                        }
                        Err(failure) => failure.to_outcome(),
                    };
                    result.record_stage(stage, outcome);
                }
                Err(task_failure) => match Stage::from_name(&name) {
                    Some(stage) => {
                        log_stage_operation(
                            &result.analysis_id,
                            stage.as_str(),
                            "failed",
                            None,
                            Some(&task_failure.message),
                        );
                        result.record_stage(
                            stage,
                            StageOutcome::failure(task_failure.message, task_failure.category),
                        );
                    }
                    None => warn!(task = %name, "Result for unknown stage task dropped"),
                },
            }
        }
    }

    /// Capabilities available with the configured credentials
    pub fn get_capabilities(&self) -> BTreeMap<String, bool> {
        let credentials = &self.config.config().credentials;
        let present = CredentialsConfig::is_present;

        BTreeMap::from([
            (
                capabilities::LLM_ANALYSIS.to_string(),
                present(&credentials.openrouter_api_key),
            ),
            (
                capabilities::NEWS_SEARCH.to_string(),
                present(&credentials.news_api_key),
            ),
            (
                capabilities::CAMPAIGN_DISCOVERY.to_string(),
                present(&credentials.news_api_key),
            ),
            (
                capabilities::BRAND_ASSETS.to_string(),
                present(&credentials.brandfetch_api_key),
            ),
            (
                capabilities::VISUAL_ANALYSIS.to_string(),
                present(&credentials.screenshot_api_key),
            ),
        ])
    }

    pub fn get_circuit_breaker_status(&self) -> BTreeMap<String, CircuitBreakerState> {
        self.recovery.circuit_breakers().status()
    }

    /// Performance stats keyed by `"dependency.operation"` over the
    /// configured summary window
    pub fn get_performance_summary(
        &self,
        dependency: Option<&str>,
    ) -> BTreeMap<String, PerformanceStats> {
        let window_hours = self.config.config().performance.summary_window_hours;
        self.recovery.performance().summary(dependency, window_hours)
    }

    pub fn register_fallback(
        &self,
        dependency: &str,
        operation: &str,
        provider: Arc<dyn FallbackProvider>,
    ) {
        self.recovery.register_fallback(dependency, operation, provider);
    }

    /// Close a dependency's circuit and clear its failure count
    pub fn reset_circuit_breaker(&self, dependency: &str) -> bool {
        self.recovery.circuit_breakers().reset(dependency)
    }

    /// 0.0 to 1.0 across every dependency's circuit
    pub fn system_health_score(&self) -> f64 {
        self.recovery.circuit_breakers().system_health_score()
    }

    pub fn config(&self) -> &Arc<ConfigManager> {
        &self.config
    }

    pub fn recovery(&self) -> &Arc<ErrorManagementService> {
        &self.recovery
    }
}

async fn run_stage<F, Fut>(
    recovery: Arc<ErrorManagementService>,
    stage: Stage,
    context: RecoveryContext,
    analysis_id: String,
    degrade: Option<DegradeFn>,
    operation: F,
) -> Result<StageRun, TaskFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<StagePayload, ProviderError>>,
{
    log_stage_operation(&analysis_id, stage.as_str(), "started", None, None);
    let started = Instant::now();
    let result = recovery.execute(&context, degrade, operation).await;
    let duration = started.elapsed();

    match &result {
        Ok(recovered) => log_stage_operation(
            &analysis_id,
            stage.as_str(),
            "completed",
            Some(duration.as_millis() as u64),
            recovered.via.map(|via| via.to_string()).as_deref(),
        ),
        Err(failure) => log_stage_operation(
            &analysis_id,
            stage.as_str(),
            "failed",
            Some(duration.as_millis() as u64),
            Some(&failure.to_string()),
        ),
    }

    Ok(StageRun { stage, result })
}

/// Prompt context for the LLM stage from whatever the collecting batch found
pub fn build_llm_context(
    request: &AnalysisRequest,
    brand_info: Option<&BrandInfo>,
    news: Option<&NewsResult>,
) -> String {
    let mut lines = vec![format!("Company: {}", request.company_name())];

    if let Some(website) = request.website_url() {
        lines.push(format!("Website: {website}"));
    }

    if let Some(info) = brand_info {
        if let Some(industry) = &info.industry {
            lines.push(format!("Industry: {industry}"));
        }
        if let Some(description) = &info.description {
            lines.push(format!("Description: {description}"));
        }
        if !info.colors.is_empty() {
            lines.push(format!("Brand colors: {}", info.colors.join(", ")));
        }
    }

    if let Some(news) = news {
        let headlines = news.headlines(LLM_CONTEXT_HEADLINES);
        if !headlines.is_empty() {
            lines.push("Recent headlines:".to_string());
            lines.extend(headlines.iter().map(|headline| format!("- {headline}")));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::types::AnalysisOptions;
    use crate::providers::NewsArticle;

    #[test]
    fn test_llm_context_includes_collected_data() {
        let request = AnalysisRequest::new(
            "Tesla",
            Some("https://tesla.com".to_string()),
            AnalysisOptions::default(),
        )
        .unwrap();
        let info = BrandInfo {
            name: "Tesla".to_string(),
            industry: Some("Automotive".to_string()),
            ..Default::default()
        };
        let news = NewsResult {
            articles: vec![NewsArticle {
                title: "Tesla opens new factory".to_string(),
                source: None,
                url: None,
                published_at: None,
                sentiment: None,
            }],
            total_results: 1,
            ..Default::default()
        };

        let context = build_llm_context(&request, Some(&info), Some(&news));

        assert!(context.starts_with("Company: Tesla"));
        assert!(context.contains("Industry: Automotive"));
        assert!(context.contains("- Tesla opens new factory"));
    }

    #[test]
    fn test_llm_context_without_collected_data() {
        let request = AnalysisRequest::new("Tesla", None, AnalysisOptions::default()).unwrap();
        assert_eq!(build_llm_context(&request, None, None), "Company: Tesla");
    }
}

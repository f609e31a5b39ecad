//! Wires collection, enrichment, theme analysis and question generation.

use crate::config::Config;
use crate::llm::TextGenerator;
use crate::questions::QuestionGenerator;
use crate::state::{AnalysisState, Stage};
use crate::suggest::{CollectError, LevelPlan, NoDelay, Pacer, SuggestProvider, SuggestionCollector};
use crate::themes::ThemeAnalyzer;
use crate::volume::{enrich, unique_keywords, VolumeProvider};
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Collect(#[from] CollectError),

    #[error("Cannot run {step} at stage {stage}")]
    NotReady { step: &'static str, stage: Stage },

    #[error("No LLM configured; {0} needs one")]
    NoGenerator(&'static str),
}

/// Runs analysis steps over an [`AnalysisState`]
///
/// Holds only collaborators and settings: every step takes the state by value
/// and returns the updated one.
pub struct Analyzer {
    config: Config,
    suggest: Arc<dyn SuggestProvider>,
    generator: Option<Arc<dyn TextGenerator>>,
    volume: Option<Arc<dyn VolumeProvider>>,
    pacer: Arc<dyn Pacer>,
}

impl Analyzer {
    pub fn new(config: Config, suggest: Arc<dyn SuggestProvider>) -> Self {
        Self {
            config,
            suggest,
            generator: None,
            volume: None,
            pacer: Arc::new(NoDelay),
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_volume(mut self, volume: Arc<dyn VolumeProvider>) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn with_pacer(mut self, pacer: Arc<dyn Pacer>) -> Self {
        self.pacer = pacer;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn level_plan(&self) -> LevelPlan {
        let [l1, l2, l3] = self.config.suggest.level_counts;
        LevelPlan::from_counts(l1, l2, l3)
    }

    /// Crawl suggestions for every seed of the state
    pub async fn collect(&self, mut state: AnalysisState) -> Result<AnalysisState, PipelineError> {
        let collector = SuggestionCollector::new(self.suggest.clone())
            .with_pacer(self.pacer.clone())
            .with_retry(self.config.retry_policy())
            .with_concurrency(self.config.suggest.concurrency)
            .with_modifiers(self.config.modifier_set());

        let records = collector
            .collect_all(&state.seeds, &state.language, &self.level_plan())
            .await?;

        state.set_records(records);
        tracing::info!(
            run_id = %state.run_id,
            suggestions = state.suggestion_count(),
            levels = ?state.level_counts,
            "collection stage done"
        );
        Ok(state)
    }

    /// Attach volume data when a provider is configured. Failures are logged
    /// and leave the state without enrichment.
    pub async fn enrich(&self, mut state: AnalysisState) -> Result<AnalysisState, PipelineError> {
        if state.stage < Stage::SuggestionsCollected {
            return Err(PipelineError::NotReady {
                step: "enrichment",
                stage: state.stage,
            });
        }
        let Some(provider) = &self.volume else {
            return Ok(state);
        };

        let settings = &self.config.volume;
        let keywords = unique_keywords(&state.records);
        let policy = settings.retry_policy(self.config.retry_policy());

        let result = policy
            .run("volume", || {
                provider.search_volume(&keywords, &settings.language, &settings.location)
            })
            .await;

        match result {
            Ok(volumes) => {
                state.enrichment = Some(enrich(&state.records, volumes, settings.min_volume));
            }
            Err(e) => {
                tracing::warn!(run_id = %state.run_id, error = %e, "volume enrichment skipped");
            }
        }
        Ok(state)
    }

    /// Cluster collected suggestions into themes. No LLM answer, or an
    /// unreadable one, leaves the theme list empty.
    pub async fn analyze_themes(
        &self,
        mut state: AnalysisState,
    ) -> Result<AnalysisState, PipelineError> {
        if state.stage < Stage::SuggestionsCollected {
            return Err(PipelineError::NotReady {
                step: "theme analysis",
                stage: state.stage,
            });
        }
        let generator = self
            .generator
            .clone()
            .ok_or(PipelineError::NoGenerator("theme analysis"))?;

        let analyzer = ThemeAnalyzer::new(generator, self.config.retry_policy())
            .with_max_suggestions(self.config.analysis.max_suggestions_in_prompt);

        let themes = match analyzer
            .analyze(&state.seeds, &state.records, &state.language)
            .await
        {
            Ok(themes) => themes,
            Err(e) => {
                tracing::warn!(run_id = %state.run_id, error = %e, "theme answer unusable");
                Vec::new()
            }
        };

        state.set_themes(themes);
        Ok(state)
    }

    /// Generate and consolidate questions for the active themes
    pub async fn generate_questions(
        &self,
        mut state: AnalysisState,
    ) -> Result<AnalysisState, PipelineError> {
        if state.stage < Stage::ThemesAnalyzed {
            return Err(PipelineError::NotReady {
                step: "question generation",
                stage: state.stage,
            });
        }
        let generator = self
            .generator
            .clone()
            .ok_or(PipelineError::NoGenerator("question generation"))?;

        let themes = state.active_themes();
        let outcome = QuestionGenerator::new(generator, self.config.retry_policy())
            .generate(
                &themes,
                &state.records,
                &state.seeds,
                &state.language,
                self.config.analysis.final_questions_count,
            )
            .await;

        state.question_yields = outcome.yields;
        state.questions = outcome.consolidated;
        state.stage = Stage::QuestionsGenerated;
        Ok(state)
    }

    /// Every step in order. Theme analysis and question generation are
    /// skipped when no LLM is configured.
    pub async fn run(&self, state: AnalysisState) -> Result<AnalysisState, PipelineError> {
        let state = self.collect(state).await?;
        let state = self.enrich(state).await?;

        if self.generator.is_none() {
            tracing::info!("no LLM configured, stopping after collection");
            return Ok(state);
        }

        let state = self.analyze_themes(state).await?;
        if !self.config.analysis.generate_questions {
            return Ok(state);
        }
        self.generate_questions(state).await
    }
}

mod common;

use common::{fast_retry, StubGenerator, StubSuggestProvider, StubVolumeProvider};
use keyquest::config::Config;
use keyquest::pipeline::{Analyzer, PipelineError};
use keyquest::questions::QuestionGenerator;
use keyquest::state::{AnalysisState, Stage};
use keyquest::suggest::SuggestionRecord;
use keyquest::themes::ThemeDescriptor;
use keyquest::volume::KeywordOrigin;
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn theme(name: &str, importance: u8, examples: &[&str]) -> ThemeDescriptor {
    ThemeDescriptor {
        name: name.to_string(),
        importance,
        examples: examples.iter().map(|e| e.to_string()).collect(),
        ..Default::default()
    }
}

fn record(keyword: &str, level: u8, text: &str) -> SuggestionRecord {
    SuggestionRecord {
        keyword: keyword.to_string(),
        level,
        text: text.to_string(),
        parent: Some(keyword.to_string()),
    }
}

fn questions_json(pairs: &[(&str, &str)]) -> String {
    let items: Vec<serde_json::Value> = pairs
        .iter()
        .map(|(q, s)| serde_json::json!({ "question": q, "suggestion": s }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

#[tokio::test]
async fn shortfall_is_not_redistributed() {
    let themes = vec![
        theme("Budget", 5, &["hotel pas cher"]),
        theme("Luxe", 4, &["hotel spa"]),
    ];
    let budget_answer = questions_json(&[
        ("Quel hôtel pas cher réserver ?", "hotel pas cher"),
        ("Où dormir pour pas cher ?", "hotel pas cher"),
    ]);
    let luxe_answer = questions_json(&[
        ("Quel hôtel avec spa choisir ?", "hotel spa"),
        ("Combien coûte un hôtel spa ?", "hotel spa"),
        ("Un hôtel spa pour un week-end ?", "hotel spa"),
        ("Quel spa d'hôtel est le plus calme ?", "hotel spa"),
        ("Faut-il réserver le spa de l'hôtel ?", "hotel spa"),
        ("Un sixième qui dépasse la part ?", "hotel spa"),
    ]);
    let generator = Arc::new(StubGenerator::new(vec![
        Some(budget_answer.as_str()),
        Some(luxe_answer.as_str()),
    ]));

    let outcome = QuestionGenerator::new(generator.clone(), fast_retry())
        .generate(&themes, &[], &["hotel".to_string()], "fr", 10)
        .await;

    assert_eq!(outcome.yields[0].allocated, 5);
    assert_eq!(outcome.yields[0].produced, 2);
    assert_eq!(outcome.yields[1].allocated, 5);
    assert_eq!(outcome.yields[1].produced, 5);
    assert_eq!(outcome.candidates.len(), 7);
    assert_eq!(outcome.consolidated.len(), 7);
    assert!(generator.prompts()[0].contains("Write 5 conversational questions"));
}

#[tokio::test]
async fn failed_theme_contributes_nothing() {
    let themes = vec![
        theme("Budget", 5, &["hotel pas cher"]),
        theme("Luxe", 4, &["hotel spa"]),
    ];
    let luxe_answer = "1. Quel hôtel avec spa choisir ?\n2. Combien coûte un hôtel spa ?";
    let generator = Arc::new(StubGenerator::new(vec![None, Some(luxe_answer)]));

    let outcome = QuestionGenerator::new(generator, fast_retry())
        .generate(&themes, &[], &["hotel".to_string()], "fr", 4)
        .await;

    assert_eq!(outcome.yields[0].produced, 0);
    assert_eq!(outcome.yields[1].produced, 2);
    let texts: Vec<&str> = outcome
        .consolidated
        .iter()
        .map(|i| i.original_text.as_str())
        .collect();
    assert_eq!(
        texts,
        vec!["Quel hôtel avec spa choisir ?", "Combien coûte un hôtel spa ?"]
    );
    // list answers are attributed to the theme's examples
    assert!(outcome
        .candidates
        .iter()
        .all(|c| c.source_suggestion == "hotel spa"));
}

#[tokio::test]
async fn source_keyword_comes_from_the_suggestion_record() {
    let records = vec![
        SuggestionRecord::seed("hotel lyon"),
        record("hotel lyon", 1, "hotel lyon spa"),
        SuggestionRecord::seed("hotel paris"),
        record("hotel paris", 1, "hotel paris spa"),
    ];
    let themes = vec![theme("Spa", 5, &["hotel paris spa"])];
    let answer = questions_json(&[
        ("Quel hôtel avec spa à Paris ?", "Hotel Paris Spa"),
        ("Quel hôtel avec spa à Lyon ?", "hotel lyon spa"),
        ("Une question sans suggestion connue ?", "inconnue"),
    ]);
    let generator = Arc::new(StubGenerator::new(vec![Some(answer.as_str())]));

    let outcome = QuestionGenerator::new(generator, fast_retry())
        .generate(
            &themes,
            &records,
            &["hotel lyon".to_string(), "hotel paris".to_string()],
            "fr",
            3,
        )
        .await;

    let keywords: Vec<&str> = outcome
        .candidates
        .iter()
        .map(|c| c.source_keyword.as_str())
        .collect();
    // unknown suggestions fall back to the theme's own keyword
    assert_eq!(keywords, vec!["hotel paris", "hotel lyon", "hotel paris"]);
}

#[tokio::test]
async fn no_themes_means_no_questions() {
    let generator = Arc::new(StubGenerator::new(vec![]));
    let outcome = QuestionGenerator::new(generator.clone(), fast_retry())
        .generate(&[], &[], &["hotel".to_string()], "fr", 10)
        .await;

    assert!(outcome.consolidated.is_empty());
    assert!(generator.prompts().is_empty());
}

fn test_config() -> Config {
    let mut config = Config::default();
    config.suggest.level_counts = [3, 2, 0];
    config.retry.base_delay_ms = 1;
    config.retry.timeout_secs = 1;
    config.volume.min_volume = 50;
    config.analysis.final_questions_count = 4;
    config
}

fn hotel_provider() -> Arc<StubSuggestProvider> {
    Arc::new(
        StubSuggestProvider::new()
            .with("hotel lyon", &["hotel lyon pas cher", "hotel lyon spa"])
            .with("hotel lyon pas cher", &["hotel lyon pas cher centre"])
            .with("hotel lyon spa", &["hotel lyon spa jacuzzi", "hotel lyon pas cher"]),
    )
}

const THEMES_ANSWER: &str = r#"```json
{"themes": [
  {"name": "Bien-être", "concepts": ["spa"], "intent": "commercial", "importance": 3,
   "examples": ["hotel lyon spa", "hotel lyon spa jacuzzi"]},
  {"name": "Budget", "concepts": ["prix"], "intent": "transactional", "importance": 5,
   "examples": ["hotel lyon pas cher"]}
]}
```"#;

#[tokio::test]
async fn full_run_reaches_questions() {
    let budget = questions_json(&[
        ("Quel hôtel pas cher à Lyon ?", "hotel lyon pas cher"),
        ("Où dormir pas cher au centre de Lyon ?", "hotel lyon pas cher centre"),
    ]);
    let spa = questions_json(&[
        ("Quel hôtel avec spa à Lyon ?", "hotel lyon spa"),
        ("quel hôtel avec spa à Lyon", "hotel lyon spa jacuzzi"),
    ]);
    let generator = Arc::new(StubGenerator::new(vec![
        Some(THEMES_ANSWER),
        Some(budget.as_str()),
        Some(spa.as_str()),
    ]));
    let volume = Arc::new(StubVolumeProvider::new(&[
        ("hotel lyon", 5400),
        ("hotel lyon spa", 320),
        ("hotel lyon pas cher", 20),
    ]));

    let analyzer = Analyzer::new(test_config(), hotel_provider())
        .with_generator(generator.clone())
        .with_volume(volume.clone());
    let state = analyzer
        .run(AnalysisState::new(vec!["hotel lyon".to_string()], "fr"))
        .await
        .unwrap();

    assert_eq!(state.stage, Stage::QuestionsGenerated);
    assert_eq!(state.level_counts.get(&1), Some(&2));
    assert_eq!(state.level_counts.get(&2), Some(&2));

    let enrichment = state.enrichment.as_ref().unwrap();
    assert_eq!(volume.calls.load(Ordering::SeqCst), 1);
    assert_eq!(enrichment.keywords_with_volume.len(), 2);
    assert_eq!(enrichment.enriched[0].origin, KeywordOrigin::Original);
    assert_eq!(enrichment.enriched[0].metrics.search_volume, 5400);

    assert_eq!(state.themes[0].name, "Budget");
    assert_eq!(state.questions.len(), 3);
    assert_eq!(state.questions[0].original_text, "Quel hôtel avec spa à Lyon ?");
    assert_eq!(state.questions[0].occurrence_count, 2);

    let prompts = generator.prompts();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("- hotel lyon spa jacuzzi"));
    assert!(prompts[1].contains("\"Budget\""));
}

#[tokio::test]
async fn volume_failure_does_not_stop_the_run() {
    let generator = Arc::new(StubGenerator::new(vec![Some(THEMES_ANSWER)]));
    let mut config = test_config();
    config.analysis.generate_questions = false;

    let analyzer = Analyzer::new(config, hotel_provider())
        .with_generator(generator)
        .with_volume(Arc::new(StubVolumeProvider::failing()));
    let state = analyzer
        .run(AnalysisState::new(vec!["hotel lyon".to_string()], "fr"))
        .await
        .unwrap();

    assert!(state.enrichment.is_none());
    assert_eq!(state.stage, Stage::ThemesAnalyzed);
    assert_eq!(state.themes.len(), 2);
}

#[tokio::test]
async fn unreadable_theme_answer_leaves_no_themes() {
    let generator = Arc::new(StubGenerator::new(vec![Some("Désolé, je ne peux pas.")]));
    let analyzer = Analyzer::new(test_config(), hotel_provider()).with_generator(generator);

    let state = analyzer
        .collect(AnalysisState::new(vec!["hotel lyon".to_string()], "fr"))
        .await
        .unwrap();
    let state = analyzer.analyze_themes(state).await.unwrap();

    assert_eq!(state.stage, Stage::ThemesAnalyzed);
    assert!(state.themes.is_empty());

    let state = analyzer.generate_questions(state).await.unwrap();
    assert!(state.questions.is_empty());
}

#[tokio::test]
async fn selected_themes_limit_question_generation() {
    let only = questions_json(&[("Quel hôtel avec spa à Lyon ?", "hotel lyon spa")]);
    let generator = Arc::new(StubGenerator::new(vec![Some(THEMES_ANSWER), Some(only.as_str())]));

    let analyzer = Analyzer::new(test_config(), hotel_provider()).with_generator(generator.clone());
    let state = AnalysisState::new(vec!["hotel lyon".to_string()], "fr")
        .with_selected_themes(vec!["bien-être".to_string()]);
    let state = analyzer.run(state).await.unwrap();

    assert_eq!(state.question_yields.len(), 1);
    assert_eq!(state.question_yields[0].theme, "Bien-être");
    assert_eq!(state.question_yields[0].allocated, 4);
    assert_eq!(generator.prompts().len(), 2);
}

#[tokio::test]
async fn steps_refuse_to_run_out_of_order() {
    let analyzer = Analyzer::new(test_config(), hotel_provider())
        .with_generator(Arc::new(StubGenerator::new(vec![])));
    let fresh = AnalysisState::new(vec!["hotel lyon".to_string()], "fr");

    let err = analyzer.generate_questions(fresh.clone()).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotReady { stage: Stage::Empty, .. }));

    let err = analyzer.analyze_themes(fresh).await.unwrap_err();
    assert!(matches!(err, PipelineError::NotReady { .. }));
}

#[tokio::test]
async fn run_without_llm_stops_after_collection() {
    let analyzer = Analyzer::new(test_config(), hotel_provider());
    let state = analyzer
        .run(AnalysisState::new(vec!["hotel lyon".to_string()], "fr"))
        .await
        .unwrap();

    assert_eq!(state.stage, Stage::SuggestionsCollected);
    assert_eq!(state.suggestion_count(), 4);
}

#[tokio::test]
async fn run_with_no_data_is_an_error() {
    let analyzer = Analyzer::new(test_config(), Arc::new(StubSuggestProvider::new()));
    let err = analyzer
        .run(AnalysisState::new(vec!["introuvable".to_string()], "fr"))
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Collect(_)));
}

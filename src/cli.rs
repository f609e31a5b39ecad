use crate::config::{self, Config};
use crate::export::Exporter;
use crate::llm::client_for_station;
use crate::pipeline::Analyzer;
use crate::state::AnalysisState;
use crate::suggest::providers::GoogleSuggestProvider;
use crate::suggest::FixedDelay;
use crate::volume::{DataForSeoClient, VolumeProvider};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

/// keyquest - autocomplete crawler and conversational question planner
#[derive(Parser)]
#[command(name = "keyquest")]
#[command(about = "Collect search suggestions and turn them into conversational questions")]
#[command(version)]
struct Cli {
    /// Config file to use instead of ~/.config/keyquest/config.toml
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl autocomplete suggestions for seed keywords
    Collect(CollectArgs),
    /// Crawl, then group suggestions into themes and generate questions
    Analyze(AnalyzeArgs),
    /// Show the configuration
    Config(ConfigArgs),
}

#[derive(Args)]
struct CollectArgs {
    /// Seed keywords
    #[arg(required = true, value_name = "KEYWORD")]
    seeds: Vec<String>,

    /// Language code sent to the suggestion endpoint
    #[arg(short, long)]
    lang: Option<String>,

    /// Suggestions per call at levels 1,2,3 (0 disables a level)
    #[arg(long, value_delimiter = ',', num_args = 1..=3, value_name = "N,N,N")]
    levels: Option<Vec<usize>>,

    /// Calls in flight per level
    #[arg(long)]
    concurrency: Option<usize>,

    /// Pause after each suggestion call, in milliseconds
    #[arg(long, value_name = "MS")]
    delay_ms: Option<u64>,

    /// Also query question prefixes and suffix variants of each seed
    #[arg(long)]
    modifiers: bool,

    /// Fetch search volumes (requires volume credentials in the config)
    #[arg(long)]
    volume: bool,

    /// Directory for export files
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Print results without writing export files
    #[arg(long)]
    no_export: bool,
}

#[derive(Args)]
struct AnalyzeArgs {
    #[command(flatten)]
    collect: CollectArgs,

    /// LLM station id from the config
    #[arg(short, long)]
    station: Option<String>,

    /// Number of questions to keep
    #[arg(short, long)]
    questions: Option<usize>,

    /// Only generate questions for these themes (comma-separated names)
    #[arg(long, value_delimiter = ',', value_name = "NAMES")]
    themes: Option<Vec<String>>,

    /// Stop after theme analysis
    #[arg(long)]
    no_questions: bool,
}

#[derive(Args)]
struct ConfigArgs {
    /// Print only the config file path
    #[arg(long)]
    path: bool,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => config::load_config_from(path)?,
        None => config::load_or_create_config()?,
    };

    match cli.command {
        Commands::Config(args) => show_config(&cli.config, &config, &args),
        Commands::Collect(args) => {
            apply_collect_args(&mut config, &args);
            let _guard = crate::logging::init(&config)?;
            let analyzer = build_analyzer(config, args.volume)?;
            let state = analyzer
                .collect(AnalysisState::new(args.seeds.clone(), language(&analyzer, &args)))
                .await?;
            let state = analyzer.enrich(state).await?;
            finish(&analyzer, &state, &args)
        }
        Commands::Analyze(args) => {
            apply_collect_args(&mut config, &args.collect);
            if let Some(count) = args.questions {
                config.analysis.final_questions_count = count;
            }
            if args.no_questions {
                config.analysis.generate_questions = false;
            }
            let _guard = crate::logging::init(&config)?;

            let station = config
                .station(args.station.as_deref())
                .cloned()
                .with_context(|| {
                    format!(
                        "Unknown station '{}'",
                        args.station.as_deref().unwrap_or(&config.default_station)
                    )
                })?;
            let generator = client_for_station(&station)?;

            let analyzer = build_analyzer(config, args.collect.volume)?.with_generator(generator);
            let mut state =
                AnalysisState::new(args.collect.seeds.clone(), language(&analyzer, &args.collect));
            if let Some(names) = args.themes.clone() {
                state = state.with_selected_themes(names);
            }

            let state = analyzer.run(state).await?;
            finish(&analyzer, &state, &args.collect)
        }
    }
}

fn language(analyzer: &Analyzer, args: &CollectArgs) -> String {
    args.lang
        .clone()
        .unwrap_or_else(|| analyzer.config().suggest.language.clone())
}

fn apply_collect_args(config: &mut Config, args: &CollectArgs) {
    if let Some(levels) = &args.levels {
        let mut counts = [0usize; 3];
        for (slot, value) in counts.iter_mut().zip(levels) {
            *slot = *value;
        }
        config.suggest.level_counts = counts;
    }
    if let Some(concurrency) = args.concurrency {
        config.suggest.concurrency = concurrency;
    }
    if let Some(delay_ms) = args.delay_ms {
        config.suggest.delay_ms = delay_ms;
    }
    if args.modifiers {
        config.modifiers.enabled = true;
    }
    if let Some(dir) = &args.output {
        config.export_dir = dir.display().to_string();
    }
}

fn build_analyzer(config: Config, with_volume: bool) -> Result<Analyzer> {
    let provider = GoogleSuggestProvider::from_settings(&config.suggest)
        .context("Failed to create suggestion client")?;
    let pacer = Arc::new(FixedDelay(config.suggest.delay()));

    let volume: Option<Arc<dyn VolumeProvider>> = if with_volume || config.volume.enabled {
        if config.volume.is_configured() {
            Some(Arc::new(
                DataForSeoClient::from_settings(&config.volume)
                    .context("Failed to create volume client")?,
            ))
        } else {
            tracing::warn!("volume enrichment requested but login/password are not set");
            None
        }
    } else {
        None
    };

    let mut analyzer = Analyzer::new(config, Arc::new(provider)).with_pacer(pacer);
    if let Some(volume) = volume {
        analyzer = analyzer.with_volume(volume);
    }
    Ok(analyzer)
}

fn finish(analyzer: &Analyzer, state: &AnalysisState, args: &CollectArgs) -> Result<()> {
    print_summary(state);

    if args.no_export {
        return Ok(());
    }
    let exporter = Exporter::new(&analyzer.config().export_dir);
    for path in exporter.write_all(state)? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn print_summary(state: &AnalysisState) {
    println!(
        "{} suggestions for {} (stage: {})",
        state.suggestion_count(),
        state.seeds.join(", "),
        state.stage
    );
    for (level, count) in &state.level_counts {
        println!("  level {level}: {count}");
    }

    if let Some(enrichment) = &state.enrichment {
        println!(
            "{} keywords with volume data, {} above the minimum",
            enrichment.volume_data.len(),
            enrichment.keywords_with_volume.len()
        );
    }

    if !state.themes.is_empty() {
        println!("\nThemes:");
        for theme in &state.themes {
            println!("  [{}] {} ({})", theme.importance, theme.name, theme.intent);
        }
    }

    if !state.questions.is_empty() {
        println!("\nQuestions:");
        for (i, item) in state.questions.iter().enumerate() {
            println!(
                "{:>3}. {} (x{}, {} keyword(s))",
                i + 1,
                item.original_text,
                item.occurrence_count,
                item.source_keywords.len()
            );
        }
    }
}

fn show_config(explicit: &Option<PathBuf>, config: &Config, args: &ConfigArgs) -> Result<()> {
    let path = match explicit {
        Some(path) => path.clone(),
        None => config::config_path()?,
    };
    if args.path {
        println!("{}", path.display());
        return Ok(());
    }

    let mut shown = config.clone();
    for station in &mut shown.stations {
        if !station.has_placeholder_key() {
            station.api_key = "***".to_string();
        }
    }
    if !shown.volume.password.is_empty() {
        shown.volume.password = "***".to_string();
    }

    println!("# {}", path.display());
    print!("{}", toml::to_string_pretty(&shown).context("Failed to serialize config")?);
    Ok(())
}

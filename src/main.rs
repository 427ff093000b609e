use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};

use tempo_consensus::{
    analyzers::{AnalyzerRegistry, CommandAnalyzer, TempoAnalyzer},
    config::Config,
    consensus::ConsensusEngine,
    orchestrator::Orchestrator,
};

#[derive(Parser)]
#[command(
    name = "tempo-consensus",
    version,
    about = "Detect the tempo of an audio file with multi-analyzer consensus",
    long_about = "Tempo-Consensus runs several independent tempo analyzers against the same audio file, rejects outliers such as octave errors, and reports a fused BPM with a calibrated 0-100 confidence score."
)]
struct Cli {
    /// Audio file path (WAV, MP3, FLAC, OGG, M4A, AAC)
    audio: PathBuf,

    /// Built-in analyzers to run (comma-separated; default: all)
    #[arg(short, long, value_delimiter = ',')]
    analyzers: Option<Vec<String>>,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full metadata payload as JSON
    #[arg(short, long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .init();

    info!("Starting tempo-consensus v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = match cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(&config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };
    config.validate()?;

    // Assemble the analyzer set: built-ins from the registry plus any
    // externally installed tools from the configuration
    let registry = AnalyzerRegistry::with_config(config.analysis.clone());
    let requested = match &cli.analyzers {
        Some(names) => names.clone(),
        None => {
            let mut names = registry.available_analyzers();
            names.sort();
            names
        }
    };

    let mut analyzers: Vec<Arc<dyn TempoAnalyzer>> = Vec::new();
    for name in &requested {
        let analyzer = registry
            .get_analyzer(name)
            .ok_or_else(|| anyhow::anyhow!("Unknown analyzer: {}", name))?;
        analyzers.push(analyzer);
    }
    for external in &config.orchestrator.external_analyzers {
        analyzers.push(Arc::new(CommandAnalyzer::from_config(external)));
    }

    info!("Analyzers: {}", requested.join(", "));

    // Build the pipeline and run it
    let engine = ConsensusEngine::new(config.consensus)?;
    let orchestrator =
        Orchestrator::new(config.orchestrator, engine).with_analyzers(analyzers);

    let result = orchestrator.analyze_file(&cli.audio).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result.metadata_payload())?);
    } else if result.has_tempo() {
        println!(
            "{:.1} BPM  confidence {}/100  agreement {}  ({} of {} estimates used)",
            result.bpm,
            result.confidence,
            result.agreement_level,
            result.num_algorithms,
            result.all_estimates.len(),
        );
        for outlier in &result.outliers_removed {
            println!(
                "  outlier rejected: {} reported {:.1} BPM",
                outlier.analyzer, outlier.bpm
            );
        }
    } else {
        println!("No tempo could be determined");
    }

    Ok(())
}

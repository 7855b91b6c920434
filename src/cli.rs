//
// cli.rs
// Ecg-Dicom-Prep
//
// Defines the CLI surface with Clap, builds the run configuration and dispatches to the pipeline.
//
// Thales Matheus Mendonça Santos - November 2025

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Backend, ColorMode, PipelineConfig};
use crate::discovery::{self, DiscoveredFile};
use crate::error::PipelineError;
use crate::inspect;
use crate::models::{OutcomeStatus, RunReport};
use crate::pipeline::{Mode, Pipeline};
use crate::raster::RasterizerChain;

/// Command-line interface glue code: defines the available verbs and dispatches to modules.
#[derive(Parser)]
#[command(name = "ecg-dicom-prep")]
#[command(about = "Converte laudos de ECG em DICOM para PNGs anonimizados prontos para IA", long_about = None)]
pub struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Full pipeline: anonymized DICOM, original/redacted PNGs and AI-ready artifacts
    Process {
        #[command(flatten)]
        run: RunArgs,
        #[command(flatten)]
        ai: AiArgs,
    },
    /// Redaction only: one anonymized PNG per DICOM
    Redact {
        #[command(flatten)]
        run: RunArgs,
    },
    /// Show what a DICOM file contains (patient basics, pixel data, waveform, embedded document)
    Inspect { file: PathBuf },
    /// Report which PDF rasterization backends are usable
    Backends {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[arg(short, long, default_value = "pasta_com_dicoms")]
    pub input: PathBuf,
    #[arg(short, long, default_value = "dataset_processado")]
    pub output: PathBuf,
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Walk subfolders (one folder per patient)
    #[arg(short, long)]
    pub recursive: bool,
    /// Rasterization resolution
    #[arg(long)]
    pub dpi: Option<u32>,
    /// Fraction of the width to black out, in (0, 1]
    #[arg(long)]
    pub redact_width: Option<f32>,
    /// Fraction of the height to black out, in (0, 1]
    #[arg(long)]
    pub redact_height: Option<f32>,
    /// Paint the rectangle without the disclosure text
    #[arg(long)]
    pub no_label: bool,
    /// TrueType font for the disclosure text
    #[arg(long)]
    pub font: Option<PathBuf>,
    /// Rasterizer preference order, e.g. `--backend pdftoppm,pdfium`
    #[arg(long, value_enum, value_delimiter = ',')]
    pub backend: Vec<Backend>,
    /// Also write the run report as JSON
    #[arg(long)]
    pub report: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
pub struct AiArgs {
    /// Minimum accepted DPI (large pages pass regardless)
    #[arg(long)]
    pub min_dpi: Option<u32>,
    /// Side of the square AI canvas
    #[arg(long)]
    pub size: Option<u32>,
    #[arg(long, value_enum)]
    pub color_mode: Option<ColorMode>,
    /// Keep the array as uint8 instead of scaling to [0, 1]
    #[arg(long)]
    pub no_normalize: bool,
    /// Skip writing the anonymized DICOM
    #[arg(long)]
    pub no_dicom: bool,
}

pub fn run() -> anyhow::Result<()> {
    // Parse the raw CLI arguments once and dispatch to a subcommand handler.
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Process { run, ai } => {
            let config = build_config(&run, Some(&ai))?;
            run_batch(config, Mode::Full, &run)?
        }
        Commands::Redact { run } => {
            let config = build_config(&run, None)?;
            run_batch(config, Mode::RedactOnly, &run)?
        }
        Commands::Inspect { file } => inspect::print_info(&file)?,
        Commands::Backends { config } => {
            let config = match config {
                Some(path) => PipelineConfig::from_file(&path)?,
                None => PipelineConfig::default(),
            };
            let chain = RasterizerChain::from_config(&config.backends);
            print_backends(&chain);
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
        .with_target(false)
        .try_init();
}

/// File config (or defaults) with CLI overrides applied, then validated.
pub fn build_config(run: &RunArgs, ai: Option<&AiArgs>) -> anyhow::Result<PipelineConfig> {
    let mut config = match &run.config {
        Some(path) => PipelineConfig::from_file(path)?,
        None => PipelineConfig::default(),
    };

    config.recursive |= run.recursive;
    if let Some(dpi) = run.dpi {
        config.render_dpi = dpi;
    }
    if let Some(width) = run.redact_width {
        config.redaction.width_fraction = width;
    }
    if let Some(height) = run.redact_height {
        config.redaction.height_fraction = height;
    }
    if run.no_label {
        config.redaction.label = None;
    }
    if let Some(font) = &run.font {
        config.redaction.font_path = Some(font.clone());
    }
    if !run.backend.is_empty() {
        config.backends = run.backend.clone();
    }

    if let Some(ai) = ai {
        if let Some(min_dpi) = ai.min_dpi {
            config.min_dpi = min_dpi;
        }
        if let Some(size) = ai.size {
            config.ai.size = (size, size);
        }
        if let Some(mode) = ai.color_mode {
            config.ai.color_mode = mode;
        }
        if ai.no_normalize {
            config.ai.normalize = false;
        }
        if ai.no_dicom {
            config.save_dicom = false;
        }
    }

    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn run_batch(config: PipelineConfig, mode: Mode, run: &RunArgs) -> anyhow::Result<()> {
    print_settings(&config, mode, run);

    let files = match discovery::discover(&run.input, config.recursive) {
        Ok(files) => files,
        Err(e @ PipelineError::NoInputFiles(_)) => {
            print_discovery_help(&run.input, config.recursive);
            return Err(e.into());
        }
        Err(e) => return Err(e.into()),
    };
    println!("\nEncontrados {} arquivo(s) DICOM.", files.len());
    if config.recursive {
        print_subjects(&files);
    }

    let chain = RasterizerChain::from_config(&config.backends);
    let available: Vec<_> = chain
        .backends()
        .filter(|b| b.is_available())
        .map(|b| b.name())
        .collect();
    if available.is_empty() {
        print_backends(&chain);
        bail!("No PDF rasterizer available: install PDFium (or set PDFIUM_DYNAMIC_LIB_PATH) or poppler-utils");
    }
    info!(backends = ?available, "rasterizers available");

    let pipeline = Pipeline::with_rasterizers(config, mode, &run.output, chain);
    pipeline.prepare()?;
    let report = pipeline.run(&files);

    print_summary(&report, &pipeline);
    if let Some(path) = &run.report {
        report.write_json(path)?;
        info!(path = %path.display(), "run report written");
    }
    Ok(())
}

fn print_settings(config: &PipelineConfig, mode: Mode, run: &RunArgs) {
    println!("{}", "=".repeat(80));
    match mode {
        Mode::Full => println!("PROCESSAMENTO COMPLETO DE ECGs (DICOM -> PDF -> PNG -> IA)"),
        Mode::RedactOnly => println!("ANONIMIZADOR DE ECGs (DICOM -> PDF -> PNG anonimizado)"),
    }
    println!("{}", "=".repeat(80));
    println!("  Entrada:            {}", run.input.display());
    println!("  Saída:              {}", run.output.display());
    println!("  DPI de renderização: {}", config.render_dpi);
    println!(
        "  Área anonimizada:   {:.0}% x {:.0}%",
        config.redaction.width_fraction * 100.0,
        config.redaction.height_fraction * 100.0
    );
    if mode == Mode::Full {
        println!("  DPI mínimo:         {}", config.min_dpi);
        println!("  Tamanho IA:         {}x{}", config.ai.size.0, config.ai.size.1);
        println!("  Modo de cor IA:     {:?}", config.ai.color_mode);
        println!(
            "  Normalização:       {}",
            if config.ai.normalize { "Sim (0-1)" } else { "Não" }
        );
    }
}

fn print_discovery_help(input: &Path, recursive: bool) {
    error!(input = %input.display(), "no DICOM files found");
    println!("\nNenhum arquivo DICOM encontrado em '{}'.", input.display());
    if recursive {
        println!("Estrutura esperada:");
        println!("  {}/", input.display());
        println!("  ├── paciente_001/");
        println!("  │   └── ecg.dcm");
        println!("  └── paciente_002/");
        println!("      └── ecg.dcm");
    } else {
        println!(
            "Coloque seus arquivos .dcm em '{}' (ou use --recursive) e execute novamente.",
            input.display()
        );
    }
}

fn print_subjects(files: &[DiscoveredFile]) {
    let subjects: BTreeSet<_> = files.iter().filter_map(|f| f.subject.as_deref()).collect();
    println!("Pastas de pacientes: {}", subjects.len());
    for (i, subject) in subjects.iter().take(5).enumerate() {
        println!("  {}. {}", i + 1, subject);
    }
    if subjects.len() > 5 {
        println!("  ... e mais {} pastas", subjects.len() - 5);
    }
}

fn print_backends(chain: &RasterizerChain) {
    println!("Rasterizadores (ordem de preferência):");
    for (i, backend) in chain.backends().enumerate() {
        let status = if backend.is_available() { "disponível" } else { "indisponível" };
        println!("  {}. {:<10} {}", i + 1, backend.name(), status);
    }
}

fn print_summary(report: &RunReport, pipeline: &Pipeline) {
    println!("{}", "=".repeat(80));
    println!("PROCESSAMENTO CONCLUÍDO!");
    println!("{}", "=".repeat(80));
    println!("  Total de arquivos: {}", report.total());
    println!("  Sucesso:           {}", report.successes());
    println!("  Falhas:            {}", report.failures());
    let skipped = report.count(OutcomeStatus::Skipped);
    if skipped > 0 {
        println!("    (sem PDF embutido: {})", skipped);
    }

    for outcome in report.outcomes.iter().filter(|o| o.status != OutcomeStatus::Success) {
        println!(
            "  - {} [{}]: {}",
            outcome.file,
            outcome.anon_id,
            outcome.message.as_deref().unwrap_or("erro desconhecido")
        );
    }

    if report.successes() > 0 {
        println!("\nArquivos gerados em {}:", pipeline.output().root().display());
        let dirs: BTreeSet<&Path> = pipeline
            .mode()
            .artifacts(true)
            .into_iter()
            .map(|artifact| pipeline.output().dir_for(artifact))
            .collect();
        for dir in dirs {
            println!("  {}", dir.display());
        }
    }
    if report.failures() > 0 {
        warn!(failures = report.failures(), "some files were not converted; see log above");
    }
}

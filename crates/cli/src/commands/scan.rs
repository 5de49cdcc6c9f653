//! The scan command: load a project model, run the engine, render findings.
//!
//! The model is the JSON serialization of the engine's `ProjectModel`, as
//! produced by the host front end. An AndroidManifest.xml can be supplied
//! separately and takes the place of the first module's manifest, which
//! keeps fixtures simple when the front end emits code-only models.

use anyhow::{bail, Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use droidlint_engine::{
    AnalysisEngine, AnalysisReport, DetectorKind, EngineConfig, ManifestModel, ProjectModel,
    Severity,
};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Args)]
pub struct ScanArgs {
    /// Project model JSON file, or a directory scanned for *.json models
    #[arg(short, long)]
    pub model: PathBuf,

    /// AndroidManifest.xml overriding the first module's manifest
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Run only the named detectors (repeatable)
    #[arg(short, long = "detector")]
    pub detectors: Vec<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Console)]
    pub format: OutputFormat,

    /// Analyze files one at a time instead of in parallel
    #[arg(long)]
    pub sequential: bool,

    /// Keep duplicate diagnostics instead of collapsing them
    #[arg(long)]
    pub no_dedup: bool,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum OutputFormat {
    Console,
    Json,
}

pub fn execute(args: &ScanArgs) -> Result<()> {
    let config = build_config(args)?;
    let engine = AnalysisEngine::new(config);

    let models = model_paths(&args.model)?;
    if models.is_empty() {
        bail!("no model files found under {}", args.model.display());
    }

    let mut total_errors = 0usize;
    for path in &models {
        let project = load_project(path, args.manifest.as_deref())?;
        let report = engine
            .run(&project)
            .with_context(|| format!("analysis failed for {}", path.display()))?;
        total_errors += report.count_by_severity(Severity::Error);
        match args.format {
            OutputFormat::Json => println!("{}", report.to_json()?),
            OutputFormat::Console => render_console(path, &report),
        }
    }

    if total_errors > 0 {
        std::process::exit(1);
    }
    Ok(())
}

fn build_config(args: &ScanArgs) -> Result<EngineConfig> {
    let mut config = EngineConfig {
        parallel_execution: !args.sequential,
        deduplication_enabled: !args.no_dedup,
        enabled_detectors: Vec::new(),
    };
    for id in &args.detectors {
        config.enabled_detectors.push(DetectorKind::from_id(id)?);
    }
    Ok(config)
}

fn model_paths(input: &Path) -> Result<Vec<PathBuf>> {
    if input.is_file() {
        return Ok(vec![input.to_path_buf()]);
    }
    if !input.is_dir() {
        bail!("input path does not exist: {}", input.display());
    }
    let mut paths: Vec<PathBuf> = WalkDir::new(input)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .collect();
    paths.sort();
    Ok(paths)
}

fn load_project(model_path: &Path, manifest_path: Option<&Path>) -> Result<ProjectModel> {
    let raw = fs::read_to_string(model_path)
        .with_context(|| format!("failed to read model: {}", model_path.display()))?;
    let mut project: ProjectModel = serde_json::from_str(&raw)
        .with_context(|| format!("malformed project model: {}", model_path.display()))?;
    tracing::debug!(
        model = %model_path.display(),
        modules = project.modules.len(),
        "loaded project model"
    );

    if let Some(manifest_path) = manifest_path {
        let xml = fs::read_to_string(manifest_path)
            .with_context(|| format!("failed to read manifest: {}", manifest_path.display()))?;
        let manifest = ManifestModel::parse(&xml)
            .with_context(|| format!("malformed manifest: {}", manifest_path.display()))?;
        tracing::debug!(manifest = %manifest_path.display(), "manifest override applied");
        match project.modules.first_mut() {
            Some(module) => module.manifest = manifest,
            None => bail!("project model has no modules"),
        }
    }
    Ok(project)
}

fn severity_label(severity: Severity) -> colored::ColoredString {
    match severity {
        Severity::Error => "error".red().bold(),
        Severity::Warning => "warning".yellow().bold(),
        Severity::Informational => "info".blue().bold(),
    }
}

fn render_console(path: &Path, report: &AnalysisReport) {
    println!("{} {}", "Scanning".green().bold(), path.display());

    for d in &report.diagnostics {
        println!(
            "{}:{}:{}: {} [{}] {}",
            d.location.file,
            d.location.line,
            d.location.column,
            severity_label(d.severity),
            d.rule.cyan(),
            d.message
        );
        for fix in &d.fixes {
            println!("    {} {}: {}", "fix:".green(), fix.name, fix.replacement);
        }
    }

    let errors = report.count_by_severity(Severity::Error);
    let warnings = report.count_by_severity(Severity::Warning);
    let mut summary = format!("{} errors, {} warnings", errors, warnings);
    if let Some(stats) = report.dedup_stats {
        if stats.removed_count > 0 {
            summary.push_str(&format!(" ({} duplicates removed)", stats.removed_count));
        }
    }
    if report.detector_errors > 0 {
        summary.push_str(&format!(
            ", {} detector failures ignored",
            report.detector_errors
        ));
    }
    println!("{} {}", "Done:".green().bold(), summary);
}

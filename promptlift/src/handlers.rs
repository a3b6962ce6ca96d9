use crate::translate::{Capabilities, TranslationDirection, TranslatorEngine, translate_all};
use anyhow::Context;
use clap::ArgMatches;
use colored::Colorize;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use promptlift_core::report::{
    BatchSummary, ReportData, ReportFormat, default_report_name, generate_report, prompt_texts,
    save_report,
};
use promptlift_core::{ExtractError, ExtractionMethod, ExtractionResult, extract};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use walkdir::WalkDir;

/// Outcome of one file in a batch: its result or the file-level error.
pub type FileOutcome = Result<ExtractionResult, ExtractError>;

/// Called after each file with (completed, total, path).
pub type ProgressCallback = Arc<dyn Fn(usize, usize, &Path) + Send + Sync>;

// Helper functions for the extract handler

pub fn is_png_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}

/// Expand the command-line inputs into PNG files. Directories are searched
/// recursively; duplicates keep their first position.
pub fn collect_png_files<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>, String> {
    let mut seen = HashSet::new();
    let mut files = Vec::new();

    for input in inputs {
        let expanded = shellexpand::tilde(input.as_ref());
        let path = PathBuf::from(expanded.as_ref());

        let found: Vec<PathBuf> = if path.is_dir() {
            WalkDir::new(&path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|entry| match entry {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        warn!("Skipping unreadable entry under {}: {}", path.display(), e);
                        None
                    }
                })
                .filter(|entry| entry.file_type().is_file() && is_png_path(entry.path()))
                .map(|entry| entry.into_path())
                .collect()
        } else if path.is_file() && is_png_path(&path) {
            vec![path]
        } else {
            eprintln!("⚠️  Skipping '{}': not a PNG file or directory", input.as_ref());
            continue;
        };

        for file in found {
            if seen.insert(file.clone()) {
                files.push(file);
            }
        }
    }

    if files.is_empty() {
        return Err("No valid PNG files found".to_string());
    }

    debug!("Collected {} PNG file(s)", files.len());
    Ok(files)
}

/// Run the extractor over every file on the blocking pool, at most `workers`
/// at a time. Outcomes come back in input order.
pub async fn process_files(
    paths: Vec<PathBuf>,
    method: ExtractionMethod,
    workers: usize,
    progress: Option<ProgressCallback>,
) -> Vec<FileOutcome> {
    let total = paths.len();
    let completed = Arc::new(AtomicUsize::new(0));

    stream::iter(paths)
        .map(|path| {
            let progress = progress.clone();
            let completed = completed.clone();
            tokio::task::spawn_blocking(move || {
                let outcome = extract(&path, method);
                let done = completed.fetch_add(1, Ordering::SeqCst) + 1;
                if let Some(callback) = progress {
                    callback(done, total, &path);
                }
                outcome
            })
        })
        .buffered(workers.max(1))
        .map(|joined| match joined {
            Ok(outcome) => outcome,
            Err(e) => std::panic::resume_unwind(e.into_panic()),
        })
        .collect()
        .await
}

/// Prompts of every file, with headings when there is more than one file or
/// prompt. `texts` is the flat (possibly translated) prompt list.
pub fn render_results(results: &[ExtractionResult], texts: &[String]) -> String {
    let mut out = String::new();
    let multi_file = results.len() > 1;
    let mut texts = texts.iter();

    for (i, result) in results.iter().enumerate() {
        if multi_file {
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!(
                "{}\n",
                format!("=== {} [{}] ===", result.file.filename, result.method)
                    .bright_blue()
                    .bold()
            ));
        }

        if !result.has_prompts() {
            if multi_file {
                out.push_str(&format!("{}\n", "(no positive prompts found)".dimmed()));
            }
            continue;
        }

        for (j, candidate) in result.prompts.iter().enumerate() {
            let text = texts.next().map(String::as_str).unwrap_or(candidate.text.as_str());
            if result.prompts.len() > 1 {
                if j > 0 {
                    out.push('\n');
                }
                out.push_str(&format!(
                    "{}\n",
                    format!("Prompt {} - {}:", j + 1, candidate.title).cyan().bold()
                ));
            }
            out.push_str(text);
            out.push('\n');
        }
    }

    out
}

pub fn render_summary(
    summary: &BatchSummary,
    results: &[ExtractionResult],
    method: ExtractionMethod,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", "═".repeat(60).bright_blue().bold()));
    out.push_str(&format!("{}\n", "  EXTRACTION SUMMARY".bright_white().bold()));
    out.push_str(&format!("{}\n", "═".repeat(60).bright_blue().bold()));
    out.push_str(&format!("  Mode: {}\n", method.to_string().bright_white()));
    out.push_str(&format!("  Files processed: {}\n", summary.files_processed));
    out.push_str(&format!("  Files with prompts: {}\n", summary.files_with_prompts));
    out.push_str(&format!("  Total prompts: {}\n", summary.total_prompts));
    if summary.files_failed > 0 {
        out.push_str(&format!(
            "  {}\n",
            format!("Files failed: {}", summary.files_failed).red()
        ));
    }

    if summary.total_prompts == 0 {
        out.push_str(&format!(
            "\n{} No positive prompts found. Try {}.\n",
            "ℹ".blue(),
            format!("--mode {}", method.other()).bright_white()
        ));
        return out;
    }

    out.push('\n');
    for result in results.iter().filter(|r| r.has_prompts()) {
        out.push_str(&format!(
            "  {} {} ({} prompt{})\n",
            "✓".green().bold(),
            result.file.filename,
            result.prompts.len(),
            if result.prompts.len() == 1 { "" } else { "s" }
        ));
    }

    out
}

/// `--raw` payload: prompt texts separated by a blank line.
pub fn render_raw(texts: &[String]) -> String {
    texts.join("\n\n")
}

/// Where to write the report: into `output` if it is a directory, else to
/// `output` itself.
pub fn resolve_report_path(
    output: &Path,
    results: &[ExtractionResult],
    translation: Option<&str>,
    format: ReportFormat,
) -> PathBuf {
    if output.is_dir() {
        output.join(default_report_name(results, translation, format))
    } else {
        output.to_path_buf()
    }
}

pub fn export_report(
    output: &Path,
    data: &ReportData,
    format: ReportFormat,
) -> anyhow::Result<PathBuf> {
    let path = resolve_report_path(output, &data.results, data.translation.as_deref(), format);
    let content = generate_report(data, format).context("Failed to serialize report")?;
    save_report(&content, &path)
        .with_context(|| format!("Failed to write report to {}", path.display()))?;
    Ok(path)
}

fn build_capabilities(
    sub_matches: &ArgMatches,
    direction: Option<&TranslationDirection>,
) -> anyhow::Result<Capabilities> {
    if direction.is_none() {
        return Ok(Capabilities::none());
    }

    let engine_name = sub_matches
        .get_one::<String>("engine")
        .map(String::as_str)
        .unwrap_or("libretranslate");
    let engine = TranslatorEngine::from_str(engine_name)
        .with_context(|| format!("Unknown translation engine '{}'", engine_name))?;
    let base_url = sub_matches.get_one::<Url>("translator-url").cloned();
    let api_key = sub_matches.get_one::<String>("api-key").cloned();

    let translator = engine
        .build(base_url, api_key)
        .context("Failed to set up translator")?;
    info!("Translating with {}", translator.name());
    Ok(Capabilities::with_translator(translator))
}

fn progress_spinner(total: usize) -> ProgressBar {
    let spinner = ProgressBar::new(total as u64);
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} [{pos}/{len}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

pub async fn handle_extract(sub_matches: &ArgMatches, quiet: bool) {
    let inputs: Vec<String> = sub_matches
        .get_many::<String>("PATHS")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let mode = sub_matches
        .get_one::<String>("mode")
        .map(String::as_str)
        .unwrap_or("graph");
    let Some(method) = ExtractionMethod::from_str(mode) else {
        eprintln!("{} Unknown extraction mode '{}'", "✗".red().bold(), mode);
        std::process::exit(1);
    };
    let threads = *sub_matches.get_one::<usize>("threads").unwrap_or(&4);
    let first_only = sub_matches.get_flag("first");
    let raw = sub_matches.get_flag("raw");
    let format = sub_matches
        .get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text);
    let output = sub_matches
        .get_one::<String>("output")
        .map(|o| PathBuf::from(shellexpand::tilde(o).as_ref()));

    let direction = match sub_matches.get_one::<String>("translate") {
        Some(s) => match TranslationDirection::parse(s) {
            Ok(direction) => Some(direction),
            Err(e) => {
                eprintln!("{} {}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        },
        None => None,
    };

    let capabilities = match build_capabilities(sub_matches, direction.as_ref()) {
        Ok(capabilities) => capabilities,
        Err(e) => {
            eprintln!("{} {:#}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let files = match collect_png_files(&inputs) {
        Ok(files) => files,
        Err(e) => {
            eprintln!("{} {}", "✗".red().bold(), e);
            std::process::exit(1);
        }
    };

    let spinner = (!quiet && !raw && !first_only).then(|| progress_spinner(files.len()));
    let progress: Option<ProgressCallback> = spinner.clone().map(|bar| {
        Arc::new(move |done: usize, _total: usize, path: &Path| {
            bar.set_position(done as u64);
            bar.set_message(
                path.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            );
        }) as ProgressCallback
    });

    let outcomes = process_files(files, method, threads, progress).await;

    if let Some(ref bar) = spinner {
        bar.finish_and_clear();
    }

    let summary = BatchSummary::from_outcomes(&outcomes);
    let mut results = Vec::with_capacity(outcomes.len());
    for outcome in outcomes {
        match outcome {
            Ok(result) => {
                for warning in &result.warnings {
                    eprintln!(
                        "{} {}: {}",
                        "⚠".yellow().bold(),
                        result.file.filename,
                        warning
                    );
                }
                results.push(result);
            }
            Err(e) => eprintln!("{} {}", "✗".red().bold(), e),
        }
    }

    let mut texts = prompt_texts(&results);
    if let (Some(translator), Some(direction)) = (&capabilities.translator, &direction) {
        if !texts.is_empty() {
            if !quiet {
                eprintln!(
                    "{} Translating {} prompt(s) {}",
                    "→".blue(),
                    texts.len(),
                    direction.label()
                );
            }
            texts = translate_all(translator.as_ref(), &texts, direction).await;
        }
    }

    if first_only {
        match texts.first() {
            Some(text) => println!("{}", text),
            None => {
                eprintln!("{} No positive prompts found", "✗".red().bold());
                std::process::exit(1);
            }
        }
    } else if raw {
        if !texts.is_empty() {
            println!("{}", render_raw(&texts));
        }
    } else {
        let rendered = render_results(&results, &texts);
        if !rendered.is_empty() {
            print!("{}", rendered);
            println!();
        }
        print!("{}", render_summary(&summary, &results, method));
    }

    if let Some(output) = output {
        let data = ReportData::new(method, &results, texts, direction.as_ref().map(|d| d.label()))
            .with_files_failed(summary.files_failed);
        match export_report(&output, &data, format) {
            Ok(path) => {
                if !quiet {
                    eprintln!("{} Report saved to {}", "✓".green().bold(), path.display());
                }
            }
            Err(e) => {
                eprintln!("{} {:#}", "✗".red().bold(), e);
                std::process::exit(1);
            }
        }
    }

    if results.is_empty() && summary.files_failed > 0 {
        std::process::exit(1);
    }
}

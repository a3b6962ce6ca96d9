// Batch summaries and exported prompt reports

use crate::error::ExtractError;
use crate::model::{ExtractionMethod, ExtractionResult, PromptCandidate};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const RULE: &str = "============================================================";
const THIN_RULE: &str = "------------------------------------------------------------";
const PROMPT_RULE: &str = "----------------------------------------";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Json => "json",
            ReportFormat::Markdown => "md",
        }
    }
}

/// Counts shown after a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub files_processed: usize,
    pub files_with_prompts: usize,
    pub total_prompts: usize,
    pub files_failed: usize,
}

impl BatchSummary {
    pub fn new(results: &[ExtractionResult], files_failed: usize) -> Self {
        Self {
            files_processed: results.len() + files_failed,
            files_with_prompts: results.iter().filter(|r| r.has_prompts()).count(),
            total_prompts: results.iter().map(|r| r.prompts.len()).sum(),
            files_failed,
        }
    }

    pub fn from_outcomes(outcomes: &[Result<ExtractionResult, ExtractError>]) -> Self {
        let results: Vec<ExtractionResult> =
            outcomes.iter().filter_map(|o| o.as_ref().ok()).cloned().collect();
        let failed = outcomes.iter().filter(|o| o.is_err()).count();
        Self::new(&results, failed)
    }
}

/// Every prompt text of the batch, in file order then discovery order.
pub fn prompt_texts(results: &[ExtractionResult]) -> Vec<String> {
    results
        .iter()
        .flat_map(|r| r.prompts.iter().map(|p| p.text.clone()))
        .collect()
}

/// Default export file name: `<stem>_prompts.txt` for one file,
/// `extracted_prompts.txt` otherwise, tagged with the translation direction.
pub fn default_report_name(
    results: &[ExtractionResult],
    translation: Option<&str>,
    format: ReportFormat,
) -> String {
    let base = match results {
        [single] => {
            let stem = Path::new(&single.file.filename)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "extracted".to_string());
            format!("{stem}_prompts")
        }
        _ => "extracted_prompts".to_string(),
    };

    match translation {
        Some(direction) => format!(
            "{}_{}.{}",
            base,
            direction.replace('→', "_to_"),
            format.extension()
        ),
        None => format!("{}.{}", base, format.extension()),
    }
}

/// Everything an export needs. `texts` is the flat prompt list, which may
/// have been translated and so can differ from the candidates' own text.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub method: ExtractionMethod,
    pub results: Vec<ExtractionResult>,
    pub texts: Vec<String>,
    pub translation: Option<String>,
    /// Files of the batch that could not be read at all.
    pub files_failed: usize,
    pub generated_at: DateTime<Local>,
}

impl ReportData {
    pub fn new(
        method: ExtractionMethod,
        results: &[ExtractionResult],
        texts: Vec<String>,
        translation: Option<String>,
    ) -> Self {
        Self {
            method,
            results: results.to_vec(),
            texts,
            translation,
            files_failed: 0,
            generated_at: Local::now(),
        }
    }

    pub fn with_files_failed(mut self, files_failed: usize) -> Self {
        self.files_failed = files_failed;
        self
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary::new(&self.results, self.files_failed)
    }

    /// Files that produced prompts, each paired with the text to print for
    /// every candidate. Missing texts fall back to the candidate's own.
    fn files_with_texts(&self) -> Vec<(&ExtractionResult, Vec<(&PromptCandidate, &str)>)> {
        let mut texts = self.texts.iter();
        self.results
            .iter()
            .filter(|r| r.has_prompts())
            .map(|result| {
                let prompts: Vec<_> = result
                    .prompts
                    .iter()
                    .map(|p| (p, texts.next().map(String::as_str).unwrap_or(p.text.as_str())))
                    .collect();
                (result, prompts)
            })
            .collect()
    }
}

pub fn generate_text_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str(RULE);
    report.push_str("\nPROMPTLIFT POSITIVE PROMPTS EXTRACTION\n");
    report.push_str(RULE);
    report.push_str("\n\n");

    report.push_str(&format!("Extractor mode: {}\n", data.method));
    report.push_str(&format!("Files processed: {}\n", data.summary().files_processed));
    report.push_str(&format!("Total prompts: {}\n", data.texts.len()));
    if let Some(ref direction) = data.translation {
        report.push_str(&format!("Translation: {}\n", direction));
    }
    report.push_str(&format!(
        "Extraction date: {}\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));
    report.push('\n');
    report.push_str(RULE);
    report.push_str("\n\n");

    let multi_file = data.results.len() > 1;
    let files = data.files_with_texts();

    for (i, (result, prompts)) in files.iter().enumerate() {
        if multi_file {
            report.push_str(&format!("FILE: {}\n", result.file.filename));
            report.push_str(&format!("Method: {}\n", result.method));
            report.push_str(&format!("Size: ({}, {})\n", result.file.width, result.file.height));
            report.push_str(THIN_RULE);
            report.push_str("\n\n");
        }

        for (j, (candidate, text)) in prompts.iter().enumerate() {
            if prompts.len() > 1 {
                report.push_str(&format!("Prompt {} - {}:\n", j + 1, candidate.title));
                report.push_str(PROMPT_RULE);
                report.push('\n');
            }
            report.push_str(text);
            report.push('\n');
            if j + 1 < prompts.len() {
                report.push('\n');
            }
        }

        if i + 1 < files.len() {
            report.push('\n');
            report.push_str(RULE);
            report.push_str("\n\n");
        }
    }

    report
}

pub fn generate_markdown_report(data: &ReportData) -> String {
    let mut report = String::new();

    report.push_str("# Positive Prompts\n\n");
    report.push_str("| | |\n|---|---|\n");
    report.push_str(&format!("| Extractor mode | `{}` |\n", data.method));
    report.push_str(&format!("| Files processed | {} |\n", data.summary().files_processed));
    report.push_str(&format!("| Total prompts | {} |\n", data.texts.len()));
    if let Some(ref direction) = data.translation {
        report.push_str(&format!("| Translation | {} |\n", direction));
    }
    report.push_str(&format!(
        "| Extraction date | {} |\n\n",
        data.generated_at.format("%Y-%m-%d %H:%M:%S")
    ));

    for (result, prompts) in data.files_with_texts() {
        report.push_str(&format!("## {}\n\n", result.file.filename));
        report.push_str(&format!(
            "- Method: `{}`\n- Size: {}x{} ({})\n\n",
            result.method, result.file.width, result.file.height, result.file.color_mode
        ));

        for (candidate, text) in prompts {
            report.push_str(&format!(
                "### {} <sub>{}</sub>\n\n```text\n{}\n```\n\n",
                candidate.title, candidate.source, text
            ));
        }
    }

    report
}

pub fn generate_json_report(data: &ReportData) -> Result<String, serde_json::Error> {
    let summary = data.summary();

    let files: Vec<serde_json::Value> = data
        .files_with_texts()
        .into_iter()
        .map(|(result, prompts)| {
            serde_json::json!({
                "filename": result.file.filename,
                "method": result.method,
                "width": result.file.width,
                "height": result.file.height,
                "color_mode": result.file.color_mode.as_str(),
                "prompts": prompts
                    .into_iter()
                    .map(|(candidate, text)| serde_json::json!({
                        "text": text,
                        "original_text": (text != candidate.text).then_some(&candidate.text),
                        "title": candidate.title,
                        "node_id": candidate.node_id,
                        "node_type": candidate.node_type,
                        "source": candidate.source,
                    }))
                    .collect::<Vec<_>>(),
            })
        })
        .collect();

    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Promptlift",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": data.generated_at.to_rfc3339(),
                "format": "json",
            },
            "summary": {
                "method": data.method,
                "files_processed": summary.files_processed,
                "files_with_prompts": summary.files_with_prompts,
                "files_failed": summary.files_failed,
                "total_prompts": data.texts.len(),
                "translation": data.translation,
            },
            "files": files,
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn generate_report(data: &ReportData, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(data)),
        ReportFormat::Markdown => Ok(generate_markdown_report(data)),
        ReportFormat::Json => generate_json_report(data),
    }
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

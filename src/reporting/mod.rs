//! Console and log-file report output
//!
//! Every report line goes to stdout and is appended to the run's log file.
//! Section headers are colored on the console only; the log stays plain.

use colored::*;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::Path;

use crate::config::HarnessConfig;
use crate::error::Result;
use crate::evaluation::{CrossValidationSummary, Metric, MetricsReport, MulticlassMetrics};
use crate::explainability::ImportanceReport;
use crate::export::ScoredSample;
use crate::trainers::TrainerKind;

const RULE: &str = "************************************************************";
const SUB_RULE: &str = "*-----------------------------------------------------------";

fn percent(v: f64) -> String {
    if v.is_finite() {
        format!("{:.2}%", v * 100.0)
    } else {
        "NaN".to_string()
    }
}

fn fixed3(v: f64) -> String {
    if v.is_finite() {
        format!("{:.3}", v)
    } else {
        "NaN".to_string()
    }
}

/// Sink for report lines
pub struct Reporter {
    console: bool,
    log: Option<File>,
    captured: Option<Vec<String>>,
}

impl Reporter {
    /// Print to stdout and append to `log_path` when given. The file and
    /// its parent directories are created if missing.
    pub fn new(log_path: Option<&Path>) -> Result<Self> {
        let log = match log_path {
            Some(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                Some(OpenOptions::new().create(true).append(true).open(path)?)
            }
            None => None,
        };
        Ok(Self {
            console: true,
            log,
            captured: None,
        })
    }

    /// Reporter for a harness run, logging to the configured file
    pub fn from_config(config: &HarnessConfig) -> Result<Self> {
        Self::new(Some(&config.log_file_path()))
    }

    /// Silent reporter that keeps every line in memory
    pub fn capturing() -> Self {
        Self {
            console: false,
            log: None,
            captured: Some(Vec::new()),
        }
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console = enabled;
        self
    }

    /// Lines kept by a capturing reporter
    pub fn lines(&self) -> &[String] {
        self.captured.as_deref().unwrap_or(&[])
    }

    fn emit(&mut self, plain: &str, styled: Option<String>) -> Result<()> {
        if self.console {
            println!("{}", styled.as_deref().unwrap_or(plain));
        }
        if let Some(file) = self.log.as_mut() {
            writeln!(file, "{}", plain)?;
        }
        if let Some(lines) = self.captured.as_mut() {
            lines.push(plain.to_string());
        }
        Ok(())
    }

    pub fn line(&mut self, text: impl AsRef<str>) -> Result<()> {
        self.emit(text.as_ref(), None)
    }

    pub fn header(&mut self, title: impl AsRef<str>) -> Result<()> {
        let plain = format!("=============== {} ===============", title.as_ref());
        let styled = plain.truecolor(120, 170, 255).bold().to_string();
        self.emit(&plain, Some(styled))
    }

    /// Single-split metrics block plus the confusion table
    pub fn report_metrics(&mut self, kind: TrainerKind, report: &MetricsReport) -> Result<()> {
        let m = report.binary();
        self.line(RULE)?;
        self.line(format!("*       Metrics for {} binary classification model", kind))?;
        self.line(SUB_RULE)?;
        self.line(format!("*       Accuracy: {}", percent(m.accuracy)))?;
        self.line(format!("*       Area Under Curve:      {}", percent(m.auc)))?;
        self.line(format!("*       Area under Precision recall Curve:  {}", percent(m.auprc)))?;
        self.line(format!("*       F1Score:  {}", percent(m.f1_score)))?;
        self.line(format!("*       PositivePrecision:  {}", fixed3(m.positive_precision)))?;
        self.line(format!("*       PositiveRecall:  {}", fixed3(m.positive_recall)))?;
        self.line(format!("*       NegativePrecision:  {}", fixed3(m.negative_precision)))?;
        self.line(format!("*       NegativeRecall:  {}", percent(m.negative_recall)))?;
        if let MetricsReport::Calibrated(c) = report {
            self.line(format!("*       LogLoss:  {}", fixed3(c.log_loss)))?;
            self.line(format!("*       LogLossReduction:  {}", fixed3(c.log_loss_reduction)))?;
            self.line(format!("*       Entropy:  {}", fixed3(c.entropy)))?;
        }
        self.line(RULE)?;
        for row in m.confusion_matrix.format_table().lines() {
            self.line(row)?;
        }
        Ok(())
    }

    /// Fold averages with dispersion
    pub fn report_summary(&mut self, kind: TrainerKind, summary: &CrossValidationSummary) -> Result<()> {
        self.line(format!(
            "*       Metrics for {} binary classification model ({} folds)",
            kind, summary.folds
        ))?;
        self.line("Metric - Average - Standard deviation - Confidence Interval 95%")?;
        for (metric, s) in &summary.metrics {
            self.line(format!(
                "{} - {} - {} - {}",
                metric_label(*metric),
                fixed3(s.mean),
                fixed3(s.std_dev),
                fixed3(s.ci95)
            ))?;
        }
        Ok(())
    }

    pub fn report_multiclass(&mut self, kind: TrainerKind, m: &MulticlassMetrics) -> Result<()> {
        self.line(RULE)?;
        self.line(format!("*       Metrics for {} Multi class classification model", kind))?;
        self.line(SUB_RULE)?;
        self.line(format!("*       MicroAccuracy: {}", percent(m.micro_accuracy)))?;
        self.line(format!("*       MacroAccuracy:      {}", percent(m.macro_accuracy)))?;
        self.line(format!("*       LogLoss:  {}", fixed3(m.log_loss)))?;
        self.line(format!("*       LogLossReduction:  {}", fixed3(m.log_loss_reduction)))?;
        let per_class: Vec<String> = m.per_class_log_loss.iter().map(|&v| fixed3(v)).collect();
        self.line(format!("*       PerClassLogLoss:  [{}]", per_class.join(", ")))?;
        self.line(RULE)
    }

    pub fn report_importance(&mut self, kind: TrainerKind, report: &ImportanceReport) -> Result<()> {
        self.line(kind.name())?;
        for row in report.format_table() {
            self.line(row)?;
        }
        Ok(())
    }

    pub fn report_predictions(&mut self, sample: &ScoredSample) -> Result<()> {
        self.header(format!("Visualize data for model {}Model.zip", sample.trainer))?;
        for (observation, prediction) in &sample.rows {
            let probability = prediction
                .probability
                .map_or_else(|| "-".to_string(), |p| format!("{:.4}", p));
            self.line(format!(
                "Predicted: {} (score {:.4}, probability {}) | Actual: {}",
                prediction.predicted_label, prediction.score, probability, observation.label
            ))?;
        }
        Ok(())
    }
}

fn metric_label(metric: Metric) -> &'static str {
    match metric {
        Metric::Accuracy => "Accuracy",
        Metric::Auc => "Area Under Roc Curve",
        Metric::Auprc => "Area Under PRC",
        Metric::F1Score => "F1Score",
        Metric::PositivePrecision => "Positive Precision",
        Metric::PositiveRecall => "Positive Recall",
        Metric::NegativePrecision => "Negative Precision",
        Metric::NegativeRecall => "Negative Recall",
        Metric::LogLoss => "LogLoss",
        Metric::LogLossReduction => "LogLoss Reduction",
        Metric::Entropy => "Entropy",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluation::{summarize_folds, BinaryMetrics, ConfusionMatrix};
    use tempfile::tempdir;

    fn report() -> MetricsReport {
        MetricsReport::NonCalibrated(BinaryMetrics {
            accuracy: 0.75,
            auc: 0.8,
            auprc: 0.7,
            f1_score: 0.6,
            positive_precision: 0.5,
            positive_recall: 0.75,
            negative_precision: 0.9,
            negative_recall: 0.75,
            confusion_matrix: ConfusionMatrix {
                true_positive: 3,
                false_negative: 1,
                false_positive: 3,
                true_negative: 9,
            },
        })
    }

    #[test]
    fn test_capturing_reporter() {
        let mut reporter = Reporter::capturing();
        reporter.report_metrics(TrainerKind::FastForest, &report()).unwrap();

        let lines = reporter.lines();
        assert!(lines.iter().any(|l| l.contains("Metrics for FastForest")));
        assert!(lines.iter().any(|l| l == "*       Accuracy: 75.00%"));
        assert!(!lines.iter().any(|l| l.contains("LogLoss")));
    }

    #[test]
    fn test_log_file_is_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("Logs").join("Log.txt");

        for run in 0..2 {
            let mut reporter = Reporter::new(Some(&path)).unwrap().with_console(false);
            reporter.header(format!("run {}", run)).unwrap();
            reporter.line("body").unwrap();
        }

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 4);
        assert!(content.contains("run 0"));
        assert!(content.contains("run 1"));
        assert!(!content.contains('\x1b'));
    }

    #[test]
    fn test_summary_lines() {
        let summary = summarize_folds(&[report(), report()]).unwrap();
        let mut reporter = Reporter::capturing();
        reporter.report_summary(TrainerKind::FastForest, &summary).unwrap();

        assert!(reporter.lines().iter().any(|l| l == "Accuracy - 0.750 - 0.000 - 0.000"));
    }
}

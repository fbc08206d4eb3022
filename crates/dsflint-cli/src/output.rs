//! Report rendering: human terminal output, JSON, and a standalone HTML page

use colored::Colorize;

use dsflint_core::{LintItem, Report, Severity};

pub struct ReportRenderer {
    use_colors: bool,
}

impl ReportRenderer {
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Print the report grouped by producer, followed by a summary
    pub fn print_human(&self, report: &Report) {
        for section in &report.sections {
            if section.items.is_empty() {
                continue;
            }
            let heading = format!("── {} ──", section.producer);
            println!("{}", heading.as_str().bold());
            for item in &section.items {
                println!("{}", self.format_item(item));
            }
            println!();
        }

        let counts = report.counts();
        println!("{}", "Summary:".bold());
        println!("  Checks passed: {}", counts.success);
        if counts.error > 0 {
            println!("  Errors: {}", self.paint(&counts.error.to_string(), Severity::Error));
        }
        if counts.warning > 0 {
            println!(
                "  Warnings: {}",
                self.paint(&counts.warning.to_string(), Severity::Warning)
            );
        }
        if counts.info > 0 {
            println!("  Info: {}", self.paint(&counts.info.to_string(), Severity::Info));
        }
        if report.timed_out {
            println!("  {}", "Deadline expired, report is partial".yellow());
        }
        if counts.error == 0 && counts.warning == 0 {
            println!("  {} No problems found", self.ok_mark());
        }
    }

    fn format_item(&self, item: &LintItem) -> String {
        format!(
            "  {:7} {} [{}] {} ({})",
            self.paint(&item.severity.to_string(), item.severity),
            item.kind.as_code(),
            item.location,
            item.message,
            item.reference
        )
    }

    fn paint(&self, text: &str, severity: Severity) -> String {
        if !self.use_colors {
            return text.to_string();
        }
        match severity {
            Severity::Success => text.green().to_string(),
            Severity::Info => text.blue().to_string(),
            Severity::Warning => text.yellow().to_string(),
            Severity::Error => text.red().to_string(),
        }
    }

    fn ok_mark(&self) -> String {
        if self.use_colors {
            "✓".green().to_string()
        } else {
            "✓".to_string()
        }
    }

    /// Serialize the report with its aggregate counts
    pub fn to_json(&self, report: &Report) -> serde_json::Result<String> {
        let value = serde_json::json!({
            "counts": report.counts(),
            "timed_out": report.timed_out,
            "sections": report.sections,
        });
        serde_json::to_string_pretty(&value)
    }

    /// Standalone HTML page with one table per producer
    pub fn to_html(&self, report: &Report) -> String {
        let counts = report.counts();
        let mut html = String::from(
            "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\"/>\n\
             <title>dsflint report</title>\n<style>\n\
             body { font-family: sans-serif; margin: 2em; }\n\
             table { border-collapse: collapse; width: 100%; margin-bottom: 2em; }\n\
             th, td { border: 1px solid #ccc; padding: 4px 8px; text-align: left; }\n\
             .success { color: #2e7d32; }\n.info { color: #1565c0; }\n\
             .warning { color: #ef6c00; }\n.error { color: #c62828; }\n\
             </style>\n</head>\n<body>\n<h1>dsflint report</h1>\n",
        );
        html.push_str(&format!(
            "<p>{} passed, {} info, {} warnings, {} errors{}</p>\n",
            counts.success,
            counts.info,
            counts.warning,
            counts.error,
            if report.timed_out {
                " (deadline expired, report is partial)"
            } else {
                ""
            }
        ));
        for section in &report.sections {
            if section.items.is_empty() {
                continue;
            }
            html.push_str(&format!("<h2>{}</h2>\n<table>\n", escape(&section.producer.to_string())));
            html.push_str(
                "<tr><th>Severity</th><th>Rule</th><th>Location</th><th>Message</th><th>Reference</th></tr>\n",
            );
            for item in &section.items {
                html.push_str(&format!(
                    "<tr><td class=\"{sev}\">{sev}</td><td>{kind}</td><td>{loc}</td><td>{msg}</td><td>{reference}</td></tr>\n",
                    sev = item.severity,
                    kind = escape(item.kind.as_code()),
                    loc = escape(&item.location),
                    msg = escape(&item.message),
                    reference = escape(&item.reference),
                ));
            }
            html.push_str("</table>\n");
        }
        html.push_str("</body>\n</html>\n");
        html
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsflint_core::{Producer, RuleKind};

    fn sample_report() -> Report {
        let mut report = Report::new();
        report.push_section(
            Producer::Fhir,
            vec![LintItem::new(
                RuleKind::ActivityDefinitionStatusNotUnknown,
                "ad.xml",
                "http://x/<ad>",
            )],
        );
        report
    }

    #[test]
    fn json_report_carries_counts_and_sections() {
        let renderer = ReportRenderer::new(false);
        let json = renderer.to_json(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["counts"]["error"], 1);
        assert_eq!(
            value["sections"][0]["items"][0]["kind"],
            "ActivityDefinitionStatusNotUnknown"
        );
    }

    #[test]
    fn html_report_escapes_references() {
        let renderer = ReportRenderer::new(false);
        let html = renderer.to_html(&sample_report());
        assert!(html.contains("&lt;ad&gt;"));
        assert!(html.contains("ACTIVITY_DEFINITION_STATUS_NOT_UNKNOWN"));
    }
}

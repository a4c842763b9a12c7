use std::ops::Range;
use std::path::Path;

use ariadne::Color;
use ariadne::Label;
use ariadne::Report;
use ariadne::ReportKind;
use ariadne::Source;

/// Error type for validation failures
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Dotted path of the offending field, e.g. `integrations.fpp.players.garage.host`
    pub field_path: String,
    pub message: String,
    /// Location in the source file, when the field carries one
    pub span: Option<Range<usize>>,
}

impl ValidationError {
    pub fn new(field_path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field_path: field_path.into(),
            message: message.into(),
            span: None,
        }
    }

    pub fn with_span(mut self, span: Range<usize>) -> Self {
        self.span = Some(span);
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field_path, self.message)
    }
}

fn write_report(
    file_id: &str,
    content: &str,
    span: Range<usize>,
    message: &str,
    label: &str,
    output: &mut Vec<u8>,
) {
    let report = Report::build(ReportKind::Error, (file_id.to_string(), span.clone()))
        .with_config(ariadne::Config::default().with_color(false))
        .with_message(message)
        .with_label(
            Label::new((file_id.to_string(), span))
                .with_message(label)
                .with_color(Color::Red),
        )
        .finish();

    // Rendering only fails on a broken writer; Vec<u8> never is
    report
        .write((file_id.to_string(), Source::from(content)), &mut *output)
        .ok();
}

/// Render a TOML parse error against its source using Ariadne
pub fn format_parse_error(path: &Path, content: &str, error: &toml::de::Error) -> String {
    let file_id = path.to_string_lossy().to_string();

    match error.span() {
        Some(span) => {
            let mut output = Vec::new();
            write_report(
                &file_id,
                content,
                span,
                &format!("Failed to parse '{}'", file_id),
                error.message(),
                &mut output,
            );
            String::from_utf8_lossy(&output).to_string()
        }
        None => format!("Failed to parse '{}': {}\n", file_id, error.message()),
    }
}

/// Render validation errors, pointing at the source where a span is known
pub fn format_validation_errors(path: &Path, content: &str, errors: &[ValidationError]) -> String {
    let file_id = path.to_string_lossy().to_string();
    let mut output = Vec::new();

    for error in errors {
        match &error.span {
            Some(span) => write_report(
                &file_id,
                content,
                span.clone(),
                &format!("Validation error in '{}'", error.field_path),
                &error.message,
                &mut output,
            ),
            None => {
                let msg = format!(
                    "Validation error in '{}': {}\n",
                    error.field_path, error.message
                );
                output.extend_from_slice(msg.as_bytes());
            }
        }
    }

    String::from_utf8_lossy(&output).to_string()
}

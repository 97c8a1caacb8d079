//! CLI output formatting.
//!
//! Every `format_*` function is pure and returns lines; the `print_*`
//! wrappers write them to stdout. Diagnostics go through `log` instead.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! sunset.jpg (3 transforms)
//!     001 sunset-8f3a1.webp
//!         webp: written
//!     003 hero.jpg
//!         jpg: failed: Encode failed: Invalid colour: "bogus"
//!     002 sunset-c07d2.png
//!         png: written
//! ```
//!
//! Transforms are listed as they finish, each with its position in the
//! transforms file. The summary follows once the batch is done:
//!
//! ```text
//! 2 written, 1 failed
//!     hero.jpg: Encode failed: Invalid colour: "bogus"
//! ```

use crate::process::{ProcessEvent, TransformOutcome, TransformStatus};
use std::path::Path;

/// Format a 1-based position as a zero-padded 3-digit string.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Indentation prefix for a given depth (4 spaces per level).
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn plural(count: usize, word: &str) -> String {
    if count == 1 {
        format!("{count} {word}")
    } else {
        format!("{count} {word}s")
    }
}

pub fn format_process_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::BatchStarted {
            source,
            transform_count,
        } => vec![format!(
            "{} ({})",
            file_name(source),
            plural(*transform_count, "transform")
        )],
        ProcessEvent::TransformFinished {
            index,
            output_path,
            format,
            status,
        } => {
            let status = match status {
                TransformStatus::Written => "written".to_string(),
                TransformStatus::Failed(message) => format!("failed: {message}"),
            };
            vec![
                format!(
                    "{}{} {}",
                    indent(1),
                    format_index(index + 1),
                    file_name(output_path)
                ),
                format!("{}{}: {}", indent(2), format, status),
            ]
        }
    }
}

/// Totals line plus one line per failed transform, in request order.
pub fn format_batch_summary(outcomes: &[TransformOutcome]) -> Vec<String> {
    let failures: Vec<_> = outcomes.iter().filter_map(|o| o.as_ref().err()).collect();
    let written = outcomes.len() - failures.len();

    let mut lines = vec![format!("{written} written, {} failed", failures.len())];
    for failure in failures {
        lines.push(format!(
            "{}{}: {}",
            indent(1),
            file_name(&failure.request.output_path),
            failure.error
        ));
    }
    lines
}

pub fn print_process_event(event: &ProcessEvent) {
    for line in format_process_event(event) {
        println!("{}", line);
    }
}

pub fn print_batch_summary(outcomes: &[TransformOutcome]) {
    for line in format_batch_summary(outcomes) {
        println!("{}", line);
    }
}

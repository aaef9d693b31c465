/// ShakeAndBakeFile parsing
///
/// A step is a `RUN` block: the line starting with `RUN` plus every
/// following line up to the next blank line or the end of the document.
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::BuildError;

const STEP_KEYWORD: &str = "RUN";

/// Extract the ordered step bodies from a specification document
pub fn parse(document: &str) -> Vec<String> {
    let mut steps = Vec::new();
    let mut current: Option<Vec<&str>> = None;

    for line in document.lines() {
        if line.trim().is_empty() {
            if let Some(block) = current.take() {
                steps.push(finish_block(&block));
            }
            continue;
        }

        match current.as_mut() {
            Some(block) => block.push(line),
            None => {
                if let Some(body) = strip_keyword(line) {
                    current = Some(vec![body]);
                }
            }
        }
    }

    if let Some(block) = current.take() {
        steps.push(finish_block(&block));
    }

    steps
}

/// Read and parse the specification document in `build_root`
pub fn load(build_root: &Path, spec_file: &str) -> Result<Vec<String>, BuildError> {
    let path = build_root.join(spec_file);

    let document = fs::read_to_string(&path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => BuildError::SpecNotFound {
            file: spec_file.to_string(),
        },
        _ => BuildError::Config(format!("Failed to read {}: {}", path.display(), e)),
    })?;

    let steps = parse(&document);
    debug!(
        operation = "parse",
        path = %path.display(),
        step_count = steps.len(),
        "parsed specification"
    );

    Ok(steps)
}

/// Body of a line that opens a step, if it does
fn strip_keyword(line: &str) -> Option<&str> {
    let rest = line.trim_start().strip_prefix(STEP_KEYWORD)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest)
    } else {
        None
    }
}

fn finish_block(lines: &[&str]) -> String {
    lines.join("\n").trim().to_string()
}

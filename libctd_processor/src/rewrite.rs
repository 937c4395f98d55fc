//! Textual rewriting of the path fields inside a PSA configuration file.
//!
//! PSA files are owned by the third-party tools, so they are never parsed structurally. Only the
//! three self-closing path elements are located by pattern and replaced; every other byte of the
//! file is passed through untouched.
use regex::{NoExpand, Regex, RegexBuilder};
use std::path::Path;
use std::sync::LazyLock;

use super::error::RewriteError;

static RE_INPUT_DIR: LazyLock<Regex> = LazyLock::new(|| field_regex("InputDir"));
static RE_OUTPUT_DIR: LazyLock<Regex> = LazyLock::new(|| field_regex("OutputDir"));
static RE_INSTRUMENT_PATH: LazyLock<Regex> = LazyLock::new(|| field_regex("InstrumentPath"));

/// Pattern for `<Name value="..."/>`, case-insensitive and tolerant of inner whitespace
fn field_regex(name: &str) -> Regex {
    RegexBuilder::new(&format!(r#"<{name}\s+value\s*=\s*"[^"]*"\s*/>"#))
        .case_insensitive(true)
        .build()
        .unwrap()
}

/// Convert all path separators to forward slashes
pub fn forward_slashes(value: &str) -> String {
    value.replace('\\', "/")
}

/// The resolved values to write into one PSA file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepFields {
    pub input_dir: String,
    pub output_dir: String,
    pub instrument_path: Option<String>,
}

fn replace_field(content: &str, re: &Regex, name: &str, value: &str) -> String {
    let element = format!(r#"<{name} value="{}" />"#, forward_slashes(value));
    re.replace_all(content, NoExpand(&element)).into_owned()
}

/// Rewrite the path fields of a PSA file's content.
///
/// `InputDir` and `OutputDir` are replaced wherever they appear. `InstrumentPath` is only
/// replaced if the content already has one; it is never inserted.
pub fn rewrite_fields(content: &str, fields: &StepFields) -> String {
    let mut content = replace_field(content, &RE_INPUT_DIR, "InputDir", &fields.input_dir);
    content = replace_field(&content, &RE_OUTPUT_DIR, "OutputDir", &fields.output_dir);
    if let Some(instrument_path) = &fields.instrument_path {
        if RE_INSTRUMENT_PATH.is_match(&content) {
            content = replace_field(
                &content,
                &RE_INSTRUMENT_PATH,
                "InstrumentPath",
                instrument_path,
            );
        }
    }
    content
}

/// Rewrite a PSA file in place
pub fn rewrite_file(path: &Path, fields: &StepFields) -> Result<(), RewriteError> {
    let content = std::fs::read_to_string(path).map_err(|source| RewriteError::IOError {
        path: path.to_path_buf(),
        source,
    })?;
    let content = rewrite_fields(&content, fields);
    std::fs::write(path, content).map_err(|source| RewriteError::IOError {
        path: path.to_path_buf(),
        source,
    })
}

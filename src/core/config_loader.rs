//! # Aliases File Loader
//!
//! Parses the INI-like aliases file format into `AliasSection`s:
//!
//! ```text
//! # global aliases
//! [DEFAULT]
//! search: search --terms
//!
//! [:bugzilla:]
//! blocker: search --blocks
//! mine: !
//!     search --assigned-to %{CONFIG:user}
//!
//! [gentoo]
//! *each: loop
//! ```
//!
//! Section headers are `[DEFAULT]`, `[:service:]`, or `[connection]`. Entries
//! are `name: body` (or `name = body`), with indented continuation lines
//! appended to the previous entry. A leading `*` on a name marks a meta-alias
//! and a leading `!` on a body marks a shell-command template. Lines whose
//! first non-blank character is `#` or `;` are comments.

use crate::{
    constants::DEFAULT_SECTION,
    models::{AliasDefinition, AliasKind, AliasSection},
};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("cannot read aliases file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: {message}")]
    Syntax {
        file: String,
        line: usize,
        message: String,
    },

    #[error("{file}: duplicate section '[{section}]'")]
    DuplicateSection { file: String, section: String },

    #[error("{file}: duplicate alias '{name}' in section '[{section}]'")]
    DuplicateOption {
        file: String,
        section: String,
        name: String,
    },
}

/// Reads and parses an aliases file from disk.
pub fn load_file(path: &Path) -> Result<Vec<AliasSection>, LoadError> {
    let text = std::fs::read_to_string(path).map_err(|e| LoadError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_aliases(&text, &path.display().to_string())
}

/// Parses aliases file text. `file` is only used in error messages.
pub fn parse_aliases(text: &str, file: &str) -> Result<Vec<AliasSection>, LoadError> {
    // Raw (name, value) pairs per section; finalized at the end so
    // continuation lines can keep appending to the last entry. Section 0 is
    // the implicit DEFAULT; an explicit empty `[DEFAULT]` header reuses it.
    let mut sections: Vec<(String, Vec<(String, String)>)> =
        vec![(DEFAULT_SECTION.to_string(), Vec::new())];
    let mut current = 0usize;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let trimmed = raw_line.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
            continue;
        }

        // Continuation: indented content belongs to the previous entry.
        if raw_line.starts_with([' ', '\t']) {
            match sections[current].1.last_mut() {
                Some((_, value)) => {
                    value.push('\n');
                    value.push_str(trimmed);
                }
                None => {
                    return Err(LoadError::Syntax {
                        file: file.to_string(),
                        line: line_no,
                        message: "continuation line without a preceding entry".to_string(),
                    });
                }
            }
            continue;
        }

        if let Some(id) = trimmed.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
            let id = id.trim();
            if id.is_empty() {
                return Err(LoadError::Syntax {
                    file: file.to_string(),
                    line: line_no,
                    message: "empty section header".to_string(),
                });
            }
            if let Some(pos) = sections.iter().position(|(existing, _)| existing == id) {
                if pos == 0 && sections[0].1.is_empty() {
                    current = 0;
                    continue;
                }
                return Err(LoadError::DuplicateSection {
                    file: file.to_string(),
                    section: id.to_string(),
                });
            }
            sections.push((id.to_string(), Vec::new()));
            current = sections.len() - 1;
            continue;
        }

        // An entry: the separator is whichever of ':' or '=' comes first.
        let sep = match (trimmed.find(':'), trimmed.find('=')) {
            (Some(c), Some(e)) => Some(c.min(e)),
            (Some(c), None) => Some(c),
            (None, Some(e)) => Some(e),
            (None, None) => None,
        };
        let Some(sep) = sep else {
            return Err(LoadError::Syntax {
                file: file.to_string(),
                line: line_no,
                message: format!("expected 'name: body', found '{trimmed}'"),
            });
        };

        let name = trimmed[..sep].trim();
        let value = trimmed[sep + 1..].trim();
        if name.is_empty() || name == "*" {
            return Err(LoadError::Syntax {
                file: file.to_string(),
                line: line_no,
                message: "entry is missing a name".to_string(),
            });
        }

        sections[current].1.push((name.to_string(), value.to_string()));
    }

    finalize(sections, file)
}

fn finalize(
    raw: Vec<(String, Vec<(String, String)>)>,
    file: &str,
) -> Result<Vec<AliasSection>, LoadError> {
    let mut result = Vec::new();

    for (id, entries) in raw {
        let mut section = AliasSection::new(id.clone());
        for (raw_name, raw_value) in entries {
            let (name, is_meta) = match raw_name.strip_prefix('*') {
                Some(bare) => (bare.to_string(), true),
                None => (raw_name, false),
            };
            if section.get(&name).is_some() {
                return Err(LoadError::DuplicateOption {
                    file: file.to_string(),
                    section: id.clone(),
                    name,
                });
            }

            let mut body = strip_symmetric_quotes(raw_value.trim()).to_string();
            let kind = if is_meta {
                AliasKind::Meta
            } else if let Some(rest) = body.strip_prefix('!') {
                body = rest.trim_start().to_string();
                AliasKind::ShellFunction
            } else {
                AliasKind::Simple
            };

            section.insert(AliasDefinition { name, body, kind });
        }
        if !section.is_empty() {
            result.push(section);
        }
    }

    Ok(result)
}

/// Strips one pair of matching surrounding quotes, if present.
fn strip_symmetric_quotes(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

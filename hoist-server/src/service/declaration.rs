//! Service declaration rewrite
//!
//! Sets `services.<name>.image` in a compose file without re-serializing the
//! document. The new value is spliced into the original text, so comments,
//! anchors, quoting and layout stay exactly as they were. The edited text is
//! parsed again and must equal the original document with only that one
//! field changed, otherwise nothing is written.
//!
//! Only block-style mappings are edited. Flow-style services, block scalars
//! and multi-line image values are refused.

use anyhow::{Context, Result, anyhow, bail};
use serde_yaml::Value;
use std::io::Write;
use std::ops::Range;
use std::path::Path;

/// Sets `services.<service>.image` in `path`, leaving every other byte as is
///
/// The file is replaced atomically: concurrent readers see either the old
/// or the new contents, never a partial write.
pub fn update_image(path: &Path, service: &str, image: &str) -> Result<()> {
    let original = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    let updated = set_image(&original, service, image)
        .with_context(|| format!("Cannot update {}", path.display()))?;

    if updated != original {
        write_atomically(path, &updated)?;
    }

    Ok(())
}

/// Returns `text` with `services.<service>.image` set to `image`
fn set_image(text: &str, service: &str, image: &str) -> Result<String> {
    let mut expected: Value =
        serde_yaml::from_str(text).context("Failed to parse declaration")?;
    expected
        .get_mut("services")
        .and_then(|services| services.get_mut(service))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| anyhow!("services.{} is not a mapping", service))?
        .insert(Value::from("image"), Value::from(image));

    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let edit = plan_edit(&lines, service)?;
    let updated = edit.apply(&lines, image);

    let actual: Value =
        serde_yaml::from_str(&updated).context("Rewritten declaration does not parse")?;
    if actual != expected {
        bail!("editing services.{}.image in place would change other values", service);
    }

    Ok(updated)
}

/// Single text change on a declaration
#[derive(Debug, PartialEq, Eq)]
enum Edit {
    /// Replace bytes `span` of line `line`, keeping the quote style
    Replace {
        line: usize,
        span: Range<usize>,
        quote: Option<char>,
    },
    /// Add an `image:` entry right after line `after`
    Insert { after: usize, indent: usize },
}

impl Edit {
    fn apply(&self, lines: &[&str], image: &str) -> String {
        let mut out = String::with_capacity(lines.iter().map(|l| l.len()).sum::<usize>() + 64);

        for (i, line) in lines.iter().enumerate() {
            match self {
                Edit::Replace { line: target, span, quote } if *target == i => {
                    out.push_str(&line[..span.start]);
                    match quote {
                        Some(q) => {
                            out.push(*q);
                            out.push_str(image);
                            out.push(*q);
                        }
                        None => out.push_str(image),
                    }
                    out.push_str(&line[span.end..]);
                }
                Edit::Insert { after, indent } if *after == i => {
                    let eol = if line.ends_with("\r\n") { "\r\n" } else { "\n" };
                    out.push_str(line);
                    if !line.ends_with('\n') {
                        out.push_str(eol);
                    }
                    out.push_str(&" ".repeat(*indent));
                    out.push_str("image: ");
                    out.push_str(image);
                    out.push_str(eol);
                }
                _ => out.push_str(line),
            }
        }

        out
    }
}

/// Finds where the image value of `service` lives, or where it should go
fn plan_edit(lines: &[&str], service: &str) -> Result<Edit> {
    let services = find_entry(lines, 0..lines.len(), 0, "services")
        .ok_or_else(|| anyhow!("no top-level 'services' key"))?;
    let (range, indent) = block_of(lines, services)?;

    let entry = find_entry(lines, range, indent, service)
        .ok_or_else(|| anyhow!("service {} is not a block entry of 'services'", service))?;
    let (range, indent) = block_of(lines, entry)?;

    let Some(line) = find_entry(lines, range.clone(), indent, "image") else {
        // Appended after the last line of the service block
        let after = range
            .rev()
            .find(|&i| is_content(content(lines[i])))
            .unwrap_or(entry);
        return Ok(Edit::Insert { after, indent });
    };

    let text = content(lines[line]);
    let (_, rest) = split_key(text.trim_start()).ok_or_else(|| anyhow!("malformed image entry"))?;
    let value = skip_properties(rest.trim_start());
    let start = text.len() - value.len();
    let (len, quote) = scalar_len(value)?;

    Ok(Edit::Replace {
        line,
        span: start..start + len,
        quote,
    })
}

/// Lines belonging to the block mapping opened on line `parent`, and the
/// indentation of its entries
fn block_of(lines: &[&str], parent: usize) -> Result<(Range<usize>, usize)> {
    let text = content(lines[parent]);
    let opens_block = split_key(text.trim_start()).is_some_and(|(_, rest)| {
        let rest = skip_properties(rest.trim_start());
        rest.is_empty() || rest.starts_with('#')
    });
    if !opens_block {
        bail!("'{}' is not a block mapping", text.trim());
    }

    let parent_indent = indent_of(text);
    let mut end = lines.len();
    let mut child_indent = None;

    for (i, line) in lines.iter().enumerate().skip(parent + 1) {
        let text = content(line);
        if !is_content(text) {
            continue;
        }
        let indent = indent_of(text);
        if indent <= parent_indent {
            end = i;
            break;
        }
        child_indent.get_or_insert(indent);
    }

    let indent = child_indent.ok_or_else(|| anyhow!("'{}' has no entries", text.trim()))?;
    Ok((parent + 1..end, indent))
}

/// First line in `range` at exactly `indent` whose key is `key`
fn find_entry(lines: &[&str], range: Range<usize>, indent: usize, key: &str) -> Option<usize> {
    range.into_iter().find(|&i| {
        let text = content(lines[i]);
        is_content(text)
            && indent_of(text) == indent
            && split_key(text.trim_start()).is_some_and(|(k, _)| k == key)
    })
}

/// Splits `key: rest` into the unquoted key and everything after the colon
fn split_key(entry: &str) -> Option<(&str, &str)> {
    match entry.chars().next()? {
        quote @ ('"' | '\'') => {
            let close = entry[1..].find(quote)? + 1;
            let rest = entry[close + 1..].trim_start().strip_prefix(':')?;
            let separated = rest.is_empty() || rest.starts_with([' ', '\t']);
            separated.then_some((&entry[1..close], rest))
        }
        _ => {
            let colon = entry.char_indices().find_map(|(i, c)| {
                let separated =
                    c == ':' && matches!(entry[i + 1..].chars().next(), None | Some(' ' | '\t'));
                separated.then_some(i)
            })?;
            Some((entry[..colon].trim_end(), &entry[colon + 1..]))
        }
    }
}

/// Skips leading anchors (`&name`) and tags (`!tag`)
fn skip_properties(mut value: &str) -> &str {
    while value.starts_with(['&', '!']) {
        let end = value.find([' ', '\t']).unwrap_or(value.len());
        value = value[end..].trim_start();
    }
    value
}

/// Byte length of the single-line scalar at the start of `value`
fn scalar_len(value: &str) -> Result<(usize, Option<char>)> {
    match value.chars().next() {
        Some('"') => {
            let mut escaped = false;
            for (i, c) in value.char_indices().skip(1) {
                match c {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => return Ok((i + 1, Some('"'))),
                    _ => {}
                }
            }
            bail!("multi-line image values are not supported")
        }
        Some('\'') => {
            let bytes = value.as_bytes();
            let mut i = 1;
            while i < bytes.len() {
                if bytes[i] == b'\'' {
                    if bytes.get(i + 1) == Some(&b'\'') {
                        i += 2;
                        continue;
                    }
                    return Ok((i + 1, Some('\'')));
                }
                i += 1;
            }
            bail!("multi-line image values are not supported")
        }
        None | Some('#' | '|' | '>' | '[' | '{') => {
            bail!("unsupported image value '{}'", value)
        }
        Some(_) => {
            let end = [" #", "\t#"]
                .iter()
                .filter_map(|marker| value.find(*marker))
                .min()
                .unwrap_or(value.len());
            Ok((value[..end].trim_end().len(), None))
        }
    }
}

fn content(line: &str) -> &str {
    line.trim_end_matches(['\n', '\r'])
}

fn indent_of(text: &str) -> usize {
    text.len() - text.trim_start_matches(' ').len()
}

fn is_content(text: &str) -> bool {
    let trimmed = text.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Replaces `path` through a temporary file in the same directory
fn write_atomically(path: &Path, contents: &str) -> Result<()> {
    // Follow symlinks so the link itself survives
    let target = std::fs::canonicalize(path)
        .with_context(|| format!("Failed to resolve {}", path.display()))?;
    let dir = target
        .parent()
        .ok_or_else(|| anyhow!("{} has no parent directory", target.display()))?;
    let permissions = std::fs::metadata(&target)
        .with_context(|| format!("Failed to stat {}", target.display()))?
        .permissions();

    let mut staged = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create a temporary file in {}", dir.display()))?;
    staged
        .write_all(contents.as_bytes())
        .and_then(|_| staged.as_file().set_permissions(permissions))
        .and_then(|_| staged.as_file().sync_all())
        .with_context(|| format!("Failed to stage {}", target.display()))?;

    staged
        .persist(&target)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", target.display()))?;

    Ok(())
}

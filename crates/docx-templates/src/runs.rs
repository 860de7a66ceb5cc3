//! Word run normalisation
//!
//! Word stores the text of a paragraph as a sequence of runs (`<w:r>`), and
//! freely splits a run when formatting, spell-check state or revision ids
//! change. A merge field typed as `{{folio}}` may therefore arrive as
//! `{{fo</w:t></w:r><w:r><w:t>lio}}`. Before the XML is handed to the template
//! engine every merge field is made contiguous by dropping the markup that
//! sits inside it.

use std::collections::BTreeSet;

use crate::error::DocxError;

enum Segment<'a> {
    Markup(&'a str),
    Text(&'a str),
}

fn segments(xml: &str) -> Vec<Segment<'_>> {
    let mut out = Vec::new();
    let mut rest = xml;

    while !rest.is_empty() {
        if rest.starts_with('<') {
            let end = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
            out.push(Segment::Markup(&rest[..end]));
            rest = &rest[end..];
        } else {
            let end = rest.find('<').unwrap_or(rest.len());
            out.push(Segment::Text(&rest[..end]));
            rest = &rest[end..];
        }
    }

    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Outside,
    /// A single `{` ended the last text run; markup is held back until we
    /// know whether the next text character opens a merge field.
    PendingOpen,
    Inside { last_was_close: bool },
}

/// Re-join merge fields that Word split across runs.
///
/// Markup outside merge fields is preserved byte for byte. Markup inside a
/// merge field is dropped, which keeps the document well formed because the
/// dropped sequence is always a run boundary (`</w:t></w:r><w:r>…<w:t>`).
pub fn join_split_fields(part: &str, xml: &str) -> Result<String, DocxError> {
    let mut out = String::with_capacity(xml.len());
    let mut held = String::new();
    let mut state = State::Outside;
    let mut field_start = 0usize;

    for segment in segments(xml) {
        match segment {
            Segment::Markup(markup) => match state {
                State::Outside => out.push_str(markup),
                State::PendingOpen => held.push_str(markup),
                State::Inside { .. } => {}
            },
            Segment::Text(text) => {
                for ch in text.chars() {
                    state = match state {
                        State::Outside => {
                            out.push(ch);
                            if ch == '{' {
                                State::PendingOpen
                            } else {
                                State::Outside
                            }
                        }
                        State::PendingOpen => {
                            if ch == '{' {
                                // Opening braces meet: markup between them goes.
                                held.clear();
                                field_start = out.len().saturating_sub(1);
                                out.push(ch);
                                State::Inside {
                                    last_was_close: false,
                                }
                            } else {
                                out.push_str(&held);
                                held.clear();
                                out.push(ch);
                                State::Outside
                            }
                        }
                        State::Inside { last_was_close } => {
                            out.push(ch);
                            match (ch, last_was_close) {
                                ('}', true) => State::Outside,
                                ('}', false) => State::Inside {
                                    last_was_close: true,
                                },
                                _ => State::Inside {
                                    last_was_close: false,
                                },
                            }
                        }
                    };
                }
            }
        }
    }

    match state {
        State::Outside => {}
        State::PendingOpen => out.push_str(&held),
        State::Inside { .. } => {
            let snippet: String = out[field_start..].chars().take(40).collect();
            return Err(DocxError::UnclosedMergeField {
                part: part.to_string(),
                snippet,
            });
        }
    }

    Ok(out)
}

const BLOCK_HELPERS: &[&str] = &["each", "if", "unless", "with"];
const SCOPED_BLOCKS: &[&str] = &["each", "with"];
const VALUE_HELPERS: &[&str] = &["upper", "lower", "checkbox", "default"];

/// Collect the top-level field names referenced by merge fields in `xml`.
///
/// Fields inside `#each` / `#with` blocks refer to the iterated item and are
/// not reported. The input should already have passed through
/// [`join_split_fields`].
pub fn merge_field_names(xml: &str) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    let mut scope_depth = 0usize;
    let mut rest = xml;

    while let Some(open) = rest.find("{{") {
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            break;
        };
        let expr = after[..close].trim_matches(|c| c == '{' || c == '}' || c == '~');
        rest = &after[close + 2..];

        let expr = expr.trim();
        if expr.starts_with('!') {
            continue;
        }

        if let Some(block) = expr.strip_prefix('/') {
            if SCOPED_BLOCKS.contains(&block.trim()) {
                scope_depth = scope_depth.saturating_sub(1);
            }
            continue;
        }

        let (is_block, body) = match expr.strip_prefix('#') {
            Some(body) => (true, body),
            None => (false, expr.strip_prefix('^').unwrap_or(expr)),
        };

        let mut tokens = body.split_whitespace();
        let Some(first) = tokens.next() else {
            continue;
        };

        let name = if is_block && BLOCK_HELPERS.contains(&first) {
            tokens.next()
        } else if VALUE_HELPERS.contains(&first) {
            tokens.next()
        } else if first == "else" {
            None
        } else {
            Some(first)
        };

        if scope_depth == 0 {
            if let Some(name) = name.and_then(field_root) {
                names.insert(name.to_string());
            }
        }

        if is_block && SCOPED_BLOCKS.contains(&first) {
            scope_depth += 1;
        }
    }

    names
}

fn field_root(token: &str) -> Option<&str> {
    if token.starts_with('@')
        || token.starts_with("this")
        || token.starts_with("..")
        || token.starts_with('"')
        || token.starts_with('&')
        || token.starts_with('(')
    {
        return None;
    }
    let root = token.split('.').next().unwrap_or(token);
    if root.is_empty() || root.chars().all(|c| c.is_ascii_digit()) {
        None
    } else {
        Some(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contiguous_field_untouched() {
        let xml = r#"<w:p><w:r><w:t>Folio {{folio}} here</w:t></w:r></w:p>"#;
        assert_eq!(join_split_fields("doc", xml).unwrap(), xml);
    }

    #[test]
    fn test_field_split_inside_name() {
        let xml = r#"<w:r><w:t>{{fo</w:t></w:r><w:r><w:rPr><w:b/></w:rPr><w:t>lio}}</w:t></w:r>"#;
        let joined = join_split_fields("doc", xml).unwrap();
        assert_eq!(joined, r#"<w:r><w:t>{{folio}}</w:t></w:r>"#);
    }

    #[test]
    fn test_field_split_between_braces() {
        let xml = r#"<w:r><w:t>A {</w:t></w:r><w:r><w:t>{name}</w:t></w:r><w:r><w:t>} B</w:t></w:r>"#;
        let joined = join_split_fields("doc", xml).unwrap();
        assert_eq!(joined, r#"<w:r><w:t>A {{name}} B</w:t></w:r>"#);
    }

    #[test]
    fn test_lone_brace_keeps_markup() {
        let xml = r#"<w:r><w:t>x {</w:t></w:r><w:r><w:t>y</w:t></w:r>"#;
        assert_eq!(join_split_fields("doc", xml).unwrap(), xml);
    }

    #[test]
    fn test_unclosed_field_is_error() {
        let xml = r#"<w:r><w:t>{{folio</w:t></w:r>"#;
        let err = join_split_fields("word/document.xml", xml).unwrap_err();
        assert!(matches!(err, DocxError::UnclosedMergeField { .. }));
    }

    #[test]
    fn test_merge_field_names_skip_scoped_blocks() {
        let xml = "{{folio}} {{#each claimants}}{{name}}{{/each}} {{#if isDeceased}}{{dateOfDeath}}{{/if}} {{upper companyName}} {{@index}}";
        let names: Vec<_> = merge_field_names(xml).into_iter().collect();
        assert_eq!(
            names,
            vec!["claimants", "companyName", "dateOfDeath", "folio", "isDeceased"]
        );
    }
}

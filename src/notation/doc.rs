//! Doc blocks: consecutive `///` lines in front of a declaration.
//!
//! Untagged leading lines are the declaration's own comment. A line starting
//! with `@path` opens the comment of a member (`@field`, `@ITEM`, `@stage`,
//! `@stage.field`, `@ERROR`); untagged lines after it continue that comment.
//! Lines whose text starts with `@` or `\` are written with a leading `\`.
//! Text that a doc line cannot carry verbatim (a carriage return) is written
//! as `\` followed by a string literal.

use crate::error::{Location, SyntaxError};
use crate::notation::lexer::escape_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocTag {
    pub path: String,
    pub text: String,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocBlock {
    pub location: Location,
    pub comment: Option<String>,
    pub tags: Vec<DocTag>,
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

/// Split `@path rest` into the path and the text after one optional space.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let body = line.strip_prefix('@')?;
    let end = body
        .char_indices()
        .find(|&(_, ch)| !(is_name_char(ch) || ch == '.'))
        .map_or(body.len(), |(idx, _)| idx);
    let (path, rest) = body.split_at(end);
    let well_formed = !path.is_empty()
        && path.split('.').count() <= 2
        && path
            .split('.')
            .all(|seg| seg.chars().next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_'));
    if !well_formed {
        return None;
    }
    match rest.strip_prefix(' ') {
        Some(text) => Some((path, text)),
        None if rest.is_empty() => Some((path, rest)),
        None => None,
    }
}

impl DocBlock {
    pub fn parse(lines: &[(String, Location)]) -> Result<DocBlock, SyntaxError> {
        let location = lines
            .first()
            .map(|(_, loc)| loc.clone())
            .unwrap_or_else(|| Location::new(None, 1, 1));
        let mut own: Option<Vec<String>> = None;
        let mut tags: Vec<(DocTag, Vec<String>)> = Vec::new();

        for (line, loc) in lines {
            if line.starts_with('@') {
                let Some((path, text)) = split_tag(line) else {
                    return Err(SyntaxError::new(
                        loc.clone(),
                        format!("malformed doc tag `{line}`"),
                    ));
                };
                if tags.iter().any(|(t, _)| t.path == path) {
                    return Err(SyntaxError::new(
                        loc.clone(),
                        format!("doc tag `@{path}` appears twice"),
                    ));
                }
                let tag = DocTag {
                    path: path.to_string(),
                    text: String::new(),
                    location: loc.clone(),
                };
                let text = unquote(text).unwrap_or_else(|| text.to_string());
                tags.push((tag, vec![text]));
                continue;
            }

            let text = unquote(line)
                .unwrap_or_else(|| line.strip_prefix('\\').unwrap_or(line).to_string());
            match tags.last_mut() {
                Some((_, body)) => body.push(text),
                None => own.get_or_insert_with(Vec::new).push(text),
            }
        }

        Ok(DocBlock {
            location,
            comment: own.map(|lines| lines.join("\n")),
            tags: tags
                .into_iter()
                .map(|(mut tag, body)| {
                    tag.text = body.join("\n");
                    tag
                })
                .collect(),
        })
    }

    /// Remove and return the comment tagged with `path`.
    pub fn take(&mut self, path: &str) -> Option<String> {
        let idx = self.tags.iter().position(|t| t.path == path)?;
        Some(self.tags.remove(idx).text)
    }

    /// Fails on the first tag no member claimed.
    pub fn finish(self) -> Result<Option<String>, SyntaxError> {
        match self.tags.into_iter().next() {
            Some(tag) => Err(SyntaxError::new(
                tag.location,
                format!("doc tag `@{}` does not name a member", tag.path),
            )),
            None => Ok(self.comment),
        }
    }
}

/// Combine two sources of the same comment; at most one may be present.
pub fn single_comment(
    first: Option<String>,
    second: Option<String>,
    what: &str,
    location: &Location,
) -> Result<Option<String>, SyntaxError> {
    match (first, second) {
        (Some(_), Some(_)) => Err(SyntaxError::new(
            location.clone(),
            format!("{what} is documented twice"),
        )),
        (first, second) => Ok(first.or(second)),
    }
}

/// Decode `\"..."`, the quoted form of a doc line.
fn unquote(text: &str) -> Option<String> {
    let body = text.strip_prefix("\\\"")?.strip_suffix('"')?;
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '"' => return None,
            '\\' => out.push(match chars.next()? {
                'n' => '\n',
                'r' => '\r',
                't' => '\t',
                '\\' => '\\',
                '"' => '"',
                _ => return None,
            }),
            _ => out.push(ch),
        }
    }
    Some(out)
}

fn quote(text: &str) -> String {
    format!("\\{}", escape_string(text))
}

fn escape_line(line: &str) -> String {
    if line.contains('\r') {
        quote(line)
    } else if line.starts_with('@') || line.starts_with('\\') {
        format!("\\{line}")
    } else {
        line.to_string()
    }
}

/// A `//!` line for one line of the unit comment. Unit doc lines carry no
/// tags, so only text starting with `\` or holding a carriage return is quoted.
pub fn unit_line(text: &str) -> String {
    if text.contains('\r') || text.starts_with('\\') {
        quote(text)
    } else {
        text.to_string()
    }
}

pub fn parse_unit_line(line: &str) -> String {
    unquote(line).unwrap_or_else(|| line.to_string())
}

/// Doc lines (without the `///` marker) for a comment and tagged member
/// comments. Empty when there is nothing to say.
pub fn render_lines(comment: Option<&str>, tags: &[(String, &str)]) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(comment) = comment {
        lines.extend(comment.split('\n').map(escape_line));
    }
    for (path, text) in tags {
        let mut parts = text.split('\n');
        match parts.next() {
            Some(first) if first.contains('\r') || first.starts_with("\\\"") => {
                lines.push(format!("@{path} {}", quote(first)))
            }
            Some(first) if !first.is_empty() => lines.push(format!("@{path} {first}")),
            _ => lines.push(format!("@{path}")),
        }
        lines.extend(parts.map(escape_line));
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<(String, Location)> {
        raw.iter()
            .enumerate()
            .map(|(i, l)| (l.to_string(), Location::new(None, i + 1, 1)))
            .collect()
    }

    #[test]
    fn test_own_comment_and_tags() {
        let mut block =
            DocBlock::parse(&lines(&["Top", "more", "@field first", "second", "@request.x"]))
                .unwrap();
        assert_eq!(block.comment.as_deref(), Some("Top\nmore"));
        assert_eq!(block.take("field").as_deref(), Some("first\nsecond"));
        assert_eq!(block.take("request.x").as_deref(), Some(""));
        assert_eq!(block.finish().unwrap().as_deref(), Some("Top\nmore"));
    }

    #[test]
    fn test_only_tags_means_no_own_comment() {
        let block = DocBlock::parse(&lines(&["@ITEM text"])).unwrap();
        assert_eq!(block.comment, None);
    }

    #[test]
    fn test_empty_line_is_empty_comment() {
        let block = DocBlock::parse(&lines(&[""])).unwrap();
        assert_eq!(block.comment.as_deref(), Some(""));
    }

    #[test]
    fn test_escaped_lines() {
        let block = DocBlock::parse(&lines(&["\\@not a tag", "\\\\backslash"])).unwrap();
        assert_eq!(block.comment.as_deref(), Some("@not a tag\n\\backslash"));
    }

    #[test]
    fn test_unclaimed_tag_fails() {
        let block = DocBlock::parse(&lines(&["@ghost boo"])).unwrap();
        let err = block.finish().unwrap_err();
        assert!(err.message.contains("@ghost"));
    }

    #[test]
    fn test_malformed_and_duplicate_tags() {
        assert!(DocBlock::parse(&lines(&["@a.b.c x"])).is_err());
        assert!(DocBlock::parse(&lines(&["@x-y"])).is_err());
        assert!(DocBlock::parse(&lines(&["@x one", "@x two"])).is_err());
    }

    #[test]
    fn test_render_then_parse() {
        let tags = vec![
            ("field".to_string(), "@weird\nline"),
            ("other".to_string(), ""),
            ("third".to_string(), " spaced"),
        ];
        let rendered = render_lines(Some("own\n\\path"), &tags);
        let mut block = DocBlock::parse(&lines(
            &rendered.iter().map(String::as_str).collect::<Vec<_>>(),
        ))
        .unwrap();
        assert_eq!(block.take("field").as_deref(), Some("@weird\nline"));
        assert_eq!(block.take("other").as_deref(), Some(""));
        assert_eq!(block.take("third").as_deref(), Some(" spaced"));
        assert_eq!(block.finish().unwrap().as_deref(), Some("own\n\\path"));
    }

    #[test]
    fn test_carriage_returns_survive() {
        let tags = vec![
            ("field".to_string(), "a\r\nb\r"),
            ("quoted".to_string(), "\\\"x\""),
        ];
        let rendered = render_lines(Some("own\r\nnext"), &tags);
        assert!(rendered.iter().all(|line| !line.contains('\r')));
        let mut block = DocBlock::parse(&lines(
            &rendered.iter().map(String::as_str).collect::<Vec<_>>(),
        ))
        .unwrap();
        assert_eq!(block.take("field").as_deref(), Some("a\r\nb\r"));
        assert_eq!(block.take("quoted").as_deref(), Some("\\\"x\""));
        assert_eq!(block.finish().unwrap().as_deref(), Some("own\r\nnext"));
    }

    #[test]
    fn test_unit_lines() {
        for text in ["plain", "@kept", "\\lead", "\\\"x\"", "cr\r"] {
            assert_eq!(parse_unit_line(&unit_line(text)), text);
        }
        assert_eq!(unit_line("@kept"), "@kept");
    }

    #[test]
    fn test_quoted_line() {
        let block = DocBlock::parse(&lines(&["\\\"tab\\there\"", "\\\"open"])).unwrap();
        assert_eq!(block.comment.as_deref(), Some("tab\there\n\"open"));
    }

    #[test]
    fn test_single_comment() {
        let loc = Location::new(None, 1, 1);
        assert_eq!(
            single_comment(None, Some("b".into()), "x", &loc).unwrap(),
            Some("b".into())
        );
        assert!(single_comment(Some("a".into()), Some("b".into()), "x", &loc).is_err());
    }
}

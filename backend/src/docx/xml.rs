//! Minimal XML tokenizer for WordprocessingML parts.
//!
//! Tokens keep their raw text so an untouched part re-serializes byte for
//! byte. Only what the template engine needs is interpreted: element names,
//! open/close pairing and the nesting of elements.

use common::model::diagnostic::RenderErrorDetail;

use super::error::detail;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TagKind {
    Open,
    Close,
    SelfClosing,
    /// Declarations, comments and processing instructions.
    Other,
}

#[derive(Debug, Clone)]
pub(crate) struct XmlTag {
    pub raw: String,
    pub name: String,
    pub kind: TagKind,
}

#[derive(Debug, Clone)]
pub(crate) enum Token {
    Tag(XmlTag),
    Text(String),
    /// A template tag, by index into the compiled part's tag list.
    Marker(usize),
}

impl Token {
    #[cfg(test)]
    pub fn is_element(&self, name: &str, kind: TagKind) -> bool {
        matches!(self, Token::Tag(tag) if tag.kind == kind && tag.name == name)
    }
}

pub(crate) fn tokenize(xml: &str) -> Result<Vec<Token>, RenderErrorDetail> {
    let mut tokens = Vec::new();
    let mut rest = xml;

    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            tokens.push(Token::Text(rest.to_string()));
            break;
        };
        if lt > 0 {
            tokens.push(Token::Text(rest[..lt].to_string()));
        }
        rest = &rest[lt..];

        let end = tag_end(rest).ok_or_else(|| {
            let context: String = rest.chars().take(40).collect();
            detail(
                "malformed_xml",
                "Malformed XML",
                "An XML tag is never closed".to_string(),
                &context,
            )
        })?;
        let raw = &rest[..end];
        tokens.push(Token::Tag(parse_tag(raw)));
        rest = &rest[end..];
    }

    Ok(tokens)
}

/// Byte length of the tag starting at `input[0] == '<'`, including `>`.
fn tag_end(input: &str) -> Option<usize> {
    if input.starts_with("<!--") {
        return input.find("-->").map(|i| i + 3);
    }
    if input.starts_with("<![CDATA[") {
        return input.find("]]>").map(|i| i + 3);
    }

    let mut quote: Option<char> = None;
    for (i, ch) in input.char_indices().skip(1) {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"') | (None, '\'') => quote = Some(ch),
            (None, '>') => return Some(i + 1),
            _ => {}
        }
    }
    None
}

fn parse_tag(raw: &str) -> XmlTag {
    let inner = &raw[1..raw.len() - 1];
    let (kind, body) = if inner.starts_with('?') || inner.starts_with('!') {
        (TagKind::Other, inner)
    } else if let Some(body) = inner.strip_prefix('/') {
        (TagKind::Close, body)
    } else if let Some(body) = inner.strip_suffix('/') {
        (TagKind::SelfClosing, body)
    } else {
        (TagKind::Open, inner)
    };

    let name = if kind == TagKind::Other {
        String::new()
    } else {
        body.split(|c: char| c.is_whitespace() || c == '/')
            .next()
            .unwrap_or_default()
            .to_string()
    };

    XmlTag {
        raw: raw.to_string(),
        name,
        kind,
    }
}

/// Element nesting of a token list.
pub(crate) struct ElementIndex {
    /// For an open tag, the index of its close tag.
    closing: Vec<Option<usize>>,
    /// Index of the open tag of the innermost enclosing element.
    parent: Vec<Option<usize>>,
}

impl ElementIndex {
    pub fn build(tokens: &[Token]) -> Result<ElementIndex, RenderErrorDetail> {
        let mut closing = vec![None; tokens.len()];
        let mut parent = vec![None; tokens.len()];
        let mut stack: Vec<usize> = Vec::new();

        for (i, token) in tokens.iter().enumerate() {
            if let Token::Tag(tag) = token {
                if tag.kind == TagKind::Close {
                    let open = stack.pop().filter(|&o| tag_name(tokens, o) == tag.name);
                    let Some(open) = open else {
                        return Err(detail(
                            "malformed_xml",
                            "Malformed XML",
                            format!("Closing tag </{}> does not match its opening tag", tag.name),
                            &tag.raw,
                        ));
                    };
                    closing[open] = Some(i);
                    parent[i] = stack.last().copied();
                    continue;
                }
            }
            parent[i] = stack.last().copied();
            if token.is_open() {
                stack.push(i);
            }
        }

        if let Some(&open) = stack.last() {
            return Err(detail(
                "malformed_xml",
                "Malformed XML",
                format!("Element <{}> is never closed", tag_name(tokens, open)),
                "",
            ));
        }

        Ok(ElementIndex { closing, parent })
    }

    /// The `(open, close)` token indices of the nearest element named `name`
    /// that encloses token `index`.
    pub fn enclosing(&self, index: usize, name: &str, tokens: &[Token]) -> Option<(usize, usize)> {
        let mut current = self.parent[index];
        while let Some(open) = current {
            if tag_name(tokens, open) == name {
                return self.closing[open].map(|close| (open, close));
            }
            current = self.parent[open];
        }
        None
    }

    pub fn parent(&self, index: usize) -> Option<usize> {
        self.parent[index]
    }
}

impl Token {
    fn is_open(&self) -> bool {
        matches!(self, Token::Tag(tag) if tag.kind == TagKind::Open)
    }
}

fn tag_name(tokens: &[Token], index: usize) -> &str {
    match &tokens[index] {
        Token::Tag(tag) => &tag.name,
        _ => "",
    }
}

pub(crate) fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

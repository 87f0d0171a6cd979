//! Turns a templated XML part into tokens with template tags isolated as
//! markers, and works out which span of XML each section repeats.
//!
//! Word splits typed text into runs freely, so a tag like `{price}` may be
//! spread over several `<w:t>` elements. Tags are located on the
//! concatenated text of all `<w:t>` elements of the part; each tag is then
//! moved whole into the text element where it starts and its fragments are
//! removed from the following ones.

use common::model::diagnostic::RenderErrorDetail;

use super::error::detail;
use super::xml::{tokenize, ElementIndex, TagKind, Token};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TemplateTag {
    /// `{name}`
    Value(String),
    /// `{#name}` or, when inverted, `{^name}`
    SectionOpen { name: String, inverted: bool },
    /// `{/name}`; an empty name closes whatever section is open.
    SectionClose(String),
    /// `{%name}`
    Image(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Bounds {
    /// First token replaced by the expansion.
    pub outer_start: usize,
    /// Last token replaced by the expansion (inclusive).
    pub outer_end: usize,
    /// Token range repeated per iteration (end exclusive).
    pub inner_start: usize,
    pub inner_end: usize,
}

#[derive(Debug, Clone)]
pub(crate) struct Section {
    pub name: String,
    pub inverted: bool,
    pub bounds: Bounds,
}

pub(crate) struct CompiledPart {
    pub name: String,
    pub tokens: Vec<Token>,
    pub tags: Vec<TemplateTag>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, Copy)]
struct Span {
    start: usize,
    end: usize,
}

pub(crate) fn compile_part(
    name: &str,
    xml: &str,
    paragraph_loop: bool,
) -> Result<CompiledPart, Vec<RenderErrorDetail>> {
    let tokens = tokenize(xml).map_err(|e| vec![e])?;
    let mut errors = Vec::new();

    let text_nodes = text_node_indices(&tokens);
    let mut full = String::new();
    let mut node_starts = Vec::with_capacity(text_nodes.len());
    for &i in &text_nodes {
        node_starts.push(full.len());
        if let Token::Text(text) = &tokens[i] {
            full.push_str(text);
        }
    }

    let spans = find_spans(&full, &mut errors);
    let mut tags = Vec::with_capacity(spans.len());
    for span in &spans {
        match parse_tag(&full[span.start + 1..span.end - 1]) {
            Some(tag) => tags.push(tag),
            None => {
                errors.push(detail(
                    "invalid_tag_name",
                    "Invalid tag name",
                    "A tag must name a field".to_string(),
                    &full[span.start..span.end],
                ));
                tags.push(TemplateTag::Value(String::new()));
            }
        }
    }

    let tokens = isolate_tags(tokens, &text_nodes, &node_starts, &full, &spans);
    let pairs = pair_sections(&tokens, &tags, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    let index = ElementIndex::build(&tokens).map_err(|e| vec![e])?;
    let mut sections = Vec::with_capacity(pairs.len());
    for (open, close) in pairs {
        let TemplateTag::SectionOpen { name, inverted } = tag_at(&tokens, &tags, open).clone() else {
            continue;
        };
        match section_bounds(&tokens, &index, open, close, paragraph_loop) {
            Some(bounds) => sections.push(Section {
                name,
                inverted,
                bounds,
            }),
            None => errors.push(detail(
                "loop_position_invalid",
                "Invalid loop position",
                format!("The section \"{}\" opens and closes in incompatible places", name),
                &format!("{{#{}}}", name),
            )),
        }
    }
    check_nesting(&sections, &mut errors);
    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CompiledPart {
        name: name.to_string(),
        tokens,
        tags,
        sections,
    })
}

/// Indices of the text tokens that sit directly inside `<w:t>` elements.
fn text_node_indices(tokens: &[Token]) -> Vec<usize> {
    let mut nodes = Vec::new();
    let mut in_text = false;
    for (i, token) in tokens.iter().enumerate() {
        match token {
            Token::Tag(tag) if tag.name == "w:t" => in_text = tag.kind == TagKind::Open,
            Token::Text(_) if in_text => nodes.push(i),
            _ => {}
        }
    }
    nodes
}

fn find_spans(full: &str, errors: &mut Vec<RenderErrorDetail>) -> Vec<Span> {
    let mut spans = Vec::new();
    let mut open: Option<usize> = None;

    for (i, ch) in full.char_indices() {
        match ch {
            '{' => {
                if let Some(start) = open.replace(i) {
                    errors.push(unclosed(full, start));
                }
            }
            '}' => match open.take() {
                Some(start) => spans.push(Span { start, end: i + 1 }),
                None => errors.push(detail(
                    "unopened_tag",
                    "Unopened tag",
                    "A closing \"}\" has no matching \"{\"".to_string(),
                    &excerpt_before(full, i + 1),
                )),
            },
            _ => {}
        }
    }
    if let Some(start) = open {
        errors.push(unclosed(full, start));
    }
    spans
}

fn unclosed(full: &str, start: usize) -> RenderErrorDetail {
    let context: String = full[start..].chars().take(24).collect();
    detail(
        "unclosed_tag",
        "Unclosed tag",
        "An opening \"{\" has no matching \"}\"".to_string(),
        &context,
    )
}

fn excerpt_before(full: &str, end: usize) -> String {
    let chars: Vec<char> = full[..end].chars().collect();
    chars[chars.len().saturating_sub(24)..].iter().collect()
}

fn parse_tag(inner: &str) -> Option<TemplateTag> {
    let inner = inner.trim();
    let (tag, name) = if let Some(name) = inner.strip_prefix('#') {
        let name = name.trim().to_string();
        (
            TemplateTag::SectionOpen {
                name: name.clone(),
                inverted: false,
            },
            name,
        )
    } else if let Some(name) = inner.strip_prefix('^') {
        let name = name.trim().to_string();
        (
            TemplateTag::SectionOpen {
                name: name.clone(),
                inverted: true,
            },
            name,
        )
    } else if let Some(name) = inner.strip_prefix('/') {
        return Some(TemplateTag::SectionClose(name.trim().to_string()));
    } else if let Some(name) = inner.strip_prefix('%') {
        let name = name.trim().to_string();
        (TemplateTag::Image(name.clone()), name)
    } else {
        (TemplateTag::Value(inner.to_string()), inner.to_string())
    };

    (!name.is_empty()).then_some(tag)
}

/// Rebuilds the token list with each template tag replaced by a marker.
fn isolate_tags(
    tokens: Vec<Token>,
    text_nodes: &[usize],
    node_starts: &[usize],
    full: &str,
    spans: &[Span],
) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len() + spans.len() * 2);
    let mut node = 0;
    let mut span = 0;

    for (i, token) in tokens.into_iter().enumerate() {
        if text_nodes.get(node) != Some(&i) {
            out.push(token);
            continue;
        }

        let node_start = node_starts[node];
        let node_end = node_starts
            .get(node + 1)
            .copied()
            .unwrap_or(full.len());
        node += 1;

        let mut pieces = Vec::new();
        let mut touched = false;
        let mut cursor = node_start;
        while cursor < node_end {
            while span < spans.len() && spans[span].end <= cursor {
                span += 1;
            }
            match spans.get(span) {
                Some(s) if s.start < node_end => {
                    touched = true;
                    if s.start > cursor {
                        pieces.push(Token::Text(full[cursor..s.start].to_string()));
                    }
                    if s.start >= node_start {
                        pieces.push(Token::Marker(span));
                    }
                    cursor = s.end.min(node_end);
                }
                _ => {
                    pieces.push(Token::Text(full[cursor..node_end].to_string()));
                    cursor = node_end;
                }
            }
        }

        if touched {
            preserve_space(out.last_mut());
        }
        out.extend(pieces);
    }
    out
}

/// Marks the `<w:t>` element before an edited text node as
/// whitespace-preserving, since substituted values may start or end with
/// spaces.
fn preserve_space(token: Option<&mut Token>) {
    if let Some(Token::Tag(tag)) = token {
        if tag.name == "w:t" && tag.kind == TagKind::Open && !tag.raw.contains("xml:space") {
            tag.raw = r#"<w:t xml:space="preserve">"#.to_string();
        }
    }
}

fn tag_at<'t>(tokens: &[Token], tags: &'t [TemplateTag], index: usize) -> &'t TemplateTag {
    match tokens[index] {
        Token::Marker(t) => &tags[t],
        _ => unreachable!("section pairs always point at markers"),
    }
}

/// Matches section open and close markers, returning `(open, close)` token
/// indices in order of their closing.
fn pair_sections(
    tokens: &[Token],
    tags: &[TemplateTag],
    errors: &mut Vec<RenderErrorDetail>,
) -> Vec<(usize, usize)> {
    let mut stack: Vec<(usize, &str)> = Vec::new();
    let mut pairs = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Marker(t) = token else { continue };
        match &tags[*t] {
            TemplateTag::SectionOpen { name, .. } => stack.push((i, name.as_str())),
            TemplateTag::SectionClose(name) => match stack.pop() {
                Some((open, open_name)) if name.is_empty() || name == open_name => {
                    pairs.push((open, i));
                }
                Some((_, open_name)) => errors.push(detail(
                    "closing_tag_does_not_match_opening_tag",
                    "Closing tag does not match opening tag",
                    format!(
                        "The section \"{}\" is closed by \"{}\"",
                        open_name, name
                    ),
                    &format!("{{/{}}}", name),
                )),
                None => errors.push(detail(
                    "unopened_loop",
                    "Unopened loop",
                    format!("The section \"{}\" is closed but never opened", name),
                    &format!("{{/{}}}", name),
                )),
            },
            _ => {}
        }
    }

    for (_, name) in stack {
        errors.push(detail(
            "unclosed_loop",
            "Unclosed loop",
            format!("The section \"{}\" is opened but never closed", name),
            &format!("{{#{}}}", name),
        ));
    }
    pairs
}

fn section_bounds(
    tokens: &[Token],
    index: &ElementIndex,
    open: usize,
    close: usize,
    paragraph_loop: bool,
) -> Option<Bounds> {
    if paragraph_loop {
        if let Some(bounds) = paragraph_bounds(tokens, index, open, close) {
            return Some(bounds);
        }
    }

    let spans_cells = tokens[open..close]
        .iter()
        .any(|t| matches!(t, Token::Tag(tag) if tag.name == "w:tc"));
    if spans_cells {
        let (first_row, _) = index.enclosing(open, "w:tr", tokens)?;
        let (last_row, last_row_end) = index.enclosing(close, "w:tr", tokens)?;
        if index.parent(first_row) != index.parent(last_row) {
            return None;
        }
        return Some(Bounds {
            outer_start: first_row,
            outer_end: last_row_end,
            inner_start: first_row,
            inner_end: last_row_end + 1,
        });
    }

    if ancestry(tokens, index, open) != ancestry(tokens, index, close) {
        return None;
    }
    Some(Bounds {
        outer_start: open,
        outer_end: close,
        inner_start: open + 1,
        inner_end: close,
    })
}

/// Section tags alone in sibling paragraphs: repeat the paragraphs between
/// them and drop the tag paragraphs.
fn paragraph_bounds(
    tokens: &[Token],
    index: &ElementIndex,
    open: usize,
    close: usize,
) -> Option<Bounds> {
    let first = index.enclosing(open, "w:p", tokens)?;
    let last = index.enclosing(close, "w:p", tokens)?;
    if first == last || index.parent(first.0) != index.parent(last.0) {
        return None;
    }
    if !alone_in(tokens, first, open) || !alone_in(tokens, last, close) {
        return None;
    }
    Some(Bounds {
        outer_start: first.0,
        outer_end: last.1,
        inner_start: first.1 + 1,
        inner_end: last.0,
    })
}

fn alone_in(tokens: &[Token], (start, end): (usize, usize), marker: usize) -> bool {
    tokens[start + 1..end].iter().enumerate().all(|(offset, token)| match token {
        Token::Tag(_) => true,
        Token::Text(text) => text.trim().is_empty(),
        Token::Marker(_) => start + 1 + offset == marker,
    })
}

fn ancestry<'t>(tokens: &'t [Token], index: &ElementIndex, at: usize) -> Vec<&'t str> {
    let mut names = Vec::new();
    let mut current = index.parent(at);
    while let Some(open) = current {
        if let Token::Tag(tag) = &tokens[open] {
            names.push(tag.name.as_str());
        }
        current = index.parent(open);
    }
    names
}

/// Expansions must nest or be disjoint.
fn check_nesting(sections: &[Section], errors: &mut Vec<RenderErrorDetail>) {
    for (i, a) in sections.iter().enumerate() {
        for b in &sections[i + 1..] {
            let (a, b) = (a.bounds, b.bounds);
            let crosses = (a.outer_start < b.outer_start
                && b.outer_start <= a.outer_end
                && a.outer_end < b.outer_end)
                || (b.outer_start < a.outer_start
                    && a.outer_start <= b.outer_end
                    && b.outer_end < a.outer_end);
            if crosses {
                errors.push(detail(
                    "loop_position_invalid",
                    "Invalid loop position",
                    "Two sections overlap without nesting".to_string(),
                    "",
                ));
                return;
            }
        }
    }
}

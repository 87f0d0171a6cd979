//! # Template Engine
//!
//! Renders a DOCX template against a JSON context.
//!
//! ## Tags
//!
//! - `{name}` inserts a value. Dotted paths (`{client.name}`) walk into
//!   objects and `{.}` is the current section item.
//! - `{#name}` ... `{/name}` repeats its body once per array item, renders it
//!   once for a truthy scalar, or once with the object's fields in scope.
//! - `{^name}` ... `{/name}` renders its body only for falsy or empty values.
//! - `{%name}` hands the value to the image module.
//!
//! Lookups start in the innermost section item and fall back outward to the
//! root context. With `strict` set, a tag that names nothing in any scope is
//! an `undefined_tag` error rather than empty text.
//!
//! Compilation happens in `TemplateEngine::new`, so syntax errors surface
//! before any data is involved. Both compile and render collect every error
//! of the pass and report them together.

use std::collections::{HashMap, HashSet};

use common::model::diagnostic::RenderErrorDetail;
use log::debug;
use serde_json::Value;

use super::compile::{compile_part, CompiledPart, TemplateTag};
use super::error::{detail, RenderError};
use super::media::{relationships_part, ImageResolver, MediaRegistry};
use super::package::DocxPackage;
use super::xml::{escape_text, Token};

const LINE_BREAK: &str = r#"</w:t><w:br/><w:t xml:space="preserve">"#;

#[derive(Debug, Clone, Copy)]
pub struct TemplateOptions {
    /// Sections whose tags stand alone in their own paragraphs repeat the
    /// paragraphs in between and drop the tag paragraphs.
    pub paragraph_loop: bool,
    /// Render `\n` in values as Word line breaks.
    pub line_breaks: bool,
    /// Unknown tags are errors instead of empty text.
    pub strict: bool,
}

pub struct TemplateEngine {
    package: DocxPackage,
    parts: Vec<CompiledPart>,
    options: TemplateOptions,
    images: Option<Box<dyn ImageResolver>>,
}

impl TemplateEngine {
    /// Compiles every templated part of `package`.
    pub fn new(package: DocxPackage, options: TemplateOptions) -> Result<TemplateEngine, RenderError> {
        let mut parts = Vec::new();
        let mut errors = Vec::new();
        for name in package.templated_parts() {
            let Some(xml) = package.part_text(&name)? else {
                continue;
            };
            match compile_part(&name, xml, options.paragraph_loop) {
                Ok(part) => parts.push(part),
                Err(mut part_errors) => errors.append(&mut part_errors),
            }
        }
        if !errors.is_empty() {
            return Err(RenderError::Multi(errors));
        }

        debug!("Compiled {} template part(s)", parts.len());
        Ok(TemplateEngine {
            package,
            parts,
            options,
            images: None,
        })
    }

    /// Enables `{%name}` tags.
    pub fn with_image_module(mut self, resolver: Box<dyn ImageResolver>) -> TemplateEngine {
        self.images = Some(resolver);
        self
    }

    /// Renders every part against `data` and returns the filled package.
    pub fn render(self, data: &Value) -> Result<DocxPackage, RenderError> {
        let TemplateEngine {
            mut package,
            parts,
            options,
            images,
        } = self;

        let mut errors = Vec::new();
        let mut rendered = Vec::with_capacity(parts.len());
        for part in &parts {
            let rels = package.part_text(&relationships_part(&part.name))?;
            let xml = package.part_text(&part.name)?.unwrap_or_default();
            let media = MediaRegistry::new(rels, xml)?;

            let mut pass = RenderPass::new(part, options, images.as_deref(), media);
            let mut out = String::new();
            let mut scopes = vec![data];
            pass.render_range(0, part.tokens.len(), &mut scopes, &mut Vec::new(), &mut out);

            errors.append(&mut pass.errors);
            rendered.push((part.name.clone(), out, pass.media));
        }
        if !errors.is_empty() {
            return Err(RenderError::Multi(errors));
        }

        for (name, xml, media) in rendered {
            package.set_part(&name, xml.into_bytes());
            media.apply(&mut package, &name)?;
        }
        Ok(package)
    }
}

struct RenderPass<'p> {
    part: &'p CompiledPart,
    options: TemplateOptions,
    images: Option<&'p dyn ImageResolver>,
    media: MediaRegistry,
    /// Section ids by the token where their expansion starts, widest first.
    starts: HashMap<usize, Vec<usize>>,
    errors: Vec<RenderErrorDetail>,
    reported: HashSet<String>,
}

impl<'p> RenderPass<'p> {
    fn new(
        part: &'p CompiledPart,
        options: TemplateOptions,
        images: Option<&'p dyn ImageResolver>,
        media: MediaRegistry,
    ) -> RenderPass<'p> {
        let mut starts: HashMap<usize, Vec<usize>> = HashMap::new();
        for (id, section) in part.sections.iter().enumerate() {
            starts.entry(section.bounds.outer_start).or_default().push(id);
        }
        for ids in starts.values_mut() {
            ids.sort_by_key(|&id| std::cmp::Reverse(part.sections[id].bounds.outer_end));
        }

        RenderPass {
            part,
            options,
            images,
            media,
            starts,
            errors: Vec::new(),
            reported: HashSet::new(),
        }
    }

    fn render_range<'v>(
        &mut self,
        start: usize,
        end: usize,
        scopes: &mut Vec<&'v Value>,
        active: &mut Vec<usize>,
        out: &mut String,
    ) {
        let part = self.part;
        let mut i = start;
        while i < end {
            let section = self
                .starts
                .get(&i)
                .and_then(|ids| ids.iter().copied().find(|id| !active.contains(id)));
            if let Some(id) = section {
                self.expand(id, scopes, active, out);
                i = part.sections[id].bounds.outer_end + 1;
                continue;
            }

            match &part.tokens[i] {
                Token::Tag(tag) => out.push_str(&tag.raw),
                Token::Text(text) => out.push_str(text),
                Token::Marker(t) => match &part.tags[*t] {
                    TemplateTag::Value(name) => self.value(name, scopes, out),
                    TemplateTag::Image(name) => self.image(name, scopes, out),
                    // Markers of sections that repeat whole rows stay inside
                    // the repeated range and render as nothing.
                    TemplateTag::SectionOpen { .. } | TemplateTag::SectionClose(_) => {}
                },
            }
            i += 1;
        }
    }

    fn expand<'v>(
        &mut self,
        id: usize,
        scopes: &mut Vec<&'v Value>,
        active: &mut Vec<usize>,
        out: &mut String,
    ) {
        let part = self.part;
        let section = &part.sections[id];
        let (name, inverted, bounds) = (section.name.as_str(), section.inverted, section.bounds);

        let value = lookup(scopes, name);
        if value.is_none() {
            self.undefined(name, &format!("{{#{}}}", name));
        }

        // Each entry is one repetition, optionally with an item scope.
        let iterations: Vec<Option<&'v Value>> = match (value, inverted) {
            (Some(Value::Array(items)), false) => items.iter().map(Some).collect(),
            (Some(item @ Value::Object(_)), false) => vec![Some(item)],
            (Some(v), false) if truthy(v) => vec![None],
            (Some(v), true) if !truthy(v) => vec![None],
            (None, true) => vec![None],
            _ => Vec::new(),
        };

        active.push(id);
        for item in iterations {
            if let Some(item) = item {
                scopes.push(item);
            }
            self.render_range(bounds.inner_start, bounds.inner_end, scopes, active, out);
            if item.is_some() {
                scopes.pop();
            }
        }
        active.pop();
    }

    fn value(&mut self, name: &str, scopes: &[&Value], out: &mut String) {
        let Some(value) = lookup(scopes, name) else {
            self.undefined(name, &format!("{{{}}}", name));
            return;
        };

        let escaped = escape_text(&display(value));
        if self.options.line_breaks && escaped.contains('\n') {
            let lines: Vec<&str> = escaped.split('\n').map(|l| l.trim_end_matches('\r')).collect();
            out.push_str(&lines.join(LINE_BREAK));
        } else {
            out.push_str(&escaped);
        }
    }

    fn image(&mut self, name: &str, scopes: &[&Value], out: &mut String) {
        let Some(value) = lookup(scopes, name) else {
            self.undefined(name, &format!("{{%{}}}", name));
            return;
        };
        let Some(resolver) = self.images else {
            return;
        };

        let tag_value = display(value);
        let Some(bytes) = resolver.resolve(&tag_value, name) else {
            return;
        };
        let (width, height) = resolver.size(&bytes, &tag_value, name);
        let drawing = self.media.embed(bytes, width, height);

        // Drawings belong to the run, not the text element.
        out.push_str("</w:t>");
        out.push_str(&drawing);
        out.push_str(r#"<w:t xml:space="preserve">"#);
    }

    fn undefined(&mut self, name: &str, context: &str) {
        if !self.options.strict || !self.reported.insert(name.to_string()) {
            return;
        }
        self.errors.push(detail(
            "undefined_tag",
            "Undefined tag",
            format!(
                "The tag \"{}\" in {} does not match any field of the data",
                name, self.part.name
            ),
            context,
        ));
    }
}

fn lookup<'v>(scopes: &[&'v Value], path: &str) -> Option<&'v Value> {
    if path == "." {
        return scopes.last().copied();
    }
    let mut segments = path.split('.');
    let first = segments.next()?;
    let root = scopes.iter().rev().copied().find_map(|scope| scope.get(first))?;
    segments.try_fold(root, |value, key| value.get(key))
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

fn display(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

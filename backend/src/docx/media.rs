//! Image injection for `{%name}` tags.
//!
//! Each embedded image becomes a media part under `word/media/`, a
//! relationship of the part that shows it, and an inline `<w:drawing>` at
//! the tag's position.

use image::ImageFormat;
use regex::Regex;

use super::error::RenderError;
use super::package::{DocxPackage, CONTENT_TYPES};

/// Supplies image bytes for `{%name}` tags.
pub trait ImageResolver: Send {
    /// Bytes to embed for a tag whose context value is `tag_value`, or
    /// `None` to leave the tag empty.
    fn resolve(&self, tag_value: &str, tag_name: &str) -> Option<Vec<u8>>;

    /// Display size in pixels.
    fn size(&self, image: &[u8], tag_value: &str, tag_name: &str) -> (u32, u32);
}

const EMU_PER_PIXEL: u64 = 9525;

const IMAGE_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";

const EMPTY_RELATIONSHIPS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    "\n",
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"></Relationships>"#
);

pub(crate) struct EmbeddedImage {
    rel_id: String,
    file_name: String,
    extension: &'static str,
    mime: &'static str,
    bytes: Vec<u8>,
}

/// Images added to one part during a render pass.
pub(crate) struct MediaRegistry {
    next_rel: u32,
    next_drawing: u32,
    images: Vec<EmbeddedImage>,
}

impl MediaRegistry {
    /// Starts numbering after the highest relationship id in `rels` and the
    /// highest drawing id in `part_xml`.
    pub fn new(rels: Option<&str>, part_xml: &str) -> Result<MediaRegistry, RenderError> {
        let rel_ids = Regex::new(r#"Id="rId(\d+)""#)?;
        let drawing_ids = Regex::new(r#"<wp:docPr[^>]*\sid="(\d+)""#)?;
        Ok(MediaRegistry {
            next_rel: max_capture(&rel_ids, rels.unwrap_or_default()) + 1,
            next_drawing: max_capture(&drawing_ids, part_xml) + 1,
            images: Vec::new(),
        })
    }

    /// Registers `bytes` and returns the drawing markup that shows it.
    pub fn embed(&mut self, bytes: Vec<u8>, width_px: u32, height_px: u32) -> String {
        let format = image::guess_format(&bytes).unwrap_or(ImageFormat::Png);
        let extension = format.extensions_str().first().copied().unwrap_or("png");
        let file_name = format!("image_{:x}.{}", md5::compute(&bytes), extension);

        let rel_id = format!("rId{}", self.next_rel);
        self.next_rel += 1;
        let drawing_id = self.next_drawing;
        self.next_drawing += 1;

        let markup = drawing_xml(&rel_id, drawing_id, &file_name, width_px, height_px);
        self.images.push(EmbeddedImage {
            rel_id,
            file_name,
            extension,
            mime: format.to_mime_type(),
            bytes,
        });
        markup
    }

    /// Writes media parts, relationships and content types for the images
    /// embedded into `part_name`.
    pub fn apply(self, package: &mut DocxPackage, part_name: &str) -> Result<(), RenderError> {
        if self.images.is_empty() {
            return Ok(());
        }

        let rels_name = relationships_part(part_name);
        let mut rels = package
            .part_text(&rels_name)?
            .unwrap_or(EMPTY_RELATIONSHIPS)
            .to_string();
        let mut content_types = package
            .part_text(CONTENT_TYPES)?
            .map(str::to_string);

        for image in self.images {
            let relationship = format!(
                r#"<Relationship Id="{}" Type="{}" Target="media/{}"/>"#,
                image.rel_id, IMAGE_RELATIONSHIP, image.file_name
            );
            insert_before(&mut rels, "</Relationships>", &relationship);

            if let Some(types) = content_types.as_mut() {
                let declared = format!(r#"extension="{}""#, image.extension);
                if !types.to_ascii_lowercase().contains(&declared) {
                    let default = format!(
                        r#"<Default Extension="{}" ContentType="{}"/>"#,
                        image.extension, image.mime
                    );
                    insert_before(types, "</Types>", &default);
                }
            }

            package.set_part(&format!("word/media/{}", image.file_name), image.bytes);
        }

        package.set_part(&rels_name, rels.into_bytes());
        if let Some(types) = content_types {
            package.set_part(CONTENT_TYPES, types.into_bytes());
        }
        Ok(())
    }
}

/// `word/document.xml` -> `word/_rels/document.xml.rels`.
pub(crate) fn relationships_part(part_name: &str) -> String {
    match part_name.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part_name),
    }
}

fn insert_before(xml: &mut String, closing: &str, fragment: &str) {
    match xml.rfind(closing) {
        Some(at) => xml.insert_str(at, fragment),
        None => xml.push_str(fragment),
    }
}

fn max_capture(pattern: &Regex, text: &str) -> u32 {
    pattern
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0)
}

fn drawing_xml(rel_id: &str, drawing_id: u32, file_name: &str, width_px: u32, height_px: u32) -> String {
    let cx = u64::from(width_px) * EMU_PER_PIXEL;
    let cy = u64::from(height_px) * EMU_PER_PIXEL;
    format!(
        concat!(
            r#"<w:drawing>"#,
            r#"<wp:inline distT="0" distB="0" distL="0" distR="0" xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing">"#,
            r#"<wp:extent cx="{cx}" cy="{cy}"/>"#,
            r#"<wp:effectExtent l="0" t="0" r="0" b="0"/>"#,
            r#"<wp:docPr id="{id}" name="Picture {id}"/>"#,
            r#"<wp:cNvGraphicFramePr><a:graphicFrameLocks xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" noChangeAspect="1"/></wp:cNvGraphicFramePr>"#,
            r#"<a:graphic xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">"#,
            r#"<a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:pic xmlns:pic="http://schemas.openxmlformats.org/drawingml/2006/picture">"#,
            r#"<pic:nvPicPr><pic:cNvPr id="0" name="{file}"/><pic:cNvPicPr/></pic:nvPicPr>"#,
            r#"<pic:blipFill><a:blip r:embed="{rel}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"/><a:stretch><a:fillRect/></a:stretch></pic:blipFill>"#,
            r#"<pic:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm><a:prstGeom prst="rect"><a:avLst/></a:prstGeom></pic:spPr>"#,
            r#"</pic:pic></a:graphicData></a:graphic></wp:inline></w:drawing>"#
        ),
        cx = cx,
        cy = cy,
        id = drawing_id,
        file = file_name,
        rel = rel_id,
    )
}

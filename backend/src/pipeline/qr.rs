//! Turns the record's `qrCode` value into embeddable image bytes.
//!
//! A missing or broken QR code never stops a contract from being produced;
//! every failure here degrades to a document without the image.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::ImageFormat;
use log::{debug, warn};

use super::fetch::{is_http_url, Fetcher};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrImage {
    Resolved(Vec<u8>),
    /// No QR code on the record.
    Absent,
    /// A QR code was given but could not be turned into an image.
    Unavailable(String),
}

pub fn resolve_qr_image(fetcher: &Fetcher, qr_code: Option<&str>) -> QrImage {
    let value = match qr_code.map(str::trim) {
        Some(value) if !value.is_empty() => value,
        _ => return QrImage::Absent,
    };

    let bytes = if is_http_url(value) {
        fetcher.get(value).map_err(|err| err.to_string())
    } else if value.starts_with("data:") {
        decode_data_uri(value)
    } else {
        Err("QR code is neither a URL nor a data URI".to_string())
    };

    match bytes.and_then(check_image) {
        Ok(bytes) => {
            debug!("Resolved QR image ({} bytes)", bytes.len());
            QrImage::Resolved(bytes)
        }
        Err(reason) => {
            warn!("QR image unavailable, continuing without it: {reason}");
            QrImage::Unavailable(reason)
        }
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>, String> {
    let (header, payload) = uri
        .split_once(',')
        .ok_or_else(|| "data URI has no payload".to_string())?;
    if !header.starts_with("data:image/") || !header.ends_with(";base64") {
        return Err(format!("unsupported data URI header `{header}`"));
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|err| format!("invalid base64 payload: {err}"))
}

/// Raster formats Word renders from an inline `a:blip`. Vector or newer
/// formats (SVG, WebP, AVIF) would embed but show up blank.
const EMBEDDABLE_FORMATS: [ImageFormat; 5] = [
    ImageFormat::Png,
    ImageFormat::Jpeg,
    ImageFormat::Gif,
    ImageFormat::Bmp,
    ImageFormat::Tiff,
];

fn check_image(bytes: Vec<u8>) -> Result<Vec<u8>, String> {
    let format = image::guess_format(&bytes)
        .map_err(|_| "QR payload is not a recognizable raster image".to_string())?;
    if EMBEDDABLE_FORMATS.contains(&format) {
        Ok(bytes)
    } else {
        Err(format!("QR image format {format:?} cannot be embedded in DOCX"))
    }
}

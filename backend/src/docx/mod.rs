//! DOCX templating: package I/O, tag compilation, rendering and image
//! injection.

mod compile;
pub mod engine;
pub mod error;
pub mod media;
pub mod package;
mod xml;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{TemplateEngine, TemplateOptions};
pub use error::{PackageError, RenderError};
pub use media::ImageResolver;
pub use package::{DocxPackage, DOCX_MIME};

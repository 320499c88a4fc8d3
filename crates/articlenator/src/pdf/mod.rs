//! PDF rendering for e-readers.

mod generator;
mod template;

pub use generator::{ChromePrinter, PdfGenerator, PdfPrinter, MAX_CONTENT_SIZE};
pub use template::{document_title, pdf_filename, render_document, slugify, EREADER_CSS, MAX_SLUG_LENGTH};

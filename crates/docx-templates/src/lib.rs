//! Docx Templates
//!
//! Renders Word (.docx) templates whose text carries handlebars merge fields.
//! A template is loaded once: its XML parts are normalised so that merge fields
//! split across Word runs become contiguous, then compiled into a shared
//! engine. Every render produces a new .docx with the fields substituted.
//!
//! # Example
//!
//! ```no_run
//! use docx_templates::{DocxTemplate, MergeEngine};
//! use serde_json::json;
//!
//! let mut engine = MergeEngine::new();
//! let template = DocxTemplate::open(&mut engine, "templates/ISR1.docx")?;
//! template.render_to_file(&engine, &json!({ "folio": "A/0001" }), "out/ISR1_1.docx")?;
//! # Ok::<(), docx_templates::DocxError>(())
//! ```

mod engine;
mod error;
pub mod package;
mod runs;
mod template;

pub use engine::MergeEngine;
pub use error::DocxError;
pub use runs::{join_split_fields, merge_field_names};
pub use template::DocxTemplate;

pub type Result<T> = std::result::Result<T, DocxError>;

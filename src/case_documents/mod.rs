//! Case document generation
//!
//! Given a case id, produce a zip of every legal document the case type
//! requires, one folder per folio:
//!
//! ```text
//! doc_<caseId>_<millis>/
//!   <folio>/ISR1_1.docx
//!   <folio>/SH13_1_1.docx
//!   <folio>/Annexure_D/Annexure_D_1.docx
//!   <folio>/ISR5/ISR5_1.docx
//! ```
//!
//! The pipeline runs resolvers → assembler → dispatch/renderer → archiver,
//! driven by [`CaseDocumentService::generate`].

pub mod archiver;
pub mod assembler;
pub mod catalog;
pub mod dispatch;
mod number_words;
pub mod renderer;
pub mod resolvers;
mod service;

pub use archiver::archive_directory;
pub use assembler::{assemble, CaseSnapshot, FolioSnapshot, RenderingContext};
pub use catalog::{BundleDef, TemplateCatalog, TemplateDef, TemplateId, TemplateVariant};
pub use dispatch::{duplicate_variant, plan_jobs, Instancing, RenderJob};
pub use number_words::number_in_words;
pub use renderer::{FolioRenderReport, RenderFailure, TemplateLibrary};
pub use resolvers::{parse_id_list, ParsedIdList};
pub use service::{CaseDocumentService, GenerationOutcome, FAILURE_MANIFEST};

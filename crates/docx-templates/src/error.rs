//! Errors raised while loading or rendering a .docx template

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocxError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid .docx container: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Template is missing required part '{0}'")]
    MissingPart(String),

    #[error("Part '{part}' is not valid UTF-8")]
    Encoding { part: String },

    #[error("Unclosed merge field in part '{part}' near '{snippet}'")]
    UnclosedMergeField { part: String, snippet: String },

    #[error("Malformed merge fields in part '{part}': {message}")]
    Syntax { part: String, message: String },

    #[error("Failed to render part '{part}': {message}")]
    Render { part: String, message: String },
}

//! Loaded .docx templates

use std::collections::{BTreeSet, HashMap};
use std::io::{Cursor, Read, Write};
use std::path::Path;

use serde_json::Value;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::engine::MergeEngine;
use crate::error::DocxError;
use crate::runs::{join_split_fields, merge_field_names};

const MAIN_PART: &str = "word/document.xml";

#[derive(Debug, Clone)]
struct Entry {
    name: String,
    is_dir: bool,
    bytes: Vec<u8>,
}

/// A .docx template held in memory, ready to render any number of times.
///
/// Its mergeable parts are compiled into the [`MergeEngine`] it was loaded
/// with, and it must be rendered with that same engine.
#[derive(Debug, Clone)]
pub struct DocxTemplate {
    source: String,
    entries: Vec<Entry>,
    /// Normalised XML of every part that may carry merge fields
    parts: HashMap<String, String>,
}

/// Registry name of one part of a template
fn part_key(source: &str, part: &str) -> String {
    format!("{}#{}", source, part)
}

/// Parts of a WordprocessingML package that can hold merge fields
fn is_mergeable_part(name: &str) -> bool {
    let Some(file) = name.strip_prefix("word/") else {
        return false;
    };
    if file.contains('/') || !file.ends_with(".xml") {
        return false;
    }
    file == "document.xml"
        || file.starts_with("header")
        || file.starts_with("footer")
        || file == "footnotes.xml"
        || file == "endnotes.xml"
}

impl DocxTemplate {
    /// Load a template from disk
    pub fn open(engine: &mut MergeEngine, path: impl AsRef<Path>) -> Result<Self, DocxError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        Self::from_bytes(engine, path.display().to_string(), &bytes)
    }

    /// Load a template from raw .docx bytes, registering its parts with `engine`
    pub fn from_bytes(
        engine: &mut MergeEngine,
        source: impl Into<String>,
        bytes: &[u8],
    ) -> Result<Self, DocxError> {
        let source = source.into();
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;
        let mut entries = Vec::with_capacity(archive.len());
        let mut parts = HashMap::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            let name = file.name().to_string();

            if file.is_dir() {
                entries.push(Entry {
                    name,
                    is_dir: true,
                    bytes: Vec::new(),
                });
                continue;
            }

            let mut contents = Vec::new();
            file.read_to_end(&mut contents)?;

            if is_mergeable_part(&name) {
                let xml = String::from_utf8(contents.clone())
                    .map_err(|_| DocxError::Encoding { part: name.clone() })?;
                let joined = join_split_fields(&name, &xml)?;
                engine.register_part(&part_key(&source, &name), &name, &joined)?;
                parts.insert(name.clone(), joined);
            }

            entries.push(Entry {
                name,
                is_dir: false,
                bytes: contents,
            });
        }

        if !parts.contains_key(MAIN_PART) {
            return Err(DocxError::MissingPart(MAIN_PART.to_string()));
        }

        debug!(
            "Loaded template {} ({} entries, {} mergeable parts)",
            source,
            entries.len(),
            parts.len()
        );

        Ok(Self {
            source,
            entries,
            parts,
        })
    }

    /// Where the template was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Top-level merge field names referenced anywhere in the template
    pub fn merge_fields(&self) -> BTreeSet<String> {
        self.parts
            .values()
            .flat_map(|xml| merge_field_names(xml))
            .collect()
    }

    /// Render the template with `data`, returning the new .docx bytes
    pub fn render(&self, engine: &MergeEngine, data: &Value) -> Result<Vec<u8>, DocxError> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                writer.add_directory(entry.name.as_str(), options)?;
                continue;
            }

            writer.start_file(entry.name.as_str(), options)?;
            if self.parts.contains_key(&entry.name) {
                let key = part_key(&self.source, &entry.name);
                if !engine.is_registered(&key) {
                    return Err(DocxError::Render {
                        part: entry.name.clone(),
                        message: format!("{} was loaded with a different engine", self.source),
                    });
                }
                let rendered = engine.render_part(&key, &entry.name, data)?;
                writer.write_all(rendered.as_bytes())?;
            } else {
                writer.write_all(&entry.bytes)?;
            }
        }

        Ok(writer.finish()?.into_inner())
    }

    /// Render the template and write the result to `output`
    pub fn render_to_file(
        &self,
        engine: &MergeEngine,
        data: &Value,
        output: impl AsRef<Path>,
    ) -> Result<(), DocxError> {
        let output = output.as_ref();
        let bytes = self.render(engine, data)?;
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, bytes)?;
        Ok(())
    }
}

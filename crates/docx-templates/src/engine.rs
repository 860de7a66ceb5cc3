//! Merge engine
//!
//! Thin wrapper over a handlebars registry configured for WordprocessingML:
//! values are XML-escaped, embedded newlines become Word line breaks and
//! missing fields render as empty text. Template parts are compiled once when
//! registered and rendered by name afterwards.

use handlebars::{Context, Handlebars, Helper, HelperResult, Output, RenderContext};
use serde_json::Value;

use crate::error::DocxError;

/// Shared handlebars registry used to render every template part
pub struct MergeEngine {
    handlebars: Handlebars<'static>,
}

impl MergeEngine {
    pub fn new() -> Self {
        let mut handlebars = Handlebars::new();
        handlebars.set_strict_mode(false);
        handlebars.register_escape_fn(xml_escape);

        handlebars.register_helper("upper", Box::new(upper_helper));
        handlebars.register_helper("lower", Box::new(lower_helper));
        handlebars.register_helper("checkbox", Box::new(checkbox_helper));
        handlebars.register_helper("default", Box::new(default_helper));

        Self { handlebars }
    }

    /// Compile and register one template part under `name`
    pub(crate) fn register_part(
        &mut self,
        name: &str,
        part: &str,
        xml: &str,
    ) -> Result<(), DocxError> {
        self.handlebars
            .register_template_string(name, xml)
            .map_err(|e| DocxError::Syntax {
                part: part.to_string(),
                message: e.to_string(),
            })
    }

    pub(crate) fn is_registered(&self, name: &str) -> bool {
        self.handlebars.has_template(name)
    }

    /// Render a registered part
    pub(crate) fn render_part(
        &self,
        name: &str,
        part: &str,
        data: &Value,
    ) -> Result<String, DocxError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| DocxError::Render {
                part: part.to_string(),
                message: e.to_string(),
            })
    }
}

impl Default for MergeEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Escape a value for use inside `<w:t>` text
fn xml_escape(data: &str) -> String {
    let mut out = String::with_capacity(data.len());
    for ch in data.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            '\r' => {}
            '\n' => out.push_str(r#"</w:t><w:br/><w:t xml:space="preserve">"#),
            _ => out.push(ch),
        }
    }
    out
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::String(s) => matches!(s.trim().to_ascii_lowercase().as_str(), "yes" | "true" | "y"),
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
        Value::Null => false,
    }
}

fn param_str(h: &Helper, idx: usize) -> String {
    match h.param(idx).map(|p| p.value()) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

// Handlebars helpers

fn upper_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&xml_escape(&param_str(h, 0).to_uppercase()))?;
    Ok(())
}

fn lower_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    out.write(&xml_escape(&param_str(h, 0).to_lowercase()))?;
    Ok(())
}

fn checkbox_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let checked = h.param(0).map(|p| is_truthy(p.value())).unwrap_or(false);
    out.write(if checked { "\u{2611}" } else { "\u{2610}" })?;
    Ok(())
}

fn default_helper(
    h: &Helper,
    _: &Handlebars,
    _: &Context,
    _: &mut RenderContext,
    out: &mut dyn Output,
) -> HelperResult {
    let value = param_str(h, 0);
    let chosen = if value.trim().is_empty() {
        param_str(h, 1)
    } else {
        value
    };
    out.write(&xml_escape(&chosen))?;
    Ok(())
}

//! Template data decoding
//!
//! Reduces whatever the host throws at us (a structured mapping, JSON text,
//! or CasparCG `<templateData>` XML) to a canonical key/value mapping.
//! Malformed input never errors out of this module; it just contributes
//! fewer entries.

use std::collections::HashMap;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A single canonical field value: template data carries strings and flags.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
}

impl FieldValue {
    /// Truthiness in the host's sense: non-empty text, or a set flag.
    pub fn is_truthy(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.is_empty(),
            FieldValue::Flag(b) => *b,
        }
    }

    /// Render the value as the string the control layer works with.
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Text(s) => s.clone(),
            FieldValue::Flag(b) => b.to_string(),
        }
    }
}

/// Canonical template data: unique keys, order irrelevant.
pub type TemplateData = HashMap<String, FieldValue>;

/// A raw payload as injected by the host: either already structured, or a
/// text blob in one of the two supported wire formats.
#[derive(Debug, Clone)]
pub enum Payload {
    Structured(TemplateData),
    Text(String),
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

/// Decode a host payload into canonical template data.
///
/// Structured payloads pass through untouched. Text payloads are tried as
/// strict JSON first, then as `<templateData>` XML. Anything unparseable
/// yields an empty mapping rather than an error.
pub fn decode(payload: &Payload) -> TemplateData {
    match payload {
        Payload::Structured(data) => data.clone(),
        Payload::Text(text) => decode_text(text),
    }
}

fn decode_text(text: &str) -> TemplateData {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => {
            let mut values = TemplateData::new();
            for (key, value) in map {
                match value {
                    Value::String(s) => {
                        values.insert(key, FieldValue::Text(s));
                    }
                    Value::Bool(b) => {
                        values.insert(key, FieldValue::Flag(b));
                    }
                    // The host coerces numbers to strings downstream anyway.
                    Value::Number(n) => {
                        values.insert(key, FieldValue::Text(n.to_string()));
                    }
                    other => {
                        debug!("Dropping non-scalar template value for key {}: {}", key, other);
                    }
                }
            }
            values
        }
        Ok(other) => {
            debug!("Template data parsed as non-object JSON: {}", other);
            TemplateData::new()
        }
        Err(_) => decode_xml(text),
    }
}

/// Exact prefix match on the first 14 bytes, no trimming.
fn has_template_data_marker(text: &str) -> bool {
    text.as_bytes().get(..14) == Some(b"<templateData>".as_slice())
}

fn decode_xml(text: &str) -> TemplateData {
    let mut values = TemplateData::new();
    if !has_template_data_marker(text) {
        return values;
    }

    let mut reader = Reader::from_str(text);
    // State while walking `<componentData id="KEY"><data value="VALUE"/>`.
    let mut current_key: Option<String> = None;
    let mut value_taken = false;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                // Keep whatever we collected so far; a broken tail must not
                // take the earlier entries with it.
                debug!("Stopping template XML scan on parse error: {}", e);
                break;
            }
        };
        match event {
            Event::Start(ref e) | Event::Empty(ref e) => match e.name().as_ref() {
                b"componentData" => {
                    current_key = attribute_value(e, b"id");
                    value_taken = false;
                }
                b"data" if !value_taken => {
                    if let Some(key) = current_key.as_deref() {
                        value_taken = true;
                        let key = key.trim();
                        if let Some(value) = attribute_value(e, b"value") {
                            let value = value.trim();
                            if !key.is_empty() && !value.is_empty() {
                                values.insert(key.to_string(), FieldValue::Text(value.to_string()));
                            }
                        }
                    }
                }
                _ => {}
            },
            Event::End(ref e) if e.name().as_ref() == b"componentData" => {
                current_key = None;
            }
            Event::Eof => break,
            _ => {}
        }
    }
    values
}

fn attribute_value(element: &quick_xml::events::BytesStart<'_>, name: &[u8]) -> Option<String> {
    element
        .try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|attr| attr.unescape_value().ok())
        .map(|value| value.into_owned())
}

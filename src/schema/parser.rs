//! Markup reader for schema description files.
//!
//! A schema file holds any number of `<schema>` blocks, usually wrapped in a
//! single document element:
//!
//! ```xml
//! <gdmschemafile>
//!   <schema>
//!     <key>daemon/TimedLoginEnable</key>
//!     <signature>b</signature>
//!     <default>false</default>
//!   </schema>
//! </gdmschemafile>
//! ```

use crate::error::{Result, SettingsError};
use crate::types::{SchemaEntry, Signature, Value};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashSet;
use std::path::Path;

/// Which child of `<schema>` is currently open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Field {
    Key,
    Signature,
    Default,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"key" => Some(Field::Key),
            b"signature" => Some(Field::Signature),
            b"default" => Some(Field::Default),
            _ => None,
        }
    }
}

/// A `<schema>` block being read.
#[derive(Debug, Default)]
struct PendingSchema {
    key: Option<String>,
    signature: Option<String>,
    default: Option<String>,
}

impl PendingSchema {
    fn slot(&mut self, field: Field) -> &mut Option<String> {
        match field {
            Field::Key => &mut self.key,
            Field::Signature => &mut self.signature,
            Field::Default => &mut self.default,
        }
    }

    fn append(&mut self, field: Field, text: &str) {
        self.slot(field).get_or_insert_with(String::new).push_str(text);
    }

    fn finish(self, root: &str) -> Result<SchemaEntry> {
        let key = match self.key.as_deref().map(str::trim) {
            Some(k) if !k.is_empty() => k,
            _ => {
                return Err(SettingsError::InvalidSchema(
                    "schema block without a key".into(),
                ))
            }
        };
        let key = qualify_key(root, key);

        let tag = self.signature.as_deref().map(str::trim).unwrap_or("");
        let signature = Signature::from_tag(tag).ok_or_else(|| {
            SettingsError::InvalidSchema(format!("{key}: unknown signature {tag:?}"))
        })?;

        let default_value = self.default.unwrap_or_default();
        if let Err(e) = Value::decode(signature, &default_value) {
            return Err(SettingsError::InvalidSchema(format!(
                "{key}: default does not match signature {signature}: {e}"
            )));
        }

        Ok(SchemaEntry::new(key, signature, default_value))
    }
}

/// Join a schema key onto the namespace root.
///
/// Absolute keys are kept as written. An empty root leaves relative keys alone.
pub(crate) fn qualify_key(root: &str, key: &str) -> String {
    if key.starts_with('/') || root.is_empty() {
        return key.to_string();
    }
    format!("{}/{}", root.trim_end_matches('/'), key)
}

fn parse_error(path: &Path, position: usize, message: impl ToString) -> SettingsError {
    SettingsError::SchemaParse {
        path: path.to_path_buf(),
        position,
        message: message.to_string(),
    }
}

/// Read every schema block in `text`, in document order.
///
/// `path` is only used for error messages.
pub(crate) fn parse_schema_markup(
    text: &str,
    path: &Path,
    root: &str,
) -> Result<Vec<SchemaEntry>> {
    // No trimming: string defaults keep their whitespace.
    let mut reader = Reader::from_str(text);

    let mut entries = Vec::new();
    let mut seen = HashSet::new();
    let mut depth = 0usize;
    let mut pending: Option<PendingSchema> = None;
    // Depth of the open <schema>; fields are only its direct children.
    let mut schema_depth = 0usize;
    let mut field: Option<Field> = None;

    loop {
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => return Err(parse_error(path, reader.buffer_position(), e)),
        };

        match event {
            Event::Start(e) => {
                depth += 1;
                let name = e.name();
                if name.as_ref() == b"schema" {
                    if pending.is_some() {
                        let position = reader.buffer_position();
                        return Err(parse_error(path, position, "nested <schema>"));
                    }
                    pending = Some(PendingSchema::default());
                    schema_depth = depth;
                } else if pending.is_some() && depth == schema_depth + 1 {
                    field = Field::from_name(name.as_ref());
                } else {
                    field = None;
                }
            }
            Event::Empty(e) => {
                // `<default/>` is an explicit empty default
                if depth == schema_depth {
                    if let (Some(schema), Some(f)) =
                        (pending.as_mut(), Field::from_name(e.name().as_ref()))
                    {
                        schema.slot(f).get_or_insert_with(String::new);
                    }
                }
            }
            Event::Text(t) => {
                if depth == 0 && !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(parse_error(
                        path,
                        reader.buffer_position(),
                        "text outside of the document element",
                    ));
                }
                if let (Some(schema), Some(f)) = (pending.as_mut(), field) {
                    let text = match t.unescape() {
                        Ok(text) => text,
                        Err(e) => return Err(parse_error(path, reader.buffer_position(), e)),
                    };
                    schema.append(f, &text);
                }
            }
            Event::CData(c) => {
                if let (Some(schema), Some(f)) = (pending.as_mut(), field) {
                    schema.append(f, &String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = e.name();
                if name.as_ref() == b"schema" {
                    if let Some(schema) = pending.take() {
                        let entry = schema.finish(root)?;
                        if !seen.insert(entry.key.clone()) {
                            return Err(SettingsError::InvalidSchema(format!(
                                "duplicate key {}",
                                entry.key
                            )));
                        }
                        entries.push(entry);
                    }
                    field = None;
                } else if Field::from_name(name.as_ref()).is_some() {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if depth != 0 || pending.is_some() {
        return Err(parse_error(path, text.len(), "unexpected end of document"));
    }

    Ok(entries)
}

//! Text-format dump of a layer, in the style of protobuf's text format.
//!
//! Layer fields and the payloads listed in `spec::layer` print with their
//! schema names; anything else prints by field number. Length-delimited
//! values print as a string when they are readable text, as a nested block
//! when they decode as a message, and as a byte count otherwise.

use crate::spec::Layer;
use crate::spec::layer::{self, kind_name, payload_field_is_repeated_int, payload_field_name};
use crate::wire::{Field, FieldValue, RawMessage};
use bytes::Bytes;
use std::fmt::Write;

/// Nested blocks deeper than this print as byte counts.
const MAX_DEPTH: usize = 8;

/// Longest byte string still considered for printing as text.
const MAX_TEXT_LEN: usize = 1024;

pub fn render_layer(layer: &Layer) -> String {
    let mut out = String::new();
    let kind = layer.kind_tag();

    for field in by_tag(layer.raw().fields()) {
        let name = match field.tag {
            layer::NAME => Some("name"),
            layer::INPUT => Some("input"),
            layer::OUTPUT => Some("output"),
            layer::INPUT_TENSOR => Some("inputTensor"),
            layer::OUTPUT_TENSOR => Some("outputTensor"),
            layer::IS_UPDATABLE => Some("isUpdatable"),
            tag if Some(tag) == kind => kind_name(tag),
            _ => None,
        };

        match (&field.value, kind) {
            (FieldValue::Bytes(b), Some(k)) if field.tag == k => {
                let label = label(name, field.tag);
                match RawMessage::decode(b.clone()) {
                    Ok(payload) => {
                        let _ = writeln!(out, "{} {{", label);
                        write_message(&mut out, &payload, 1, &|tag| payload_field_name(k, tag), &|tag| {
                            payload_field_is_repeated_int(k, tag)
                        });
                        let _ = writeln!(out, "}}");
                    }
                    Err(_) => {
                        let _ = writeln!(out, "{}: <{} bytes>", label, b.len());
                    }
                }
            }
            (FieldValue::Bytes(b), _)
                if matches!(field.tag, layer::NAME | layer::INPUT | layer::OUTPUT) =>
            {
                let _ = writeln!(out, "{}: {:?}", label(name, field.tag), String::from_utf8_lossy(b));
            }
            (FieldValue::Varint(v), _) if field.tag == layer::IS_UPDATABLE => {
                let _ = writeln!(out, "isUpdatable: {}", *v != 0);
            }
            _ => write_field(&mut out, field, 0, &|_| name, &|_| false),
        }
    }
    out
}

/// Text format prints fields by number; repeated fields keep their order.
fn by_tag(fields: &[Field]) -> Vec<&Field> {
    let mut sorted: Vec<&Field> = fields.iter().collect();
    sorted.sort_by_key(|f| f.tag);
    sorted
}

fn label(name: Option<&str>, tag: u32) -> String {
    name.map_or_else(|| tag.to_string(), str::to_string)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn write_message(
    out: &mut String,
    msg: &RawMessage,
    depth: usize,
    names: &dyn Fn(u32) -> Option<&'static str>,
    repeated_int: &dyn Fn(u32) -> bool,
) {
    for field in by_tag(msg.fields()) {
        write_field(out, field, depth, names, repeated_int);
    }
}

fn write_field(
    out: &mut String,
    field: &Field,
    depth: usize,
    names: &dyn Fn(u32) -> Option<&'static str>,
    repeated_int: &dyn Fn(u32) -> bool,
) {
    let label = label(names(field.tag), field.tag);
    match &field.value {
        FieldValue::Varint(v) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: {}", label, v);
        }
        FieldValue::Fixed64(v) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: 0x{:016x}", label, v);
        }
        FieldValue::Fixed32(v) => {
            indent(out, depth);
            let _ = writeln!(out, "{}: 0x{:08x}", label, v);
        }
        FieldValue::Bytes(b) if repeated_int(field.tag) => {
            match crate::wire::parse::decode_packed_varints(b.clone()) {
                Ok(values) => {
                    for v in values {
                        indent(out, depth);
                        let _ = writeln!(out, "{}: {}", label, v);
                    }
                }
                Err(_) => {
                    indent(out, depth);
                    let _ = writeln!(out, "{}: <{} bytes>", label, b.len());
                }
            }
        }
        FieldValue::Bytes(b) => write_bytes(out, &label, b, depth),
    }
}

fn write_bytes(out: &mut String, label: &str, b: &Bytes, depth: usize) {
    if let Some(text) = readable_text(b) {
        indent(out, depth);
        let _ = writeln!(out, "{}: {:?}", label, text);
        return;
    }

    if depth < MAX_DEPTH {
        if let Ok(nested) = RawMessage::decode(b.clone()) {
            indent(out, depth);
            let _ = writeln!(out, "{} {{", label);
            write_message(out, &nested, depth + 1, &|_| None, &|_| false);
            indent(out, depth);
            let _ = writeln!(out, "}}");
            return;
        }
    }

    indent(out, depth);
    let _ = writeln!(out, "{}: <{} bytes>", label, b.len());
}

/// Empty values are left to message decoding, so an empty sub-message prints
/// as an empty block.
fn readable_text(b: &Bytes) -> Option<&str> {
    if b.is_empty() || b.len() > MAX_TEXT_LEN {
        return None;
    }
    let text = std::str::from_utf8(b).ok()?;
    text.chars()
        .all(|c| !c.is_control() || c == '\n' || c == '\t')
        .then_some(text)
}

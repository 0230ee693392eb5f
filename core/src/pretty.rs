//! Tab-indented JSON for failure messages.

use serde::de::IgnoredAny;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

const INDENT: &[u8] = b"\t";

/// Serialize `value` as JSON indented with one tab per level.
pub fn to_pretty_string<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let mut ser = Serializer::with_formatter(&mut buf, PrettyFormatter::with_indent(INDENT));
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Re-indent a raw body if it is JSON, otherwise return it untouched.
///
/// Only whitespace between tokens changes: number literals, string escapes,
/// key order and duplicate keys come through exactly as the server sent them.
pub fn indent_raw(raw: &[u8]) -> String {
    if serde_json::from_slice::<IgnoredAny>(raw).is_err() {
        return String::from_utf8_lossy(raw).into_owned();
    }
    String::from_utf8_lossy(&reindent(raw)).into_owned()
}

/// Rewrite the whitespace of an already validated JSON document.
fn reindent(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() * 2);
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    // Set right after `{` or `[`; the newline is held back so empty
    // containers stay `{}` and `[]`.
    let mut just_opened = false;

    for &b in raw {
        if in_string {
            out.push(b);
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        if matches!(b, b' ' | b'\t' | b'\n' | b'\r') {
            continue;
        }

        let opened = std::mem::take(&mut just_opened);
        let closing = matches!(b, b'}' | b']');
        if opened && !closing {
            newline(&mut out, depth);
        }

        match b {
            b'"' => {
                in_string = true;
                out.push(b);
            }
            b'{' | b'[' => {
                out.push(b);
                depth += 1;
                just_opened = true;
            }
            b'}' | b']' => {
                depth = depth.saturating_sub(1);
                if !opened {
                    newline(&mut out, depth);
                }
                out.push(b);
            }
            b',' => {
                out.push(b);
                newline(&mut out, depth);
            }
            b':' => out.extend_from_slice(b": "),
            _ => out.push(b),
        }
    }
    out
}

fn newline(out: &mut Vec<u8>, depth: usize) {
    out.push(b'\n');
    for _ in 0..depth {
        out.extend_from_slice(INDENT);
    }
}

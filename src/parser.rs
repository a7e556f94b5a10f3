//! IR text → ADT.
//!
//! The grammar is driven straight off serde_json's token stream: a visitor
//! looks at the first element of every array (the tag) and decides the shape
//! from it, so parsing is single pass with one element of lookahead. Objects
//! are accepted both as `{"type": T, "fields": [...]}` and as the tagged array
//! `["object", T, ...]` that [`crate::render`] emits.
//!
//! Errors carry a JSON path (via `serde_path_to_error`) plus line/column.

use std::fmt;

use serde::Deserialize;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

use crate::Result;
use crate::error::CodecError;
use crate::ir::{Call, Number, Object, Value};

/// Parse one IR document.
pub fn parse(text: &str) -> Result<Value> {
    read_document(serde_json::Deserializer::from_str(text))
}

/// Parse one IR document from raw wire bytes. Invalid UTF-8 is malformed IR.
pub fn parse_slice(bytes: &[u8]) -> Result<Value> {
    read_document(serde_json::Deserializer::from_slice(bytes))
}

// Nesting is bounded by memory only: serde_json's depth limit is off and
// serde_stacker grows the stack on demand while the visitor recurses.
fn read_document<'de, R>(mut de: serde_json::Deserializer<R>) -> Result<Value>
where
    R: serde_json::de::Read<'de>,
{
    de.disable_recursion_limit();
    let stacked = serde_stacker::Deserializer::new(&mut de);
    let value = serde_path_to_error::deserialize::<_, Value>(stacked).map_err(with_path)?;
    de.end().map_err(|err| malformed(String::from("."), err))?;
    Ok(value)
}

fn with_path(err: serde_path_to_error::Error<serde_json::Error>) -> CodecError {
    let path = err.path().to_string();
    malformed(path, err.into_inner())
}

fn malformed(path: String, err: serde_json::Error) -> CodecError {
    // serde_json appends " at line L column C"; we report those separately.
    let message = err.to_string();
    let message = match message.rsplit_once(" at line ") {
        Some((head, _)) if err.line() > 0 => head.to_string(),
        _ => message,
    };
    CodecError::MalformedIr {
        path,
        line: err.line(),
        column: err.column(),
        message,
    }
}

// ————————————————————————————————————————————————————————————————————————————
// GRAMMAR
// ————————————————————————————————————————————————————————————————————————————

/// Leading element of a tagged array.
#[derive(Deserialize)]
#[serde(rename_all = "lowercase")]
enum Tag {
    List,
    Untyped,
    Object,
    Call,
}

#[derive(Deserialize)]
#[serde(field_identifier, rename_all = "lowercase")]
enum ObjectKey {
    Type,
    Fields,
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(ValueVisitor)
    }
}

struct ValueVisitor;

impl<'de> Visitor<'de> for ValueVisitor {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(
            "an IR expression: {\"type\": .., \"fields\": [..]}, \
             [\"list\" | \"untyped\" | \"object\" | \"call\", ..], \
             a string, a number, true, false or null",
        )
    }

    fn visit_bool<E: de::Error>(self, b: bool) -> std::result::Result<Value, E> {
        Ok(Value::Bool(b))
    }

    // Every wire number is a float.
    fn visit_i64<E: de::Error>(self, i: i64) -> std::result::Result<Value, E> {
        Ok(Value::Number(Number::Float(i as f64)))
    }

    fn visit_u64<E: de::Error>(self, u: u64) -> std::result::Result<Value, E> {
        Ok(Value::Number(Number::Float(u as f64)))
    }

    fn visit_f64<E: de::Error>(self, x: f64) -> std::result::Result<Value, E> {
        Ok(Value::Number(Number::Float(x)))
    }

    fn visit_str<E: de::Error>(self, s: &str) -> std::result::Result<Value, E> {
        Ok(Value::String(s.to_owned()))
    }

    fn visit_string<E: de::Error>(self, s: String) -> std::result::Result<Value, E> {
        Ok(Value::String(s))
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> std::result::Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let tag: Tag = seq
            .next_element()?
            .ok_or_else(|| de::Error::custom("empty array: expected a leading tag"))?;

        match tag {
            Tag::List => Ok(Value::List(remaining(&mut seq)?)),
            Tag::Untyped => Ok(Value::Object(Object::untyped(remaining(&mut seq)?))),
            Tag::Object => {
                let typename: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::custom("`object` is missing its type name"))?;
                Ok(Value::Object(Object::new(typename, remaining(&mut seq)?)))
            }
            Tag::Call => {
                let fname: String = seq
                    .next_element()?
                    .ok_or_else(|| de::Error::custom("`call` is missing its function name"))?;
                let args = call_part(&mut seq, "positional")?;
                let kwargs = call_part(&mut seq, "keyword")?;
                if seq.next_element::<IgnoredAny>()?.is_some() {
                    return Err(de::Error::custom(
                        "`call` takes exactly a name, positional and keyword arguments",
                    ));
                }
                Ok(Value::from(Call::new(fname, args, kwargs)))
            }
        }
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut typename: Option<String> = None;
        let mut fields: Option<Vec<Value>> = None;
        while let Some(key) = map.next_key::<ObjectKey>()? {
            match key {
                ObjectKey::Type => {
                    if typename.is_some() {
                        return Err(de::Error::duplicate_field("type"));
                    }
                    typename = Some(map.next_value()?);
                }
                ObjectKey::Fields => {
                    if fields.is_some() {
                        return Err(de::Error::duplicate_field("fields"));
                    }
                    fields = Some(map.next_value()?);
                }
            }
        }
        let typename = typename.ok_or_else(|| de::Error::missing_field("type"))?;
        let fields = fields.ok_or_else(|| de::Error::missing_field("fields"))?;
        Ok(Value::Object(Object::new(typename, fields)))
    }
}

fn remaining<'de, A>(seq: &mut A) -> std::result::Result<Vec<Value>, A::Error>
where
    A: SeqAccess<'de>,
{
    let mut out = Vec::with_capacity(seq.size_hint().unwrap_or(0));
    while let Some(v) = seq.next_element()? {
        out.push(v);
    }
    Ok(out)
}

fn call_part<'de, A>(seq: &mut A, which: &str) -> std::result::Result<Object, A::Error>
where
    A: SeqAccess<'de>,
{
    match seq.next_element::<Value>()? {
        Some(Value::Object(o)) => Ok(o),
        Some(other) => Err(de::Error::custom(format!(
            "`call` {which} arguments must be an object, got {}",
            other.shape_name()
        ))),
        None => Err(de::Error::custom(format!("`call` is missing its {which} arguments"))),
    }
}

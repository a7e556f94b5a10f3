//! ADT → IR text.
//!
//! Objects always come out in the tagged-array form (`["object", T, ...]` or
//! `["untyped", ...]`). Numbers always come out as float literals; NaN and
//! infinities have none and are refused.

use serde::ser::{Error as _, Serialize, SerializeSeq, Serializer};

use crate::Result;
use crate::error::CodecError;
use crate::ir::{Call, Object, Value};

/// Render a value as wire text.
pub fn render(v: &Value) -> Result<String> {
    serde_json::to_string(v).map_err(|e| CodecError::UnrepresentableValue(e.to_string()))
}

/// Render a value as wire bytes, ready for a request body.
pub fn render_bytes(v: &Value) -> Result<Vec<u8>> {
    serde_json::to_vec(v).map_err(|e| CodecError::UnrepresentableValue(e.to_string()))
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            // int → float normalization happens here and nowhere else
            Value::Number(n) => {
                let x = n.as_f64();
                if !x.is_finite() {
                    return Err(S::Error::custom(format!("{x} has no float literal on the wire")));
                }
                serializer.serialize_f64(x)
            }
            Value::String(s) => serializer.serialize_str(s),
            Value::Object(o) => o.serialize(serializer),
            Value::List(xs) => {
                let mut seq = serializer.serialize_seq(Some(xs.len() + 1))?;
                seq.serialize_element("list")?;
                for x in xs {
                    seq.serialize_element(x)?;
                }
                seq.end()
            }
            Value::Call(c) => c.serialize(serializer),
        }
    }
}

impl Serialize for Object {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if self.is_untyped() {
            let mut seq = serializer.serialize_seq(Some(self.fields.len() + 1))?;
            seq.serialize_element("untyped")?;
            for x in &self.fields {
                seq.serialize_element(x)?;
            }
            seq.end()
        } else {
            let mut seq = serializer.serialize_seq(Some(self.fields.len() + 2))?;
            seq.serialize_element("object")?;
            seq.serialize_element(&self.typename)?;
            for x in &self.fields {
                seq.serialize_element(x)?;
            }
            seq.end()
        }
    }
}

impl Serialize for Call {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut seq = serializer.serialize_seq(Some(4))?;
        seq.serialize_element("call")?;
        seq.serialize_element(&self.fname)?;
        seq.serialize_element(&self.args)?;
        seq.serialize_element(&self.kwargs)?;
        seq.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn integers_render_as_floats() {
        let v = Value::List(vec![3i64.into(), 2.5.into()]);
        assert_eq!(render(&v).unwrap(), r#"["list",3.0,2.5]"#);
    }

    #[test]
    fn non_finite_numbers_are_refused() {
        for x in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let v = Value::List(vec![1.0.into(), x.into()]);
            assert!(matches!(render(&v), Err(CodecError::UnrepresentableValue(_))), "{x}");
            assert!(matches!(render_bytes(&v), Err(CodecError::UnrepresentableValue(_))), "{x}");
        }
    }

    #[test]
    fn objects_render_tagged() {
        let v = Value::Object(Object::new("T", vec![]));
        assert_eq!(render(&v).unwrap(), r#"["object","T"]"#);
        let v = Value::Object(Object::untyped(vec!["a".into(), Value::Null]));
        assert_eq!(render(&v).unwrap(), r#"["untyped","a",null]"#);
    }

    #[test]
    fn call_renders_four_elements() {
        let call = Call::new(
            "greet",
            Object::untyped(vec!["Jugsaw".into()]),
            Object::new("Kw", vec![true.into()]),
        );
        assert_eq!(
            render(&Value::from(call)).unwrap(),
            r#"["call","greet",["untyped","Jugsaw"],["object","Kw",true]]"#
        );
    }

    #[test]
    fn parse_render_round_trip() {
        let docs = [
            r#"{"type":"T","fields":[]}"#,
            r#"["list"]"#,
            r#"{"type":"Main.Person","fields":["Al\"ice", 31, ["list", 1, ["untyped", null, false]]]}"#,
            r#"["call", "f", ["untyped", 1, "x"], {"type":"Kw","fields":[{"type":"JugsawIR.JEnum","fields":["Color","RED",["list","RED","GREEN"]]}]}]"#,
        ];
        for doc in docs {
            let v = parse(doc).unwrap();
            let text = render(&v).unwrap();
            assert_eq!(parse(&text).unwrap(), v, "{doc} → {text}");
        }
    }

    #[test]
    fn bytes_match_text() {
        let v = Value::List(vec!["é".into()]);
        assert_eq!(render_bytes(&v).unwrap(), render(&v).unwrap().into_bytes());
    }
}

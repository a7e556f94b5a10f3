//! ADT → native, structural and lossy.
//!
//! Objects lose their type name and come back as positional tuples; lists
//! come back as sequences. Nothing here reconstructs a named type.

use crate::Result;
use crate::error::CodecError;
use crate::ir::{Number, Value};
use crate::native::Native;
use crate::parser::parse_slice;

pub fn to_native(v: &Value) -> Result<Native> {
    match v {
        Value::Null => Ok(Native::Null),
        Value::Bool(b) => Ok(Native::Bool(*b)),
        Value::Number(Number::Int(i)) => Ok(Native::Int(*i)),
        Value::Number(Number::Float(x)) => Ok(Native::Float(*x)),
        Value::String(s) => Ok(Native::Str(s.clone())),
        Value::Object(o) => {
            o.fields.iter().map(to_native).collect::<Result<_>>().map(Native::Tuple)
        }
        Value::List(xs) => xs.iter().map(to_native).collect::<Result<_>>().map(Native::Seq),
        Value::Call(c) => Err(CodecError::UnrepresentableValue(format!(
            "call to `{}` has no native counterpart",
            c.fname
        ))),
    }
}

/// Decode a result payload straight from wire bytes.
pub fn decode_result(bytes: &[u8]) -> Result<Native> {
    to_native(&parse_slice(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{Call, Object};

    #[test]
    fn objects_become_tuples() {
        let v = Value::Object(Object::new(
            "Main.Person",
            vec!["Alice".into(), 31.0.into(), Value::List(vec![true.into(), Value::Null])],
        ));
        assert_eq!(
            to_native(&v).unwrap(),
            Native::Tuple(vec![
                Native::from("Alice"),
                Native::Float(31.0),
                Native::Seq(vec![Native::Bool(true), Native::Null]),
            ])
        );
    }

    #[test]
    fn typenames_are_discarded() {
        let a = Value::Object(Object::new("A", vec![1.0.into()]));
        let b = Value::Object(Object::new("B", vec![1.0.into()]));
        assert_ne!(a, b);
        assert_eq!(to_native(&a).unwrap(), to_native(&b).unwrap());
    }

    #[test]
    fn empty_aggregates() {
        assert_eq!(to_native(&Value::List(vec![])).unwrap(), Native::Seq(vec![]));
        assert_eq!(
            to_native(&Value::Object(Object::untyped(vec![]))).unwrap(),
            Native::Tuple(vec![])
        );
    }

    #[test]
    fn decodes_wire_bytes() {
        let wire = br#"["list", {"type": "Base.Complex{Core.Float64}", "fields": [1, 0]}]"#;
        let v = decode_result(wire).unwrap();
        let one = Native::Tuple(vec![Native::Float(1.0), Native::Float(0.0)]);
        assert_eq!(v, Native::Seq(vec![one]));
        assert!(matches!(decode_result(b"[\"list\""), Err(CodecError::MalformedIr { .. })));
    }

    #[test]
    fn calls_are_unrepresentable() {
        let call = Value::Object(Object::untyped(vec![Value::from(Call::new(
            "f",
            Object::untyped(vec![]),
            Object::untyped(vec![]),
        ))]));
        assert!(matches!(to_native(&call), Err(CodecError::UnrepresentableValue(_))));
    }
}

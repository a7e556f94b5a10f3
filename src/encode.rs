//! Native → ADT, directed by an exemplar.
//!
//! A native value alone does not say which wire shape it must take (a Rust
//! `Vec` may be a list or an array object, a string may be an enum member).
//! The exemplar, a previously observed IR value for the same parameter,
//! supplies that. It is only read, never modified.
//!
//! Dispatch order, first match wins:
//!
//! 1. string + enum exemplar      → enum object, members copied from the exemplar
//! 2. null / bool / number / string → passed through
//! 3. dictionary                   → dict object wrapping a list of pairs
//! 4. sequence                     → list or array object, per the exemplar
//! 5. n-d array                    → array object `(shape, column-major storage)`
//! 6. tuple                        → object with the exemplar's type name
//! 7. enum                         → enum object `(type, member, members)`
//! 8. complex                      → `(re, im)` object
//! 9. anything else                → record object from its enumerated attributes
//!
//! Rules 3-9 need an exemplar.

use crate::Result;
use crate::error::CodecError;
use crate::ir::{Number, Object, ObjectKind, PAIR_TYPE, Value};
use crate::native::{Complex, EnumValue, NdArray, Native, Reflect};

pub fn to_ir(value: &Native, exemplar: Option<&Value>) -> Result<Value> {
    // 1) strings standing for an enum member
    if let (Native::Str(member), Some(Value::Object(demo))) = (value, exemplar) {
        if demo.kind() == ObjectKind::Enum {
            return enum_from_member(member, demo);
        }
    }

    match value {
        // 2) directly representable
        Native::Null => Ok(Value::Null),
        Native::Bool(b) => Ok(Value::Bool(*b)),
        Native::Int(i) => Ok(Value::Number(Number::Int(*i))),
        Native::Float(x) => Ok(Value::Number(Number::Float(*x))),
        Native::Str(s) => Ok(Value::String(s.clone())),

        Native::Dict(pairs) => encode_dict(pairs, require(value, exemplar)?),
        Native::Seq(xs) => encode_seq(xs, require(value, exemplar)?),
        Native::Array(a) => encode_array(a, require(value, exemplar)?),
        Native::Tuple(xs) => encode_fields(xs, object_demo(require(value, exemplar)?, "tuple")?),
        Native::Enum(e) => encode_enum(e, require(value, exemplar)?),
        Native::Complex(c) => encode_complex(c, require(value, exemplar)?),
        Native::Record(r) => encode_record(r.as_ref(), require(value, exemplar)?),
    }
}

// ————————————————————————————————————————————————————————————————————————————
// RULES
// ————————————————————————————————————————————————————————————————————————————

fn enum_from_member(member: &str, demo: &Object) -> Result<Value> {
    let [kind, _, members] = demo.fields.as_slice() else {
        return Err(mismatch("enum", demo, "3 fields (type, member, members)"));
    };
    Ok(Value::Object(Object::new(
        demo.typename.clone(),
        vec![kind.clone(), Value::String(member.to_string()), members.clone()],
    )))
}

fn encode_dict(pairs: &[(Native, Native)], demo: &Value) -> Result<Value> {
    let demo = kind_demo(demo, "dictionary", &[ObjectKind::Dict])?;
    let storage = match demo.fields.as_slice() {
        [Value::List(storage)] => storage,
        _ => return Err(mismatch("dictionary", demo, "a single list of pairs")),
    };

    // every pair is encoded against the first demo pair
    let pair_demo = storage.first().and_then(Value::as_object);
    let pair_type = pair_demo.map_or(PAIR_TYPE, |p| p.typename.as_str());
    let key_demo = pair_demo.and_then(|p| p.field(0));
    let val_demo = pair_demo.and_then(|p| p.field(1));

    let mut keys = Vec::with_capacity(pairs.len());
    let mut encoded = Vec::with_capacity(pairs.len());
    for (k, v) in pairs {
        let key = to_ir(k, key_demo)?;
        if keys.contains(&key) {
            return Err(CodecError::mismatch(format!(
                "dictionary `{}` has the key {key} more than once",
                demo.typename
            )));
        }
        keys.push(key.clone());
        encoded.push(Value::Object(Object::new(pair_type, vec![key, to_ir(v, val_demo)?])));
    }
    Ok(Value::Object(Object::new(demo.typename.clone(), vec![Value::List(encoded)])))
}

fn encode_seq(xs: &[Native], demo: &Value) -> Result<Value> {
    match demo {
        // raw list: per-position templates, the last one repeating
        Value::List(items) => xs
            .iter()
            .enumerate()
            .map(|(i, x)| to_ir(x, items.get(i).or(items.last())))
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        Value::Object(o) if o.kind() == ObjectKind::Array => {
            let (size, storage) = array_parts(o)?;
            if size.len() > 1 {
                // nested rows, outermost axis first
                return encode_array(&NdArray::from_nested(xs, size.len())?, demo);
            }
            let elem_demo = storage.first();
            let elems = xs.iter().map(|x| to_ir(x, elem_demo)).collect::<Result<Vec<_>>>()?;
            Ok(Value::Object(Object::new(
                o.typename.clone(),
                vec![Value::List(vec![count(xs.len())]), Value::List(elems)],
            )))
        }
        // positional fill of a tuple-like or record exemplar
        Value::Object(o) if !matches!(o.kind(), ObjectKind::Dict | ObjectKind::Enum) => {
            encode_fields(xs, o)
        }
        other => Err(CodecError::mismatch(format!(
            "a sequence cannot take the shape of {}",
            other.shape_name()
        ))),
    }
}

fn encode_array(a: &NdArray, demo: &Value) -> Result<Value> {
    let demo = kind_demo(demo, "array", &[ObjectKind::Array])?;
    let (_, storage) = array_parts(demo)?;
    let elem_demo = storage.first();
    let shape = a.shape().iter().map(|&d| count(d)).collect();
    let elems = a
        .column_major()
        .into_iter()
        .map(|x| to_ir(x, elem_demo))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Object(Object::new(
        demo.typename.clone(),
        vec![Value::List(shape), Value::List(elems)],
    )))
}

fn encode_enum(e: &EnumValue, demo: &Value) -> Result<Value> {
    let demo = kind_demo(demo, "enum", &[ObjectKind::Enum])?;
    Ok(Value::Object(Object::new(
        demo.typename.clone(),
        vec![
            Value::String(e.type_name.clone()),
            Value::String(e.member.clone()),
            Value::List(e.members.iter().map(|m| Value::String(m.clone())).collect()),
        ],
    )))
}

fn encode_complex(c: &Complex, demo: &Value) -> Result<Value> {
    let demo = kind_demo(demo, "complex number", &[ObjectKind::Complex])?;
    if demo.fields.len() != 2 {
        return Err(mismatch("complex number", demo, "2 fields (re, im)"));
    }
    Ok(Value::Object(Object::new(
        demo.typename.clone(),
        vec![Value::Number(Number::Float(c.re)), Value::Number(Number::Float(c.im))],
    )))
}

fn encode_record(r: &dyn Reflect, demo: &Value) -> Result<Value> {
    let demo = object_demo(demo, r.type_name())?;
    let attrs = r
        .attributes()
        .ok_or_else(|| CodecError::UnsupportedNativeType(r.type_name().to_string()))?;
    if attrs.len() != demo.fields.len() {
        return Err(CodecError::mismatch(format!(
            "`{}` has {} attribute(s) but exemplar `{}` declares {} field(s)",
            r.type_name(),
            attrs.len(),
            demo.typename,
            demo.fields.len()
        )));
    }
    let fields = attrs
        .iter()
        .zip(&demo.fields)
        .map(|((_, v), d)| to_ir(v, Some(d)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Object(Object::new(demo.typename.clone(), fields)))
}

/// Positional components against the exemplar's fields, same arity.
fn encode_fields(xs: &[Native], demo: &Object) -> Result<Value> {
    if xs.len() != demo.fields.len() {
        return Err(CodecError::mismatch(format!(
            "{} component(s) given but exemplar `{}` has {} field(s)",
            xs.len(),
            demo.typename,
            demo.fields.len()
        )));
    }
    let fields = xs
        .iter()
        .zip(&demo.fields)
        .map(|(x, d)| to_ir(x, Some(d)))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::Object(Object::new(demo.typename.clone(), fields)))
}

// ————————————————————————————————————————————————————————————————————————————
// INTERNAL HELPERS
// ————————————————————————————————————————————————————————————————————————————

fn require<'a>(value: &Native, exemplar: Option<&'a Value>) -> Result<&'a Value> {
    match exemplar {
        None | Some(Value::Null) => {
            Err(CodecError::MissingExemplar(format!("a native {}", value.kind_name())))
        }
        Some(demo) => Ok(demo),
    }
}

fn count(n: usize) -> Value {
    Value::Number(Number::Int(n as i64))
}

fn object_demo<'a>(demo: &'a Value, what: &str) -> Result<&'a Object> {
    demo.as_object().ok_or_else(|| {
        CodecError::mismatch(format!("{what} needs an object exemplar, got {}", demo.shape_name()))
    })
}

fn kind_demo<'a>(demo: &'a Value, what: &str, kinds: &[ObjectKind]) -> Result<&'a Object> {
    let obj = object_demo(demo, what)?;
    if !kinds.contains(&obj.kind()) {
        return Err(CodecError::mismatch(format!(
            "a native {what} cannot take the shape of `{}`",
            obj.typename
        )));
    }
    Ok(obj)
}

fn array_parts(demo: &Object) -> Result<(&[Value], &[Value])> {
    match demo.fields.as_slice() {
        [Value::List(size), Value::List(storage)] => Ok((size, storage)),
        _ => Err(mismatch("array", demo, "2 lists (size, storage)")),
    }
}

fn mismatch(what: &str, demo: &Object, expected: &str) -> CodecError {
    CodecError::mismatch(format!(
        "{what} exemplar `{}` should have {expected}, has {} field(s)",
        demo.typename,
        demo.fields.len()
    ))
}

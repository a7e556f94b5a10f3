// Tagged value tree for IR documents. No serde_json::Value here.

use std::fmt;
use ordered_float::OrderedFloat;

/// Type name carried by anonymous, tuple-like aggregates.
pub const UNTYPED: &str = "unspecified";

/// Wire type names the remote runtime uses for the shapes the encoder knows about.
pub const ENUM_TYPE: &str = "JugsawIR.JEnum";
pub const DICT_TYPE: &str = "JugsawIR.JDict";
pub const ARRAY_TYPE: &str = "JugsawIR.JArray";
pub const PAIR_TYPE: &str = "Core.Pair";

/// Numbers are always floats on the wire. `Int` only exists in memory so the
/// encoder can pass integers through untouched. Equality compares the f64
/// image, so integers beyond 2^53 that share an image compare equal.
#[derive(Debug, Clone, Copy)]
pub enum Number {
    Int(i64),
    Float(f64),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Number),
    String(String),
    Object(Object),
    List(Vec<Value>),
    Call(Box<Call>),
}

/// Named record. Field order is positional and significant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub typename: String,
    pub fields: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub fname: String,
    pub args: Object,   // untyped, positional
    pub kwargs: Object, // field order follows the declared parameter order
}

/// Wire shape of an object, decided once from its type name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Enum,
    Dict,
    Array,
    Tuple,
    Complex,
    Pair,
    Record,
    Untyped,
}

// ————————————————————————————————————————————————————————————————————————————
// NUMBERS
// ————————————————————————————————————————————————————————————————————————————

impl Number {
    pub fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.as_f64()) == OrderedFloat(other.as_f64())
    }
}

impl Eq for Number {}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{i}"),
            Number::Float(x) => write!(f, "{x:?}"),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// OBJECTS
// ————————————————————————————————————————————————————————————————————————————

impl ObjectKind {
    /// Classify a wire type name. Generic parameters (`{...}`) are ignored.
    pub fn of(typename: &str) -> Self {
        if typename == UNTYPED {
            return ObjectKind::Untyped;
        }
        let base = typename.split('{').next().unwrap_or(typename).trim();
        match base {
            ENUM_TYPE => ObjectKind::Enum,
            DICT_TYPE => ObjectKind::Dict,
            ARRAY_TYPE => ObjectKind::Array,
            PAIR_TYPE | "Pair" => ObjectKind::Pair,
            "Core.Tuple" | "Tuple" => ObjectKind::Tuple,
            "Base.Complex" | "Complex" => ObjectKind::Complex,
            _ => ObjectKind::Record,
        }
    }
}

impl Object {
    pub fn new(typename: impl Into<String>, fields: Vec<Value>) -> Self {
        Object { typename: typename.into(), fields }
    }

    pub fn untyped(fields: Vec<Value>) -> Self {
        Object::new(UNTYPED, fields)
    }

    pub fn is_untyped(&self) -> bool {
        self.typename == UNTYPED
    }

    pub fn kind(&self) -> ObjectKind {
        ObjectKind::of(&self.typename)
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }
}

impl Call {
    pub fn new(fname: impl Into<String>, args: Object, kwargs: Object) -> Self {
        Call { fname: fname.into(), args, kwargs }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// VALUES
// ————————————————————————————————————————————————————————————————————————————

impl Value {
    pub fn is_primitive(&self) -> bool {
        matches!(self, Value::Null | Value::Bool(_) | Value::Number(_) | Value::String(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(xs) => Some(xs),
            _ => None,
        }
    }

    pub fn as_call(&self) -> Option<&Call> {
        match self {
            Value::Call(c) => Some(c),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn shape_name(&self) -> String {
        match self {
            Value::Null => "null".into(),
            Value::Bool(_) => "bool".into(),
            Value::Number(_) => "number".into(),
            Value::String(_) => "string".into(),
            Value::Object(o) => format!("object `{}` with {} field(s)", o.typename, o.fields.len()),
            Value::List(xs) => format!("list of {} element(s)", xs.len()),
            Value::Call(c) => format!("call to `{}`", c.fname),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Number(Number::Int(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Number(Number::Float(x))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Call> for Value {
    fn from(c: Call) -> Self {
        Value::Call(Box::new(c))
    }
}

impl From<Vec<Value>> for Value {
    fn from(xs: Vec<Value>) -> Self {
        Value::List(xs)
    }
}

// ————————————————————————————————————————————————————————————————————————————
// HUMAN-READABLE RENDERING
// ————————————————————————————————————————————————————————————————————————————

fn write_joined(f: &mut fmt::Formatter<'_>, xs: &[Value]) -> fmt::Result {
    for (i, x) in xs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{x}")?;
    }
    Ok(())
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.typename)?;
        write_joined(f, &self.fields)?;
        f.write_str(")")
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.fname)?;
        write_joined(f, &self.args.fields)?;
        f.write_str("; ")?;
        write_joined(f, &self.kwargs.fields)?;
        f.write_str(")")
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s:?}"),
            Value::Object(o) => write!(f, "{o}"),
            Value::List(xs) => {
                f.write_str("[")?;
                write_joined(f, xs)?;
                f.write_str("]")
            }
            Value::Call(c) => write!(f, "{c}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_compares_full_field_length() {
        let short = Object::new("T", vec![1.0.into()]);
        let long = Object::new("T", vec![1.0.into(), 2.0.into()]);
        assert_ne!(short, long);
        assert_ne!(long, short);
        assert_eq!(long.clone(), long);
    }

    #[test]
    fn equality_respects_typename_and_order() {
        let a = Object::new("T", vec!["x".into(), "y".into()]);
        let b = Object::new("U", vec!["x".into(), "y".into()]);
        let c = Object::new("T", vec!["y".into(), "x".into()]);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn integers_equal_their_float_image() {
        assert_eq!(Value::from(3i64), Value::from(3.0));
        assert_ne!(Value::from(3i64), Value::from(3.5));
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn number_equality_is_transitive_past_f64_precision() {
        let big = 1i64 << 53;
        let a = Value::from(big + 1);
        let b = Value::from(big as f64);
        let c = Value::from(big);
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(a, c);
    }

    #[test]
    fn display_objects_and_calls() {
        let obj = Object::new("Point", vec![1.0.into(), "a".into()]);
        assert_eq!(obj.to_string(), r#"Point(1.0, "a")"#);

        let call = Call::new(
            "greet",
            Object::untyped(vec!["Jugsaw".into()]),
            Object::new("Kw", vec![true.into()]),
        );
        assert_eq!(Value::from(call).to_string(), r#"greet("Jugsaw"; true)"#);
        assert_eq!(Value::List(vec![]).to_string(), "[]");
    }

    #[test]
    fn classifies_wire_type_names() {
        assert_eq!(ObjectKind::of("JugsawIR.JEnum"), ObjectKind::Enum);
        assert_eq!(ObjectKind::of("JugsawIR.JDict{Core.String, Core.Int64}"), ObjectKind::Dict);
        assert_eq!(ObjectKind::of("JugsawIR.JArray{Core.Float64}"), ObjectKind::Array);
        assert_eq!(ObjectKind::of("Core.Tuple{Core.Int64, Core.String}"), ObjectKind::Tuple);
        assert_eq!(ObjectKind::of("Base.Complex{Core.Float64}"), ObjectKind::Complex);
        assert_eq!(ObjectKind::of("Core.Pair{Core.String, Core.Int64}"), ObjectKind::Pair);
        assert_eq!(ObjectKind::of(UNTYPED), ObjectKind::Untyped);
        assert_eq!(ObjectKind::of("Main.Person"), ObjectKind::Record);
    }
}

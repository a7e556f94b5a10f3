//! Native values on the calling side of the codec.
//!
//! The decoder only ever produces primitives, sequences and tuples. The
//! richer variants exist so callers can hand the encoder values whose wire
//! shape differs from a plain sequence (dictionaries, n-d arrays, enums,
//! complex numbers, user records).

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use ordered_float::OrderedFloat;
use serde_json::{Map, Value as Json};

use crate::Result;
use crate::error::CodecError;

/// Field enumeration for user-defined records.
///
/// The encoder falls back to this for values that are none of the built-in
/// shapes; the attributes are emitted positionally, in the order returned.
pub trait Reflect: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    /// Attribute `(name, value)` pairs in declaration order, or `None` when
    /// this value cannot enumerate its attributes.
    fn attributes(&self) -> Option<Vec<(String, Native)>>;
}

#[derive(Debug, Clone)]
pub enum Native {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<Native>),
    /// Fixed-arity heterogeneous tuple.
    Tuple(Vec<Native>),
    /// Insertion-ordered mapping with unique keys.
    Dict(Vec<(Native, Native)>),
    Array(NdArray),
    Enum(EnumValue),
    Complex(Complex),
    Record(Arc<dyn Reflect>),
}

/// Multi-dimensional array, stored row-major (last axis fastest).
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray {
    shape: Vec<usize>,
    data: Vec<Native>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub type_name: String,
    pub member: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Complex {
    pub re: f64,
    pub im: f64,
}

/// Plain record carrying its own attribute list.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub type_name: String,
    pub fields: Vec<(String, Native)>,
}

// ————————————————————————————————————————————————————————————————————————————
// ARRAYS
// ————————————————————————————————————————————————————————————————————————————

impl NdArray {
    pub fn new(shape: Vec<usize>, data: Vec<Native>) -> Result<Self> {
        let expected = shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d))
            .ok_or_else(|| CodecError::mismatch(format!("array of shape {shape:?} is too large")))?;
        if expected != data.len() {
            return Err(CodecError::mismatch(format!(
                "array of shape {shape:?} needs {expected} element(s), got {}",
                data.len()
            )));
        }
        Ok(NdArray { shape, data })
    }

    /// Build a matrix from its rows; every row must have the same length.
    pub fn from_rows(rows: Vec<Vec<Native>>) -> Result<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
            return Err(CodecError::mismatch(format!(
                "ragged rows: expected {ncols} column(s), found a row of {}",
                bad.len()
            )));
        }
        let shape = vec![rows.len(), ncols];
        NdArray::new(shape, rows.into_iter().flatten().collect())
    }

    /// Build an array from `ndims` levels of nested sequences, outermost
    /// axis first. The nesting must be rectangular.
    pub fn from_nested(rows: &[Native], ndims: usize) -> Result<Self> {
        let mut shape = vec![rows.len()];
        let mut level = rows;
        while shape.len() < ndims {
            match level.first() {
                Some(Native::Seq(inner)) => {
                    shape.push(inner.len());
                    level = inner.as_slice();
                }
                Some(other) => {
                    return Err(CodecError::mismatch(format!(
                        "expected {ndims} levels of nested sequences, \
                         found a native {} at level {}",
                        other.kind_name(),
                        shape.len()
                    )));
                }
                None => shape.push(0),
            }
        }

        let mut data = Vec::new();
        if let Some((&len, inner)) = shape.split_first() {
            flatten_rows(rows, len, inner, &mut data)?;
        }
        NdArray::new(shape, data)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Elements in row-major order, as stored.
    pub fn data(&self) -> &[Native] {
        &self.data
    }

    /// Elements in column-major order: the first axis varies fastest.
    pub fn column_major(&self) -> Vec<&Native> {
        let ndim = self.shape.len();
        let mut strides = vec![1usize; ndim];
        for d in (0..ndim.saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * self.shape[d + 1];
        }
        (0..self.data.len())
            .map(|mut k| {
                let mut offset = 0;
                for d in 0..ndim {
                    offset += (k % self.shape[d]) * strides[d];
                    k /= self.shape[d];
                }
                &self.data[offset]
            })
            .collect()
    }

    fn nested_json(&self, axis: usize, offset: usize) -> Result<Json> {
        if axis == self.shape.len() {
            return self.data[offset].to_json();
        }
        let step: usize = self.shape[axis + 1..].iter().product();
        (0..self.shape[axis])
            .map(|i| self.nested_json(axis + 1, offset + i * step))
            .collect::<Result<Vec<_>>>()
            .map(Json::Array)
    }
}

fn flatten_rows(xs: &[Native], len: usize, inner: &[usize], out: &mut Vec<Native>) -> Result<()> {
    if xs.len() != len {
        return Err(CodecError::mismatch(format!(
            "ragged nesting: expected {len} element(s), found {}",
            xs.len()
        )));
    }
    match inner.split_first() {
        None => out.extend(xs.iter().cloned()),
        Some((&next, rest)) => {
            for x in xs {
                match x {
                    Native::Seq(row) => flatten_rows(row, next, rest, out)?,
                    other => {
                        return Err(CodecError::mismatch(format!(
                            "ragged nesting: expected a sequence, found a native {}",
                            other.kind_name()
                        )));
                    }
                }
            }
        }
    }
    Ok(())
}

// ————————————————————————————————————————————————————————————————————————————
// RECORDS
// ————————————————————————————————————————————————————————————————————————————

impl Record {
    pub fn new(type_name: impl Into<String>) -> Self {
        Record { type_name: type_name.into(), fields: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Native>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }
}

impl Reflect for Record {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn attributes(&self) -> Option<Vec<(String, Native)>> {
        Some(self.fields.clone())
    }
}

impl EnumValue {
    pub fn new<I, S>(type_name: impl Into<String>, member: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnumValue {
            type_name: type_name.into(),
            member: member.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }
}

// ————————————————————————————————————————————————————————————————————————————
// NATIVE
// ————————————————————————————————————————————————————————————————————————————

impl Native {
    pub fn record(r: impl Reflect + 'static) -> Self {
        Native::Record(Arc::new(r))
    }

    /// Values the encoder passes through unchanged.
    pub fn is_direct(&self) -> bool {
        matches!(
            self,
            Native::Null | Native::Bool(_) | Native::Int(_) | Native::Float(_) | Native::Str(_)
        )
    }

    pub fn kind_name(&self) -> &str {
        match self {
            Native::Null => "null",
            Native::Bool(_) => "bool",
            Native::Int(_) => "int",
            Native::Float(_) => "float",
            Native::Str(_) => "string",
            Native::Seq(_) => "sequence",
            Native::Tuple(_) => "tuple",
            Native::Dict(_) => "dictionary",
            Native::Array(_) => "array",
            Native::Enum(_) => "enum",
            Native::Complex(_) => "complex",
            Native::Record(r) => r.type_name(),
        }
    }

    /// Plain JSON → native. Objects become dictionaries in key order;
    /// integral JSON numbers stay integers.
    pub fn from_json(json: &Json) -> Native {
        match json {
            Json::Null => Native::Null,
            Json::Bool(b) => Native::Bool(*b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Native::Int(i),
                None => Native::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Native::Str(s.clone()),
            Json::Array(xs) => Native::Seq(xs.iter().map(Native::from_json).collect()),
            Json::Object(m) => Native::Dict(
                m.iter()
                    .map(|(k, v)| (Native::Str(k.clone()), Native::from_json(v)))
                    .collect(),
            ),
        }
    }

    /// Native → plain JSON, for display. Non-finite floats become `null`.
    pub fn to_json(&self) -> Result<Json> {
        Ok(match self {
            Native::Null => Json::Null,
            Native::Bool(b) => Json::Bool(*b),
            Native::Int(i) => Json::from(*i),
            Native::Float(x) => serde_json::Number::from_f64(*x).map_or(Json::Null, Json::Number),
            Native::Str(s) => Json::String(s.clone()),
            Native::Seq(xs) | Native::Tuple(xs) => {
                Json::Array(xs.iter().map(Native::to_json).collect::<Result<_>>()?)
            }
            Native::Dict(pairs) => {
                if pairs.iter().all(|(k, _)| matches!(k, Native::Str(_))) {
                    let mut m = Map::new();
                    for (k, v) in pairs {
                        if let Native::Str(k) = k {
                            m.insert(k.clone(), v.to_json()?);
                        }
                    }
                    Json::Object(m)
                } else {
                    let rows = pairs
                        .iter()
                        .map(|(k, v)| -> Result<Json> {
                            Ok(Json::Array(vec![k.to_json()?, v.to_json()?]))
                        })
                        .collect::<Result<_>>()?;
                    Json::Array(rows)
                }
            }
            Native::Array(a) => a.nested_json(0, 0)?,
            Native::Enum(e) => Json::String(e.member.clone()),
            Native::Complex(c) => serde_json::json!({ "re": c.re, "im": c.im }),
            Native::Record(r) => {
                let attrs = r
                    .attributes()
                    .ok_or_else(|| CodecError::UnsupportedNativeType(r.type_name().to_string()))?;
                let mut m = Map::new();
                for (k, v) in attrs {
                    m.insert(k, v.to_json()?);
                }
                Json::Object(m)
            }
        })
    }
}

impl PartialEq for Native {
    fn eq(&self, other: &Self) -> bool {
        use Native::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            // numbers compare by their wire (f64) image, like IR numbers
            (Int(a), Int(b)) => OrderedFloat(*a as f64) == OrderedFloat(*b as f64),
            (Int(a), Float(b)) | (Float(b), Int(a)) => OrderedFloat(*a as f64) == OrderedFloat(*b),
            (Float(a), Float(b)) => OrderedFloat(*a) == OrderedFloat(*b),
            (Str(a), Str(b)) => a == b,
            (Seq(a), Seq(b)) | (Tuple(a), Tuple(b)) => a == b,
            (Dict(a), Dict(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Enum(a), Enum(b)) => a == b,
            (Complex(a), Complex(b)) => a == b,
            (Record(a), Record(b)) => {
                Arc::ptr_eq(a, b)
                    || (a.type_name() == b.type_name() && a.attributes() == b.attributes())
            }
            _ => false,
        }
    }
}

impl From<bool> for Native {
    fn from(b: bool) -> Self {
        Native::Bool(b)
    }
}

impl From<i64> for Native {
    fn from(i: i64) -> Self {
        Native::Int(i)
    }
}

impl From<i32> for Native {
    fn from(i: i32) -> Self {
        Native::Int(i64::from(i))
    }
}

impl From<f64> for Native {
    fn from(x: f64) -> Self {
        Native::Float(x)
    }
}

impl From<&str> for Native {
    fn from(s: &str) -> Self {
        Native::Str(s.to_string())
    }
}

impl From<String> for Native {
    fn from(s: String) -> Self {
        Native::Str(s)
    }
}

impl From<Complex> for Native {
    fn from(c: Complex) -> Self {
        Native::Complex(c)
    }
}

impl From<EnumValue> for Native {
    fn from(e: EnumValue) -> Self {
        Native::Enum(e)
    }
}

impl From<NdArray> for Native {
    fn from(a: NdArray) -> Self {
        Native::Array(a)
    }
}

impl From<Record> for Native {
    fn from(r: Record) -> Self {
        Native::record(r)
    }
}

impl<T: Into<Native>> From<Vec<T>> for Native {
    fn from(xs: Vec<T>) -> Self {
        Native::Seq(xs.into_iter().map(Into::into).collect())
    }
}

impl<V: Into<Native>> From<IndexMap<String, V>> for Native {
    fn from(m: IndexMap<String, V>) -> Self {
        Native::Dict(m.into_iter().map(|(k, v)| (Native::Str(k), v.into())).collect())
    }
}

impl<A: Into<Native>, B: Into<Native>> From<(A, B)> for Native {
    fn from((a, b): (A, B)) -> Self {
        Native::Tuple(vec![a.into(), b.into()])
    }
}

impl<A: Into<Native>, B: Into<Native>, C: Into<Native>> From<(A, B, C)> for Native {
    fn from((a, b, c): (A, B, C)) -> Self {
        Native::Tuple(vec![a.into(), b.into(), c.into()])
    }
}

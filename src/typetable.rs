//! Catalog of named structural type definitions shipped with an application.
//!
//! Built once from the descriptor's type-definition object and never mutated
//! afterwards.

use indexmap::IndexMap;

use crate::Result;
use crate::error::CodecError;
use crate::ir::{ObjectKind, Value};

/// Structural definition of one named type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JDataType {
    pub name: String,
    pub fieldnames: Vec<String>,
    /// Parallel to `fieldnames`; each entry describes the field's type,
    /// usually by naming another entry of the table.
    pub fieldtypes: Vec<Value>,
}

/// Entry of the table. Only 3-field `(name, fieldnames, fieldtypes)` objects
/// become data types; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDef {
    Data(JDataType),
    Other(Value),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeTable {
    defs: IndexMap<String, TypeDef>,
}

impl TypeTable {
    pub fn get(&self, name: &str) -> Option<&TypeDef> {
        self.defs.get(name)
    }

    pub fn datatype(&self, name: &str) -> Option<&JDataType> {
        match self.defs.get(name) {
            Some(TypeDef::Data(dt)) => Some(dt),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TypeDef)> {
        self.defs.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Decode the `(types, typedefs)` object of an application descriptor.
pub fn load_typetable(ast: &Value) -> Result<TypeTable> {
    let obj = ast.as_object().ok_or_else(|| {
        CodecError::schema(format!("type table must be an object, got {}", ast.shape_name()))
    })?;
    // `types` (field 0) lists the names again; the association list is authoritative.
    let [_types, typedefs] = obj.fields.as_slice() else {
        return Err(CodecError::schema(format!(
            "type table `{}` must have exactly 2 fields (types, typedefs), got {}",
            obj.typename,
            obj.fields.len()
        )));
    };

    let mut defs = IndexMap::new();
    for (name, value) in assoc_map(typedefs)? {
        let def = match value {
            Value::Object(o) if o.fields.len() == 3 => {
                TypeDef::Data(datatype_from(&name, &o.fields)?)
            }
            other => TypeDef::Other(other),
        };
        defs.insert(name, def);
    }
    Ok(TypeTable { defs })
}

fn datatype_from(key: &str, fields: &[Value]) -> Result<JDataType> {
    let name = fields[0]
        .as_str()
        .ok_or_else(|| CodecError::schema(format!("type `{key}`: name must be a string")))?
        .to_string();
    let fieldnames = string_list(&fields[1]).ok_or_else(|| {
        CodecError::schema(format!("type `{key}`: fieldnames must be a list of strings"))
    })?;
    let fieldtypes = list_items(&fields[2])
        .ok_or_else(|| CodecError::schema(format!("type `{key}`: fieldtypes must be a list")))?
        .to_vec();
    if fieldnames.len() != fieldtypes.len() {
        return Err(CodecError::schema(format!(
            "type `{key}`: {} field name(s) but {} field type(s)",
            fieldnames.len(),
            fieldtypes.len()
        )));
    }
    Ok(JDataType { name, fieldnames, fieldtypes })
}

// ————————————————————————————————————————————————————————————————————————————
// ASSOCIATION LISTS
// ————————————————————————————————————————————————————————————————————————————

/// Items of a list, also accepting an array object `(size, storage)`.
pub(crate) fn list_items(v: &Value) -> Option<&[Value]> {
    match v {
        Value::List(xs) => Some(xs),
        Value::Object(o) if o.kind() == ObjectKind::Array && o.fields.len() == 2 => {
            o.fields[1].as_list()
        }
        _ => None,
    }
}

pub(crate) fn string_list(v: &Value) -> Option<Vec<String>> {
    list_items(v)?
        .iter()
        .map(|x| x.as_str().map(str::to_string))
        .collect()
}

/// Read a string-keyed association list: a list of 2-field `(key, value)`
/// objects, or a dictionary object wrapping one. Order is preserved.
pub(crate) fn assoc_map(v: &Value) -> Result<IndexMap<String, Value>> {
    let pairs: &[Value] = match v {
        Value::List(xs) => xs.as_slice(),
        Value::Object(o) if o.fields.is_empty() => &[],
        Value::Object(o) if o.fields.len() == 1 => o.fields[0].as_list().ok_or_else(|| {
            CodecError::schema(format!("dictionary `{}` must wrap a list of pairs", o.typename))
        })?,
        other => {
            return Err(CodecError::schema(format!(
                "expected an association list, got {}",
                other.shape_name()
            )));
        }
    };

    let mut out = IndexMap::with_capacity(pairs.len());
    for pair in pairs {
        let (key, value) = match pair {
            Value::Object(o) if o.fields.len() == 2 => (&o.fields[0], &o.fields[1]),
            other => {
                return Err(CodecError::schema(format!(
                    "association list entry must be a (key, value) pair, got {}",
                    other.shape_name()
                )));
            }
        };
        let key = key.as_str().ok_or_else(|| {
            CodecError::schema(format!(
                "association list key must be a string, got {}",
                key.shape_name()
            ))
        })?;
        if out.insert(key.to_string(), value.clone()).is_some() {
            return Err(CodecError::schema(format!(
                "association list has the key `{key}` more than once"
            )));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Object;
    use crate::parser::parse;

    const TABLE: &str = r#"{"type": "JugsawIR.TypeTable", "fields": [
        ["list", "Main.Point", "Core.Float64"],
        ["list",
            {"type": "Core.Pair{Core.String, JugsawIR.JDataType}", "fields": ["Main.Point",
                {"type": "JugsawIR.JDataType", "fields": ["Main.Point", ["list", "x", "y"], ["list", "Core.Float64", "Core.Float64"]]}]},
            {"type": "Core.Pair{Core.String, JugsawIR.JDataType}", "fields": ["Core.Float64", "primitive"]}
        ]
    ]}"#;

    #[test]
    fn loads_datatypes_in_order() {
        let tt = load_typetable(&parse(TABLE).unwrap()).unwrap();
        assert_eq!(tt.len(), 2);
        let point = tt.datatype("Main.Point").unwrap();
        assert_eq!(point.name, "Main.Point");
        assert_eq!(point.fieldnames, vec!["x", "y"]);
        assert_eq!(
            point.fieldtypes,
            vec![Value::from("Core.Float64"), Value::from("Core.Float64")]
        );
        assert_eq!(tt.get("Core.Float64"), Some(&TypeDef::Other("primitive".into())));
        let names: Vec<_> = tt.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["Main.Point", "Core.Float64"]);
    }

    #[test]
    fn accepts_dictionary_wrapped_typedefs() {
        let src = r#"{"type": "TT", "fields": [["list"],
            {"type": "JugsawIR.JDict{Core.String, JugsawIR.JDataType}", "fields": [["list",
                {"type": "Core.Pair", "fields": ["Kw", {"type": "JugsawIR.JDataType", "fields": ["Kw", ["list"], ["list"]]}]}
            ]]}
        ]}"#;
        let tt = load_typetable(&parse(src).unwrap()).unwrap();
        assert!(tt.datatype("Kw").unwrap().fieldnames.is_empty());
    }

    #[test]
    fn rejects_bad_shapes() {
        let bad = [
            Value::List(vec![]),
            Value::Object(Object::new("TT", vec![Value::List(vec![])])),
            Value::Object(Object::new("TT", vec![Value::List(vec![]), "nope".into()])),
            Value::Object(Object::new(
                "TT",
                vec![
                    Value::List(vec![]),
                    Value::List(vec![Value::Object(Object::new(
                        "P",
                        vec![1.0.into(), 2.0.into()],
                    ))]),
                ],
            )),
        ];
        for v in bad {
            assert!(matches!(load_typetable(&v), Err(CodecError::Schema(_))), "{v}");
        }
    }

    #[test]
    fn rejects_repeated_keys() {
        let pair = |v: f64| Value::Object(Object::new("Core.Pair", vec!["k".into(), v.into()]));
        let err = assoc_map(&Value::List(vec![pair(1.0), pair(2.0)])).unwrap_err();
        assert!(matches!(err, CodecError::Schema(_)), "{err}");
    }

    #[test]
    fn rejects_unparallel_fields() {
        let src = r#"{"type": "TT", "fields": [["list"], ["list",
            {"type": "Core.Pair", "fields": ["P", {"type": "JugsawIR.JDataType", "fields": ["P", ["list", "a", "b"], ["list", "T"]]}]}
        ]]}"#;
        assert!(matches!(load_typetable(&parse(src).unwrap()), Err(CodecError::Schema(_))));
    }
}

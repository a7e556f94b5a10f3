//! Application descriptors: method catalog, call encoding, catalog swaps.
//!
//! A descriptor is a two-element list `[application, type table]`. The
//! application object is `(name, method_names, method_demos)` where
//! `method_demos` maps each method name to a `(call, result, meta)` demo. The
//! demo call's arguments become the exemplars the encoder works against.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::Result;
use crate::encode::to_ir;
use crate::error::CodecError;
use crate::ir::{Call, Object, ObjectKind, Value};
use crate::native::Native;
use crate::parser::parse;
use crate::render::render;
use crate::typetable::{TypeTable, assoc_map, load_typetable, string_list};

/// One remote function, as advertised by its demo. Read-only once loaded.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodRecord {
    fname: String,
    args: Vec<Value>,
    kwargs_type: String,
    kwargs: IndexMap<String, Value>,
    result: Value,
    meta: IndexMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct App {
    name: String,
    methods: IndexMap<String, MethodRecord>,
    type_table: TypeTable,
}

/// Shared handle to the currently loaded catalog.
///
/// Readers take a snapshot; a reload builds the new catalog off to the side
/// and swaps it in whole.
#[derive(Debug)]
pub struct AppHandle {
    current: RwLock<Arc<App>>,
}

// ————————————————————————————————————————————————————————————————————————————
// LOADING
// ————————————————————————————————————————————————————————————————————————————

pub fn load_app(text: &str) -> Result<App> {
    let root = parse(text)?;
    let parts: &[Value] = match &root {
        Value::List(xs) => xs,
        Value::Object(o) if o.kind() == ObjectKind::Untyped => &o.fields,
        other => {
            return Err(CodecError::schema(format!(
                "descriptor must be a list of (application, type table), got {}",
                other.shape_name()
            )));
        }
    };
    let [application, types] = parts else {
        return Err(CodecError::schema(format!(
            "descriptor must have exactly 2 elements (application, type table), got {}",
            parts.len()
        )));
    };

    let type_table = load_typetable(types)?;

    let application = application.as_object().ok_or_else(|| {
        CodecError::schema(format!(
            "application must be an object, got {}",
            application.shape_name()
        ))
    })?;
    let [name, method_names, method_demos] = application.fields.as_slice() else {
        return Err(CodecError::schema(format!(
            "application `{}` must have 3 fields (name, method_names, method_demos), got {}",
            application.typename,
            application.fields.len()
        )));
    };
    let name = name
        .as_str()
        .ok_or_else(|| CodecError::schema("application name must be a string"))?
        .to_string();
    let method_names = string_list(method_names)
        .ok_or_else(|| CodecError::schema("method_names must be a list of strings"))?;
    let mut demos = assoc_map(method_demos)?;

    let mut methods = IndexMap::with_capacity(method_names.len());
    for fname in method_names {
        if methods.contains_key(&fname) {
            return Err(CodecError::schema(format!("method `{fname}` is declared twice")));
        }
        let demo = demos.swap_remove(&fname).ok_or_else(|| {
            CodecError::schema(format!("method `{fname}` is declared but has no demo"))
        })?;
        let record = MethodRecord::from_demo(&fname, &demo, &type_table)?;
        methods.insert(fname, record);
    }

    Ok(App { name, methods, type_table })
}

impl MethodRecord {
    fn from_demo(fname: &str, demo: &Value, type_table: &TypeTable) -> Result<Self> {
        let fields = match demo {
            Value::Object(o) if o.fields.len() == 3 => &o.fields,
            other => {
                return Err(CodecError::schema(format!(
                    "demo of `{fname}` must be a (call, result, meta) object, got {}",
                    other.shape_name()
                )));
            }
        };
        let call = demo_call(fname, &fields[0])?;

        let kwargs = if call.kwargs.fields.is_empty() {
            IndexMap::new()
        } else {
            let decl = type_table.datatype(&call.kwargs.typename).ok_or_else(|| {
                CodecError::schema(format!(
                    "keyword arguments of `{fname}` have type `{}`, \
                     which the type table does not define",
                    call.kwargs.typename
                ))
            })?;
            if decl.fieldnames.len() != call.kwargs.fields.len() {
                return Err(CodecError::schema(format!(
                    "`{}` declares {} keyword argument(s), demo of `{fname}` supplies {}",
                    decl.name,
                    decl.fieldnames.len(),
                    call.kwargs.fields.len()
                )));
            }
            decl.fieldnames
                .iter()
                .cloned()
                .zip(call.kwargs.fields.iter().cloned())
                .collect()
        };

        let meta = match &fields[2] {
            Value::Null => IndexMap::new(),
            other => assoc_map(other)?,
        };

        Ok(MethodRecord {
            fname: fname.to_string(),
            args: call.args.fields,
            kwargs_type: call.kwargs.typename,
            kwargs,
            result: fields[1].clone(),
            meta,
        })
    }

    pub fn fname(&self) -> &str {
        &self.fname
    }

    /// Positional argument exemplars.
    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// Named argument exemplars, in declaration order.
    pub fn kwargs(&self) -> &IndexMap<String, Value> {
        &self.kwargs
    }

    pub fn input(&self) -> (&[Value], &IndexMap<String, Value>) {
        (&self.args, &self.kwargs)
    }

    pub fn result(&self) -> &Value {
        &self.result
    }

    pub fn meta(&self) -> &IndexMap<String, Value> {
        &self.meta
    }

    pub fn docstring(&self) -> Option<&str> {
        self.meta.get("docstring").and_then(Value::as_str)
    }

    /// The demo call itself, rebuilt from the exemplars.
    pub fn demo_call(&self) -> Call {
        Call::new(
            self.fname.clone(),
            Object::untyped(self.args.clone()),
            Object::new(self.kwargs_type.clone(), self.kwargs.values().cloned().collect()),
        )
    }

    /// Encode a native call against this method's exemplars.
    ///
    /// Named arguments the caller leaves out keep the demo's value.
    pub fn encode_call(&self, args: &[Native], kwargs: &IndexMap<String, Native>) -> Result<Call> {
        if args.len() != self.args.len() {
            return Err(CodecError::mismatch(format!(
                "`{}` takes {} positional argument(s), {} given",
                self.fname,
                self.args.len(),
                args.len()
            )));
        }
        if let Some(unknown) = kwargs.keys().find(|k| !self.kwargs.contains_key(k.as_str())) {
            return Err(CodecError::mismatch(format!(
                "`{}` has no keyword argument `{unknown}`",
                self.fname
            )));
        }

        let positional = args
            .iter()
            .zip(&self.args)
            .map(|(a, demo)| to_ir(a, Some(demo)))
            .collect::<Result<Vec<_>>>()?;
        let named = self
            .kwargs
            .iter()
            .map(|(name, demo)| match kwargs.get(name) {
                Some(v) => to_ir(v, Some(demo)),
                None => Ok(demo.clone()),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Call::new(
            self.fname.clone(),
            Object::untyped(positional),
            Object::new(self.kwargs_type.clone(), named),
        ))
    }
}

fn demo_call(fname: &str, v: &Value) -> Result<Call> {
    let call = match v {
        Value::Call(c) => (**c).clone(),
        Value::Object(o) => match o.fields.as_slice() {
            [Value::String(name), Value::Object(args), Value::Object(kwargs)] => {
                Call::new(name.clone(), args.clone(), kwargs.clone())
            }
            _ => {
                return Err(CodecError::schema(format!(
                    "demo call of `{fname}` must be (fname, args, kwargs), got {}",
                    v.shape_name()
                )));
            }
        },
        other => {
            return Err(CodecError::schema(format!(
                "demo call of `{fname}` must be a call, got {}",
                other.shape_name()
            )));
        }
    };
    if call.fname != fname {
        return Err(CodecError::schema(format!(
            "demo filed under `{fname}` calls `{}`",
            call.fname
        )));
    }
    Ok(call)
}

// ————————————————————————————————————————————————————————————————————————————
// APPLICATION
// ————————————————————————————————————————————————————————————————————————————

impl App {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn methods(&self) -> &IndexMap<String, MethodRecord> {
        &self.methods
    }

    pub fn type_table(&self) -> &TypeTable {
        &self.type_table
    }

    pub fn method(&self, fname: &str) -> Result<&MethodRecord> {
        self.methods
            .get(fname)
            .ok_or_else(|| CodecError::UnknownMethod(fname.to_string()))
    }

    /// Encode a call to `fname` and render it as wire text.
    pub fn encode_call(
        &self,
        fname: &str,
        args: &[Native],
        kwargs: &IndexMap<String, Native>,
    ) -> Result<String> {
        let call = self.method(fname)?.encode_call(args, kwargs)?;
        render(&Value::from(call))
    }

    pub fn into_parts(self) -> (String, IndexMap<String, MethodRecord>, TypeTable) {
        (self.name, self.methods, self.type_table)
    }
}

impl AppHandle {
    pub fn new(app: App) -> Self {
        AppHandle { current: RwLock::new(Arc::new(app)) }
    }

    pub fn load(text: &str) -> Result<Self> {
        load_app(text).map(AppHandle::new)
    }

    pub fn snapshot(&self) -> Arc<App> {
        Arc::clone(&self.current.read())
    }

    /// Load a new descriptor and swap it in. On error the old catalog stays.
    pub fn reload(&self, text: &str) -> Result<Arc<App>> {
        let next = Arc::new(load_app(text)?);
        *self.current.write() = Arc::clone(&next);
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::EnumValue;

    const TESTAPP: &str = include_str!("../tests/fixtures/testapp.json");

    #[test]
    fn loads_methods_in_declared_order() {
        let app = load_app(TESTAPP).unwrap();
        assert_eq!(app.name(), "testapp");
        let names: Vec<_> = app.methods().keys().map(String::as_str).collect();
        assert_eq!(names, vec!["greet", "sum", "paint", "eigen"]);
        assert_eq!(app.type_table().len(), 3);
    }

    #[test]
    fn method_record_exemplars() {
        let app = load_app(TESTAPP).unwrap();
        let greet = app.method("greet").unwrap();
        assert_eq!(greet.args(), &[Value::from("Jugsaw")]);
        assert!(greet.kwargs().is_empty());
        assert_eq!(greet.result(), &Value::from("Hello, Jugsaw!"));
        assert_eq!(greet.docstring(), Some("Greet somebody by name."));

        let paint = app.method("paint").unwrap();
        let kw: Vec<_> = paint.kwargs().keys().map(String::as_str).collect();
        assert_eq!(kw, vec!["color", "scale"]);
        assert_eq!(paint.docstring(), None);
        assert!(paint.meta().is_empty());
    }

    #[test]
    fn object_form_demo_calls_load() {
        let app = load_app(TESTAPP).unwrap();
        let sum = app.method("sum").unwrap();
        assert_eq!(sum.args().len(), 1);
        assert_eq!(sum.args()[0].as_object().unwrap().kind(), ObjectKind::Array);
    }

    #[test]
    fn demo_call_reencodes_to_itself() {
        let app = load_app(TESTAPP).unwrap();
        let paint = app.method("paint").unwrap();
        let call = paint.demo_call();
        assert_eq!(
            call.kwargs.typename,
            "Core.NamedTuple{(:color, :scale), Tuple{Main.Color, Core.Float64}}"
        );
        let text = render(&Value::from(call.clone())).unwrap();
        assert_eq!(parse(&text).unwrap(), Value::from(call));
    }

    #[test]
    fn encode_call_fills_defaults_in_declared_order() {
        let app = load_app(TESTAPP).unwrap();
        let paint = app.method("paint").unwrap();
        let point = Native::Tuple(vec![Native::Float(3.0), Native::Float(4.0)]);
        let mut kwargs = IndexMap::new();
        kwargs.insert("color".to_string(), Native::from("BLUE"));

        let call = paint.encode_call(&[point], &kwargs).unwrap();
        assert!(call.args.is_untyped());
        assert_eq!(
            call.args.fields[0],
            Value::Object(Object::new("Main.Point", vec![3.0.into(), 4.0.into()]))
        );
        let color = call.kwargs.fields[0].as_object().unwrap();
        assert_eq!(color.fields[1], Value::from("BLUE"));
        assert_eq!(call.kwargs.fields[1], Value::from(1.0));
    }

    #[test]
    fn encode_call_accepts_enum_values() {
        let app = load_app(TESTAPP).unwrap();
        let paint = app.method("paint").unwrap();
        let mut kwargs = IndexMap::new();
        let green = EnumValue::new("Main.Color", "GREEN", ["RED", "GREEN", "BLUE"]);
        kwargs.insert("color".to_string(), Native::from(green));
        kwargs.insert("scale".to_string(), Native::Int(2));
        let call = paint.encode_call(&[Native::from((0.0, 0.0))], &kwargs).unwrap();
        assert_eq!(call.kwargs.fields[0].as_object().unwrap().fields[1], Value::from("GREEN"));
        assert_eq!(call.kwargs.fields[1], Value::from(2i64));
    }

    #[test]
    fn encode_call_checks_arity_and_names() {
        let app = load_app(TESTAPP).unwrap();
        let greet = app.method("greet").unwrap();
        let none = IndexMap::new();
        assert!(matches!(greet.encode_call(&[], &none), Err(CodecError::ShapeMismatch(_))));

        let mut bogus = IndexMap::new();
        bogus.insert("loud".to_string(), Native::Bool(true));
        assert!(matches!(
            greet.encode_call(&[Native::from("x")], &bogus),
            Err(CodecError::ShapeMismatch(_))
        ));

        assert!(matches!(app.encode_call("nope", &[], &none), Err(CodecError::UnknownMethod(_))));
    }

    #[test]
    fn encode_call_renders_wire_text() {
        let app = load_app(TESTAPP).unwrap();
        let text = app.encode_call("greet", &[Native::from("Rust")], &IndexMap::new()).unwrap();
        assert_eq!(
            text,
            r#"["call","greet",["untyped","Rust"],["object","Core.NamedTuple{(), Tuple{}}"]]"#
        );
    }

    #[test]
    fn descriptor_shape_errors() {
        let bad = [
            r#"["list"]"#,
            r#"{"type": "X", "fields": []}"#,
            r#"["list", "app", {"type": "TT", "fields": [["list"], ["list"]]}]"#,
            r#"["list", {"type": "App", "fields": ["a", ["list", "f"], ["list"]]}, {"type": "TT", "fields": [["list"], ["list"]]}]"#,
            r#"["list", {"type": "App", "fields": ["a", ["list"]]}, {"type": "TT", "fields": [["list"], ["list"]]}]"#,
        ];
        for src in bad {
            assert!(matches!(load_app(src), Err(CodecError::Schema(_))), "{src}");
        }
    }

    #[test]
    fn repeated_method_names_are_rejected() {
        let src = r#"["list",
            {"type": "App", "fields": ["a", ["list", "f", "f"], ["list",
                {"type": "Core.Pair", "fields": ["f", {"type": "Demo", "fields": [
                    ["call", "f", ["untyped"], {"type": "Kw", "fields": []}], null, null]}]}]]},
            {"type": "TT", "fields": [["list"], ["list"]]}]"#;
        let err = load_app(src).unwrap_err();
        assert!(matches!(&err, CodecError::Schema(msg) if msg.contains("declared twice")), "{err}");
    }

    #[test]
    fn repeated_demo_names_are_rejected() {
        let demo = r#"{"type": "Core.Pair", "fields": ["f", {"type": "Demo", "fields": [
            ["call", "f", ["untyped"], {"type": "Kw", "fields": []}], null, null]}]}"#;
        let src = format!(
            r#"["list", {{"type": "App", "fields": ["a", ["list", "f"], ["list", {demo}, {demo}]]}},
                {{"type": "TT", "fields": [["list"], ["list"]]}}]"#
        );
        assert!(matches!(load_app(&src), Err(CodecError::Schema(_))));
    }

    #[test]
    fn kwargs_type_must_be_declared() {
        let src = r#"["list",
            {"type": "App", "fields": ["a", ["list", "f"], ["list",
                {"type": "Core.Pair", "fields": ["f", {"type": "Demo", "fields": [
                    ["call", "f", ["untyped"], {"type": "Kw", "fields": [1]}], null, null]}]}]]},
            {"type": "TT", "fields": [["list"], ["list"]]}]"#;
        assert!(matches!(load_app(src), Err(CodecError::Schema(_))));
    }

    #[test]
    fn handle_swaps_whole_catalog() {
        let handle = AppHandle::load(TESTAPP).unwrap();
        let before = handle.snapshot();
        assert_eq!(before.methods().len(), 4);

        assert!(handle.reload("not ir").is_err());
        assert!(Arc::ptr_eq(&before, &handle.snapshot()));

        let renamed = TESTAPP.replacen("\"testapp\"", "\"testapp2\"", 1);
        let after = handle.reload(&renamed).unwrap();
        assert_eq!(handle.snapshot().name(), "testapp2");
        assert_eq!(after.name(), "testapp2");
        assert_eq!(before.name(), "testapp");
    }
}

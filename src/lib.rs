//! Codec for the JugsawIR wire format.
//!
//! Four entry points: [`parse`] and [`render`] move between wire text and the
//! [`ir::Value`] tree, [`to_native`] and [`to_ir`] move between that tree and
//! [`native::Native`] values, and [`load_app`] reads an application descriptor
//! into the method catalog that supplies the encoder's exemplars.
//!
//! Every operation is a pure function over immutable inputs.

pub mod app;
pub mod decode;
pub mod encode;
pub mod error;
pub mod ir;
pub mod native;
pub mod parser;
pub mod render;
pub mod typetable;

pub use app::{App, AppHandle, MethodRecord, load_app};
pub use decode::{decode_result, to_native};
pub use encode::to_ir;
pub use error::CodecError;
pub use ir::{Call, Number, Object, ObjectKind, Value};
pub use native::{Complex, EnumValue, NdArray, Native, Record, Reflect};
pub use parser::{parse, parse_slice};
pub use render::{render, render_bytes};
pub use typetable::{JDataType, TypeDef, TypeTable, load_typetable};

pub type Result<T, E = CodecError> = std::result::Result<T, E>;

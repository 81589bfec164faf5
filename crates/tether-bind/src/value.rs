//! Script value representation shared across the binding boundary
//!
//! - Undefined, Bool, Number: immediate values (stack-allocated)
//! - BigInt: 128-bit storage so both i64 and u64 round-trip exactly
//! - Strings: heap-allocated, reference-counted (Arc<String>), immutable
//! - Objects: opaque handles with reference semantics (ScriptObject)
//!
//! The dispatcher and the converter registry only ever see values through
//! the kind predicates and typed extraction methods defined here.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};

/// Opaque script object handle. Cheap to clone (refcount bump).
///
/// Mutations are visible through every clone of the handle. This matches
/// reference semantics: two handles are equal only if they are the same
/// allocation, never by field content.
#[derive(Clone, Debug)]
pub struct ScriptObject(Arc<Mutex<HashMap<String, Value>>>);

impl ScriptObject {
    pub fn new() -> Self {
        ScriptObject(Arc::new(Mutex::new(HashMap::new())))
    }

    /// Read a property. Returns a clone of the stored value.
    pub fn get(&self, key: &str) -> Option<Value> {
        let guard = self.0.lock().expect("ScriptObject lock poisoned");
        guard.get(key).cloned()
    }

    /// Write a property, replacing any previous value under `key`.
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let mut guard = self.0.lock().expect("ScriptObject lock poisoned");
        guard.insert(key.into(), value);
    }

    pub fn len(&self) -> usize {
        let guard = self.0.lock().expect("ScriptObject lock poisoned");
        guard.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for ScriptObject {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for ScriptObject {
    fn eq(&self, other: &Self) -> bool {
        // Identity equality: same allocation, not same contents.
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Environment handle required to construct script values from native
/// primitives. The embedding runtime hands one to every native call; value
/// construction never happens without it.
#[derive(Clone, Debug)]
pub struct Context {
    /// Shared allocation for the empty string. Bindings that shuttle many
    /// empty strings across the boundary reuse it instead of allocating.
    empty: Arc<String>,
}

impl Context {
    pub fn new() -> Self {
        Context {
            empty: Arc::new(String::new()),
        }
    }

    pub fn undefined(&self) -> Value {
        Value::Undefined
    }

    pub fn boolean(&self, value: bool) -> Value {
        Value::Bool(value)
    }

    pub fn number(&self, value: f64) -> Value {
        Value::Number(value)
    }

    pub fn bigint_i64(&self, value: i64) -> Value {
        Value::BigInt(value as i128)
    }

    pub fn bigint_u64(&self, value: u64) -> Value {
        Value::BigInt(value as i128)
    }

    pub fn string(&self, value: impl AsRef<str>) -> Value {
        let s = value.as_ref();
        if s.is_empty() {
            Value::String(Arc::clone(&self.empty))
        } else {
            Value::String(Arc::new(s.to_owned()))
        }
    }

    pub fn object(&self) -> Value {
        Value::Object(ScriptObject::new())
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

/// Dynamic script value
#[derive(Clone, Debug)]
pub enum Value {
    /// Absence of a value; what a unit-returning native call produces
    Undefined,
    /// Boolean value
    Bool(bool),
    /// Numeric value (IEEE 754 double-precision)
    Number(f64),
    /// Big integer value. 128-bit storage covers the full i64 and u64 ranges.
    BigInt(i128),
    /// String value (reference-counted, immutable, UTF-8)
    String(Arc<String>),
    /// Opaque object handle (reference semantics)
    Object(ScriptObject),
}

impl Value {
    /// Create a new string value
    pub fn string(s: impl Into<String>) -> Self {
        Value::String(Arc::new(s.into()))
    }

    /// Get the type name of this value
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => "undefined",
            Value::Bool(_) => "boolean",
            Value::Number(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::String(_) => "string",
            Value::Object(_) => "object",
        }
    }

    // ========================================================================
    // Kind predicates
    // ========================================================================

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Value::Number(_))
    }

    pub fn is_bigint(&self) -> bool {
        matches!(self, Value::BigInt(_))
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Value::String(_))
    }

    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    // ========================================================================
    // Typed extraction
    //
    // Each extractor is checked by kind (wrong kind returns None) but the
    // numeric narrowing itself is a plain saturating cast, matching how the
    // runtime's own extraction behaves. No range validation is performed.
    // ========================================================================

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// 32-bit signed extraction: number narrowed via a saturating cast.
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::Number(n) => Some(*n as i32),
            _ => None,
        }
    }

    /// 32-bit unsigned extraction: number narrowed via a saturating cast.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::Number(n) => Some(*n as u32),
            _ => None,
        }
    }

    /// 64-bit extraction from the number kind (not the bigint kind).
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Value::Number(n) => Some(*n as f32),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Signed read of the bigint kind, truncating to the low 64 bits.
    pub fn bigint_i64(&self) -> Option<i64> {
        match self {
            Value::BigInt(n) => Some(*n as i64),
            _ => None,
        }
    }

    /// Unsigned read of the bigint kind, truncating to the low 64 bits.
    pub fn bigint_u64(&self) -> Option<u64> {
        match self {
            Value::BigInt(n) => Some(*n as u64),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ScriptObject> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }
}

impl PartialEq for Value {
    /// Equality contract:
    ///
    /// **Value kinds** (content equality): Undefined, Bool, Number, BigInt,
    /// String.
    ///
    /// **Reference kinds** (identity equality): Object — two handles are
    /// equal only when they are the same allocation.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::BigInt(a), Value::BigInt(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.is_finite() {
                    write!(f, "{:.0}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::BigInt(n) => write!(f, "{}n", n),
            Value::String(s) => write!(f, "{}", s),
            Value::Object(_) => write!(f, "[object]"),
        }
    }
}

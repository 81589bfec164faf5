//! Bidirectional conversion between script values and native types
//!
//! Provides the converter registry as a pair of traits:
//! - `FromValue` - unwrap a script `Value` into a native type
//! - `IntoValue` - wrap a native value back into a script `Value`
//!
//! One impl pair per native type category; categories are mutually exclusive
//! by type (signed vs. unsigned, fixed-width vs. platform-width), never
//! discriminated by inspecting the value at runtime. Adding a new native type
//! means adding one new impl pair; the dispatcher never changes.
//!
//! # Examples
//!
//! ```
//! use tether_bind::convert::{FromValue, IntoValue};
//! use tether_bind::value::{Context, Value};
//!
//! let ctx = Context::new();
//! let wrapped: Value = 42i32.into_value(&ctx);
//! let unwrapped = i32::from_value(&wrapped).unwrap();
//! assert_eq!(unwrapped, 42);
//! ```

use crate::value::{Context, ScriptObject, Value};
use thiserror::Error;

/// Error type for value conversion failures
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConvertError {
    /// The value's runtime kind does not match the declared native type
    #[error("type mismatch: expected {expected}, got {got}")]
    TypeMismatch {
        expected: &'static str,
        got: &'static str,
    },
    /// An in-kind integral value that names no variant of the target enum
    #[error("no variant of {enum_name} has value {value}")]
    InvalidEnumValue { enum_name: &'static str, value: i128 },
}

impl ConvertError {
    fn mismatch(expected: &'static str, value: &Value) -> Self {
        ConvertError::TypeMismatch {
            expected,
            got: value.type_name(),
        }
    }
}

/// Unwrap a script value into a native type.
///
/// `is_convertible` is a pure kind predicate: it reports whether
/// `from_value` would accept the value, performs no conversion, and is
/// never consulted by the dispatcher itself (it exists for overload
/// discrimination in embedding code). `from_value` is checked: a value of
/// the wrong kind yields `ConvertError::TypeMismatch`. In-kind numeric
/// narrowing is an unvalidated cast, exactly what the runtime's extraction
/// does; no range check is performed.
pub trait FromValue: Sized {
    fn is_convertible(value: &Value) -> bool;

    fn from_value(value: &Value) -> Result<Self, ConvertError>;
}

/// Wrap a native value into a script value. Total for any in-range input.
pub trait IntoValue {
    fn into_value(self, ctx: &Context) -> Value;
}

/// Free-function form of [`FromValue::from_value`]
pub fn from_value<T: FromValue>(value: &Value) -> Result<T, ConvertError> {
    T::from_value(value)
}

/// Free-function form of [`FromValue::is_convertible`]
pub fn is_convertible<T: FromValue>(value: &Value) -> bool {
    T::is_convertible(value)
}

/// Free-function form of [`IntoValue::into_value`]
pub fn to_value<T: IntoValue>(ctx: &Context, value: T) -> Value {
    value.into_value(ctx)
}

// ============================================================================
// Booleans
// ============================================================================

impl FromValue for bool {
    fn is_convertible(value: &Value) -> bool {
        value.is_boolean()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_bool()
            .ok_or_else(|| ConvertError::mismatch("boolean", value))
    }
}

impl IntoValue for bool {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.boolean(self)
    }
}

// ============================================================================
// Integers at or below 32 bits
//
// Signed types read through the 32-bit signed extraction, unsigned types
// through the 32-bit unsigned extraction, then narrow to the declared width.
// ============================================================================

macro_rules! int32_convert {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn is_convertible(value: &Value) -> bool {
                value.is_number()
            }

            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                value
                    .as_i32()
                    .map(|n| n as $ty)
                    .ok_or_else(|| ConvertError::mismatch("number", value))
            }
        }

        impl IntoValue for $ty {
            fn into_value(self, ctx: &Context) -> Value {
                ctx.number(self as f64)
            }
        }
    )*};
}

macro_rules! uint32_convert {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn is_convertible(value: &Value) -> bool {
                value.is_number()
            }

            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                value
                    .as_u32()
                    .map(|n| n as $ty)
                    .ok_or_else(|| ConvertError::mismatch("number", value))
            }
        }

        impl IntoValue for $ty {
            fn into_value(self, ctx: &Context) -> Value {
                ctx.number(self as f64)
            }
        }
    )*};
}

int32_convert!(i8, i16, i32);
uint32_convert!(u8, u16, u32);

// ============================================================================
// 64-bit integers
//
// With the `bigint` feature these cross the boundary as the dedicated bigint
// kind, giving exact round trips over the full range. Without it they ride
// the number kind and inherit f64 precision, matching embeddings whose
// runtime has no bigint. The two paths are build-time exclusive.
// ============================================================================

#[cfg(feature = "bigint")]
impl FromValue for i64 {
    fn is_convertible(value: &Value) -> bool {
        value.is_bigint()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .bigint_i64()
            .ok_or_else(|| ConvertError::mismatch("bigint", value))
    }
}

#[cfg(feature = "bigint")]
impl IntoValue for i64 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.bigint_i64(self)
    }
}

#[cfg(feature = "bigint")]
impl FromValue for u64 {
    fn is_convertible(value: &Value) -> bool {
        value.is_bigint()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .bigint_u64()
            .ok_or_else(|| ConvertError::mismatch("bigint", value))
    }
}

#[cfg(feature = "bigint")]
impl IntoValue for u64 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.bigint_u64(self)
    }
}

#[cfg(not(feature = "bigint"))]
impl FromValue for i64 {
    fn is_convertible(value: &Value) -> bool {
        value.is_number()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_i64()
            .ok_or_else(|| ConvertError::mismatch("number", value))
    }
}

#[cfg(not(feature = "bigint"))]
impl IntoValue for i64 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.number(self as f64)
    }
}

#[cfg(not(feature = "bigint"))]
impl FromValue for u64 {
    fn is_convertible(value: &Value) -> bool {
        value.is_number()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_i64()
            .map(|n| n as u64)
            .ok_or_else(|| ConvertError::mismatch("number", value))
    }
}

#[cfg(not(feature = "bigint"))]
impl IntoValue for u64 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.number(self as f64)
    }
}

// ============================================================================
// Platform-width integers
//
// Kept distinct from the fixed-width 64-bit path: isize/usize are distinct
// types, and they always ride the number kind via 64-bit extraction even
// when the bigint feature is enabled.
// ============================================================================

macro_rules! platform_int_convert {
    ($($ty:ty),*) => {$(
        impl FromValue for $ty {
            fn is_convertible(value: &Value) -> bool {
                value.is_number()
            }

            fn from_value(value: &Value) -> Result<Self, ConvertError> {
                value
                    .as_i64()
                    .map(|n| n as $ty)
                    .ok_or_else(|| ConvertError::mismatch("number", value))
            }
        }

        impl IntoValue for $ty {
            fn into_value(self, ctx: &Context) -> Value {
                ctx.number(self as f64)
            }
        }
    )*};
}

platform_int_convert!(isize, usize);

// ============================================================================
// Floating point
// ============================================================================

impl FromValue for f32 {
    fn is_convertible(value: &Value) -> bool {
        value.is_number()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_f32()
            .ok_or_else(|| ConvertError::mismatch("number", value))
    }
}

impl IntoValue for f32 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.number(self as f64)
    }
}

impl FromValue for f64 {
    fn is_convertible(value: &Value) -> bool {
        value.is_number()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_f64()
            .ok_or_else(|| ConvertError::mismatch("number", value))
    }
}

impl IntoValue for f64 {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.number(self)
    }
}

// ============================================================================
// Strings
// ============================================================================

impl FromValue for String {
    fn is_convertible(value: &Value) -> bool {
        value.is_string()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_str()
            .map(str::to_owned)
            .ok_or_else(|| ConvertError::mismatch("string", value))
    }
}

impl IntoValue for String {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.string(self)
    }
}

impl IntoValue for &str {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.string(self)
    }
}

// ============================================================================
// Passthrough kinds
// ============================================================================

impl FromValue for Value {
    /// The generic value category accepts anything.
    fn is_convertible(_value: &Value) -> bool {
        true
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        Ok(value.clone())
    }
}

impl IntoValue for Value {
    fn into_value(self, _ctx: &Context) -> Value {
        self
    }
}

impl FromValue for ScriptObject {
    fn is_convertible(value: &Value) -> bool {
        value.is_object()
    }

    fn from_value(value: &Value) -> Result<Self, ConvertError> {
        value
            .as_object()
            .cloned()
            .ok_or_else(|| ConvertError::mismatch("object", value))
    }
}

impl IntoValue for ScriptObject {
    fn into_value(self, _ctx: &Context) -> Value {
        Value::Object(self)
    }
}

/// Unit return: the call produces no value.
impl IntoValue for () {
    fn into_value(self, ctx: &Context) -> Value {
        ctx.undefined()
    }
}

// ============================================================================
// Enumerations
// ============================================================================

/// Declare an enum with an explicit integral repr and derive both converter
/// impls for it through the repr's own converters.
///
/// Reading extracts the underlying integral value and matches it against the
/// declared discriminants; a value naming no variant fails with
/// [`ConvertError::InvalidEnumValue`]. Writing casts to the repr and goes
/// through the integer path.
///
/// # Examples
///
/// ```
/// use tether_bind::script_enum;
/// use tether_bind::convert::{FromValue, IntoValue};
/// use tether_bind::value::{Context, Value};
///
/// script_enum! {
///     pub enum OpenMode: u32 {
///         Read = 0,
///         Write = 1,
///         Append = 2,
///     }
/// }
///
/// let ctx = Context::new();
/// assert_eq!(OpenMode::Write.into_value(&ctx), Value::Number(1.0));
/// assert_eq!(OpenMode::from_value(&Value::Number(2.0)), Ok(OpenMode::Append));
/// assert!(OpenMode::from_value(&Value::Number(9.0)).is_err());
/// ```
#[macro_export]
macro_rules! script_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $repr:ty {
            $($(#[$vmeta:meta])* $variant:ident = $value:expr),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr($repr)]
        #[derive(Clone, Copy, Debug, PartialEq, Eq)]
        $vis enum $name {
            $($(#[$vmeta])* $variant = $value,)+
        }

        impl $crate::convert::FromValue for $name {
            fn is_convertible(value: &$crate::value::Value) -> bool {
                <$repr as $crate::convert::FromValue>::is_convertible(value)
            }

            fn from_value(
                value: &$crate::value::Value,
            ) -> Result<Self, $crate::convert::ConvertError> {
                let raw = <$repr as $crate::convert::FromValue>::from_value(value)?;
                match raw {
                    $(v if v == $value => Ok($name::$variant),)+
                    _ => Err($crate::convert::ConvertError::InvalidEnumValue {
                        enum_name: stringify!($name),
                        value: raw as i128,
                    }),
                }
            }
        }

        impl $crate::convert::IntoValue for $name {
            fn into_value(self, ctx: &$crate::value::Context) -> $crate::value::Value {
                <$repr as $crate::convert::IntoValue>::into_value(self as $repr, ctx)
            }
        }
    };
}

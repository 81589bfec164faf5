//! Tether Bind - Typed native bindings for the Tether runtime
//!
//! This library is the boundary layer between Tether script values and
//! plain Rust functions:
//! - Per-type conversion between script values and native values
//! - Typed dispatch of script calls onto native functions and methods,
//!   with strict arity checking and trailing binding-site defaults
//!
//! A binding author writes an ordinary Rust function and hands it to
//! [`call::typed_call`] (or registers it once with [`call::bind`]); the
//! library checks the argument count, converts each argument to the
//! declared parameter type, invokes the function, and converts the result
//! back into a script value.

/// Tether bind version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// Public API modules
pub mod call;
pub mod convert;
pub mod value;

// Re-export commonly used types
pub use call::{
    bind, typed_call, typed_call_mut, typed_call_owned, typed_call_ref, ArgPack, BoundFn,
    CallError, CallInfo, NativeFunction, NativeMethod,
};
pub use convert::{from_value, is_convertible, to_value, ConvertError, FromValue, IntoValue};
pub use value::{Context, ScriptObject, Value};

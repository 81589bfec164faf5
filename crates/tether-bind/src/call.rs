//! Typed dispatch from script calls onto native functions and methods
//!
//! A binding author hands the dispatcher a plain Rust function (or method)
//! plus zero or more trailing default argument values. The dispatcher:
//!
//! 1. checks the call's argument count against the number of non-default
//!    parameters, exactly once, before any conversion;
//! 2. converts each caller argument left to right through the converter
//!    registry, driven by the statically known parameter type at that
//!    position;
//! 3. invokes the underlying callable exactly once with the converted
//!    arguments followed by the defaults, in declared order;
//! 4. wraps a non-unit result back into a script value (unit yields
//!    `Value::Undefined`).
//!
//! Total declared arity 0 through 9 is supported; anything larger has no
//! trait impl and fails to compile at the binding site. There is one entry
//! point per receiver-ownership mode: none ([`typed_call`]), by reference
//! ([`typed_call_ref`]), by mutable reference ([`typed_call_mut`]) and by
//! move ([`typed_call_owned`]).
//!
//! # Examples
//!
//! ```
//! use tether_bind::call::{typed_call, CallInfo};
//! use tether_bind::value::{Context, Value};
//!
//! fn add(a: i32, b: i32) -> i32 {
//!     a + b
//! }
//!
//! let ctx = Context::new();
//! let args = [Value::Number(2.0), Value::Number(3.0)];
//! let info = CallInfo::new(&ctx, &args);
//! assert_eq!(typed_call(&info, add, ()).unwrap(), Value::Number(5.0));
//! ```

use std::sync::Arc;

use thiserror::Error;
use tracing::trace;

use crate::convert::{ConvertError, FromValue, IntoValue};
use crate::value::{Context, Value};

/// Dispatch errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CallError {
    /// Wrong number of arguments. Detected once, up front; no conversion is
    /// performed and the callable is never invoked.
    #[error("expected {expected} arguments, got {got}")]
    ArityMismatch { expected: usize, got: usize },
    /// A caller argument's runtime kind did not match the declared native
    /// parameter type at that position.
    #[error("invalid argument at position {index}: {source}")]
    InvalidArgument {
        index: usize,
        #[source]
        source: ConvertError,
    },
}

/// Read-only view of one incoming script call: the environment handle plus
/// the positional argument list.
#[derive(Debug)]
pub struct CallInfo<'a> {
    ctx: &'a Context,
    args: &'a [Value],
}

impl<'a> CallInfo<'a> {
    pub fn new(ctx: &'a Context, args: &'a [Value]) -> Self {
        CallInfo { ctx, args }
    }

    pub fn context(&self) -> &'a Context {
        self.ctx
    }

    pub fn arg_count(&self) -> usize {
        self.args.len()
    }

    /// Indexed argument access. `None` past the end of the argument list.
    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    pub fn args(&self) -> &'a [Value] {
        self.args
    }
}

/// A tuple of caller-supplied parameter types, extractable from a call.
///
/// `extract` performs the arity precondition check first, then converts
/// position 0 through `ARITY - 1` strictly left to right, stopping at the
/// first failure. Implemented for tuples of arity 0 through 9.
pub trait ArgPack: Sized {
    /// Number of arguments the caller must supply.
    const ARITY: usize;

    fn extract(info: &CallInfo<'_>) -> Result<Self, CallError>;
}

macro_rules! arg_pack_impl {
    ($len:expr; $($A:ident $a:ident $idx:tt),*) => {
        impl<$($A: FromValue),*> ArgPack for ($($A,)*) {
            const ARITY: usize = $len;

            fn extract(info: &CallInfo<'_>) -> Result<Self, CallError> {
                let args = info.args();
                let [$($a),*] = args else {
                    return Err(CallError::ArityMismatch {
                        expected: $len,
                        got: args.len(),
                    });
                };
                Ok(($(
                    <$A as FromValue>::from_value($a).map_err(|source| {
                        CallError::InvalidArgument { index: $idx, source }
                    })?,
                )*))
            }
        }
    };
}

arg_pack_impl!(0; );
arg_pack_impl!(1; A0 a0 0);
arg_pack_impl!(2; A0 a0 0, A1 a1 1);
arg_pack_impl!(3; A0 a0 0, A1 a1 1, A2 a2 2);
arg_pack_impl!(4; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3);
arg_pack_impl!(5; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4);
arg_pack_impl!(6; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5);
arg_pack_impl!(7; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6);
arg_pack_impl!(8; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6, A7 a7 7);
arg_pack_impl!(9; A0 a0 0, A1 a1 1, A2 a2 2, A3 a3 3, A4 a4 4, A5 a5 5, A6 a6 6, A7 a7 7, A8 a8 8);

/// A native function callable with a caller-argument tuple followed by a
/// defaults tuple. Implemented for every `Fn` whose parameter list is the
/// concatenation of the two tuples, over every split of every total arity
/// 0 through 9 — the defaults are always the trailing suffix.
pub trait NativeFunction<Caller, Defaults> {
    type Out;

    fn invoke(&self, caller: Caller, defaults: Defaults) -> Self::Out;
}

/// A native method: like [`NativeFunction`] with a leading receiver.
///
/// The receiver-ownership mode is the `Recv` type itself: `&T` for
/// read-only methods, `&mut T` for mutating methods, `T` for consuming
/// (rvalue-style) methods that move out of the instance.
pub trait NativeMethod<Recv, Caller, Defaults> {
    type Out;

    fn invoke(&self, receiver: Recv, caller: Caller, defaults: Defaults) -> Self::Out;
}

macro_rules! native_callable_impl {
    ([$($A:ident $a:ident)*] [$($D:ident $d:ident)*]) => {
        impl<Func, Ret, $($A,)* $($D,)*> NativeFunction<($($A,)*), ($($D,)*)> for Func
        where
            Func: Fn($($A,)* $($D,)*) -> Ret,
        {
            type Out = Ret;

            #[inline]
            fn invoke(&self, caller: ($($A,)*), defaults: ($($D,)*)) -> Ret {
                let ($($a,)*) = caller;
                let ($($d,)*) = defaults;
                self($($a,)* $($d,)*)
            }
        }

        impl<Func, Recv, Ret, $($A,)* $($D,)*> NativeMethod<Recv, ($($A,)*), ($($D,)*)> for Func
        where
            Func: Fn(Recv, $($A,)* $($D,)*) -> Ret,
        {
            type Out = Ret;

            #[inline]
            fn invoke(&self, receiver: Recv, caller: ($($A,)*), defaults: ($($D,)*)) -> Ret {
                let ($($a,)*) = caller;
                let ($($d,)*) = defaults;
                self(receiver, $($a,)* $($d,)*)
            }
        }
    };
}

// Generates one impl per (caller prefix | defaults suffix) split of the
// given parameter list, by moving the head of the suffix onto the prefix.
macro_rules! native_callable_splits {
    ([$($A:ident $a:ident)*] []) => {
        native_callable_impl!([$($A $a)*] []);
    };
    ([$($A:ident $a:ident)*] [$D0:ident $d0:ident $($D:ident $d:ident)*]) => {
        native_callable_impl!([$($A $a)*] [$D0 $d0 $($D $d)*]);
        native_callable_splits!([$($A $a)* $D0 $d0] [$($D $d)*]);
    };
}

native_callable_splits!([] []);
native_callable_splits!([] [P0 p0]);
native_callable_splits!([] [P0 p0 P1 p1]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3 P4 p4]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3 P4 p4 P5 p5]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3 P4 p4 P5 p5 P6 p6]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3 P4 p4 P5 p5 P6 p6 P7 p7]);
native_callable_splits!([] [P0 p0 P1 p1 P2 p2 P3 p3 P4 p4 P5 p5 P6 p6 P7 p7 P8 p8]);

fn dispatch<Func, Caller, Defaults>(
    info: &CallInfo<'_>,
    f: &Func,
    defaults: Defaults,
) -> Result<Value, CallError>
where
    Caller: ArgPack,
    Func: NativeFunction<Caller, Defaults>,
    Func::Out: IntoValue,
{
    trace!(
        expected = Caller::ARITY,
        got = info.arg_count(),
        "dispatching native call"
    );
    let caller = Caller::extract(info)?;
    Ok(f.invoke(caller, defaults).into_value(info.context()))
}

/// Dispatch a script call onto a free function.
///
/// The caller must supply exactly `arity(f) - len(defaults)` arguments; the
/// defaults fill the trailing parameters.
///
/// # Examples
///
/// ```
/// use tether_bind::call::{typed_call, CallInfo};
/// use tether_bind::value::{Context, Value};
///
/// fn greet(name: String, suffix: String) -> String {
///     format!("{name}{suffix}")
/// }
///
/// let ctx = Context::new();
/// let args = [Value::string("Ada")];
/// let info = CallInfo::new(&ctx, &args);
///
/// // One default bound at the binding site: callers pass a single argument.
/// let result = typed_call(&info, greet, (String::from("!"),)).unwrap();
/// assert_eq!(result, Value::string("Ada!"));
/// ```
pub fn typed_call<Func, Caller, Defaults>(
    info: &CallInfo<'_>,
    f: Func,
    defaults: Defaults,
) -> Result<Value, CallError>
where
    Caller: ArgPack,
    Func: NativeFunction<Caller, Defaults>,
    Func::Out: IntoValue,
{
    dispatch(info, &f, defaults)
}

/// Dispatch a script call onto a `&self` method of `receiver`.
///
/// Covers both const and const-lvalue method shapes: a shared reference is
/// the only way Rust spells either.
///
/// # Examples
///
/// ```
/// use tether_bind::call::{typed_call_ref, CallInfo};
/// use tether_bind::value::{Context, Value};
///
/// struct Point {
///     x: f64,
///     y: f64,
/// }
///
/// impl Point {
///     fn magnitude(&self) -> f64 {
///         self.x.hypot(self.y)
///     }
/// }
///
/// let ctx = Context::new();
/// let info = CallInfo::new(&ctx, &[]);
/// let p = Point { x: 3.0, y: 4.0 };
/// let result = typed_call_ref(&info, Point::magnitude, &p, ()).unwrap();
/// assert_eq!(result, Value::Number(5.0));
/// ```
pub fn typed_call_ref<'r, T, Func, Caller, Defaults>(
    info: &CallInfo<'_>,
    f: Func,
    receiver: &'r T,
    defaults: Defaults,
) -> Result<Value, CallError>
where
    Caller: ArgPack,
    Func: NativeMethod<&'r T, Caller, Defaults>,
    Func::Out: IntoValue,
{
    trace!(
        expected = Caller::ARITY,
        got = info.arg_count(),
        "dispatching native method call"
    );
    let caller = Caller::extract(info)?;
    Ok(f.invoke(receiver, caller, defaults).into_value(info.context()))
}

/// Dispatch a script call onto a `&mut self` method of `receiver`.
pub fn typed_call_mut<'r, T, Func, Caller, Defaults>(
    info: &CallInfo<'_>,
    f: Func,
    receiver: &'r mut T,
    defaults: Defaults,
) -> Result<Value, CallError>
where
    Caller: ArgPack,
    Func: NativeMethod<&'r mut T, Caller, Defaults>,
    Func::Out: IntoValue,
{
    trace!(
        expected = Caller::ARITY,
        got = info.arg_count(),
        "dispatching native method call"
    );
    let caller = Caller::extract(info)?;
    Ok(f.invoke(receiver, caller, defaults).into_value(info.context()))
}

/// Dispatch a script call onto a consuming (`self`) method, moving
/// `receiver` into the invocation. The rvalue-qualified shape: the instance
/// is gone after the call.
pub fn typed_call_owned<T, Func, Caller, Defaults>(
    info: &CallInfo<'_>,
    f: Func,
    receiver: T,
    defaults: Defaults,
) -> Result<Value, CallError>
where
    Caller: ArgPack,
    Func: NativeMethod<T, Caller, Defaults>,
    Func::Out: IntoValue,
{
    trace!(
        expected = Caller::ARITY,
        got = info.arg_count(),
        "dispatching native method call"
    );
    let caller = Caller::extract(info)?;
    Ok(f.invoke(receiver, caller, defaults).into_value(info.context()))
}

/// A registered binding: a function plus its defaults, ready to be stored
/// by an embedder and dispatched many times.
pub type BoundFn = Arc<dyn Fn(&CallInfo<'_>) -> Result<Value, CallError> + Send + Sync>;

/// Close over a function and its defaults so an embedder can register the
/// binding once and call it per incoming script call. Defaults are cloned
/// for each dispatch.
///
/// # Examples
///
/// ```
/// use tether_bind::call::{bind, CallInfo};
/// use tether_bind::value::{Context, Value};
///
/// fn scale(v: f64, factor: f64) -> f64 {
///     v * factor
/// }
///
/// let binding = bind(scale, (2.0,));
///
/// let ctx = Context::new();
/// let args = [Value::Number(21.0)];
/// let info = CallInfo::new(&ctx, &args);
/// assert_eq!(binding(&info).unwrap(), Value::Number(42.0));
/// ```
pub fn bind<Func, Caller, Defaults>(f: Func, defaults: Defaults) -> BoundFn
where
    Caller: ArgPack + 'static,
    Func: NativeFunction<Caller, Defaults> + Send + Sync + 'static,
    Func::Out: IntoValue,
    Defaults: Clone + Send + Sync + 'static,
{
    Arc::new(move |info| dispatch(info, &f, defaults.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn ctx() -> Context {
        Context::new()
    }

    fn add(a: i32, b: i32) -> i32 {
        a + b
    }

    #[test]
    fn test_free_function_exact_arity() {
        let c = ctx();
        let args = [Value::Number(2.0), Value::Number(3.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(typed_call(&info, add, ()).unwrap(), Value::Number(5.0));
    }

    #[test]
    fn test_arity_mismatch_too_few_and_too_many() {
        let c = ctx();

        let info = CallInfo::new(&c, &[]);
        assert_eq!(
            typed_call(&info, add, ()).unwrap_err(),
            CallError::ArityMismatch {
                expected: 2,
                got: 0
            }
        );

        let args = [Value::Number(2.0), Value::Number(3.0), Value::Number(4.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(
            typed_call(&info, add, ()).unwrap_err(),
            CallError::ArityMismatch {
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_arity_failure_never_invokes_callable() {
        let c = ctx();
        let calls = Cell::new(0u32);
        let counted = |a: i32, b: i32| {
            calls.set(calls.get() + 1);
            a + b
        };

        let info = CallInfo::new(&c, &[]);
        assert!(typed_call(&info, &counted, ()).is_err());
        assert_eq!(calls.get(), 0);

        let args = [Value::Number(1.0), Value::Number(2.0)];
        let info = CallInfo::new(&c, &args);
        assert!(typed_call(&info, &counted, ()).is_ok());
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_conversion_failure_reports_leftmost_position() {
        let c = ctx();
        // Both positions are wrong; position 0 must be reported.
        let args = [Value::string("x"), Value::string("y")];
        let info = CallInfo::new(&c, &args);
        match typed_call(&info, add, ()).unwrap_err() {
            CallError::InvalidArgument { index, .. } => assert_eq!(index, 0),
            other => panic!("unexpected error: {other:?}"),
        }

        // Only position 1 is wrong.
        let args = [Value::Number(1.0), Value::string("y")];
        let info = CallInfo::new(&c, &args);
        match typed_call(&info, add, ()).unwrap_err() {
            CallError::InvalidArgument { index, .. } => assert_eq!(index, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_conversion_failure_never_invokes_callable() {
        let c = ctx();
        let calls = Cell::new(0u32);
        let counted = |a: i32, b: i32| {
            calls.set(calls.get() + 1);
            a + b
        };
        let args = [Value::Number(1.0), Value::string("y")];
        let info = CallInfo::new(&c, &args);
        assert!(typed_call(&info, &counted, ()).is_err());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_trailing_defaults_fill_suffix() {
        let c = ctx();
        let join = |a: String, b: String, sep: String| format!("{a}{sep}{b}");

        let args = [Value::string("x"), Value::string("y")];
        let info = CallInfo::new(&c, &args);
        let result = typed_call(&info, join, (String::from("-"),)).unwrap();
        assert_eq!(result, Value::string("x-y"));
    }

    #[test]
    fn test_defaults_are_never_overridden_by_extra_arguments() {
        let c = ctx();
        let join = |a: String, b: String, sep: String| format!("{a}{sep}{b}");

        // Caller-visible arity is 3 - 1 = 2; a third argument is an error.
        let args = [Value::string("x"), Value::string("y"), Value::string("+")];
        let info = CallInfo::new(&c, &args);
        assert_eq!(
            typed_call(&info, join, (String::from("-"),)).unwrap_err(),
            CallError::ArityMismatch {
                expected: 2,
                got: 3
            }
        );
    }

    #[test]
    fn test_all_parameters_defaulted() {
        let c = ctx();
        let info = CallInfo::new(&c, &[]);
        let result = typed_call(&info, add, (1, 2)).unwrap();
        assert_eq!(result, Value::Number(3.0));
    }

    #[test]
    fn test_unit_return_yields_undefined() {
        let c = ctx();
        let sink = |_n: f64| {};
        let args = [Value::Number(1.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(typed_call(&info, sink, ()).unwrap(), Value::Undefined);
    }

    struct Counter {
        total: i32,
    }

    impl Counter {
        fn total(&self) -> i32 {
            self.total
        }

        fn add(&mut self, n: i32) -> i32 {
            self.total += n;
            self.total
        }

        fn into_total(self) -> i32 {
            self.total
        }
    }

    #[test]
    fn test_method_by_reference() {
        let c = ctx();
        let counter = Counter { total: 7 };
        let info = CallInfo::new(&c, &[]);
        let result = typed_call_ref(&info, Counter::total, &counter, ()).unwrap();
        assert_eq!(result, Value::Number(7.0));
    }

    #[test]
    fn test_method_by_mutable_reference() {
        let c = ctx();
        let mut counter = Counter { total: 1 };
        let args = [Value::Number(4.0)];
        let info = CallInfo::new(&c, &args);
        let result = typed_call_mut(&info, Counter::add, &mut counter, ()).unwrap();
        assert_eq!(result, Value::Number(5.0));
        assert_eq!(counter.total, 5);
    }

    #[test]
    fn test_method_by_move() {
        let c = ctx();
        let counter = Counter { total: 9 };
        let info = CallInfo::new(&c, &[]);
        let result = typed_call_owned(&info, Counter::into_total, counter, ()).unwrap();
        assert_eq!(result, Value::Number(9.0));
    }

    #[test]
    fn test_method_with_default() {
        let c = ctx();
        let mut counter = Counter { total: 0 };
        let info = CallInfo::new(&c, &[]);
        let result = typed_call_mut(&info, Counter::add, &mut counter, (10,)).unwrap();
        assert_eq!(result, Value::Number(10.0));
    }

    #[test]
    fn test_method_arity_checked_before_invocation() {
        let c = ctx();
        let mut counter = Counter { total: 3 };
        let args = [Value::Number(1.0), Value::Number(2.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(
            typed_call_mut(&info, Counter::add, &mut counter, ()).unwrap_err(),
            CallError::ArityMismatch {
                expected: 1,
                got: 2
            }
        );
        assert_eq!(counter.total, 3);
    }

    #[test]
    fn test_bound_fn_is_reusable() {
        let c = ctx();
        let binding = bind(add, ());

        let args = [Value::Number(2.0), Value::Number(3.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(binding(&info).unwrap(), Value::Number(5.0));

        let args = [Value::Number(10.0), Value::Number(20.0)];
        let info = CallInfo::new(&c, &args);
        assert_eq!(binding(&info).unwrap(), Value::Number(30.0));
    }

    #[test]
    fn test_bound_fn_clones_defaults_per_call() {
        let c = ctx();
        let suffix = |base: String, tail: String| format!("{base}{tail}");
        let binding = bind(suffix, (String::from("!"),));

        for name in ["Ada", "Grace"] {
            let args = [Value::string(name)];
            let info = CallInfo::new(&c, &args);
            assert_eq!(binding(&info).unwrap(), Value::string(format!("{name}!")));
        }
    }

    #[test]
    fn test_call_info_accessors() {
        let c = ctx();
        let args = [Value::Number(1.0), Value::string("two")];
        let info = CallInfo::new(&c, &args);
        assert_eq!(info.arg_count(), 2);
        assert_eq!(info.arg(1), Some(&Value::string("two")));
        assert_eq!(info.arg(2), None);
    }
}

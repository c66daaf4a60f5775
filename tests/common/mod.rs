//! Native library shared by the integration tests.
//!
//! Classes and functions here mirror what a small native module would bind:
//! primitive round trips, properties, callbacks, value types, references,
//! arrays, nullable and strict parameters, a diamond hierarchy, overloads,
//! shared objects and byte buffers. Native-side state lives in thread locals;
//! each test runs on its own thread and builds one runtime through
//! [`runtime`], which resets it.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use bindery::{
    Adjustment, BoundFunction, CallbackHandle, CallbackSignature, ClassDescriptor,
    ConversionPolicy, Native, NativeError, NativeValue, ObjectRef, OverloadCandidate,
    PropertyDescriptor, Runtime, RuntimeConfig, TypeHash, TypeRegistry, TypeSpec,
    ValueTypeDescriptor, primitives,
};

pub const PRIMITIVE_METHODS: TypeHash = TypeHash::from_name("PrimitiveMethods");
pub const GETTER_SETTER: TypeHash = TypeHash::from_name("GetterSetter");
pub const CALLBACK: TypeHash = TypeHash::from_name("Callback");
pub const NOTIFIER: TypeHash = TypeHash::from_name("Notifier");
pub const COORD: TypeHash = TypeHash::from_name("Coord");
pub const VALUE: TypeHash = TypeHash::from_name("Value");
pub const REFERENCE: TypeHash = TypeHash::from_name("Reference");
pub const ARRAY: TypeHash = TypeHash::from_name("Array");
pub const VECTOR: TypeHash = TypeHash::from_name("Vector");
pub const STRICT: TypeHash = TypeHash::from_name("Strict");
pub const INHERITANCE_A: TypeHash = TypeHash::from_name("InheritanceA");
pub const INHERITANCE_B: TypeHash = TypeHash::from_name("InheritanceB");
pub const INHERITANCE_C: TypeHash = TypeHash::from_name("InheritanceC");
pub const INHERITANCE_D: TypeHash = TypeHash::from_name("InheritanceD");
pub const OVERLOAD: TypeHash = TypeHash::from_name("Overload");
pub const SMART: TypeHash = TypeHash::from_name("Smart");
pub const BUFFER: TypeHash = TypeHash::from_name("Buffer");

thread_local! {
    static STATE: Cell<i32> = const { Cell::new(0) };
    static LABEL: RefCell<String> = const { RefCell::new(String::new()) };
    static NATIVE_CALLS: Cell<u32> = const { Cell::new(0) };
    static STORED: RefCell<Option<CallbackHandle>> = const { RefCell::new(None) };
    static SHARED_REFERENCE: RefCell<Option<ObjectRef>> = const { RefCell::new(None) };
    static SMART_DESTROYED: Cell<u32> = const { Cell::new(0) };
}

/// Static state of `PrimitiveMethods`.
pub fn state() -> i32 {
    STATE.get()
}

/// Label set by the two-argument `PrimitiveMethods` constructor.
pub fn label() -> String {
    LABEL.with_borrow(Clone::clone)
}

/// Number of times a `Callback` static entered native code.
pub fn native_calls() -> u32 {
    NATIVE_CALLS.get()
}

pub fn smart_destroyed() -> u32 {
    SMART_DESTROYED.get()
}

fn reset() {
    STATE.set(0);
    LABEL.set(String::new());
    NATIVE_CALLS.set(0);
    STORED.set(None);
    SHARED_REFERENCE.set(None);
    SMART_DESTROYED.set(0);
}

pub fn runtime() -> Runtime {
    runtime_with(RuntimeConfig::default())
}

pub fn runtime_with(config: RuntimeConfig) -> Runtime {
    reset();
    Runtime::with_config(registry(), config)
}

// ============================================================================
// TypeSpec helpers
// ============================================================================

pub fn int() -> TypeSpec {
    TypeSpec::of(primitives::INT32)
}

pub fn float() -> TypeSpec {
    TypeSpec::of(primitives::FLOAT64)
}

pub fn boolean() -> TypeSpec {
    TypeSpec::of(primitives::BOOL)
}

pub fn string() -> TypeSpec {
    TypeSpec::of(primitives::STRING)
}

pub fn cstring() -> TypeSpec {
    TypeSpec::of(primitives::CSTRING)
}

fn callback_type(
    registry: &mut TypeRegistry,
    params: Vec<TypeSpec>,
    ret: TypeSpec,
) -> TypeHash {
    registry
        .register_callback(CallbackSignature::new(params, ret))
        .expect("callback signature")
}

/// Whole library.
pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::with_primitives();
    register_values(&mut registry);
    register_primitive_methods(&mut registry);
    register_free_functions(&mut registry);
    register_getter_setter(&mut registry);
    register_callbacks(&mut registry);
    register_value_functions(&mut registry);
    register_reference(&mut registry);
    register_arrays(&mut registry);
    register_strict(&mut registry);
    register_inheritance(&mut registry);
    register_overload(&mut registry);
    register_smart(&mut registry);
    register_buffer(&mut registry);
    registry
}

/// Value types, the diamond hierarchy and the overload class only.
pub fn reflection_registry() -> TypeRegistry {
    let mut registry = TypeRegistry::with_primitives();
    register_values(&mut registry);
    register_inheritance(&mut registry);
    register_overload(&mut registry);
    registry
}

// ============================================================================
// Primitives
// ============================================================================

struct PrimitiveMethods;

fn negate() -> OverloadCandidate {
    OverloadCandidate::new(vec![boolean()], boolean(), |ctx| {
        let b: bool = ctx.arg(0)?;
        ctx.set_return(!b);
        Ok(())
    })
}

fn increment_int() -> OverloadCandidate {
    OverloadCandidate::new(vec![int()], int(), |ctx| {
        let n: i32 = ctx.arg(0)?;
        ctx.set_return(n + 1);
        Ok(())
    })
}

fn increment_state() -> OverloadCandidate {
    OverloadCandidate::new(vec![], TypeSpec::void(), |_| {
        STATE.set(STATE.get() + 1);
        Ok(())
    })
}

fn get_state() -> OverloadCandidate {
    OverloadCandidate::new(vec![], int(), |ctx| {
        ctx.set_return(STATE.get());
        Ok(())
    })
}

fn str_length() -> OverloadCandidate {
    OverloadCandidate::new(vec![string()], int(), |ctx| {
        let s: String = ctx.arg(0)?;
        ctx.set_return(s.chars().count() as i32);
        Ok(())
    })
}

fn catenate() -> OverloadCandidate {
    OverloadCandidate::new(vec![string(), string()], string(), |ctx| {
        let a: String = ctx.arg(0)?;
        let b: String = ctx.arg(1)?;
        ctx.set_return(a + &b);
        Ok(())
    })
}

fn catenate_cstrings() -> OverloadCandidate {
    OverloadCandidate::new(vec![cstring(), cstring()], string(), |ctx| {
        let a: Option<String> = ctx.arg(0)?;
        let b: Option<String> = ctx.arg(1)?;
        ctx.set_return(a.unwrap_or_default() + &b.unwrap_or_default());
        Ok(())
    })
}

fn register_primitive_methods(registry: &mut TypeRegistry) {
    let this = TypeSpec::of(PRIMITIVE_METHODS);
    let wide = TypeSpec::of(primitives::INT64);
    let uwide = TypeSpec::of(primitives::UINT64);

    registry
        .register_class(
            ClassDescriptor::new("PrimitiveMethods")
                .with_constructor(OverloadCandidate::new(vec![], this, |ctx| {
                    STATE.set(42);
                    ctx.set_return_object(PrimitiveMethods);
                    Ok(())
                }))
                .with_constructor(OverloadCandidate::new(vec![int()], this, |ctx| {
                    STATE.set(ctx.arg(0)?);
                    ctx.set_return_object(PrimitiveMethods);
                    Ok(())
                }))
                .with_constructor(OverloadCandidate::new(vec![int(), string()], this, |ctx| {
                    STATE.set(ctx.arg(0)?);
                    LABEL.set(ctx.arg(1)?);
                    ctx.set_return_object(PrimitiveMethods);
                    Ok(())
                }))
                .with_destructor(|_| {
                    STATE.set(STATE.get() + 1);
                    Ok(())
                })
                .with_method("negate", negate())
                .with_method("incrementInt", increment_int())
                .with_method("incrementState", increment_state())
                .with_method("getState", get_state().as_const())
                .with_method("strLength", str_length())
                .with_method("catenate", catenate())
                .with_method("catenate2", catenate_cstrings())
                .with_static("negateStatic", negate())
                .with_static("incrementIntStatic", increment_int())
                .with_static("incrementStateStatic", increment_state())
                .with_static("getStateStatic", get_state())
                .with_static("strLengthStatic", str_length())
                .with_static("catenateStatic", catenate())
                .with_static("catenate2Static", catenate_cstrings())
                .with_static(
                    "ftoull",
                    OverloadCandidate::new(vec![float()], uwide, |ctx| {
                        let f: f64 = ctx.arg(0)?;
                        ctx.set_return(f as u64);
                        Ok(())
                    }),
                )
                .with_static(
                    "ftoll",
                    OverloadCandidate::new(vec![float()], wide, |ctx| {
                        let f: f64 = ctx.arg(0)?;
                        ctx.set_return(f as i64);
                        Ok(())
                    }),
                )
                .with_static(
                    "ulltof",
                    OverloadCandidate::new(vec![uwide], float(), |ctx| {
                        let n: u64 = ctx.arg(0)?;
                        ctx.set_return(n as f64);
                        Ok(())
                    }),
                )
                .with_static(
                    "lltof",
                    OverloadCandidate::new(vec![wide], float(), |ctx| {
                        let n: i64 = ctx.arg(0)?;
                        ctx.set_return(n as f64);
                        Ok(())
                    }),
                ),
        )
        .expect("PrimitiveMethods");
}

fn register_free_functions(registry: &mut TypeRegistry) {
    registry
        .register_function(BoundFunction::new("incrementInt").with_overload(increment_int()))
        .expect("incrementInt");
    registry
        .register_function(BoundFunction::simple("decrementInt", vec![int()], int(), |ctx| {
            let n: i32 = ctx.arg(0)?;
            ctx.set_return(n - 1);
            Ok(())
        }))
        .expect("decrementInt");

    // natives that break their declared result type
    registry
        .register_function(BoundFunction::simple("isReady", vec![], boolean(), |ctx| {
            ctx.set_return(300i32);
            Ok(())
        }))
        .expect("isReady");
    registry
        .register_function(BoundFunction::simple(
            "small",
            vec![],
            TypeSpec::of(primitives::INT8),
            |_| Ok(()),
        ))
        .expect("small");
    registry
        .register_function(BoundFunction::simple(
            "tenth",
            vec![],
            TypeSpec::of(primitives::FLOAT32),
            |ctx| {
                ctx.set_return(0.1f64);
                Ok(())
            },
        ))
        .expect("tenth");
}

// ============================================================================
// Properties
// ============================================================================

struct GetterSetter {
    x: i32,
    y: i32,
    z: i32,
    t: String,
}

fn register_getter_setter(registry: &mut TypeRegistry) {
    registry
        .register_class(
            ClassDescriptor::new("GetterSetter")
                .with_constructor(OverloadCandidate::new(
                    vec![],
                    TypeSpec::of(GETTER_SETTER),
                    |ctx| {
                        ctx.set_return_object(GetterSetter {
                            x: 1,
                            y: 2,
                            z: 3,
                            t: "foobar".to_string(),
                        });
                        Ok(())
                    },
                ))
                .with_property(PropertyDescriptor::read_only("x", int(), |ctx| {
                    let x = ctx.this::<GetterSetter>()?.x;
                    ctx.set_return(x);
                    Ok(())
                }))
                .with_property(PropertyDescriptor::read_write(
                    "y",
                    int(),
                    |ctx| {
                        let y = ctx.this::<GetterSetter>()?.y;
                        ctx.set_return(y);
                        Ok(())
                    },
                    |ctx| {
                        let y: i32 = ctx.arg(0)?;
                        ctx.this::<GetterSetter>()?.y = y;
                        Ok(())
                    },
                ))
                .with_property(PropertyDescriptor::read_write(
                    "z",
                    int(),
                    |ctx| {
                        let z = ctx.this::<GetterSetter>()?.z;
                        ctx.set_return(z);
                        Ok(())
                    },
                    |ctx| {
                        let z: i32 = ctx.arg(0)?;
                        ctx.this::<GetterSetter>()?.z = z;
                        Ok(())
                    },
                ))
                .with_property(PropertyDescriptor::read_write(
                    "t",
                    string(),
                    |ctx| {
                        let t = ctx.this::<GetterSetter>()?.t.clone();
                        ctx.set_return(t);
                        Ok(())
                    },
                    |ctx| {
                        let t: String = ctx.arg(0)?;
                        ctx.this::<GetterSetter>()?.t = t;
                        Ok(())
                    },
                ))
                .with_property(PropertyDescriptor::read_only("XYZ", int(), |ctx| {
                    let sum = {
                        let this = ctx.this::<GetterSetter>()?;
                        this.x + this.y + this.z
                    };
                    ctx.set_return(sum);
                    Ok(())
                })),
        )
        .expect("GetterSetter");
}

// ============================================================================
// Callbacks
// ============================================================================

fn counted() {
    NATIVE_CALLS.set(NATIVE_CALLS.get() + 1);
}

struct Notifier;

fn register_callbacks(registry: &mut TypeRegistry) {
    let void_fn = callback_type(registry, vec![], TypeSpec::void());
    let negate_fn = callback_type(registry, vec![boolean()], boolean());
    let add_fn = callback_type(registry, vec![int(), int()], int());
    let double_fn = callback_type(registry, vec![float()], float());
    let catenate_fn = callback_type(registry, vec![string(), string()], string());

    registry
        .register_class(
            ClassDescriptor::new("Callback")
                .with_static(
                    "callVoidFunc",
                    OverloadCandidate::new(vec![TypeSpec::of(void_fn)], TypeSpec::void(), |ctx| {
                        counted();
                        ctx.callback(0)?.call(Vec::new())?;
                        Ok(())
                    }),
                )
                .with_static(
                    "callNegate",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(negate_fn), boolean()],
                        boolean(),
                        |ctx| {
                            counted();
                            let b: bool = ctx.arg(1)?;
                            let result: bool = ctx.callback(0)?.call_with(vec![Native::Bool(b)])?;
                            ctx.set_return(result);
                            Ok(())
                        },
                    ),
                )
                .with_static(
                    "callAddInt",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(add_fn), int(), int()],
                        int(),
                        |ctx| {
                            counted();
                            let args = vec![ctx.take_arg(1)?, ctx.take_arg(2)?];
                            let sum: i32 = ctx.callback(0)?.call_with(args)?;
                            ctx.set_return(sum);
                            Ok(())
                        },
                    ),
                )
                .with_static(
                    "callIncrementDouble",
                    OverloadCandidate::new(vec![TypeSpec::of(double_fn), float()], float(), |ctx| {
                        counted();
                        let f: f64 = ctx.arg(1)?;
                        let result: f64 = ctx.callback(0)?.call_with(vec![Native::Float(f)])?;
                        ctx.set_return(result);
                        Ok(())
                    }),
                )
                .with_static(
                    "callCatenate",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(catenate_fn), string(), string()],
                        string(),
                        |ctx| {
                            counted();
                            let args = vec![ctx.take_arg(1)?, ctx.take_arg(2)?];
                            let result: String = ctx.callback(0)?.call_with(args)?;
                            ctx.set_return(result);
                            Ok(())
                        },
                    ),
                )
                .with_static(
                    "storeCallback",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(void_fn).retained()],
                        TypeSpec::void(),
                        |ctx| {
                            let callback = ctx.callback(0)?;
                            STORED.set(Some(callback));
                            Ok(())
                        },
                    ),
                )
                .with_static(
                    "storeScoped",
                    OverloadCandidate::new(vec![TypeSpec::of(void_fn)], TypeSpec::void(), |ctx| {
                        let callback = ctx.callback(0)?;
                        STORED.set(Some(callback));
                        Ok(())
                    }),
                )
                .with_static(
                    "callStored",
                    OverloadCandidate::new(vec![], TypeSpec::void(), |_| {
                        let Some(callback) = STORED.with_borrow(Clone::clone) else {
                            return Err(NativeError::other("no stored callback"));
                        };
                        callback.call(Vec::new())?;
                        Ok(())
                    }),
                ),
        )
        .expect("Callback");

    // fires the stored callback from its destructor
    registry
        .register_class(
            ClassDescriptor::new("Notifier")
                .with_constructor(OverloadCandidate::new(vec![], TypeSpec::of(NOTIFIER), |ctx| {
                    ctx.set_return_object(Notifier);
                    Ok(())
                }))
                .with_destructor(|_| {
                    if let Some(callback) = STORED.with_borrow(Clone::clone) {
                        callback.call(Vec::new())?;
                    }
                    Ok(())
                }),
        )
        .expect("Notifier");
}

// ============================================================================
// Value types and nullable parameters
// ============================================================================

fn register_values(registry: &mut TypeRegistry) {
    registry
        .register_value_type(
            ValueTypeDescriptor::new("Coord")
                .with_field("x", float())
                .with_field("y", float()),
        )
        .expect("Coord");
}

pub fn coord(x: f64, y: f64) -> Native {
    Native::Value(NativeValue::new(COORD, vec![Native::Float(x), Native::Float(y)]))
}

fn coord_fields(native: &Native) -> Result<(f64, f64), NativeError> {
    match native {
        Native::Value(value) => match value.fields.as_slice() {
            [Native::Float(x), Native::Float(y)] => Ok((*x, *y)),
            _ => Err(NativeError::other("malformed Coord")),
        },
        other => Err(NativeError::other(format!("expected Coord, got {}", other.type_name()))),
    }
}

fn register_value_functions(registry: &mut TypeRegistry) {
    let coord_spec = TypeSpec::of(COORD);
    let coord_fn = callback_type(registry, vec![coord_spec, coord_spec], coord_spec);

    registry
        .register_class(
            ClassDescriptor::new("Value")
                .with_static(
                    "getCoord",
                    OverloadCandidate::new(vec![], coord_spec, |ctx| {
                        ctx.set_return_native(coord(60.0, 25.0));
                        Ok(())
                    }),
                )
                .with_static(
                    "callWithCoord",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(coord_fn), coord_spec, coord_spec],
                        coord_spec,
                        |ctx| {
                            let args = vec![ctx.take_arg(1)?, ctx.take_arg(2)?];
                            let result = ctx.callback(0)?.call(args)?;
                            coord_fields(&result)?;
                            ctx.set_return_native(result);
                            Ok(())
                        },
                    ),
                )
                .with_static(
                    "getNull",
                    OverloadCandidate::new(vec![], coord_spec.nullable(), |ctx| {
                        ctx.set_return_native(Native::Null);
                        Ok(())
                    }),
                ),
        )
        .expect("Value");

    registry
        .register_function(BoundFunction::simple("foo", vec![coord_spec], float(), |ctx| {
            let (x, _) = coord_fields(ctx.arg_native(0)?)?;
            ctx.set_return(x);
            Ok(())
        }))
        .expect("foo");
    registry
        .register_function(BoundFunction::simple(
            "bar",
            vec![coord_spec.nullable()],
            boolean(),
            |ctx| {
                let is_null = ctx.arg_native(0)?.is_null();
                ctx.set_return(is_null);
                Ok(())
            },
        ))
        .expect("bar");
}

// ============================================================================
// References and constness
// ============================================================================

struct Reference {
    value: i32,
}

/// The process-wide instance handed out by `getPtr` and `getConstPtr`.
fn shared_reference(ctx: &bindery::CallContext<'_>) -> ObjectRef {
    SHARED_REFERENCE.with_borrow_mut(|slot| {
        slot.get_or_insert_with(|| ctx.allocate(REFERENCE, Reference { value: 0 }))
            .clone()
    })
}

fn register_reference(registry: &mut TypeRegistry) {
    let this = TypeSpec::of(REFERENCE);
    let ptr = this.borrowed();
    let const_ptr = this.borrowed().constant();
    let visit_fn = callback_type(registry, vec![], TypeSpec::void());

    registry
        .register_class(
            ClassDescriptor::new("Reference")
                .with_constructor(OverloadCandidate::new(vec![], this, |ctx| {
                    ctx.set_return_object(Reference { value: 0 });
                    Ok(())
                }))
                .with_static(
                    "getValue",
                    OverloadCandidate::new(vec![], this, |ctx| {
                        ctx.set_return_object(Reference { value: 0 });
                        Ok(())
                    }),
                )
                .with_static(
                    "getPtr",
                    OverloadCandidate::new(vec![], ptr, |ctx| {
                        let object = shared_reference(ctx);
                        ctx.set_return_native(Native::Object(object));
                        Ok(())
                    }),
                )
                .with_static(
                    "getConstPtr",
                    OverloadCandidate::new(vec![], const_ptr, |ctx| {
                        let object = shared_reference(ctx);
                        ctx.set_return_native(Native::Object(object));
                        Ok(())
                    }),
                )
                .with_static(
                    "readPtr",
                    OverloadCandidate::new(vec![const_ptr], int(), |ctx| {
                        let value = ctx.object::<Reference>(0)?.value;
                        ctx.set_return(value);
                        Ok(())
                    }),
                )
                .with_static(
                    "writePtr",
                    OverloadCandidate::new(vec![ptr, int()], TypeSpec::void(), |ctx| {
                        let value: i32 = ctx.arg(1)?;
                        ctx.object::<Reference>(0)?.value = value;
                        Ok(())
                    }),
                )
                .with_method(
                    "read",
                    OverloadCandidate::new(vec![], int(), |ctx| {
                        let value = ctx.this::<Reference>()?.value;
                        ctx.set_return(value);
                        Ok(())
                    })
                    .as_const(),
                )
                .with_method(
                    "write",
                    OverloadCandidate::new(vec![int()], TypeSpec::void(), |ctx| {
                        let value: i32 = ctx.arg(0)?;
                        ctx.this::<Reference>()?.value = value;
                        Ok(())
                    }),
                )
                .with_method(
                    "itself",
                    OverloadCandidate::new(vec![], this, |ctx| {
                        let this = ctx.this_ref()?.clone();
                        ctx.set_return_native(Native::Object(this));
                        Ok(())
                    }),
                )
                .with_method(
                    "hold",
                    OverloadCandidate::new(vec![TypeSpec::of(visit_fn)], int(), |ctx| {
                        let callback = ctx.callback(0)?;
                        let mut me = ctx.this::<Reference>()?;
                        callback.call(Vec::new())?;
                        me.value += 1;
                        let value = me.value;
                        drop(me);
                        ctx.set_return(value);
                        Ok(())
                    }),
                )
                .with_method(
                    "kind",
                    OverloadCandidate::new(vec![], string(), |ctx| {
                        ctx.set_return("mutable");
                        Ok(())
                    }),
                )
                .with_method(
                    "kind",
                    OverloadCandidate::new(vec![], string(), |ctx| {
                        ctx.set_return("const");
                        Ok(())
                    })
                    .as_const(),
                ),
        )
        .expect("Reference");
}

// ============================================================================
// Arrays and vectors
// ============================================================================

/// Calls the callback in argument 0 with argument 1 and returns its result.
fn call_through(ctx: &mut bindery::CallContext<'_>) -> Result<(), NativeError> {
    let arg = ctx.take_arg(1)?;
    let result = ctx.callback(0)?.call(vec![arg])?;
    ctx.set_return_native(result);
    Ok(())
}

fn register_arrays(registry: &mut TypeRegistry) {
    let ints = registry.register_array(primitives::INT32, 3).expect("array<int32, 3>");
    let int_vector = registry.register_vector(primitives::INT32).expect("vector<int32>");
    let strings = registry.register_vector(primitives::STRING).expect("vector<string>");
    let ints_fn = callback_type(registry, vec![TypeSpec::of(ints)], TypeSpec::of(ints));
    let strings_fn = callback_type(registry, vec![TypeSpec::of(strings)], TypeSpec::of(strings));

    registry
        .register_class(
            ClassDescriptor::new("Array")
                .with_static(
                    "getInts",
                    OverloadCandidate::new(vec![], TypeSpec::of(ints), |ctx| {
                        ctx.set_return(vec![13i32, 21, 34]);
                        Ok(())
                    }),
                )
                .with_static(
                    "callWithInts",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(ints_fn), TypeSpec::of(ints)],
                        TypeSpec::of(ints),
                        call_through,
                    ),
                ),
        )
        .expect("Array");

    registry
        .register_class(
            ClassDescriptor::new("Vector")
                .with_static(
                    "getInts",
                    OverloadCandidate::new(vec![], TypeSpec::of(int_vector), |ctx| {
                        ctx.set_return(vec![13i32, 21, 34]);
                        Ok(())
                    }),
                )
                .with_static(
                    "sum",
                    OverloadCandidate::new(vec![TypeSpec::of(int_vector)], int(), |ctx| {
                        let items: Vec<i32> = ctx.arg(0)?;
                        ctx.set_return(items.iter().sum::<i32>());
                        Ok(())
                    }),
                )
                .with_static(
                    "callWithStrings",
                    OverloadCandidate::new(
                        vec![TypeSpec::of(strings_fn), TypeSpec::of(strings)],
                        TypeSpec::of(strings),
                        call_through,
                    ),
                ),
        )
        .expect("Vector");
}

// ============================================================================
// Conversion policies
// ============================================================================

fn echo(spec: TypeSpec) -> OverloadCandidate {
    OverloadCandidate::new(vec![spec], spec, |ctx| {
        let arg = ctx.take_arg(0)?;
        ctx.set_return_native(arg);
        Ok(())
    })
}

fn echo_cstring() -> OverloadCandidate {
    OverloadCandidate::new(vec![cstring()], string(), |ctx| {
        let s: Option<String> = ctx.arg(0)?;
        ctx.set_return(s.unwrap_or_default());
        Ok(())
    })
}

fn register_strict(registry: &mut TypeRegistry) {
    let loose = [
        ("testInt", echo(int())),
        ("testBool", echo(boolean())),
        ("testString", echo(string())),
        ("testCString", echo_cstring()),
    ];
    let strict = [
        ("strictInt", echo(int())),
        ("strictBool", echo(boolean())),
        ("strictString", echo(string())),
        ("strictCString", echo_cstring()),
    ];

    for (name, candidate) in loose {
        registry
            .register_function(BoundFunction::new(name).with_overload(candidate))
            .expect("loose function");
    }
    for (name, candidate) in strict {
        registry
            .register_function(
                BoundFunction::new(name)
                    .with_policy(ConversionPolicy::Strict)
                    .with_overload(candidate),
            )
            .expect("strict function");
    }

    // strict by class, with one loose method
    registry
        .register_class(
            ClassDescriptor::new("Strict")
                .with_policy(ConversionPolicy::Strict)
                .with_constructor(OverloadCandidate::new(vec![], TypeSpec::of(STRICT), |ctx| {
                    ctx.set_return_object(());
                    Ok(())
                }))
                .with_method("testInt", echo(int()))
                .with_method("testString", echo(string()))
                .with_method("testLoose", echo(int()).with_policy(ConversionPolicy::Loose))
                .with_static("testIntStatic", echo(int())),
        )
        .expect("Strict");
}

// ============================================================================
// Inheritance
// ============================================================================

pub struct InheritanceA {
    marker: i32,
}

pub struct InheritanceB {
    a: InheritanceA,
}

pub struct InheritanceC {
    a: InheritanceA,
}

/// `B` and `C` share one `A`, stored in `a`; the copies inside `b` and `c`
/// are never reached.
pub struct InheritanceD {
    b: InheritanceB,
    c: InheritanceC,
    a: InheritanceA,
}

fn base_a(marker: i32) -> InheritanceA {
    InheritanceA { marker }
}

fn constant(value: i32) -> OverloadCandidate {
    OverloadCandidate::new(vec![], int(), move |ctx| {
        ctx.set_return(value);
        Ok(())
    })
}

fn self_as(spec: TypeSpec) -> PropertyDescriptor {
    let name = match spec.type_hash {
        INHERITANCE_A => "a",
        INHERITANCE_B => "b",
        _ => "c",
    };
    PropertyDescriptor::read_only(name, spec.borrowed(), |ctx| {
        let this = ctx.this_ref()?.clone();
        ctx.set_return_native(Native::Object(this));
        Ok(())
    })
}

fn register_inheritance(registry: &mut TypeRegistry) {
    let a = TypeSpec::of(INHERITANCE_A);
    let b = TypeSpec::of(INHERITANCE_B);
    let c = TypeSpec::of(INHERITANCE_C);
    let d = TypeSpec::of(INHERITANCE_D);

    registry
        .register_class(
            ClassDescriptor::new("InheritanceA")
                .with_constructor(OverloadCandidate::new(vec![], a, |ctx| {
                    ctx.set_return_object(base_a(1));
                    Ok(())
                }))
                .with_method(
                    "useA",
                    OverloadCandidate::new(vec![], int(), |ctx| {
                        let marker = ctx.this::<InheritanceA>()?.marker;
                        ctx.set_return(marker);
                        Ok(())
                    }),
                )
                .with_static(
                    "staticA",
                    OverloadCandidate::new(vec![a], int(), |ctx| {
                        let marker = ctx.object::<InheritanceA>(0)?.marker;
                        ctx.set_return(marker);
                        Ok(())
                    }),
                ),
        )
        .expect("InheritanceA");

    registry
        .register_class(
            ClassDescriptor::new("InheritanceB")
                .with_constructor(OverloadCandidate::new(vec![], b, |ctx| {
                    ctx.set_return_object(InheritanceB { a: base_a(1) });
                    Ok(())
                }))
                .with_method("useB", constant(2))
                .with_static(
                    "staticB",
                    OverloadCandidate::new(vec![b], int(), |ctx| {
                        ctx.object::<InheritanceB>(0)?;
                        ctx.set_return(2);
                        Ok(())
                    }),
                )
                .with_property(self_as(a)),
        )
        .expect("InheritanceB");

    registry
        .register_class(
            ClassDescriptor::new("InheritanceC")
                .with_constructor(OverloadCandidate::new(vec![], c, |ctx| {
                    ctx.set_return_object(InheritanceC { a: base_a(1) });
                    Ok(())
                }))
                .with_method("useC", constant(3))
                .with_static(
                    "staticC",
                    OverloadCandidate::new(vec![c], int(), |ctx| {
                        ctx.object::<InheritanceC>(0)?;
                        ctx.set_return(3);
                        Ok(())
                    }),
                )
                .with_property(self_as(a)),
        )
        .expect("InheritanceC");

    registry
        .register_class(
            ClassDescriptor::new("InheritanceD")
                .with_constructor(OverloadCandidate::new(vec![], d, |ctx| {
                    ctx.set_return_object(InheritanceD {
                        b: InheritanceB { a: base_a(0) },
                        c: InheritanceC { a: base_a(0) },
                        a: base_a(1),
                    });
                    Ok(())
                }))
                .with_method("useD", constant(4))
                .with_property(self_as(a))
                .with_property(self_as(b))
                .with_property(self_as(c)),
        )
        .expect("InheritanceD");

    registry
        .register_virtual_base(
            INHERITANCE_B,
            INHERITANCE_A,
            Adjustment::field::<InheritanceB, InheritanceA>(|b| &mut b.a),
        )
        .expect("B : virtual A");
    registry
        .register_virtual_base(
            INHERITANCE_C,
            INHERITANCE_A,
            Adjustment::field::<InheritanceC, InheritanceA>(|c| &mut c.a),
        )
        .expect("C : virtual A");
    registry
        .register_base(
            INHERITANCE_D,
            INHERITANCE_B,
            Adjustment::field::<InheritanceD, InheritanceB>(|d| &mut d.b),
        )
        .expect("D : B");
    registry
        .register_base(
            INHERITANCE_D,
            INHERITANCE_C,
            Adjustment::field::<InheritanceD, InheritanceC>(|d| &mut d.c),
        )
        .expect("D : C");
    registry
        .register_virtual_base_location(
            INHERITANCE_D,
            INHERITANCE_A,
            Adjustment::field::<InheritanceD, InheritanceA>(|d| &mut d.a),
        )
        .expect("A in D");
}

// ============================================================================
// Overloads
// ============================================================================

fn arity(params: usize) -> OverloadCandidate {
    OverloadCandidate::new(vec![int(); params], int(), move |ctx| {
        ctx.set_return(params as i32);
        Ok(())
    })
}

fn describe(spec: TypeSpec, label: &'static str) -> OverloadCandidate {
    OverloadCandidate::new(vec![spec], string(), move |ctx| {
        ctx.set_return(label);
        Ok(())
    })
}

fn register_overload(registry: &mut TypeRegistry) {
    registry
        .register_class(
            ClassDescriptor::new("Overload")
                .with_constructor(OverloadCandidate::new(vec![], TypeSpec::of(OVERLOAD), |ctx| {
                    ctx.set_return_object(());
                    Ok(())
                }))
                .with_method("test", arity(1))
                .with_method("test", arity(2))
                .with_method("testConst", arity(1).as_const())
                .with_method("testConst", arity(2).as_const())
                .with_static("testStatic", arity(1))
                .with_static("testStatic", arity(2)),
        )
        .expect("Overload");

    registry
        .register_function(
            BoundFunction::new("multiTest")
                .with_overload(arity(1))
                .with_overload(arity(2)),
        )
        .expect("multiTest");
    registry
        .register_function(
            BoundFunction::new("describe")
                .with_overload(describe(int(), "int"))
                .with_overload(describe(string(), "string"))
                .with_overload(describe(boolean(), "bool")),
        )
        .expect("describe");
    registry
        .register_function(
            BoundFunction::new("pick")
                .with_overload(OverloadCandidate::new(vec![int(), string()], int(), |ctx| {
                    ctx.set_return(1);
                    Ok(())
                }))
                .with_overload(OverloadCandidate::new(vec![string(), int()], int(), |ctx| {
                    ctx.set_return(2);
                    Ok(())
                })),
        )
        .expect("pick");
}

// ============================================================================
// Shared objects
// ============================================================================

struct Smart {
    value: i32,
}

fn register_smart(registry: &mut TypeRegistry) {
    let this = TypeSpec::of(SMART);
    registry
        .register_class(
            ClassDescriptor::new("Smart")
                .with_destructor(|_| {
                    SMART_DESTROYED.set(SMART_DESTROYED.get() + 1);
                    Ok(())
                })
                .with_static(
                    "make",
                    OverloadCandidate::new(vec![int()], this.shared(), |ctx| {
                        let value: i32 = ctx.arg(0)?;
                        ctx.set_return_object(Smart { value });
                        Ok(())
                    }),
                )
                .with_static(
                    "share",
                    OverloadCandidate::new(vec![this], this.shared(), |ctx| {
                        let object = ctx.object_ref(0)?.clone();
                        ctx.set_return_native(Native::Object(object));
                        Ok(())
                    }),
                )
                .with_static(
                    "testStatic",
                    OverloadCandidate::new(vec![this], int(), |ctx| {
                        let value = ctx.object::<Smart>(0)?.value;
                        ctx.set_return(value);
                        Ok(())
                    }),
                )
                .with_static(
                    "testShared",
                    OverloadCandidate::new(vec![this.shared()], int(), |ctx| {
                        let value = ctx.object::<Smart>(0)?.value;
                        ctx.set_return(value);
                        Ok(())
                    }),
                )
                .with_method(
                    "test",
                    OverloadCandidate::new(vec![], int(), |ctx| {
                        let value = ctx.this::<Smart>()?.value;
                        ctx.set_return(value);
                        Ok(())
                    })
                    .as_const(),
                ),
        )
        .expect("Smart");
}

// ============================================================================
// Buffers
// ============================================================================

fn register_buffer(registry: &mut TypeRegistry) {
    let buffer = TypeSpec::of(primitives::BUFFER);
    registry
        .register_class(
            ClassDescriptor::new("Buffer")
                .with_static(
                    "sum",
                    OverloadCandidate::new(vec![buffer], int(), |ctx| {
                        let view = ctx.bytes(0)?;
                        let total: i32 = view.bytes().iter().map(|b| i32::from(*b)).sum();
                        ctx.set_return(total);
                        Ok(())
                    }),
                )
                .with_static(
                    "mul2",
                    OverloadCandidate::new(vec![buffer], TypeSpec::void(), |ctx| {
                        let view = ctx.bytes(0)?;
                        let Some(mut bytes) = view.try_bytes_mut() else {
                            return Err(NativeError::other("buffer is in use"));
                        };
                        for byte in bytes.iter_mut() {
                            *byte = byte.wrapping_mul(2);
                        }
                        Ok(())
                    }),
                ),
        )
        .expect("Buffer");
}

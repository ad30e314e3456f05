//! `Int` and `Float` natives, and the numeric fast path of `BINARY`.
//!
//! Mixed operands promote to float. Integer arithmetic wraps; integer
//! division by zero raises `ZeroDivisionError`, float division follows
//! IEEE 754.

use std::rc::Rc;

use super::{receiver_error, single};
use crate::class::Class;
use crate::method::Arity;
use crate::opcode::BinaryOp;
use crate::registry::{ClassRegistry, ErrorKind};
use crate::runtime::{NativeResult, Runtime};
use crate::value::{format_float, Value};

#[derive(Debug, Clone, Copy)]
enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Int(n) => Some(Number::Int(*n)),
            Value::Float(x) => Some(Number::Float(*x)),
            _ => None,
        }
    }

    fn to_f64(self) -> f64 {
        match self {
            Number::Int(n) => n as f64,
            Number::Float(x) => x,
        }
    }
}

/// Apply `op` when both operands are numeric; `None` otherwise.
pub fn apply(
    registry: &ClassRegistry,
    op: BinaryOp,
    lhs: &Value,
    rhs: &Value,
) -> Option<NativeResult> {
    let result = match (Number::of(lhs)?, Number::of(rhs)?) {
        (Number::Int(a), Number::Int(b)) => int_op(registry, op, a, b),
        (a, b) => Ok(float_op(op, a.to_f64(), b.to_f64())),
    };
    Some(result)
}

fn int_op(registry: &ClassRegistry, op: BinaryOp, a: i64, b: i64) -> NativeResult {
    Ok(match op {
        BinaryOp::Add => Value::Int(a.wrapping_add(b)),
        BinaryOp::Sub => Value::Int(a.wrapping_sub(b)),
        BinaryOp::Mul => Value::Int(a.wrapping_mul(b)),
        BinaryOp::Div => {
            if b == 0 {
                return Err(registry.new_error(ErrorKind::ZeroDivision, "divided by 0"));
            }
            Value::Int(a.wrapping_div(b))
        }
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
    })
}

fn float_op(op: BinaryOp, a: f64, b: f64) -> Value {
    match op {
        BinaryOp::Add => Value::Float(a + b),
        BinaryOp::Sub => Value::Float(a - b),
        BinaryOp::Mul => Value::Float(a * b),
        BinaryOp::Div => Value::Float(a / b),
        BinaryOp::Eq => Value::Bool(a == b),
        BinaryOp::Ne => Value::Bool(a != b),
        BinaryOp::Gt => Value::Bool(a > b),
        BinaryOp::Ge => Value::Bool(a >= b),
        BinaryOp::Lt => Value::Bool(a < b),
        BinaryOp::Le => Value::Bool(a <= b),
    }
}

/// Native operator body: numeric result, or the documented fallback for a
/// non-numeric right-hand side.
fn operate(rt: &mut dyn Runtime, op: BinaryOp, recv: &Value, args: &[Value]) -> NativeResult {
    let rhs = single(rt, args)?;
    if let Some(result) = apply(rt.registry(), op, recv, rhs) {
        return result;
    }
    let (lhs_class, rhs_class) = (rt.class_name(recv), rt.class_name(rhs));
    match op {
        BinaryOp::Eq => Ok(Value::Bool(false)),
        BinaryOp::Ne => Ok(Value::Bool(true)),
        BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Le => Err(rt.new_error(
            ErrorKind::Type,
            format!(
                "invalid comparison ({}) between '{lhs_class}' and '{rhs_class}'",
                op.method_name()
            ),
        )),
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => Err(rt.new_error(
            ErrorKind::Type,
            format!(
                "unsupported operand type(s): '{lhs_class}' {} '{rhs_class}'",
                op.method_name()
            ),
        )),
    }
}

fn add(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Add, recv, args)
}

fn sub(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Sub, recv, args)
}

fn mul(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Mul, recv, args)
}

fn div(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Div, recv, args)
}

fn eq(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Eq, recv, args)
}

fn gt(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Gt, recv, args)
}

fn ge(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Ge, recv, args)
}

fn lt(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Lt, recv, args)
}

fn le(rt: &mut dyn Runtime, recv: &Value, args: &[Value]) -> NativeResult {
    operate(rt, BinaryOp::Le, recv, args)
}

fn negate(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    match recv {
        Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
        Value::Float(x) => Ok(Value::Float(-x)),
        other => Err(receiver_error(rt, "numeric", other)),
    }
}

fn identity(_: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    Ok(recv.clone())
}

fn inspect(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    match recv {
        Value::Int(n) => Ok(Value::string(n.to_string())),
        Value::Float(x) => Ok(Value::string(format_float(*x))),
        other => Err(receiver_error(rt, "numeric", other)),
    }
}

fn hash(rt: &mut dyn Runtime, recv: &Value, _: &[Value]) -> NativeResult {
    match recv {
        Value::Int(n) => Ok(Value::Int(*n)),
        Value::Float(x) => {
            let bits = x.to_bits();
            Ok(Value::Int((bits ^ (bits >> 32)) as i64))
        }
        other => Err(receiver_error(rt, "numeric", other)),
    }
}

pub(crate) fn install(int: &Rc<Class>, float: &Rc<Class>) {
    for class in [int, float] {
        class.define_native("+", Arity::Fixed(1), add);
        class.define_native("-", Arity::Fixed(1), sub);
        class.define_native("*", Arity::Fixed(1), mul);
        class.define_native("/", Arity::Fixed(1), div);
        class.define_native("==", Arity::Fixed(1), eq);
        class.define_native(">", Arity::Fixed(1), gt);
        class.define_native(">=", Arity::Fixed(1), ge);
        class.define_native("<", Arity::Fixed(1), lt);
        class.define_native("<=", Arity::Fixed(1), le);
        class.define_native("negate", Arity::Fixed(0), negate);
        class.define_native("usub", Arity::Fixed(0), negate);
        class.define_native("uadd", Arity::Fixed(0), identity);
        class.define_native("inspect", Arity::Fixed(0), inspect);
        class.define_native("hash", Arity::Fixed(0), hash);
    }
}

use crate::error::{LispError, LispResult};
use crate::eval::Machine;
use crate::value::{NativeFn, ObjId};

/// A native builtin. `eager` builtins are Functions (arguments evaluated
/// before the call); the rest are Syntax and see their argument expressions.
pub struct Builtin {
    pub name: &'static str,
    pub op: NativeFn,
    pub eager: bool,
}

/// Every builtin installed into a fresh machine.
///
/// All of them receive their argument count and pop from the operand stack
/// in LIFO order: the first entry popped is the last argument in source.
pub const BUILTINS: &[Builtin] = &[
    Builtin { name: "+", op: prim_add, eager: true },
    Builtin { name: "-", op: prim_sub, eager: true },
    Builtin { name: "*", op: prim_mul, eager: true },
    Builtin { name: "=", op: prim_eq, eager: true },
    Builtin { name: "<", op: prim_lt, eager: true },
    Builtin { name: ">", op: prim_gt, eager: true },
    Builtin { name: "car", op: prim_car, eager: true },
    Builtin { name: "cdr", op: prim_cdr, eager: true },
    Builtin { name: "if", op: form_if, eager: false },
    Builtin { name: "define", op: form_define, eager: false },
];

/// Drain the arguments and fail unless exactly `expected` were passed.
fn check_arity(
    m: &mut Machine,
    name: &str,
    argc: usize,
    expected: usize,
    expected_text: &'static str,
) -> LispResult<()> {
    if argc != expected {
        m.stack.pop_n_discard(argc)?;
        return Err(LispError::ArityMismatch {
            name: name.to_string(),
            expected: expected_text,
            got: argc,
        });
    }
    Ok(())
}

fn integers(m: &Machine, ids: &[ObjId]) -> LispResult<Vec<i64>> {
    ids.iter().map(|&id| m.object(id)?.as_integer()).collect()
}

/// Pop `n` integers. All entries are popped before any is inspected, so a
/// type error still leaves the stack drained.
fn pop_integers(m: &mut Machine, n: usize) -> LispResult<Vec<i64>> {
    let ids = m.stack.pop_n(n)?;
    integers(m, &ids)
}

/// (+ a b ...) — sum; (+) is 0.
fn prim_add(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    let sum = pop_integers(m, argc)?
        .into_iter()
        .fold(0i64, i64::wrapping_add);
    m.integer(sum)
}

/// (- a) negates; (- a b c ...) is a - b - c - ...
fn prim_sub(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    if argc == 0 {
        return Err(LispError::ArityMismatch {
            name: "-".into(),
            expected: "at least 1",
            got: 0,
        });
    }
    let rest = m.stack.pop_n(argc - 1)?;
    let first = m.stack.pop()?;
    let first = m.object(first)?.as_integer()?;
    let rest = integers(m, &rest)?;
    let value = if rest.is_empty() {
        first.wrapping_neg()
    } else {
        first.wrapping_sub(rest.into_iter().fold(0i64, i64::wrapping_add))
    };
    m.integer(value)
}

/// (* a b ...) — product; (*) is 1.
fn prim_mul(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    let product = pop_integers(m, argc)?
        .into_iter()
        .fold(1i64, i64::wrapping_mul);
    m.integer(product)
}

fn compare(
    m: &mut Machine,
    argc: usize,
    name: &str,
    test: fn(i64, i64) -> bool,
) -> LispResult<ObjId> {
    check_arity(m, name, argc, 2, "2")?;
    let b = m.stack.pop()?;
    let a = m.stack.pop()?;
    let b = m.object(b)?.as_integer()?;
    let a = m.object(a)?.as_integer()?;
    m.boolean(test(a, b))
}

fn prim_eq(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    compare(m, argc, "=", |a, b| a == b)
}

fn prim_lt(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    compare(m, argc, "<", |a, b| a < b)
}

fn prim_gt(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    compare(m, argc, ">", |a, b| a > b)
}

fn prim_car(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    check_arity(m, "car", argc, 1, "1")?;
    let x = m.stack.pop()?;
    m.object(x)?.car()
}

fn prim_cdr(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    check_arity(m, "cdr", argc, 1, "1")?;
    let x = m.stack.pop()?;
    m.object(x)?.cdr()
}

/// (if cond then else). Only the taken branch is evaluated. The three
/// expressions stay on the stack, and so stay rooted, until the chosen branch
/// has produced its value.
fn form_if(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    check_arity(m, "if", argc, 3, "3")?;
    let false_expr = m.stack.peek(0)?;
    let true_expr = m.stack.peek(1)?;
    let cond_expr = m.stack.peek(2)?;

    let cond = m.evaluate(cond_expr)?;
    let branch = if m.object(cond)?.is_truthy() {
        true_expr
    } else {
        false_expr
    };
    let value = m.evaluate(branch)?;
    m.stack.pop_n_discard(3)?;
    Ok(value)
}

/// (define name expr). Binds `expr` itself, unevaluated, unless the machine
/// was configured for eager definitions.
fn form_define(m: &mut Machine, argc: usize) -> LispResult<ObjId> {
    check_arity(m, "define", argc, 2, "2")?;
    let expr = m.stack.peek(0)?;
    let name_expr = m.stack.peek(1)?;

    let name = match m.object(name_expr)?.as_string() {
        Ok(name) => name.to_string(),
        Err(err) => {
            m.stack.pop_n_discard(2)?;
            return Err(err);
        }
    };
    let value = if m.eager_define {
        m.evaluate(expr)?
    } else {
        expr
    };
    m.env.define(&name, value);
    m.stack.pop_n_discard(2)?;
    m.void()
}

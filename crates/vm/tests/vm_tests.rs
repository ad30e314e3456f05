//! Integration tests for the Iracema VM.
//!
//! Tests cover:
//! - End-to-end programs: arithmetic, loops, iteration, handlers, objects
//! - Error taxonomy of uncaught errors (class and message)
//! - Catch scoping and unwinding across native re-entry
//! - Arity enforcement before a body runs
//! - Stack limits and malformed bytecode reported as host errors
//! - Integer arithmetic agrees with wrapping host arithmetic

use std::rc::Rc;

use iracema_lang::{Bytecode, Instruction, Method, Opcode, Value};
use iracema_vm::{Vm, VmError, VmOptions};
use proptest::prelude::*;

// ============================================================
// Helper functions
// ============================================================

fn compile_src(source: &str) -> Rc<Method> {
    let (file, errors) = iracema_syntax::parse_str(source);
    assert!(errors.is_empty(), "syntax errors in {source:?}: {errors:?}");
    let main = iracema_compiler::compile(&file)
        .unwrap_or_else(|e| panic!("compile error in {source:?}: {e}"));
    if let Err(errors) = iracema_verifier::verify(&main) {
        panic!("{source:?} failed verification: {errors:?}");
    }
    main
}

/// Run a program, returning its result and everything it printed.
fn run_with(source: &str, options: VmOptions) -> (Result<Value, VmError>, String) {
    let main = compile_src(source);
    let mut vm = Vm::with_options(Vec::new(), options);
    let result = vm.run(&main);
    let output = String::from_utf8(vm.into_output()).expect("utf-8 output");
    (result, output)
}

fn run_src(source: &str) -> (Result<Value, VmError>, String) {
    run_with(source, VmOptions::default())
}

fn eval(source: &str) -> Value {
    run_src(source)
        .0
        .unwrap_or_else(|e| panic!("{source:?} failed: {e}"))
}

/// Class and message of the error that escaped the program.
fn uncaught(source: &str) -> (String, String) {
    match run_src(source).0 {
        Err(VmError::Uncaught { class, message }) => (class, message),
        other => panic!("{source:?}: expected an uncaught error, got {other:?}"),
    }
}

fn word(opcode: Opcode, operand: u8) -> u16 {
    Instruction::new(opcode, operand).encode()
}

fn raw_method(code: Vec<u16>, constants: Vec<Value>) -> Rc<Method> {
    Rc::new(Method::bytecode(
        "main",
        0,
        Bytecode {
            code,
            constants,
            ..Bytecode::default()
        },
    ))
}

// ============================================================
// End-to-end programs
// ============================================================

#[test]
fn addition() {
    assert_eq!(eval("1 + 2"), Value::Int(3));
}

#[test]
fn while_loop_with_stop() {
    let source = "a = 10\nwhile a >= 0 {\n  if a == 5 { stop }\n  a = a - 1\n}\na";
    assert_eq!(eval(source), Value::Int(5));
}

#[test]
fn for_loop_prints_each_element() {
    let (result, output) = run_src("for e in [1, 2, 3] { puts(e) }");
    assert_eq!(result, Ok(Value::None));
    assert_eq!(output, "1\n2\n3\n");
}

#[test]
fn handler_replaces_the_result() {
    let source = "fun div(a, b) { a / b } catch(err: ZeroDivisionError) { \"oops\" }\ndiv(10, 0)";
    assert_eq!(eval(source), Value::string("oops"));
}

#[test]
fn uninitialised_field() {
    assert_eq!(
        uncaught("object Point { fun x() { @x } }\nPoint.new.x"),
        (
            "RuntimeError".to_string(),
            "'Point' object has no field 'x'".to_string()
        )
    );
}

#[test]
fn switch_selects_a_case() {
    let source = |key: i64| {
        format!("switch {key} {{ case 10: \"a\"; case 20: \"b\"; default: \"c\" }}")
    };
    assert_eq!(eval(&source(10)), Value::string("a"));
    assert_eq!(eval(&source(20)), Value::string("b"));
    assert_eq!(eval(&source(30)), Value::string("c"));
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(eval("1 + 0.5"), Value::Float(1.5));
    assert_eq!(eval("7 / 2"), Value::Int(3));
    assert_eq!(eval("1 < 1.5"), Value::Bool(true));
}

#[test]
fn unary_operators() {
    assert_eq!(eval("-(2 + 3)"), Value::Int(-5));
    assert_eq!(eval("!none"), Value::Bool(true));
    assert_eq!(eval("!0"), Value::Bool(false));
}

#[test]
fn nested_loops_with_next_and_stop() {
    let source = "for e in [1, 2] { for f in [3] { if f == 3 { next }\nstop }\nputs(e) }";
    let (result, output) = run_src(source);
    assert_eq!(result, Ok(Value::None));
    assert_eq!(output, "1\n2\n");
}

#[test]
fn return_from_inside_a_for_loop() {
    let source = "fun f(xs) { for x in xs { if x > 1 { return x } }\n0 }\nf([1, 2])";
    assert_eq!(eval(source), Value::Int(2));
}

#[test]
fn stop_inside_a_for_loop() {
    let (_, output) = run_src("for e in [1, 2, 3] { if e == 2 { stop }\nputs(e) }");
    assert_eq!(output, "1\n");
}

#[test]
fn attributes_are_per_instance() {
    let source = "object P { fun init(v) { @v = v }\nfun v { @v } }\na = P.new(1)\nb = P.new(2)\na.v + b.v * 10";
    assert_eq!(eval(source), Value::Int(21));
}

#[test]
fn super_calls_the_parent_method() {
    let source = "object A { fun init(v) { @v = v }\nfun v { @v } }\nobject B is A { fun init(v) { super(v + 1) } }\nB.new(1).v";
    assert_eq!(eval(source), Value::Int(2));
}

#[test]
fn bare_super_forwards_parameters() {
    let source = "object A { fun twice(n) { n * 2 } }\nobject B is A { fun twice(n) { super + 1 } }\nB.new.twice(5)";
    assert_eq!(eval(source), Value::Int(11));
}

#[test]
fn hash_literal_and_index() {
    let source = "h = {\"a\": 1, 2: [3]}\nh[\"b\"] = 4\nh[\"a\"] + h[\"b\"]";
    assert_eq!(eval(source), Value::Int(5));
}

#[test]
fn hash_literal_keeps_the_last_duplicate() {
    assert_eq!(eval("h = {\"k\": 1, \"k\": 2}\nh.size"), Value::Int(1));
    assert_eq!(eval("h = {\"k\": 1, \"k\": 2}\nh[\"k\"]"), Value::Int(2));
}

#[test]
fn top_level_functions_recurse() {
    let source = "fun fact(n) { if n <= 1 { return 1 }\nn * fact(n - 1) }\nfact(10)";
    assert_eq!(eval(source), Value::Int(3_628_800));
}

#[test]
fn constant_alias_binds_a_class() {
    assert_eq!(eval("Alias = Int\nAlias.name"), Value::string("Int"));
}

#[test]
fn user_inspect_is_used_by_puts() {
    let (result, output) = run_src("object P { fun inspect { \"pt\" } }\nputs(P.new)");
    assert_eq!(result, Ok(Value::None));
    assert_eq!(output, "pt\n");
}

#[test]
fn handler_binds_the_error() {
    let source = "fun g() { 1 / 0 } catch(e: ZeroDivisionError) { e.message }\ng()";
    assert_eq!(eval(source), Value::string("divided by 0"));
}

#[test]
fn handlers_are_tried_in_order() {
    let source = "fun g() { Nope } catch(e: ZeroDivisionError) { 1 } catch(e: NameError) { 2 } catch(Error) { 3 }\ng()";
    assert_eq!(eval(source), Value::Int(2));
}

#[test]
fn top_level_functions_are_script_methods() {
    assert_eq!(eval("fun f() { 41 }\nScript.new.f + 1"), Value::Int(42));
    let mut vm = Vm::new(Vec::new());
    let script = vm.run(&compile_src("Script.new")).unwrap();
    assert_eq!(vm.inspect_value(&script).unwrap(), "script");
}

#[test]
fn classes_persist_between_runs() {
    let mut vm = Vm::new(Vec::new());
    vm.run(&compile_src("object Kept { fun k { 7 } }")).unwrap();
    let value = vm.run(&compile_src("Kept.new.k")).unwrap();
    assert_eq!(value, Value::Int(7));
}

#[test]
fn inspect_value_renders_results() {
    let mut vm = Vm::new(Vec::new());
    let value = vm.run(&compile_src("[1, 2.5, \"s\", none]")).unwrap();
    assert_eq!(vm.inspect_value(&value).unwrap(), "[1, 2.5, s, none]");
}

// ============================================================
// Uncaught errors
// ============================================================

#[test]
fn uncaught_zero_division() {
    assert_eq!(
        uncaught("10 / 0"),
        (
            "ZeroDivisionError".to_string(),
            "divided by 0".to_string()
        )
    );
}

#[test]
fn unknown_constant() {
    assert_eq!(
        uncaught("Nope"),
        (
            "NameError".to_string(),
            "uninitialized constant Nope".to_string()
        )
    );
}

#[test]
fn unknown_method() {
    assert_eq!(
        uncaught("1.frob"),
        (
            "NoMethodError".to_string(),
            "undefined method 'frob' for Int".to_string()
        )
    );
}

#[test]
fn iterating_a_non_array() {
    assert_eq!(
        uncaught("for e in 5 { puts(e) }"),
        (
            "TypeError".to_string(),
            "'Int' object is not iterable".to_string()
        )
    );
}

#[test]
fn attribute_on_a_class_receiver() {
    assert_eq!(
        uncaught("object A { @x = 1 }"),
        (
            "RuntimeError".to_string(),
            "cannot access attribute 'x' on instance of 'Class'".to_string()
        )
    );
}

#[test]
fn uncaught_error_display() {
    let (result, _) = run_src("10 / 0");
    assert_eq!(
        result.unwrap_err().to_string(),
        "ZeroDivisionError: divided by 0"
    );
}

// ============================================================
// Catch scoping
// ============================================================

#[test]
fn error_in_handler_is_not_caught_by_the_same_frame() {
    let source = "fun f() { 1 / 0 } catch(e: ZeroDivisionError) { 2 / 0 }\nf()";
    assert_eq!(uncaught(source).0, "ZeroDivisionError");
}

#[test]
fn error_in_handler_reaches_the_caller() {
    let source = "fun f() { 1 / 0 } catch(e: ZeroDivisionError) { 2 / 0 }\nfun g() { f() } catch(e: ZeroDivisionError) { \"outer\" }\ng()";
    assert_eq!(eval(source), Value::string("outer"));
}

#[test]
fn unmatched_handler_rethrows() {
    let source = "fun f() { 1 / 0 } catch(e: NameError) { 1 }\nfun g() { f() } catch(e: RuntimeError) { e.message }\ng()";
    assert_eq!(eval(source), Value::string("divided by 0"));
}

#[test]
fn error_under_a_native_is_caught_by_the_caller() {
    let source = "object Bad { fun inspect { 1 / 0 } }\nfun show() { puts(Bad.new) } catch(e: ZeroDivisionError) { \"caught\" }\nshow()";
    let (result, output) = run_src(source);
    assert_eq!(result, Ok(Value::string("caught")));
    assert_eq!(output, "");
}

#[test]
fn error_under_a_native_escapes_when_uncaught() {
    let source = "object Bad { fun inspect { 1 / 0 } }\nputs(Bad.new)";
    assert_eq!(uncaught(source).0, "ZeroDivisionError");
}

// ============================================================
// Arity
// ============================================================

#[test]
fn too_many_arguments() {
    assert_eq!(
        uncaught("fun f(a) { a }\nf(1, 2)"),
        (
            "ArgumentError".to_string(),
            "wrong number of arguments (given 2, expected 1)".to_string()
        )
    );
}

#[test]
fn wrong_arity_does_not_run_the_body() {
    let (result, output) = run_src("fun f(a) { puts(\"ran\") }\nf()");
    assert!(matches!(result, Err(VmError::Uncaught { ref class, .. }) if class == "ArgumentError"));
    assert_eq!(output, "");
}

#[test]
fn native_arity_is_checked() {
    assert_eq!(
        uncaught("1.inspect(2)"),
        (
            "ArgumentError".to_string(),
            "wrong number of arguments (given 1, expected 0)".to_string()
        )
    );
}

#[test]
fn arity_error_is_catchable() {
    let source = "fun f(a) { a }\nfun g() { f() } catch(e: ArgumentError) { \"bad call\" }\ng()";
    assert_eq!(eval(source), Value::string("bad call"));
}

// ============================================================
// Host errors
// ============================================================

#[test]
fn unbounded_recursion_overflows_the_stack() {
    let options = VmOptions { stack_size: 64 };
    let (result, _) = run_with("fun r(n) { r(n + 1) }\nr(0)", options);
    assert_eq!(result, Err(VmError::StackOverflow { limit: 64 }));
}

#[test]
fn overflow_under_a_native_is_fatal() {
    let options = VmOptions { stack_size: 64 };
    let source = "object Deep { fun r(n) { r(n + 1) }\nfun inspect { r(0) } }\nfun show() { puts(Deep.new) } catch(Error) { 1 }\nshow()";
    let (result, output) = run_with(source, options);
    assert_eq!(result, Err(VmError::StackOverflow { limit: 64 }));
    assert_eq!(output, "");
}

#[test]
fn missing_constant_is_reported() {
    let main = raw_method(vec![word(Opcode::Push, 5), word(Opcode::Return, 0)], vec![]);
    assert_eq!(
        Vm::new(Vec::new()).run(&main),
        Err(VmError::BadConstant {
            method: "main".to_string(),
            at: 0,
            index: 5,
            expected: "literal",
        })
    );
}

#[test]
fn running_off_the_end_is_reported() {
    let main = raw_method(vec![word(Opcode::PushNone, 0)], vec![]);
    assert_eq!(
        Vm::new(Vec::new()).run(&main),
        Err(VmError::CodeOutOfBounds {
            method: "main".to_string(),
            at: 1,
        })
    );
}

#[test]
fn popping_an_empty_frame_is_reported() {
    let main = raw_method(vec![word(Opcode::Pop, 0), word(Opcode::Return, 0)], vec![]);
    assert_eq!(
        Vm::new(Vec::new()).run(&main),
        Err(VmError::StackUnderflow {
            method: "main".to_string(),
            at: 0,
        })
    );
}

#[test]
fn illegal_word_is_reported() {
    let main = raw_method(vec![0x0000], vec![]);
    assert!(matches!(
        Vm::new(Vec::new()).run(&main),
        Err(VmError::InvalidInstruction { at: 0, .. })
    ));
}

#[test]
fn native_method_cannot_be_run() {
    fn noop(_: &mut dyn iracema_lang::Runtime, _: &Value, _: &[Value]) -> iracema_lang::NativeResult {
        Ok(Value::None)
    }
    let main = Rc::new(Method::native("main", iracema_lang::Arity::Fixed(0), noop));
    assert_eq!(
        Vm::new(Vec::new()).run(&main),
        Err(VmError::NotBytecode {
            method: "main".to_string()
        })
    );
}

// ============================================================
// Properties
// ============================================================

proptest! {
    /// Integer arithmetic wraps exactly like the host's i64.
    #[test]
    fn integer_arithmetic_wraps(a in 0i64..=i64::MAX, b in 0i64..=i64::MAX, op in 0usize..3) {
        let (symbol, expected) = match op {
            0 => ("+", a.wrapping_add(b)),
            1 => ("-", a.wrapping_sub(b)),
            _ => ("*", a.wrapping_mul(b)),
        };
        prop_assert_eq!(eval(&format!("{a} {symbol} {b}")), Value::Int(expected));
    }

    /// A for loop visits every element exactly once, in order.
    #[test]
    fn for_loop_visits_every_element(values in prop::collection::vec(0i64..1000, 0..20)) {
        let list = values.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", ");
        let (result, output) = run_src(&format!("for e in [{list}] {{ puts(e) }}"));
        prop_assert_eq!(result, Ok(Value::None));
        let expected: String = values.iter().map(|v| format!("{v}\n")).collect();
        prop_assert_eq!(output, expected);
    }
}

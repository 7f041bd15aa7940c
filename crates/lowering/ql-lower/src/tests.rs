use expect_test::expect;
use ql_ast::{BinaryOp, BodyBuilder, Function, Module, SymbolList, UnaryOp};
use ql_intern::Interner;
use ql_lir::{Backend as _, FuncId, FunctionDecl, Inst, TextBackend};
use ql_resolve::resolve_module;

use super::*;

fn lower_text(module: &Module, interner: &Interner) -> (LoweringReport, TextBackend) {
    let resolution = resolve_module(module, interner).unwrap();
    assert!(resolution.is_ok(), "{:?}", resolution.errors().collect::<Vec<_>>());
    let mut backend = TextBackend::new();
    let report = lower_module(module, &resolution, interner, &mut backend).unwrap();
    (report, backend)
}

fn module_of(functions: Vec<Function>) -> Module {
    Module { functions }
}

/// `f(a) { a = a + 1; return a }`
fn increment(interner: &mut Interner) -> Function {
    let f = interner.intern("f");
    let a = interner.intern("a");
    let mut b = BodyBuilder::new();
    let read = b.var(a);
    let one = b.number(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    let assign = b.assign(a, sum);
    let s1 = b.stmt(assign);
    let result = b.var(a);
    let ret = b.ret(result);
    let s2 = b.stmt(ret);
    Function::new(f, SymbolList(vec![a]), b.finish(vec![s1, s2]))
}

#[test]
fn lowers_parameter_update() {
    let mut interner = Interner::new();
    let module = module_of(vec![increment(&mut interner)]);
    let (report, backend) = lower_text(&module, &interner);
    assert!(report.is_ok());

    expect![[r#"
        function fn0 f(1) {
            slot0: a
        bb0:
            v0 = param 0
            store slot0, v0
            v1 = load slot0
            v2 = iconst 1
            v3 = iadd v1, v2
            store slot0, v3
            v4 = load slot0
            return v4
        bb1:
            v5 = iconst 0
            v6 = iconst 0
            return v6
        }
    "#]]
    .assert_eq(&backend.finish().unwrap());
}

#[test]
fn lowers_label_loop() {
    // sum(n) { total := 0; top: if (n <= 0) { return total } total = total + n; n = n - 1; goto top }
    let mut interner = Interner::new();
    let sum = interner.intern("sum");
    let n = interner.intern("n");
    let total = interner.intern("total");
    let top = interner.intern("top");
    let mut b = BodyBuilder::new();

    let zero = b.number(0);
    let init = b.declare(total, zero);
    let s1 = b.stmt(init);

    let read_n = b.var(n);
    let limit = b.number(0);
    let done = b.binary(BinaryOp::LessEq, read_n, limit);
    let result = b.var(total);
    let ret = b.ret(result);
    let s_ret = b.stmt(ret);
    let check = b.if_then(done, vec![s_ret]);
    let s2 = b.labelled(vec![top], check);

    let acc = b.var(total);
    let add = b.var(n);
    let next = b.binary(BinaryOp::Add, acc, add);
    let update = b.assign(total, next);
    let s3 = b.stmt(update);

    let cur = b.var(n);
    let one = b.number(1);
    let dec = b.binary(BinaryOp::Sub, cur, one);
    let step = b.assign(n, dec);
    let s4 = b.stmt(step);

    let jump = b.goto(top);
    let s5 = b.stmt(jump);

    let function = Function::new(sum, SymbolList(vec![n]), b.finish(vec![s1, s2, s3, s4, s5]));
    let (_, backend) = lower_text(&module_of(vec![function]), &interner);

    expect![[r#"
        function fn0 sum(1) {
            slot0: n
            slot1: total
        bb0:
            v0 = param 0
            store slot0, v0
            v1 = iconst 0
            store slot1, v1
            jump bb1
        bb1:
            v2 = load slot0
            v3 = iconst 0
            v4 = icmp sle v2, v3
            brif v4, bb2, bb3
        bb2:
            v5 = load slot1
            return v5
        bb3:
            v7 = iconst 0
            v8 = load slot1
            v9 = load slot0
            v10 = iadd v8, v9
            store slot1, v10
            v11 = load slot0
            v12 = iconst 1
            v13 = isub v11, v12
            store slot0, v13
            jump bb1
        bb4:
            v6 = iconst 0
            jump bb3
        bb5:
            v14 = iconst 0
            v15 = iconst 0
            return v15
        }
    "#]]
    .assert_eq(&backend.finish().unwrap());
}

#[test]
fn empty_body_returns_zero() {
    let mut interner = Interner::new();
    let main = interner.intern("main");
    let function = Function::new(main, SymbolList::new(), BodyBuilder::new().finish(Vec::new()));
    let (_, backend) = lower_text(&module_of(vec![function]), &interner);

    expect![[r#"
        function fn0 main(0) {
        bb0:
            v0 = iconst 0
            v1 = iconst 0
            return v1
        }
    "#]]
    .assert_eq(&backend.finish().unwrap());
}

#[test]
fn sibling_if_variables_get_distinct_slots() {
    // k(c) { if (c) { y := 1 } if (c) { y := 2 } return c }
    let mut interner = Interner::new();
    let k = interner.intern("k");
    let c = interner.intern("c");
    let y = interner.intern("y");
    let mut b = BodyBuilder::new();
    let mut statements = Vec::new();
    for value in [1, 2] {
        let cond = b.var(c);
        let v = b.number(value);
        let decl = b.declare(y, v);
        let s_decl = b.stmt(decl);
        let branch = b.if_then(cond, vec![s_decl]);
        statements.push(b.stmt(branch));
    }
    let read = b.var(c);
    let ret = b.ret(read);
    statements.push(b.stmt(ret));
    let function = Function::new(k, SymbolList(vec![c]), b.finish(statements));
    let module = module_of(vec![function]);

    let resolution = resolve_module(&module, &interner).unwrap();
    let decl = FunctionDecl {
        id: FuncId(0),
        name: "k".to_owned(),
        arity: 1,
    };
    let lir = LoweringContext::lower_function(
        &module.functions[0],
        decl,
        &resolution.functions[0],
        &Signatures::default(),
        &interner,
    )
    .unwrap();

    let names: Vec<&str> = lir.slots.iter().map(|slot| slot.name.as_str()).collect();
    assert_eq!(names, vec!["c", "y", "y"]);

    let stored: Vec<u32> = lir
        .blocks
        .iter()
        .flat_map(|block| &block.insts)
        .filter_map(|inst| match inst {
            Inst::Store { slot, .. } => Some(slot.0),
            _ => None,
        })
        .collect();
    assert_eq!(stored, vec![0, 1, 2]);
}

#[test]
fn declaring_a_parameter_reuses_its_slot() {
    // h(a) { a := 1; a = 2; return a }
    let mut interner = Interner::new();
    let h = interner.intern("h");
    let a = interner.intern("a");
    let mut b = BodyBuilder::new();
    let one = b.number(1);
    let decl = b.declare(a, one);
    let s1 = b.stmt(decl);
    let two = b.number(2);
    let assign = b.assign(a, two);
    let s2 = b.stmt(assign);
    let read = b.var(a);
    let ret = b.ret(read);
    let s3 = b.stmt(ret);
    let function = Function::new(h, SymbolList(vec![a]), b.finish(vec![s1, s2, s3]));

    let (_, backend) = lower_text(&module_of(vec![function]), &interner);
    let text = backend.finish().unwrap();
    assert!(text.contains("    slot0: a\n"));
    assert!(!text.contains("slot1"));
}

#[test]
fn forward_calls_link() {
    // main() { return inc(41) }  inc(x) { return x + 1 }
    let mut interner = Interner::new();
    let main = interner.intern("main");
    let inc = interner.intern("inc");
    let x = interner.intern("x");

    let mut b = BodyBuilder::new();
    let arg = b.number(41);
    let call = b.call(inc, vec![arg]);
    let ret = b.ret(call);
    let s1 = b.stmt(ret);
    let main_fn = Function::new(main, SymbolList::new(), b.finish(vec![s1]));

    let mut b = BodyBuilder::new();
    let read = b.var(x);
    let one = b.number(1);
    let sum = b.binary(BinaryOp::Add, read, one);
    let ret = b.ret(sum);
    let s1 = b.stmt(ret);
    let inc_fn = Function::new(inc, SymbolList(vec![x]), b.finish(vec![s1]));

    let (report, backend) = lower_text(&module_of(vec![main_fn, inc_fn]), &interner);
    assert_eq!(report.defined, vec!["main", "inc"]);
    let text = backend.finish().unwrap();
    assert!(text.contains("v1 = call fn1(v0)"));
}

#[test]
fn unknown_callee_drops_only_that_function() {
    let mut interner = Interner::new();
    let broken = interner.intern("broken");
    let missing = interner.intern("missing");
    let mut b = BodyBuilder::new();
    let call = b.call(missing, Vec::new());
    let s1 = b.stmt(call);
    let broken_fn = Function::new(broken, SymbolList::new(), b.finish(vec![s1]));
    let module = module_of(vec![broken_fn, increment(&mut interner)]);

    let (report, backend) = lower_text(&module, &interner);
    assert_eq!(report.defined, vec!["f"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        report.failures[0].error.to_string(),
        "in 'broken': call to undefined function 'missing'"
    );
    assert!(backend.finish().is_err());
}

#[test]
fn arity_mismatch_is_fatal() {
    let mut interner = Interner::new();
    let main = interner.intern("main");
    let inc = increment(&mut interner);
    let mut b = BodyBuilder::new();
    let call = b.call(inc.name, Vec::new());
    let s1 = b.stmt(call);
    let main_fn = Function::new(main, SymbolList::new(), b.finish(vec![s1]));
    let module = module_of(vec![main_fn, inc]);

    let resolution = resolve_module(&module, &interner).unwrap();
    let mut backend = TextBackend::new();
    let err = lower_module(&module, &resolution, &interner, &mut backend).unwrap_err();
    assert_eq!(
        err,
        LowerError::ArityMismatch {
            function: "main".to_owned(),
            callee: "f".to_owned(),
            expected: 1,
            found: 0,
        }
    );
}

#[test]
fn arity_mismatch_after_unknown_callee_is_fatal() {
    // main() { return missing() + f(1, 2) }
    let mut interner = Interner::new();
    let main = interner.intern("main");
    let missing = interner.intern("missing");
    let inc = increment(&mut interner);
    let mut b = BodyBuilder::new();
    let unknown = b.call(missing, Vec::new());
    let one = b.number(1);
    let two = b.number(2);
    let known = b.call(inc.name, vec![one, two]);
    let sum = b.binary(BinaryOp::Add, unknown, known);
    let ret = b.ret(sum);
    let s1 = b.stmt(ret);
    let main_fn = Function::new(main, SymbolList::new(), b.finish(vec![s1]));
    let module = module_of(vec![inc, main_fn]);

    let resolution = resolve_module(&module, &interner).unwrap();
    let mut backend = TextBackend::new();
    let err = lower_module(&module, &resolution, &interner, &mut backend).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(
        err.to_string(),
        "in 'main': 'f' takes 1 arguments but 2 were given"
    );
}

#[test]
fn lowered_calls_match_declared_signatures() {
    // r(a) { return r(a) }
    let mut interner = Interner::new();
    let r = interner.intern("r");
    let a = interner.intern("a");
    let mut b = BodyBuilder::new();
    let arg = b.var(a);
    let call = b.call(r, vec![arg]);
    let ret = b.ret(call);
    let s1 = b.stmt(ret);
    let module = module_of(vec![Function::new(r, SymbolList(vec![a]), b.finish(vec![s1]))]);

    let resolution = resolve_module(&module, &interner).unwrap();
    let decl = FunctionDecl {
        id: FuncId(0),
        name: "r".to_owned(),
        arity: 1,
    };
    let mut signatures = Signatures::default();
    signatures.insert(r, decl.clone());
    let lir = LoweringContext::lower_function(
        &module.functions[0],
        decl.clone(),
        &resolution.functions[0],
        &signatures,
        &interner,
    )
    .unwrap();

    ql_lir::check_calls(&lir, &[decl]).unwrap();
    let narrower = FunctionDecl {
        id: FuncId(0),
        name: "r".to_owned(),
        arity: 0,
    };
    assert!(ql_lir::check_calls(&lir, &[narrower]).is_err());
}

#[test]
fn assignment_through_address() {
    // f() { x := 0; *(&x) = 5; return x }
    let mut interner = Interner::new();
    let f = interner.intern("f");
    let x = interner.intern("x");
    let mut b = BodyBuilder::new();
    let zero = b.number(0);
    let decl = b.declare(x, zero);
    let s1 = b.stmt(decl);
    let addr = b.address_of(x);
    let target = b.unary(UnaryOp::Deref, addr);
    let five = b.number(5);
    let store = b.binary(BinaryOp::Assign, target, five);
    let s2 = b.stmt(store);
    let read = b.var(x);
    let ret = b.ret(read);
    let s3 = b.stmt(ret);
    let function = Function::new(f, SymbolList::new(), b.finish(vec![s1, s2, s3]));

    let (_, backend) = lower_text(&module_of(vec![function]), &interner);
    let text = backend.finish().unwrap();
    assert!(text.contains("v1 = iconst 5\n    v2 = addr slot0\n    store [v2], v1\n"));
}

#[test]
fn lowering_is_deterministic() {
    let mut interner = Interner::new();
    let module = module_of(vec![increment(&mut interner)]);
    let (_, first) = lower_text(&module, &interner);
    let (_, second) = lower_text(&module, &interner);
    assert_eq!(first.finish().unwrap(), second.finish().unwrap());
}

//! Indentation-based tree dump used for human-readable diagnostics

use std::fmt::{self, Write as _};
use std::iter::repeat_n;

use ql_intern::Interner;

use crate::{Body, Expr, ExprId, Function, Module, SymbolList};

const INDENT: usize = 2;

/// Extra text for the `FUN` and `IF` lines of a rendering
///
/// A note is appended to its line after `"; "`.
pub trait RenderNotes {
    /// Note for the header line of `function`
    fn function_note(&self, function: &Function, interner: &Interner) -> Option<String>;

    /// Note for the `If` node `id`
    fn if_note(&self, id: ExprId, interner: &Interner) -> Option<String>;
}

/// Writer that prefixes every line with the current nesting depth
struct NestedWriter<'names> {
    out: String,
    depth: usize,
    interner: &'names Interner,
    notes: Option<&'names dyn RenderNotes>,
}

impl<'names> NestedWriter<'names> {
    fn new(interner: &'names Interner, depth: usize) -> Self {
        Self {
            out: String::new(),
            depth,
            interner,
            notes: None,
        }
    }

    fn with_notes(mut self, notes: &'names dyn RenderNotes) -> Self {
        self.notes = Some(notes);
        self
    }

    fn headed(&mut self, head: &str, note: Option<&str>) {
        match note {
            Some(note) => self.line(format_args!("{head}; {note}")),
            None => self.line(format_args!("{head}")),
        }
    }

    fn line(&mut self, args: fmt::Arguments<'_>) {
        self.out.extend(repeat_n(' ', self.depth * INDENT));
        // Writing into a String cannot fail.
        if self.out.write_fmt(args).is_err() {
            return;
        }
        self.out.push('\n');
    }

    fn nested(&mut self, render: impl FnOnce(&mut Self)) {
        self.depth += 1;
        render(self);
        self.depth -= 1;
    }

    fn names(&self, list: &SymbolList) -> String {
        list.iter()
            .map(|sym| self.interner.resolve(sym))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn function(&mut self, function: &Function) {
        let head = format!("FUN: {}", self.interner.resolve(function.name));
        let note = self
            .notes
            .and_then(|notes| notes.function_note(function, self.interner));
        self.headed(&head, note.as_deref());
        if function.params.is_empty() {
            self.line(format_args!("PARS:"));
        } else {
            let params = self.names(&function.params);
            self.line(format_args!("PARS: {params}"));
        }
        self.line(format_args!("STATS:"));
        self.nested(|writer| writer.expr(&function.body, function.body.root));
    }

    fn expr(&mut self, body: &Body, id: ExprId) {
        match &body[id] {
            Expr::Number(value) => self.line(format_args!("NUM: {value}")),
            Expr::Variable(sym) => {
                let name = self.interner.resolve(*sym);
                self.line(format_args!("SYM: {name}"));
            }
            Expr::AddressOf(sym) => {
                let name = self.interner.resolve(*sym);
                self.line(format_args!("SYMADDR: {name}"));
            }
            Expr::LabelRef(sym) => {
                let name = self.interner.resolve(*sym);
                self.line(format_args!("LABEL: {name}"));
            }
            Expr::List(items) => {
                for &item in items {
                    self.expr(body, item);
                }
            }
            Expr::Statement { labels, inner } => {
                if !labels.is_empty() {
                    let names = self.names(labels);
                    self.line(format_args!("LABELS: {names}"));
                }
                self.expr(body, *inner);
            }
            Expr::Call { callee, args } => {
                let name = self.interner.resolve(*callee);
                self.line(format_args!("CALL: {name}"));
                self.nested(|writer| {
                    for &arg in args {
                        writer.expr(body, arg);
                    }
                });
            }
            Expr::If {
                condition,
                then_body,
            } => {
                let note = self.notes.and_then(|notes| notes.if_note(id, self.interner));
                self.headed("IF", note.as_deref());
                self.nested(|writer| {
                    writer.expr(body, *condition);
                    writer.expr(body, *then_body);
                });
            }
            Expr::Binary { op, lhs, rhs } => {
                self.line(format_args!("{op}"));
                self.nested(|writer| {
                    writer.expr(body, *lhs);
                    writer.expr(body, *rhs);
                });
            }
            Expr::Unary { op, operand } => {
                self.line(format_args!("{op}"));
                self.nested(|writer| writer.expr(body, *operand));
            }
        }
    }
}

impl Body {
    /// Render the subtree rooted at `id`, starting at nesting `level`
    #[must_use]
    pub fn render(&self, id: ExprId, level: usize, interner: &Interner) -> String {
        let mut writer = NestedWriter::new(interner, level);
        writer.expr(self, id);
        writer.out
    }
}

impl Function {
    /// Render the whole function
    #[must_use]
    pub fn render(&self, interner: &Interner) -> String {
        let mut writer = NestedWriter::new(interner, 0);
        writer.function(self);
        writer.out
    }

    /// Render the whole function with `notes` on its `FUN` and `IF` lines
    #[must_use]
    pub fn render_with(&self, interner: &Interner, notes: &dyn RenderNotes) -> String {
        let mut writer = NestedWriter::new(interner, 0).with_notes(notes);
        writer.function(self);
        writer.out
    }
}

impl Module {
    /// Render every function in definition order
    #[must_use]
    pub fn render(&self, interner: &Interner) -> String {
        self.functions
            .iter()
            .map(|function| function.render(interner))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use ql_intern::Interner;

    use super::RenderNotes;
    use crate::{BinaryOp, BodyBuilder, Expr, ExprId, Function, SymbolList, UnaryOp};

    /// Marks one `if` and counts parameters
    struct Marked(ExprId);

    impl RenderNotes for Marked {
        fn function_note(&self, function: &Function, _: &Interner) -> Option<String> {
            Some(format!("{} params", function.arity()))
        }

        fn if_note(&self, id: ExprId, _: &Interner) -> Option<String> {
            (id == self.0).then(|| "marked".to_owned())
        }
    }

    #[test]
    fn renders_nested_function() {
        let mut interner = Interner::new();
        let f = interner.intern("f");
        let a = interner.intern("a");
        let top = interner.intern("top");
        let cond = interner.intern("cond");

        let mut b = BodyBuilder::new();
        let read_a = b.var(a);
        let one = b.number(1);
        let sum = b.binary(BinaryOp::Add, read_a, one);
        let assign = b.assign(a, sum);
        let s1 = b.labelled(vec![top], assign);
        let c = b.var(cond);
        let jump = b.goto(top);
        let s_jump = b.stmt(jump);
        let branch = b.if_then(c, vec![s_jump]);
        let s2 = b.stmt(branch);
        let addr = b.address_of(a);
        let load = b.unary(UnaryOp::Deref, addr);
        let called = b.call(f, vec![load]);
        let ret = b.ret(called);
        let s3 = b.stmt(ret);
        let body = b.finish(vec![s1, s2, s3]);

        let function = Function::new(f, SymbolList(vec![a, cond]), body);
        expect![[r#"
            FUN: f
            PARS: a, cond
            STATS:
              LABELS: top
              ASSIGN
                SYM: a
                ADD
                  SYM: a
                  NUM: 1
              IF
                SYM: cond
                GOTO
                  LABEL: top
              RETURN
                CALL: f
                  DEREF
                    SYMADDR: a
        "#]]
        .assert_eq(&function.render(&interner));
    }

    #[test]
    fn renders_subtree_at_level() {
        let mut interner = Interner::new();
        let x = interner.intern("x");
        let mut b = BodyBuilder::new();
        let five = b.number(5);
        let decl = b.declare(x, five);
        let body = b.finish(vec![decl]);

        assert_eq!(
            body.render(decl, 1, &interner),
            "  DECLARE\n    SYM: x\n    NUM: 5\n"
        );
    }

    #[test]
    fn notes_follow_function_and_if_lines() {
        let mut interner = Interner::new();
        let g = interner.intern("g");
        let p = interner.intern("p");

        let mut b = BodyBuilder::new();
        let mut statements = Vec::new();
        for value in [1, 2] {
            let test = b.var(p);
            let v = b.number(value);
            let ret = b.ret(v);
            let s_ret = b.stmt(ret);
            let branch = b.if_then(test, vec![s_ret]);
            statements.push(b.stmt(branch));
        }
        let function = Function::new(g, SymbolList(vec![p]), b.finish(statements));
        let first_if = function
            .body
            .iter()
            .find_map(|(id, expr)| matches!(expr, Expr::If { .. }).then_some(id))
            .unwrap();

        expect![[r#"
            FUN: g; 1 params
            PARS: p
            STATS:
              IF; marked
                SYM: p
                RETURN
                  NUM: 1
              IF
                SYM: p
                RETURN
                  NUM: 2
        "#]]
        .assert_eq(&function.render_with(&interner, &Marked(first_if)));
    }
}

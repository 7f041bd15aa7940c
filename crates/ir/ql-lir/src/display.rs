use std::fmt;

use crate::{Inst, LirFunction, Terminator};

impl fmt::Display for Inst {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Const { dst, value } => write!(f, "{dst} = iconst {value}"),
            Self::Param { dst, index } => write!(f, "{dst} = param {index}"),
            Self::Load { dst, slot } => write!(f, "{dst} = load {slot}"),
            Self::Store { slot, value } => write!(f, "store {slot}, {value}"),
            Self::SlotAddr { dst, slot } => write!(f, "{dst} = addr {slot}"),
            Self::LoadIndirect { dst, addr } => write!(f, "{dst} = load [{addr}]"),
            Self::StoreIndirect { addr, value } => write!(f, "store [{addr}], {value}"),
            Self::Binary { dst, op, lhs, rhs } => write!(f, "{dst} = {op} {lhs}, {rhs}"),
            Self::Compare {
                dst,
                cond,
                lhs,
                rhs,
            } => write!(f, "{dst} = icmp {cond} {lhs}, {rhs}"),
            Self::Unary { dst, op, arg } => write!(f, "{dst} = {op} {arg}"),
            Self::Call { dst, callee, args } => {
                write!(f, "{dst} = call {callee}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl fmt::Display for Terminator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Jump(target) => write!(f, "jump {target}"),
            Self::Branch {
                cond,
                then_block,
                else_block,
            } => write!(f, "brif {cond}, {then_block}, {else_block}"),
            Self::Return(value) => write!(f, "return {value}"),
        }
    }
}

impl fmt::Display for LirFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "function {} {}({}) {{",
            self.decl.id, self.decl.name, self.decl.arity
        )?;
        for (i, slot) in self.slots.iter().enumerate() {
            writeln!(f, "    slot{i}: {}", slot.name)?;
        }
        for block in &self.blocks {
            writeln!(f, "{}:", block.id)?;
            for inst in &block.insts {
                writeln!(f, "    {inst}")?;
            }
            match &block.terminator {
                Some(term) => writeln!(f, "    {term}")?,
                None => writeln!(f, "    <open>")?,
            }
        }
        writeln!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::{BinOp, CmpOp, FuncId, FunctionDecl, LirBuilder};

    #[test]
    fn renders_function_text() {
        let mut builder = LirBuilder::new(FunctionDecl {
            id: FuncId(0),
            name: "f".to_string(),
            arity: 1,
        });
        let a = builder.alloc_slot("a");
        let p = builder.param(0);
        builder.store(a, p);
        let body = builder.create_block();
        builder.jump(body);
        builder.switch_to_block(body);
        let x = builder.load(a);
        let one = builder.iconst(1);
        let sum = builder.binary(BinOp::Add, x, one);
        let cmp = builder.compare(CmpOp::NotEqual, sum, one);
        let addr = builder.slot_addr(a);
        builder.store_indirect(addr, cmp);
        let r = builder.call(FuncId(0), vec![sum]);
        builder.ret(r);

        expect![[r#"
            function fn0 f(1) {
                slot0: a
            bb0:
                v0 = param 0
                store slot0, v0
                jump bb1
            bb1:
                v1 = load slot0
                v2 = iconst 1
                v3 = iadd v1, v2
                v4 = icmp ne v3, v2
                v5 = addr slot0
                store [v5], v4
                v6 = call fn0(v3)
                return v6
            }
        "#]]
        .assert_eq(&builder.finish().unwrap().to_string());
    }
}

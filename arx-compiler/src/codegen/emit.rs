//! Statement and expression lowering.

use super::{plus_is_concat, CodeGen};
use crate::ast::{BinaryOp, Expr, IfArm, Stmt, UnaryOp};
use crate::error::CodegenWarning;

use arx_asm::{Instruction, Operation, Word, SYSTEM_OBJECT};

impl CodeGen<'_> {
    pub(crate) fn stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::VarDecl { name, init, .. } => {
                let slot = self.ctx.local_slot(name);
                match init {
                    Some(value) => self.expr(value),
                    None => self.emit(Instruction::lit(0)),
                }
                self.emit(Instruction::sto(0, slot));
            }

            Stmt::Assign { name, value } => self.assign(name, value),

            Stmt::If { arms, else_body } => self.if_chain(arms, else_body),

            Stmt::While { cond, body } => {
                let start = self.create_label();
                let end = self.create_label();

                self.set_label(start);
                self.expr(cond);
                self.emit(Instruction::jpc(Word::from(end)));
                for s in body {
                    self.stmt(s);
                }
                self.emit(Instruction::jmp(Word::from(start)));
                self.set_label(end);
            }

            Stmt::For {
                var,
                from,
                to,
                body,
            } => self.for_loop(var, from, to, body),

            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.expr(value);
                }
                self.emit(Instruction::opr(Operation::Ret));
            }

            Stmt::Expr(expr) => self.expr(expr),

            Stmt::Block(stmts) => {
                for s in stmts {
                    self.stmt(s);
                }
            }
        }
    }

    fn assign(&mut self, name: &str, value: &Expr) {
        // Locals shadow fields; an undeclared name allocates a local slot
        // on first use.
        let is_field = self.ctx.is_field(name) && self.ctx.lookup_local(name).is_none();
        if is_field {
            self.emit(Instruction::opr(Operation::ObjSelf));
            self.expr(value);
            let id = self.intern(name);
            self.emit(Instruction::lit(id));
            self.emit(Instruction::opr(Operation::ObjSetField));
        } else {
            self.expr(value);
            let slot = self.ctx.local_slot(name);
            self.emit(Instruction::sto(0, slot));
        }
    }

    fn if_chain(&mut self, arms: &[IfArm], else_body: &[Stmt]) {
        let end = self.create_label();

        for arm in arms {
            let next = self.create_label();
            self.expr(&arm.cond);
            self.emit(Instruction::jpc(Word::from(next)));
            for s in &arm.body {
                self.stmt(s);
            }
            self.emit(Instruction::jmp(Word::from(end)));
            self.set_label(next);
        }

        for s in else_body {
            self.stmt(s);
        }
        self.set_label(end);
    }

    fn for_loop(&mut self, var: &str, from: &Expr, to: &Expr, body: &[Stmt]) {
        let slot = self.ctx.local_slot(var);

        self.expr(from);
        self.emit(Instruction::sto(0, slot));

        let cond = self.create_label();
        let end = self.create_label();

        self.set_label(cond);
        self.emit(Instruction::lod(0, slot));
        self.expr(to);
        self.emit(Instruction::opr(Operation::Leq));
        self.emit(Instruction::jpc(Word::from(end)));

        for s in body {
            self.stmt(s);
        }

        self.emit(Instruction::lod(0, slot));
        self.emit(Instruction::lit(1));
        self.emit(Instruction::opr(Operation::Add));
        self.emit(Instruction::sto(0, slot));
        self.emit(Instruction::jmp(Word::from(cond)));
        self.set_label(end);
    }

    pub(crate) fn expr(&mut self, expr: &Expr) {
        match expr {
            Expr::IntLiteral(v) => self.emit(Instruction::lit(*v as Word)),

            Expr::StrLiteral(s) => {
                let id = self.intern(s);
                self.emit(Instruction::lit(id));
            }

            Expr::Ident(name) => self.load_ident(name),

            Expr::Binary { op, lhs, rhs } => self.binary(*op, lhs, rhs),

            Expr::Unary { op, operand } => {
                self.expr(operand);
                let operation = match op {
                    UnaryOp::Neg => Operation::Neg,
                    UnaryOp::Not => Operation::Not,
                    UnaryOp::Odd => Operation::Odd,
                };
                self.emit(Instruction::opr(operation));
            }

            Expr::Call {
                receiver,
                method,
                args,
            } => self.call(receiver.as_deref(), method, args),

            Expr::FieldAccess { object, field } => {
                self.expr(object);
                let id = self.intern(field);
                self.emit(Instruction::lit(id));
                self.emit(Instruction::opr(Operation::ObjGetField));
            }

            Expr::New { class, args } => self.new_expr(class, args),
        }
    }

    fn load_ident(&mut self, name: &str) {
        if let Some(slot) = self.ctx.lookup_local(name) {
            self.emit(Instruction::lod(0, slot));
        } else if self.in_class() {
            // A miss inside a method body is a field access on the
            // enclosing object; the registry resolves the name at run time.
            self.emit(Instruction::opr(Operation::ObjSelf));
            let id = self.intern(name);
            self.emit(Instruction::lit(id));
            self.emit(Instruction::opr(Operation::ObjGetField));
        } else {
            self.warn(CodegenWarning::IdentifierOutsideClass {
                name: name.to_string(),
            });
            self.emit(Instruction::lit(0));
        }
    }

    fn binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr) {
        if op == BinaryOp::Add && plus_is_concat(lhs, rhs) {
            self.expr(lhs);
            self.expr(rhs);
            if matches!(rhs, Expr::Ident(_)) {
                self.emit(Instruction::opr(Operation::IntToStr));
            }
            self.emit(Instruction::opr(Operation::StrConcat));
            return;
        }

        self.expr(lhs);
        self.expr(rhs);
        let operation = match op {
            BinaryOp::Add => Operation::Add,
            BinaryOp::Sub => Operation::Sub,
            BinaryOp::Mul => Operation::Mul,
            BinaryOp::Div => Operation::Div,
            BinaryOp::Pow => Operation::Pow,
            BinaryOp::Mod => Operation::Mod,
            BinaryOp::Eq => Operation::Eq,
            BinaryOp::Neq => Operation::Neq,
            BinaryOp::Less => Operation::Less,
            BinaryOp::Leq => Operation::Leq,
            BinaryOp::Greater => Operation::Greater,
            BinaryOp::Geq => Operation::Geq,
            BinaryOp::And => Operation::And,
            BinaryOp::Or => Operation::Or,
            BinaryOp::Shl => Operation::Shl,
            BinaryOp::Shr => Operation::Shr,
        };
        self.emit(Instruction::opr(operation));
    }

    fn call(&mut self, receiver: Option<&Expr>, method: &str, args: &[Expr]) {
        let system = match receiver {
            None => true,
            Some(Expr::Ident(name)) => name == "system",
            Some(_) => false,
        };

        // The writeln intrinsic bypasses dispatch entirely.
        if system && method == "writeln" {
            for arg in args {
                self.expr(arg);
                self.emit(Instruction::opr(Operation::OutString));
            }
            self.emit(Instruction::opr(Operation::Writeln));
            return;
        }

        match receiver {
            None => self.emit(Instruction::opr(Operation::ObjSelf)),
            Some(Expr::Ident(name)) if name == "system" => {
                self.emit(Instruction::lit(SYSTEM_OBJECT));
            }
            Some(receiver) => self.expr(receiver),
        }

        for arg in args {
            self.expr(arg);
        }

        let id = self.intern(method);
        self.emit(Instruction::lit(id));
        self.emit(Instruction::opr(Operation::ObjCallMethod));
    }

    fn new_expr(&mut self, class: &str, args: &[Expr]) {
        let cid = arx_mod::class_id(self.module_name(), class);
        self.emit(Instruction::lit(cid));
        self.emit(Instruction::opr(Operation::ObjNew));

        let declared = self
            .module_ast()
            .classes
            .iter()
            .find(|c| c.name == class);

        let Some(declared) = declared else {
            if !args.is_empty() {
                self.warn(CodegenWarning::UnknownClass {
                    name: class.to_string(),
                });
            }
            return;
        };

        if !declared.methods.iter().any(|m| m.name == class) {
            return;
        }

        // Spill the fresh address so the expression still yields it after
        // the constructor consumed its receiver.
        let tmp = self.scratch_slot();
        self.emit(Instruction::sto(0, tmp));
        self.emit(Instruction::lod(0, tmp));
        for arg in args {
            self.expr(arg);
        }
        let id = self.intern(class);
        self.emit(Instruction::lit(id));
        self.emit(Instruction::opr(Operation::ObjCallMethod));
        self.emit(Instruction::lod(0, tmp));
    }
}

//! Ergonomic constructors for assembling semantic models by hand.
//!
//! The host front end produces models programmatically; tests and fixtures
//! use these helpers to do the same without drowning in struct literals.

use crate::model::semantic::{
    Annotation, BinaryOp, CatchClause, ConstValue, Expr, ExprKind, Method, Param, Stmt, SymbolRef,
    UnaryOp,
};

pub fn lit_i(v: i64) -> Expr {
    Expr::new(ExprKind::Literal(ConstValue::Int(v)))
}

pub fn lit_f(v: f64) -> Expr {
    Expr::new(ExprKind::Literal(ConstValue::Float(v)))
}

pub fn lit_s(v: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Literal(ConstValue::Str(v.into())))
}

pub fn lit_b(v: bool) -> Expr {
    Expr::new(ExprKind::Literal(ConstValue::Bool(v)))
}

pub fn null() -> Expr {
    Expr::new(ExprKind::Literal(ConstValue::Null))
}

pub fn local(name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::Local(name.into()))
}

pub fn field(class: impl Into<String>, name: impl Into<String>) -> Expr {
    Expr::new(ExprKind::FieldRef(SymbolRef::new(class, name)))
}

pub fn neg(operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(operand),
    })
}

pub fn not(operand: Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op: UnaryOp::Not,
        operand: Box::new(operand),
    })
}

pub fn bin(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::new(ExprKind::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    })
}

pub fn cond(c: Expr, then_expr: Expr, else_expr: Expr) -> Expr {
    Expr::new(ExprKind::Conditional {
        cond: Box::new(c),
        then_expr: Box::new(then_expr),
        else_expr: Box::new(else_expr),
    })
}

pub fn call(class: impl Into<String>, member: impl Into<String>, args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::Call {
        target: SymbolRef::new(class, member),
        receiver: None,
        args,
    })
}

/// A call with an explicit receiver expression, e.g. `intent.setPackage(p)`.
pub fn call_on(
    receiver: Expr,
    class: impl Into<String>,
    member: impl Into<String>,
    args: Vec<Expr>,
) -> Expr {
    Expr::new(ExprKind::Call {
        target: SymbolRef::new(class, member),
        receiver: Some(Box::new(receiver)),
        args,
    })
}

pub fn ctor(class: impl Into<String>, signature: &[&str], args: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::New {
        class: class.into(),
        signature: signature.iter().map(|s| s.to_string()).collect(),
        args,
    })
}

pub fn array(items: Vec<Expr>) -> Expr {
    Expr::new(ExprKind::ArrayLit(items))
}

pub fn index(arr: Expr, idx: Expr) -> Expr {
    Expr::new(ExprKind::Index {
        array: Box::new(arr),
        index: Box::new(idx),
    })
}

pub fn unknown() -> Expr {
    Expr::new(ExprKind::Unknown)
}

pub fn assign(target: impl Into<String>, value: Expr) -> Stmt {
    Stmt::Assign {
        target: target.into(),
        value,
    }
}

pub fn assign_index(array: impl Into<String>, idx: Expr, value: Expr) -> Stmt {
    Stmt::AssignIndex {
        array: array.into(),
        index: idx,
        value,
    }
}

pub fn expr_stmt(e: Expr) -> Stmt {
    Stmt::Expr(e)
}

pub fn if_stmt(cond: Expr, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Stmt {
    Stmt::If {
        cond,
        then_body,
        else_body,
    }
}

pub fn loop_stmt(body: Vec<Stmt>) -> Stmt {
    Stmt::Loop { body }
}

pub fn try_stmt(body: Vec<Stmt>, catches: Vec<CatchClause>) -> Stmt {
    Stmt::Try { body, catches }
}

pub fn catch(exception_types: &[&str], body: Vec<Stmt>) -> CatchClause {
    CatchClause {
        exception_types: exception_types.iter().map(|s| s.to_string()).collect(),
        body,
    }
}

pub fn ret(value: Option<Expr>) -> Stmt {
    Stmt::Return(value)
}

pub fn throw_stmt(e: Expr) -> Stmt {
    Stmt::Throw(e)
}

pub fn method(
    class: impl Into<String>,
    name: impl Into<String>,
    params: Vec<Param>,
    body: Vec<Stmt>,
) -> Method {
    Method {
        class: class.into(),
        name: name.into(),
        params,
        annotations: Vec::new(),
        throws: Vec::new(),
        body,
    }
}

pub fn annotated_method(
    class: impl Into<String>,
    name: impl Into<String>,
    annotations: Vec<Annotation>,
    params: Vec<Param>,
    body: Vec<Stmt>,
) -> Method {
    Method {
        class: class.into(),
        name: name.into(),
        params,
        annotations,
        throws: Vec::new(),
        body,
    }
}

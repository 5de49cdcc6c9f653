//! Constant and range propagation.
//!
//! A forward abstract walk over each method body maintains, per local
//! variable (and per tracked field such as `Build.VERSION.SDK_INT`), the
//! best statically provable [`ValueFact`]. Facts meet at control-flow joins
//! through an explicit lattice merge; variables reassigned inside loops
//! widen to Unknown rather than running a fixed point, which matches the
//! precision the detectors were tuned against. Unknown never produces a
//! violation downstream: absence of proof is not proof of absence.

use crate::model::semantic::{
    BinaryOp, ConstValue, Expr, ExprKind, Method, Span, Stmt, SymbolRef, UnaryOp,
};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub fn as_f64(self) -> f64 {
        match self {
            Self::Int(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    fn add(self, other: Num) -> Option<Num> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.checked_add(b).map(Self::Int),
            _ => Some(Self::Float(self.as_f64() + other.as_f64())),
        }
    }

    fn sub(self, other: Num) -> Option<Num> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.checked_sub(b).map(Self::Int),
            _ => Some(Self::Float(self.as_f64() - other.as_f64())),
        }
    }

    fn min(self, other: Num) -> Num {
        if self.as_f64() <= other.as_f64() {
            self
        } else {
            other
        }
    }

    fn max(self, other: Num) -> Num {
        if self.as_f64() >= other.as_f64() {
            self
        } else {
            other
        }
    }
}

impl fmt::Display for Num {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            // Floats always show a decimal point so a float bound of 7
            // renders as "7.0", matching the message conventions.
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) if v.fract() == 0.0 && v.is_finite() => write!(f, "{v:.1}"),
            Self::Float(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bound {
    pub value: Num,
    pub inclusive: bool,
}

impl Bound {
    pub fn inclusive(value: Num) -> Self {
        Self {
            value,
            inclusive: true,
        }
    }

    pub fn exclusive(value: Num) -> Self {
        Self {
            value,
            inclusive: false,
        }
    }
}

/// The engine's belief about an expression's value at a program point.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ValueFact {
    Exact(ConstValue),
    Range {
        lo: Option<Bound>,
        hi: Option<Bound>,
    },
    /// Multiple of `base` counting from `from`.
    Multiple {
        base: i64,
        from: i64,
    },
    #[default]
    Unknown,
}

impl ValueFact {
    pub fn exact_int(v: i64) -> Self {
        Self::Exact(ConstValue::Int(v))
    }

    pub fn as_num(&self) -> Option<Num> {
        match self {
            Self::Exact(ConstValue::Int(v)) => Some(Num::Int(*v)),
            Self::Exact(ConstValue::Float(v)) => Some(Num::Float(*v)),
            _ => None,
        }
    }

    fn to_range(&self) -> Option<(Option<Bound>, Option<Bound>)> {
        match self {
            Self::Exact(_) => {
                let n = self.as_num()?;
                Some((Some(Bound::inclusive(n)), Some(Bound::inclusive(n))))
            }
            Self::Range { lo, hi } => Some((*lo, *hi)),
            _ => None,
        }
    }

    /// Join at a control-flow merge: the tightest fact true on all incoming
    /// paths. Unknown is absorbing; equal constants stay exact; differing
    /// numeric facts widen to the smallest enclosing range; incompatible
    /// types widen to Unknown.
    pub fn merge(&self, other: &ValueFact) -> ValueFact {
        if self == other {
            return self.clone();
        }
        match (self, other) {
            (Self::Unknown, _) | (_, Self::Unknown) => Self::Unknown,
            _ => match (self.to_range(), other.to_range()) {
                (Some((lo_a, hi_a)), Some((lo_b, hi_b))) => {
                    match (merge_lo(lo_a, lo_b), merge_hi(hi_a, hi_b)) {
                        // A range with no bound left carries no information.
                        (None, None) => Self::Unknown,
                        (lo, hi) => Self::Range { lo, hi },
                    }
                }
                _ => Self::Unknown,
            },
        }
    }

    /// Tightens this fact with a guard-derived range. Exact facts stay
    /// exact; Unknown adopts the guard range.
    fn narrow_range(&self, lo: Option<Bound>, hi: Option<Bound>) -> ValueFact {
        match self {
            Self::Exact(_) | Self::Multiple { .. } => self.clone(),
            Self::Unknown => Self::Range { lo, hi },
            Self::Range {
                lo: cur_lo,
                hi: cur_hi,
            } => Self::Range {
                lo: tighten_lo(*cur_lo, lo),
                hi: tighten_hi(*cur_hi, hi),
            },
        }
    }
}

fn merge_lo(a: Option<Bound>, b: Option<Bound>) -> Option<Bound> {
    let (a, b) = (a?, b?);
    let v = a.value.min(b.value);
    let inclusive = if a.value.as_f64() == b.value.as_f64() {
        a.inclusive || b.inclusive
    } else if v == a.value {
        a.inclusive
    } else {
        b.inclusive
    };
    Some(Bound { value: v, inclusive })
}

fn merge_hi(a: Option<Bound>, b: Option<Bound>) -> Option<Bound> {
    let (a, b) = (a?, b?);
    let v = a.value.max(b.value);
    let inclusive = if a.value.as_f64() == b.value.as_f64() {
        a.inclusive || b.inclusive
    } else if v == a.value {
        a.inclusive
    } else {
        b.inclusive
    };
    Some(Bound { value: v, inclusive })
}

fn tighten_lo(cur: Option<Bound>, new: Option<Bound>) -> Option<Bound> {
    match (cur, new) {
        (None, b) | (b, None) => b,
        (Some(a), Some(b)) => {
            if b.value.as_f64() > a.value.as_f64() {
                Some(b)
            } else if b.value.as_f64() == a.value.as_f64() {
                Some(Bound {
                    value: a.value,
                    inclusive: a.inclusive && b.inclusive,
                })
            } else {
                Some(a)
            }
        }
    }
}

fn tighten_hi(cur: Option<Bound>, new: Option<Bound>) -> Option<Bound> {
    match (cur, new) {
        (None, b) | (b, None) => b,
        (Some(a), Some(b)) => {
            if b.value.as_f64() < a.value.as_f64() {
                Some(b)
            } else if b.value.as_f64() == a.value.as_f64() {
                Some(Bound {
                    value: a.value,
                    inclusive: a.inclusive && b.inclusive,
                })
            } else {
                Some(a)
            }
        }
    }
}

/// Per-point variable facts. Keys are local names or fully qualified field
/// paths (so `android.os.Build.VERSION.SDK_INT` narrows like a local).
pub type Env = HashMap<String, ValueFact>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeKind {
    Collection,
    CharSequence,
}

pub type SizeEnv = HashMap<String, (i64, SizeKind)>;

fn tracked_key(expr: &Expr) -> Option<String> {
    match &expr.kind {
        ExprKind::Local(name) => Some(name.clone()),
        ExprKind::FieldRef(sym) => Some(format!("{sym}")),
        _ => None,
    }
}

/// Best provable fact for `expr` under `env`.
pub fn evaluate(expr: &Expr, env: &Env) -> ValueFact {
    match &expr.kind {
        ExprKind::Literal(c) => ValueFact::Exact(c.clone()),
        ExprKind::Local(_) | ExprKind::FieldRef(_) => tracked_key(expr)
            .and_then(|k| env.get(&k).cloned())
            .unwrap_or(ValueFact::Unknown),
        ExprKind::Unary {
            op: UnaryOp::Neg,
            operand,
        } => negate_fact(&evaluate(operand, env)),
        ExprKind::Unary { .. } => ValueFact::Unknown,
        ExprKind::Binary { op, lhs, rhs } => {
            arithmetic(*op, &evaluate(lhs, env), &evaluate(rhs, env))
        }
        ExprKind::Conditional {
            then_expr,
            else_expr,
            ..
        } => evaluate(then_expr, env).merge(&evaluate(else_expr, env)),
        _ => ValueFact::Unknown,
    }
}

fn negate_fact(fact: &ValueFact) -> ValueFact {
    match fact {
        ValueFact::Exact(ConstValue::Int(v)) => match v.checked_neg() {
            Some(n) => ValueFact::exact_int(n),
            None => ValueFact::Unknown,
        },
        ValueFact::Exact(ConstValue::Float(v)) => ValueFact::Exact(ConstValue::Float(-v)),
        ValueFact::Range { lo, hi } => ValueFact::Range {
            lo: hi.map(|b| Bound {
                value: neg_num(b.value),
                inclusive: b.inclusive,
            }),
            hi: lo.map(|b| Bound {
                value: neg_num(b.value),
                inclusive: b.inclusive,
            }),
        },
        _ => ValueFact::Unknown,
    }
}

fn neg_num(n: Num) -> Num {
    match n {
        Num::Int(v) => Num::Int(v.wrapping_neg()),
        Num::Float(v) => Num::Float(-v),
    }
}

/// Interval arithmetic for addition and subtraction; multiplication and the
/// rest only fold when both operands are exact. Any unknown operand yields
/// Unknown.
fn arithmetic(op: BinaryOp, lhs: &ValueFact, rhs: &ValueFact) -> ValueFact {
    match op {
        BinaryOp::Add => interval_add_sub(lhs, rhs, false),
        BinaryOp::Sub => interval_add_sub(lhs, rhs, true),
        BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (Some(a), Some(b)) = (lhs.as_num(), rhs.as_num()) else {
                return ValueFact::Unknown;
            };
            fold_exact(op, a, b)
        }
        _ => ValueFact::Unknown,
    }
}

fn fold_exact(op: BinaryOp, a: Num, b: Num) -> ValueFact {
    match (a, b) {
        (Num::Int(x), Num::Int(y)) => {
            let folded = match op {
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        None
                    } else {
                        x.checked_div(y)
                    }
                }
                BinaryOp::Rem => {
                    if y == 0 {
                        None
                    } else {
                        x.checked_rem(y)
                    }
                }
                _ => None,
            };
            folded.map(ValueFact::exact_int).unwrap_or_default()
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let folded = match op {
                BinaryOp::Mul => Some(x * y),
                BinaryOp::Div if y != 0.0 => Some(x / y),
                BinaryOp::Rem if y != 0.0 => Some(x % y),
                _ => None,
            };
            folded
                .map(|v| ValueFact::Exact(ConstValue::Float(v)))
                .unwrap_or_default()
        }
    }
}

fn interval_add_sub(lhs: &ValueFact, rhs: &ValueFact, subtract: bool) -> ValueFact {
    if let (Some(a), Some(b)) = (lhs.as_num(), rhs.as_num()) {
        let folded = if subtract { a.sub(b) } else { a.add(b) };
        return match folded {
            Some(Num::Int(v)) => ValueFact::exact_int(v),
            Some(Num::Float(v)) => ValueFact::Exact(ConstValue::Float(v)),
            None => ValueFact::Unknown,
        };
    }
    let (Some((lo_a, hi_a)), Some((lo_b, hi_b))) = (lhs.to_range(), rhs.to_range()) else {
        return ValueFact::Unknown;
    };
    let (lo_b, hi_b) = if subtract {
        // a - b == a + (-b): negate and swap the rhs bounds.
        (
            hi_b.map(|b| Bound {
                value: neg_num(b.value),
                inclusive: b.inclusive,
            }),
            lo_b.map(|b| Bound {
                value: neg_num(b.value),
                inclusive: b.inclusive,
            }),
        )
    } else {
        (lo_b, hi_b)
    };
    let lo = match (lo_a, lo_b) {
        (Some(a), Some(b)) => a.value.add(b.value).map(|value| Bound {
            value,
            inclusive: a.inclusive && b.inclusive,
        }),
        _ => None,
    };
    let hi = match (hi_a, hi_b) {
        (Some(a), Some(b)) => a.value.add(b.value).map(|value| Bound {
            value,
            inclusive: a.inclusive && b.inclusive,
        }),
        _ => None,
    };
    if lo.is_none() && hi.is_none() {
        ValueFact::Unknown
    } else {
        ValueFact::Range { lo, hi }
    }
}

/// Provable size of a collection/string expression.
pub fn evaluate_size(expr: &Expr, sizes: &SizeEnv) -> Option<(i64, SizeKind)> {
    match &expr.kind {
        ExprKind::ArrayLit(items) => Some((items.len() as i64, SizeKind::Collection)),
        ExprKind::Literal(ConstValue::Str(s)) => {
            Some((s.chars().count() as i64, SizeKind::CharSequence))
        }
        ExprKind::Local(name) => sizes.get(name).copied(),
        ExprKind::Call { target, args, .. }
            if target.member == "asList" || target.member == "listOf" =>
        {
            Some((args.len() as i64, SizeKind::Collection))
        }
        _ => None,
    }
}

const CHECK_PERMISSION_METHODS: &[&str] = &[
    "checkPermission",
    "checkSelfPermission",
    "checkCallingPermission",
    "checkCallingOrSelfPermission",
];

/// Guard facts in force at a call site.
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    /// One entry per enclosing catch clause: the simple names of all types
    /// that clause catches (multi-catch keeps them together).
    pub catch_clauses: Vec<Vec<String>>,
    /// Permissions established by a dominating checkPermission-style guard.
    pub checked_permissions: Vec<String>,
    /// Exception types the enclosing method declares it throws.
    pub method_throws: Vec<String>,
}

impl GuardContext {
    pub fn catches_exactly(&self, exception: &str) -> bool {
        self.catch_clauses
            .iter()
            .any(|clause| clause.iter().any(|t| simple_type(t) == exception))
    }

    pub fn throws(&self, exception: &str) -> bool {
        self.method_throws.iter().any(|t| simple_type(t) == exception)
    }

    pub fn has_checked(&self, permission: &str) -> bool {
        self.checked_permissions.iter().any(|p| p == permission)
    }
}

fn simple_type(name: &str) -> &str {
    name.rsplit('.').next().unwrap_or(name)
}

/// A call, constructor or field-read site with the facts that were in
/// force when control reached it. Recomputed fresh per traversal; nothing
/// here survives across files.
#[derive(Debug)]
pub struct CallSiteFacts<'a> {
    pub expr: &'a Expr,
    pub symbol: SymbolRef,
    pub args: Vec<&'a Expr>,
    pub span: Option<Span>,
    pub method: &'a Method,
    pub env: Env,
    pub sizes: SizeEnv,
    pub guards: GuardContext,
}

struct Walker<'a> {
    method: &'a Method,
    env: Env,
    sizes: SizeEnv,
    catch_stack: Vec<Vec<String>>,
    checked_permissions: Vec<String>,
    terminated: bool,
    out: Vec<CallSiteFacts<'a>>,
}

/// Runs the forward walk over a method body, yielding every call site with
/// its environment and guard context.
pub fn collect_call_sites(method: &Method) -> Vec<CallSiteFacts<'_>> {
    let mut walker = Walker {
        method,
        env: Env::new(),
        sizes: SizeEnv::new(),
        catch_stack: Vec::new(),
        checked_permissions: Vec::new(),
        terminated: false,
        out: Vec::new(),
    };
    walker.walk_block(&method.body);
    walker.out
}

impl<'a> Walker<'a> {
    fn snapshot_guards(&self) -> GuardContext {
        GuardContext {
            catch_clauses: self.catch_stack.clone(),
            checked_permissions: self.checked_permissions.clone(),
            method_throws: self.method.throws.clone(),
        }
    }

    fn record_site(&mut self, expr: &'a Expr, symbol: SymbolRef, args: Vec<&'a Expr>) {
        self.out.push(CallSiteFacts {
            expr,
            symbol,
            args,
            span: expr.span,
            method: self.method,
            env: self.env.clone(),
            sizes: self.sizes.clone(),
            guards: self.snapshot_guards(),
        });
    }

    fn visit_expr(&mut self, expr: &'a Expr) {
        match &expr.kind {
            ExprKind::Call {
                target,
                receiver,
                args,
            } => {
                if let Some(r) = receiver {
                    self.visit_expr(r);
                }
                for a in args {
                    self.visit_expr(a);
                }
                self.record_site(expr, target.clone(), args.iter().collect());
            }
            ExprKind::New { class, args, .. } => {
                for a in args {
                    self.visit_expr(a);
                }
                self.record_site(
                    expr,
                    SymbolRef::new(class.clone(), "<init>"),
                    args.iter().collect(),
                );
            }
            ExprKind::FieldRef(sym) => {
                self.record_site(expr, sym.clone(), Vec::new());
            }
            ExprKind::Unary { operand, .. } => self.visit_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.visit_expr(lhs);
                self.visit_expr(rhs);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.visit_expr(cond);
                self.visit_expr(then_expr);
                self.visit_expr(else_expr);
            }
            ExprKind::ArrayLit(items) => {
                for item in items {
                    self.visit_expr(item);
                }
            }
            ExprKind::Index { array, index } => {
                self.visit_expr(array);
                self.visit_expr(index);
            }
            ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::Unknown => {}
        }
    }

    fn walk_block(&mut self, stmts: &'a [Stmt]) {
        for stmt in stmts {
            if self.terminated {
                break;
            }
            self.walk_stmt(stmt);
        }
    }

    fn walk_stmt(&mut self, stmt: &'a Stmt) {
        match stmt {
            Stmt::Assign { target, value } => {
                self.visit_expr(value);
                let fact = evaluate(value, &self.env);
                self.env.insert(target.clone(), fact);
                match evaluate_size(value, &self.sizes) {
                    Some(size) => {
                        self.sizes.insert(target.clone(), size);
                    }
                    None => {
                        self.sizes.remove(target);
                    }
                }
            }
            Stmt::AssignIndex { index, value, .. } => {
                self.visit_expr(index);
                self.visit_expr(value);
            }
            Stmt::Expr(e) => self.visit_expr(e),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => self.walk_if(cond, then_body, else_body),
            Stmt::Loop { body } => self.walk_loop(body),
            Stmt::Try { body, catches } => self.walk_try(body, catches),
            Stmt::Return(value) => {
                if let Some(e) = value {
                    self.visit_expr(e);
                }
                self.terminated = true;
            }
            Stmt::Throw(e) => {
                self.visit_expr(e);
                self.terminated = true;
            }
        }
    }

    fn walk_if(&mut self, cond: &'a Expr, then_body: &'a [Stmt], else_body: &'a [Stmt]) {
        self.visit_expr(cond);

        let narrowings = Narrowings::from_condition(cond, &self.env);

        let entry_env = self.env.clone();
        let entry_sizes = self.sizes.clone();
        let checked_base = self.checked_permissions.len();

        // Then branch.
        narrowings.apply_then(&mut self.env);
        self.checked_permissions
            .extend(narrowings.then_checked.iter().cloned());
        self.walk_block(then_body);
        let then_terminated = self.terminated;
        let then_env = std::mem::replace(&mut self.env, entry_env.clone());
        let then_sizes = std::mem::replace(&mut self.sizes, entry_sizes.clone());
        self.checked_permissions.truncate(checked_base);
        self.terminated = false;

        // Else branch (possibly empty: just the negated narrowing).
        narrowings.apply_else(&mut self.env);
        self.checked_permissions
            .extend(narrowings.else_checked.iter().cloned());
        self.walk_block(else_body);
        let else_terminated = self.terminated;
        let else_env = std::mem::replace(&mut self.env, entry_env);
        let else_sizes = std::mem::replace(&mut self.sizes, entry_sizes);
        self.checked_permissions.truncate(checked_base);
        self.terminated = false;

        match (then_terminated, else_terminated) {
            (true, true) => {
                self.terminated = true;
            }
            (true, false) => {
                // Early return/throw: only the else path falls through, so
                // its (negation-narrowed) facts survive. This also keeps a
                // checkPermission guard with an early bail-out in force.
                self.env = else_env;
                self.sizes = else_sizes;
                self.checked_permissions
                    .extend(narrowings.else_checked.iter().cloned());
            }
            (false, true) => {
                self.env = then_env;
                self.sizes = then_sizes;
                self.checked_permissions
                    .extend(narrowings.then_checked.iter().cloned());
            }
            (false, false) => {
                self.env = merge_envs(&then_env, &else_env);
                self.sizes = merge_sizes(&then_sizes, &else_sizes);
            }
        }
    }

    fn walk_loop(&mut self, body: &'a [Stmt]) {
        let reassigned = assigned_names(body);
        // No fixed point: anything written in the loop is Unknown both at
        // loop entry (back edge) and after the loop.
        for name in &reassigned {
            self.env.insert(name.clone(), ValueFact::Unknown);
            self.sizes.remove(name);
        }
        self.walk_block(body);
        self.terminated = false;
        for name in &reassigned {
            self.env.insert(name.clone(), ValueFact::Unknown);
            self.sizes.remove(name);
        }
    }

    fn walk_try(&mut self, body: &'a [Stmt], catches: &'a [crate::model::semantic::CatchClause]) {
        let entry_env = self.env.clone();
        let entry_sizes = self.sizes.clone();

        self.catch_stack
            .extend(catches.iter().map(|c| c.exception_types.clone()));
        self.walk_block(body);
        self.catch_stack.truncate(self.catch_stack.len() - catches.len());
        let body_terminated = self.terminated;
        self.terminated = false;
        let body_env = std::mem::replace(&mut self.env, entry_env.clone());
        let body_sizes = std::mem::replace(&mut self.sizes, entry_sizes.clone());

        // Catch bodies run with any try-assigned fact invalidated: the
        // throw may have happened before or after the write.
        let invalidated = assigned_names(body);
        let mut merged_env = if body_terminated { None } else { Some(body_env) };
        let mut merged_sizes = if merged_env.is_some() {
            Some(body_sizes)
        } else {
            None
        };
        let mut all_terminated = body_terminated;

        for clause in catches {
            self.env = entry_env.clone();
            self.sizes = entry_sizes.clone();
            for name in &invalidated {
                self.env.insert(name.clone(), ValueFact::Unknown);
                self.sizes.remove(name);
            }
            self.walk_block(&clause.body);
            if !self.terminated {
                all_terminated = false;
                let clause_env = std::mem::replace(&mut self.env, entry_env.clone());
                let clause_sizes = std::mem::replace(&mut self.sizes, entry_sizes.clone());
                merged_env = Some(match merged_env {
                    Some(prev) => merge_envs(&prev, &clause_env),
                    None => clause_env,
                });
                merged_sizes = Some(match merged_sizes {
                    Some(prev) => merge_sizes(&prev, &clause_sizes),
                    None => clause_sizes,
                });
            }
            self.terminated = false;
        }

        if all_terminated && !catches.is_empty() {
            self.terminated = true;
        }
        if let Some(env) = merged_env {
            self.env = env;
        }
        if let Some(sizes) = merged_sizes {
            self.sizes = sizes;
        }
    }
}

fn merge_envs(a: &Env, b: &Env) -> Env {
    let mut out = Env::new();
    for key in a.keys().chain(b.keys()) {
        if out.contains_key(key) {
            continue;
        }
        let fa = a.get(key).cloned().unwrap_or(ValueFact::Unknown);
        let fb = b.get(key).cloned().unwrap_or(ValueFact::Unknown);
        out.insert(key.clone(), fa.merge(&fb));
    }
    out
}

fn merge_sizes(a: &SizeEnv, b: &SizeEnv) -> SizeEnv {
    a.iter()
        .filter(|(k, v)| b.get(*k) == Some(v))
        .map(|(k, v)| (k.clone(), *v))
        .collect()
}

fn assigned_names(stmts: &[Stmt]) -> Vec<String> {
    let mut names = Vec::new();
    fn collect(stmts: &[Stmt], names: &mut Vec<String>) {
        for stmt in stmts {
            match stmt {
                Stmt::Assign { target, .. } => names.push(target.clone()),
                Stmt::AssignIndex { array, .. } => names.push(array.clone()),
                Stmt::If {
                    then_body,
                    else_body,
                    ..
                } => {
                    collect(then_body, names);
                    collect(else_body, names);
                }
                Stmt::Loop { body } => collect(body, names),
                Stmt::Try { body, catches } => {
                    collect(body, names);
                    for c in catches {
                        collect(&c.body, names);
                    }
                }
                _ => {}
            }
        }
    }
    collect(stmts, &mut names);
    names.sort();
    names.dedup();
    names
}

/// Facts derivable from a branch condition: numeric narrowings for both
/// arms plus permissions established by checkPermission-style guards.
#[derive(Debug, Default)]
struct Narrowings {
    then_narrow: Vec<(String, BinaryOp, Num)>,
    else_narrow: Vec<(String, BinaryOp, Num)>,
    then_multiple: Vec<(String, i64, i64)>,
    else_multiple: Vec<(String, i64, i64)>,
    then_checked: Vec<String>,
    else_checked: Vec<String>,
}

impl Narrowings {
    fn from_condition(cond: &Expr, env: &Env) -> Self {
        let mut n = Self::default();
        n.collect(cond, env, false);
        n
    }

    fn collect(&mut self, cond: &Expr, env: &Env, negated: bool) {
        match &cond.kind {
            ExprKind::Unary {
                op: UnaryOp::Not,
                operand,
            } => self.collect(operand, env, !negated),
            ExprKind::Binary {
                op: BinaryOp::And,
                lhs,
                rhs,
            } if !negated => {
                // Both conjuncts hold on the then side; the else side
                // learns nothing from a failed conjunction.
                self.collect_one_sided(lhs, env);
                self.collect_one_sided(rhs, env);
            }
            ExprKind::Binary {
                op: BinaryOp::Or,
                lhs,
                rhs,
            } if negated => {
                // !(a || b) gives both negations on the fall-through side.
                self.collect_one_sided(&negate_cond(lhs), env);
                self.collect_one_sided(&negate_cond(rhs), env);
            }
            _ => {
                if let Some((key, op, num)) = comparison(cond, env) {
                    if negated {
                        self.then_narrow.push((key.clone(), negate_op(op), num));
                        self.else_narrow.push((key, op, num));
                    } else {
                        self.then_narrow.push((key.clone(), op, num));
                        self.else_narrow.push((key, negate_op(op), num));
                    }
                }
                if let Some((key, base, from, on_true)) = modulus_guard(cond, env) {
                    if on_true != negated {
                        self.then_multiple.push((key, base, from));
                    } else {
                        self.else_multiple.push((key, base, from));
                    }
                }
                if let Some(perms) = permission_guard(cond) {
                    if negated {
                        self.else_checked.extend(perms);
                    } else {
                        self.then_checked.extend(perms);
                    }
                } else if let Some(perms) = permission_guard_denied(cond) {
                    if negated {
                        self.then_checked.extend(perms);
                    } else {
                        self.else_checked.extend(perms);
                    }
                }
            }
        }
    }

    fn collect_one_sided(&mut self, cond: &Expr, env: &Env) {
        if let Some((key, op, num)) = comparison(cond, env) {
            self.then_narrow.push((key, op, num));
        }
        if let Some((key, base, from, true)) = modulus_guard(cond, env) {
            self.then_multiple.push((key, base, from));
        }
        if let Some(perms) = permission_guard(cond) {
            self.then_checked.extend(perms);
        }
    }

    fn apply_then(&self, env: &mut Env) {
        for (key, op, num) in &self.then_narrow {
            apply_narrowing(env, key, *op, *num);
        }
        for (key, base, from) in &self.then_multiple {
            apply_multiple(env, key, *base, *from);
        }
    }

    fn apply_else(&self, env: &mut Env) {
        for (key, op, num) in &self.else_narrow {
            apply_narrowing(env, key, *op, *num);
        }
        for (key, base, from) in &self.else_multiple {
            apply_multiple(env, key, *base, *from);
        }
    }
}

// A clone-based negation used only for the !(a || b) rewrite.
fn negate_cond(cond: &Expr) -> Expr {
    Expr::new(ExprKind::Unary {
        op: UnaryOp::Not,
        operand: Box::new(cond.clone()),
    })
}

fn comparison(cond: &Expr, env: &Env) -> Option<(String, BinaryOp, Num)> {
    // Unwrap a single negation here so collect_one_sided can reuse this.
    if let ExprKind::Unary {
        op: UnaryOp::Not,
        operand,
    } = &cond.kind
    {
        let (key, op, num) = comparison(operand, env)?;
        return Some((key, negate_op(op), num));
    }
    let ExprKind::Binary { op, lhs, rhs } = &cond.kind else {
        return None;
    };
    if !matches!(
        *op,
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge | BinaryOp::Eq | BinaryOp::Ne
    ) {
        return None;
    }
    if let Some(key) = tracked_key(lhs) {
        if let Some(num) = evaluate(rhs, env).as_num() {
            return Some((key, *op, num));
        }
    }
    if let Some(key) = tracked_key(rhs) {
        if let Some(num) = evaluate(lhs, env).as_num() {
            return Some((key, flip_op(*op), num));
        }
    }
    None
}

fn flip_op(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

fn negate_op(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Ge,
        BinaryOp::Le => BinaryOp::Gt,
        BinaryOp::Gt => BinaryOp::Le,
        BinaryOp::Ge => BinaryOp::Lt,
        BinaryOp::Eq => BinaryOp::Ne,
        BinaryOp::Ne => BinaryOp::Eq,
        other => other,
    }
}

fn apply_narrowing(env: &mut Env, key: &str, op: BinaryOp, num: Num) {
    let current = env.get(key).cloned().unwrap_or(ValueFact::Unknown);
    let narrowed = match op {
        BinaryOp::Eq => match current {
            ValueFact::Exact(_) => current,
            _ => match num {
                Num::Int(v) => ValueFact::exact_int(v),
                Num::Float(v) => ValueFact::Exact(ConstValue::Float(v)),
            },
        },
        BinaryOp::Ne => current,
        BinaryOp::Lt => current.narrow_range(None, Some(Bound::exclusive(num))),
        BinaryOp::Le => current.narrow_range(None, Some(Bound::inclusive(num))),
        BinaryOp::Gt => current.narrow_range(Some(Bound::exclusive(num)), None),
        BinaryOp::Ge => current.narrow_range(Some(Bound::inclusive(num)), None),
        _ => current,
    };
    env.insert(key.to_string(), narrowed);
}

/// Recognizes divisibility guards, `x % k == c` and `x % k != c` with a
/// positive integer divisor. The returned flag is true when the fact holds
/// on the true side of the condition (the `==` spelling).
fn modulus_guard(cond: &Expr, env: &Env) -> Option<(String, i64, i64, bool)> {
    let ExprKind::Binary { op, lhs, rhs } = &cond.kind else {
        return None;
    };
    let on_true = match op {
        BinaryOp::Eq => true,
        BinaryOp::Ne => false,
        _ => return None,
    };
    let extract = |modulus: &Expr, remainder: &Expr| -> Option<(String, i64, i64)> {
        let ExprKind::Binary {
            op: BinaryOp::Rem,
            lhs: value,
            rhs: divisor,
        } = &modulus.kind
        else {
            return None;
        };
        let key = tracked_key(value)?;
        let Some(Num::Int(base)) = evaluate(divisor, env).as_num() else {
            return None;
        };
        let Some(Num::Int(rem)) = evaluate(remainder, env).as_num() else {
            return None;
        };
        if base <= 0 {
            return None;
        }
        Some((key, base, rem.rem_euclid(base)))
    };
    let (key, base, from) = extract(lhs, rhs).or_else(|| extract(rhs, lhs))?;
    Some((key, base, from, on_true))
}

fn apply_multiple(env: &mut Env, key: &str, base: i64, from: i64) {
    let current = env.get(key).cloned().unwrap_or(ValueFact::Unknown);
    // A divisibility fact only refines Unknown; exact and interval facts
    // are already at least as precise for the detectors that consume them.
    if current == ValueFact::Unknown {
        env.insert(key.to_string(), ValueFact::Multiple { base, from });
    }
}

/// Recognizes checkPermission-family guards:
/// `checkSelfPermission(P)`, `checkSelfPermission(P) == PERMISSION_GRANTED`
/// and the `== 0` spelling. Returns the permissions proven granted on the
/// true side.
fn permission_guard(cond: &Expr) -> Option<Vec<String>> {
    fn check_call(expr: &Expr) -> Option<Vec<String>> {
        let ExprKind::Call { target, args, .. } = &expr.kind else {
            return None;
        };
        if !CHECK_PERMISSION_METHODS.contains(&target.member.as_str()) {
            return None;
        }
        let perms: Vec<String> = args
            .iter()
            .filter_map(|a| match &a.kind {
                ExprKind::Literal(ConstValue::Str(s)) => Some(s.clone()),
                _ => None,
            })
            .collect();
        if perms.is_empty() {
            None
        } else {
            Some(perms)
        }
    }

    if let Some(perms) = check_call(cond) {
        return Some(perms);
    }
    if let ExprKind::Binary {
        op: BinaryOp::Eq,
        lhs,
        rhs,
    } = &cond.kind
    {
        let granted = |e: &Expr| match &e.kind {
            ExprKind::Literal(ConstValue::Int(0)) => true,
            ExprKind::FieldRef(sym) => sym.member == "PERMISSION_GRANTED",
            _ => false,
        };
        if granted(rhs) {
            return check_call(lhs);
        }
        if granted(lhs) {
            return check_call(rhs);
        }
    }
    None
}

/// The denied spelling, `checkSelfPermission(P) != PERMISSION_GRANTED`.
/// Returns the permissions proven granted on the FALSE side, covering the
/// `if (denied) return;` early-bail idiom.
fn permission_guard_denied(cond: &Expr) -> Option<Vec<String>> {
    let ExprKind::Binary {
        op: BinaryOp::Ne,
        lhs,
        rhs,
    } = &cond.kind
    else {
        return None;
    };
    let flipped = Expr::new(ExprKind::Binary {
        op: BinaryOp::Eq,
        lhs: lhs.clone(),
        rhs: rhs.clone(),
    });
    permission_guard(&flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;

    fn range_i(lo: i64, hi: i64) -> ValueFact {
        ValueFact::Range {
            lo: Some(Bound::inclusive(Num::Int(lo))),
            hi: Some(Bound::inclusive(Num::Int(hi))),
        }
    }

    #[test]
    fn unknown_is_absorbing_in_merge() {
        assert_eq!(
            ValueFact::exact_int(3).merge(&ValueFact::Unknown),
            ValueFact::Unknown
        );
        assert_eq!(
            ValueFact::Unknown.merge(&range_i(0, 5)),
            ValueFact::Unknown
        );
    }

    #[test]
    fn equal_constants_stay_exact() {
        assert_eq!(
            ValueFact::exact_int(7).merge(&ValueFact::exact_int(7)),
            ValueFact::exact_int(7)
        );
    }

    #[test]
    fn differing_constants_widen_to_spanning_range() {
        assert_eq!(
            ValueFact::exact_int(2).merge(&ValueFact::exact_int(9)),
            range_i(2, 9)
        );
    }

    #[test]
    fn disjoint_ranges_merge_to_smallest_enclosing() {
        assert_eq!(range_i(0, 2).merge(&range_i(8, 10)), range_i(0, 10));
    }

    #[test]
    fn incompatible_types_merge_to_unknown() {
        assert_eq!(
            ValueFact::exact_int(1).merge(&ValueFact::Exact(ConstValue::Str("a".into()))),
            ValueFact::Unknown
        );
    }

    #[test]
    fn negative_range_keeps_bound_order() {
        // -(3..=5) must become -5..=-3, not -3..=-5.
        let negated = negate_fact(&range_i(3, 5));
        assert_eq!(negated, range_i(-5, -3));
    }

    #[test]
    fn straight_line_assignment_is_exact() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                assign("x", lit_i(4)),
                expr_stmt(call("t.D", "sink", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        assert_eq!(sites.len(), 1);
        assert_eq!(
            evaluate(sites[0].args[0], &sites[0].env),
            ValueFact::exact_int(4)
        );
    }

    #[test]
    fn branch_join_widens_to_range() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                assign("x", lit_i(1)),
                if_stmt(unknown(), vec![assign("x", lit_i(10))], vec![]),
                expr_stmt(call("t.D", "sink", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let sink = sites.last().unwrap();
        assert_eq!(evaluate(sink.args[0], &sink.env), range_i(1, 10));
    }

    #[test]
    fn ternary_merges_both_arms() {
        let env = Env::new();
        let e = cond(unknown(), lit_i(3), lit_i(6));
        assert_eq!(evaluate(&e, &env), range_i(3, 6));
    }

    #[test]
    fn loop_reassignment_degrades_to_unknown() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                assign("x", lit_i(1)),
                loop_stmt(vec![assign("x", bin(BinaryOp::Add, local("x"), lit_i(1)))]),
                expr_stmt(call("t.D", "sink", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let sink = sites.last().unwrap();
        assert_eq!(evaluate(sink.args[0], &sink.env), ValueFact::Unknown);
    }

    #[test]
    fn guard_narrows_within_guarded_region_only() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                if_stmt(
                    bin(BinaryOp::Ge, local("x"), lit_i(0)),
                    vec![expr_stmt(call("t.D", "inside", vec![local("x")]))],
                    vec![],
                ),
                expr_stmt(call("t.D", "outside", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let inside = sites
            .iter()
            .find(|s| s.symbol.member == "inside")
            .unwrap();
        match evaluate(inside.args[0], &inside.env) {
            ValueFact::Range { lo: Some(lo), hi: None } => {
                assert_eq!(lo.value, Num::Int(0));
                assert!(lo.inclusive);
            }
            other => panic!("expected narrowed range, got {other:?}"),
        }
        let outside = sites
            .iter()
            .find(|s| s.symbol.member == "outside")
            .unwrap();
        assert_eq!(evaluate(outside.args[0], &outside.env), ValueFact::Unknown);
    }

    #[test]
    fn early_return_guard_narrows_fall_through() {
        // if (x < 0) return; sink(x);  =>  x >= 0 at the sink.
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                if_stmt(bin(BinaryOp::Lt, local("x"), lit_i(0)), vec![ret(None)], vec![]),
                expr_stmt(call("t.D", "sink", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let sink = sites.last().unwrap();
        match evaluate(sink.args[0], &sink.env) {
            ValueFact::Range { lo: Some(lo), .. } => {
                assert_eq!(lo.value, Num::Int(0));
                assert!(lo.inclusive);
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn multiple_facts_merge_only_with_themselves() {
        let even = ValueFact::Multiple { base: 2, from: 0 };
        assert_eq!(even.merge(&even.clone()), even);
        assert_eq!(even.merge(&range_i(0, 4)), ValueFact::Unknown);
    }

    #[test]
    fn modulus_guard_narrows_to_a_multiple_fact() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                if_stmt(
                    bin(
                        BinaryOp::Eq,
                        bin(BinaryOp::Rem, local("x"), lit_i(3)),
                        lit_i(0),
                    ),
                    vec![expr_stmt(call("t.D", "inside", vec![local("x")]))],
                    vec![],
                ),
                expr_stmt(call("t.D", "outside", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let inside = sites.iter().find(|s| s.symbol.member == "inside").unwrap();
        assert_eq!(
            evaluate(inside.args[0], &inside.env),
            ValueFact::Multiple { base: 3, from: 0 }
        );
        let outside = sites.iter().find(|s| s.symbol.member == "outside").unwrap();
        assert_eq!(evaluate(outside.args[0], &outside.env), ValueFact::Unknown);
    }

    #[test]
    fn odd_check_with_early_return_leaves_an_even_fact() {
        // if (x % 2 != 0) return; sink(x);  =>  x is even at the sink.
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                if_stmt(
                    bin(
                        BinaryOp::Ne,
                        bin(BinaryOp::Rem, local("x"), lit_i(2)),
                        lit_i(0),
                    ),
                    vec![ret(None)],
                    vec![],
                ),
                expr_stmt(call("t.D", "sink", vec![local("x")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let sink = sites.last().unwrap();
        assert_eq!(
            evaluate(sink.args[0], &sink.env),
            ValueFact::Multiple { base: 2, from: 0 }
        );
    }

    #[test]
    fn interval_addition_preserves_inclusivity() {
        let a = range_i(1, 2);
        let b = range_i(10, 20);
        assert_eq!(
            arithmetic(BinaryOp::Add, &a, &b),
            range_i(11, 22)
        );
        assert_eq!(
            arithmetic(BinaryOp::Sub, &a, &b),
            range_i(-19, -8)
        );
    }

    #[test]
    fn unknown_operand_poisons_arithmetic() {
        assert_eq!(
            arithmetic(BinaryOp::Add, &ValueFact::exact_int(1), &ValueFact::Unknown),
            ValueFact::Unknown
        );
    }

    #[test]
    fn array_literal_size_tracks_through_assignment() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                assign("arr", array(vec![lit_i(1), lit_i(2), lit_i(3), lit_i(4)])),
                expr_stmt(call("t.D", "sink", vec![local("arr")])),
            ],
        );
        let sites = collect_call_sites(&m);
        let sink = sites.last().unwrap();
        assert_eq!(
            evaluate_size(sink.args[0], &sink.sizes),
            Some((4, SizeKind::Collection))
        );
    }

    #[test]
    fn check_permission_guard_is_collected() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![if_stmt(
                bin(
                    BinaryOp::Eq,
                    call(
                        "android.content.Context",
                        "checkSelfPermission",
                        vec![lit_s("android.permission.CAMERA")],
                    ),
                    lit_i(0),
                ),
                vec![expr_stmt(call("android.hardware.Camera", "open", vec![]))],
                vec![],
            )],
        );
        let sites = collect_call_sites(&m);
        let open = sites.iter().find(|s| s.symbol.member == "open").unwrap();
        assert!(open.guards.has_checked("android.permission.CAMERA"));
    }

    #[test]
    fn denied_check_with_early_return_guards_the_rest_of_the_method() {
        // if (checkSelfPermission(CAMERA) != 0) return; Camera.open();
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![
                if_stmt(
                    bin(
                        BinaryOp::Ne,
                        call(
                            "android.content.Context",
                            "checkSelfPermission",
                            vec![lit_s("android.permission.CAMERA")],
                        ),
                        lit_i(0),
                    ),
                    vec![ret(None)],
                    vec![],
                ),
                expr_stmt(call("android.hardware.Camera", "open", vec![])),
            ],
        );
        let sites = collect_call_sites(&m);
        let open = sites.iter().find(|s| s.symbol.member == "open").unwrap();
        assert!(open.guards.has_checked("android.permission.CAMERA"));
    }

    #[test]
    fn catch_clause_types_reach_call_sites_inside_try() {
        let m = method(
            "t.C",
            "f",
            vec![],
            vec![try_stmt(
                vec![expr_stmt(call("t.D", "risky", vec![]))],
                vec![catch(&["SecurityException", "java.io.IOException"], vec![])],
            )],
        );
        let sites = collect_call_sites(&m);
        let risky = sites.iter().find(|s| s.symbol.member == "risky").unwrap();
        assert!(risky.guards.catches_exactly("SecurityException"));
        assert!(!risky.guards.catches_exactly("RuntimeException"));
    }
}

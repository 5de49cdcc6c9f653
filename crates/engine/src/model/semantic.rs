//! Uniform semantic model consumed by the analysis core.
//!
//! The host-language front end (Java/Kotlin parsing, symbol resolution,
//! constant folding of tokens) lives outside this crate; it hands the engine
//! a pre-resolved program model in these shapes. Everything here is plain
//! serializable data so a model can also be loaded from JSON.

use crate::model::manifest::ManifestModel;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub line: usize,
    pub column: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub end_line: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub end_column: Option<usize>,
}

impl Span {
    pub fn new(line: usize, column: usize) -> Self {
        Self {
            line,
            column,
            end_line: None,
            end_column: None,
        }
    }

    pub fn to_location(self, file: &str) -> crate::core::Location {
        crate::core::Location {
            file: file.to_string(),
            line: self.line,
            column: self.column,
            end_line: self.end_line,
            end_column: self.end_column,
        }
    }
}

/// A constant the front end has already folded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Null,
}

impl ConstValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }
}

/// A resolved reference to a method, constructor or field of some class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SymbolRef {
    pub class: String,
    pub member: String,
}

impl SymbolRef {
    pub fn new(class: impl Into<String>, member: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            member: member.into(),
        }
    }

    /// `LocationManager.getLastKnownLocation` style short form used in
    /// diagnostic messages.
    pub fn short(&self) -> String {
        let class = self.class.rsplit('.').next().unwrap_or(&self.class);
        format!("{}.{}", class, self.member)
    }
}

impl fmt::Display for SymbolRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.class, self.member)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnnotationArg {
    Value(ConstValue),
    List(Vec<ConstValue>),
}

/// An annotation on a symbol, with its already-evaluated arguments.
/// The same shape is used for symbols read out of binary dependencies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub args: BTreeMap<String, AnnotationArg>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: BTreeMap::new(),
        }
    }

    pub fn with_arg(mut self, key: impl Into<String>, value: ConstValue) -> Self {
        self.args.insert(key.into(), AnnotationArg::Value(value));
        self
    }

    pub fn with_list(mut self, key: impl Into<String>, values: Vec<ConstValue>) -> Self {
        self.args.insert(key.into(), AnnotationArg::List(values));
        self
    }

    pub fn int_arg(&self, key: &str) -> Option<i64> {
        match self.args.get(key)? {
            AnnotationArg::Value(ConstValue::Int(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn float_arg(&self, key: &str) -> Option<f64> {
        match self.args.get(key)? {
            AnnotationArg::Value(ConstValue::Float(v)) => Some(*v),
            AnnotationArg::Value(ConstValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn bool_arg(&self, key: &str) -> Option<bool> {
        match self.args.get(key)? {
            AnnotationArg::Value(ConstValue::Bool(v)) => Some(*v),
            _ => None,
        }
    }

    pub fn str_arg(&self, key: &str) -> Option<&str> {
        match self.args.get(key)? {
            AnnotationArg::Value(ConstValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// A string-list argument; a single string value is accepted as a
    /// one-element list, matching how annotation attributes behave.
    pub fn str_list_arg(&self, key: &str) -> Vec<String> {
        match self.args.get(key) {
            Some(AnnotationArg::List(values)) => values
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect(),
            Some(AnnotationArg::Value(ConstValue::Str(s))) => vec![s.clone()],
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expr {
    pub kind: ExprKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub span: Option<Span>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self { kind, span: None }
    }

    pub fn at(mut self, line: usize, column: usize) -> Self {
        self.span = Some(Span::new(line, column));
        self
    }

    pub fn as_local(&self) -> Option<&str> {
        match &self.kind {
            ExprKind::Local(name) => Some(name),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Literal(ConstValue),
    /// Reference to a local variable or parameter by name.
    Local(String),
    /// Resolved read of a (possibly constant) field.
    FieldRef(SymbolRef),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
    Call {
        target: SymbolRef,
        receiver: Option<Box<Expr>>,
        args: Vec<Expr>,
    },
    /// Constructor call. `signature` holds the simple parameter type names
    /// so detectors can distinguish `Intent(Context, Class)` from
    /// `Intent(String)`.
    New {
        class: String,
        signature: Vec<String>,
        args: Vec<Expr>,
    },
    ArrayLit(Vec<Expr>),
    Index {
        array: Box<Expr>,
        index: Box<Expr>,
    },
    /// Anything the front end could not resolve (reflection, compilation
    /// errors in the fixture, unsupported syntax).
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchClause {
    /// Simple names of all caught types in this clause; a multi-catch
    /// contributes several entries.
    pub exception_types: Vec<String>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Assign {
        target: String,
        value: Expr,
    },
    /// `array[index] = value` where `array` is a local.
    AssignIndex {
        array: String,
        index: Expr,
        value: Expr,
    },
    Expr(Expr),
    If {
        cond: Expr,
        then_body: Vec<Stmt>,
        #[serde(default)]
        else_body: Vec<Stmt>,
    },
    Loop {
        body: Vec<Stmt>,
    },
    Try {
        body: Vec<Stmt>,
        catches: Vec<CatchClause>,
    },
    Return(Option<Expr>),
    Throw(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<Annotation>,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            annotations: Vec::new(),
        }
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotations.push(annotation);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub class: String,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub params: Vec<Param>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<Annotation>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub throws: Vec<String>,
    #[serde(default)]
    pub body: Vec<Stmt>,
}

impl Method {
    pub fn symbol(&self) -> SymbolRef {
        SymbolRef::new(self.class.clone(), self.name.clone())
    }

    pub fn annotation(&self, name: &str) -> Option<&Annotation> {
        self.annotations.iter().find(|a| a.name == name)
    }
}

/// A field declaration carrying annotations (e.g. a `@Size`-constrained
/// constant, or a field read requiring a permission).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub symbol: SymbolRef,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: String,
    #[serde(default)]
    pub methods: Vec<Method>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub fields: Vec<FieldDecl>,
}

/// Annotations on a symbol defined in a precompiled dependency. The binary
/// metadata reader exposes the same annotation shape as source symbols.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryAnnotatedSymbol {
    pub symbol: SymbolRef,
    pub annotations: Vec<Annotation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleModel {
    pub name: String,
    #[serde(default)]
    pub is_library: bool,
    /// Names of library modules this module consumes.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub depends_on: Vec<String>,
    pub manifest: ManifestModel,
    #[serde(default)]
    pub files: Vec<SourceFile>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub binary_annotations: Vec<BinaryAnnotatedSymbol>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectModel {
    pub modules: Vec<ModuleModel>,
}

impl ProjectModel {
    pub fn single(module: ModuleModel) -> Self {
        Self {
            modules: vec![module],
        }
    }

    pub fn module(&self, name: &str) -> Option<&ModuleModel> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// App modules that (transitively one hop; lint's module graph is flat
    /// here) consume the given library module.
    pub fn consumers_of(&self, library: &str) -> Vec<&ModuleModel> {
        self.modules
            .iter()
            .filter(|m| !m.is_library && m.depends_on.iter().any(|d| d == library))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_short_form_strips_package() {
        let sym = SymbolRef::new("android.location.LocationManager", "getLastKnownLocation");
        assert_eq!(sym.short(), "LocationManager.getLastKnownLocation");
    }

    #[test]
    fn annotation_single_string_reads_as_list() {
        let ann = Annotation::new("RequiresPermission").with_arg(
            "value",
            ConstValue::Str("android.permission.CAMERA".into()),
        );
        assert_eq!(
            ann.str_list_arg("value"),
            vec!["android.permission.CAMERA".to_string()]
        );
    }
}

pub mod build;
pub mod manifest;
pub mod rules;
pub mod semantic;

pub use manifest::{ComponentKind, IntentUseKind, ManifestModel, ProtectionLevel};
pub use rules::{
    PermissionExpr, PermissionRequirement, RangeConstraint, RequirementSource, RuleTable,
    SymbolRequirement,
};
pub use semantic::{
    Annotation, BinaryOp, ConstValue, Expr, ExprKind, Method, ModuleModel, Param, ProjectModel,
    SourceFile, Span, Stmt, SymbolRef, UnaryOp,
};

//! Permission resolution for a single call site.
//!
//! Given a symbol's permission requirement and the facts at the call site,
//! produces one of three verdicts. Conditional requirements are never
//! reported. A requirement that is satisfied by the manifest can still be
//! revoked at runtime when the satisfying permission is dangerous and the
//! app targets API 23 or later; such sites must guard against the
//! SecurityException or prove the permission with a checkPermission call.

use crate::analysis::value_flow::GuardContext;
use crate::model::manifest::{ManifestModel, ProtectionLevel};
use crate::model::rules::{PermissionExpr, PermissionRequirement, DANGEROUS_PERMISSIONS};
use crate::model::semantic::ModuleModel;

/// Android M introduced runtime permission revocation.
const RUNTIME_PERMISSIONS_API: u32 = 23;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionVerdict {
    Satisfied,
    /// Unmet; carries the permission names to report, in declaration order.
    Missing(Vec<String>),
    /// Declared but runtime-revocable and neither checked nor handled.
    RevocableUnchecked,
}

/// A dangerous permission is one the user can revoke at runtime. App-defined
/// permissions answer from their manifest `<permission>` declaration;
/// framework permissions fall back to the builtin list.
pub fn is_dangerous(permission: &str, manifest: &ManifestModel) -> bool {
    match manifest.protection_level(permission) {
        Some(level) => level == ProtectionLevel::Dangerous,
        None => DANGEROUS_PERMISSIONS.contains(&permission),
    }
}

/// Whether the site handles a possible revocation of `permission`. Only an
/// exact SecurityException catch (alone or in a multi-catch), an explicit
/// `throws SecurityException`, or a dominating checkPermission guard count.
/// Broad catches of RuntimeException or Exception do not.
pub fn handles_revocation(guards: &GuardContext, permission: &str) -> bool {
    guards.catches_exactly("SecurityException")
        || guards.throws("SecurityException")
        || guards.has_checked(permission)
}

/// Resolves a requirement against a single manifest's granted set.
///
/// `enclosing` is the permission requirement annotated on the method the
/// call appears in, if any; a caller that itself demands the same (or a
/// stronger) requirement has pushed the obligation to its own callers.
pub fn resolve(
    requirement: &PermissionRequirement,
    enclosing: Option<&PermissionRequirement>,
    guards: &GuardContext,
    manifest: &ManifestModel,
) -> PermissionVerdict {
    if requirement.conditional {
        return PermissionVerdict::Satisfied;
    }

    if let Some(outer) = enclosing {
        let outer_leaves = outer.expr.leaves();
        if requirement
            .expr
            .is_satisfied(&|p| outer_leaves.contains(&p))
        {
            return PermissionVerdict::Satisfied;
        }
    }

    let granted = |p: &str| manifest.is_declared(p);
    if !requirement.expr.is_satisfied(&granted) {
        return PermissionVerdict::Missing(requirement.expr.missing(&granted));
    }

    if manifest.target_sdk_version() >= RUNTIME_PERMISSIONS_API {
        let revocable: Vec<&str> = requirement
            .expr
            .leaves()
            .into_iter()
            .filter(|p| manifest.is_declared(p) && is_dangerous(p, manifest))
            .collect();
        if !revocable.is_empty() && !revocable.iter().any(|p| handles_revocation(guards, p)) {
            return PermissionVerdict::RevocableUnchecked;
        }
    }

    PermissionVerdict::Satisfied
}

/// Word joining the reported permission names in the message: alternatives
/// of an `anyOf` read "p1 or p2", everything else "p1 and p2".
pub fn join_word(expr: &PermissionExpr) -> &'static str {
    match expr {
        PermissionExpr::AnyOf(_) => "or",
        _ => "and",
    }
}

/// Re-resolves a miss found in a library module against the apps that
/// consume it. A leaf counts as granted when either the library's own
/// manifest or the consuming app's manifest declares it. Returns the
/// leaves still unmet for at least one consumer, in declaration order; an
/// empty result means every consumer satisfies the requirement and the
/// deferred miss is dropped.
pub fn resolve_deferred(
    expr: &PermissionExpr,
    library: &ManifestModel,
    consumers: &[&ModuleModel],
) -> Vec<String> {
    if consumers.is_empty() {
        let granted = |p: &str| library.is_declared(p);
        return expr.missing(&granted);
    }
    let mut still_missing: Vec<String> = Vec::new();
    for consumer in consumers {
        let granted =
            |p: &str| library.is_declared(p) || consumer.manifest.is_declared(p);
        for name in expr.missing(&granted) {
            if !still_missing.contains(&name) {
                still_missing.push(name);
            }
        }
    }
    // Keep declaration order regardless of consumer iteration order.
    let order = expr.leaves();
    still_missing.sort_by_key(|n| order.iter().position(|l| *l == n.as_str()));
    still_missing
}

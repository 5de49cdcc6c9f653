//! Missing and revocable permission checks.

use crate::analysis::permissions::{join_word, resolve, resolve_deferred, PermissionVerdict};
use crate::analysis::value_flow::collect_call_sites;
use crate::core::{Diagnostic, Location, Severity};
use crate::detectors::{span_location, FileContext};
use crate::model::semantic::{ModuleModel, SymbolRef};
use anyhow::Result;

pub const RULE: &str = "MissingPermission";

pub const REVOCABLE_MESSAGE: &str = "Call requires permission which may be rejected by user: \
     code should explicitly check to see if permission is available (with checkPermission) \
     or explicitly handle a potential SecurityException";

fn missing_message(symbol: &SymbolRef, word: &str, leaves: &[String]) -> String {
    format!(
        "Missing permissions required by {}: {}",
        symbol.short(),
        leaves.join(&format!(" {word} "))
    )
}

pub fn run(ctx: &FileContext<'_>) -> Result<Vec<Diagnostic>> {
    let mut out = Vec::new();
    let manifest = &ctx.module.manifest;

    for method in &ctx.file.methods {
        let enclosing = ctx
            .rules
            .lookup(&method.symbol())
            .and_then(|r| r.permissions.as_ref());

        for site in collect_call_sites(method) {
            let Some(req) = ctx.rules.lookup(&site.symbol) else {
                continue;
            };
            let Some(perm) = &req.permissions else {
                continue;
            };
            let location = span_location(&ctx.file.path, site.span);
            match resolve(perm, enclosing, &site.guards, manifest) {
                PermissionVerdict::Satisfied => {}
                PermissionVerdict::RevocableUnchecked => {
                    tracing::debug!(symbol = %site.symbol, "revocable permission unhandled");
                    out.push(Diagnostic::new(
                        RULE,
                        Severity::Error,
                        REVOCABLE_MESSAGE,
                        location,
                    ));
                }
                PermissionVerdict::Missing(leaves) => {
                    let leaves = if ctx.module.is_library {
                        // Library misses are settled by whichever apps ship
                        // the library; report only what no consumer grants,
                        // at the original library call site.
                        let consumers = ctx.project.consumers_of(&ctx.module.name);
                        if consumers.is_empty() {
                            leaves
                        } else {
                            resolve_deferred(&perm.expr, manifest, &consumers)
                        }
                    } else {
                        leaves
                    };
                    if leaves.is_empty() {
                        continue;
                    }
                    out.push(Diagnostic::new(
                        RULE,
                        Severity::Error,
                        missing_message(&site.symbol, join_word(&perm.expr), &leaves),
                        location,
                    ));
                }
            }
        }
    }
    Ok(out)
}

/// API 34 made typed foreground-service permissions mandatory.
const TYPED_FOREGROUND_SERVICE_API: u32 = 34;

fn foreground_type_permission(service_type: &str) -> String {
    // dataSync -> FOREGROUND_SERVICE_DATA_SYNC
    let mut suffix = String::new();
    for ch in service_type.chars() {
        if ch.is_ascii_uppercase() {
            suffix.push('_');
        }
        suffix.push(ch.to_ascii_uppercase());
    }
    format!("android.permission.FOREGROUND_SERVICE_{suffix}")
}

/// Manifest-only pass: every `<service>` declaring a foregroundServiceType
/// needs the generic FOREGROUND_SERVICE permission plus the type-specific
/// one, once the module targets API 34.
pub fn check_manifest(module: &ModuleModel) -> Vec<Diagnostic> {
    let manifest = &module.manifest;
    if manifest.target_sdk_version() < TYPED_FOREGROUND_SERVICE_API {
        return Vec::new();
    }
    let mut out = Vec::new();
    for service in manifest.services() {
        let Some(service_type) = &service.foreground_service_type else {
            continue;
        };
        let required = [
            "android.permission.FOREGROUND_SERVICE".to_string(),
            foreground_type_permission(service_type),
        ];
        let missing: Vec<String> = required
            .iter()
            .filter(|p| !manifest.is_declared(p))
            .cloned()
            .collect();
        if missing.is_empty() {
            continue;
        }
        out.push(Diagnostic::new(
            RULE,
            Severity::Error,
            format!(
                "Missing permissions required by foregroundServiceType:{}: {}",
                service_type,
                missing.join(" and ")
            ),
            Location::new("AndroidManifest.xml", 1, 1),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::intent_flow::RegisteredReceivers;
    use crate::model::build::*;
    use crate::model::manifest::{ComponentKind, ManifestComponent, ManifestModel};
    use crate::model::rules::RuleTable;
    use crate::model::semantic::{ProjectModel, SourceFile, Stmt};

    const FINE: &str = "android.permission.ACCESS_FINE_LOCATION";
    const COARSE: &str = "android.permission.ACCESS_COARSE_LOCATION";

    fn location_call() -> Stmt {
        expr_stmt(
            call(
                "android.location.LocationManager",
                "getLastKnownLocation",
                vec![lit_s("gps")],
            ),
        )
    }

    fn project(manifest: ManifestModel, body: Vec<Stmt>) -> ProjectModel {
        ProjectModel::single(crate::model::semantic::ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest,
            files: vec![SourceFile {
                path: "src/Caller.java".into(),
                methods: vec![method("test.pkg.Caller", "locate", vec![], body)],
                fields: Vec::new(),
            }],
            binary_annotations: Vec::new(),
        })
    }

    fn run_on(project: &ProjectModel) -> Vec<Diagnostic> {
        let rules = RuleTable::for_project(project);
        let registered = RegisteredReceivers::default();
        let module = &project.modules[0];
        let ctx = FileContext {
            project,
            module,
            file: &module.files[0],
            rules: &rules,
            registered: &registered,
        };
        run(&ctx).unwrap()
    }

    fn manifest(target_sdk: u32, permissions: &[&str]) -> ManifestModel {
        ManifestModel {
            package: "test.pkg".into(),
            min_sdk: 21,
            target_sdk,
            uses_permissions: permissions.iter().map(|p| p.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn undeclared_location_permission_reports_both_alternatives() {
        let p = project(manifest(34, &[]), vec![location_call()]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].message,
            format!(
                "Missing permissions required by LocationManager.getLastKnownLocation: {FINE} or {COARSE}"
            )
        );
    }

    #[test]
    fn security_exception_catch_downgrades_to_clean() {
        let guarded = try_stmt(vec![location_call()], vec![catch(&["SecurityException"], vec![])]);
        let p = project(manifest(34, &[FINE]), vec![guarded]);
        assert!(run_on(&p).is_empty());
    }

    #[test]
    fn runtime_exception_catch_still_reports_revocable() {
        let guarded = try_stmt(vec![location_call()], vec![catch(&["RuntimeException"], vec![])]);
        let p = project(manifest(34, &[FINE]), vec![guarded]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, REVOCABLE_MESSAGE);
    }

    #[test]
    fn data_sync_service_at_target_34_needs_typed_permission() {
        let mut m = manifest(34, &["android.permission.FOREGROUND_SERVICE"]);
        m.components.push(ManifestComponent {
            kind: ComponentKind::Service,
            name: "test.pkg.SyncService".into(),
            exported: false,
            intent_actions: Vec::new(),
            foreground_service_type: Some("dataSync".into()),
        });
        let module = crate::model::semantic::ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest: m,
            files: Vec::new(),
            binary_annotations: Vec::new(),
        };
        let out = check_manifest(&module);
        assert_eq!(out.len(), 1);
        assert!(out[0]
            .message
            .contains("android.permission.FOREGROUND_SERVICE_DATA_SYNC"));
    }

    #[test]
    fn data_sync_service_below_target_34_is_skipped() {
        let mut m = manifest(33, &[]);
        m.components.push(ManifestComponent {
            kind: ComponentKind::Service,
            name: "test.pkg.SyncService".into(),
            exported: false,
            intent_actions: Vec::new(),
            foreground_service_type: Some("dataSync".into()),
        });
        let module = crate::model::semantic::ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest: m,
            files: Vec::new(),
            binary_annotations: Vec::new(),
        };
        assert!(check_manifest(&module).is_empty());
    }
}

//! Calls into APIs newer than the module's minSdkVersion.

use crate::analysis::value_flow::{CallSiteFacts, ValueFact};
use crate::core::{Diagnostic, Severity};
use crate::detectors::{span_location, FileContext};
use crate::model::semantic::SymbolRef;
use anyhow::Result;

pub const RULE: &str = "NewApi";

fn sdk_int_key() -> String {
    SymbolRef::new("android.os.Build.VERSION", "SDK_INT").to_string()
}

/// Whether a dominating `SDK_INT >= api` guard is in force at the site. The
/// walker narrows the SDK_INT pseudo-variable like any other comparison, so
/// this reads straight out of the environment.
fn sdk_guarded(site: &CallSiteFacts<'_>, api: u32) -> bool {
    match site.env.get(&sdk_int_key()) {
        Some(fact @ ValueFact::Exact(_)) => fact
            .as_num()
            .is_some_and(|n| n.as_f64() >= api as f64),
        Some(ValueFact::Range { lo: Some(lo), .. }) => {
            let v = lo.value.as_f64();
            v > api as f64 || (v == api as f64 && lo.inclusive)
        }
        _ => false,
    }
}

pub fn run(ctx: &FileContext<'_>) -> Result<Vec<Diagnostic>> {
    let min_sdk = ctx.module.manifest.min_sdk_version();
    let mut out = Vec::new();
    for method in &ctx.file.methods {
        for site in crate::analysis::value_flow::collect_call_sites(method) {
            let Some(api) = ctx.rules.lookup(&site.symbol).and_then(|r| r.min_api) else {
                continue;
            };
            if api <= min_sdk || sdk_guarded(&site, api) {
                continue;
            }
            out.push(Diagnostic::new(
                RULE,
                Severity::Error,
                format!(
                    "Call requires API level {api} (current min is {min_sdk}): {}",
                    site.symbol.short()
                ),
                span_location(&ctx.file.path, site.span),
            ));
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::intent_flow::RegisteredReceivers;
    use crate::model::build::*;
    use crate::model::manifest::ManifestModel;
    use crate::model::rules::RuleTable;
    use crate::model::semantic::{BinaryOp, ModuleModel, ProjectModel, SourceFile, Stmt};
    use crate::model::Expr;

    fn channel_ctor() -> Expr {
        ctor(
            "android.app.NotificationChannel",
            &["String", "CharSequence", "int"],
            vec![lit_s("id"), lit_s("name"), lit_i(3)],
        )
    }

    fn project(min_sdk: u32, body: Vec<Stmt>) -> ProjectModel {
        ProjectModel::single(ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest: ManifestModel {
                package: "test.pkg".into(),
                min_sdk,
                target_sdk: 34,
                ..Default::default()
            },
            files: vec![SourceFile {
                path: "src/Notifier.java".into(),
                methods: vec![method("test.pkg.Notifier", "notifyUser", vec![], body)],
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

    #[test]
    fn new_api_below_min_sdk_is_flagged() {
        let p = project(21, vec![expr_stmt(channel_ctor())]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(
            out[0].message,
            "Call requires API level 26 (current min is 21): NotificationChannel.<init>"
        );
    }

    #[test]
    fn min_sdk_at_or_above_requirement_is_clean() {
        let p = project(26, vec![expr_stmt(channel_ctor())]);
        assert!(run_on(&p).is_empty());
    }

    #[test]
    fn sdk_int_guard_suppresses() {
        let guarded = if_stmt(
            bin(
                BinaryOp::Ge,
                field("android.os.Build.VERSION", "SDK_INT"),
                lit_i(26),
            ),
            vec![expr_stmt(channel_ctor())],
            vec![],
        );
        let p = project(21, vec![guarded]);
        assert!(run_on(&p).is_empty());
    }

    #[test]
    fn insufficient_sdk_int_guard_still_flags() {
        let guarded = if_stmt(
            bin(
                BinaryOp::Ge,
                field("android.os.Build.VERSION", "SDK_INT"),
                lit_i(24),
            ),
            vec![expr_stmt(channel_ctor())],
            vec![],
        );
        let p = project(21, vec![guarded]);
        assert_eq!(run_on(&p).len(), 1);
    }

    #[test]
    fn early_return_sdk_guard_suppresses() {
        let body = vec![
            if_stmt(
                bin(
                    BinaryOp::Lt,
                    field("android.os.Build.VERSION", "SDK_INT"),
                    lit_i(26),
                ),
                vec![ret(None)],
                vec![],
            ),
            expr_stmt(channel_ctor()),
        ];
        let p = project(21, body);
        assert!(run_on(&p).is_empty());
    }
}

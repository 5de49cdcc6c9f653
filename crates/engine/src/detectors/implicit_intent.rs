//! Implicit intents that can only sensibly target a non-exported component.
//!
//! Launching such an intent either fails or, worse, gets picked up by an
//! unrelated app that registered the same action. The fix is to make the
//! intent explicit; both suggested edits are attached to the finding.

use crate::analysis::intent_flow::{find_implicit_launches, ImplicitLaunch};
use crate::core::{Diagnostic, FixKind, Severity, SuggestedFix};
use crate::detectors::{span_location, FileContext};
use anyhow::Result;

pub const RULE: &str = "UnsafeImplicitIntentLaunch";

fn message(launch: &ImplicitLaunch) -> String {
    format!(
        "The intent action `{}` matches the intent filter of a non-exported component `{}` \
         from a manifest. If you are trying to invoke this specific component via the action \
         then you should make the intent explicit by calling \
         `Intent.set{{Component,Class,ClassName}}`",
        launch.action, launch.component
    )
}

pub fn run(ctx: &FileContext<'_>) -> Result<Vec<Diagnostic>> {
    let mut out = Vec::new();
    for method in &ctx.file.methods {
        for launch in find_implicit_launches(method, &ctx.module.manifest, ctx.registered) {
            let location = span_location(&ctx.file.path, launch.span);
            let mut fixes = Vec::new();
            if !launch.package_fix_only {
                fixes.push(SuggestedFix::new(
                    FixKind::SetClassName,
                    "Set class name",
                    location.clone(),
                    format!(
                        ".setClassName(getPackageName(), \"{}\")",
                        launch.component
                    ),
                ));
            }
            fixes.push(SuggestedFix::new(
                FixKind::SetPackage,
                "Set package name",
                location.clone(),
                ".setPackage(getPackageName())",
            ));
            out.push(
                Diagnostic::new(RULE, Severity::Warning, message(&launch), location)
                    .with_fixes(fixes),
            );
        }
    }
    Ok(out)
}

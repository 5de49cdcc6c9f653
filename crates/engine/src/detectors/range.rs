//! Range and size contract checks on call arguments.
//!
//! Only proven violations are reported: an Exact fact outside the bounds,
//! a Range fact entirely outside them, or a provable size mismatch. An
//! Unknown fact never produces a finding.

use crate::analysis::value_flow::{evaluate, evaluate_size, Bound, Num, SizeKind, ValueFact};
use crate::core::{Diagnostic, Severity};
use crate::detectors::{span_location, FileContext};
use crate::model::rules::RangeConstraint;
use anyhow::Result;

pub const RULE: &str = "Range";

pub fn run(ctx: &FileContext<'_>) -> Result<Vec<Diagnostic>> {
    let mut out = Vec::new();
    for method in &ctx.file.methods {
        for site in crate::analysis::value_flow::collect_call_sites(method) {
            let Some(req) = ctx.rules.lookup(&site.symbol) else {
                continue;
            };
            for pc in &req.param_constraints {
                let Some(arg) = site.args.get(pc.index) else {
                    continue;
                };
                let message = match &pc.constraint {
                    RangeConstraint::IntRange { from, to } => {
                        int_range_violation(&evaluate(arg, &site.env), *from, *to)
                    }
                    RangeConstraint::FloatRange {
                        from,
                        to,
                        from_inclusive,
                        to_inclusive,
                    } => float_range_violation(
                        &evaluate(arg, &site.env),
                        *from,
                        *to,
                        *from_inclusive,
                        *to_inclusive,
                    ),
                    RangeConstraint::Size {
                        exact,
                        min,
                        max,
                        multiple,
                    } => evaluate_size(arg, &site.sizes).and_then(|(n, kind)| {
                        size_violation(n, kind, *exact, *min, *max, *multiple)
                    }),
                };
                if let Some(message) = message {
                    out.push(Diagnostic::new(
                        RULE,
                        Severity::Error,
                        message,
                        span_location(&ctx.file.path, arg.span.or(site.span)),
                    ));
                }
            }
        }
    }
    Ok(out)
}

fn int_range_violation(fact: &ValueFact, from: Option<i64>, to: Option<i64>) -> Option<String> {
    if let Some(v) = fact.as_num() {
        if let Some(f) = from {
            if v.as_f64() < f as f64 {
                return Some(format!("Value must be \u{2265} {f} (was {v})"));
            }
        }
        if let Some(t) = to {
            if v.as_f64() > t as f64 {
                return Some(format!("Value must be \u{2264} {t} (was {v})"));
            }
        }
        return None;
    }
    let ValueFact::Range { lo, hi } = fact else {
        return None;
    };
    if let (Some(f), Some(hi)) = (from, hi) {
        if entirely_below(*hi, Num::Int(f), true) {
            return Some(format!("Value must be \u{2265} {f}"));
        }
    }
    if let (Some(t), Some(lo)) = (to, lo) {
        if entirely_above(*lo, Num::Int(t), true) {
            return Some(format!("Value must be \u{2264} {t}"));
        }
    }
    None
}

fn float_range_violation(
    fact: &ValueFact,
    from: Option<f64>,
    to: Option<f64>,
    from_inclusive: bool,
    to_inclusive: bool,
) -> Option<String> {
    let from_sym = if from_inclusive { '\u{2265}' } else { '>' };
    let to_sym = if to_inclusive { '\u{2264}' } else { '<' };
    if let Some(v) = fact.as_num() {
        if let Some(f) = from {
            let violates = v.as_f64() < f || (!from_inclusive && v.as_f64() == f);
            if violates {
                return Some(format!(
                    "Value must be {from_sym} {} (was {v})",
                    Num::Float(f)
                ));
            }
        }
        if let Some(t) = to {
            let violates = v.as_f64() > t || (!to_inclusive && v.as_f64() == t);
            if violates {
                return Some(format!("Value must be {to_sym} {} (was {v})", Num::Float(t)));
            }
        }
        return None;
    }
    let ValueFact::Range { lo, hi } = fact else {
        return None;
    };
    if let (Some(f), Some(hi)) = (from, hi) {
        if entirely_below(*hi, Num::Float(f), from_inclusive) {
            return Some(format!("Value must be {from_sym} {}", Num::Float(f)));
        }
    }
    if let (Some(t), Some(lo)) = (to, lo) {
        if entirely_above(*lo, Num::Float(t), to_inclusive) {
            return Some(format!("Value must be {to_sym} {}", Num::Float(t)));
        }
    }
    None
}

/// Every value under `hi` fails a `>= limit` (or `> limit`) requirement.
fn entirely_below(hi: Bound, limit: Num, limit_inclusive: bool) -> bool {
    let h = hi.value.as_f64();
    let l = limit.as_f64();
    h < l || (h == l && (!hi.inclusive || !limit_inclusive))
}

fn entirely_above(lo: Bound, limit: Num, limit_inclusive: bool) -> bool {
    let v = lo.value.as_f64();
    let l = limit.as_f64();
    v > l || (v == l && (!lo.inclusive || !limit_inclusive))
}

fn size_violation(
    n: i64,
    kind: SizeKind,
    exact: Option<i64>,
    min: Option<i64>,
    max: Option<i64>,
    multiple: Option<i64>,
) -> Option<String> {
    let word = match kind {
        SizeKind::Collection => "size",
        SizeKind::CharSequence => "length",
    };
    if let Some(e) = exact {
        if n != e {
            return Some(format!("Expected {word} {e} (was {n})"));
        }
    }
    if let Some(m) = min {
        if n < m {
            return Some(format!("Expected {word} \u{2265} {m} (was {n})"));
        }
    }
    if let Some(m) = max {
        if n > m {
            return Some(format!("Expected {word} \u{2264} {m} (was {n})"));
        }
    }
    if let Some(m) = multiple {
        if m > 0 && n % m != 0 {
            let lower = n - n % m;
            return Some(format!(
                "Expected {word} to be a multiple of {m} (was {n} and should be either {lower} or {})",
                lower + m
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::intent_flow::RegisteredReceivers;
    use crate::model::build::*;
    use crate::model::manifest::ManifestModel;
    use crate::model::rules::RuleTable;
    use crate::model::semantic::{
        Annotation, BinaryOp, ConstValue, Expr, ModuleModel, Param, ProjectModel, SourceFile, Stmt,
    };

    fn int_range_annotation(from: i64, to: i64) -> Annotation {
        Annotation::new("androidx.annotation.IntRange")
            .with_arg("from", ConstValue::Int(from))
            .with_arg("to", ConstValue::Int(to))
    }

    /// One annotated API method plus a caller passing `arg` to it.
    fn project_with(param_annotation: Annotation, arg: Expr, prelude: Vec<Stmt>) -> ProjectModel {
        let api = method(
            "test.pkg.Api",
            "consume",
            vec![Param::new("value").with_annotation(param_annotation)],
            vec![],
        );
        let mut body = prelude;
        body.push(expr_stmt(call("test.pkg.Api", "consume", vec![arg])));
        let caller = method("test.pkg.Caller", "run", vec![], body);
        ProjectModel::single(ModuleModel {
            name: "app".into(),
            is_library: false,
            depends_on: Vec::new(),
            manifest: ManifestModel::default(),
            files: vec![SourceFile {
                path: "src/Caller.java".into(),
                methods: vec![api, caller],
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
    fn int_above_upper_bound_is_flagged() {
        let p = project_with(int_range_annotation(4, 7), lit_i(8), vec![]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "Value must be \u{2264} 7 (was 8)");
    }

    #[test]
    fn int_within_bounds_is_clean() {
        for v in 4..=7 {
            let p = project_with(int_range_annotation(4, 7), lit_i(v), vec![]);
            assert!(run_on(&p).is_empty(), "value {v}");
        }
    }

    #[test]
    fn unknown_value_is_never_flagged() {
        let p = project_with(int_range_annotation(4, 7), local("mystery"), vec![]);
        assert!(run_on(&p).is_empty());
    }

    #[test]
    fn float_below_inclusive_lower_bound() {
        let ann = Annotation::new("androidx.annotation.FloatRange")
            .with_arg("from", ConstValue::Float(2.5));
        let p = project_with(ann, lit_f(2.49), vec![]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "Value must be \u{2265} 2.5 (was 2.49)");
    }

    #[test]
    fn float_bound_prints_with_decimal_point() {
        let ann = Annotation::new("androidx.annotation.FloatRange")
            .with_arg("to", ConstValue::Float(7.0));
        let p = project_with(ann, lit_f(8.0), vec![]);
        let out = run_on(&p);
        assert_eq!(out[0].message, "Value must be \u{2264} 7.0 (was 8.0)");
    }

    #[test]
    fn exclusive_float_bound_rejects_the_bound_itself() {
        let ann = Annotation::new("androidx.annotation.FloatRange")
            .with_arg("from", ConstValue::Float(0.0))
            .with_arg("fromInclusive", ConstValue::Bool(false));
        let p = project_with(ann, lit_f(0.0), vec![]);
        let out = run_on(&p);
        assert_eq!(out[0].message, "Value must be > 0.0 (was 0.0)");
    }

    #[test]
    fn size_exact_mismatch_on_array_literal() {
        let ann = Annotation::new("androidx.annotation.Size").with_arg("value", ConstValue::Int(5));
        let arr = array(vec![lit_i(1), lit_i(2), lit_i(3), lit_i(4)]);
        let p = project_with(ann, arr, vec![]);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "Expected size 5 (was 4)");
    }

    #[test]
    fn string_length_uses_length_wording() {
        let ann = Annotation::new("androidx.annotation.Size").with_arg("min", ConstValue::Int(5));
        let p = project_with(ann, lit_s("abcd"), vec![]);
        let out = run_on(&p);
        assert_eq!(out[0].message, "Expected length \u{2265} 5 (was 4)");
    }

    #[test]
    fn size_multiple_suggests_bracketing_multiples() {
        let ann =
            Annotation::new("androidx.annotation.Size").with_arg("multiple", ConstValue::Int(3));
        let arr = array(vec![lit_i(1), lit_i(2), lit_i(3), lit_i(4)]);
        let p = project_with(ann, arr, vec![]);
        let out = run_on(&p);
        assert_eq!(
            out[0].message,
            "Expected size to be a multiple of 3 (was 4 and should be either 3 or 6)"
        );
    }

    #[test]
    fn range_fact_entirely_outside_is_flagged_without_witness() {
        // x is narrowed to > 10 before the call, constraint is <= 7.
        let prelude = vec![if_stmt(
            bin(BinaryOp::Le, local("x"), lit_i(10)),
            vec![ret(None)],
            vec![],
        )];
        let p = project_with(int_range_annotation(0, 7), local("x"), prelude);
        let out = run_on(&p);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].message, "Value must be \u{2264} 7");
    }

    #[test]
    fn detector_is_idempotent() {
        let p = project_with(int_range_annotation(4, 7), lit_i(8), vec![]);
        assert_eq!(run_on(&p), run_on(&p));
    }
}

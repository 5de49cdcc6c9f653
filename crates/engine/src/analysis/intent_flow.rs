//! Intent explicitness tracking.
//!
//! Follows Intent values through a method body and decides, at each launch
//! sink, whether the intent is still implicit. Explicitness is sticky and
//! conservative: a Class-taking constructor, any `setClass`-family call, an
//! unrecognized call on the intent, or an escape of the intent to unknown
//! code all mark it explicit and suppress reporting. Aliasing copies state
//! by value; reassignment kills prior facts; arrays are element-sensitive.

use crate::model::manifest::{IntentUseKind, ManifestModel};
use crate::model::semantic::{ConstValue, Expr, ExprKind, Method, SourceFile, Span, Stmt};
use std::collections::{HashMap, HashSet};

const INTENT_CLASS: &str = "android.content.Intent";
const INTENT_FILTER_CLASS: &str = "android.content.IntentFilter";

/// Calls that make an intent explicit for the rest of the path.
const EXPLICIT_SETTERS: &[&str] = &["setClass", "setClassName", "setComponent", "setPackage"];

/// Calls known not to affect explicitness. Anything else on an intent
/// receiver is treated as explicit, matching the conservative contract.
const BENIGN_CALLS: &[&str] = &[
    "setAction",
    "setData",
    "setDataAndType",
    "setType",
    "setFlags",
    "addFlags",
    "addCategory",
    "putExtra",
    "putExtras",
    "removeExtra",
];

const ACTIVITY_SINKS: &[&str] = &["startActivity", "startActivityForResult"];
const BROADCAST_SINKS: &[&str] = &["sendBroadcast", "sendBroadcastAsUser", "sendOrderedBroadcast"];

#[derive(Debug, Clone, Default)]
struct IntentState {
    explicit: bool,
    /// Every action observed flowing into this intent, with the span of the
    /// expression that set it. Reports attach to these spans, not the sink.
    actions: Vec<(String, Option<Span>)>,
}

impl IntentState {
    fn explicit() -> Self {
        Self {
            explicit: true,
            actions: Vec::new(),
        }
    }
}

/// An implicit intent reaching a launch sink while matching a non-exported
/// component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImplicitLaunch {
    pub action: String,
    /// Where the action was set.
    pub span: Option<Span>,
    pub component: String,
    pub kind: IntentUseKind,
    /// Dynamically registered receivers have no manifest entry to point a
    /// class fix at; only the package fix applies.
    pub package_fix_only: bool,
}

/// Actions serviced by receivers registered at runtime with
/// `RECEIVER_NOT_EXPORTED`, mapped to the receiver class when resolvable.
#[derive(Debug, Default)]
pub struct RegisteredReceivers {
    entries: Vec<(String, String)>,
}

impl RegisteredReceivers {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn receivers_for(&self, action: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|(a, _)| a == action)
            .map(|(_, class)| class.as_str())
            .collect()
    }
}

// Context.RECEIVER_NOT_EXPORTED == 4.
fn is_not_exported_flag(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::FieldRef(sym) => sym.member == "RECEIVER_NOT_EXPORTED",
        ExprKind::Literal(ConstValue::Int(4)) => true,
        _ => false,
    }
}

/// Scans a file for `registerReceiver(receiver, filter, .., RECEIVER_NOT_EXPORTED)`
/// calls and collects the filter actions each non-exported receiver handles.
pub fn collect_registered_receivers(files: &[SourceFile]) -> RegisteredReceivers {
    let mut out = RegisteredReceivers::default();
    for file in files {
        for method in &file.methods {
            let mut filters: HashMap<String, Vec<String>> = HashMap::new();
            let mut receiver_classes: HashMap<String, String> = HashMap::new();
            scan_registrations(&method.body, &mut filters, &mut receiver_classes, &mut out);
        }
    }
    out
}

fn scan_registrations(
    stmts: &[Stmt],
    filters: &mut HashMap<String, Vec<String>>,
    receiver_classes: &mut HashMap<String, String>,
    out: &mut RegisteredReceivers,
) {
    for stmt in stmts {
        match stmt {
            Stmt::Assign { target, value } => match &value.kind {
                ExprKind::New { class, args, .. } if class == INTENT_FILTER_CLASS => {
                    let actions = args
                        .iter()
                        .filter_map(|a| const_str(a, &HashMap::new()))
                        .map(|(s, _)| s)
                        .collect();
                    filters.insert(target.clone(), actions);
                }
                ExprKind::New { class, .. } => {
                    receiver_classes.insert(target.clone(), class.clone());
                }
                _ => {
                    filters.remove(target);
                    receiver_classes.remove(target);
                }
            },
            Stmt::Expr(e) => scan_registration_expr(e, filters, receiver_classes, out),
            Stmt::If {
                then_body,
                else_body,
                ..
            } => {
                scan_registrations(then_body, filters, receiver_classes, out);
                scan_registrations(else_body, filters, receiver_classes, out);
            }
            Stmt::Loop { body } => scan_registrations(body, filters, receiver_classes, out),
            Stmt::Try { body, catches } => {
                scan_registrations(body, filters, receiver_classes, out);
                for c in catches {
                    scan_registrations(&c.body, filters, receiver_classes, out);
                }
            }
            _ => {}
        }
    }
}

fn scan_registration_expr(
    expr: &Expr,
    filters: &mut HashMap<String, Vec<String>>,
    receiver_classes: &mut HashMap<String, String>,
    out: &mut RegisteredReceivers,
) {
    let ExprKind::Call {
        target,
        receiver,
        args,
    } = &expr.kind
    else {
        return;
    };
    if target.member == "addAction" {
        if let (Some(name), Some((action, _))) = (
            receiver.as_deref().and_then(Expr::as_local),
            args.first().and_then(|a| const_str(a, &HashMap::new())),
        ) {
            filters.entry(name.to_string()).or_default().push(action);
        }
        return;
    }
    if target.member != "registerReceiver" {
        return;
    }
    if !args.iter().any(is_not_exported_flag) {
        return;
    }
    let Some(receiver_class) = args.first().and_then(|a| match &a.kind {
        ExprKind::Local(name) => receiver_classes.get(name).cloned(),
        ExprKind::New { class, .. } => Some(class.clone()),
        _ => None,
    }) else {
        return;
    };
    let actions: Vec<String> = args
        .iter()
        .skip(1)
        .flat_map(|a| match &a.kind {
            ExprKind::Local(name) => filters.get(name).cloned().unwrap_or_default(),
            ExprKind::New { class, args, .. } if class == INTENT_FILTER_CLASS => args
                .iter()
                .filter_map(|x| const_str(x, &HashMap::new()))
                .map(|(s, _)| s)
                .collect(),
            _ => Vec::new(),
        })
        .collect();
    for action in actions {
        out.entries.push((action, receiver_class.clone()));
    }
}

fn const_str(expr: &Expr, consts: &HashMap<String, String>) -> Option<(String, Option<Span>)> {
    match &expr.kind {
        ExprKind::Literal(ConstValue::Str(s)) => Some((s.clone(), expr.span)),
        ExprKind::Local(name) => consts.get(name).map(|s| (s.clone(), expr.span)),
        _ => None,
    }
}

struct IntentWalker<'a> {
    manifest: &'a ManifestModel,
    registered: &'a RegisteredReceivers,
    intents: HashMap<String, IntentState>,
    /// Array variable to element local names, index-sensitive.
    arrays: HashMap<String, Vec<Option<String>>>,
    consts: HashMap<String, String>,
    out: Vec<ImplicitLaunch>,
}

/// Finds implicit intents launched through this method that match a
/// non-exported component of the corresponding kind.
pub fn find_implicit_launches(
    method: &Method,
    manifest: &ManifestModel,
    registered: &RegisteredReceivers,
) -> Vec<ImplicitLaunch> {
    let mut walker = IntentWalker {
        manifest,
        registered,
        intents: HashMap::new(),
        arrays: HashMap::new(),
        consts: HashMap::new(),
        out: Vec::new(),
    };
    walker.walk(&method.body);
    walker.out
}

impl IntentWalker<'_> {
    fn walk(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            match stmt {
                Stmt::Assign { target, value } => self.assign(target, value),
                Stmt::AssignIndex {
                    array,
                    index,
                    value,
                } => {
                    self.scan_expr(value);
                    let idx = match &index.kind {
                        ExprKind::Literal(ConstValue::Int(i)) if *i >= 0 => *i as usize,
                        _ => {
                            // Unknown index invalidates the whole array.
                            self.arrays.remove(array);
                            continue;
                        }
                    };
                    if let Some(slots) = self.arrays.get_mut(array) {
                        if idx >= slots.len() {
                            slots.resize(idx + 1, None);
                        }
                        slots[idx] = value.as_local().map(str::to_string);
                    }
                }
                Stmt::Expr(e) => self.scan_expr(e),
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => {
                    self.scan_expr(cond);
                    // Both arms contribute: actions accumulate and an
                    // explicit-making call in either arm suppresses.
                    self.walk(then_body);
                    self.walk(else_body);
                }
                Stmt::Loop { body } => self.walk(body),
                Stmt::Try { body, catches } => {
                    self.walk(body);
                    for c in catches {
                        self.walk(&c.body);
                    }
                }
                Stmt::Return(Some(e)) => self.scan_expr(e),
                Stmt::Return(None) => {}
                Stmt::Throw(e) => self.scan_expr(e),
            }
        }
    }

    fn assign(&mut self, target: &str, value: &Expr) {
        self.scan_expr(value);
        self.intents.remove(target);
        self.arrays.remove(target);
        self.consts.remove(target);

        match &value.kind {
            ExprKind::Literal(ConstValue::Str(s)) => {
                self.consts.insert(target.to_string(), s.clone());
            }
            ExprKind::Local(other) => {
                if let Some(state) = self.intents.get(other).cloned() {
                    self.intents.insert(target.to_string(), state);
                }
                if let Some(slots) = self.arrays.get(other).cloned() {
                    self.arrays.insert(target.to_string(), slots);
                }
            }
            ExprKind::ArrayLit(items) => {
                let slots = items
                    .iter()
                    .map(|e| e.as_local().map(str::to_string))
                    .collect();
                self.arrays.insert(target.to_string(), slots);
            }
            _ => {
                if let Some(state) = self.state_of(value) {
                    self.intents.insert(target.to_string(), state);
                }
            }
        }
    }

    /// Explicitness state of an intent-typed expression, following setter
    /// chains like `new Intent(a).setPackage(p)` through their receivers.
    fn state_of(&self, expr: &Expr) -> Option<IntentState> {
        match &expr.kind {
            ExprKind::Local(name) => self.intents.get(name).cloned(),
            ExprKind::New {
                class,
                signature,
                args,
            } if class == INTENT_CLASS => {
                if signature.iter().any(|t| t == "Class") {
                    return Some(IntentState::explicit());
                }
                if signature.first().map(String::as_str) == Some("Intent") {
                    // Copy constructor: inherit the source state, or assume
                    // explicit when the source is untracked.
                    return Some(
                        args.first()
                            .and_then(|a| self.state_of(a))
                            .unwrap_or_else(IntentState::explicit),
                    );
                }
                let mut state = IntentState::default();
                for arg in args {
                    if let Some((action, span)) = const_str(arg, &self.consts) {
                        state.actions.push((action, span.or(expr.span)));
                        break;
                    }
                }
                Some(state)
            }
            ExprKind::Call {
                target,
                receiver: Some(receiver),
                args,
            } => {
                let mut state = self.state_of(receiver)?;
                if EXPLICIT_SETTERS.contains(&target.member.as_str()) {
                    state.explicit = true;
                } else if target.member == "setAction" {
                    if let Some((action, span)) =
                        args.first().and_then(|a| const_str(a, &self.consts))
                    {
                        state.actions.push((action, span.or(expr.span)));
                    } else {
                        // Unresolvable action: nothing provable to match.
                        state.explicit = true;
                    }
                } else if !BENIGN_CALLS.contains(&target.member.as_str()) {
                    state.explicit = true;
                }
                Some(state)
            }
            _ => None,
        }
    }

    fn scan_expr(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Call {
                target,
                receiver,
                args,
            } => {
                if let Some(r) = receiver {
                    self.scan_expr(r);
                }
                for a in args {
                    self.scan_expr(a);
                }

                let member = target.member.as_str();
                if let Some(name) = receiver.as_deref().and_then(Expr::as_local) {
                    if let Some(state) = self.intents.get_mut(name) {
                        if EXPLICIT_SETTERS.contains(&member) {
                            state.explicit = true;
                        } else if member == "setAction" {
                            match args.first().and_then(|a| const_str(a, &self.consts)) {
                                Some((action, span)) => {
                                    state.actions.push((action, span.or(expr.span)))
                                }
                                None => state.explicit = true,
                            }
                        } else if !BENIGN_CALLS.contains(&member) {
                            state.explicit = true;
                        }
                        return;
                    }
                }

                if ACTIVITY_SINKS.contains(&member) {
                    for arg in args {
                        self.check_sink(arg, IntentUseKind::Activity);
                    }
                } else if BROADCAST_SINKS.contains(&member) {
                    for arg in args {
                        self.check_sink(arg, IntentUseKind::Broadcast);
                    }
                } else if member == "startActivities" {
                    self.check_array_sink(args);
                } else if member != "registerReceiver" {
                    // An intent handed to unknown code may be completed
                    // there; stop tracking it.
                    for arg in args {
                        if let Some(name) = arg.as_local() {
                            if let Some(state) = self.intents.get_mut(name) {
                                state.explicit = true;
                            }
                        }
                    }
                }
            }
            ExprKind::New { args, .. } => {
                for a in args {
                    self.scan_expr(a);
                }
            }
            ExprKind::Unary { operand, .. } => self.scan_expr(operand),
            ExprKind::Binary { lhs, rhs, .. } => {
                self.scan_expr(lhs);
                self.scan_expr(rhs);
            }
            ExprKind::Conditional {
                cond,
                then_expr,
                else_expr,
            } => {
                self.scan_expr(cond);
                self.scan_expr(then_expr);
                self.scan_expr(else_expr);
            }
            ExprKind::ArrayLit(items) => {
                for item in items {
                    self.scan_expr(item);
                }
            }
            ExprKind::Index { array, index } => {
                self.scan_expr(array);
                self.scan_expr(index);
            }
            ExprKind::Literal(_) | ExprKind::Local(_) | ExprKind::FieldRef(_) | ExprKind::Unknown => {}
        }
    }

    fn check_sink(&mut self, arg: &Expr, kind: IntentUseKind) {
        let Some(state) = self.state_of(arg) else {
            return;
        };
        let mut seen = HashSet::new();
        self.report_state(&state, kind, &mut seen);
    }

    /// `startActivities(arr)` checks each element and flags each matching
    /// component once, even when several elements share it.
    fn check_array_sink(&mut self, args: &[Expr]) {
        let mut seen = HashSet::new();
        for arg in args {
            let Some(name) = arg.as_local() else { continue };
            let Some(slots) = self.arrays.get(name).cloned() else {
                continue;
            };
            for slot in slots.into_iter().flatten() {
                if let Some(state) = self.intents.get(&slot).cloned() {
                    self.report_state(&state, IntentUseKind::Activity, &mut seen);
                }
            }
        }
    }

    fn report_state(
        &mut self,
        state: &IntentState,
        kind: IntentUseKind,
        seen: &mut HashSet<(String, String)>,
    ) {
        if state.explicit {
            return;
        }
        for (action, span) in &state.actions {
            for component in self.manifest.non_exported_components_for_action(action, kind) {
                if seen.insert((action.clone(), component.name.clone())) {
                    self.out.push(ImplicitLaunch {
                        action: action.clone(),
                        span: *span,
                        component: component.name.clone(),
                        kind,
                        package_fix_only: false,
                    });
                }
            }
            if kind == IntentUseKind::Broadcast {
                for class in self.registered.receivers_for(action) {
                    if seen.insert((action.clone(), class.to_string())) {
                        self.out.push(ImplicitLaunch {
                            action: action.clone(),
                            span: *span,
                            component: class.to_string(),
                            kind,
                            package_fix_only: true,
                        });
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build::*;
    use crate::model::manifest::{ComponentKind, ManifestComponent};

    fn manifest_with(components: Vec<ManifestComponent>) -> ManifestModel {
        ManifestModel {
            package: "test.pkg".into(),
            min_sdk: 21,
            target_sdk: 34,
            components,
            ..Default::default()
        }
    }

    fn hidden_activity(action: &str) -> ManifestComponent {
        ManifestComponent {
            kind: ComponentKind::Activity,
            name: "test.pkg.TestActivity".into(),
            exported: false,
            intent_actions: vec![action.to_string()],
            foreground_service_type: None,
        }
    }

    fn launch(body: Vec<Stmt>) -> Method {
        method("test.pkg.Caller", "go", vec![], body)
    }

    const ACTION: &str = "some.fake.action.LAUNCH";
    const NONE: RegisteredReceivers = RegisteredReceivers {
        entries: Vec::new(),
    };

    fn new_intent(action: &str) -> Expr {
        ctor(INTENT_CLASS, &["String"], vec![lit_s(action)])
    }

    #[test]
    fn implicit_action_matching_hidden_activity_is_flagged() {
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].action, ACTION);
        assert_eq!(hits[0].component, "test.pkg.TestActivity");
        assert_eq!(hits[0].kind, IntentUseKind::Activity);
    }

    #[test]
    fn class_constructor_is_explicit() {
        let m = launch(vec![
            assign(
                "intent",
                ctor(INTENT_CLASS, &["Context", "Class"], vec![unknown(), unknown()]),
            ),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn set_package_suppresses() {
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            expr_stmt(call_on(
                local("intent"),
                INTENT_CLASS,
                "setPackage",
                vec![lit_s("test.pkg")],
            )),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn chained_set_package_suppresses() {
        let chained = call_on(
            new_intent(ACTION),
            INTENT_CLASS,
            "setPackage",
            vec![lit_s("test.pkg")],
        );
        let m = launch(vec![expr_stmt(call(
            "android.content.Context",
            "startActivity",
            vec![chained],
        ))]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn activity_action_does_not_match_for_broadcast_use() {
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            expr_stmt(call("android.content.Context", "sendBroadcast", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn aliasing_copies_state_by_value() {
        // Making the alias explicit must not suppress the original.
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            assign("alias", local("intent")),
            expr_stmt(call_on(
                local("alias"),
                INTENT_CLASS,
                "setPackage",
                vec![lit_s("test.pkg")],
            )),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn escape_to_unknown_call_suppresses() {
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            expr_stmt(call("test.pkg.Helper", "prepare", vec![local("intent")])),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn reassignment_kills_prior_facts() {
        let m = launch(vec![
            assign("intent", new_intent(ACTION)),
            assign(
                "intent",
                ctor(INTENT_CLASS, &["Context", "Class"], vec![unknown(), unknown()]),
            ),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn actions_from_both_branches_are_collected() {
        let other = "some.fake.action.OTHER";
        let m = launch(vec![
            assign("intent", ctor(INTENT_CLASS, &[], vec![])),
            if_stmt(
                unknown(),
                vec![expr_stmt(call_on(
                    local("intent"),
                    INTENT_CLASS,
                    "setAction",
                    vec![lit_s(ACTION)],
                ))],
                vec![expr_stmt(call_on(
                    local("intent"),
                    INTENT_CLASS,
                    "setAction",
                    vec![lit_s(other)],
                ))],
            ),
            expr_stmt(call("android.content.Context", "startActivity", vec![local("intent")])),
        ]);
        let manifest =
            manifest_with(vec![hidden_activity(ACTION), {
                let mut c = hidden_activity(other);
                c.name = "test.pkg.OtherActivity".into();
                c
            }]);
        let hits = find_implicit_launches(&m, &manifest, &NONE);
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn start_activities_flags_each_component_once() {
        let m = launch(vec![
            assign("a", new_intent(ACTION)),
            assign("b", new_intent(ACTION)),
            assign("arr", array(vec![local("a"), local("b")])),
            expr_stmt(call("android.content.Context", "startActivities", vec![local("arr")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn array_element_overwrite_is_index_sensitive() {
        let m = launch(vec![
            assign("a", new_intent(ACTION)),
            assign(
                "b",
                ctor(INTENT_CLASS, &["Context", "Class"], vec![unknown(), unknown()]),
            ),
            assign("arr", array(vec![local("a")])),
            assign_index("arr", lit_i(0), local("b")),
            expr_stmt(call("android.content.Context", "startActivities", vec![local("arr")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![hidden_activity(ACTION)]), &NONE);
        assert!(hits.is_empty());
    }

    #[test]
    fn registered_not_exported_receiver_matches_broadcast() {
        let notify = "some.fake.action.NOTIFY";
        let reg = method(
            "test.pkg.Host",
            "onCreate",
            vec![],
            vec![
                assign("recv", ctor("test.pkg.MyReceiver", &[], vec![])),
                assign(
                    "filter",
                    ctor(INTENT_FILTER_CLASS, &["String"], vec![lit_s(notify)]),
                ),
                expr_stmt(call(
                    "android.content.Context",
                    "registerReceiver",
                    vec![
                        local("recv"),
                        local("filter"),
                        field("android.content.Context", "RECEIVER_NOT_EXPORTED"),
                    ],
                )),
            ],
        );
        let file = SourceFile {
            path: "Host.java".into(),
            methods: vec![reg],
            fields: Vec::new(),
        };
        let registered = collect_registered_receivers(std::slice::from_ref(&file));
        assert!(!registered.is_empty());

        let m = launch(vec![
            assign("intent", new_intent(notify)),
            expr_stmt(call("android.content.Context", "sendBroadcast", vec![local("intent")])),
        ]);
        let hits = find_implicit_launches(&m, &manifest_with(vec![]), &registered);
        assert_eq!(hits.len(), 1);
        assert!(hits[0].package_fix_only);
        assert_eq!(hits[0].component, "test.pkg.MyReceiver");
    }
}

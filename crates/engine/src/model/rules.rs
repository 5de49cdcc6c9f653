//! Declarative per-API-symbol requirements.
//!
//! Requirements are discovered from annotations on source symbols, from the
//! same annotation shape exposed for precompiled dependencies, and from a
//! builtin table for framework symbols that carry no annotations in source.
//! All three feed one lookup surface, the [`RuleTable`].

use crate::model::semantic::{Annotation, ProjectModel, SymbolRef};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// AND/OR tree over permission names. Immutable; evaluation is
/// order-independent and side-effect free.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PermissionExpr {
    Leaf(String),
    AnyOf(Vec<PermissionExpr>),
    AllOf(Vec<PermissionExpr>),
}

impl PermissionExpr {
    pub fn leaf(name: impl Into<String>) -> Self {
        Self::Leaf(name.into())
    }

    pub fn any_of(names: &[&str]) -> Self {
        Self::AnyOf(names.iter().map(|n| Self::leaf(*n)).collect())
    }

    pub fn all_of(names: &[&str]) -> Self {
        Self::AllOf(names.iter().map(|n| Self::leaf(*n)).collect())
    }

    /// All leaf permission names in declaration order.
    pub fn leaves(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf(name) => out.push(name),
            Self::AnyOf(children) | Self::AllOf(children) => {
                for c in children {
                    c.collect_leaves(out);
                }
            }
        }
    }

    pub fn is_satisfied(&self, granted: &impl Fn(&str) -> bool) -> bool {
        match self {
            Self::Leaf(name) => granted(name),
            Self::AnyOf(children) => children.iter().any(|c| c.is_satisfied(granted)),
            Self::AllOf(children) => children.iter().all(|c| c.is_satisfied(granted)),
        }
    }

    /// The leaves to report when unsatisfied, in declaration order. An
    /// unsatisfied `AnyOf` reports every alternative (joined with "or" in
    /// the message); an `AllOf` reports only the unmet conjuncts.
    pub fn missing(&self, granted: &impl Fn(&str) -> bool) -> Vec<String> {
        if self.is_satisfied(granted) {
            return Vec::new();
        }
        match self {
            Self::Leaf(name) => vec![name.clone()],
            Self::AnyOf(_) => self.leaves().into_iter().map(str::to_string).collect(),
            Self::AllOf(children) => children
                .iter()
                .filter(|c| !c.is_satisfied(granted))
                .flat_map(|c| c.missing(granted))
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRequirement {
    pub expr: PermissionExpr,
    /// The requirement only applies under an external condition the engine
    /// cannot evaluate; such call sites are never reported.
    #[serde(default)]
    pub conditional: bool,
}

/// Range/size contract on a parameter. Float bound inclusivity comes from
/// the annotation itself, never from engine defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RangeConstraint {
    IntRange {
        from: Option<i64>,
        to: Option<i64>,
    },
    FloatRange {
        from: Option<f64>,
        to: Option<f64>,
        from_inclusive: bool,
        to_inclusive: bool,
    },
    Size {
        exact: Option<i64>,
        min: Option<i64>,
        max: Option<i64>,
        multiple: Option<i64>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamConstraint {
    pub index: usize,
    pub constraint: RangeConstraint,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SymbolRequirement {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub permissions: Option<PermissionRequirement>,
    /// Minimum API level required to call the symbol at all.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_api: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub param_constraints: Vec<ParamConstraint>,
}

impl SymbolRequirement {
    pub fn with_permissions(expr: PermissionExpr) -> Self {
        Self {
            permissions: Some(PermissionRequirement {
                expr,
                conditional: false,
            }),
            ..Default::default()
        }
    }

    pub fn with_min_api(api: u32) -> Self {
        Self {
            min_api: Some(api),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.permissions.is_none() && self.min_api.is_none() && self.param_constraints.is_empty()
    }
}

fn simple_name(annotation: &str) -> &str {
    annotation.rsplit('.').next().unwrap_or(annotation)
}

/// Builds the permission expression from a `@RequiresPermission`-shaped
/// annotation: a plain `value` is a single leaf, `anyOf`/`allOf` lists
/// build the corresponding node.
fn permission_requirement(ann: &Annotation) -> Option<PermissionRequirement> {
    let conditional = ann.bool_arg("conditional").unwrap_or(false);
    let expr = if let Some(value) = ann.str_arg("value") {
        PermissionExpr::leaf(value)
    } else {
        let any = ann.str_list_arg("anyOf");
        let all = ann.str_list_arg("allOf");
        if !any.is_empty() {
            PermissionExpr::AnyOf(any.into_iter().map(PermissionExpr::Leaf).collect())
        } else if !all.is_empty() {
            PermissionExpr::AllOf(all.into_iter().map(PermissionExpr::Leaf).collect())
        } else {
            return None;
        }
    };
    Some(PermissionRequirement { expr, conditional })
}

fn range_constraint(ann: &Annotation) -> Option<RangeConstraint> {
    match simple_name(&ann.name) {
        "IntRange" => Some(RangeConstraint::IntRange {
            from: ann.int_arg("from"),
            to: ann.int_arg("to"),
        }),
        "FloatRange" => Some(RangeConstraint::FloatRange {
            from: ann.float_arg("from"),
            to: ann.float_arg("to"),
            from_inclusive: ann.bool_arg("fromInclusive").unwrap_or(true),
            to_inclusive: ann.bool_arg("toInclusive").unwrap_or(true),
        }),
        "Size" => {
            let exact = ann.int_arg("value");
            let min = ann.int_arg("min");
            let max = ann.int_arg("max");
            let multiple = ann.int_arg("multiple");
            if exact.is_none() && min.is_none() && max.is_none() && multiple.is_none() {
                None
            } else {
                Some(RangeConstraint::Size {
                    exact,
                    min,
                    max,
                    multiple,
                })
            }
        }
        _ => None,
    }
}

fn requirement_from_annotations(annotations: &[Annotation]) -> SymbolRequirement {
    let mut req = SymbolRequirement::default();
    for ann in annotations {
        match simple_name(&ann.name) {
            "RequiresPermission" => req.permissions = permission_requirement(ann),
            "RequiresApi" => {
                req.min_api = ann
                    .int_arg("value")
                    .or_else(|| ann.int_arg("api"))
                    .map(|v| v as u32)
            }
            _ => {}
        }
    }
    req
}

/// One backing store of symbol requirements. Implemented by the source
/// annotation reader, the binary metadata reader, and the builtin table.
pub trait RequirementSource: Send + Sync {
    fn requirement_for(&self, symbol: &SymbolRef) -> Option<&SymbolRequirement>;
}

/// Requirements read from annotations on symbols defined in the analyzed
/// sources themselves.
#[derive(Debug, Default)]
pub struct SourceAnnotations {
    requirements: HashMap<SymbolRef, SymbolRequirement>,
}

impl SourceAnnotations {
    pub fn from_project(project: &ProjectModel) -> Self {
        let mut requirements = HashMap::new();
        for module in &project.modules {
            for file in &module.files {
                for m in &file.methods {
                    let mut req = requirement_from_annotations(&m.annotations);
                    for (index, param) in m.params.iter().enumerate() {
                        for ann in &param.annotations {
                            if let Some(constraint) = range_constraint(ann) {
                                req.param_constraints.push(ParamConstraint { index, constraint });
                            }
                        }
                    }
                    if !req.is_empty() {
                        requirements.insert(m.symbol(), req);
                    }
                }
                for f in &file.fields {
                    let req = requirement_from_annotations(&f.annotations);
                    if !req.is_empty() {
                        requirements.insert(f.symbol.clone(), req);
                    }
                }
            }
        }
        Self { requirements }
    }
}

impl RequirementSource for SourceAnnotations {
    fn requirement_for(&self, symbol: &SymbolRef) -> Option<&SymbolRequirement> {
        self.requirements.get(symbol)
    }
}

/// Requirements read from annotation metadata embedded in precompiled
/// dependencies. The extraction itself happens outside the engine; what
/// arrives here has the same shape as source annotations.
#[derive(Debug, Default)]
pub struct BinaryAnnotations {
    requirements: HashMap<SymbolRef, SymbolRequirement>,
}

impl BinaryAnnotations {
    pub fn from_project(project: &ProjectModel) -> Self {
        let mut requirements = HashMap::new();
        for module in &project.modules {
            for entry in &module.binary_annotations {
                let req = requirement_from_annotations(&entry.annotations);
                if !req.is_empty() {
                    requirements.insert(entry.symbol.clone(), req);
                }
            }
        }
        Self { requirements }
    }
}

impl RequirementSource for BinaryAnnotations {
    fn requirement_for(&self, symbol: &SymbolRef) -> Option<&SymbolRequirement> {
        self.requirements.get(symbol)
    }
}

/// Framework symbols whose requirements never appear as source annotations.
pub struct BuiltinTable;

static BUILTIN_REQUIREMENTS: Lazy<HashMap<SymbolRef, SymbolRequirement>> = Lazy::new(|| {
    let mut table = HashMap::new();
    let location_any = PermissionExpr::any_of(&[
        "android.permission.ACCESS_FINE_LOCATION",
        "android.permission.ACCESS_COARSE_LOCATION",
    ]);
    table.insert(
        SymbolRef::new("android.location.LocationManager", "getLastKnownLocation"),
        SymbolRequirement::with_permissions(location_any.clone()),
    );
    table.insert(
        SymbolRef::new("android.location.LocationManager", "requestLocationUpdates"),
        SymbolRequirement::with_permissions(location_any),
    );
    table.insert(
        SymbolRef::new("android.content.Context", "sendStickyBroadcast"),
        SymbolRequirement::with_permissions(PermissionExpr::leaf(
            "android.permission.BROADCAST_STICKY",
        )),
    );
    table.insert(
        SymbolRef::new("android.bluetooth.BluetoothAdapter", "startDiscovery"),
        SymbolRequirement::with_permissions(PermissionExpr::leaf(
            "android.permission.BLUETOOTH_SCAN",
        )),
    );
    table.insert(
        SymbolRef::new("android.app.NotificationChannel", "<init>"),
        SymbolRequirement::with_min_api(26),
    );
    table.insert(
        SymbolRef::new("android.app.NotificationManager", "createNotificationChannel"),
        SymbolRequirement::with_min_api(26),
    );
    table
});

/// Framework permissions with dangerous (runtime-revocable) protection.
/// Manifest `<permission>` declarations take precedence for app-defined
/// permissions.
pub static DANGEROUS_PERMISSIONS: &[&str] = &[
    "android.permission.ACCESS_COARSE_LOCATION",
    "android.permission.ACCESS_FINE_LOCATION",
    "android.permission.BLUETOOTH_SCAN",
    "android.permission.CALL_PHONE",
    "android.permission.CAMERA",
    "android.permission.READ_CONTACTS",
    "android.permission.READ_EXTERNAL_STORAGE",
    "android.permission.RECORD_AUDIO",
    "android.permission.WRITE_CONTACTS",
    "android.permission.WRITE_EXTERNAL_STORAGE",
];

impl RequirementSource for BuiltinTable {
    fn requirement_for(&self, symbol: &SymbolRef) -> Option<&SymbolRequirement> {
        BUILTIN_REQUIREMENTS.get(symbol)
    }
}

/// Ordered lookup over all requirement sources: source annotations shadow
/// binary metadata, which shadows the builtin table.
pub struct RuleTable {
    sources: Vec<Box<dyn RequirementSource>>,
}

impl RuleTable {
    pub fn for_project(project: &ProjectModel) -> Self {
        Self {
            sources: vec![
                Box::new(SourceAnnotations::from_project(project)),
                Box::new(BinaryAnnotations::from_project(project)),
                Box::new(BuiltinTable),
            ],
        }
    }

    pub fn lookup(&self, symbol: &SymbolRef) -> Option<&SymbolRequirement> {
        self.sources
            .iter()
            .find_map(|s| s.requirement_for(symbol))
    }
}

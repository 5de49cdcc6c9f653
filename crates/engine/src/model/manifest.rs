//! Immutable snapshot of an AndroidManifest.xml.
//!
//! Built once per analyzed module and shared read-only across concurrent
//! file analyses. Missing entries degrade to defaults instead of erroring:
//! no `<uses-sdk>` means min/target of 1, and a component without an
//! explicit `android:exported="true"` is treated as not exported.

use crate::core::EngineError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    Activity,
    ActivityAlias,
    Receiver,
    Service,
    Provider,
}

impl ComponentKind {
    fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "activity" => Some(Self::Activity),
            "activity-alias" => Some(Self::ActivityAlias),
            "receiver" => Some(Self::Receiver),
            "service" => Some(Self::Service),
            "provider" => Some(Self::Provider),
            _ => None,
        }
    }
}

/// How an intent reaches a component. Services and providers are excluded
/// from implicit-intent matching entirely: implicit service intents throw
/// since Lollipop, and providers are not reached through intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentUseKind {
    Activity,
    Broadcast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtectionLevel {
    Normal,
    Dangerous,
    Signature,
}

impl ProtectionLevel {
    fn parse(value: &str) -> Self {
        // protectionLevel can carry flags like "signature|privileged"; the
        // base level is what matters here.
        let base = value.split('|').next().unwrap_or(value);
        match base {
            "dangerous" => Self::Dangerous,
            "signature" | "signatureOrSystem" => Self::Signature,
            _ => Self::Normal,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestComponent {
    pub kind: ComponentKind,
    /// Fully qualified name, resolved against the manifest package.
    pub name: String,
    pub exported: bool,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub intent_actions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub foreground_service_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestModel {
    pub package: String,
    pub min_sdk: u32,
    pub target_sdk: u32,
    #[serde(default)]
    pub uses_permissions: Vec<String>,
    /// `<permission>` declarations: name to protection level.
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub permission_declarations: Vec<(String, ProtectionLevel)>,
    #[serde(default)]
    pub components: Vec<ManifestComponent>,
}

impl Default for ManifestModel {
    fn default() -> Self {
        Self {
            package: String::new(),
            min_sdk: 1,
            target_sdk: 1,
            uses_permissions: Vec::new(),
            permission_declarations: Vec::new(),
            components: Vec::new(),
        }
    }
}

fn attr(e: &BytesStart<'_>, name: &str) -> Option<String> {
    for a in e.attributes().flatten() {
        let key = String::from_utf8_lossy(a.key.as_ref()).to_string();
        if key == name || key.strip_prefix("android:") == Some(name) {
            return a.unescape_value().ok().map(|v| v.to_string());
        }
    }
    None
}

impl ManifestModel {
    pub fn parse(xml: &str) -> Result<Self, EngineError> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut model = ManifestModel::default();
        let mut buf = Vec::new();
        // Components nest intent-filters which nest actions, so we keep the
        // component being built plus a flag for an open intent-filter.
        let mut current: Option<ManifestComponent> = None;
        let mut in_filter = false;

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| EngineError::ManifestParse(e.to_string()))?;
            match event {
                Event::Start(ref e) | Event::Empty(ref e) => {
                    let self_closing = matches!(event, Event::Empty(_));
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    match tag.as_str() {
                        "manifest" => {
                            if let Some(pkg) = attr(e, "package") {
                                model.package = pkg;
                            }
                        }
                        "uses-sdk" => {
                            if let Some(v) = attr(e, "minSdkVersion") {
                                model.min_sdk = v.parse().unwrap_or(1);
                            }
                            if let Some(v) = attr(e, "targetSdkVersion") {
                                model.target_sdk = v.parse().unwrap_or(model.min_sdk);
                            }
                        }
                        "uses-permission" => {
                            if let Some(name) = attr(e, "name") {
                                model.uses_permissions.push(name);
                            }
                        }
                        "permission" => {
                            if let Some(name) = attr(e, "name") {
                                let level = attr(e, "protectionLevel")
                                    .map(|v| ProtectionLevel::parse(&v))
                                    .unwrap_or(ProtectionLevel::Normal);
                                model.permission_declarations.push((name, level));
                            }
                        }
                        "intent-filter" => in_filter = !self_closing,
                        "action" => {
                            if in_filter {
                                if let (Some(component), Some(name)) =
                                    (current.as_mut(), attr(e, "name"))
                                {
                                    component.intent_actions.push(name);
                                }
                            }
                        }
                        other => {
                            if let Some(kind) = ComponentKind::from_tag(other) {
                                let name = attr(e, "name").unwrap_or_default();
                                let component = ManifestComponent {
                                    kind,
                                    name: resolve_component_name(&model.package, &name),
                                    exported: attr(e, "exported").as_deref() == Some("true"),
                                    intent_actions: Vec::new(),
                                    foreground_service_type: attr(e, "foregroundServiceType"),
                                };
                                if self_closing {
                                    model.components.push(component);
                                } else {
                                    current = Some(component);
                                }
                            }
                        }
                    }
                }
                Event::End(ref e) => {
                    let tag = String::from_utf8_lossy(e.name().as_ref()).to_string();
                    if tag == "intent-filter" {
                        in_filter = false;
                    } else if ComponentKind::from_tag(&tag).is_some() {
                        if let Some(component) = current.take() {
                            model.components.push(component);
                        }
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if model.target_sdk < model.min_sdk {
            model.target_sdk = model.min_sdk;
        }
        Ok(model)
    }

    pub fn declared_permissions(&self) -> &[String] {
        &self.uses_permissions
    }

    pub fn is_declared(&self, permission: &str) -> bool {
        self.uses_permissions.iter().any(|p| p == permission)
    }

    /// Protection level for a permission this manifest itself defines.
    /// Framework permissions are resolved by the caller's builtin table.
    pub fn protection_level(&self, name: &str) -> Option<ProtectionLevel> {
        self.permission_declarations
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, level)| *level)
    }

    pub fn target_sdk_version(&self) -> u32 {
        self.target_sdk
    }

    pub fn min_sdk_version(&self) -> u32 {
        self.min_sdk
    }

    /// Non-exported components whose intent filter declares `action`, for
    /// the given use kind. Sorted by component name for deterministic
    /// reports.
    pub fn non_exported_components_for_action(
        &self,
        action: &str,
        kind: IntentUseKind,
    ) -> Vec<&ManifestComponent> {
        let mut matches: Vec<&ManifestComponent> = self
            .components
            .iter()
            .filter(|c| !c.exported)
            .filter(|c| match kind {
                IntentUseKind::Activity => {
                    matches!(c.kind, ComponentKind::Activity | ComponentKind::ActivityAlias)
                }
                IntentUseKind::Broadcast => c.kind == ComponentKind::Receiver,
            })
            .filter(|c| c.intent_actions.iter().any(|a| a == action))
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    pub fn services(&self) -> impl Iterator<Item = &ManifestComponent> {
        self.components
            .iter()
            .filter(|c| c.kind == ComponentKind::Service)
    }
}

fn resolve_component_name(package: &str, name: &str) -> String {
    if name.is_empty() || package.is_empty() {
        return name.to_string();
    }
    if let Some(rest) = name.strip_prefix('.') {
        format!("{package}.{rest}")
    } else if name.contains('.') {
        name.to_string()
    } else {
        format!("{package}.{name}")
    }
}

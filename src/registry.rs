//! Catalog of effect types available to a chain.
//!
//! The registry is filled once at startup (`register_builtins`, optionally
//! followed by application-specific `register` calls), then `finalize`
//! builds the lookup indices and freezes it. Lookups only see finalized
//! entries.
//!
//! Type ids are assigned sequentially in registration order, starting at 1.
//! Reordering registrations changes the ids of previously saved chains;
//! chain documents therefore also persist the type name (see `document`).

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::instance::EffectInstance;

mod builtins;

/// Parameter slots per effect, both in an instance and in a compiled record.
pub const MAX_PARAMS: usize = 16;

/// How the editor should present a parameter. Color hints are set on every
/// channel of a color; consecutive channels sharing the hint form one picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamHint {
    Slider,
    Drag,
    Checkbox,
    Color3,
    Color4,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub default: f32,
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub hint: ParamHint,
}

impl ParameterSpec {
    pub fn slider(name: impl Into<String>, default: f32, min: f32, max: f32) -> Self {
        Self {
            name: name.into(),
            default,
            min,
            max,
            step: 0.0,
            hint: ParamHint::Slider,
        }
    }

    pub fn drag(name: impl Into<String>, default: f32, min: f32, max: f32, step: f32) -> Self {
        Self {
            name: name.into(),
            default,
            min,
            max,
            step,
            hint: ParamHint::Drag,
        }
    }

    pub fn checkbox(name: impl Into<String>, default: bool) -> Self {
        Self {
            name: name.into(),
            default: if default { 1.0 } else { 0.0 },
            min: 0.0,
            max: 1.0,
            step: 1.0,
            hint: ParamHint::Checkbox,
        }
    }

    fn color_channel(name: String, default: f32, hint: ParamHint) -> Self {
        Self {
            name,
            default,
            min: 0.0,
            max: 1.0,
            step: 0.0,
            hint,
        }
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if self.min <= self.max {
            value.clamp(self.min, self.max)
        } else {
            value
        }
    }
}

/// A registered, immutable effect type.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectType {
    pub id: u32,
    pub name: String,
    pub category: String,
    pub default_label: String,
    pub aliases: Vec<String>,
    /// Lowercase, deduplicated: name, category, parameter names, aliases.
    pub keywords: Vec<String>,
    pub params: Vec<ParameterSpec>,
    /// Leading parameters forwarded to the GPU; `None` means all of them.
    pub gpu_params: Option<usize>,
}

impl EffectType {
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    pub fn gpu_param_count(&self) -> usize {
        self.gpu_params.unwrap_or(self.params.len()).min(MAX_PARAMS)
    }

    pub fn default_params(&self) -> [f32; MAX_PARAMS] {
        let mut out = [0.0; MAX_PARAMS];
        for (slot, spec) in out.iter_mut().zip(&self.params) {
            *slot = spec.default;
        }
        out
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }

    fn matches(&self, query_lower: &str) -> bool {
        query_lower.is_empty() || self.keywords.iter().any(|k| k.contains(query_lower))
    }
}

/// Registration-time description of an effect type.
#[derive(Debug, Clone)]
pub struct EffectTypeDef {
    name: String,
    category: String,
    label: Option<String>,
    aliases: Vec<String>,
    params: Vec<ParameterSpec>,
    gpu_params: Option<usize>,
}

impl EffectTypeDef {
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            label: None,
            aliases: Vec::new(),
            params: Vec::new(),
            gpu_params: None,
        }
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    /// Three channels named `"<name> R/G/B"`.
    pub fn color3(mut self, name: &str, default: [f32; 3]) -> Self {
        for (suffix, v) in ["R", "G", "B"].iter().zip(default) {
            self.params.push(ParameterSpec::color_channel(
                format!("{name} {suffix}"),
                v,
                ParamHint::Color3,
            ));
        }
        self
    }

    /// Four channels named `"<name> R/G/B/A"`.
    pub fn color4(mut self, name: &str, default: [f32; 4]) -> Self {
        for (suffix, v) in ["R", "G", "B", "A"].iter().zip(default) {
            self.params.push(ParameterSpec::color_channel(
                format!("{name} {suffix}"),
                v,
                ParamHint::Color4,
            ));
        }
        self
    }

    /// Only the first `count` parameters reach the shader; the rest are CPU-side.
    pub fn gpu_params(mut self, count: usize) -> Self {
        self.gpu_params = Some(count);
        self
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry is finalized; cannot register '{0}'")]
    Frozen(String),
    #[error("effect type '{0}' is already registered")]
    DuplicateName(String),
    #[error("effect type '{name}' declares {count} parameters (max {MAX_PARAMS})")]
    TooManyParams { name: String, count: usize },
    #[error("effect type '{name}' forwards {gpu} GPU parameters but only declares {count}")]
    GpuParamsOutOfRange { name: String, gpu: usize, count: usize },
}

#[derive(Debug, Default)]
pub struct EffectRegistry {
    types: Vec<EffectType>,
    by_id: HashMap<u32, usize>,
    by_name: HashMap<String, usize>,
    by_lower: HashMap<String, usize>,
    category_order: Vec<String>,
    frozen: bool,
}

impl EffectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in catalog, already finalized.
    pub fn with_builtins() -> Result<Self, RegistryError> {
        let mut registry = Self::new();
        registry.register_builtins()?;
        registry.finalize();
        Ok(registry)
    }

    pub fn register(&mut self, def: EffectTypeDef) -> Result<u32, RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen(def.name));
        }
        if def.params.len() > MAX_PARAMS {
            return Err(RegistryError::TooManyParams {
                count: def.params.len(),
                name: def.name,
            });
        }
        match def.gpu_params {
            Some(gpu) if gpu > def.params.len() => {
                return Err(RegistryError::GpuParamsOutOfRange {
                    gpu,
                    count: def.params.len(),
                    name: def.name,
                });
            }
            _ => {}
        }
        let lower = def.name.to_lowercase();
        if self.types.iter().any(|t| t.name.to_lowercase() == lower) {
            return Err(RegistryError::DuplicateName(def.name));
        }

        let id = self.types.len() as u32 + 1;
        let keywords = build_keywords(&def);
        let default_label = def.label.unwrap_or_else(|| def.name.clone());

        if !self.category_order.contains(&def.category) {
            self.category_order.push(def.category.clone());
        }

        debug!("[registry] registered '{}' as type {id}", def.name);
        self.types.push(EffectType {
            id,
            name: def.name,
            category: def.category,
            default_label,
            aliases: def.aliases,
            keywords,
            params: def.params,
            gpu_params: def.gpu_params,
        });
        Ok(id)
    }

    pub fn register_builtins(&mut self) -> Result<(), RegistryError> {
        builtins::register_all(self)
    }

    /// Build lookup indices and freeze the registry. Calling it again is a no-op.
    pub fn finalize(&mut self) {
        if self.frozen {
            return;
        }
        for (index, ty) in self.types.iter().enumerate() {
            self.by_id.insert(ty.id, index);
            self.by_name.insert(ty.name.clone(), index);
            self.by_lower.insert(ty.name.to_lowercase(), index);
        }
        // Names win over aliases; among aliases the earliest registration wins.
        for (index, ty) in self.types.iter().enumerate() {
            for alias in &ty.aliases {
                let key = alias.to_lowercase();
                if let Some(&other) = self.by_lower.get(&key) {
                    if other != index {
                        warn!(
                            "[registry] alias '{alias}' of '{}' shadowed by '{}'",
                            ty.name, self.types[other].name
                        );
                    }
                    continue;
                }
                self.by_lower.insert(key, index);
            }
        }
        self.frozen = true;
        debug!("[registry] finalized with {} effect types", self.types.len());
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// All types in registration order.
    pub fn types(&self) -> &[EffectType] {
        &self.types
    }

    pub fn find(&self, id: u32) -> Option<&EffectType> {
        self.by_id.get(&id).map(|&i| &self.types[i])
    }

    /// Exact name first, then case-insensitive name or alias.
    pub fn find_by_name(&self, name: &str) -> Option<&EffectType> {
        self.by_name
            .get(name)
            .or_else(|| self.by_lower.get(&name.to_lowercase()))
            .map(|&i| &self.types[i])
    }

    /// Types whose keywords contain `query` (case-insensitive, whitespace
    /// kept), optionally restricted to one exact category. An empty query
    /// matches everything.
    pub fn search(&self, query: &str, category: Option<&str>) -> Vec<&EffectType> {
        if !self.frozen {
            return Vec::new();
        }
        let query = query.to_lowercase();
        self.types
            .iter()
            .filter(|t| category.is_none_or(|c| t.category == c))
            .filter(|t| t.matches(&query))
            .collect()
    }

    /// Category names in first-registration order.
    pub fn categories(&self) -> &[String] {
        &self.category_order
    }

    pub fn make_node(&self, id: u32) -> Option<EffectInstance> {
        let ty = self.find(id)?;
        Some(EffectInstance {
            type_id: ty.id,
            enabled: true,
            label: ty.default_label.clone(),
            params: ty.default_params(),
        })
    }

    /// Overwrite an instance's parameters with its type's defaults.
    /// Returns false (leaving the instance alone) for unknown types.
    pub fn reset_to_defaults(&self, instance: &mut EffectInstance) -> bool {
        let Some(ty) = self.find(instance.type_id) else {
            return false;
        };
        instance.params = ty.default_params();
        true
    }
}

fn build_keywords(def: &EffectTypeDef) -> Vec<String> {
    let mut keywords: Vec<String> = Vec::new();
    let candidates = std::iter::once(def.name.as_str())
        .chain(std::iter::once(def.category.as_str()))
        .chain(def.params.iter().map(|p| p.name.as_str()))
        .chain(def.aliases.iter().map(String::as_str));
    for word in candidates {
        let word = word.trim().to_lowercase();
        if !word.is_empty() && !keywords.contains(&word) {
            keywords.push(word);
        }
    }
    keywords
}

// ============================================================================
// Library Templates
// ============================================================================
//
// Catalog entries are owned by the shared library and are read-only to this
// core: the provisioning engine copies from them, nothing ever writes back.
//
// ============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::{Result, RiskError, TemplateId};

/// Library scenario: a loss event pattern with baseline frequency/impact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioTemplate {
    pub id: TemplateId,
    pub name: String,
    /// Expected occurrences per year before any controls.
    pub annual_frequency: f64,
    /// Impact as a fraction of annual revenue, in [0, 1].
    pub impact_pct: f64,
    /// Tag/industry associations (explicit values, no back-pointers).
    pub tags: Vec<String>,
}

/// Library control: a mitigation pattern with indicative cost/effort.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlTemplate {
    pub id: TemplateId,
    pub name: String,
    pub cost: f64,
    /// Indicative implementation effort, library-defined scale.
    pub effort: f64,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum Template {
    Scenario(ScenarioTemplate),
    Control(ControlTemplate),
}

impl Template {
    pub fn id(&self) -> TemplateId {
        match self {
            Template::Scenario(t) => t.id,
            Template::Control(t) => t.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Template::Scenario(t) => &t.name,
            Template::Control(t) => &t.name,
        }
    }
}

/// Read-only template catalog keyed by template id.
///
/// The catalog pre-exists provisioning; lookups never mutate it.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<TemplateId, Template>,
}

impl TemplateCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry at build time. Replaces any previous entry with the
    /// same id (last write wins, as in catalog reloads).
    pub fn with_template(mut self, template: Template) -> Self {
        self.templates.insert(template.id(), template);
        self
    }

    pub fn get(&self, id: TemplateId) -> Result<&Template> {
        self.templates
            .get(&id)
            .ok_or_else(|| RiskError::not_found("template", id))
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

//! Custom Template Store
//!
//! User-defined templates layered on top of a builtin one: a custom template
//! pins `event_type` + `base_template` and carries its own sparse field map.
//! Generating from it merges caller overrides over the stored fields, then
//! runs the base generator with the result.
//!
//! Storage is an in-memory map behind an `RwLock`; nothing is persisted.

use crate::error::StoreError;
use crate::event::{Fields, GeneratedEvent};
use crate::generator::{Registry, merge_overrides};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::info;
use uuid::Uuid;

/// Stored custom template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomTemplate {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub base_template: String,
    pub fields: Fields,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Caller-supplied body for `create` and `update`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateDraft {
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub base_template: String,
    pub fields: Fields,
}

pub struct TemplateStore<'r> {
    registry: &'r Registry,
    templates: RwLock<HashMap<Uuid, CustomTemplate>>,
}

impl<'r> TemplateStore<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        Self {
            registry,
            templates: RwLock::new(HashMap::new()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Uuid, CustomTemplate>>, StoreError> {
        self.templates.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Uuid, CustomTemplate>>, StoreError> {
        self.templates.write().map_err(|_| StoreError::Poisoned)
    }

    /// Check the draft names a real type/template pair.
    fn validate(&self, draft: &TemplateDraft) -> Result<(), StoreError> {
        if draft.name.trim().is_empty() {
            return Err(StoreError::Invalid("name must not be empty".into()));
        }
        let generator = self.registry.get(&draft.event_type)?;
        if generator.find_template(&draft.base_template).is_none() {
            return Err(StoreError::Invalid(format!(
                "event type `{}` has no template `{}`",
                draft.event_type, draft.base_template
            )));
        }
        Ok(())
    }

    pub fn create(&self, draft: TemplateDraft) -> Result<CustomTemplate, StoreError> {
        self.validate(&draft)?;
        let now = Utc::now();
        let template = CustomTemplate {
            id: Uuid::new_v4(),
            name: draft.name,
            description: draft.description,
            event_type: draft.event_type,
            base_template: draft.base_template,
            fields: draft.fields,
            created_at: now,
            updated_at: now,
        };
        self.write()?.insert(template.id, template.clone());
        info!(id = %template.id, name = %template.name, event_type = %template.event_type, "Custom template created");
        Ok(template)
    }

    pub fn get(&self, id: Uuid) -> Result<CustomTemplate, StoreError> {
        self.read()?
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    /// All templates, sorted by name.
    pub fn list(&self) -> Result<Vec<CustomTemplate>, StoreError> {
        let mut templates: Vec<CustomTemplate> = self.read()?.values().cloned().collect();
        templates.sort_by(|a, b| a.name.cmp(&b.name).then(a.created_at.cmp(&b.created_at)));
        Ok(templates)
    }

    /// Replace a template's content. `id` and `created_at` are preserved.
    pub fn update(&self, id: Uuid, draft: TemplateDraft) -> Result<CustomTemplate, StoreError> {
        self.validate(&draft)?;
        let mut templates = self.write()?;
        let template = templates
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        template.name = draft.name;
        template.description = draft.description;
        template.event_type = draft.event_type;
        template.base_template = draft.base_template;
        template.fields = draft.fields;
        template.updated_at = Utc::now();
        info!(id = %id, "Custom template updated");
        Ok(template.clone())
    }

    pub fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        self.write()?
            .remove(&id)
            .map(|_| info!(id = %id, "Custom template deleted"))
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.read()?.is_empty())
    }

    /// Generate from a custom template; `overrides` win over stored fields.
    pub fn generate(&self, id: Uuid, overrides: &Fields) -> Result<GeneratedEvent, StoreError> {
        let template = self.get(id)?;
        let fields = merge_overrides(&template.fields, overrides);
        Ok(self
            .registry
            .generate(&template.event_type, &template.base_template, &fields)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GenerateError;
    use crate::generator::registry;
    use serde_json::json;

    fn draft(name: &str) -> TemplateDraft {
        let mut fields = Fields::new();
        fields.insert("host".into(), json!("db-primary"));
        fields.insert("value".into(), json!(99.5));
        TemplateDraft {
            name: name.into(),
            description: "pinned saturation sample".into(),
            event_type: "system-metrics".into(),
            base_template: "disk-saturation".into(),
            fields,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = TemplateStore::new(registry::global());
        let created = store.create(draft("full disk")).unwrap();
        assert_eq!(created.created_at, created.updated_at);

        let fetched = store.get(created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_create_validates_against_registry() {
        let store = TemplateStore::new(registry::global());

        let mut unknown_type = draft("x");
        unknown_type.event_type = "zeek".into();
        assert!(matches!(
            store.create(unknown_type),
            Err(StoreError::Generate(GenerateError::UnknownType(_)))
        ));

        let mut unknown_template = draft("x");
        unknown_template.base_template = "nope".into();
        assert!(matches!(store.create(unknown_template), Err(StoreError::Invalid(_))));

        assert!(matches!(store.create(draft("  ")), Err(StoreError::Invalid(_))));
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_list_sorted_by_name() {
        let store = TemplateStore::new(registry::global());
        store.create(draft("zeta")).unwrap();
        store.create(draft("alpha")).unwrap();
        store.create(draft("mid")).unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_update_preserves_identity() {
        let store = TemplateStore::new(registry::global());
        let created = store.create(draft("before")).unwrap();

        let updated = store.update(created.id, draft("after")).unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(updated.name, "after");
        assert!(updated.updated_at >= created.updated_at);

        assert!(matches!(
            store.update(Uuid::new_v4(), draft("ghost")),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn test_delete() {
        let store = TemplateStore::new(registry::global());
        let created = store.create(draft("gone")).unwrap();
        store.delete(created.id).unwrap();
        assert!(matches!(store.get(created.id), Err(StoreError::NotFound(_))));
        assert!(matches!(store.delete(created.id), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_generate_layers_overrides() {
        let store = TemplateStore::new(registry::global());
        let created = store.create(draft("pinned")).unwrap();

        let mut overrides = Fields::new();
        overrides.insert("value".into(), json!(97.25));

        let event = store.generate(created.id, &overrides).unwrap();
        assert_eq!(event.event_type(), "system-metrics");
        assert_eq!(event.event_id(), "disk.saturation");
        assert_eq!(event.fields()["host"], "db-primary");
        assert_eq!(event.fields()["value"], 97.25);

        let parsed: serde_json::Value = serde_json::from_str(event.raw_event()).unwrap();
        assert_eq!(parsed["host"], "db-primary");
    }
}

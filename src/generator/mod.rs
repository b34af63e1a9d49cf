//! Generator Contract
//!
//! Each event-type family implements [`Generator`]. Generation runs the same
//! pipeline for every family:
//! - resolve the template by id or event id (`UnknownTemplate` otherwise)
//! - build the family's default field map for that template
//! - overlay caller overrides with [`merge_overrides`] (shallow replacement)
//! - serialize the merged map into `raw_event` and stamp id + UTC timestamp
//!
//! Builtin families:
//! - `suricata`: EVE JSON IDS alerts
//! - `aws-guardduty`: GuardDuty JSON findings
//! - `windows-security`: Security channel audit events as event XML
//! - `system-metrics`: host metric samples as JSON

pub mod aws_finding;
pub mod fake;
pub mod registry;
pub mod suricata;
pub mod system_metrics;
pub mod windows_audit;

use crate::error::GenerateError;
use crate::event::{EventTemplate, EventType, Fields, GeneratedEvent};
use chrono::{DateTime, Utc};

pub use aws_finding::AwsFindingGenerator;
pub use registry::Registry;
pub use suricata::SuricataGenerator;
pub use system_metrics::SystemMetricsGenerator;
pub use windows_audit::WindowsAuditGenerator;

/// Polymorphic plugin producing synthetic events for one event-type family.
pub trait Generator: Send + Sync {
    /// Static descriptor of this family. Never changes after construction.
    fn describe_type(&self) -> &EventType;

    /// Builtin templates in definition order.
    fn list_templates(&self) -> &[EventTemplate];

    /// Routing hint for HEC-style destinations.
    fn sourcetype(&self) -> &str;

    /// Fresh default field map for `template`, timestamped at `now`.
    fn default_fields(&self, template: &EventTemplate, now: DateTime<Utc>) -> Fields;

    /// Serialize a (merged) field map into this family's wire format.
    fn serialize(&self, fields: &Fields) -> Result<String, GenerateError>;

    fn find_template(&self, template_id: &str) -> Option<&EventTemplate> {
        self.list_templates().iter().find(|t| t.matches(template_id))
    }

    /// Build one event from `template_id`, with `overrides` applied shallowly.
    fn generate(
        &self,
        template_id: &str,
        overrides: &Fields,
    ) -> Result<GeneratedEvent, GenerateError> {
        let descriptor = self.describe_type();
        let template =
            self.find_template(template_id)
                .ok_or_else(|| GenerateError::UnknownTemplate {
                    event_type: descriptor.id.clone(),
                    template: template_id.to_string(),
                })?;

        let now = Utc::now();
        let defaults = self.default_fields(template, now);
        let fields = merge_overrides(&defaults, overrides);
        let raw_event = self.serialize(&fields)?;

        Ok(GeneratedEvent::new(
            descriptor.id.clone(),
            template.event_id.clone(),
            now,
            raw_event,
            fields,
            self.sourcetype(),
        ))
    }
}

/// Overlay `overrides` onto `defaults`, returning a new map.
///
/// Each override key replaces the default entry wholesale, nested objects
/// included. Keys only in `defaults` keep their value; keys only in
/// `overrides` are appended. `defaults` is never mutated.
pub fn merge_overrides(defaults: &Fields, overrides: &Fields) -> Fields {
    let mut merged = defaults.clone();
    for (key, value) in overrides {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

/// JSON serialization shared by the JSON-emitting families.
pub(crate) fn to_json(event_type: &str, fields: &Fields) -> Result<String, GenerateError> {
    serde_json::to_string(fields).map_err(|e| GenerateError::Serialization {
        event_type: event_type.to_string(),
        reason: e.to_string(),
    })
}

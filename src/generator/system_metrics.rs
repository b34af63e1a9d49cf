//! Host metric sample generator.
//!
//! One event is one gauge sample with host/tag dimensions, in the flat JSON
//! shape most metrics indexes accept. Values drift around per-template
//! baselines; the `*-saturation` templates pin them near the ceiling.

use super::{Generator, fake, to_json};
use crate::error::GenerateError;
use crate::event::{EventFormat, EventTemplate, EventType, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::json;

pub const TYPE_ID: &str = "system-metrics";

struct Sample {
    metric: &'static str,
    unit: &'static str,
    value: f64,
}

fn sample_for(template_id: &str) -> Sample {
    match template_id {
        "cpu-usage" => Sample {
            metric: "system.cpu.utilization",
            unit: "percent",
            value: fake::ratio(3.0, 65.0),
        },
        "cpu-saturation" => Sample {
            metric: "system.cpu.utilization",
            unit: "percent",
            value: fake::ratio(92.0, 100.0),
        },
        "memory-usage" => Sample {
            metric: "system.memory.utilization",
            unit: "percent",
            value: fake::ratio(20.0, 75.0),
        },
        "disk-saturation" => Sample {
            metric: "system.filesystem.utilization",
            unit: "percent",
            value: fake::ratio(95.0, 99.9),
        },
        "network-throughput" => Sample {
            metric: "system.network.io",
            unit: "bytes_per_second",
            value: fake::count(10_000, 250_000_000) as f64,
        },
        _ => Sample {
            metric: "system.cpu.load_average.1m",
            unit: "load",
            value: fake::ratio(0.1, 12.0),
        },
    }
}

pub struct SystemMetricsGenerator {
    descriptor: EventType,
    templates: Vec<EventTemplate>,
}

impl SystemMetricsGenerator {
    pub fn new() -> Self {
        let templates = vec![
            EventTemplate::new("cpu-usage", "CPU utilization", "cpu", "cpu.usage", EventFormat::Json, "Normal CPU utilization sample"),
            EventTemplate::new("cpu-saturation", "CPU saturation", "cpu", "cpu.saturation", EventFormat::Json, "CPU pinned above 90%"),
            EventTemplate::new("memory-usage", "Memory utilization", "memory", "memory.usage", EventFormat::Json, "Resident memory utilization sample"),
            EventTemplate::new("disk-saturation", "Disk nearly full", "disk", "disk.saturation", EventFormat::Json, "Filesystem above 95% capacity"),
            EventTemplate::new("network-throughput", "Network throughput", "network", "network.throughput", EventFormat::Json, "Interface byte rate sample"),
            EventTemplate::new("load-average", "Load average", "cpu", "load.1m", EventFormat::Json, "One-minute load average"),
        ];

        let descriptor = EventType {
            id: TYPE_ID.to_string(),
            name: "System Metrics".to_string(),
            category: "Infrastructure Metrics".to_string(),
            description: "Host-level gauge samples (cpu, memory, disk, network)".to_string(),
            event_ids: templates.iter().map(|t| t.event_id.clone()).collect(),
        };

        Self {
            descriptor,
            templates,
        }
    }
}

impl Default for SystemMetricsGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SystemMetricsGenerator {
    fn describe_type(&self) -> &EventType {
        &self.descriptor
    }

    fn list_templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    fn sourcetype(&self) -> &str {
        "system:metrics"
    }

    fn default_fields(&self, template: &EventTemplate, now: DateTime<Utc>) -> Fields {
        let sample = sample_for(&template.id);
        let host = fake::hostname();

        let mut fields = Fields::new();
        fields.insert("timestamp".into(), json!(now.to_rfc3339_opts(SecondsFormat::Millis, true)));
        fields.insert("host".into(), json!(host));
        fields.insert("metric".into(), json!(sample.metric));
        fields.insert("value".into(), json!(sample.value));
        fields.insert("unit".into(), json!(sample.unit));
        fields.insert(
            "tags".into(),
            json!({
                "env": fake::pick(&["prod", "staging"]),
                "os": "linux",
                "role": host.split('-').next().unwrap_or(host),
                "category": template.category,
            }),
        );
        fields
    }

    fn serialize(&self, fields: &Fields) -> Result<String, GenerateError> {
        to_json(TYPE_ID, fields)
    }
}

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use threatgen::{EventFormat, Fields, GenerateError, registry};

/// Flatten generated XML into `path -> text`, with `@attr` and `Data[Name]` keys.
fn flatten_xml(xml: &str) -> BTreeMap<String, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut out = BTreeMap::new();
    let mut stack: Vec<String> = Vec::new();

    loop {
        match reader.read_event().unwrap() {
            Event::Start(e) => {
                let path = open_element(&e, &stack, &mut out);
                stack.push(path);
            }
            Event::Empty(e) => {
                open_element(&e, &stack, &mut out);
            }
            Event::Text(t) => {
                let path = stack.last().cloned().unwrap_or_default();
                out.insert(path, t.unescape().unwrap().into_owned());
            }
            Event::End(_) => {
                stack.pop();
            }
            Event::Eof => break,
            _ => {}
        }
    }
    out
}

/// Record attributes and return the element's path. The root `Event` maps to "".
fn open_element(e: &BytesStart, stack: &[String], out: &mut BTreeMap<String, String>) -> String {
    let name = String::from_utf8(e.name().as_ref().to_vec()).unwrap();
    let Some(parent) = stack.last() else {
        return String::new();
    };
    let mut path = if parent.is_empty() {
        name.clone()
    } else {
        format!("{parent}.{name}")
    };
    for attr in e.attributes() {
        let attr = attr.unwrap();
        let key = String::from_utf8(attr.key.as_ref().to_vec()).unwrap();
        let value = attr.unescape_value().unwrap().into_owned();
        if name == "Data" && key == "Name" {
            path = format!("{parent}.{value}");
        } else {
            out.insert(format!("{path}.@{key}"), value);
        }
    }
    path
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The same flattening applied to the field map.
fn flatten_fields(prefix: &str, value: &Value, out: &mut BTreeMap<String, String>) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };
                flatten_fields(&path, child, out);
            }
        }
        Value::Null => {}
        scalar => {
            let text = scalar_text(scalar);
            if !text.is_empty() {
                out.insert(prefix.to_string(), text);
            }
        }
    }
}

#[test]
fn test_every_template_round_trips() {
    let registry = registry::global();
    for ty in registry.types() {
        let generator = registry.get(&ty.id).unwrap();
        for template in generator.list_templates() {
            let event = generator.generate(&template.id, &Fields::new()).unwrap();
            assert_eq!(event.event_type(), ty.id);
            assert_eq!(event.event_id(), template.event_id);
            assert_eq!(event.sourcetype(), generator.sourcetype());

            match template.format {
                EventFormat::Json => {
                    let parsed: Value = serde_json::from_str(event.raw_event()).unwrap();
                    assert_eq!(
                        parsed,
                        Value::Object(event.fields().clone()),
                        "{}/{} JSON does not round-trip",
                        ty.id,
                        template.id
                    );
                }
                EventFormat::Xml => {
                    let mut expected = BTreeMap::new();
                    flatten_fields("", &Value::Object(event.fields().clone()), &mut expected);
                    assert_eq!(
                        flatten_xml(event.raw_event()),
                        expected,
                        "{}/{} XML does not round-trip",
                        ty.id,
                        template.id
                    );
                }
            }
        }
    }
}

#[test]
fn test_unknown_template_for_every_generator() {
    let registry = registry::global();
    for ty in registry.types() {
        let err = registry
            .generate(&ty.id, "no-such-template", &Fields::new())
            .unwrap_err();
        match err {
            GenerateError::UnknownTemplate { event_type, template } => {
                assert_eq!(event_type, ty.id);
                assert_eq!(template, "no-such-template");
            }
            other => panic!("expected UnknownTemplate, got {other:?}"),
        }
    }
}

#[test]
fn test_descriptor_event_ids_match_templates() {
    let registry = registry::global();
    for ty in registry.types() {
        let generator = registry.get(&ty.id).unwrap();
        let ids: Vec<&str> = generator
            .list_templates()
            .iter()
            .map(|t| t.event_id.as_str())
            .collect();
        assert_eq!(ty.event_ids, ids);
        assert!(!ids.is_empty());
    }
}

#[test]
fn test_overrides_reach_raw_event() {
    let mut overrides = Fields::new();
    overrides.insert("src_ip".into(), json!("203.0.113.9"));
    overrides.insert("lab_marker".into(), json!({"run": 7}));

    let event = registry::global()
        .generate("suricata", "et-exploit-log4j", &overrides)
        .unwrap();
    let parsed: Value = serde_json::from_str(event.raw_event()).unwrap();
    assert_eq!(parsed["src_ip"], "203.0.113.9");
    assert_eq!(parsed["lab_marker"]["run"], 7);
    // untouched defaults survive
    assert_eq!(parsed["event_type"], "alert");
}

#[test]
fn test_xml_override_replaces_event_data_wholesale() {
    let mut overrides = Fields::new();
    overrides.insert(
        "EventData".into(),
        json!({"TargetUserName": "svc<backup>", "LogonType": 10}),
    );

    let event = registry::global()
        .generate("windows-security", "4624", &overrides)
        .unwrap();
    let flat = flatten_xml(event.raw_event());

    assert_eq!(flat["EventData.TargetUserName"], "svc<backup>");
    assert_eq!(flat["EventData.LogonType"], "10");
    assert!(!flat.contains_key("EventData.IpAddress"));
    assert_eq!(flat["System.EventID"], "4624");
}

#[test]
fn test_events_get_distinct_ids() {
    let registry = registry::global();
    let a = registry.generate("system-metrics", "cpu-usage", &Fields::new()).unwrap();
    let b = registry.generate("system-metrics", "cpu-usage", &Fields::new()).unwrap();
    assert_ne!(a.id(), b.id());
}

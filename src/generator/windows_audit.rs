//! Windows Security audit event generator.
//!
//! Fields mirror the event XML layout: a `System` object and an `EventData`
//! object. Serialization walks the map in order with these rules:
//! - keys prefixed with `@` inside an object become attributes of its element
//! - `EventData` entries render as `<Data Name="key">value</Data>`
//! - other objects nest as child elements, sequences repeat the element
//! - scalars render as escaped text; integers and booleans use their literal form

use super::{Generator, fake};
use crate::error::GenerateError;
use crate::event::{EventFormat, EventTemplate, EventType, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use quick_xml::escape::escape;
use serde_json::{Value, json};

pub const TYPE_ID: &str = "windows-security";

const EVENT_NS: &str = "http://schemas.microsoft.com/win/2004/08/events/event";
const AUDIT_PROVIDER: &str = "Microsoft-Windows-Security-Auditing";
const AUDIT_PROVIDER_GUID: &str = "{54849625-5478-4994-A5BA-3E3B0328C30D}";
const KEYWORD_SUCCESS: &str = "0x8020000000000000";
const KEYWORD_FAILURE: &str = "0x8010000000000000";

pub struct WindowsAuditGenerator {
    descriptor: EventType,
    templates: Vec<EventTemplate>,
}

impl WindowsAuditGenerator {
    pub fn new() -> Self {
        let templates = vec![
            EventTemplate::new(
                "logon-success",
                "An account was successfully logged on",
                "Logon",
                "4624",
                EventFormat::Xml,
                "Successful network logon",
            ),
            EventTemplate::new(
                "logon-failure",
                "An account failed to log on",
                "Logon",
                "4625",
                EventFormat::Xml,
                "Failed logon with a bad password",
            ),
            EventTemplate::new(
                "process-creation",
                "A new process has been created",
                "Process Creation",
                "4688",
                EventFormat::Xml,
                "Encoded PowerShell spawned from an Office process",
            ),
            EventTemplate::new(
                "user-created",
                "A user account was created",
                "User Account Management",
                "4720",
                EventFormat::Xml,
                "New local user account created",
            ),
            EventTemplate::new(
                "group-member-added",
                "A member was added to a security-enabled local group",
                "Security Group Management",
                "4732",
                EventFormat::Xml,
                "Account added to the local Administrators group",
            ),
            EventTemplate::new(
                "audit-log-cleared",
                "The audit log was cleared",
                "Log Clear",
                "1102",
                EventFormat::Xml,
                "Security event log cleared",
            ),
        ];

        let descriptor = EventType {
            id: TYPE_ID.to_string(),
            name: "Windows Security Audit".to_string(),
            category: "Endpoint Audit".to_string(),
            description: "Windows Security channel events rendered as event XML".to_string(),
            event_ids: templates.iter().map(|t| t.event_id.clone()).collect(),
        };

        Self {
            descriptor,
            templates,
        }
    }

    fn task(event_code: &str) -> u32 {
        match event_code {
            "4624" | "4625" => 12544,
            "4688" => 13312,
            "4720" => 13824,
            "4732" => 13826,
            _ => 104,
        }
    }

    fn event_data(event_code: &str, computer: &str) -> Value {
        let domain = fake::domain();
        let user = fake::username();
        let subject = json!({
            "SubjectUserSid": "S-1-5-18",
            "SubjectUserName": format!("{}$", computer.to_uppercase()),
            "SubjectDomainName": domain,
            "SubjectLogonId": "0x3e7",
        });

        let mut data = match subject {
            Value::Object(map) => map,
            _ => Fields::new(),
        };

        let extra = match event_code {
            "4624" => json!({
                "TargetUserName": user,
                "TargetDomainName": domain,
                "TargetLogonId": format!("0x{}", fake::hex_id(6)),
                "LogonType": 3,
                "LogonProcessName": "NtLmSsp",
                "AuthenticationPackageName": "NTLM",
                "WorkstationName": fake::hostname().to_uppercase(),
                "IpAddress": fake::private_ip(),
                "IpPort": fake::ephemeral_port(),
            }),
            "4625" => json!({
                "TargetUserName": user,
                "TargetDomainName": domain,
                "Status": "0xc000006d",
                "FailureReason": "%%2313",
                "SubStatus": "0xc000006a",
                "LogonType": 3,
                "LogonProcessName": "NtLmSsp",
                "IpAddress": fake::public_ip(),
                "IpPort": fake::ephemeral_port(),
            }),
            "4688" => json!({
                "NewProcessId": format!("0x{}", fake::hex_id(4)),
                "NewProcessName": "C:\\Windows\\System32\\WindowsPowerShell\\v1.0\\powershell.exe",
                "TokenElevationType": "%%1936",
                "ProcessId": format!("0x{}", fake::hex_id(4)),
                "CommandLine": "powershell.exe -nop -w hidden -enc SQBFAFgAIAAoAE4AZQB3AC0ATwBiAGoAZQBjAHQAKQA=",
                "ParentProcessName": "C:\\Program Files\\Microsoft Office\\root\\Office16\\WINWORD.EXE",
            }),
            "4720" | "4732" => {
                let (target, target_domain) = if event_code == "4732" {
                    ("Administrators", "Builtin")
                } else {
                    (user, domain)
                };
                let sid = format!(
                    "S-1-5-21-{}-{}-{}-{}",
                    fake::count(1_000_000_000, 4_000_000_000),
                    fake::count(1_000_000_000, 4_000_000_000),
                    fake::count(1_000_000_000, 4_000_000_000),
                    fake::count(1000, 5000)
                );
                json!({
                    "TargetUserName": target,
                    "TargetDomainName": target_domain,
                    "TargetSid": sid,
                    "MemberName": format!("CN={user},CN=Users,DC={},DC=local", domain.to_lowercase()),
                    "PrivilegeList": "-",
                })
            }
            _ => Value::Null,
        };

        if let Value::Object(map) = extra {
            data.extend(map);
        }
        Value::Object(data)
    }
}

impl Default for WindowsAuditGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for WindowsAuditGenerator {
    fn describe_type(&self) -> &EventType {
        &self.descriptor
    }

    fn list_templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    fn sourcetype(&self) -> &str {
        "XmlWinEventLog:Security"
    }

    fn default_fields(&self, template: &EventTemplate, now: DateTime<Utc>) -> Fields {
        let code = template.event_id.as_str();
        let computer = format!("{}.corp.local", fake::hostname());
        let keywords = if code == "4625" {
            KEYWORD_FAILURE
        } else {
            KEYWORD_SUCCESS
        };

        let mut fields = Fields::new();
        fields.insert(
            "System".into(),
            json!({
                "Provider": {"@Name": AUDIT_PROVIDER, "@Guid": AUDIT_PROVIDER_GUID},
                "EventID": code.parse::<u32>().unwrap_or_default(),
                "Version": 0,
                "Level": 0,
                "Task": Self::task(code),
                "Opcode": 0,
                "Keywords": keywords,
                "TimeCreated": {"@SystemTime": now.to_rfc3339_opts(SecondsFormat::Micros, true)},
                "EventRecordID": fake::count(100_000, 9_000_000),
                "Correlation": {},
                "Execution": {"@ProcessID": 636, "@ThreadID": fake::count(600, 9000)},
                "Channel": "Security",
                "Computer": computer,
                "Security": {},
            }),
        );
        fields.insert("EventData".into(), Self::event_data(code, &computer));
        fields
    }

    fn serialize(&self, fields: &Fields) -> Result<String, GenerateError> {
        let mut out = format!("<Event xmlns=\"{EVENT_NS}\">");
        for (key, value) in fields {
            if key == "EventData" {
                write_event_data(value, &mut out)?;
            } else {
                write_element(key, value, &mut out)?;
            }
        }
        out.push_str("</Event>");
        Ok(out)
    }
}

fn invalid(reason: String) -> GenerateError {
    GenerateError::Serialization {
        event_type: TYPE_ID.to_string(),
        reason,
    }
}

fn check_name(name: &str) -> Result<(), GenerateError> {
    let mut chars = name.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    if valid_start && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')) {
        Ok(())
    } else {
        Err(invalid(format!("`{name}` is not a valid XML name")))
    }
}

/// Characters allowed by XML 1.0: tab, LF, CR, and everything from U+0020
/// except U+FFFE/U+FFFF. Surrogates can't occur in a `char`.
fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..='\u{10FFFF}')
}

/// Escape `raw`, refusing characters no XML 1.0 document may contain.
fn escaped(raw: &str) -> Result<String, GenerateError> {
    match raw.chars().find(|c| !is_xml_char(*c)) {
        Some(c) => Err(invalid(format!(
            "character U+{:04X} is not allowed in XML",
            u32::from(c)
        ))),
        None => Ok(escape(raw).into_owned()),
    }
}

/// Text form of a scalar; nested values fall back to compact JSON.
fn text(value: &Value) -> Result<String, GenerateError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => escaped(s),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => escaped(&other.to_string()),
    }
}

fn write_event_data(value: &Value, out: &mut String) -> Result<(), GenerateError> {
    let Value::Object(entries) = value else {
        return write_element("EventData", value, out);
    };
    out.push_str("<EventData>");
    for (name, data) in entries {
        out.push_str(&format!(
            "<Data Name=\"{}\">{}</Data>",
            escaped(name)?,
            text(data)?
        ));
    }
    out.push_str("</EventData>");
    Ok(())
}

fn write_element(name: &str, value: &Value, out: &mut String) -> Result<(), GenerateError> {
    check_name(name)?;
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(name, item, out)?;
            }
        }
        Value::Object(map) => {
            out.push('<');
            out.push_str(name);
            let mut children = Vec::new();
            for (key, child) in map {
                match key.strip_prefix('@') {
                    Some(attr) => {
                        check_name(attr)?;
                        out.push_str(&format!(" {attr}=\"{}\"", text(child)?));
                    }
                    None => children.push((key, child)),
                }
            }
            if children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for (key, child) in children {
                    write_element(key, child, out)?;
                }
                out.push_str(&format!("</{name}>"));
            }
        }
        Value::Null => out.push_str(&format!("<{name}/>")),
        scalar => out.push_str(&format!("<{name}>{}</{name}>", text(scalar)?)),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logon_event_xml_shape() {
        let generator = WindowsAuditGenerator::new();
        let event = generator.generate("4624", &Fields::new()).unwrap();
        let xml = event.raw_event();

        assert!(xml.starts_with("<Event xmlns="));
        assert!(xml.contains("<EventID>4624</EventID>"));
        assert!(xml.contains("<Provider Name=\"Microsoft-Windows-Security-Auditing\""));
        assert!(xml.contains("<Data Name=\"LogonType\">3</Data>"));
        assert!(xml.contains("<Correlation/>"));
        assert!(xml.ends_with("</Event>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let generator = WindowsAuditGenerator::new();
        let overrides = match json!({"EventData": {"CommandLine": "cmd /c \"a & b\" <x>"}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let event = generator.generate("process-creation", &overrides).unwrap();
        assert!(
            event
                .raw_event()
                .contains("cmd /c &quot;a &amp; b&quot; &lt;x&gt;")
        );
    }

    #[test]
    fn test_invalid_element_name_is_serialization_error() {
        let generator = WindowsAuditGenerator::new();
        let overrides = match json!({"bad key": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = generator.generate("4625", &overrides).unwrap_err();
        assert!(matches!(err, GenerateError::Serialization { .. }));
    }

    #[test]
    fn test_control_character_is_serialization_error() {
        let generator = WindowsAuditGenerator::new();
        let overrides = match json!({"EventData": {"CommandLine": "a\u{1}b"}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = generator.generate("4688", &overrides).unwrap_err();
        match err {
            GenerateError::Serialization { event_type, reason } => {
                assert_eq!(event_type, TYPE_ID);
                assert!(reason.contains("U+0001"));
            }
            other => panic!("expected Serialization, got {other:?}"),
        }
    }

    #[test]
    fn test_control_character_in_attribute_is_rejected() {
        let generator = WindowsAuditGenerator::new();
        let overrides = match json!({"Execution": {"@ProcessID": "6\u{1b}36"}}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        };
        let err = generator.generate("4624", &overrides).unwrap_err();
        assert!(matches!(err, GenerateError::Serialization { .. }));
    }

    #[test]
    fn test_xml_whitespace_and_astral_chars_allowed() {
        assert!(is_xml_char('\t'));
        assert!(is_xml_char('\n'));
        assert!(is_xml_char('\r'));
        assert!(is_xml_char('\u{1F600}'));
        assert!(!is_xml_char('\u{0}'));
        assert!(!is_xml_char('\u{FFFE}'));
        assert_eq!(escaped("tab\there").unwrap(), "tab\there");
    }

    #[test]
    fn test_failure_keyword_on_4625() {
        let generator = WindowsAuditGenerator::new();
        let event = generator.generate("logon-failure", &Fields::new()).unwrap();
        assert_eq!(event.fields()["System"]["Keywords"], KEYWORD_FAILURE);
    }
}

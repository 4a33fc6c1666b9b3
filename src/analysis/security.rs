//! Security exposure detection: globally-open network rules and public S3
//! surfaces.
//!
//! Runs over the raw plan rather than the normalized model: the rules read
//! attribute shapes (`ingress[]`, `cidr_blocks`, ACL flags) that
//! normalization deliberately does not interpret, and NO_OP entries still
//! count because an already-open rule is still an open rule.

use crate::config::Config;
use crate::contracts::{ExposureKind, SecurityExposure, Severity};
use crate::ingest::normalize::parse_address;
use serde_json::Value;
use tracing::info;

const GLOBAL_V4: &str = "0.0.0.0/0";
const GLOBAL_V6: &str = "::/0";

pub fn detect(plan: &Value, config: &Config) -> Vec<SecurityExposure> {
    let mut exposures = Vec::new();
    let changes = match plan["resource_changes"].as_array() {
        Some(changes) => changes,
        None => return exposures,
    };

    for change in changes {
        let address = match change["address"].as_str() {
            Some(address) if !address.is_empty() => address,
            _ => continue,
        };
        let (_, _, r#type) = parse_address(address);

        // Prefer the planned state; deletes only carry the prior state, and
        // a rule being removed was still exposed until apply.
        let side = match (&change["change"]["after"], &change["change"]["before"]) {
            (after @ Value::Object(_), _) => after,
            (_, before @ Value::Object(_)) => before,
            _ => continue,
        };

        match r#type.as_str() {
            "aws_security_group" => {
                check_inline_rules(address, side, config, &mut exposures);
            }
            "aws_security_group_rule" => {
                let kind = direction_kind(side["type"].as_str());
                check_single_rule(address, side, kind, config, &mut exposures);
            }
            "aws_vpc_security_group_ingress_rule" => {
                check_single_rule(address, side, ExposureKind::IngressCidr, config, &mut exposures);
            }
            "aws_vpc_security_group_egress_rule" => {
                check_single_rule(address, side, ExposureKind::EgressCidr, config, &mut exposures);
            }
            "aws_s3_bucket_public_access_block" => {
                check_public_access_block(address, side, &mut exposures);
            }
            "aws_s3_bucket" | "aws_s3_bucket_acl" => {
                check_bucket_acl(address, side, &mut exposures);
            }
            _ => {}
        }
    }

    if !exposures.is_empty() {
        info!(count = exposures.len(), "security exposures detected");
    }
    exposures
}

fn direction_kind(direction: Option<&str>) -> ExposureKind {
    match direction {
        Some("egress") => ExposureKind::EgressCidr,
        _ => ExposureKind::IngressCidr,
    }
}

/// `aws_security_group` with inline `ingress`/`egress` rule lists: one
/// exposure per (rule, port-range) that is open to the world.
fn check_inline_rules(
    address: &str,
    side: &Value,
    config: &Config,
    exposures: &mut Vec<SecurityExposure>,
) {
    for (field, kind) in [
        ("ingress", ExposureKind::IngressCidr),
        ("egress", ExposureKind::EgressCidr),
    ] {
        if let Some(rules) = side[field].as_array() {
            for rule in rules {
                check_single_rule(address, rule, kind, config, exposures);
            }
        }
    }
}

fn check_single_rule(
    address: &str,
    rule: &Value,
    kind: ExposureKind,
    config: &Config,
    exposures: &mut Vec<SecurityExposure>,
) {
    let cidr = match global_cidr(rule) {
        Some(cidr) => cidr,
        None => return,
    };

    let from_port = port_value(&rule["from_port"]);
    let to_port = port_value(&rule["to_port"]).or(from_port);
    let sensitive = range_hits_sensitive_port(from_port, to_port, &config.sensitive_ports);

    exposures.push(SecurityExposure {
        resource_address: address.to_string(),
        kind,
        port: exposure_port(from_port, to_port, &config.sensitive_ports),
        cidr: Some(cidr),
        severity: if sensitive { Severity::High } else { Severity::Medium },
    });
}

/// First world-open block in the rule, v4 before v6. Covers both the inline
/// list shape (`cidr_blocks`) and the standalone rule shape (`cidr_ipv4`).
fn global_cidr(rule: &Value) -> Option<String> {
    let candidates = [
        ("cidr_blocks", GLOBAL_V4),
        ("ipv6_cidr_blocks", GLOBAL_V6),
    ];
    for (field, global) in candidates {
        if let Some(blocks) = rule[field].as_array() {
            for block in blocks.iter().filter_map(Value::as_str) {
                if block.trim() == global {
                    return Some(global.to_string());
                }
            }
        }
    }
    for (field, global) in [("cidr_ipv4", GLOBAL_V4), ("cidr_ipv6", GLOBAL_V6)] {
        if rule[field].as_str().map(str::trim) == Some(global) {
            return Some(global.to_string());
        }
    }
    None
}

fn port_value(value: &Value) -> Option<u16> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
        .and_then(|port| u16::try_from(port).ok())
}

fn range_hits_sensitive_port(from: Option<u16>, to: Option<u16>, sensitive: &[u16]) -> bool {
    let low = from.unwrap_or(0);
    let high = to.unwrap_or(u16::MAX);
    sensitive.iter().any(|&port| low <= port && port <= high)
}

/// Recorded port: exact for single-port rules, else the smallest sensitive
/// port inside the range. Keeps the scoring penalty aligned with severity.
fn exposure_port(from: Option<u16>, to: Option<u16>, sensitive: &[u16]) -> Option<u16> {
    let low = from?;
    let high = to.unwrap_or(low);
    if low == high {
        return Some(low);
    }
    sensitive
        .iter()
        .copied()
        .filter(|&port| low <= port && port <= high)
        .min()
}

fn check_public_access_block(address: &str, side: &Value, exposures: &mut Vec<SecurityExposure>) {
    let flags = [
        "block_public_acls",
        "block_public_policy",
        "ignore_public_acls",
        "restrict_public_buckets",
    ];
    let any_disabled = flags
        .iter()
        .any(|flag| side[*flag].as_bool() == Some(false));
    if any_disabled {
        exposures.push(SecurityExposure {
            resource_address: address.to_string(),
            kind: ExposureKind::S3PublicBlockDisabled,
            port: None,
            cidr: None,
            severity: Severity::High,
        });
    }
}

fn check_bucket_acl(address: &str, side: &Value, exposures: &mut Vec<SecurityExposure>) {
    let severity = match side["acl"].as_str().map(str::to_ascii_lowercase).as_deref() {
        Some("public-read-write") => Severity::High,
        Some("public-read") => Severity::Medium,
        _ => return,
    };
    exposures.push(SecurityExposure {
        resource_address: address.to_string(),
        kind: ExposureKind::S3PublicAcl,
        port: None,
        cidr: None,
        severity,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn plan_with(changes: Value) -> Value {
        json!({"format_version": "1.2", "resource_changes": changes})
    }

    #[test]
    fn open_ssh_ingress_is_high_severity() {
        let plan = plan_with(json!([{
            "address": "aws_security_group.edge",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {
                    "ingress": [{
                        "from_port": 22,
                        "to_port": 22,
                        "cidr_blocks": ["0.0.0.0/0"]
                    }]
                }
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures.len(), 1);
        assert_eq!(exposures[0].kind, ExposureKind::IngressCidr);
        assert_eq!(exposures[0].port, Some(22));
        assert_eq!(exposures[0].severity, Severity::High);
        assert_eq!(exposures[0].cidr.as_deref(), Some("0.0.0.0/0"));
    }

    #[test]
    fn open_web_port_is_medium_severity() {
        let plan = plan_with(json!([{
            "address": "aws_security_group.web",
            "change": {
                "actions": ["update"],
                "before": {},
                "after": {
                    "ingress": [{
                        "from_port": 443,
                        "to_port": 443,
                        "cidr_blocks": ["0.0.0.0/0"]
                    }]
                }
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures[0].severity, Severity::Medium);
        assert_eq!(exposures[0].port, Some(443));
    }

    #[test]
    fn range_intersecting_sensitive_port_is_high() {
        let plan = plan_with(json!([{
            "address": "aws_security_group.wide",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {
                    "ingress": [{
                        "from_port": 3000,
                        "to_port": 4000,
                        "cidr_blocks": ["0.0.0.0/0"]
                    }]
                }
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures[0].severity, Severity::High);
        // Smallest sensitive port inside [3000, 4000].
        assert_eq!(exposures[0].port, Some(3306));
    }

    #[test]
    fn scoped_cidr_is_not_an_exposure() {
        let plan = plan_with(json!([{
            "address": "aws_security_group.internal",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {
                    "ingress": [{
                        "from_port": 22,
                        "to_port": 22,
                        "cidr_blocks": ["10.0.0.0/8"]
                    }]
                }
            }
        }]));
        assert!(detect(&plan, &Config::default()).is_empty());
    }

    #[test]
    fn ipv6_global_block_counts() {
        let plan = plan_with(json!([{
            "address": "aws_vpc_security_group_ingress_rule.v6",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {"from_port": 3389, "to_port": 3389, "cidr_ipv6": "::/0"}
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures[0].cidr.as_deref(), Some("::/0"));
        assert_eq!(exposures[0].severity, Severity::High);
    }

    #[test]
    fn egress_rules_report_egress_kind() {
        let plan = plan_with(json!([{
            "address": "aws_security_group.out",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {
                    "egress": [{"from_port": 0, "to_port": 0, "cidr_blocks": ["0.0.0.0/0"]}]
                }
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures[0].kind, ExposureKind::EgressCidr);
    }

    #[test]
    fn disabled_public_access_block_is_high() {
        let plan = plan_with(json!([{
            "address": "aws_s3_bucket_public_access_block.logs",
            "change": {
                "actions": ["update"],
                "before": {"block_public_acls": true},
                "after": {
                    "block_public_acls": false,
                    "block_public_policy": true,
                    "ignore_public_acls": true,
                    "restrict_public_buckets": true
                }
            }
        }]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures[0].kind, ExposureKind::S3PublicBlockDisabled);
        assert_eq!(exposures[0].severity, Severity::High);
    }

    #[test]
    fn public_acl_severity_depends_on_write_access() {
        let plan = plan_with(json!([
            {
                "address": "aws_s3_bucket.readable",
                "change": {
                    "actions": ["create"],
                    "before": null,
                    "after": {"acl": "public-read"}
                }
            },
            {
                "address": "aws_s3_bucket_acl.writable",
                "change": {
                    "actions": ["update"],
                    "before": {},
                    "after": {"acl": "public-read-write"}
                }
            }
        ]));
        let exposures = detect(&plan, &Config::default());
        assert_eq!(exposures.len(), 2);
        assert_eq!(exposures[0].severity, Severity::Medium);
        assert_eq!(exposures[1].severity, Severity::High);
    }

    #[test]
    fn noop_entries_still_count() {
        // An existing world-open rule is an exposure even when untouched.
        let plan = plan_with(json!([{
            "address": "aws_security_group.existing",
            "change": {
                "actions": ["no-op"],
                "before": {
                    "ingress": [{"from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]
                },
                "after": {
                    "ingress": [{"from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]
                }
            }
        }]));
        assert_eq!(detect(&plan, &Config::default()).len(), 1);
    }
}

//! Shared plan fixtures for the CLI integration tests.

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub fn write_json(dir: &TempDir, name: &str, value: &Value) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

pub fn write_text(dir: &TempDir, name: &str, text: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, text).unwrap();
    path
}

pub fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

/// One quiet bucket creation, nothing referencing anything.
pub fn single_bucket_create_plan() -> Value {
    json!({
        "format_version": "1.2",
        "resource_changes": [{
            "address": "aws_s3_bucket.logs",
            "type": "aws_s3_bucket",
            "change": {
                "actions": ["create"],
                "before": null,
                "after": {"bucket": "logs", "acl": "private"}
            }
        }]
    })
}

/// Critical VPC update with one updated subnet hanging off it.
pub fn vpc_update_plan() -> Value {
    json!({
        "format_version": "1.2",
        "resource_changes": [
            {
                "address": "aws_vpc.main",
                "type": "aws_vpc",
                "change": {"actions": ["update"], "before": {}, "after": {}}
            },
            {
                "address": "aws_subnet.a",
                "type": "aws_subnet",
                "change": {"actions": ["update"], "before": {}, "after": {}},
                "depends_on": ["aws_vpc.main"]
            }
        ]
    })
}

/// Production database deletion next to an existing world-open SSH rule.
pub fn db_delete_with_open_ssh_plan() -> Value {
    json!({
        "format_version": "1.2",
        "resource_changes": [
            {
                "address": "aws_db_instance.production",
                "type": "aws_db_instance",
                "change": {
                    "actions": ["delete"],
                    "before": {"instance_type": "db.m5.large"},
                    "after": null
                }
            },
            {
                "address": "aws_security_group.edge",
                "type": "aws_security_group",
                "change": {
                    "actions": ["no-op"],
                    "before": {
                        "ingress": [{"from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]
                    },
                    "after": {
                        "ingress": [{"from_port": 22, "to_port": 22, "cidr_blocks": ["0.0.0.0/0"]}]
                    }
                }
            }
        ]
    })
}

/// The kitchen sink: two RDS deletions, a bucket losing its protection, an
/// open RDP rule, and a shared load balancer update with three dependents.
pub fn multi_failure_plan() -> Value {
    json!({
        "format_version": "1.2",
        "resource_changes": [
            {
                "address": "aws_db_instance.users",
                "type": "aws_db_instance",
                "change": {"actions": ["delete"], "before": {}, "after": null}
            },
            {
                "address": "aws_db_instance.orders",
                "type": "aws_db_instance",
                "change": {"actions": ["delete"], "before": {}, "after": null}
            },
            {
                "address": "aws_s3_bucket.assets",
                "type": "aws_s3_bucket",
                "change": {
                    "actions": ["update"],
                    "before": {"force_destroy": false},
                    "after": {"force_destroy": true}
                }
            },
            {
                "address": "aws_security_group.edge",
                "type": "aws_security_group",
                "change": {
                    "actions": ["no-op"],
                    "before": {
                        "ingress": [{"from_port": 3389, "to_port": 3389, "cidr_blocks": ["0.0.0.0/0"]}]
                    },
                    "after": {
                        "ingress": [{"from_port": 3389, "to_port": 3389, "cidr_blocks": ["0.0.0.0/0"]}]
                    }
                }
            },
            {
                "address": "aws_lb.shared",
                "type": "aws_lb",
                "change": {"actions": ["update"], "before": {}, "after": {}}
            },
            {
                "address": "aws_ecs_service.a",
                "type": "aws_ecs_service",
                "change": {"actions": ["no-op"], "before": {}, "after": {}},
                "depends_on": ["aws_lb.shared"]
            },
            {
                "address": "aws_ecs_service.b",
                "type": "aws_ecs_service",
                "change": {"actions": ["no-op"], "before": {}, "after": {}},
                "depends_on": ["aws_lb.shared"]
            },
            {
                "address": "aws_ecs_service.c",
                "type": "aws_ecs_service",
                "change": {"actions": ["no-op"], "before": {}, "after": {}},
                "depends_on": ["aws_lb.shared"]
            }
        ]
    })
}

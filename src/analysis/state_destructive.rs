//! State-destructive update detection: transitions that weaken a
//! data-protection attribute without deleting anything yet.

use crate::contracts::{ProtectionAttribute, StateDestructiveUpdate};
use serde_json::Value;
use tracing::info;

/// Database types whose `backup_retention_period` dropping to zero removes
/// point-in-time recovery.
const RETENTION_GUARDED_TYPES: [&str; 2] = ["aws_db_instance", "aws_rds_cluster"];

pub fn detect(plan: &Value) -> Vec<StateDestructiveUpdate> {
    let mut updates = Vec::new();
    let changes = match plan["resource_changes"].as_array() {
        Some(changes) => changes,
        None => return updates,
    };

    for change in changes {
        let address = match change["address"].as_str() {
            Some(address) if !address.is_empty() => address,
            _ => continue,
        };
        let actions = &change["change"]["actions"];
        let touches_state = actions.as_array().map_or(false, |list| {
            list.iter().filter_map(Value::as_str).any(|verb| {
                matches!(verb, "update" | "create" | "delete")
            })
        });
        if !touches_state {
            continue;
        }

        let before = &change["change"]["before"];
        let after = &change["change"]["after"];
        if !before.is_object() || !after.is_object() {
            continue;
        }

        if flag_flipped(&before["force_destroy"], &after["force_destroy"], false, true) {
            updates.push(entry(address, ProtectionAttribute::ForceDestroy, before, after, "force_destroy"));
        }
        if flag_flipped(&before["prevent_destroy"], &after["prevent_destroy"], true, false) {
            updates.push(entry(address, ProtectionAttribute::PreventDestroy, before, after, "prevent_destroy"));
        }
        if protection_disabled(&before["deletion_protection"], &after["deletion_protection"]) {
            updates.push(entry(address, ProtectionAttribute::DeletionProtection, before, after, "deletion_protection"));
        }
        if retention_dropped(change, before, after) {
            updates.push(entry(
                address,
                ProtectionAttribute::BackupRetentionPeriod,
                before,
                after,
                "backup_retention_period",
            ));
        }
    }

    if !updates.is_empty() {
        info!(count = updates.len(), "state-destructive updates detected");
    }
    updates
}

fn entry(
    address: &str,
    attribute: ProtectionAttribute,
    before: &Value,
    after: &Value,
    field: &str,
) -> StateDestructiveUpdate {
    StateDestructiveUpdate {
        resource_address: address.to_string(),
        attribute,
        before: before[field].clone(),
        after: after[field].clone(),
    }
}

/// Both sides must be present; an attribute appearing or disappearing is not
/// a transition.
fn flag_flipped(before: &Value, after: &Value, from: bool, to: bool) -> bool {
    matches!((as_bool(before), as_bool(after)), (Some(b), Some(a)) if b == from && a == to)
}

/// `deletion_protection` appears as a bool on some types and as
/// "enabled"/"disabled" strings on others.
fn protection_disabled(before: &Value, after: &Value) -> bool {
    matches!(
        (as_bool(before), as_bool(after)),
        (Some(true), Some(false))
    )
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => match text.as_str() {
            "true" | "enabled" => Some(true),
            "false" | "disabled" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn retention_dropped(change: &Value, before: &Value, after: &Value) -> bool {
    let address = change["address"].as_str().unwrap_or_default();
    let guarded = RETENTION_GUARDED_TYPES
        .iter()
        .any(|t| address.split('.').any(|segment| segment == *t));
    if !guarded {
        return false;
    }
    match (
        before["backup_retention_period"].as_u64(),
        after["backup_retention_period"].as_u64(),
    ) {
        (Some(b), Some(0)) => b > 0,
        _ => false,
    }
}

use super::domain::{Dimension, DimensionDraft, LogAction, NewLogEntry};

pub(crate) fn creation(draft: &DimensionDraft, operator: &str) -> NewLogEntry {
    NewLogEntry {
        action: LogAction::Create,
        dimension_name: draft.name.clone(),
        changes: format!(
            "created dimension '{}' (weight {}, {})",
            draft.name,
            draft.weight,
            activity(draft.is_active)
        ),
        operator: operator.to_string(),
    }
}

/// Field-by-field prose diff; an update that changes nothing still records that fact.
pub(crate) fn update(before: &Dimension, after: &Dimension, operator: &str) -> NewLogEntry {
    let mut changes = Vec::new();
    if before.name != after.name {
        changes.push(format!("name: '{}' -> '{}'", before.name, after.name));
    }
    if before.description != after.description {
        changes.push(format!(
            "description: '{}' -> '{}'",
            before.description, after.description
        ));
    }
    if before.calculation_method != after.calculation_method {
        changes.push(format!(
            "calculation method: '{}' -> '{}'",
            before.calculation_method, after.calculation_method
        ));
    }
    if before.weight != after.weight {
        changes.push(format!("weight: {} -> {}", before.weight, after.weight));
    }
    if before.is_active != after.is_active {
        changes.push(format!(
            "status: {} -> {}",
            activity(before.is_active),
            activity(after.is_active)
        ));
    }

    let changes = if changes.is_empty() {
        "no field changes".to_string()
    } else {
        changes.join("; ")
    };

    NewLogEntry {
        action: LogAction::Update,
        dimension_name: after.name.clone(),
        changes,
        operator: operator.to_string(),
    }
}

pub(crate) fn deletion(dimension: &Dimension, operator: &str) -> NewLogEntry {
    NewLogEntry {
        action: LogAction::Delete,
        dimension_name: dimension.name.clone(),
        changes: format!(
            "deleted dimension '{}' (id {}, weight {})",
            dimension.name, dimension.id, dimension.weight
        ),
        operator: operator.to_string(),
    }
}

fn activity(active: bool) -> &'static str {
    if active {
        "active"
    } else {
        "inactive"
    }
}

//! Status conditions of a GatewaySet, following Kubernetes API conventions

use chrono::Utc;

use crate::crd::{Condition, ConfigState};

pub const CONDITION_TYPE_READY: &str = "Ready";
pub const CONDITION_TYPE_RECONCILING: &str = "Reconciling";

pub const CONDITION_STATUS_TRUE: &str = "True";
pub const CONDITION_STATUS_FALSE: &str = "False";

/// Update or add a condition
///
/// The transition time only moves when the status flips.
pub fn set_condition(
    conditions: &mut Vec<Condition>,
    type_: &str,
    status: &str,
    reason: &str,
    message: &str,
    observed_generation: Option<i64>,
) {
    let now = Utc::now().to_rfc3339();

    if let Some(existing) = conditions.iter_mut().find(|c| c.type_ == type_) {
        if existing.status != status {
            existing.last_transition_time = now;
        }
        existing.status = status.to_string();
        existing.reason = reason.to_string();
        existing.message = message.to_string();
        existing.observed_generation = observed_generation;
    } else {
        conditions.push(Condition {
            type_: type_.to_string(),
            status: status.to_string(),
            last_transition_time: now,
            reason: reason.to_string(),
            message: message.to_string(),
            observed_generation,
        });
    }
}

pub fn find_condition<'a>(conditions: &'a [Condition], type_: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.type_ == type_)
}

pub fn is_condition_true(conditions: &[Condition], type_: &str) -> bool {
    find_condition(conditions, type_)
        .map(|c| c.status == CONDITION_STATUS_TRUE)
        .unwrap_or(false)
}

/// Ready and Reconciling conditions matching a reconcile state
pub fn apply_state(
    conditions: &mut Vec<Condition>,
    state: ConfigState,
    message: &str,
    observed_generation: Option<i64>,
) {
    let (ready, reconciling) = match state {
        ConfigState::Reconciling => (CONDITION_STATUS_FALSE, CONDITION_STATUS_TRUE),
        ConfigState::Available => (CONDITION_STATUS_TRUE, CONDITION_STATUS_FALSE),
        ConfigState::ReconcileFailed => (CONDITION_STATUS_FALSE, CONDITION_STATUS_FALSE),
    };
    let reason = state.to_string();

    set_condition(
        conditions,
        CONDITION_TYPE_READY,
        ready,
        &reason,
        message,
        observed_generation,
    );
    set_condition(
        conditions,
        CONDITION_TYPE_RECONCILING,
        reconciling,
        &reason,
        message,
        observed_generation,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_condition_adds_new() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, CONDITION_TYPE_READY, CONDITION_STATUS_TRUE, "Ok", "", Some(1));

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].observed_generation, Some(1));
    }

    #[test]
    fn test_transition_time_kept_when_status_unchanged() {
        let mut conditions = Vec::new();
        set_condition(&mut conditions, CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, "A", "first", None);
        let before = conditions[0].last_transition_time.clone();

        set_condition(&mut conditions, CONDITION_TYPE_READY, CONDITION_STATUS_FALSE, "B", "second", None);

        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].last_transition_time, before);
        assert_eq!(conditions[0].reason, "B");
        assert_eq!(conditions[0].message, "second");
    }

    #[test]
    fn test_apply_state_available() {
        let mut conditions = Vec::new();
        apply_state(&mut conditions, ConfigState::Reconciling, "", Some(2));
        assert!(is_condition_true(&conditions, CONDITION_TYPE_RECONCILING));
        assert!(!is_condition_true(&conditions, CONDITION_TYPE_READY));

        apply_state(&mut conditions, ConfigState::Available, "", Some(2));
        assert!(is_condition_true(&conditions, CONDITION_TYPE_READY));
        assert!(!is_condition_true(&conditions, CONDITION_TYPE_RECONCILING));
        assert_eq!(conditions.len(), 2);
    }

    #[test]
    fn test_apply_state_failed_carries_message() {
        let mut conditions = Vec::new();
        apply_state(&mut conditions, ConfigState::ReconcileFailed, "quota exceeded", None);

        let ready = find_condition(&conditions, CONDITION_TYPE_READY).unwrap();
        assert_eq!(ready.status, CONDITION_STATUS_FALSE);
        assert_eq!(ready.reason, "ReconcileFailed");
        assert_eq!(ready.message, "quota exceeded");
    }
}

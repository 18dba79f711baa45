//! Merge planning - pure decision over live merge signals
//!
//! No I/O happens here. The caller fetches [`MergeSignals`] and hands the
//! resulting [`MergePlan`] to `execute_merge`.

use crate::types::{MergeMode, MergeSignals, MergeStateStatus, PrState};

/// What to do with the PR
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeAction {
    /// Queued, merged, or auto-merge already in place
    AlreadyHandled,
    /// Cannot be merged now
    Unmergeable(Vec<String>),
    /// Enable auto-merge with the configured strategy
    EnableAutoMerge,
    /// Merge right away
    MergeNow,
}

/// Merge plan - the functional core output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergePlan {
    /// Mode from configuration
    pub requested: MergeMode,
    /// Mode after coercion by host state
    pub effective: MergeMode,
    /// Cancel the standing auto-merge request before acting
    pub disable_auto_merge: bool,
    /// Final action
    pub action: MergeAction,
}

impl std::fmt::Display for MergePlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.action {
            MergeAction::AlreadyHandled => write!(f, "already handled"),
            MergeAction::Unmergeable(reasons) => {
                write!(f, "not mergeable")?;
                if !reasons.is_empty() {
                    write!(f, ": {}", reasons.join(", "))?;
                }
                Ok(())
            }
            MergeAction::EnableAutoMerge => write!(f, "enable auto-merge"),
            MergeAction::MergeNow => write!(f, "merge now ({})", self.effective),
        }
    }
}

/// Decide how to merge (PURE - no I/O, easily testable)
///
/// Returns `None` when merging is disabled. Order of checks:
/// 1. merge queue membership or an earlier merge short-circuits
/// 2. a base with a merge queue forces `auto` unless `admin`; otherwise
///    an unblocked status forces `immediate`
/// 3. an existing auto-merge request satisfies `auto`, any other mode
///    cancels it first
/// 4. mergeability gates everything but `auto`
#[must_use]
pub fn plan_merge(requested: MergeMode, signals: &MergeSignals) -> Option<MergePlan> {
    if requested == MergeMode::Disabled {
        return None;
    }

    let plan = |effective, disable_auto_merge, action| MergePlan {
        requested,
        effective,
        disable_auto_merge,
        action,
    };

    if signals.is_in_merge_queue || signals.merged {
        return Some(plan(requested, false, MergeAction::AlreadyHandled));
    }

    let effective = coerce_mode(requested, signals);

    let disable_auto_merge = match signals.auto_merge_request {
        Some(_) if effective == MergeMode::Auto => {
            return Some(plan(effective, false, MergeAction::AlreadyHandled));
        }
        Some(_) => true,
        None => false,
    };

    let blockers = blocking_reasons(effective, signals);
    let action = if !blockers.is_empty() {
        MergeAction::Unmergeable(blockers)
    } else if effective == MergeMode::Auto {
        MergeAction::EnableAutoMerge
    } else {
        MergeAction::MergeNow
    };

    Some(plan(effective, disable_auto_merge, action))
}

/// Merge queue beats clean status
fn coerce_mode(requested: MergeMode, signals: &MergeSignals) -> MergeMode {
    if signals.is_merge_queue_enabled && requested != MergeMode::Admin {
        MergeMode::Auto
    } else if signals.merge_state_status.is_unblocked() {
        MergeMode::Immediate
    } else {
        requested
    }
}

fn blocking_reasons(effective: MergeMode, signals: &MergeSignals) -> Vec<String> {
    if signals.state != PrState::Open {
        return vec![format!("PR is {}", signals.state)];
    }
    if effective == MergeMode::Auto {
        return Vec::new();
    }

    let mut reasons = Vec::new();
    if signals.is_draft {
        reasons.push("PR is a draft".to_string());
    }
    match signals.merge_state_status {
        MergeStateStatus::Blocked | MergeStateStatus::Behind if effective != MergeMode::Admin => {
            reasons.push(format!(
                "blocked by branch protection ({})",
                signals.merge_state_status
            ));
        }
        MergeStateStatus::Dirty => reasons.push("has merge conflicts".to_string()),
        _ => {}
    }
    reasons
}

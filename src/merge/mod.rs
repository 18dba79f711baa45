//! Merge state machine
//!
//! Two phases:
//! 1. Plan - `plan_merge` reconciles the requested mode with live signals (pure)
//! 2. Execute - `execute_merge` performs the plan (effectful)

mod execute;
mod plan;

pub use execute::{MergeTarget, execute_merge};
pub use plan::{MergeAction, MergePlan, plan_merge};

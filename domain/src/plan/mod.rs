//! Task plan domain
//!
//! A [`TaskPlan`] holds the ordered units of work; each [`Task`] keeps an
//! append-only history of [`PlanRevision`]s whose [`PlanItem`]s are completed
//! one at a time, lowest index first.

pub mod entities;
pub mod operations;

pub use entities::{PlanItem, PlanRevision, RevisionAuthor, Task, TaskPlan};
pub use operations::{
    active_plan_items, active_task, add_task, complete_plan_item, complete_task,
    completed_plan_items, create_task_plan, current_plan_item, remaining_plan_items, revise_plan,
};

//! Daily budget arithmetic shared by queue building and new-card promotion.
//!
//! Everything here is pure so that the numbers computed when a queue is
//! built match the ones used when cards are promoted.

use serde::{Deserialize, Serialize};

use crate::types::{DailyProgress, StudySettings};

/// Reviews per day when nothing else says otherwise.
pub const DEFAULT_DAILY_GOAL: u32 = 20;

/// New cards per day when the user has no settings.
pub const DEFAULT_NEW_LIMIT: u32 = 10;

/// Hard ceiling on new cards shown or promoted in a single day.
pub const SOFT_NEW_CAP: u32 = 50;

/// Largest goal override accepted; goals are stored as 32-bit integers.
pub const MAX_GOAL_OVERRIDE: i64 = i32::MAX as i64;

/// Resolve the day's review goal.
///
/// Precedence: per-day override, user setting, caller hint, built-in default.
/// The result is never below one.
pub fn effective_goal(
    goal_override: Option<u32>,
    settings_goal: Option<u32>,
    goal_hint: Option<u32>,
) -> u32 {
    goal_override
        .or(settings_goal)
        .or(goal_hint)
        .unwrap_or(DEFAULT_DAILY_GOAL)
        .max(1)
}

/// The user's configured new-card limit, with the default applied.
pub fn new_limit(settings: &StudySettings) -> u32 {
    settings.new_limit.unwrap_or(DEFAULT_NEW_LIMIT)
}

/// Budget for one queue build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueBudget {
    pub daily_goal: u32,
    pub reviews_done: u32,
    pub remaining_for_today: u32,
    pub new_limit: u32,
}

impl QueueBudget {
    pub fn resolve(
        progress: Option<&DailyProgress>,
        settings: &StudySettings,
        goal_hint: Option<u32>,
    ) -> Self {
        let goal_override = progress.and_then(|p| p.goal_override);
        let reviews_done = progress.map_or(0, |p| p.reviews_done);
        let daily_goal = effective_goal(goal_override, settings.daily_goal, goal_hint);

        Self {
            daily_goal,
            reviews_done,
            remaining_for_today: daily_goal.saturating_sub(reviews_done),
            new_limit: new_limit(settings).min(SOFT_NEW_CAP),
        }
    }

    /// Due cards to fetch.
    pub fn due_limit(&self) -> u32 {
        self.remaining_for_today
    }

    /// New cards to fetch once `due_selected` due cards are in the queue.
    pub fn new_limit_after(&self, due_selected: usize) -> u32 {
        let due_selected = u32::try_from(due_selected).unwrap_or(u32::MAX);
        let remaining_after_due = self.remaining_for_today.saturating_sub(due_selected);
        self.new_limit.min(remaining_after_due)
    }
}

/// How many new cards may still be introduced today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAllowance {
    pub new_limit: u32,
    pub introduced: u32,
    pub remaining: u32,
}

impl NewAllowance {
    pub fn resolve(progress: Option<&DailyProgress>, settings: &StudySettings) -> Self {
        let new_limit = new_limit(settings);
        let introduced = progress.map_or(0, |p| p.new_introduced);
        Self {
            new_limit,
            introduced,
            remaining: new_limit.saturating_sub(introduced),
        }
    }

    /// Cards to promote for a request; `None` asks for everything left.
    pub fn to_promote(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.remaining)
            .min(self.remaining)
            .min(SOFT_NEW_CAP)
    }

    /// Allowance left after `promoted` more cards were introduced.
    pub fn after(&self, promoted: u32) -> u32 {
        self.remaining.saturating_sub(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    fn progress(reviews_done: u32, new_introduced: u32, goal_override: Option<u32>) -> DailyProgress {
        DailyProgress {
            date_key: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            reviews_done,
            new_introduced,
            goal_override,
        }
    }

    #[test]
    fn goal_precedence() {
        assert_eq!(effective_goal(Some(5), Some(30), Some(40)), 5);
        assert_eq!(effective_goal(None, Some(30), Some(40)), 30);
        assert_eq!(effective_goal(None, None, Some(40)), 40);
        assert_eq!(effective_goal(None, None, None), DEFAULT_DAILY_GOAL);
    }

    #[test]
    fn goal_is_at_least_one() {
        assert_eq!(effective_goal(Some(0), None, None), 1);
        assert_eq!(effective_goal(None, Some(0), None), 1);
    }

    #[test]
    fn defaults_without_settings_or_progress() {
        let budget = QueueBudget::resolve(None, &StudySettings::default(), None);
        assert_eq!(budget.daily_goal, 20);
        assert_eq!(budget.remaining_for_today, 20);
        assert_eq!(budget.new_limit, 10);
        assert_eq!(budget.new_limit_after(5), 10);
    }

    #[test]
    fn nearly_done_day_leaves_room_for_two() {
        let settings = StudySettings {
            daily_goal: Some(20),
            new_limit: None,
        };
        let budget = QueueBudget::resolve(Some(&progress(18, 0, None)), &settings, None);
        assert_eq!(budget.due_limit(), 2);
        assert_eq!(budget.new_limit_after(2), 0);
    }

    #[test]
    fn finished_day_has_no_budget() {
        let budget =
            QueueBudget::resolve(Some(&progress(25, 0, None)), &StudySettings::default(), None);
        assert_eq!(budget.remaining_for_today, 0);
        assert_eq!(budget.new_limit_after(0), 0);
    }

    #[test]
    fn new_limit_is_soft_capped() {
        let settings = StudySettings {
            daily_goal: Some(500),
            new_limit: Some(1_000),
        };
        let budget = QueueBudget::resolve(None, &settings, None);
        assert_eq!(budget.new_limit, SOFT_NEW_CAP);
    }

    #[test]
    fn exhausted_allowance_promotes_nothing() {
        let settings = StudySettings {
            daily_goal: None,
            new_limit: Some(5),
        };
        let allowance = NewAllowance::resolve(Some(&progress(0, 5, None)), &settings);
        assert_eq!(allowance.remaining, 0);
        assert_eq!(allowance.to_promote(Some(3)), 0);
        assert_eq!(allowance.to_promote(None), 0);
    }

    #[test]
    fn promotion_clamps_request_to_allowance() {
        let allowance = NewAllowance::resolve(Some(&progress(0, 4, None)), &StudySettings::default());
        assert_eq!(allowance.remaining, 6);
        assert_eq!(allowance.to_promote(Some(100)), 6);
        assert_eq!(allowance.to_promote(Some(2)), 2);
        assert_eq!(allowance.to_promote(None), 6);
        assert_eq!(allowance.after(2), 4);
    }
}

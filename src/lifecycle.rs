//! Competition lifecycle policy.
//!
//! Live competitions lock on the clock; backfill competitions lock only
//! through an explicit finalize, since their period has already elapsed.

use crate::error::{AppError, AppResult};
use crate::models::{Competition, CompetitionMode, CompetitionStatus};
use chrono::NaiveDateTime;

/// Derived state of `competition` at `now`
pub fn status(competition: &Competition, now: NaiveDateTime) -> CompetitionStatus {
    match competition.mode_enum() {
        CompetitionMode::Backfill => {
            if competition.finalized {
                CompetitionStatus::Locked
            } else {
                CompetitionStatus::Open
            }
        }
        CompetitionMode::Live => {
            if now > competition.pick_window_end {
                CompetitionStatus::Locked
            } else if now < competition.pick_window_start {
                CompetitionStatus::Upcoming
            } else {
                CompetitionStatus::Open
            }
        }
    }
}

pub fn is_locked(competition: &Competition, now: NaiveDateTime) -> bool {
    match competition.mode_enum() {
        CompetitionMode::Backfill => competition.finalized,
        CompetitionMode::Live => now > competition.pick_window_end,
    }
}

pub fn can_join(competition: &Competition, now: NaiveDateTime) -> bool {
    !is_locked(competition, now)
}

pub fn can_edit_portfolio(competition: &Competition, now: NaiveDateTime) -> bool {
    !is_locked(competition, now)
}

/// Fail with `CompetitionLocked` when picks can no longer change
pub fn ensure_unlocked(competition: &Competition, now: NaiveDateTime) -> AppResult<()> {
    if is_locked(competition, now) {
        return Err(AppError::CompetitionLocked(format!(
            "{} no longer accepts picks",
            competition.name
        )));
    }
    Ok(())
}

/// Preconditions for locking a backfill competition
pub fn check_finalize(competition: &Competition, participant_count: usize) -> AppResult<()> {
    if !competition.is_backfill() {
        return Err(AppError::NotBackfill(competition.name.clone()));
    }
    if competition.finalized {
        return Err(AppError::AlreadyFinalized(competition.name.clone()));
    }
    if participant_count == 0 {
        return Err(AppError::EmptyCompetition(competition.name.clone()));
    }
    Ok(())
}

/// Preconditions for reopening a backfill competition
pub fn check_unfinalize(competition: &Competition) -> AppResult<()> {
    if !competition.is_backfill() {
        return Err(AppError::NotBackfill(competition.name.clone()));
    }
    if !competition.finalized {
        return Err(AppError::NotFinalized(competition.name.clone()));
    }
    Ok(())
}

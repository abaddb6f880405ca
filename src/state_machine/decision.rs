//! The advance/repeat rule applied at DECIDE

use super::state::{DecisionRecord, SessionContext, SessionState};
use crate::artifacts::{ProgressDecision, ProgressVerdict};

/// Both scores meet the passing threshold.
pub fn is_ready(state: &SessionState, ctx: &SessionContext) -> bool {
    state.quiz_score >= ctx.passing_threshold && state.assignment_score >= ctx.passing_threshold
}

/// This attempt is the last one the lesson allows.
pub fn is_final_attempt(state: &SessionState, ctx: &SessionContext) -> bool {
    ctx.max_attempts
        .is_some_and(|max| state.attempt_count.saturating_add(1) >= max)
}

/// Decide whether the learner moves on.
///
/// With `advice` the evaluator's verdict is used; without it the threshold rule
/// decides. Either way a repeat on the final allowed attempt becomes a forced
/// advance.
pub fn decide(
    state: &SessionState,
    ctx: &SessionContext,
    advice: Option<&ProgressDecision>,
) -> DecisionRecord {
    let ready = is_ready(state, ctx);
    let verdict = match advice {
        Some(advice) => advice.decision,
        None if ready => ProgressVerdict::Advance,
        None => ProgressVerdict::Repeat,
    };

    let mut reasoning = match advice {
        Some(advice) => advice.reasoning.clone(),
        None => threshold_reasoning(state, ctx, ready),
    };
    let focus_areas = match advice {
        Some(advice) if !advice.focus_areas.is_empty() => advice.focus_areas.clone(),
        _ => state.weak_points.clone(),
    };

    let forced = verdict == ProgressVerdict::Repeat && is_final_attempt(state, ctx);
    if forced {
        reasoning = format!(
            "{reasoning} Attempt limit of {} reached, moving on.",
            ctx.max_attempts.unwrap_or_default()
        );
    }

    DecisionRecord {
        verdict: if forced { ProgressVerdict::Advance } else { verdict },
        forced,
        reasoning,
        focus_areas,
    }
}

fn threshold_reasoning(state: &SessionState, ctx: &SessionContext, ready: bool) -> String {
    let relation = if ready { "meet" } else { "do not both meet" };
    format!(
        "Quiz {}% and assignment {}% {relation} the {}% threshold.",
        state.quiz_score, state.assignment_score, ctx.passing_threshold
    )
}

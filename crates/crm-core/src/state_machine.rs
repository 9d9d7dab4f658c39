use crate::error::StateMachineError;
use crate::types::LeadState;

/// Validates a lead state transition.
///
/// Staying in `Open` is allowed: most task outcomes keep the lead open while
/// moving its stage. Leaving `Closed`/`Dropped` is only legal towards `Open`,
/// and only the reopen handler and manual enquiry creation request that.
pub fn validate_transition(from: LeadState, to: LeadState) -> Result<(), StateMachineError> {
    if allowed(from, to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

pub fn allowed_transitions(from: LeadState) -> Vec<LeadState> {
    use LeadState::*;
    match from {
        Fresh => vec![Open, Junk],
        Open => vec![Open, Closed, Dropped, Junk],
        Closed => vec![Open],
        Dropped => vec![Open],
        Junk => vec![],
    }
}

/// States from which an explicit reopen is possible
#[inline]
#[must_use]
pub fn is_reopenable(state: LeadState) -> bool {
    matches!(state, LeadState::Closed | LeadState::Dropped)
}

fn allowed(from: LeadState, to: LeadState) -> bool {
    allowed_transitions(from).into_iter().any(|s| s == to)
}

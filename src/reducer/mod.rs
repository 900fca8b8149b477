//! The reducer: `(state, action) -> state`
//!
//! Each action runs against a draft copy of the state. Only branches a handler
//! touches are cloned, so the returned state shares every other `Arc` with its
//! input. A handler error or panic discards the draft; the caller gets the
//! input state back with `error_action` describing what went wrong.

pub mod action;
pub(crate) mod handlers;

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use chrono::Utc;
use serde_json::json;

use crate::error::EngineError;
use crate::state::{truncate_on_char_boundary, ErrorAction, State};
use action::Action;

/// Upper bound for the serialized action and state summary kept in an error
pub const ERROR_TEXT_LIMIT: usize = 4096;

/// Apply one action
pub fn reduce(state: &State, action: Action) -> State {
    let mut draft = state.clone();
    let outcome = catch_unwind(AssertUnwindSafe(|| handlers::dispatch(&mut draft, &action)));
    let error = match outcome {
        Ok(Ok(())) => return draft,
        Ok(Err(e)) => e,
        Err(payload) => EngineError::Panic(panic_message(payload.as_ref())),
    };
    log::error!("{} failed: {}", action.action_type(), error);
    let mut next = state.clone();
    next.error_action = Some(error_action(state, &action, &error));
    next
}

/// Apply an action received as JSON. Text that is not a known action leaves
/// the state unchanged.
pub fn reduce_json(state: &State, json: &str) -> State {
    match serde_json::from_str::<Action>(json) {
        Ok(action) => reduce(state, action),
        Err(e) => {
            log::warn!("Ignoring malformed action: {}", e);
            state.clone()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Compact description of the state an action failed on
fn summary(state: &State) -> String {
    let ids: Vec<&str> = state.data.iter().map(|s| s.id()).collect();
    json!({
        "activeTab": state.active_tab(),
        "spectra": ids,
        "activeSpectra": state.active_ids(),
        "xDomain": state.domain.x_domain,
        "yDomain": state.domain.y_domain,
        "selectedTool": state.tool.selected_tool,
    })
    .to_string()
}

fn error_action(state: &State, action: &Action, error: &EngineError) -> ErrorAction {
    let mut serialized = serde_json::to_string(action).unwrap_or_default();
    truncate_on_char_boundary(&mut serialized, ERROR_TEXT_LIMIT);
    let mut snapshot = summary(state);
    truncate_on_char_boundary(&mut snapshot, ERROR_TEXT_LIMIT);
    ErrorAction {
        action_type: action.action_type().to_string(),
        action: serialized,
        message: error.to_string(),
        snapshot,
        at: Utc::now(),
    }
}

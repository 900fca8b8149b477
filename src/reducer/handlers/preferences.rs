use crate::pipeline::DomainUpdateRules;
use crate::state::active::sync_display_mode;
use crate::state::domain::{set_domain, set_integrals_y_domain};
use crate::state::{preferences, Preferences, State};

/// Replace the preferences; tolerances feed the correlation builder at once
pub fn set_preferences(state: &mut State, preferences: Preferences) {
    if state.preferences == preferences {
        return;
    }
    state.preferences = preferences;
    state.rebuild_correlations();
}

pub fn save_key(state: &mut State, key: &str) {
    preferences::save_key(state, key);
    log::debug!("Saved view under key {}", key);
}

pub fn apply_key(state: &mut State, key: &str) {
    if !state.keys.contains_key(key) {
        log::debug!("apply_key: no snapshot for {}", key);
        return;
    }
    preferences::apply_key(state, key);
    if sync_display_mode(state) {
        set_domain(state, DomainUpdateRules::BOTH);
    }
    set_integrals_y_domain(state);
}

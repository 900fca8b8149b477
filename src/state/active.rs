/// Active tab and active-spectrum selection
use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::domain::set_domain;
use super::{ActiveSpectrum, DisplayMode, State};
use crate::error::EngineError;
use crate::pipeline::DomainUpdateRules;

/// Keyboard modifiers held while clicking a spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    #[default]
    None,
    Ctrl,
    Shift,
    ShiftCtrl,
}

/// Tab shown when none is chosen: a proton 1D tab if any, then any 1D tab,
/// then the first tab.
pub fn default_tab(state: &State) -> Option<String> {
    let tabs = state.tabs();
    tabs.iter()
        .find(|t| t.as_str() == "1H")
        .or_else(|| tabs.iter().find(|t| !t.contains(',')))
        .or_else(|| tabs.first())
        .cloned()
}

/// Display mode implied by the current selection; true when it changed
pub fn sync_display_mode(state: &mut State) -> bool {
    let mode = if state.active_is_fid() {
        DisplayMode::Time
    } else {
        DisplayMode::Frequency
    };
    let changed = state.view.spectra.display_mode != mode;
    state.view.spectra.display_mode = mode;
    changed
}

/// Switch tabs. Unknown tabs are ignored. The previous tab's zoom history is
/// dropped, any preview tool is cancelled and the domain is rebuilt.
pub fn set_active_tab(state: &mut State, tab: &str) -> Result<(), EngineError> {
    if !state.tabs().iter().any(|t| t == tab) {
        log::debug!("set_active_tab: unknown tab {}", tab);
        return Ok(());
    }
    if let Some(previous) = state.view.spectra.active_tab.clone() {
        if previous == tab {
            return Ok(());
        }
        state.view.zoom.history.remove(&previous);
    }
    state.reset_preview()?;
    state.view.spectra.active_tab = Some(tab.to_string());

    if !state.view.spectra.active_spectra.contains_key(tab) {
        let ids: Vec<String> = state.spectra_in_tab(tab).map(|s| s.id().to_string()).collect();
        let initial = match ids.as_slice() {
            [only] => vec![ActiveSpectrum {
                id: only.clone(),
                index: 0,
                selected: true,
            }],
            _ => Vec::new(),
        };
        if let Some(first) = initial.first() {
            state
                .view
                .spectra
                .selection_reference
                .insert(tab.to_string(), first.id.clone());
        }
        state.view.spectra.active_spectra.insert(tab.to_string(), initial);
    }
    sync_display_mode(state);
    set_domain(state, DomainUpdateRules::BOTH);
    Ok(())
}

/// Make sure a tab is active when spectra exist, and none when they do not
pub fn ensure_active_tab(state: &mut State) -> Result<(), EngineError> {
    let valid = state
        .active_tab()
        .map(|t| state.tabs().iter().any(|x| x == t))
        .unwrap_or(false);
    if valid {
        return Ok(());
    }
    match default_tab(state) {
        Some(tab) => set_active_tab(state, &tab),
        None => {
            state.view.spectra.active_tab = None;
            set_domain(state, DomainUpdateRules::BOTH);
            Ok(())
        }
    }
}

/// Update the selection of the active tab for a click on `id`
pub fn change_active_spectrum(state: &mut State, id: &str, modifier: Modifier) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    let ids: Vec<String> = state.spectra_in_tab(&tab).map(|s| s.id().to_string()).collect();
    let Some(index) = ids.iter().position(|x| x == id) else {
        log::debug!("change_active_spectrum: {} is not in tab {}", id, tab);
        return;
    };

    let current: BTreeSet<usize> = state
        .view
        .spectra
        .active_spectra
        .get(&tab)
        .map(|list| {
            list.iter()
                .filter_map(|a| ids.iter().position(|x| *x == a.id))
                .collect()
        })
        .unwrap_or_default();
    let reference = state
        .view
        .spectra
        .selection_reference
        .get(&tab)
        .and_then(|r| ids.iter().position(|x| x == r))
        .unwrap_or(index);
    let span: BTreeSet<usize> = (reference.min(index)..=reference.max(index)).collect();

    let mut new_reference = None;
    let selected: BTreeSet<usize> = match modifier {
        Modifier::None => {
            if current.len() == 1 && current.contains(&index) {
                BTreeSet::new()
            } else {
                new_reference = Some(index);
                BTreeSet::from([index])
            }
        }
        Modifier::Ctrl => {
            let mut set = current;
            if !set.remove(&index) {
                set.insert(index);
                new_reference = Some(index);
            }
            set
        }
        Modifier::Shift => span,
        Modifier::ShiftCtrl => current.union(&span).copied().collect(),
    };

    if let Some(r) = new_reference {
        state
            .view
            .spectra
            .selection_reference
            .insert(tab.clone(), ids[r].clone());
    } else if !state.view.spectra.selection_reference.contains_key(&tab) {
        state.view.spectra.selection_reference.insert(tab.clone(), id.to_string());
    }

    let list: Vec<ActiveSpectrum> = selected
        .into_iter()
        .map(|i| ActiveSpectrum {
            id: ids[i].clone(),
            index: i,
            selected: true,
        })
        .collect();
    state.view.spectra.active_spectra.insert(tab, list);

    if sync_display_mode(state) {
        log::debug!("Display mode now {:?}", state.view.spectra.display_mode);
        set_domain(state, DomainUpdateRules::BOTH);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::spectrum::Nucleus;
    use crate::test_support::{fid_spectrum, ft_2d_spectrum, ft_spectrum, state_with};

    fn four() -> State {
        state_with(
            ["A", "B", "C", "D"]
                .iter()
                .enumerate()
                .map(|(i, id)| ft_spectrum(id, Nucleus::H1, &[(1.0 + i as f64, 1.0)]))
                .collect(),
        )
    }

    fn selected(state: &State) -> Vec<String> {
        state.active_ids()
    }

    #[test]
    fn test_plain_click_selects_and_deselects() {
        let mut state = four();
        change_active_spectrum(&mut state, "B", Modifier::None);
        assert_eq!(selected(&state), vec!["B"]);
        change_active_spectrum(&mut state, "C", Modifier::None);
        assert_eq!(selected(&state), vec!["C"]);
        change_active_spectrum(&mut state, "C", Modifier::None);
        assert!(selected(&state).is_empty());
    }

    #[test]
    fn test_ctrl_toggles() {
        let mut state = four();
        change_active_spectrum(&mut state, "A", Modifier::None);
        change_active_spectrum(&mut state, "C", Modifier::Ctrl);
        assert_eq!(selected(&state), vec!["A", "C"]);
        change_active_spectrum(&mut state, "A", Modifier::Ctrl);
        assert_eq!(selected(&state), vec!["C"]);
    }

    #[test]
    fn test_shift_range_is_direction_independent() {
        let mut forward = four();
        change_active_spectrum(&mut forward, "A", Modifier::None);
        change_active_spectrum(&mut forward, "D", Modifier::Shift);

        let mut backward = four();
        change_active_spectrum(&mut backward, "D", Modifier::None);
        change_active_spectrum(&mut backward, "A", Modifier::Shift);

        assert_eq!(selected(&forward), vec!["A", "B", "C", "D"]);
        assert_eq!(selected(&backward), vec!["A", "B", "C", "D"]);
        let indices: Vec<usize> = forward.active_spectra().iter().map(|a| a.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_shift_replaces_and_shift_ctrl_unions() {
        let mut state = four();
        change_active_spectrum(&mut state, "D", Modifier::None);
        change_active_spectrum(&mut state, "A", Modifier::Ctrl);
        // reference moved to A
        change_active_spectrum(&mut state, "B", Modifier::Shift);
        assert_eq!(selected(&state), vec!["A", "B"]);

        let mut state = four();
        change_active_spectrum(&mut state, "D", Modifier::None);
        change_active_spectrum(&mut state, "A", Modifier::Ctrl);
        change_active_spectrum(&mut state, "B", Modifier::ShiftCtrl);
        assert_eq!(selected(&state), vec!["A", "B", "D"]);
    }

    #[test]
    fn test_unknown_id_is_noop() {
        let mut state = four();
        change_active_spectrum(&mut state, "B", Modifier::None);
        change_active_spectrum(&mut state, "nope", Modifier::None);
        assert_eq!(selected(&state), vec!["B"]);
    }

    #[test]
    fn test_fid_selection_switches_display_mode() {
        let mut state = state_with(vec![
            ft_spectrum("ft", Nucleus::H1, &[(2.0, 1.0)]),
            fid_spectrum("fid", 256),
        ]);
        change_active_spectrum(&mut state, "fid", Modifier::None);
        assert_eq!(state.view.spectra.display_mode, DisplayMode::Time);
        assert!(state.domain.x_domain[1] < 1.0, "time axis in seconds");
        change_active_spectrum(&mut state, "ft", Modifier::None);
        assert_eq!(state.view.spectra.display_mode, DisplayMode::Frequency);
        assert!(state.domain.x_domain[1] > 9.0);
    }

    #[test]
    fn test_tab_switch_clears_history_and_ignores_unknown() {
        let mut state = state_with(vec![
            ft_spectrum("h", Nucleus::H1, &[(2.0, 1.0)]),
            ft_2d_spectrum("hsqc", &[(2.0, 40.0, 1.0)]),
        ]);
        assert_eq!(state.active_tab(), Some("1H"));
        crate::state::zoom::brush_end(&mut state, 1.0, 3.0, None);
        set_active_tab(&mut state, "1H,13C").unwrap();
        assert!(state.view.zoom.history.get("1H").is_none());
        assert_eq!(state.active_ids(), vec!["hsqc"]);
        set_active_tab(&mut state, "19F").unwrap();
        assert_eq!(state.active_tab(), Some("1H,13C"));
    }

    #[test]
    fn test_reselecting_current_tab_keeps_history() {
        let mut state = state_with(vec![ft_spectrum("h", Nucleus::H1, &[(2.0, 1.0)])]);
        crate::state::zoom::brush_end(&mut state, 1.0, 3.0, None);
        let domain = state.domain.clone();
        set_active_tab(&mut state, "1H").unwrap();
        assert_eq!(state.view.zoom.history["1H"].len(), 1);
        assert_eq!(state.domain, domain);
    }
}

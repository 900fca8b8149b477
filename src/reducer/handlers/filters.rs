use super::integrals::refresh_integrations;
use super::update_view;
use crate::error::EngineError;
use crate::pipeline::processing::auto_phase;
use crate::pipeline::{manager, DomainUpdateRules, FilterKind};
use crate::state::active::sync_display_mode;
use crate::state::domain::set_domain;
use crate::state::{State, Tool};

/// Shared tail of every filter commit: leave preview mode, recompute the
/// integrations of the touched spectra and refresh the view.
fn commit(state: &mut State, touched: &[String], mut rules: DomainUpdateRules) {
    for id in touched {
        refresh_integrations(state, id);
    }
    if state.tool.selected_tool.is_preview() {
        state.tool.selected_tool = Tool::Zoom;
    }
    state.tool.baseline_zones.clear();
    if sync_display_mode(state) {
        rules = DomainUpdateRules::BOTH;
    }
    update_view(state, rules);
}

/// Spectrum owning the filter `filter_id`
fn owner_of(state: &State, filter_id: &str) -> Option<String> {
    state
        .data
        .iter()
        .find(|s| s.filters().iter().any(|f| f.id == filter_id))
        .map(|s| s.id().to_string())
}

pub fn apply_filters(
    state: &mut State,
    kinds: &[FilterKind],
    filter_index: Option<usize>,
) -> Result<(), EngineError> {
    let ids = state.active_ids();
    if ids.is_empty() || kinds.is_empty() {
        log::debug!("apply_filters: no active spectrum or no filter");
        return Ok(());
    }
    // A preview works on a snapshot; the commit replays from pristine data
    state.clear_temp_data();
    let mut rules = DomainUpdateRules::NONE;
    for id in &ids {
        let Some(spectrum) = state.spectrum_mut(id) else { continue };
        rules |= manager::apply_filters(spectrum, kinds.to_vec(), filter_index)?;
    }
    state.tool.active_filter_id = None;
    commit(state, &ids, rules);
    Ok(())
}

/// Show the effect of `kind` on the active 1D spectra without committing it
pub fn preview_filter(state: &mut State, kind: &FilterKind) -> Result<(), EngineError> {
    let ids = state.active_ids();
    for id in &ids {
        let Some(spectrum) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) else {
            continue;
        };
        manager::preview(spectrum, kind)?;
    }
    if !ids.is_empty() {
        set_domain(state, kind.domain_rules() | DomainUpdateRules::Y);
    }
    Ok(())
}

pub fn enable_filter(state: &mut State, filter_id: &str, enabled: bool) -> Result<(), EngineError> {
    let Some(id) = owner_of(state, filter_id) else {
        log::debug!("enable_filter: no spectrum owns filter {}", filter_id);
        return Ok(());
    };
    state.clear_temp_data();
    let rules = match state.spectrum_mut(&id) {
        Some(spectrum) => manager::enable_filter(spectrum, filter_id, enabled)?,
        None => return Ok(()),
    };
    commit(state, &[id], rules);
    Ok(())
}

pub fn delete_filter(state: &mut State, filter_id: &str) -> Result<(), EngineError> {
    let Some(id) = owner_of(state, filter_id) else {
        log::debug!("delete_filter: no spectrum owns filter {}", filter_id);
        return Ok(());
    };
    state.clear_temp_data();
    let rules = match state.spectrum_mut(&id) {
        Some(spectrum) => manager::delete_filter(spectrum, filter_id)?,
        None => return Ok(()),
    };
    if state.tool.active_filter_id.as_deref() == Some(filter_id) {
        state.tool.active_filter_id = None;
    }
    commit(state, &[id], rules);
    Ok(())
}

/// Delete every filter called `name` from the spectra of the active tab
pub fn delete_spectra_filter(state: &mut State, name: &str) -> Result<(), EngineError> {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return Ok(());
    };
    let ids: Vec<String> = state
        .spectra_in_tab(&tab)
        .filter(|s| s.filters().iter().any(|f| f.name() == name))
        .map(|s| s.id().to_string())
        .collect();
    if ids.is_empty() {
        return Ok(());
    }
    state.clear_temp_data();
    let mut rules = DomainUpdateRules::NONE;
    for id in &ids {
        if let Some(spectrum) = state.spectrum_mut(id) {
            rules |= manager::delete_filters_by_name(spectrum, name)?;
        }
    }
    commit(state, &ids, rules);
    Ok(())
}

/// Show the active spectra as they were just before `filter_id`, or restore
/// the full chain when `filter_id` is `None`
pub fn set_filter_snapshot(state: &mut State, filter_id: Option<&str>) -> Result<(), EngineError> {
    let ids = state.active_ids();
    state.clear_temp_data();
    let mut rules = DomainUpdateRules::NONE;
    for id in &ids {
        let Some(spectrum) = state.spectrum_mut(id) else { continue };
        rules |= match filter_id {
            Some(filter_id) => manager::rollback_to(spectrum, filter_id)?,
            None => manager::reapply_filters(spectrum, None)?,
        };
    }
    state.tool.active_filter_id = filter_id.map(str::to_string);
    if sync_display_mode(state) {
        rules = DomainUpdateRules::BOTH;
    }
    update_view(state, rules);
    Ok(())
}

/// Estimate zero and first order phases of the active spectrum and commit
/// them as its phase correction
pub fn auto_phase_correction(state: &mut State) -> Result<(), EngineError> {
    let Some(id) = state.active_spectrum().map(|a| a.id.clone()) else {
        return Ok(());
    };
    let Some(spectrum) = state.spectrum(&id) else {
        return Ok(());
    };
    if !spectrum.is_1d() || spectrum.is_fid() {
        log::debug!("auto_phase_correction: {} is not a 1D frequency spectrum", id);
        return Ok(());
    }
    // Estimate on the chain without the current phase correction
    let mut scratch = spectrum.clone();
    manager::delete_filters_by_name(&mut scratch, "phaseCorrection")?;
    let Some(data) = scratch.as_1d().map(|s| &s.data) else {
        return Ok(());
    };
    let (ph0, ph1) = auto_phase(data);
    log::info!("Auto phase for {}: ph0={:.1} ph1={:.1}", id, ph0, ph1);

    state.clear_temp_data();
    let rules = match state.spectrum_mut(&id) {
        Some(spectrum) => {
            manager::apply_filters(spectrum, vec![FilterKind::PhaseCorrection { ph0, ph1 }], None)?
        }
        None => return Ok(()),
    };
    commit(state, &[id], rules);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::data::spectrum::Nucleus;
    use crate::pipeline::{FilterKind, WindowFunction};
    use crate::reducer::action::{Action, Modifier};
    use crate::reducer::reduce;
    use crate::state::{DisplayMode, State, Tool};
    use crate::test_support::{fid_spectrum, ft_spectrum, state_with};

    fn fid_state() -> State {
        // a single spectrum in its tab is selected on load
        state_with(vec![fid_spectrum("fid", 256)])
    }

    fn chain() -> Vec<FilterKind> {
        vec![
            FilterKind::Apodization(WindowFunction::Exponential { lb_hz: 1.0 }),
            FilterKind::ZeroFilling { size: 512 },
            FilterKind::Fft,
        ]
    }

    fn apply(state: &State, filters: Vec<FilterKind>) -> State {
        reduce(state, Action::ApplyFilters { filters, filter_index: None })
    }

    #[test]
    fn test_fft_switches_to_frequency_domain() {
        let state = fid_state();
        assert_eq!(state.view.spectra.display_mode, DisplayMode::Time);
        let state = apply(&state, chain());
        assert!(state.error_action.is_none(), "{:?}", state.error_action);
        let s = state.spectrum("fid").unwrap().as_1d().unwrap();
        assert_eq!(s.data.len(), 512);
        assert!(!s.info.is_fid);
        assert_eq!(state.view.spectra.display_mode, DisplayMode::Frequency);
        assert!(state.domain.x_domain[1] > 1.0, "ppm axis");
    }

    #[test]
    fn test_disable_and_delete_restore_data() {
        let state = apply(&fid_state(), chain());
        let filters = state.spectrum("fid").unwrap().filters().to_vec();
        let fft_id = filters[2].id.clone();

        let disabled = reduce(&state, Action::EnableFilter { id: fft_id.clone(), enabled: false });
        let s = disabled.spectrum("fid").unwrap();
        assert!(s.is_fid());
        assert_eq!(s.filters().len(), 3);
        assert_eq!(disabled.view.spectra.display_mode, DisplayMode::Time);

        let enabled = reduce(&disabled, Action::EnableFilter { id: fft_id.clone(), enabled: true });
        assert_eq!(
            enabled.spectrum("fid").unwrap().as_1d().unwrap().data,
            state.spectrum("fid").unwrap().as_1d().unwrap().data
        );

        let deleted = reduce(&state, Action::DeleteFilter { id: fft_id });
        assert_eq!(deleted.spectrum("fid").unwrap().filters().len(), 2);
        assert!(deleted.spectrum("fid").unwrap().is_fid());
    }

    #[test]
    fn test_failing_filter_leaves_state_untouched() {
        let state = apply(&fid_state(), chain());
        let failed = apply(&state, vec![FilterKind::Fft, FilterKind::ZeroFilling { size: 0 }]);
        assert!(Arc::ptr_eq(&failed.data, &state.data));
        let error = failed.error_action.as_ref().unwrap();
        assert_eq!(error.action_type, "APPLY_FILTERS");
    }

    #[test]
    fn test_preview_then_reset_restores_data() {
        let state = apply(&fid_state(), chain());
        let committed = state.spectrum("fid").unwrap().as_1d().unwrap().data.clone();
        let state = reduce(&state, Action::SetSelectedTool { tool: Tool::PhaseCorrection });
        let state = reduce(
            &state,
            Action::PreviewFilter {
                filter: FilterKind::PhaseCorrection { ph0: 90.0, ph1: 0.0 },
            },
        );
        let s = state.spectrum("fid").unwrap().as_1d().unwrap();
        assert!(s.temp_data.is_some());
        assert_ne!(s.data, committed);

        // a second preview starts from the same snapshot
        let again = reduce(
            &state,
            Action::PreviewFilter {
                filter: FilterKind::PhaseCorrection { ph0: 90.0, ph1: 0.0 },
            },
        );
        assert_eq!(again.spectrum("fid").unwrap().as_1d().unwrap().data, s.data);

        let reset = reduce(&again, Action::ResetSelectedTool);
        let s = reset.spectrum("fid").unwrap().as_1d().unwrap();
        assert!(s.temp_data.is_none());
        assert_eq!(s.data, committed);
        assert_eq!(reset.tool.selected_tool, Tool::Zoom);
    }

    #[test]
    fn test_commit_after_preview_clears_snapshot() {
        let state = apply(&fid_state(), chain());
        let state = reduce(&state, Action::SetSelectedTool { tool: Tool::PhaseCorrection });
        let state = reduce(
            &state,
            Action::PreviewFilter {
                filter: FilterKind::PhaseCorrection { ph0: 45.0, ph1: 0.0 },
            },
        );
        let state = apply(&state, vec![FilterKind::PhaseCorrection { ph0: 45.0, ph1: 0.0 }]);
        assert!(state.data.iter().all(|s| !s.has_temp_data()));
        assert_eq!(state.spectrum("fid").unwrap().filters().len(), 4);
        assert_eq!(state.tool.selected_tool, Tool::Zoom);
    }

    #[test]
    fn test_snapshot_rolls_back_and_restores() {
        let state = apply(&fid_state(), chain());
        let zf_id = state.spectrum("fid").unwrap().filters()[1].id.clone();
        let rolled = reduce(&state, Action::SetFilterSnapshot { id: Some(zf_id.clone()) });
        let s = rolled.spectrum("fid").unwrap();
        assert!(s.is_fid());
        assert_eq!(s.as_1d().unwrap().data.len(), 256);
        assert_eq!(s.filters().len(), 3);
        assert_eq!(rolled.tool.active_filter_id.as_deref(), Some(zf_id.as_str()));

        let restored = reduce(&rolled, Action::SetFilterSnapshot { id: None });
        assert_eq!(
            restored.spectrum("fid").unwrap().as_1d().unwrap().data,
            state.spectrum("fid").unwrap().as_1d().unwrap().data
        );
        assert!(restored.tool.active_filter_id.is_none());
    }

    #[test]
    fn test_delete_by_name_in_active_tab() {
        let state = state_with(vec![fid_spectrum("a", 128), fid_spectrum("b", 128)]);
        let mut state = state;
        for (id, modifier) in [("a", Modifier::None), ("b", Modifier::Ctrl)] {
            state = reduce(&state, Action::ChangeActiveSpectrum { id: id.into(), modifier });
        }
        let state = apply(&state, chain());
        assert!(state.data.iter().all(|s| !s.is_fid()));
        let state = reduce(&state, Action::DeleteSpectraFilter { name: "fft".into() });
        assert!(state.data.iter().all(|s| s.is_fid() && s.filters().len() == 2));
    }

    #[test]
    fn test_auto_phase_adds_phase_filter() {
        let state = state_with(vec![ft_spectrum("ft", Nucleus::H1, &[(2.0, 5.0)])]);
        let state = reduce(&state, Action::AutoPhaseCorrection);
        assert!(state.error_action.is_none(), "{:?}", state.error_action);
        let filters = state.spectrum("ft").unwrap().filters();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].name(), "phaseCorrection");

        // on time-domain data it is ignored
        let fid = fid_state();
        let after = reduce(&fid, Action::AutoPhaseCorrection);
        assert!(Arc::ptr_eq(&after.data, &fid.data));
    }
}

//! One module per action family. Every handler mutates the draft state in
//! place and returns `Err` only for genuine failures; gestures that do not
//! apply to the current state are logged and ignored.

pub(crate) mod filters;
pub(crate) mod integrals;
pub(crate) mod molecules;
pub(crate) mod peaks;
pub(crate) mod preferences;
pub(crate) mod ranges;
pub(crate) mod spectra;
pub(crate) mod tools;
pub(crate) mod view;
pub(crate) mod zones;

use super::action::Action;
use crate::error::EngineError;
use crate::pipeline::DomainUpdateRules;
use crate::state::domain::{set_domain, set_integrals_y_domain};
use crate::state::State;

/// Route an action to its handler
pub(crate) fn dispatch(state: &mut State, action: &Action) -> Result<(), EngineError> {
    match action {
        Action::LoadSpectra { spectra: list } => spectra::load_spectra(state, list),
        Action::LoadDocument(doc) => spectra::load_document(state, doc.clone()),
        Action::DeleteSpectra { ids } => spectra::delete_spectra(state, ids.as_deref()),
        Action::ChangeSpectrumVisibility { id, is_visible } => {
            spectra::change_visibility(state, id, *is_visible);
            Ok(())
        }
        Action::ChangeSpectrumColor { id, color } => {
            spectra::change_color(state, id, color);
            Ok(())
        }

        Action::ApplyFilters {
            filters: kinds,
            filter_index,
        } => filters::apply_filters(state, kinds, *filter_index),
        Action::PreviewFilter { filter } => filters::preview_filter(state, filter),
        Action::EnableFilter { id, enabled } => filters::enable_filter(state, id, *enabled),
        Action::DeleteFilter { id } => filters::delete_filter(state, id),
        Action::DeleteSpectraFilter { name } => filters::delete_spectra_filter(state, name),
        Action::SetFilterSnapshot { id } => filters::set_filter_snapshot(state, id.as_deref()),
        Action::AutoPhaseCorrection => filters::auto_phase_correction(state),

        Action::AddPeak { x } => {
            peaks::add_peak(state, *x);
            Ok(())
        }
        Action::AddPeaks { from, to } => {
            peaks::add_peaks(state, *from, *to);
            Ok(())
        }
        Action::DeletePeak { id } => {
            peaks::delete_peak(state, id.as_deref());
            Ok(())
        }
        Action::AutoPeakPicking { options } => {
            peaks::auto_peak_picking(state, options.as_ref());
            Ok(())
        }
        Action::TogglePeakMarkers => {
            peaks::toggle_markers(state);
            Ok(())
        }

        Action::AddIntegral { from, to } => {
            integrals::add_integral(state, *from, *to);
            Ok(())
        }
        Action::ResizeIntegral { id, from, to } => {
            integrals::resize_integral(state, id, *from, *to);
            Ok(())
        }
        Action::DeleteIntegral { id } => {
            integrals::delete_integral(state, id.as_deref());
            Ok(())
        }
        Action::ChangeIntegralsSumOptions { options } => {
            integrals::change_sum_options(state, options);
            Ok(())
        }

        Action::AutoRangesDetection { options } => {
            ranges::auto_ranges_detection(state, options.as_ref());
            Ok(())
        }
        Action::AddRange { from, to } => {
            ranges::add_range(state, *from, *to);
            Ok(())
        }
        Action::ResizeRange { id, from, to } => {
            ranges::resize_range(state, id, *from, *to);
            Ok(())
        }
        Action::DeleteRange { id } => {
            ranges::delete_range(state, id.as_deref());
            Ok(())
        }
        Action::ChangeRangesSumOptions { options } => {
            ranges::change_sum_options(state, options);
            Ok(())
        }
        Action::ChangeRangeRelativeValue { id, value } => {
            ranges::change_relative_value(state, id, *value);
            Ok(())
        }
        Action::ChangeRangeSignalValue {
            range_id,
            signal_id,
            delta,
        } => {
            ranges::change_signal_value(state, range_id, signal_id, *delta);
            Ok(())
        }
        Action::ChangeRangeKind { id, kind } => {
            ranges::change_kind(state, id, *kind);
            Ok(())
        }
        Action::ToggleRangesViewProperty { flag } => {
            ranges::toggle_view_property(state, *flag);
            Ok(())
        }

        Action::AutoZonesDetection { options } => {
            zones::auto_zones_detection(state, options.as_ref());
            Ok(())
        }
        Action::AddZone { x1, x2, y1, y2 } => {
            zones::add_zone(state, [*x1, *x2], [*y1, *y2]);
            Ok(())
        }
        Action::DeleteZone { id } => {
            zones::delete_zone(state, id.as_deref());
            Ok(())
        }
        Action::ChangeZoneSignalValue {
            zone_id,
            signal_id,
            x_delta,
            y_delta,
        } => {
            zones::change_signal_value(state, zone_id, signal_id, *x_delta, *y_delta);
            Ok(())
        }
        Action::ToggleZonesPeaks => {
            zones::toggle_peaks(state);
            Ok(())
        }

        Action::SetActiveTab { tab } => view::set_active_tab(state, tab),
        Action::ChangeActiveSpectrum { id, modifier } => {
            view::change_active_spectrum(state, id, *modifier)
        }
        Action::SetZoom { scale, spectrum_id } => {
            view::set_zoom(state, *scale, spectrum_id.as_deref());
            Ok(())
        }
        Action::WheelZoom {
            direction,
            spectrum_id,
        } => {
            view::wheel_zoom(state, *direction, spectrum_id.as_deref());
            Ok(())
        }
        Action::BrushEnd {
            start_x,
            end_x,
            start_y,
            end_y,
        } => {
            let y = (*start_y).zip(*end_y);
            view::brush_end(state, *start_x, *end_x, y);
            Ok(())
        }
        Action::SetXDomain { x_domain } => {
            view::set_x_domain(state, *x_domain);
            Ok(())
        }
        Action::FullZoomOut { kind } => {
            view::full_zoom_out(state, *kind);
            Ok(())
        }
        Action::SetVerticalAlign { align } => {
            view::set_vertical_align(state, *align);
            Ok(())
        }

        Action::SetSelectedTool { tool } => tools::set_selected_tool(state, *tool),
        Action::ResetSelectedTool => tools::reset_selected_tool(state),
        Action::AddBaselineZone { from, to } => tools::add_baseline_zone(state, *from, *to),
        Action::DeleteBaselineZone { id } => tools::delete_baseline_zone(state, id),
        Action::SetVerticalIndicator { position } => {
            state.view.vertical_indicator = *position;
            Ok(())
        }

        Action::AddMolecule {
            molfile,
            label,
            formula,
        } => {
            molecules::add_molecule(state, molfile, label.as_deref(), formula.as_deref());
            Ok(())
        }
        Action::DeleteMolecule { id } => {
            molecules::delete_molecule(state, id);
            Ok(())
        }
        Action::SetCorrelationsMf { mf } => {
            molecules::set_correlations_mf(state, mf.clone());
            Ok(())
        }
        Action::SetCorrelationsTolerance { tolerance } => {
            molecules::set_correlations_tolerance(state, tolerance);
            Ok(())
        }
        Action::SetCorrelation {
            id,
            equivalence,
            hybridization,
        } => {
            molecules::set_correlation(state, id, *equivalence, hybridization.clone());
            Ok(())
        }

        Action::SetPreferences { preferences: prefs } => {
            preferences::set_preferences(state, prefs.clone());
            Ok(())
        }
        Action::SetKeyPreferences { key } => {
            preferences::save_key(state, key);
            Ok(())
        }
        Action::ApplyKeyPreferences { key } => {
            preferences::apply_key(state, key);
            Ok(())
        }
        Action::ClearError => {
            state.error_action = None;
            Ok(())
        }
    }
}

/// Finalize a committing action: drop preview snapshots, refresh the axis
/// domains the change may have moved, then the integral extents and the
/// correlations.
pub(crate) fn update_view(state: &mut State, rules: DomainUpdateRules) {
    state.clear_temp_data();
    if rules.any() {
        set_domain(state, rules);
    }
    set_integrals_y_domain(state);
    state.rebuild_correlations();
}

/// Finalize an annotation edit
pub(crate) fn update_annotations(state: &mut State) {
    set_integrals_y_domain(state);
    state.rebuild_correlations();
}

/// The single active spectrum when it is a frequency-domain 1D spectrum
pub(crate) fn active_ft_1d(state: &State) -> Option<String> {
    let active = state.active_spectrum()?;
    let spectrum = state.spectrum(&active.id)?;
    if spectrum.is_1d() && !spectrum.is_fid() {
        Some(active.id.clone())
    } else {
        log::debug!("Active spectrum {} is not a 1D frequency spectrum", active.id);
        None
    }
}

/// The single active spectrum when it is a frequency-domain 2D spectrum
pub(crate) fn active_ft_2d(state: &State) -> Option<String> {
    let active = state.active_spectrum()?;
    let spectrum = state.spectrum(&active.id)?;
    if !spectrum.is_1d() && !spectrum.is_fid() {
        Some(active.id.clone())
    } else {
        log::debug!("Active spectrum {} is not a 2D frequency spectrum", active.id);
        None
    }
}

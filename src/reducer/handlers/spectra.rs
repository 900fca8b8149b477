use std::collections::BTreeSet;
use std::sync::Arc;

use super::update_view;
use crate::data::document::NmriumDocument;
use crate::data::spectrum::{next_color, next_contour_colors, Spectrum};
use crate::error::EngineError;
use crate::pipeline::{manager, DomainUpdateRules};
use crate::state::active::{ensure_active_tab, sync_display_mode};
use crate::state::domain::{clamp_to, set_domain, set_integrals_y_domain};
use crate::state::{ActiveSpectrum, State};

fn used_colors(state: &State) -> Vec<String> {
    state
        .data
        .iter()
        .map(|s| match s.as_ref() {
            Spectrum::OneD(s) => s.display.color.clone(),
            Spectrum::TwoD(s) => s.display.positive_color.clone(),
        })
        .collect()
}

/// Give `spectrum` the first palette color no other spectrum uses
fn assign_color(spectrum: &mut Spectrum, used: &[String]) {
    let used: Vec<&str> = used.iter().map(String::as_str).collect();
    match spectrum {
        Spectrum::OneD(s) => s.display.color = next_color(&used),
        Spectrum::TwoD(s) => {
            let (positive, negative) = next_contour_colors(&used);
            s.display.positive_color = positive;
            s.display.negative_color = negative;
        }
    }
}

fn color_of(spectrum: &Spectrum) -> &str {
    match spectrum {
        Spectrum::OneD(s) => &s.display.color,
        Spectrum::TwoD(s) => &s.display.positive_color,
    }
}

/// Append already processed spectra. Duplicate ids are skipped; a spectrum
/// gets a palette color when `recolor` says its own one should not be kept.
fn insert_spectra(
    state: &mut State,
    spectra: Vec<Spectrum>,
    recolor: impl Fn(&Spectrum, &[String]) -> bool,
) -> usize {
    let mut used = used_colors(state);
    let mut added = 0;
    for mut spectrum in spectra {
        if spectrum.id().is_empty() {
            spectrum.set_id(uuid::Uuid::new_v4().to_string());
        }
        if state.spectrum(spectrum.id()).is_some() {
            log::warn!("Spectrum {} is already loaded, skipping", spectrum.id());
            continue;
        }
        if recolor(&spectrum, &used) {
            assign_color(&mut spectrum, &used);
        }
        used.push(color_of(&spectrum).to_string());
        log::info!(
            "Loaded spectrum {} ({}, {})",
            spectrum.id(),
            spectrum.tab_key(),
            if spectrum.is_fid() { "FID" } else { "FT" }
        );
        Arc::make_mut(&mut state.data).push(Arc::new(spectrum));
        added += 1;
    }
    added
}

fn finish_load(state: &mut State) -> Result<(), EngineError> {
    ensure_active_tab(state)?;
    sync_display_mode(state);
    set_domain(state, DomainUpdateRules::BOTH);
    set_integrals_y_domain(state);
    state.rebuild_correlations();
    Ok(())
}

/// Add spectra to the dataset, replaying their filter lists
pub fn load_spectra(state: &mut State, spectra: &[Spectrum]) -> Result<(), EngineError> {
    let mut prepared = Vec::with_capacity(spectra.len());
    for spectrum in spectra {
        let mut spectrum = spectrum.clone();
        manager::replay(&mut spectrum)?;
        prepared.push(spectrum);
    }
    let added = insert_spectra(state, prepared, |s, used| {
        let color = color_of(s);
        color.is_empty() || used.iter().any(|c| c == color)
    });
    if added == 0 {
        return Ok(());
    }
    finish_load(state)
}

/// Merge an exchange document into the state
pub fn load_document(state: &mut State, doc: NmriumDocument) -> Result<(), EngineError> {
    doc.check_version()?;
    let NmriumDocument { data, view, .. } = doc;

    let mut spectra = Vec::with_capacity(data.spectra.len());
    let mut keep_color = BTreeSet::new();
    for entry in data.spectra {
        let has_display = entry.has_display();
        let spectrum = entry.into_spectrum()?;
        if has_display {
            keep_color.insert(spectrum.id().to_string());
        }
        spectra.push(spectrum);
    }
    insert_spectra(state, spectra, |s, _| !keep_color.contains(s.id()));

    let molecules = Arc::make_mut(&mut state.molecules);
    for molecule in data.molecules {
        if !molecules.iter().any(|m| m.id == molecule.id) {
            molecules.push(molecule);
        }
    }
    if let Some(correlations) = data.correlations {
        state.correlations = Arc::new(correlations);
    }

    let tabs = state.tabs();
    for (tab, ids) in view.active_spectra {
        if !tabs.contains(&tab) {
            continue;
        }
        let in_tab: Vec<String> = state.spectra_in_tab(&tab).map(|s| s.id().to_string()).collect();
        let active: Vec<ActiveSpectrum> = ids
            .iter()
            .filter_map(|id| {
                in_tab.iter().position(|x| x == id).map(|index| ActiveSpectrum {
                    id: id.clone(),
                    index,
                    selected: true,
                })
            })
            .collect();
        if let Some(first) = active.first() {
            state
                .view
                .spectra
                .selection_reference
                .insert(tab.clone(), first.id.clone());
        }
        state.view.spectra.active_spectra.insert(tab, active);
    }
    if let Some(tab) = view.active_tab.filter(|t| tabs.contains(t)) {
        state.view.spectra.active_tab = Some(tab);
    }
    state.view.vertical_align.extend(view.vertical_align);
    state.view.peaks.extend(view.peaks);
    state.view.ranges.extend(view.ranges);
    state.view.zones.extend(view.zones);
    let scales: Vec<(String, f64)> = view
        .zoom
        .vertical_scales
        .into_iter()
        .filter(|(id, _)| state.spectrum(id).is_some())
        .collect();
    state.view.zoom.vertical_scales.extend(scales);

    finish_load(state)?;
    if let Some(x) = view.zoom.x_domain {
        state.domain.x_domain = clamp_to(x, state.domain.origin_domain.x_domain);
    }
    Ok(())
}

/// Rebuild `ActiveSpectrum::index` after spectra were removed, dropping
/// entries whose spectrum is gone
fn reindex_active(state: &mut State) {
    let tabs = state.tabs();
    let mut active = std::mem::take(&mut state.view.spectra.active_spectra);
    active.retain(|tab, _| tabs.contains(tab));
    for (tab, list) in active.iter_mut() {
        let in_tab: Vec<String> = state.spectra_in_tab(tab).map(|s| s.id().to_string()).collect();
        list.retain(|a| in_tab.contains(&a.id));
        for a in list.iter_mut() {
            if let Some(index) = in_tab.iter().position(|x| *x == a.id) {
                a.index = index;
            }
        }
    }
    state.view.spectra.active_spectra = active;
}

/// Delete the given spectra, or the active ones, and everything keyed by them
pub fn delete_spectra(state: &mut State, ids: Option<&[String]>) -> Result<(), EngineError> {
    let targets: Vec<String> = match ids {
        Some(ids) => ids.to_vec(),
        None => state.active_ids(),
    };
    let targets: BTreeSet<String> = targets
        .into_iter()
        .filter(|id| state.spectrum(id).is_some())
        .collect();
    if targets.is_empty() {
        log::debug!("delete_spectra: nothing to delete");
        return Ok(());
    }

    Arc::make_mut(&mut state.data).retain(|s| !targets.contains(s.id()));
    for id in &targets {
        state.view.peaks.remove(id);
        state.view.ranges.remove(id);
        state.view.zones.remove(id);
        state.view.zoom.vertical_scales.remove(id);
    }

    let tabs = state.tabs();
    state.view.vertical_align.retain(|tab, _| tabs.contains(tab));
    state.view.zoom.history.retain(|tab, _| tabs.contains(tab));
    state
        .view
        .spectra
        .selection_reference
        .retain(|_, id| !targets.contains(id));
    reindex_active(state);
    for snapshot in state.keys.values_mut() {
        snapshot.active_spectra.retain(|id| !targets.contains(id));
        snapshot.visibility.retain(|id, _| !targets.contains(id));
        snapshot.y_domains.retain(|id, _| !targets.contains(id));
        snapshot.vertical_scales.retain(|id, _| !targets.contains(id));
    }
    log::info!("Deleted {} spectra", targets.len());

    ensure_active_tab(state)?;
    sync_display_mode(state);
    update_view(state, DomainUpdateRules::BOTH);
    Ok(())
}

pub fn change_visibility(state: &mut State, id: &str, is_visible: bool) {
    let Some(spectrum) = state.spectrum(id) else {
        log::debug!("change_visibility: unknown spectrum {}", id);
        return;
    };
    if spectrum.display().is_visible == is_visible {
        return;
    }
    if let Some(s) = state.spectrum_mut(id) {
        s.display_mut().is_visible = is_visible;
    }
    set_domain(state, DomainUpdateRules::Y);
    set_integrals_y_domain(state);
}

pub fn change_color(state: &mut State, id: &str, color: &str) {
    match state.spectrum_mut(id) {
        Some(Spectrum::OneD(s)) => s.display.color = color.to_string(),
        Some(Spectrum::TwoD(s)) => s.display.positive_color = color.to_string(),
        None => log::debug!("change_color: unknown spectrum {}", id),
    }
}

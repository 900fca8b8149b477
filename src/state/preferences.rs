/// Tunables and named view snapshots
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::set_domain;
use super::{State, VerticalAlign};
use crate::analysis::{PeakPickingOptions, RangeOptions, ZoneOptions};
use crate::pipeline::DomainUpdateRules;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub peak_picking: PeakPickingOptions,
    pub ranges: RangeOptions,
    pub zones: ZoneOptions,
    /// Factor applied to the vertical scale per wheel notch
    pub wheel_zoom_step: f64,
    /// Sum given to new integral and range lists
    pub integral_sum: f64,
    /// Default correlation tolerance per element symbol, in ppm
    pub correlation_tolerance: BTreeMap<String, f64>,
}

impl Default for Preferences {
    fn default() -> Self {
        let correlation_tolerance = [
            ("C", 0.25),
            ("H", 0.02),
            ("N", 0.25),
            ("F", 0.25),
            ("P", 0.25),
            ("Si", 0.25),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();
        Self {
            peak_picking: PeakPickingOptions::default(),
            ranges: RangeOptions::default(),
            zones: ZoneOptions::default(),
            wheel_zoom_step: 1.2,
            integral_sum: 100.0,
            correlation_tolerance,
        }
    }
}

impl Preferences {
    /// Load host-provided preferences; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn tolerance(&self, atom_type: &str) -> f64 {
        self.correlation_tolerance.get(atom_type).copied().unwrap_or(0.25)
    }
}

/// View state stored under a user-chosen key and restored on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeySnapshot {
    pub active_tab: String,
    pub active_spectra: Vec<String>,
    pub x_domain: [f64; 2],
    pub y_domain: [f64; 2],
    pub y_domains: BTreeMap<String, [f64; 2]>,
    pub vertical_scales: BTreeMap<String, f64>,
    pub vertical_align: VerticalAlign,
    /// Visibility of each spectrum of the tab
    pub visibility: BTreeMap<String, bool>,
}

/// Store the current view under `key`. Without an active tab there is nothing to store.
pub fn save_key(state: &mut State, key: &str) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    let visibility = state
        .spectra_in_tab(&tab)
        .map(|s| (s.id().to_string(), s.display().is_visible))
        .collect();
    let snapshot = KeySnapshot {
        active_spectra: state.active_ids(),
        x_domain: state.domain.x_domain,
        y_domain: state.domain.y_domain,
        y_domains: state.domain.y_domains.clone(),
        vertical_scales: state.view.zoom.vertical_scales.clone(),
        vertical_align: state.view.vertical_align.get(&tab).copied().unwrap_or_default(),
        visibility,
        active_tab: tab,
    };
    state.keys.insert(key.to_string(), snapshot);
}

/// Restore a snapshot. Spectra deleted since it was taken are skipped; an
/// unknown key or a vanished tab is a no-op.
pub fn apply_key(state: &mut State, key: &str) {
    let Some(snapshot) = state.keys.get(key).cloned() else {
        log::debug!("apply_key: no snapshot for {}", key);
        return;
    };
    if !state.tabs().contains(&snapshot.active_tab) {
        return;
    }
    let tab = snapshot.active_tab.clone();

    for (id, visible) in &snapshot.visibility {
        if let Some(s) = state.spectrum_mut(id) {
            s.display_mut().is_visible = *visible;
        }
    }
    state.view.spectra.active_tab = Some(tab.clone());
    let ids: Vec<String> = state.spectra_in_tab(&tab).map(|s| s.id().to_string()).collect();
    let active = snapshot
        .active_spectra
        .iter()
        .filter_map(|id| {
            ids.iter().position(|x| x == id).map(|index| super::ActiveSpectrum {
                id: id.clone(),
                index,
                selected: true,
            })
        })
        .collect();
    state.view.spectra.active_spectra.insert(tab.clone(), active);
    state.view.vertical_align.insert(tab, snapshot.vertical_align);
    state.view.zoom.vertical_scales = snapshot
        .vertical_scales
        .into_iter()
        .filter(|(id, _)| state.spectrum(id).is_some())
        .collect();

    set_domain(state, DomainUpdateRules::BOTH);
    state.domain.x_domain = super::domain::clamp_to(snapshot.x_domain, state.domain.origin_domain.x_domain);
    for (id, y) in snapshot.y_domains {
        if state.domain.y_domains.contains_key(&id) {
            state.domain.y_domains.insert(id, y);
        }
    }
    state.domain.y_domain = snapshot.y_domain;
}

/// Axis domain derivation
///
/// The origin domain is the full extent of the spectra shown under the active
/// tab. The current domain is a zoomed view of it: the x range only shrinks
/// within the origin, and every per-spectrum y range is the origin y range
/// rescaled by that spectrum's cumulative vertical scale.

use std::collections::BTreeMap;

use super::zoom::rescale;
use super::{DisplayMode, State, VerticalAlign};
use crate::analysis::integration::integral_extent;
use crate::data::spectrum::Spectrum;
use crate::pipeline::DomainUpdateRules;

fn union(a: Option<[f64; 2]>, b: [f64; 2]) -> Option<[f64; 2]> {
    Some(match a {
        None => b,
        Some([lo, hi]) => [lo.min(b[0]), hi.max(b[1])],
    })
}

fn symmetric(domain: [f64; 2]) -> [f64; 2] {
    let m = domain[0].abs().max(domain[1].abs());
    [-m, m]
}

/// Gesture spans at or below this width are treated as clicks
pub fn is_zero_length(from: f64, to: f64) -> bool {
    (to - from).abs() <= f64::EPSILON
}

/// Restrict `inner` to `outer`; falls back to `outer` when they do not overlap
pub fn clamp_to(inner: [f64; 2], outer: [f64; 2]) -> [f64; 2] {
    let lo = inner[0].max(outer[0]);
    let hi = inner[1].min(outer[1]);
    if lo < hi {
        [lo, hi]
    } else {
        outer
    }
}

fn x_extent(spectrum: &Spectrum) -> Option<[f64; 2]> {
    match spectrum {
        Spectrum::OneD(s) => s.data.x_extent(),
        Spectrum::TwoD(s) => {
            let m = &s.data.rr;
            Some([m.min_x.min(m.max_x), m.min_x.max(m.max_x)])
        }
    }
}

fn y_extent(spectrum: &Spectrum) -> Option<[f64; 2]> {
    match spectrum {
        Spectrum::OneD(s) => s.data.y_extent(),
        Spectrum::TwoD(s) => {
            let m = &s.data.rr;
            Some([m.min_y.min(m.max_y), m.min_y.max(m.max_y)])
        }
    }
}

/// Ids of the spectra that define the domain of the active tab
fn domain_spectra(state: &State, tab: &str) -> Vec<String> {
    let time = state.view.spectra.display_mode == DisplayMode::Time;
    let in_tab: Vec<&Spectrum> = state.spectra_in_tab(tab).collect();
    if tab.contains(',') {
        // FID matrices only count when the time domain is displayed
        return in_tab
            .iter()
            .filter(|s| s.is_fid() == time)
            .map(|s| s.id().to_string())
            .collect();
    }
    let matching: Vec<String> = in_tab
        .iter()
        .filter(|s| s.is_fid() == time)
        .map(|s| s.id().to_string())
        .collect();
    if matching.is_empty() {
        in_tab.iter().map(|s| s.id().to_string()).collect()
    } else {
        matching
    }
}

/// 1D spectra shown as traces along the axes of a 2D tab
fn trace_spectra(state: &State, tab: &str) -> Vec<String> {
    let nuclei: Vec<&str> = tab.split(',').collect();
    state
        .data
        .iter()
        .filter(|s| s.is_1d() && !s.is_fid() && nuclei.contains(&s.tab_key().as_str()))
        .map(|s| s.id().to_string())
        .collect()
}

/// Recompute the origin domain and refresh the current domain according to `rules`
pub fn set_domain(state: &mut State, rules: DomainUpdateRules) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        state.domain = Default::default();
        return;
    };
    let is_2d = tab.contains(',');
    let ids = domain_spectra(state, &tab);

    let mut x_domains = BTreeMap::new();
    let mut y_domains = BTreeMap::new();
    let mut x_all: Option<[f64; 2]> = None;
    let mut y_all: Option<[f64; 2]> = None;
    let mut x_visible: Option<[f64; 2]> = None;
    let mut y_visible: Option<[f64; 2]> = None;

    for id in &ids {
        let Some(spectrum) = state.spectrum(id) else { continue };
        let (Some(x), Some(y)) = (x_extent(spectrum), y_extent(spectrum)) else {
            continue;
        };
        x_domains.insert(id.clone(), x);
        y_domains.insert(id.clone(), y);
        x_all = union(x_all, x);
        y_all = union(y_all, y);
        if spectrum.display().is_visible {
            x_visible = union(x_visible, x);
            y_visible = union(y_visible, y);
        }
    }
    if is_2d {
        for id in trace_spectra(state, &tab) {
            if let Some(s) = state.spectrum(&id) {
                if let (Some(x), Some(y)) = (x_extent(s), y_extent(s)) {
                    x_domains.insert(id.clone(), x);
                    y_domains.insert(id, y);
                }
            }
        }
    }

    let origin_x = x_visible.or(x_all).unwrap_or([0.0, 0.0]);
    let mut origin_y = y_visible.or(y_all).unwrap_or([0.0, 0.0]);
    let align = state.view.vertical_align.get(&tab).copied().unwrap_or_default();
    if !is_2d && align == VerticalAlign::Center {
        origin_y = symmetric(origin_y);
    }

    let origin = &mut state.domain.origin_domain;
    origin.x_domain = origin_x;
    origin.y_domain = origin_y;
    origin.x_domains = x_domains;
    origin.y_domains = y_domains;

    if rules.update_x_domain {
        state.domain.x_domain = origin_x;
        state.view.zoom.history.remove(&tab);
    } else {
        state.domain.x_domain = clamp_to(state.domain.x_domain, origin_x);
    }
    state.domain.x_domains = state.domain.origin_domain.x_domains.clone();

    // Per-spectrum y ranges follow the origin through the stored scale
    let current = std::mem::take(&mut state.domain.y_domains);
    let mut y_domains = BTreeMap::new();
    for (id, origin_y) in &state.domain.origin_domain.y_domains {
        let y = match current.get(id) {
            Some(y) if !rules.update_y_domain => *y,
            _ => {
                let scale = state.view.zoom.vertical_scales.get(id).copied().unwrap_or(1.0);
                if state.spectrum(id).map(|s| s.is_1d()).unwrap_or(false) {
                    rescale(*origin_y, scale)
                } else {
                    *origin_y
                }
            }
        };
        y_domains.insert(id.clone(), y);
    }
    state.domain.y_domains = y_domains;

    if rules.update_y_domain || state.domain.y_domain == [0.0, 0.0] {
        if is_2d {
            state.domain.y_domain = origin_y;
        } else {
            refresh_global_y(state);
        }
    }

    log::debug!(
        "Domain for tab {}: x={:?} y={:?} ({} spectra, rules {:?})",
        tab,
        state.domain.x_domain,
        state.domain.y_domain,
        ids.len(),
        rules
    );
}

/// Global 1D y range: union of the visible spectra's current y ranges
pub fn refresh_global_y(state: &mut State) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    let mut all: Option<[f64; 2]> = None;
    let mut visible: Option<[f64; 2]> = None;
    for (id, y) in &state.domain.y_domains {
        let Some(spectrum) = state.spectrum(id) else { continue };
        if spectrum.tab_key() != tab {
            continue;
        }
        all = union(all, *y);
        if spectrum.display().is_visible {
            visible = union(visible, *y);
        }
    }
    let mut y = visible.or(all).unwrap_or(state.domain.origin_domain.y_domain);
    if state.view.vertical_align.get(&tab).copied().unwrap_or_default() == VerticalAlign::Center {
        y = symmetric(y);
    }
    state.domain.y_domain = y;
}

/// Vertical extent of the integral curves of each 1D spectrum in the active
/// tab. Ranges count only while their integral curves are shown; a spectrum
/// with nothing integrated gets `[0, 0]`.
pub fn set_integrals_y_domain(state: &mut State) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        state.domain.integrals_y_domains.clear();
        return;
    };
    let mut domains = BTreeMap::new();
    for spectrum in state.spectra_in_tab(&tab) {
        let Some(s) = spectrum.as_1d() else { continue };
        let show_ranges = state
            .view
            .ranges
            .get(&s.id)
            .map(|r| r.show_integrals)
            .unwrap_or(true);

        let mut bounds: Vec<[f64; 2]> = s.integrals.values.iter().map(|i| [i.from, i.to]).collect();
        if show_ranges {
            bounds.extend(s.ranges.values.iter().map(|r| [r.from, r.to]));
        }
        let mut domain: Option<[f64; 2]> = None;
        for [from, to] in bounds {
            if let Some(e) = integral_extent(&s.data, from, to) {
                domain = union(domain, e);
            }
        }
        domains.insert(s.id.clone(), domain.unwrap_or([0.0, 0.0]));
    }
    state.domain.integrals_y_domains = domains;
}

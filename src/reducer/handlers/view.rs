use crate::error::EngineError;
use crate::pipeline::DomainUpdateRules;
use crate::state::active::{self, Modifier};
use crate::state::domain::set_domain;
use crate::state::zoom::{self, ZoomDirection, ZoomOutKind};
use crate::state::{State, VerticalAlign};

pub fn set_active_tab(state: &mut State, tab: &str) -> Result<(), EngineError> {
    active::set_active_tab(state, tab)
}

/// A click on a spectrum cancels any running preview before the selection
/// changes
pub fn change_active_spectrum(state: &mut State, id: &str, modifier: Modifier) -> Result<(), EngineError> {
    state.reset_preview()?;
    active::change_active_spectrum(state, id, modifier);
    Ok(())
}

pub fn set_zoom(state: &mut State, scale: f64, spectrum_id: Option<&str>) {
    zoom::set_zoom(state, scale, spectrum_id);
}

pub fn wheel_zoom(state: &mut State, direction: ZoomDirection, spectrum_id: Option<&str>) {
    zoom::wheel_zoom(state, direction, spectrum_id);
}

pub fn brush_end(state: &mut State, start_x: f64, end_x: f64, y: Option<(f64, f64)>) {
    zoom::brush_end(state, start_x, end_x, y);
}

pub fn set_x_domain(state: &mut State, domain: [f64; 2]) {
    zoom::set_x_domain(state, domain);
}

pub fn full_zoom_out(state: &mut State, kind: ZoomOutKind) {
    zoom::full_zoom_out(state, kind);
}

/// Vertical alignment of the active tab; only the y range moves
pub fn set_vertical_align(state: &mut State, align: VerticalAlign) {
    let Some(tab) = state.active_tab().map(str::to_string) else {
        return;
    };
    if state.view.vertical_align.get(&tab).copied().unwrap_or_default() == align {
        return;
    }
    state.view.vertical_align.insert(tab, align);
    set_domain(state, DomainUpdateRules::Y);
}

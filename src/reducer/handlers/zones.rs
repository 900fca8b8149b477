use super::{active_ft_2d, update_annotations};
use crate::analysis::zones::{detect_zones, zone_in_box};
use crate::analysis::ZoneOptions;
use crate::data::annotations::ZoneAxis;
use crate::state::domain::is_zero_length;
use crate::state::State;

pub fn auto_zones_detection(state: &mut State, options: Option<&ZoneOptions>) {
    let Some(id) = active_ft_2d(state) else { return };
    let options = options.cloned().unwrap_or_else(|| state.preferences.zones.clone());
    let Some(zones) = state
        .spectrum(&id)
        .and_then(|s| s.as_2d())
        .map(|s| detect_zones(&s.data.rr, &options))
    else {
        return;
    };
    log::info!("Detected {} zones on {}", zones.len(), id);
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_2d_mut()) {
        s.zones.values = zones;
    }
    update_annotations(state);
}

/// Zone around the strongest point of a brushed box
pub fn add_zone(state: &mut State, x: [f64; 2], y: [f64; 2]) {
    if is_zero_length(x[0], x[1]) || is_zero_length(y[0], y[1]) {
        return;
    }
    let Some(id) = active_ft_2d(state) else { return };
    let Some(zone) = state
        .spectrum(&id)
        .and_then(|s| s.as_2d())
        .and_then(|s| zone_in_box(&s.data.rr, ZoneAxis::new(x[0], x[1]), ZoneAxis::new(y[0], y[1])))
    else {
        log::debug!("add_zone: empty box");
        return;
    };
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_2d_mut()) {
        s.zones.values.push(zone);
    }
    update_annotations(state);
}

/// Delete one zone, or all of them when `zone_id` is `None`
pub fn delete_zone(state: &mut State, zone_id: Option<&str>) {
    let Some(id) = active_ft_2d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_2d_mut()) else {
        return;
    };
    match zone_id {
        Some(zone_id) => s.zones.values.retain(|z| z.id != zone_id),
        None => s.zones.values.clear(),
    }
    update_annotations(state);
}

pub fn change_signal_value(
    state: &mut State,
    zone_id: &str,
    signal_id: &str,
    x_delta: Option<f64>,
    y_delta: Option<f64>,
) {
    if x_delta.is_none() && y_delta.is_none() {
        return;
    }
    let Some(id) = active_ft_2d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_2d_mut()) else {
        return;
    };
    let Some(signal) = s
        .zones
        .values
        .iter_mut()
        .filter(|z| z.id == zone_id)
        .flat_map(|z| z.signals.iter_mut())
        .find(|g| g.id == signal_id)
    else {
        log::debug!("change_signal_value: unknown signal {}/{}", zone_id, signal_id);
        return;
    };
    if let Some(dx) = x_delta {
        signal.x.delta = dx;
    }
    if let Some(dy) = y_delta {
        signal.y.delta = dy;
    }
    update_annotations(state);
}

pub fn toggle_peaks(state: &mut State) {
    for id in state.active_ids() {
        let view = state.view.zones.entry(id).or_default();
        view.show_peaks = !view.show_peaks;
    }
}

#[cfg(test)]
mod tests {
    use crate::data::spectrum::Nucleus;
    use crate::reducer::action::Action;
    use crate::reducer::reduce;
    use crate::state::State;
    use crate::test_support::{ft_2d_spectrum, ft_spectrum, state_with};

    fn hsqc() -> State {
        let state = state_with(vec![
            ft_spectrum("h", Nucleus::H1, &[(2.0, 1.0)]),
            ft_2d_spectrum("hsqc", &[(2.0, 40.0, 10.0), (7.0, 120.0, 8.0)]),
        ]);
        reduce(&state, Action::SetActiveTab { tab: "1H,13C".into() })
    }

    fn zone_count(state: &State) -> usize {
        state.spectrum("hsqc").unwrap().as_2d().unwrap().zones.values.len()
    }

    #[test]
    fn test_detection_links_both_axes() {
        let state = reduce(&hsqc(), Action::AutoZonesDetection { options: None });
        assert_eq!(zone_count(&state), 2);
        let atoms: Vec<&str> = state
            .correlations
            .values
            .iter()
            .map(|c| c.atom_type.as_str())
            .collect();
        assert_eq!(atoms.iter().filter(|a| **a == "C").count(), 2);
        assert_eq!(atoms.iter().filter(|a| **a == "H").count(), 2);
    }

    #[test]
    fn test_manual_zone_and_delete() {
        let state = reduce(
            &hsqc(),
            Action::AddZone {
                x1: 6.0,
                x2: 8.0,
                y1: 110.0,
                y2: 130.0,
            },
        );
        assert_eq!(zone_count(&state), 1);
        let flat = reduce(
            &state,
            Action::AddZone {
                x1: 6.0,
                x2: 6.0,
                y1: 110.0,
                y2: 130.0,
            },
        );
        assert_eq!(zone_count(&flat), 1);
        let state = reduce(&state, Action::DeleteZone { id: None });
        assert_eq!(zone_count(&state), 0);
    }

    #[test]
    fn test_signal_edit_moves_correlation() {
        let state = reduce(&hsqc(), Action::AutoZonesDetection { options: None });
        let zone = state.spectrum("hsqc").unwrap().as_2d().unwrap().zones.values[0].clone();
        let state = reduce(
            &state,
            Action::ChangeZoneSignalValue {
                zone_id: zone.id.clone(),
                signal_id: zone.signals[0].id.clone(),
                x_delta: None,
                y_delta: Some(55.0),
            },
        );
        assert!(state
            .correlations
            .values
            .iter()
            .any(|c| c.atom_type == "C" && c.delta == 55.0));
    }

    #[test]
    fn test_peaks_toggle() {
        let state = reduce(&hsqc(), Action::ToggleZonesPeaks);
        assert!(!state.view.zones["hsqc"].show_peaks);
    }
}

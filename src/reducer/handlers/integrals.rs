use super::{active_ft_1d, update_annotations};
use crate::analysis::integration::integrate;
use crate::data::annotations::{normalize, Integral, SumOptions};
use crate::data::molecule::atom_count;
use crate::data::spectrum::Spectrum1D;
use crate::state::domain::is_zero_length;
use crate::state::State;

/// Sum the relative values are normalised to. With `sum_auto` it is the
/// number of observed-nucleus atoms in the chosen molecule's formula, falling
/// back to the stored sum when no formula applies.
pub(crate) fn resolve_sum(state: &State, options: &SumOptions, spectrum: &Spectrum1D) -> f64 {
    if !options.sum_auto {
        return options.sum;
    }
    let molecule = match &options.molecule_id {
        Some(id) => state.molecules.iter().find(|m| &m.id == id),
        None => state.molecules.first(),
    };
    let element = spectrum.info.nucleus(0).element();
    match molecule.and_then(|m| m.formula.as_deref()) {
        Some(formula) => match atom_count(formula, &element) {
            0 => options.sum,
            n => n as f64,
        },
        None => options.sum,
    }
}

/// Recompute the absolute areas of the integrals and ranges of spectrum `id`
/// from its current data and renormalise them
pub(crate) fn refresh_integrations(state: &mut State, id: &str) {
    let Some(s) = state.spectrum(id).and_then(|s| s.as_1d()) else {
        return;
    };
    if s.integrals.values.is_empty() && s.ranges.values.is_empty() {
        return;
    }
    let integral_sum = resolve_sum(state, &s.integrals.options, s);
    let range_sum = resolve_sum(state, &s.ranges.options, s);
    let Some(s) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    for integral in s.integrals.values.iter_mut() {
        integral.absolute = integrate(&s.data, integral.from, integral.to);
    }
    for range in s.ranges.values.iter_mut() {
        range.absolute = integrate(&s.data, range.from, range.to);
    }
    normalize(&mut s.integrals.values, integral_sum);
    normalize(&mut s.ranges.values, range_sum);
}

/// Renormalise the integrals of `id` against their current sum options
fn renormalize(state: &mut State, id: &str) {
    let Some(s) = state.spectrum(id).and_then(|s| s.as_1d()) else {
        return;
    };
    let sum = resolve_sum(state, &s.integrals.options, s);
    if let Some(s) = state.spectrum_mut(id).and_then(|s| s.as_1d_mut()) {
        normalize(&mut s.integrals.values, sum);
    }
}

pub fn add_integral(state: &mut State, from: f64, to: f64) {
    if is_zero_length(from, to) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let default_sum = state.preferences.integral_sum;
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    let absolute = integrate(&s.data, from, to);
    if s.integrals.values.is_empty() && s.integrals.options == SumOptions::default() {
        s.integrals.options.sum = default_sum;
    }
    s.integrals.values.push(Integral::new(from, to, absolute));
    renormalize(state, &id);
    update_annotations(state);
}

pub fn resize_integral(state: &mut State, integral_id: &str, from: f64, to: f64) {
    if is_zero_length(from, to) {
        return;
    }
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    let absolute = integrate(&s.data, from, to);
    let Some(integral) = s.integrals.values.iter_mut().find(|i| i.id == integral_id) else {
        log::debug!("resize_integral: unknown integral {}", integral_id);
        return;
    };
    integral.from = from.min(to);
    integral.to = from.max(to);
    integral.absolute = absolute;
    renormalize(state, &id);
    update_annotations(state);
}

/// Delete one integral, or all of them when `integral_id` is `None`
pub fn delete_integral(state: &mut State, integral_id: Option<&str>) {
    let Some(id) = active_ft_1d(state) else { return };
    let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
        return;
    };
    match integral_id {
        Some(integral_id) => s.integrals.values.retain(|i| i.id != integral_id),
        None => s.integrals.values.clear(),
    }
    renormalize(state, &id);
    update_annotations(state);
}

pub fn change_sum_options(state: &mut State, options: &SumOptions) {
    let Some(id) = active_ft_1d(state) else { return };
    if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
        s.integrals.options = options.clone();
    }
    renormalize(state, &id);
    update_annotations(state);
}

#[cfg(test)]
mod tests {
    use crate::data::annotations::SumOptions;
    use crate::data::spectrum::Nucleus;
    use crate::reducer::action::Action;
    use crate::reducer::reduce;
    use crate::state::State;
    use crate::test_support::{ft_spectrum, state_with};

    fn integrals(state: &State) -> Vec<f64> {
        let s = state.spectrum("h").unwrap().as_1d().unwrap();
        s.integrals.values.iter().map(|i| i.integral).collect()
    }

    fn two_lines() -> State {
        // a single spectrum is active after load
        let state = state_with(vec![ft_spectrum("h", Nucleus::H1, &[(2.0, 10.0), (6.0, 30.0)])]);
        let state = reduce(&state, Action::AddIntegral { from: 1.5, to: 2.5 });
        reduce(&state, Action::AddIntegral { from: 6.5, to: 5.5 })
    }

    #[test]
    fn test_relative_values_follow_areas() {
        let state = two_lines();
        let values = integrals(&state);
        assert_eq!(values.len(), 2);
        assert!((values.iter().sum::<f64>() - 100.0).abs() < 1e-9);
        assert!((values[1] / values[0] - 3.0).abs() < 0.05);
        assert!(state.domain.integrals_y_domains["h"][1] > 0.0);
    }

    #[test]
    fn test_zero_width_gestures_ignored() {
        let state = two_lines();
        let same = reduce(&state, Action::AddIntegral { from: 3.0, to: 3.0 });
        assert!(std::sync::Arc::ptr_eq(&same.data, &state.data));

        // pointer jitter counts as a click for every tool
        let jitter = 1e-17;
        for action in [
            Action::AddIntegral { from: 0.0, to: jitter },
            Action::AddPeaks { from: 0.0, to: jitter },
            Action::AddRange { from: 0.0, to: jitter },
        ] {
            let same = reduce(&state, action);
            assert!(std::sync::Arc::ptr_eq(&same.data, &state.data));
        }
    }

    #[test]
    fn test_resize_and_delete() {
        let state = two_lines();
        let first = state.spectrum("h").unwrap().as_1d().unwrap().integrals.values[0].id.clone();
        let resized = reduce(
            &state,
            Action::ResizeIntegral {
                id: first.clone(),
                from: 1.9,
                to: 2.1,
            },
        );
        assert!(integrals(&resized)[0] < integrals(&state)[0]);

        let deleted = reduce(&resized, Action::DeleteIntegral { id: Some(first) });
        let remaining = integrals(&deleted);
        assert_eq!(remaining.len(), 1);
        assert!((remaining[0] - 100.0).abs() < 1e-9);
        let cleared = reduce(&deleted, Action::DeleteIntegral { id: None });
        assert!(integrals(&cleared).is_empty());
    }

    #[test]
    fn test_sum_from_molecule_formula() {
        let state = two_lines();
        let state = reduce(
            &state,
            Action::AddMolecule {
                molfile: String::new(),
                label: None,
                formula: Some("C2H6O".into()),
            },
        );
        let state = reduce(
            &state,
            Action::ChangeIntegralsSumOptions {
                options: SumOptions {
                    sum_auto: true,
                    ..SumOptions::default()
                },
            },
        );
        assert!((integrals(&state).iter().sum::<f64>() - 6.0).abs() < 1e-9);
    }
}

use std::collections::BTreeMap;
use std::sync::Arc;

use super::integrals::refresh_integrations;
use crate::data::molecule::Molecule;
use crate::state::State;

/// Spectra whose integral or range sum follows a molecule formula
fn auto_sum_spectra(state: &State) -> Vec<String> {
    state
        .data
        .iter()
        .filter_map(|s| s.as_1d())
        .filter(|s| s.integrals.options.sum_auto || s.ranges.options.sum_auto)
        .map(|s| s.id.clone())
        .collect()
}

fn molecules_changed(state: &mut State) {
    for id in auto_sum_spectra(state) {
        refresh_integrations(state, &id);
    }
    state.rebuild_correlations();
}

pub fn add_molecule(state: &mut State, molfile: &str, label: Option<&str>, formula: Option<&str>) {
    let label = match label {
        Some(label) => label.to_string(),
        None => format!("P{}", state.molecules.len() + 1),
    };
    let molecule = Molecule {
        id: uuid::Uuid::new_v4().to_string(),
        label,
        molfile: molfile.to_string(),
        formula: formula.map(str::to_string),
    };
    log::info!("Added molecule {} ({:?})", molecule.label, molecule.formula);

    if state.correlations.options.mf.is_none() {
        if let Some(mf) = &molecule.formula {
            Arc::make_mut(&mut state.correlations).options.mf = Some(mf.clone());
        }
    }
    Arc::make_mut(&mut state.molecules).push(molecule);
    molecules_changed(state);
}

pub fn delete_molecule(state: &mut State, molecule_id: &str) {
    if !state.molecules.iter().any(|m| m.id == molecule_id) {
        log::debug!("delete_molecule: unknown molecule {}", molecule_id);
        return;
    }
    Arc::make_mut(&mut state.molecules).retain(|m| m.id != molecule_id);
    molecules_changed(state);
}

/// Molecular formula the correlation table is checked against
pub fn set_correlations_mf(state: &mut State, mf: Option<String>) {
    if state.correlations.options.mf == mf {
        return;
    }
    Arc::make_mut(&mut state.correlations).options.mf = mf;
    state.rebuild_correlations();
}

/// Per-element grouping tolerance; elements not listed fall back to the
/// preferences
pub fn set_correlations_tolerance(state: &mut State, tolerance: &BTreeMap<String, f64>) {
    let tolerance: BTreeMap<String, f64> = tolerance
        .iter()
        .filter(|(_, t)| t.is_finite() && **t >= 0.0)
        .map(|(atom, t)| (atom.clone(), *t))
        .collect();
    if state.correlations.options.tolerance == tolerance {
        return;
    }
    Arc::make_mut(&mut state.correlations).options.tolerance = tolerance;
    state.rebuild_correlations();
}

/// Edit the user fields of one correlation; they survive later rebuilds
pub fn set_correlation(
    state: &mut State,
    correlation_id: &str,
    equivalence: Option<u32>,
    hybridization: Option<String>,
) {
    let Some(index) = state.correlations.values.iter().position(|c| c.id == correlation_id) else {
        log::debug!("set_correlation: unknown correlation {}", correlation_id);
        return;
    };
    let correlations = Arc::make_mut(&mut state.correlations);
    let correlation = &mut correlations.values[index];
    if let Some(equivalence) = equivalence.filter(|e| *e > 0) {
        correlation.equivalence = equivalence;
    }
    if hybridization.is_some() {
        correlation.hybridization = hybridization;
    }
    state.rebuild_correlations();
}

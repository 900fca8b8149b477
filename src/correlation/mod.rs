//! Cross-spectrum signal correlations
//!
//! Signals of 1D ranges and of both axes of 2D zones become links; links of
//! the same element whose shifts agree within the element's tolerance are
//! grouped into one correlation. The result is a pure function of the spectra,
//! the options and the previous correlations, so equal inputs give equal
//! output and the state can keep the previous value when nothing changed.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::data::annotations::SignalKind;
use crate::data::molecule::parse_formula;
use crate::data::spectrum::Spectrum;
use crate::state::Preferences;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub id: String,
    pub experiment_type: String,
    pub experiment_id: String,
    pub signal_id: String,
    pub atom_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<Axis>,
    pub delta: f64,
    /// Correlations holding the partner axis of the same 2D signal
    #[serde(default)]
    pub matches: Vec<String>,
    #[serde(skip)]
    partner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correlation {
    pub id: String,
    pub atom_type: String,
    pub delta: f64,
    #[serde(default)]
    pub links: Vec<Link>,
    /// User-declared atom with no observed signal
    #[serde(default)]
    pub pseudo: bool,
    #[serde(default = "one")]
    pub equivalence: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hybridization: Option<String>,
}

fn one() -> u32 {
    1
}

impl Correlation {
    fn has_source(&self, experiment_id: &str, axis: Option<Axis>) -> bool {
        self.links
            .iter()
            .any(|l| l.experiment_id == experiment_id && l.axis == axis)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorrelationOptions {
    /// Molecular formula the assignment is checked against
    pub mf: Option<String>,
    /// Per-element tolerance overriding the preferences
    pub tolerance: BTreeMap<String, f64>,
}

/// Completion of one element against the molecular formula
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtomTypeState {
    pub current: u32,
    pub total: usize,
    pub complete: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorrelationData {
    pub options: CorrelationOptions,
    pub values: Vec<Correlation>,
    pub state: BTreeMap<String, AtomTypeState>,
}

fn collect_links(spectra: &[Arc<Spectrum>]) -> Vec<Link> {
    let mut links = Vec::new();
    for spectrum in spectra {
        let info = spectrum.info();
        let experiment_type = info.experiment_type().to_string().to_lowercase();
        match spectrum.as_ref() {
            Spectrum::OneD(s) => {
                let atom_type = info.nucleus(0).element();
                for range in s.ranges.values.iter().filter(|r| r.kind == SignalKind::Signal) {
                    for signal in range.signals.iter().filter(|g| g.kind == SignalKind::Signal) {
                        links.push(Link {
                            id: format!("{}_{}", s.id, signal.id),
                            experiment_type: experiment_type.clone(),
                            experiment_id: s.id.clone(),
                            signal_id: signal.id.clone(),
                            atom_type: atom_type.clone(),
                            axis: None,
                            delta: signal.delta,
                            matches: Vec::new(),
                            partner: None,
                        });
                    }
                }
            }
            Spectrum::TwoD(s) => {
                let atoms = [info.nucleus(0).element(), info.nucleus(1).element()];
                for zone in s.zones.values.iter().filter(|z| z.kind == SignalKind::Signal) {
                    for signal in zone.signals.iter().filter(|g| g.kind == SignalKind::Signal) {
                        let x_id = format!("{}_{}_x", s.id, signal.id);
                        let y_id = format!("{}_{}_y", s.id, signal.id);
                        for (axis, atom, delta, own, partner) in [
                            (Axis::X, &atoms[0], signal.x.delta, &x_id, &y_id),
                            (Axis::Y, &atoms[1], signal.y.delta, &y_id, &x_id),
                        ] {
                            links.push(Link {
                                id: own.clone(),
                                experiment_type: experiment_type.clone(),
                                experiment_id: s.id.clone(),
                                signal_id: signal.id.clone(),
                                atom_type: atom.clone(),
                                axis: Some(axis),
                                delta,
                                matches: Vec::new(),
                                partner: Some(partner.clone()),
                            });
                        }
                    }
                }
            }
        }
    }
    links
}

/// Group links per element. Links are visited in (delta, id) order and join
/// the first correlation within tolerance that has no link from the same
/// spectrum and axis yet.
fn group(mut links: Vec<Link>, tolerance: impl Fn(&str) -> f64) -> Vec<Correlation> {
    links.sort_by(|a, b| {
        a.atom_type
            .cmp(&b.atom_type)
            .then(a.delta.total_cmp(&b.delta))
            .then(a.id.cmp(&b.id))
    });
    let mut groups: Vec<Correlation> = Vec::new();
    for link in links {
        let tol = tolerance(&link.atom_type);
        let target = groups.iter_mut().find(|c| {
            c.atom_type == link.atom_type
                && (c.delta - link.delta).abs() <= tol
                && !c.has_source(&link.experiment_id, link.axis)
        });
        match target {
            Some(c) => {
                c.links.push(link);
                c.delta = c.links.iter().map(|l| l.delta).sum::<f64>() / c.links.len() as f64;
            }
            None => groups.push(Correlation {
                id: String::new(),
                atom_type: link.atom_type.clone(),
                delta: link.delta,
                links: vec![link],
                pseudo: false,
                equivalence: 1,
                hybridization: None,
            }),
        }
    }
    groups
}

/// Carry ids and user-edited fields over from matching previous correlations,
/// then number the rest `{atom}{n}` with the smallest free n.
fn assign_ids(values: &mut [Correlation], previous: &[Correlation]) {
    let mut taken: BTreeSet<String> = BTreeSet::new();
    for c in values.iter_mut() {
        let link_ids: BTreeSet<&str> = c.links.iter().map(|l| l.id.as_str()).collect();
        let matched = previous.iter().find(|p| {
            !p.pseudo
                && p.atom_type == c.atom_type
                && !taken.contains(&p.id)
                && p.links.iter().any(|l| link_ids.contains(l.id.as_str()))
        });
        if let Some(p) = matched {
            c.id = p.id.clone();
            c.equivalence = p.equivalence;
            c.hybridization = p.hybridization.clone();
            taken.insert(p.id.clone());
        }
    }
    for p in previous.iter().filter(|p| p.pseudo) {
        taken.insert(p.id.clone());
    }
    for c in values.iter_mut().filter(|c| c.id.is_empty()) {
        let mut n = 1;
        while taken.contains(&format!("{}{}", c.atom_type, n)) {
            n += 1;
        }
        c.id = format!("{}{}", c.atom_type, n);
        taken.insert(c.id.clone());
    }
}

fn fill_matches(values: &mut [Correlation]) {
    let owner: BTreeMap<String, String> = values
        .iter()
        .flat_map(|c| c.links.iter().map(move |l| (l.id.clone(), c.id.clone())))
        .collect();
    for c in values.iter_mut() {
        for link in c.links.iter_mut() {
            link.matches = link
                .partner
                .as_ref()
                .and_then(|p| owner.get(p))
                .map(|id| vec![id.clone()])
                .unwrap_or_default();
        }
    }
}

fn atom_state(values: &[Correlation], mf: Option<&str>) -> BTreeMap<String, AtomTypeState> {
    let formula = mf.map(parse_formula).unwrap_or_default();
    let mut atoms: BTreeSet<String> = formula.keys().cloned().collect();
    atoms.extend(values.iter().map(|c| c.atom_type.clone()));
    atoms
        .into_iter()
        .map(|atom| {
            let current = values
                .iter()
                .filter(|c| c.atom_type == atom)
                .map(|c| c.equivalence)
                .sum();
            let total = formula.get(&atom).copied().unwrap_or(0);
            let complete = total > 0 && current as usize == total;
            (atom, AtomTypeState { current, total, complete })
        })
        .collect()
}

/// Build correlation values from the spectra
pub fn build(
    spectra: &[Arc<Spectrum>],
    options: &CorrelationOptions,
    previous: &[Correlation],
    preferences: &Preferences,
) -> Vec<Correlation> {
    let links = collect_links(spectra);
    let mut values = group(links, |atom| {
        options
            .tolerance
            .get(atom)
            .copied()
            .unwrap_or_else(|| preferences.tolerance(atom))
    });
    assign_ids(&mut values, previous);
    fill_matches(&mut values);

    // Pseudo correlations have no signals and survive every rebuild
    values.extend(previous.iter().filter(|p| p.pseudo).cloned());
    values.sort_by(|a, b| {
        a.atom_type
            .cmp(&b.atom_type)
            .then(a.pseudo.cmp(&b.pseudo))
            .then(a.delta.total_cmp(&b.delta))
            .then(a.id.cmp(&b.id))
    });
    values
}

/// Rebuild the whole correlation value from the current spectra
pub fn rebuild(
    spectra: &[Arc<Spectrum>],
    previous: &CorrelationData,
    preferences: &Preferences,
) -> CorrelationData {
    let values = build(spectra, &previous.options, &previous.values, preferences);
    let state = atom_state(&values, previous.options.mf.as_deref());
    CorrelationData {
        options: previous.options.clone(),
        values,
        state,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::annotations::{Range, Signal1D, SignalAxis, Signal2D, Zone, ZoneAxis};
    use crate::data::spectrum::Nucleus;
    use crate::test_support::{ft_2d_spectrum, ft_spectrum};

    fn with_ranges(id: &str, nucleus: Nucleus, deltas: &[f64]) -> Arc<Spectrum> {
        let mut spectrum = ft_spectrum(id, nucleus, &[]);
        let s = spectrum.as_1d_mut().unwrap();
        for (i, d) in deltas.iter().enumerate() {
            s.ranges.values.push(Range {
                id: format!("r{}", i),
                from: d - 0.05,
                to: d + 0.05,
                absolute: 1.0,
                integration: 0.0,
                kind: SignalKind::Signal,
                signals: vec![Signal1D {
                    id: format!("{}-{}", id, d),
                    delta: *d,
                    multiplicity: "s".into(),
                    kind: SignalKind::Signal,
                    js: vec![],
                    peaks: vec![],
                }],
            });
        }
        Arc::new(spectrum)
    }

    fn hsqc(id: &str, pairs: &[(f64, f64)]) -> Arc<Spectrum> {
        let mut spectrum = ft_2d_spectrum(id, &[]);
        let s = spectrum.as_2d_mut().unwrap();
        for (i, &(x, y)) in pairs.iter().enumerate() {
            s.zones.values.push(Zone {
                id: format!("z{}", i),
                x: ZoneAxis::new(x - 0.1, x + 0.1),
                y: ZoneAxis::new(y - 1.0, y + 1.0),
                kind: SignalKind::Signal,
                signals: vec![Signal2D {
                    id: format!("{}-s{}", id, i),
                    x: SignalAxis { delta: x },
                    y: SignalAxis { delta: y },
                    kind: SignalKind::Signal,
                    peaks: vec![],
                }],
            });
        }
        Arc::new(spectrum)
    }

    #[test]
    fn test_links_grouped_within_tolerance() {
        let spectra = vec![
            with_ranges("h", Nucleus::H1, &[1.20, 3.50]),
            with_ranges("c", Nucleus::C13, &[20.0, 65.0]),
            hsqc("hsqc", &[(1.21, 20.1), (3.49, 64.9)]),
        ];
        let data = rebuild(&spectra, &CorrelationData::default(), &Preferences::default());
        let carbons: Vec<&Correlation> = data.values.iter().filter(|c| c.atom_type == "C").collect();
        let protons: Vec<&Correlation> = data.values.iter().filter(|c| c.atom_type == "H").collect();
        assert_eq!(carbons.len(), 2);
        assert_eq!(protons.len(), 2);
        assert!(carbons.iter().all(|c| c.links.len() == 2));
        assert_eq!(carbons[0].id, "C1");
        assert_eq!(protons[1].id, "H2");

        let hsqc_link = protons[0]
            .links
            .iter()
            .find(|l| l.axis == Some(Axis::X))
            .unwrap();
        assert_eq!(hsqc_link.matches, vec![carbons[0].id.clone()]);
    }

    #[test]
    fn test_same_source_never_merged() {
        let spectra = vec![with_ranges("h", Nucleus::H1, &[1.200, 1.205])];
        let data = rebuild(&spectra, &CorrelationData::default(), &Preferences::default());
        assert_eq!(data.values.len(), 2);
    }

    #[test]
    fn test_rebuild_is_deterministic_and_keeps_user_fields() {
        let spectra = vec![
            with_ranges("c", Nucleus::C13, &[20.0, 65.0]),
            hsqc("hsqc", &[(1.21, 20.1)]),
        ];
        let prefs = Preferences::default();
        let first = rebuild(&spectra, &CorrelationData::default(), &prefs);
        let second = rebuild(&spectra, &first, &prefs);
        assert_eq!(first, second);

        let mut edited = first.clone();
        edited.values.iter_mut().find(|c| c.id == "C2").unwrap().equivalence = 3;
        let spectra = vec![
            with_ranges("c", Nucleus::C13, &[19.0, 20.0, 65.0]),
            hsqc("hsqc", &[(1.21, 20.1)]),
        ];
        let third = rebuild(&spectra, &edited, &prefs);
        let c65 = third.values.iter().find(|c| (c.delta - 65.0).abs() < 1e-9).unwrap();
        assert_eq!(c65.id, "C2");
        assert_eq!(c65.equivalence, 3);
        let c19 = third.values.iter().find(|c| (c.delta - 19.0).abs() < 1e-9).unwrap();
        assert_eq!(c19.id, "C3");
    }

    #[test]
    fn test_atom_state_against_formula() {
        let spectra = vec![with_ranges("c", Nucleus::C13, &[20.0, 65.0])];
        let previous = CorrelationData {
            options: CorrelationOptions {
                mf: Some("C2H6O".into()),
                ..Default::default()
            },
            ..Default::default()
        };
        let data = rebuild(&spectra, &previous, &Preferences::default());
        assert_eq!(data.state["C"].current, 2);
        assert!(data.state["C"].complete);
        assert_eq!(data.state["H"].total, 6);
        assert!(!data.state["H"].complete);
    }
}

/// Filter list management for a single spectrum
///
/// Every operation rebuilds the effective data from `original_data` and
/// returns the OR of the domain rules of the filters whose output changed, so
/// the caller only recomputes axis domains when something could have moved.
/// The stored filter list and the data are committed together; a failing
/// filter leaves the spectrum untouched.

use super::filter::{DomainUpdateRules, Filter, FilterKind};
use super::processing;
use super::FilterError;
use crate::data::spectrum::{Data1D, Spectrum, Spectrum1D};

/// Replay `filters` from the pristine snapshot and commit data and info.
fn run(spectrum: &mut Spectrum, filters: &[Filter]) -> Result<(), FilterError> {
    match spectrum {
        Spectrum::OneD(s) => {
            let mut data = s.original_data.clone();
            let mut info = s.original_info.clone();
            for filter in filters.iter().filter(|f| f.flag) {
                processing::apply_1d(&filter.kind, &mut data, &mut info)?;
            }
            s.data = data;
            s.info = info;
        }
        Spectrum::TwoD(s) => {
            let mut data = s.original_data.clone();
            let mut info = s.original_info.clone();
            for filter in filters.iter().filter(|f| f.flag) {
                processing::apply_2d(&filter.kind, &mut data, &mut info)?;
            }
            s.data = data;
            s.info = info;
        }
    }
    Ok(())
}

fn rules_from(filters: &[Filter], from: usize) -> DomainUpdateRules {
    filters
        .iter()
        .skip(from)
        .filter(|f| f.flag)
        .fold(DomainUpdateRules::NONE, |acc, f| acc | f.kind.domain_rules())
}

/// Replace the stored list with `filters` after a successful replay
fn commit(
    spectrum: &mut Spectrum,
    filters: Vec<Filter>,
    changed_from: usize,
) -> Result<DomainUpdateRules, FilterError> {
    run(spectrum, &filters)?;
    let rules = rules_from(&filters, changed_from);
    *spectrum.filters_mut() = filters;
    Ok(rules)
}

/// Replay the stored filter list as is
pub fn replay(spectrum: &mut Spectrum) -> Result<DomainUpdateRules, FilterError> {
    let filters = spectrum.filters().to_vec();
    commit(spectrum, filters, 0)
}

/// Add filters to the chain.
///
/// With `filter_index`, the list is truncated at that index before the new
/// filters are appended. Without it, a filter whose name is already present
/// replaces the existing entry in place (keeping its id) and any other is
/// appended at the end.
pub fn apply_filters(
    spectrum: &mut Spectrum,
    kinds: Vec<FilterKind>,
    filter_index: Option<usize>,
) -> Result<DomainUpdateRules, FilterError> {
    let mut filters = spectrum.filters().to_vec();
    let mut changed_from = filters.len();

    if let Some(index) = filter_index {
        filters.truncate(index);
        changed_from = filters.len();
    }

    for kind in kinds {
        if kind.dimension() != spectrum.info().dimension.clamp(1, 2) {
            return Err(FilterError::UnsupportedDimension {
                filter: kind.name().to_string(),
                dimension: spectrum.info().dimension,
            });
        }
        let existing = if filter_index.is_none() {
            filters.iter().position(|f| f.name() == kind.name())
        } else {
            None
        };
        match existing {
            Some(pos) => {
                let id = filters[pos].id.clone();
                filters[pos] = Filter { id, ..Filter::new(kind) };
                changed_from = changed_from.min(pos);
            }
            None => {
                changed_from = changed_from.min(filters.len());
                filters.push(Filter::new(kind));
            }
        }
    }

    log::debug!(
        "Spectrum {}: {} filters, replay from index {}",
        spectrum.id(),
        filters.len(),
        changed_from
    );
    commit(spectrum, filters, changed_from)
}

/// Toggle a filter without removing it. Unknown ids and unchanged flags are no-ops.
pub fn enable_filter(
    spectrum: &mut Spectrum,
    filter_id: &str,
    enabled: bool,
) -> Result<DomainUpdateRules, FilterError> {
    let mut filters = spectrum.filters().to_vec();
    let Some(pos) = filters.iter().position(|f| f.id == filter_id) else {
        log::debug!("enable_filter: unknown filter {}", filter_id);
        return Ok(DomainUpdateRules::NONE);
    };
    if filters[pos].flag == enabled {
        return Ok(DomainUpdateRules::NONE);
    }
    filters[pos].flag = enabled;
    let toggled = filters[pos].kind.domain_rules();
    Ok(commit(spectrum, filters, pos)? | toggled)
}

/// Remove a filter permanently; protected filters are kept.
pub fn delete_filter(
    spectrum: &mut Spectrum,
    filter_id: &str,
) -> Result<DomainUpdateRules, FilterError> {
    let mut filters = spectrum.filters().to_vec();
    let Some(pos) = filters.iter().position(|f| f.id == filter_id) else {
        log::debug!("delete_filter: unknown filter {}", filter_id);
        return Ok(DomainUpdateRules::NONE);
    };
    if !filters[pos].is_delete_allowed {
        log::debug!("delete_filter: {} is protected", filters[pos].name());
        return Ok(DomainUpdateRules::NONE);
    }
    let removed = filters.remove(pos);
    let removed_rules = if removed.flag {
        removed.kind.domain_rules()
    } else {
        DomainUpdateRules::NONE
    };
    Ok(commit(spectrum, filters, pos)? | removed_rules)
}

/// Remove every deletable filter with the given name
pub fn delete_filters_by_name(
    spectrum: &mut Spectrum,
    name: &str,
) -> Result<DomainUpdateRules, FilterError> {
    let filters = spectrum.filters().to_vec();
    let Some(first) = filters
        .iter()
        .position(|f| f.name() == name && f.is_delete_allowed)
    else {
        return Ok(DomainUpdateRules::NONE);
    };
    let removed = filters
        .iter()
        .filter(|f| f.name() == name && f.is_delete_allowed && f.flag)
        .fold(DomainUpdateRules::NONE, |acc, f| acc | f.kind.domain_rules());
    let kept: Vec<Filter> = filters
        .into_iter()
        .filter(|f| !(f.name() == name && f.is_delete_allowed))
        .collect();
    Ok(commit(spectrum, kept, first)? | removed)
}

/// Recompute data from `subset` (or the stored list) without touching the
/// stored list. Used to preview the chain up to a filter being edited.
pub fn reapply_filters(
    spectrum: &mut Spectrum,
    subset: Option<&[Filter]>,
) -> Result<DomainUpdateRules, FilterError> {
    let filters = match subset {
        Some(s) => s.to_vec(),
        None => spectrum.filters().to_vec(),
    };
    run(spectrum, &filters)?;
    Ok(rules_from(&filters, 0))
}

/// Roll data back to the state just before `filter_id`; the stored list is
/// kept so the chain can be confirmed or re-applied later. The returned rules
/// cover the filters that were rolled back.
pub fn rollback_to(
    spectrum: &mut Spectrum,
    filter_id: &str,
) -> Result<DomainUpdateRules, FilterError> {
    let filters = spectrum.filters().to_vec();
    let Some(pos) = filters.iter().position(|f| f.id == filter_id) else {
        log::debug!("rollback_to: unknown filter {}", filter_id);
        return Ok(DomainUpdateRules::NONE);
    };
    run(spectrum, &filters[..pos])?;
    Ok(rules_from(&filters, pos))
}

/// Compute a preview of `kind` on top of the pre-preview snapshot. The
/// snapshot is taken on the first call and reused on every later one.
pub fn preview(spectrum: &mut Spectrum1D, kind: &FilterKind) -> Result<(), FilterError> {
    let base: Data1D = spectrum
        .temp_data
        .get_or_insert_with(|| spectrum.data.clone())
        .clone();
    let mut data = base;
    let mut info = spectrum.info.clone();
    processing::apply_1d(kind, &mut data, &mut info)?;
    spectrum.data = data;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::filter::WindowFunction;
    use crate::test_support::fid_spectrum;

    fn standard_chain() -> Vec<FilterKind> {
        vec![
            FilterKind::Apodization(WindowFunction::Exponential { lb_hz: 1.0 }),
            FilterKind::ZeroFilling { size: 512 },
            FilterKind::Fft,
        ]
    }

    #[test]
    fn test_replay_is_bit_identical() {
        let mut a = fid_spectrum("a", 300);
        apply_filters(&mut a, standard_chain(), None).unwrap();
        let first = a.as_1d().unwrap().data.clone();
        replay(&mut a).unwrap();
        let second = a.as_1d().unwrap().data.clone();
        assert_eq!(first, second);
        assert_eq!(a.filters().len(), 3);
    }

    #[test]
    fn test_apply_reports_domain_rules() {
        let mut s = fid_spectrum("a", 256);
        let rules = apply_filters(
            &mut s,
            vec![FilterKind::Apodization(WindowFunction::CosineBell)],
            None,
        )
        .unwrap();
        assert!(!rules.any());
        let rules = apply_filters(&mut s, vec![FilterKind::ZeroFilling { size: 512 }], None).unwrap();
        assert_eq!(rules, DomainUpdateRules::X);
    }

    #[test]
    fn test_same_name_replaces_in_place() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let id = s.filters()[1].id.clone();
        apply_filters(&mut s, vec![FilterKind::ZeroFilling { size: 1024 }], None).unwrap();
        assert_eq!(s.filters().len(), 3);
        assert_eq!(s.filters()[1].id, id);
        assert_eq!(s.as_1d().unwrap().data.len(), 1024);
    }

    #[test]
    fn test_filter_index_truncates_tail() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        apply_filters(&mut s, vec![FilterKind::ZeroFilling { size: 2048 }], Some(1)).unwrap();
        let names: Vec<_> = s.filters().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["apodization", "zeroFilling"]);
        assert!(s.info().is_fid);
    }

    #[test]
    fn test_disable_then_enable_restores_data() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let processed = s.as_1d().unwrap().data.clone();
        let fft_id = s.filters()[2].id.clone();

        let rules = enable_filter(&mut s, &fft_id, false).unwrap();
        assert_eq!(rules, DomainUpdateRules::BOTH);
        assert!(s.info().is_fid);
        assert_eq!(s.filters().len(), 3);

        enable_filter(&mut s, &fft_id, true).unwrap();
        assert_eq!(s.as_1d().unwrap().data, processed);
        assert_eq!(enable_filter(&mut s, &fft_id, true).unwrap(), DomainUpdateRules::NONE);
    }

    #[test]
    fn test_delete_replays_remaining() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let zf = s.filters()[1].id.clone();
        delete_filter(&mut s, &zf).unwrap();
        assert_eq!(s.filters().len(), 2);
        assert_eq!(s.as_1d().unwrap().data.len(), 256);
    }

    #[test]
    fn test_digital_filter_cannot_be_deleted() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, vec![FilterKind::DigitalFilter { group_delay: 3.0 }], None).unwrap();
        let id = s.filters()[0].id.clone();
        assert_eq!(delete_filter(&mut s, &id).unwrap(), DomainUpdateRules::NONE);
        assert_eq!(delete_filters_by_name(&mut s, "digitalFilter").unwrap(), DomainUpdateRules::NONE);
        assert_eq!(s.filters().len(), 1);
    }

    #[test]
    fn test_failed_filter_leaves_spectrum_untouched() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let before = s.clone();
        // A second FFT on frequency-domain data fails
        let err = apply_filters(&mut s, vec![FilterKind::Fft], Some(3)).unwrap_err();
        assert!(matches!(err, FilterError::RequiresFid { .. }));
        assert_eq!(s, before);
    }

    #[test]
    fn test_rollback_keeps_list() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let fft_id = s.filters()[2].id.clone();
        let rules = rollback_to(&mut s, &fft_id).unwrap();
        assert_eq!(rules, DomainUpdateRules::BOTH);
        assert!(s.info().is_fid);
        assert_eq!(s.as_1d().unwrap().data.len(), 512);
        assert_eq!(s.filters().len(), 3);
    }

    #[test]
    fn test_reapply_subset() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, standard_chain(), None).unwrap();
        let prefix = s.filters()[..1].to_vec();
        reapply_filters(&mut s, Some(&prefix)).unwrap();
        assert_eq!(s.as_1d().unwrap().data.len(), 256);
        reapply_filters(&mut s, None).unwrap();
        assert_eq!(s.as_1d().unwrap().data.len(), 512);
    }

    #[test]
    fn test_preview_uses_snapshot() {
        let mut s = fid_spectrum("a", 256);
        apply_filters(&mut s, vec![FilterKind::Fft], None).unwrap();
        let committed = s.as_1d().unwrap().data.clone();
        let s1 = s.as_1d_mut().unwrap();
        preview(s1, &FilterKind::PhaseCorrection { ph0: 90.0, ph1: 0.0 }).unwrap();
        preview(s1, &FilterKind::PhaseCorrection { ph0: 0.0, ph1: 0.0 }).unwrap();
        assert_eq!(s1.temp_data.as_ref(), Some(&committed));
        for (a, b) in s1.data.re.iter().zip(committed.re.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }
}

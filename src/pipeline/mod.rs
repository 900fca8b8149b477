pub mod filter;
pub mod manager;
pub mod processing;

pub use filter::{DomainUpdateRules, Filter, FilterKind, WindowFunction};

use thiserror::Error;

/// Numeric or algorithmic failure inside a filter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("spectrum has no samples")]
    EmptyData,
    #[error("{filter} requires time-domain (FID) data")]
    RequiresFid { filter: String },
    #[error("{filter} requires frequency-domain data")]
    RequiresFrequencyDomain { filter: String },
    #[error("{filter} cannot be applied to {dimension}D data")]
    UnsupportedDimension { filter: String, dimension: usize },
    #[error("invalid {filter} parameter: {reason}")]
    InvalidParameter { filter: String, reason: String },
    #[error("malformed 2D matrix: {0}")]
    MalformedMatrix(String),
}

#[cfg(test)]
mod tests {
    use super::manager;
    use super::*;
    use crate::test_support::{fid_2d_spectrum, fid_spectrum};

    #[test]
    fn test_full_1d_chain_from_fid() {
        let mut spectrum = fid_spectrum("proton", 1000);
        manager::apply_filters(
            &mut spectrum,
            vec![
                FilterKind::DigitalFilter { group_delay: 0.0 },
                FilterKind::Apodization(WindowFunction::Exponential { lb_hz: 0.3 }),
                FilterKind::ZeroFilling { size: 1024 },
                FilterKind::Fft,
                FilterKind::PhaseCorrection { ph0: 0.0, ph1: 0.0 },
            ],
            None,
        )
        .unwrap();

        let s = spectrum.as_1d().unwrap();
        assert!(s.info.is_ft);
        assert_eq!(s.data.len(), 1024);
        assert!(s.original_info.is_fid, "pristine info untouched");
        assert_eq!(s.original_data.len(), 1000);
    }

    #[test]
    fn test_2d_fft_transforms_matrix() {
        let mut spectrum = fid_2d_spectrum("hsqc", 12, 30);
        let rules = manager::apply_filters(&mut spectrum, vec![FilterKind::Fft2D], None).unwrap();
        assert_eq!(rules, DomainUpdateRules::BOTH);
        let s = spectrum.as_2d().unwrap();
        assert!(!s.info.is_fid);
        assert_eq!(s.data.rr.rows(), 16);
        assert_eq!(s.data.rr.cols(), 32);
        assert!(s.data.rr.z.iter().flatten().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_1d_filter_rejected_on_2d() {
        let mut spectrum = fid_2d_spectrum("hsqc", 4, 4);
        let err = manager::apply_filters(&mut spectrum, vec![FilterKind::Fft], None).unwrap_err();
        assert_eq!(
            err,
            FilterError::UnsupportedDimension {
                filter: "fft".into(),
                dimension: 2
            }
        );
    }

    #[test]
    fn test_error_messages() {
        let err = FilterError::RequiresFid { filter: "fft".into() };
        assert_eq!(err.to_string(), "fft requires time-domain (FID) data");
    }
}

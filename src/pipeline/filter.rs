/// Filter descriptors stored in a spectrum's processing history
///
/// A filter is a named, parameterised operation. The list on a spectrum is
/// replayed in order from the pristine data; `flag == false` keeps a filter in
/// the list but skips it during replay.

use std::ops::{BitOr, BitOrAssign};

use serde::{Deserialize, Serialize};

/// Available window functions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum WindowFunction {
    /// Exponential multiplication: line broadening in Hz
    #[serde(rename_all = "camelCase")]
    Exponential { lb_hz: f64 },
    /// Gaussian multiplication
    #[serde(rename_all = "camelCase")]
    Gaussian { gb: f64, lb_hz: f64 },
    /// Sine bell: power (1=sine, 2=sine-squared), offset (0-1), end (0-1)
    SineBell { power: f64, offset: f64, end: f64 },
    CosineBell,
}

impl std::fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WindowFunction::Exponential { lb_hz } => write!(f, "EM (LB={:.1} Hz)", lb_hz),
            WindowFunction::Gaussian { gb, lb_hz } => {
                write!(f, "GM (GB={:.3}, LB={:.1} Hz)", gb, lb_hz)
            }
            WindowFunction::SineBell { power, offset, end } => {
                write!(f, "Sine Bell (pow={:.1}, off={:.2}, end={:.2})", power, offset, end)
            }
            WindowFunction::CosineBell => write!(f, "Cosine Bell"),
        }
    }
}

/// Whether a filter can move the axis extents of the spectrum it touches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainUpdateRules {
    pub update_x_domain: bool,
    pub update_y_domain: bool,
}

impl DomainUpdateRules {
    pub const NONE: Self = Self {
        update_x_domain: false,
        update_y_domain: false,
    };
    pub const BOTH: Self = Self {
        update_x_domain: true,
        update_y_domain: true,
    };
    pub const X: Self = Self {
        update_x_domain: true,
        update_y_domain: false,
    };
    pub const Y: Self = Self {
        update_x_domain: false,
        update_y_domain: true,
    };

    pub fn any(&self) -> bool {
        self.update_x_domain || self.update_y_domain
    }
}

impl BitOr for DomainUpdateRules {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self {
            update_x_domain: self.update_x_domain || rhs.update_x_domain,
            update_y_domain: self.update_y_domain || rhs.update_y_domain,
        }
    }
}

impl BitOrAssign for DomainUpdateRules {
    fn bitor_assign(&mut self, rhs: Self) {
        *self = *self | rhs;
    }
}

/// Filter operation with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", content = "value", rename_all = "camelCase")]
pub enum FilterKind {
    /// Group-delay compensation of oversampled FIDs (circular shift by N points)
    #[serde(rename_all = "camelCase")]
    DigitalFilter { group_delay: f64 },
    Apodization(WindowFunction),
    ZeroFilling { size: usize },
    Fft,
    PhaseCorrection { ph0: f64, ph1: f64 },
    /// Baseline estimated from noise-only zones `[from, to]`
    BaselineCorrection { zones: Vec<[f64; 2]> },
    ShiftX { shift: f64 },
    Fft2D,
    Shift2DX { shift: f64 },
    Shift2DY { shift: f64 },
}

impl FilterKind {
    /// Stable name used in documents and for name-based deletion
    pub fn name(&self) -> &'static str {
        match self {
            FilterKind::DigitalFilter { .. } => "digitalFilter",
            FilterKind::Apodization(_) => "apodization",
            FilterKind::ZeroFilling { .. } => "zeroFilling",
            FilterKind::Fft => "fft",
            FilterKind::PhaseCorrection { .. } => "phaseCorrection",
            FilterKind::BaselineCorrection { .. } => "baselineCorrection",
            FilterKind::ShiftX { .. } => "shiftX",
            FilterKind::Fft2D => "fft2D",
            FilterKind::Shift2DX { .. } => "shift2DX",
            FilterKind::Shift2DY { .. } => "shift2DY",
        }
    }

    pub fn domain_rules(&self) -> DomainUpdateRules {
        match self {
            FilterKind::DigitalFilter { .. } => DomainUpdateRules::Y,
            FilterKind::Apodization(_) => DomainUpdateRules::NONE,
            FilterKind::ZeroFilling { .. } => DomainUpdateRules::X,
            FilterKind::Fft => DomainUpdateRules::BOTH,
            FilterKind::PhaseCorrection { .. } => DomainUpdateRules::Y,
            FilterKind::BaselineCorrection { .. } => DomainUpdateRules::Y,
            FilterKind::ShiftX { .. } => DomainUpdateRules::X,
            FilterKind::Fft2D => DomainUpdateRules::BOTH,
            FilterKind::Shift2DX { .. } => DomainUpdateRules::X,
            FilterKind::Shift2DY { .. } => DomainUpdateRules::Y,
        }
    }

    pub fn dimension(&self) -> usize {
        match self {
            FilterKind::Fft2D | FilterKind::Shift2DX { .. } | FilterKind::Shift2DY { .. } => 2,
            _ => 1,
        }
    }

    /// The digital filter comes with the raw data and cannot be removed
    pub fn is_delete_allowed(&self) -> bool {
        !matches!(self, FilterKind::DigitalFilter { .. })
    }
}

impl std::fmt::Display for FilterKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FilterKind::DigitalFilter { group_delay } => {
                write!(f, "Digital Filter (GRPDLY={:.2})", group_delay)
            }
            FilterKind::Apodization(wf) => write!(f, "Apodization: {}", wf),
            FilterKind::ZeroFilling { size } => write!(f, "Zero Fill → {} points", size),
            FilterKind::Fft => write!(f, "Fourier Transform"),
            FilterKind::PhaseCorrection { ph0, ph1 } => {
                write!(f, "Phase Correction (PH0={:.1}°, PH1={:.1}°)", ph0, ph1)
            }
            FilterKind::BaselineCorrection { zones } => {
                write!(f, "Baseline Correction ({} zones)", zones.len())
            }
            FilterKind::ShiftX { shift } => write!(f, "Shift X ({:+.4})", shift),
            FilterKind::Fft2D => write!(f, "2D Fourier Transform"),
            FilterKind::Shift2DX { shift } => write!(f, "Shift F2 ({:+.4})", shift),
            FilterKind::Shift2DY { shift } => write!(f, "Shift F1 ({:+.4})", shift),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    pub id: String,
    #[serde(flatten)]
    pub kind: FilterKind,
    #[serde(default)]
    pub label: String,
    /// Enabled flag; disabled filters are skipped on replay
    #[serde(default = "enabled")]
    pub flag: bool,
    #[serde(default = "enabled")]
    pub is_delete_allowed: bool,
}

fn enabled() -> bool {
    true
}

impl Filter {
    pub fn new(kind: FilterKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            label: kind.to_string(),
            is_delete_allowed: kind.is_delete_allowed(),
            flag: true,
            kind,
        }
    }

    pub fn name(&self) -> &'static str {
        self.kind.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_json_shape() {
        let filter = Filter::new(FilterKind::ZeroFilling { size: 1024 });
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["name"], "zeroFilling");
        assert_eq!(value["value"]["size"], 1024);
        assert_eq!(value["flag"], true);
        let back: Filter = serde_json::from_value(value).unwrap();
        assert_eq!(back, filter);
    }

    #[test]
    fn test_apodization_json_shape() {
        let filter = Filter::new(FilterKind::Apodization(WindowFunction::Exponential {
            lb_hz: 0.3,
        }));
        let value = serde_json::to_value(&filter).unwrap();
        assert_eq!(value["name"], "apodization");
        assert_eq!(value["value"]["kind"], "exponential");
        assert_eq!(value["value"]["lbHz"], 0.3);
    }

    #[test]
    fn test_rules_accumulate() {
        let mut rules = DomainUpdateRules::NONE;
        rules |= FilterKind::Apodization(WindowFunction::CosineBell).domain_rules();
        assert!(!rules.any());
        rules |= FilterKind::ZeroFilling { size: 8 }.domain_rules();
        assert_eq!(rules, DomainUpdateRules::X);
        rules |= FilterKind::PhaseCorrection { ph0: 0.0, ph1: 0.0 }.domain_rules();
        assert_eq!(rules, DomainUpdateRules::BOTH);
    }

    #[test]
    fn test_digital_filter_is_protected() {
        let filter = Filter::new(FilterKind::DigitalFilter { group_delay: 67.98 });
        assert!(!filter.is_delete_allowed);
        assert_eq!(filter.name(), "digitalFilter");
    }
}

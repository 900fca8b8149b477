/// Peaks, integrals, ranges and zones attached to spectra
///
/// Integrals and ranges carry an absolute (raw) area plus a relative value
/// normalised against `SumOptions::sum`. Only entries whose kind counts as a
/// signal contribute to the normalisation.

use serde::{Deserialize, Serialize};

/// Classification of an integrated region
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalKind {
    #[default]
    Signal,
    Solvent,
    Impurity,
    Reagent,
    Standard,
}

impl SignalKind {
    pub fn counts_in_sum(&self) -> bool {
        matches!(self, SignalKind::Signal)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Peak {
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
}

impl Peak {
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            x,
            y,
            width: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Peaks {
    #[serde(default)]
    pub values: Vec<Peak>,
}

/// How relative integrations are normalised
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SumOptions {
    pub sum: f64,
    pub is_sum_constant: bool,
    /// Take the sum from the molecular formula of `molecule_id` (or the first molecule)
    pub sum_auto: bool,
    pub molecule_id: Option<String>,
}

impl Default for SumOptions {
    fn default() -> Self {
        Self {
            sum: 100.0,
            is_sum_constant: true,
            sum_auto: false,
            molecule_id: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Integral {
    pub id: String,
    pub from: f64,
    pub to: f64,
    pub absolute: f64,
    #[serde(default)]
    pub integral: f64,
    #[serde(default)]
    pub kind: SignalKind,
}

impl Integral {
    pub fn new(from: f64, to: f64, absolute: f64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            from: from.min(to),
            to: from.max(to),
            absolute,
            integral: 0.0,
            kind: SignalKind::Signal,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Integrals {
    #[serde(default)]
    pub values: Vec<Integral>,
    #[serde(default)]
    pub options: SumOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coupling {
    pub coupling: f64,
    pub multiplicity: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signal1D {
    pub id: String,
    pub delta: f64,
    pub multiplicity: String,
    #[serde(default)]
    pub kind: SignalKind,
    #[serde(default)]
    pub js: Vec<Coupling>,
    #[serde(default)]
    pub peaks: Vec<Peak>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Range {
    pub id: String,
    pub from: f64,
    pub to: f64,
    pub absolute: f64,
    #[serde(default)]
    pub integration: f64,
    #[serde(default)]
    pub kind: SignalKind,
    #[serde(default)]
    pub signals: Vec<Signal1D>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ranges {
    #[serde(default)]
    pub values: Vec<Range>,
    #[serde(default)]
    pub options: SumOptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ZoneAxis {
    pub from: f64,
    pub to: f64,
}

impl ZoneAxis {
    pub fn new(a: f64, b: f64) -> Self {
        Self {
            from: a.min(b),
            to: a.max(b),
        }
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.from && v <= self.to
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SignalAxis {
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak2D {
    pub id: String,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal2D {
    pub id: String,
    pub x: SignalAxis,
    pub y: SignalAxis,
    #[serde(default)]
    pub kind: SignalKind,
    #[serde(default)]
    pub peaks: Vec<Peak2D>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub x: ZoneAxis,
    pub y: ZoneAxis,
    #[serde(default)]
    pub kind: SignalKind,
    #[serde(default)]
    pub signals: Vec<Signal2D>,
}

impl Zone {
    /// Zone holding a single signal at the given peak
    pub fn around(peak: Peak2D, x: ZoneAxis, y: ZoneAxis) -> Self {
        let signal = Signal2D {
            id: uuid::Uuid::new_v4().to_string(),
            x: SignalAxis { delta: peak.x },
            y: SignalAxis { delta: peak.y },
            kind: SignalKind::Signal,
            peaks: vec![peak],
        };
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            x,
            y,
            kind: SignalKind::Signal,
            signals: vec![signal],
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Zones {
    #[serde(default)]
    pub values: Vec<Zone>,
}

/// Anything with an absolute area that is normalised against a sum
pub trait Integrable {
    fn absolute(&self) -> f64;
    fn kind(&self) -> SignalKind;
    fn set_relative(&mut self, value: f64);
    fn relative(&self) -> f64;
}

impl Integrable for Integral {
    fn absolute(&self) -> f64 {
        self.absolute
    }
    fn kind(&self) -> SignalKind {
        self.kind
    }
    fn set_relative(&mut self, value: f64) {
        self.integral = value;
    }
    fn relative(&self) -> f64 {
        self.integral
    }
}

impl Integrable for Range {
    fn absolute(&self) -> f64 {
        self.absolute
    }
    fn kind(&self) -> SignalKind {
        self.kind
    }
    fn set_relative(&mut self, value: f64) {
        self.integration = value;
    }
    fn relative(&self) -> f64 {
        self.integration
    }
}

/// Distribute `sum` over the signal entries in proportion to their absolute
/// areas. Non-signal entries get a relative value on the same scale but do not
/// take part in the total.
pub fn normalize<T: Integrable>(values: &mut [T], sum: f64) {
    let total: f64 = values
        .iter()
        .filter(|v| v.kind().counts_in_sum())
        .map(|v| v.absolute())
        .sum();
    let factor = if total != 0.0 { sum / total } else { 0.0 };
    for v in values.iter_mut() {
        let relative = v.absolute() * factor;
        v.set_relative(relative);
    }
}

use serde::{Deserialize, Serialize};

use super::annotations::{Integrals, Peaks, Ranges, Zones};
use crate::pipeline::filter::Filter;

/// Nucleus type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Nucleus {
    H1,
    C13,
    N15,
    F19,
    P31,
    Other(String),
}

impl std::fmt::Display for Nucleus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Nucleus::H1 => write!(f, "1H"),
            Nucleus::C13 => write!(f, "13C"),
            Nucleus::N15 => write!(f, "15N"),
            Nucleus::F19 => write!(f, "19F"),
            Nucleus::P31 => write!(f, "31P"),
            Nucleus::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Nucleus {
    fn from(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "1H" | "H1" | "H" => Nucleus::H1,
            "13C" | "C13" | "C" => Nucleus::C13,
            "15N" | "N15" | "N" => Nucleus::N15,
            "19F" | "F19" | "F" => Nucleus::F19,
            "31P" | "P31" | "P" => Nucleus::P31,
            _ => Nucleus::Other(s.trim().to_string()),
        }
    }
}

impl From<String> for Nucleus {
    fn from(s: String) -> Self {
        Nucleus::from(s.as_str())
    }
}

impl From<Nucleus> for String {
    fn from(n: Nucleus) -> Self {
        n.to_string()
    }
}

impl Nucleus {
    /// Element symbol of the observed isotope ("1H" -> "H")
    pub fn element(&self) -> String {
        match self {
            Nucleus::H1 => "H".into(),
            Nucleus::C13 => "C".into(),
            Nucleus::N15 => "N".into(),
            Nucleus::F19 => "F".into(),
            Nucleus::P31 => "P".into(),
            Nucleus::Other(s) => s.trim_start_matches(|c: char| c.is_ascii_digit()).to_string(),
        }
    }
}

/// Experiment type detected from the experiment name or the nuclei
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExperimentType {
    Proton,
    Carbon,
    Dept135,
    Cosy,
    Hsqc,
    Hmbc,
    Other(String),
}

impl std::fmt::Display for ExperimentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExperimentType::Proton => write!(f, "1H"),
            ExperimentType::Carbon => write!(f, "13C"),
            ExperimentType::Dept135 => write!(f, "DEPT-135"),
            ExperimentType::Cosy => write!(f, "COSY"),
            ExperimentType::Hsqc => write!(f, "HSQC"),
            ExperimentType::Hmbc => write!(f, "HMBC"),
            ExperimentType::Other(s) => write!(f, "{}", s),
        }
    }
}

/// Detect experiment type from a name such as "2-chlorobutane_HSQC"
pub fn detect_experiment_type(name: &str) -> Option<ExperimentType> {
    let upper = name.to_uppercase();
    if upper.contains("PROTON") || upper.contains("1H") {
        Some(ExperimentType::Proton)
    } else if upper.contains("135") || upper.contains("DEPT") {
        Some(ExperimentType::Dept135)
    } else if upper.contains("HSQC") {
        Some(ExperimentType::Hsqc)
    } else if upper.contains("HMBC") {
        Some(ExperimentType::Hmbc)
    } else if upper.contains("COSY") {
        Some(ExperimentType::Cosy)
    } else if upper.contains("CARBON") || upper.contains("13C") {
        Some(ExperimentType::Carbon)
    } else {
        None
    }
}

/// Acquisition and processing metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Info {
    pub name: String,
    pub dimension: usize,
    /// One nucleus per dimension, direct dimension first
    pub nucleus: Vec<Nucleus>,
    pub is_fid: bool,
    pub is_ft: bool,
    pub is_complex: bool,
    /// Observe frequency in MHz, one per dimension
    pub origin_frequency: Vec<f64>,
    /// Carrier position in ppm, one per dimension
    pub frequency_offset: Vec<f64>,
    pub experiment: String,
}

impl Default for Info {
    fn default() -> Self {
        Self {
            name: String::new(),
            dimension: 1,
            nucleus: vec![Nucleus::H1],
            is_fid: false,
            is_ft: true,
            is_complex: false,
            origin_frequency: vec![400.0],
            frequency_offset: vec![0.0],
            experiment: String::new(),
        }
    }
}

impl Info {
    pub fn frequency(&self, dim: usize) -> f64 {
        self.origin_frequency
            .get(dim)
            .or_else(|| self.origin_frequency.first())
            .copied()
            .unwrap_or(400.0)
    }

    pub fn offset(&self, dim: usize) -> f64 {
        self.frequency_offset.get(dim).copied().unwrap_or(0.0)
    }

    pub fn nucleus(&self, dim: usize) -> Nucleus {
        self.nucleus.get(dim).cloned().unwrap_or(Nucleus::H1)
    }

    /// Tab key grouping spectra: "1H" for 1D, "1H,13C" for 2D
    pub fn tab_key(&self) -> String {
        if self.dimension >= 2 {
            format!("{},{}", self.nucleus(0), self.nucleus(1))
        } else {
            self.nucleus(0).to_string()
        }
    }

    pub fn experiment_type(&self) -> ExperimentType {
        if let Some(exp) = detect_experiment_type(&self.experiment) {
            return exp;
        }
        if self.dimension >= 2 {
            let (a, b) = (self.nucleus(0), self.nucleus(1));
            if a == b {
                ExperimentType::Cosy
            } else if a == Nucleus::H1 && b == Nucleus::C13 {
                ExperimentType::Hsqc
            } else {
                ExperimentType::Other(format!("{}-{}", a, b))
            }
        } else {
            match self.nucleus(0) {
                Nucleus::H1 => ExperimentType::Proton,
                Nucleus::C13 => ExperimentType::Carbon,
                other => ExperimentType::Other(other.to_string()),
            }
        }
    }
}

/// Palette handed out to newly loaded spectra
pub const SPECTRUM_COLORS: &[&str] = &[
    "#C10020", "#007D34", "#0000FF", "#FF6800", "#803E75", "#A6BDD7", "#CEA262", "#817066",
    "#F6768E", "#00538A", "#FF7A5C", "#53377A", "#FF8E00", "#B32851", "#F4C800", "#7F180D",
];

/// 2D contours use a positive/negative pair
pub const CONTOUR_COLORS: &[(&str, &str)] = &[
    ("darkblue", "blue"),
    ("darkred", "red"),
    ("darkgreen", "green"),
    ("darkcyan", "cyan"),
    ("darkmagenta", "magenta"),
    ("darkgoldenrod", "goldenrod"),
];

/// First palette color not in `used`, cycling when all are taken
pub fn next_color(used: &[&str]) -> String {
    SPECTRUM_COLORS
        .iter()
        .find(|c| !used.contains(*c))
        .copied()
        .unwrap_or(SPECTRUM_COLORS[used.len() % SPECTRUM_COLORS.len()])
        .to_string()
}

pub fn next_contour_colors(used: &[&str]) -> (String, String) {
    let (pos, neg) = CONTOUR_COLORS
        .iter()
        .find(|(p, _)| !used.contains(p))
        .copied()
        .unwrap_or(CONTOUR_COLORS[used.len() % CONTOUR_COLORS.len()]);
    (pos.to_string(), neg.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Display {
    pub is_visible: bool,
    pub is_real_spectrum_visible: bool,
    pub color: String,
    pub positive_color: String,
    pub negative_color: String,
}

impl Default for Display {
    fn default() -> Self {
        Self {
            is_visible: true,
            is_real_spectrum_visible: true,
            color: SPECTRUM_COLORS[0].to_string(),
            positive_color: CONTOUR_COLORS[0].0.to_string(),
            negative_color: CONTOUR_COLORS[0].1.to_string(),
        }
    }
}

/// Minimum and maximum of a sample array, `None` when empty or all NaN
pub fn extent(values: &[f64]) -> Option<[f64; 2]> {
    values
        .iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<[f64; 2]>, &v| match acc {
            None => Some([v, v]),
            Some([lo, hi]) => Some([lo.min(v), hi.max(v)]),
        })
}

/// 1D samples: abscissa in ppm (FT) or seconds (FID)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data1D {
    pub x: Vec<f64>,
    pub re: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub im: Option<Vec<f64>>,
}

impl Data1D {
    pub fn len(&self) -> usize {
        self.re.len().min(self.x.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn x_extent(&self) -> Option<[f64; 2]> {
        extent(&self.x)
    }

    pub fn y_extent(&self) -> Option<[f64; 2]> {
        extent(&self.re)
    }

    /// Index of the sample whose x is closest to `x`
    pub fn nearest_index(&self, x: f64) -> Option<usize> {
        self.x
            .iter()
            .take(self.len())
            .enumerate()
            .min_by(|a, b| (a.1 - x).abs().total_cmp(&(b.1 - x).abs()))
            .map(|(i, _)| i)
    }

    /// Indices with `from <= x <= to`, order of the bounds irrelevant
    pub fn indices_between(&self, from: f64, to: f64) -> impl Iterator<Item = usize> + '_ {
        let (lo, hi) = (from.min(to), from.max(to));
        self.x
            .iter()
            .take(self.len())
            .enumerate()
            .filter(move |&(_, &x)| x >= lo && x <= hi)
            .map(|(i, _)| i)
    }
}

/// Regular grid: `z[row][col]`, rows along y, columns along x
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Matrix {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
    pub z: Vec<Vec<f64>>,
}

impl Matrix {
    pub fn rows(&self) -> usize {
        self.z.len()
    }

    pub fn cols(&self) -> usize {
        self.z.first().map(|r| r.len()).unwrap_or(0)
    }

    pub fn x_at(&self, col: usize) -> f64 {
        let n = self.cols();
        if n < 2 {
            return self.min_x;
        }
        self.min_x + col as f64 * (self.max_x - self.min_x) / (n - 1) as f64
    }

    pub fn y_at(&self, row: usize) -> f64 {
        let n = self.rows();
        if n < 2 {
            return self.min_y;
        }
        self.min_y + row as f64 * (self.max_y - self.min_y) / (n - 1) as f64
    }

    pub fn z_extent(&self) -> Option<[f64; 2]> {
        self.z.iter().filter_map(|row| extent(row)).reduce(|a, b| [a[0].min(b[0]), a[1].max(b[1])])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Data2D {
    pub rr: Matrix,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ii: Option<Matrix>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrum1D {
    pub id: String,
    pub info: Info,
    pub original_info: Info,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub data: Data1D,
    pub original_data: Data1D,
    /// Pre-preview copy of `data` while a preview tool is active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_data: Option<Data1D>,
    #[serde(default)]
    pub peaks: Peaks,
    #[serde(default)]
    pub integrals: Integrals,
    #[serde(default)]
    pub ranges: Ranges,
}

impl Spectrum1D {
    pub fn new(info: Info, data: Data1D) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original_info: info.clone(),
            info,
            display: Display::default(),
            filters: Vec::new(),
            original_data: data.clone(),
            data,
            temp_data: None,
            peaks: Peaks::default(),
            integrals: Integrals::default(),
            ranges: Ranges::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrum2D {
    pub id: String,
    pub info: Info,
    pub original_info: Info,
    #[serde(default)]
    pub display: Display,
    #[serde(default)]
    pub filters: Vec<Filter>,
    pub data: Data2D,
    pub original_data: Data2D,
    #[serde(default)]
    pub zones: Zones,
}

impl Spectrum2D {
    pub fn new(info: Info, data: Data2D) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            original_info: info.clone(),
            info,
            display: Display::default(),
            filters: Vec::new(),
            original_data: data.clone(),
            data,
            zones: Zones::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Spectrum {
    OneD(Spectrum1D),
    TwoD(Spectrum2D),
}

impl Spectrum {
    pub fn id(&self) -> &str {
        match self {
            Spectrum::OneD(s) => &s.id,
            Spectrum::TwoD(s) => &s.id,
        }
    }

    pub fn set_id(&mut self, id: String) {
        match self {
            Spectrum::OneD(s) => s.id = id,
            Spectrum::TwoD(s) => s.id = id,
        }
    }

    pub fn info(&self) -> &Info {
        match self {
            Spectrum::OneD(s) => &s.info,
            Spectrum::TwoD(s) => &s.info,
        }
    }

    pub fn display(&self) -> &Display {
        match self {
            Spectrum::OneD(s) => &s.display,
            Spectrum::TwoD(s) => &s.display,
        }
    }

    pub fn display_mut(&mut self) -> &mut Display {
        match self {
            Spectrum::OneD(s) => &mut s.display,
            Spectrum::TwoD(s) => &mut s.display,
        }
    }

    pub fn filters(&self) -> &[Filter] {
        match self {
            Spectrum::OneD(s) => &s.filters,
            Spectrum::TwoD(s) => &s.filters,
        }
    }

    pub fn filters_mut(&mut self) -> &mut Vec<Filter> {
        match self {
            Spectrum::OneD(s) => &mut s.filters,
            Spectrum::TwoD(s) => &mut s.filters,
        }
    }

    pub fn tab_key(&self) -> String {
        self.info().tab_key()
    }

    pub fn is_fid(&self) -> bool {
        self.info().is_fid
    }

    pub fn is_1d(&self) -> bool {
        matches!(self, Spectrum::OneD(_))
    }

    pub fn as_1d(&self) -> Option<&Spectrum1D> {
        match self {
            Spectrum::OneD(s) => Some(s),
            Spectrum::TwoD(_) => None,
        }
    }

    pub fn as_1d_mut(&mut self) -> Option<&mut Spectrum1D> {
        match self {
            Spectrum::OneD(s) => Some(s),
            Spectrum::TwoD(_) => None,
        }
    }

    pub fn as_2d(&self) -> Option<&Spectrum2D> {
        match self {
            Spectrum::TwoD(s) => Some(s),
            Spectrum::OneD(_) => None,
        }
    }

    pub fn as_2d_mut(&mut self) -> Option<&mut Spectrum2D> {
        match self {
            Spectrum::TwoD(s) => Some(s),
            Spectrum::OneD(_) => None,
        }
    }

    pub fn has_temp_data(&self) -> bool {
        matches!(self, Spectrum::OneD(s) if s.temp_data.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nucleus_parsing_and_display() {
        assert_eq!(Nucleus::from("1h"), Nucleus::H1);
        assert_eq!(Nucleus::from("C13"), Nucleus::C13);
        assert_eq!(Nucleus::from("29Si"), Nucleus::Other("29Si".into()));
        assert_eq!(Nucleus::from("29Si").element(), "Si");
        assert_eq!(Nucleus::C13.to_string(), "13C");
        let json = serde_json::to_string(&Nucleus::N15).unwrap();
        assert_eq!(json, "\"15N\"");
    }

    #[test]
    fn test_tab_keys() {
        let mut info = Info::default();
        assert_eq!(info.tab_key(), "1H");
        info.dimension = 2;
        info.nucleus = vec![Nucleus::H1, Nucleus::C13];
        assert_eq!(info.tab_key(), "1H,13C");
        assert_eq!(info.experiment_type(), ExperimentType::Hsqc);
        info.experiment = "hmbc".into();
        assert_eq!(info.experiment_type(), ExperimentType::Hmbc);
    }

    #[test]
    fn test_nearest_index_and_window() {
        let data = Data1D {
            x: vec![0.0, 1.0, 2.0, 3.0, 4.0],
            re: vec![0.0, 5.0, 1.0, 7.0, 2.0],
            im: None,
        };
        assert_eq!(data.nearest_index(2.8), Some(3));
        let idx: Vec<usize> = data.indices_between(3.5, 0.5).collect();
        assert_eq!(idx, vec![1, 2, 3]);
        assert_eq!(data.y_extent(), Some([0.0, 7.0]));
    }

    #[test]
    fn test_untagged_spectrum_roundtrip() {
        let s = Spectrum::OneD(Spectrum1D::new(
            Info::default(),
            Data1D { x: vec![0.0, 1.0], re: vec![1.0, 2.0], im: None },
        ));
        let json = serde_json::to_string(&s).unwrap();
        let back: Spectrum = serde_json::from_str(&json).unwrap();
        assert!(back.is_1d());
        assert_eq!(back, s);
    }

    #[test]
    fn test_palette_skips_used_colors() {
        let first = next_color(&[]);
        let second = next_color(&[first.as_str()]);
        assert_ne!(first, second);
    }
}

/// Actions accepted by the reducer
///
/// Serialized as `{"type": "...", "payload": {...}}` with SCREAMING_SNAKE_CASE
/// type names and camelCase payload fields.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::analysis::{PeakPickingOptions, RangeOptions, ZoneOptions};
use crate::data::annotations::{SignalKind, SumOptions};
use crate::data::document::NmriumDocument;
use crate::data::spectrum::Spectrum;
use crate::pipeline::FilterKind;
use crate::state::{Preferences, Tool, VerticalAlign};

pub use crate::state::active::Modifier;
pub use crate::state::zoom::{ZoomDirection, ZoomOutKind};

/// View flag of the ranges panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RangesViewFlag {
    ShowIntegrals,
    ShowMultiplicityTrees,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    content = "payload",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum Action {
    // Spectra
    LoadSpectra {
        spectra: Vec<Spectrum>,
    },
    LoadDocument(NmriumDocument),
    /// Delete the given spectra, or the active ones when `ids` is absent
    DeleteSpectra {
        #[serde(default)]
        ids: Option<Vec<String>>,
    },
    ChangeSpectrumVisibility {
        id: String,
        is_visible: bool,
    },
    ChangeSpectrumColor {
        id: String,
        color: String,
    },

    // Filters, applied to the active spectra
    ApplyFilters {
        filters: Vec<FilterKind>,
        #[serde(default)]
        filter_index: Option<usize>,
    },
    PreviewFilter {
        filter: FilterKind,
    },
    EnableFilter {
        id: String,
        enabled: bool,
    },
    DeleteFilter {
        id: String,
    },
    /// Delete every filter with this name from the spectra of the active tab
    DeleteSpectraFilter {
        name: String,
    },
    /// Roll the active spectra back to just before a filter; `None` restores the full chain
    SetFilterSnapshot {
        #[serde(default)]
        id: Option<String>,
    },
    AutoPhaseCorrection,

    // Peaks
    AddPeak {
        x: f64,
    },
    AddPeaks {
        from: f64,
        to: f64,
    },
    DeletePeak {
        #[serde(default)]
        id: Option<String>,
    },
    AutoPeakPicking {
        #[serde(default)]
        options: Option<PeakPickingOptions>,
    },
    TogglePeakMarkers,

    // Integrals
    AddIntegral {
        from: f64,
        to: f64,
    },
    ResizeIntegral {
        id: String,
        from: f64,
        to: f64,
    },
    DeleteIntegral {
        #[serde(default)]
        id: Option<String>,
    },
    ChangeIntegralsSumOptions {
        options: SumOptions,
    },

    // Ranges
    AutoRangesDetection {
        #[serde(default)]
        options: Option<RangeOptions>,
    },
    AddRange {
        from: f64,
        to: f64,
    },
    ResizeRange {
        id: String,
        from: f64,
        to: f64,
    },
    DeleteRange {
        #[serde(default)]
        id: Option<String>,
    },
    ChangeRangesSumOptions {
        options: SumOptions,
    },
    ChangeRangeRelativeValue {
        id: String,
        value: f64,
    },
    ChangeRangeSignalValue {
        range_id: String,
        signal_id: String,
        delta: f64,
    },
    ChangeRangeKind {
        id: String,
        kind: SignalKind,
    },
    ToggleRangesViewProperty {
        flag: RangesViewFlag,
    },

    // Zones
    AutoZonesDetection {
        #[serde(default)]
        options: Option<ZoneOptions>,
    },
    AddZone {
        x1: f64,
        x2: f64,
        y1: f64,
        y2: f64,
    },
    DeleteZone {
        #[serde(default)]
        id: Option<String>,
    },
    ChangeZoneSignalValue {
        zone_id: String,
        signal_id: String,
        #[serde(default)]
        x_delta: Option<f64>,
        #[serde(default)]
        y_delta: Option<f64>,
    },
    ToggleZonesPeaks,

    // View and zoom
    SetActiveTab {
        tab: String,
    },
    ChangeActiveSpectrum {
        id: String,
        #[serde(default)]
        modifier: Modifier,
    },
    SetZoom {
        scale: f64,
        #[serde(default)]
        spectrum_id: Option<String>,
    },
    WheelZoom {
        direction: ZoomDirection,
        #[serde(default)]
        spectrum_id: Option<String>,
    },
    BrushEnd {
        start_x: f64,
        end_x: f64,
        #[serde(default)]
        start_y: Option<f64>,
        #[serde(default)]
        end_y: Option<f64>,
    },
    SetXDomain {
        x_domain: [f64; 2],
    },
    FullZoomOut {
        kind: ZoomOutKind,
    },
    SetVerticalAlign {
        align: VerticalAlign,
    },

    // Tools
    SetSelectedTool {
        tool: Tool,
    },
    ResetSelectedTool,
    AddBaselineZone {
        from: f64,
        to: f64,
    },
    DeleteBaselineZone {
        id: String,
    },
    SetVerticalIndicator {
        #[serde(default)]
        position: Option<f64>,
    },

    // Molecules and correlations
    AddMolecule {
        molfile: String,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        formula: Option<String>,
    },
    DeleteMolecule {
        id: String,
    },
    SetCorrelationsMf {
        #[serde(default)]
        mf: Option<String>,
    },
    SetCorrelationsTolerance {
        tolerance: BTreeMap<String, f64>,
    },
    SetCorrelation {
        id: String,
        #[serde(default)]
        equivalence: Option<u32>,
        #[serde(default)]
        hybridization: Option<String>,
    },

    // Preferences
    SetPreferences {
        preferences: Preferences,
    },
    SetKeyPreferences {
        key: String,
    },
    ApplyKeyPreferences {
        key: String,
    },
    ClearError,
}

impl Action {
    /// Wire name of the action
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::LoadSpectra { .. } => "LOAD_SPECTRA",
            Action::LoadDocument(_) => "LOAD_DOCUMENT",
            Action::DeleteSpectra { .. } => "DELETE_SPECTRA",
            Action::ChangeSpectrumVisibility { .. } => "CHANGE_SPECTRUM_VISIBILITY",
            Action::ChangeSpectrumColor { .. } => "CHANGE_SPECTRUM_COLOR",
            Action::ApplyFilters { .. } => "APPLY_FILTERS",
            Action::PreviewFilter { .. } => "PREVIEW_FILTER",
            Action::EnableFilter { .. } => "ENABLE_FILTER",
            Action::DeleteFilter { .. } => "DELETE_FILTER",
            Action::DeleteSpectraFilter { .. } => "DELETE_SPECTRA_FILTER",
            Action::SetFilterSnapshot { .. } => "SET_FILTER_SNAPSHOT",
            Action::AutoPhaseCorrection => "AUTO_PHASE_CORRECTION",
            Action::AddPeak { .. } => "ADD_PEAK",
            Action::AddPeaks { .. } => "ADD_PEAKS",
            Action::DeletePeak { .. } => "DELETE_PEAK",
            Action::AutoPeakPicking { .. } => "AUTO_PEAK_PICKING",
            Action::TogglePeakMarkers => "TOGGLE_PEAK_MARKERS",
            Action::AddIntegral { .. } => "ADD_INTEGRAL",
            Action::ResizeIntegral { .. } => "RESIZE_INTEGRAL",
            Action::DeleteIntegral { .. } => "DELETE_INTEGRAL",
            Action::ChangeIntegralsSumOptions { .. } => "CHANGE_INTEGRALS_SUM_OPTIONS",
            Action::AutoRangesDetection { .. } => "AUTO_RANGES_DETECTION",
            Action::AddRange { .. } => "ADD_RANGE",
            Action::ResizeRange { .. } => "RESIZE_RANGE",
            Action::DeleteRange { .. } => "DELETE_RANGE",
            Action::ChangeRangesSumOptions { .. } => "CHANGE_RANGES_SUM_OPTIONS",
            Action::ChangeRangeRelativeValue { .. } => "CHANGE_RANGE_RELATIVE_VALUE",
            Action::ChangeRangeSignalValue { .. } => "CHANGE_RANGE_SIGNAL_VALUE",
            Action::ChangeRangeKind { .. } => "CHANGE_RANGE_KIND",
            Action::ToggleRangesViewProperty { .. } => "TOGGLE_RANGES_VIEW_PROPERTY",
            Action::AutoZonesDetection { .. } => "AUTO_ZONES_DETECTION",
            Action::AddZone { .. } => "ADD_ZONE",
            Action::DeleteZone { .. } => "DELETE_ZONE",
            Action::ChangeZoneSignalValue { .. } => "CHANGE_ZONE_SIGNAL_VALUE",
            Action::ToggleZonesPeaks => "TOGGLE_ZONES_PEAKS",
            Action::SetActiveTab { .. } => "SET_ACTIVE_TAB",
            Action::ChangeActiveSpectrum { .. } => "CHANGE_ACTIVE_SPECTRUM",
            Action::SetZoom { .. } => "SET_ZOOM",
            Action::WheelZoom { .. } => "WHEEL_ZOOM",
            Action::BrushEnd { .. } => "BRUSH_END",
            Action::SetXDomain { .. } => "SET_X_DOMAIN",
            Action::FullZoomOut { .. } => "FULL_ZOOM_OUT",
            Action::SetVerticalAlign { .. } => "SET_VERTICAL_ALIGN",
            Action::SetSelectedTool { .. } => "SET_SELECTED_TOOL",
            Action::ResetSelectedTool => "RESET_SELECTED_TOOL",
            Action::AddBaselineZone { .. } => "ADD_BASELINE_ZONE",
            Action::DeleteBaselineZone { .. } => "DELETE_BASELINE_ZONE",
            Action::SetVerticalIndicator { .. } => "SET_VERTICAL_INDICATOR",
            Action::AddMolecule { .. } => "ADD_MOLECULE",
            Action::DeleteMolecule { .. } => "DELETE_MOLECULE",
            Action::SetCorrelationsMf { .. } => "SET_CORRELATIONS_MF",
            Action::SetCorrelationsTolerance { .. } => "SET_CORRELATIONS_TOLERANCE",
            Action::SetCorrelation { .. } => "SET_CORRELATION",
            Action::SetPreferences { .. } => "SET_PREFERENCES",
            Action::SetKeyPreferences { .. } => "SET_KEY_PREFERENCES",
            Action::ApplyKeyPreferences { .. } => "APPLY_KEY_PREFERENCES",
            Action::ClearError => "CLEAR_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_shape() {
        let action = Action::ChangeActiveSpectrum {
            id: "a".into(),
            modifier: Modifier::ShiftCtrl,
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(
            value,
            json!({"type": "CHANGE_ACTIVE_SPECTRUM", "payload": {"id": "a", "modifier": "shiftCtrl"}})
        );
        assert_eq!(value["type"], action.action_type());
    }

    #[test]
    fn test_optional_payload_fields() {
        let action: Action =
            serde_json::from_value(json!({"type": "BRUSH_END", "payload": {"startX": 1.0, "endX": 2.0}}))
                .unwrap();
        assert_eq!(
            action,
            Action::BrushEnd {
                start_x: 1.0,
                end_x: 2.0,
                start_y: None,
                end_y: None
            }
        );
        let action: Action = serde_json::from_value(json!({"type": "RESET_SELECTED_TOOL"})).unwrap();
        assert_eq!(action, Action::ResetSelectedTool);
    }

    #[test]
    fn test_filter_payload() {
        let action: Action = serde_json::from_value(json!({
            "type": "APPLY_FILTERS",
            "payload": {"filters": [{"name": "zeroFilling", "value": {"size": 4096}}]}
        }))
        .unwrap();
        assert_eq!(
            action,
            Action::ApplyFilters {
                filters: vec![FilterKind::ZeroFilling { size: 4096 }],
                filter_index: None
            }
        );
    }

    #[test]
    fn test_type_names_match_serde() {
        let samples = vec![
            Action::ClearError,
            Action::FullZoomOut { kind: ZoomOutKind::StepHorizontal },
            Action::SetXDomain { x_domain: [0.0, 1.0] },
            Action::DeleteSpectra { ids: None },
        ];
        for action in samples {
            let value = serde_json::to_value(&action).unwrap();
            assert_eq!(value["type"], action.action_type());
        }
    }
}

//! The immutable state tree
//!
//! Branches shared between successive states are reference counted; a handler
//! only clones the branch it touches (`Arc::make_mut`), so unchanged spectra,
//! molecules and correlations keep their identity across dispatches.

pub mod active;
pub mod domain;
pub mod preferences;
pub mod zoom;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlation::{self, CorrelationData};
use crate::data::molecule::Molecule;
use crate::data::spectrum::Spectrum;
use crate::error::EngineError;
use crate::pipeline::{manager, DomainUpdateRules};

pub use preferences::{KeySnapshot, Preferences};

/// Which kind of data the active tab is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisplayMode {
    #[default]
    Frequency,
    Time,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveSpectrum {
    pub id: String,
    /// Position of the spectrum within its tab
    pub index: usize,
    pub selected: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpectraView {
    pub active_tab: Option<String>,
    pub active_spectra: BTreeMap<String, Vec<ActiveSpectrum>>,
    /// Anchor of shift-range selection, one per tab
    pub selection_reference: BTreeMap<String, String>,
    pub display_mode: DisplayMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
    pub x_domain: [f64; 2],
    pub y_domain: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomView {
    /// Brush history per tab, most recent last
    pub history: BTreeMap<String, Vec<HistoryItem>>,
    /// Cumulative vertical scale per spectrum id; absent means 1.0
    pub vertical_scales: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VerticalAlign {
    #[default]
    Bottom,
    Center,
    Stack,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PeaksView {
    pub show_markers: bool,
}

impl Default for PeaksView {
    fn default() -> Self {
        Self { show_markers: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RangesView {
    pub show_integrals: bool,
    pub show_multiplicity_trees: bool,
}

impl Default for RangesView {
    fn default() -> Self {
        Self {
            show_integrals: true,
            show_multiplicity_trees: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZonesView {
    pub show_peaks: bool,
}

impl Default for ZonesView {
    fn default() -> Self {
        Self { show_peaks: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct View {
    pub spectra: SpectraView,
    pub zoom: ZoomView,
    pub vertical_align: BTreeMap<String, VerticalAlign>,
    pub peaks: BTreeMap<String, PeaksView>,
    pub ranges: BTreeMap<String, RangesView>,
    pub zones: BTreeMap<String, ZonesView>,
    /// Pointer-driven guide line, never persisted
    #[serde(skip)]
    pub vertical_indicator: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OriginDomain {
    pub x_domain: [f64; 2],
    pub y_domain: [f64; 2],
    pub x_domains: BTreeMap<String, [f64; 2]>,
    pub y_domains: BTreeMap<String, [f64; 2]>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DomainState {
    pub x_domain: [f64; 2],
    pub y_domain: [f64; 2],
    pub x_domains: BTreeMap<String, [f64; 2]>,
    pub y_domains: BTreeMap<String, [f64; 2]>,
    pub integrals_y_domains: BTreeMap<String, [f64; 2]>,
    pub origin_domain: OriginDomain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Tool {
    #[default]
    Zoom,
    PeakPicking,
    Integral,
    RangePicking,
    ZonePicking,
    PhaseCorrection,
    Apodization,
    ZeroFilling,
    BaselineCorrection,
}

impl Tool {
    /// Tools that preview a filter on a snapshot of the data
    pub fn is_preview(&self) -> bool {
        matches!(
            self,
            Tool::PhaseCorrection | Tool::Apodization | Tool::BaselineCorrection
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineZone {
    pub id: String,
    pub from: f64,
    pub to: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ToolState {
    pub selected_tool: Tool,
    /// Filter being edited after a snapshot rollback
    pub active_filter_id: Option<String>,
    pub baseline_zones: Vec<BaselineZone>,
}

/// Record of a failed dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorAction {
    pub action_type: String,
    /// Serialized action, capped like the snapshot
    pub action: String,
    pub message: String,
    /// Summary of the state the action was applied to
    pub snapshot: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct State {
    pub data: Arc<Vec<Arc<Spectrum>>>,
    pub molecules: Arc<Vec<Molecule>>,
    pub correlations: Arc<CorrelationData>,
    pub domain: DomainState,
    pub view: View,
    pub tool: ToolState,
    pub preferences: Preferences,
    pub keys: BTreeMap<String, KeySnapshot>,
    pub error_action: Option<ErrorAction>,
}

impl State {
    pub fn spectrum(&self, id: &str) -> Option<&Spectrum> {
        self.data.iter().find(|s| s.id() == id).map(|s| s.as_ref())
    }

    /// Mutable access to one spectrum; only that spectrum and the list are cloned
    pub fn spectrum_mut(&mut self, id: &str) -> Option<&mut Spectrum> {
        let index = self.data.iter().position(|s| s.id() == id)?;
        let data = Arc::make_mut(&mut self.data);
        Some(Arc::make_mut(&mut data[index]))
    }

    /// Distinct tab keys in load order
    pub fn tabs(&self) -> Vec<String> {
        let mut tabs: Vec<String> = Vec::new();
        for s in self.data.iter() {
            let key = s.tab_key();
            if !tabs.contains(&key) {
                tabs.push(key);
            }
        }
        tabs
    }

    pub fn spectra_in_tab<'a>(&'a self, tab: &'a str) -> impl Iterator<Item = &'a Spectrum> + 'a {
        self.data
            .iter()
            .map(|s| s.as_ref())
            .filter(move |s| s.tab_key() == tab)
    }

    pub fn active_tab(&self) -> Option<&str> {
        self.view.spectra.active_tab.as_deref()
    }

    pub fn is_2d_tab(&self) -> bool {
        self.active_tab().map(|t| t.contains(',')).unwrap_or(false)
    }

    /// Active spectra of the active tab
    pub fn active_spectra(&self) -> &[ActiveSpectrum] {
        self.active_tab()
            .and_then(|tab| self.view.spectra.active_spectra.get(tab))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// The single active spectrum, if exactly one is selected
    pub fn active_spectrum(&self) -> Option<&ActiveSpectrum> {
        match self.active_spectra() {
            [one] => Some(one),
            _ => None,
        }
    }

    pub fn active_ids(&self) -> Vec<String> {
        self.active_spectra().iter().map(|a| a.id.clone()).collect()
    }

    /// Whether the active set is time-domain data
    pub fn active_is_fid(&self) -> bool {
        self.active_spectra()
            .first()
            .and_then(|a| self.spectrum(&a.id))
            .map(|s| s.is_fid())
            .unwrap_or(false)
    }

    /// Drop every preview snapshot; the committed data stays
    pub fn clear_temp_data(&mut self) {
        let ids: Vec<String> = self
            .data
            .iter()
            .filter(|s| s.has_temp_data())
            .map(|s| s.id().to_string())
            .collect();
        for id in ids {
            if let Some(s) = self.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
                s.temp_data = None;
            }
        }
    }

    /// Leave a preview tool: restore snapshots, re-run the chain when a filter
    /// was being edited, and fall back to the zoom tool.
    pub fn reset_preview(&mut self) -> Result<(), EngineError> {
        let ids: Vec<String> = self
            .data
            .iter()
            .filter(|s| s.has_temp_data())
            .map(|s| s.id().to_string())
            .collect();
        let mut restored = false;
        for id in &ids {
            if let Some(s) = self.spectrum_mut(id).and_then(|s| s.as_1d_mut()) {
                if let Some(temp) = s.temp_data.take() {
                    restored |= s.data != temp;
                    s.data = temp;
                }
            }
        }
        if self.tool.active_filter_id.take().is_some() {
            for id in self.active_ids() {
                if let Some(s) = self.spectrum_mut(&id) {
                    manager::reapply_filters(s, None)?;
                    restored = true;
                }
            }
        }
        if self.tool.selected_tool.is_preview() {
            self.tool.selected_tool = Tool::Zoom;
        }
        self.tool.baseline_zones.clear();
        // the domain was last computed from the preview data
        if restored {
            domain::set_domain(self, DomainUpdateRules::Y);
        }
        Ok(())
    }

    /// Recompute correlations, keeping the current `Arc` when nothing changed
    pub fn rebuild_correlations(&mut self) {
        let rebuilt = correlation::rebuild(&self.data, &self.correlations, &self.preferences);
        if rebuilt != *self.correlations {
            self.correlations = Arc::new(rebuilt);
        }
    }
}

/// Cut `text` to at most `max` bytes on a character boundary
pub fn truncate_on_char_boundary(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
}

/// NMRium-style exchange document
///
/// Spectra are written with their pristine data, pristine info and the filter
/// list; reading a document replays the filters, so the processed data never
/// needs to be stored. Ephemeral view state (pointer guides, tool state, zoom
/// history, errors) is not part of the document.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::annotations::{Integrals, Peaks, Ranges, Zones};
use super::molecule::Molecule;
use super::spectrum::{Data1D, Data2D, Display, Info, Spectrum, Spectrum1D, Spectrum2D};
use crate::correlation::CorrelationData;
use crate::error::EngineError;
use crate::pipeline::{manager, Filter, FilterError};
use crate::state::{PeaksView, RangesView, State, VerticalAlign, ZonesView};

pub const CURRENT_VERSION: u32 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrum1DDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    /// Pristine samples; the filters are replayed on import
    pub data: Data1D,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub peaks: Peaks,
    #[serde(default)]
    pub integrals: Integrals,
    #[serde(default)]
    pub ranges: Ranges,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Spectrum2DDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub info: Info,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<Display>,
    pub data: Data2D,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub zones: Zones,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SpectrumDocument {
    OneD(Spectrum1DDocument),
    TwoD(Spectrum2DDocument),
}

impl From<&Spectrum> for SpectrumDocument {
    fn from(spectrum: &Spectrum) -> Self {
        match spectrum {
            Spectrum::OneD(s) => SpectrumDocument::OneD(Spectrum1DDocument {
                id: Some(s.id.clone()),
                info: s.original_info.clone(),
                display: Some(s.display.clone()),
                data: s.original_data.clone(),
                filters: s.filters.clone(),
                peaks: s.peaks.clone(),
                integrals: s.integrals.clone(),
                ranges: s.ranges.clone(),
            }),
            Spectrum::TwoD(s) => SpectrumDocument::TwoD(Spectrum2DDocument {
                id: Some(s.id.clone()),
                info: s.original_info.clone(),
                display: Some(s.display.clone()),
                data: s.original_data.clone(),
                filters: s.filters.clone(),
                zones: s.zones.clone(),
            }),
        }
    }
}

impl SpectrumDocument {
    pub fn id(&self) -> Option<&str> {
        match self {
            SpectrumDocument::OneD(d) => d.id.as_deref(),
            SpectrumDocument::TwoD(d) => d.id.as_deref(),
        }
    }

    pub fn has_display(&self) -> bool {
        match self {
            SpectrumDocument::OneD(d) => d.display.is_some(),
            SpectrumDocument::TwoD(d) => d.display.is_some(),
        }
    }

    /// Build the in-memory spectrum and replay its filters. Missing ids are
    /// generated.
    pub fn into_spectrum(self) -> Result<Spectrum, FilterError> {
        let mut spectrum = match self {
            SpectrumDocument::OneD(d) => {
                let mut s = Spectrum1D::new(d.info, d.data);
                if let Some(id) = d.id {
                    s.id = id;
                }
                if let Some(display) = d.display {
                    s.display = display;
                }
                s.filters = d.filters;
                s.peaks = d.peaks;
                s.integrals = d.integrals;
                s.ranges = d.ranges;
                Spectrum::OneD(s)
            }
            SpectrumDocument::TwoD(d) => {
                let mut s = Spectrum2D::new(d.info, d.data);
                if let Some(id) = d.id {
                    s.id = id;
                }
                if let Some(display) = d.display {
                    s.display = display;
                }
                s.filters = d.filters;
                s.zones = d.zones;
                Spectrum::TwoD(s)
            }
        };
        manager::replay(&mut spectrum)?;
        Ok(spectrum)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DocumentData {
    pub spectra: Vec<SpectrumDocument>,
    pub molecules: Vec<Molecule>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlations: Option<CorrelationData>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ZoomDocument {
    pub x_domain: Option<[f64; 2]>,
    pub vertical_scales: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewDocument {
    pub active_tab: Option<String>,
    /// Selected spectrum ids per tab
    pub active_spectra: BTreeMap<String, Vec<String>>,
    pub vertical_align: BTreeMap<String, VerticalAlign>,
    pub zoom: ZoomDocument,
    pub peaks: BTreeMap<String, PeaksView>,
    pub ranges: BTreeMap<String, RangesView>,
    pub zones: BTreeMap<String, ZonesView>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NmriumDocument {
    pub version: u32,
    #[serde(default)]
    pub data: DocumentData,
    #[serde(default)]
    pub view: ViewDocument,
}

impl NmriumDocument {
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        let doc: NmriumDocument = serde_json::from_str(json)?;
        doc.check_version()?;
        Ok(doc)
    }

    pub fn to_json(&self) -> Result<String, EngineError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn check_version(&self) -> Result<(), EngineError> {
        if self.version > CURRENT_VERSION {
            return Err(EngineError::UnsupportedVersion {
                found: self.version,
                supported: CURRENT_VERSION,
            });
        }
        Ok(())
    }
}

/// Snapshot the state as a document
pub fn export_document(state: &State) -> NmriumDocument {
    let view = &state.view;
    NmriumDocument {
        version: CURRENT_VERSION,
        data: DocumentData {
            spectra: state.data.iter().map(|s| SpectrumDocument::from(s.as_ref())).collect(),
            molecules: state.molecules.as_ref().clone(),
            correlations: Some(state.correlations.as_ref().clone()),
        },
        view: ViewDocument {
            active_tab: view.spectra.active_tab.clone(),
            active_spectra: view
                .spectra
                .active_spectra
                .iter()
                .map(|(tab, list)| (tab.clone(), list.iter().map(|a| a.id.clone()).collect()))
                .collect(),
            vertical_align: view.vertical_align.clone(),
            zoom: ZoomDocument {
                x_domain: view.spectra.active_tab.as_ref().map(|_| state.domain.x_domain),
                vertical_scales: view.zoom.vertical_scales.clone(),
            },
            peaks: view.peaks.clone(),
            ranges: view.ranges.clone(),
            zones: view.zones.clone(),
        },
    }
}

/// Parse a document and build a fresh state from it
pub fn import_document(json: &str) -> Result<State, EngineError> {
    let doc = NmriumDocument::from_json(json)?;
    let mut state = State::default();
    crate::reducer::handlers::spectra::load_document(&mut state, doc)?;
    Ok(state)
}

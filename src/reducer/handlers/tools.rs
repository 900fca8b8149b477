use crate::error::EngineError;
use crate::pipeline::{manager, DomainUpdateRules, FilterKind};
use crate::state::domain::{is_zero_length, set_domain};
use crate::state::{BaselineZone, State, Tool};

/// Select a tool. Leaving a preview tool restores the snapshot; entering one
/// takes a fresh snapshot of every active 1D spectrum.
pub fn set_selected_tool(state: &mut State, tool: Tool) -> Result<(), EngineError> {
    if state.tool.selected_tool == tool {
        return Ok(());
    }
    state.reset_preview()?;
    state.tool.selected_tool = tool;
    if tool.is_preview() {
        for id in state.active_ids() {
            if let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) {
                let data = s.data.clone();
                s.temp_data.get_or_insert_with(|| data);
            }
        }
    }
    log::debug!("Selected tool {:?}", tool);
    Ok(())
}

pub fn reset_selected_tool(state: &mut State) -> Result<(), EngineError> {
    state.reset_preview()?;
    state.tool.selected_tool = Tool::Zoom;
    set_domain(state, DomainUpdateRules::Y);
    Ok(())
}

/// Re-run the baseline preview with the current zones
fn preview_baseline(state: &mut State) -> Result<(), EngineError> {
    if state.tool.selected_tool != Tool::BaselineCorrection {
        return Ok(());
    }
    let kind = FilterKind::BaselineCorrection {
        zones: state.tool.baseline_zones.iter().map(|z| [z.from, z.to]).collect(),
    };
    for id in state.active_ids() {
        let Some(s) = state.spectrum_mut(&id).and_then(|s| s.as_1d_mut()) else {
            continue;
        };
        if s.info.is_fid {
            continue;
        }
        manager::preview(s, &kind)?;
    }
    set_domain(state, DomainUpdateRules::Y);
    Ok(())
}

pub fn add_baseline_zone(state: &mut State, from: f64, to: f64) -> Result<(), EngineError> {
    if is_zero_length(from, to) {
        return Ok(());
    }
    state.tool.baseline_zones.push(BaselineZone {
        id: uuid::Uuid::new_v4().to_string(),
        from: from.min(to),
        to: from.max(to),
    });
    preview_baseline(state)
}

pub fn delete_baseline_zone(state: &mut State, zone_id: &str) -> Result<(), EngineError> {
    let before = state.tool.baseline_zones.len();
    state.tool.baseline_zones.retain(|z| z.id != zone_id);
    if state.tool.baseline_zones.len() == before {
        log::debug!("delete_baseline_zone: unknown zone {}", zone_id);
        return Ok(());
    }
    preview_baseline(state)
}

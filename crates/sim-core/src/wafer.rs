//! `WaferProcess` process record (C1).

use crate::error::{CoreError, CoreResult};

/// Wafer-level fabrication parameters: wafer geometry, dicing/reticle
/// geometry, process yield, and per-kind NRE cost rates.
///
/// Constructed unset, populated with `set_*`, then `freeze()`d. Setters on a
/// frozen record fail with [`CoreError::FrozenMutation`].
#[derive(Clone, Debug, Default)]
pub struct WaferProcess {
    wafer_diameter: Option<f64>,
    edge_exclusion: Option<f64>,
    wafer_process_yield: Option<f64>,
    dicing_distance: Option<f64>,
    reticle_x: Option<f64>,
    reticle_y: Option<f64>,
    grid_fill: Option<bool>,
    nre_front_end_cost_per_mm2_memory: Option<f64>,
    nre_front_end_cost_per_mm2_logic: Option<f64>,
    nre_front_end_cost_per_mm2_analog: Option<f64>,
    nre_back_end_cost_per_mm2_memory: Option<f64>,
    nre_back_end_cost_per_mm2_logic: Option<f64>,
    nre_back_end_cost_per_mm2_analog: Option<f64>,
    frozen: bool,
}

impl WaferProcess {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_mutable(&self, field: &'static str) -> CoreResult<()> {
        if self.frozen {
            Err(CoreError::FrozenMutation(field))
        } else {
            Ok(())
        }
    }

    fn check_nonneg(field: &'static str, value: f64) -> CoreResult<()> {
        if value < 0.0 {
            Err(CoreError::RangeViolation { field, value, bound: ">= 0" })
        } else {
            Ok(())
        }
    }

    fn check_unit_interval(field: &'static str, value: f64) -> CoreResult<()> {
        if !(0.0..=1.0).contains(&value) {
            Err(CoreError::RangeViolation { field, value, bound: "[0, 1]" })
        } else {
            Ok(())
        }
    }

    /// Checks `value <= wafer_diameter / 2` when the diameter is already known.
    fn check_within_half_diameter(&self, field: &'static str, value: f64) -> CoreResult<()> {
        if let Some(d) = self.wafer_diameter {
            if value > d / 2.0 {
                return Err(CoreError::RangeViolation { field, value, bound: "<= wafer_diameter / 2" });
            }
        }
        Ok(())
    }

    pub fn set_wafer_diameter(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("wafer_diameter")?;
        Self::check_nonneg("wafer_diameter", value)?;
        self.wafer_diameter = Some(value);
        Ok(())
    }

    pub fn set_edge_exclusion(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("edge_exclusion")?;
        Self::check_nonneg("edge_exclusion", value)?;
        self.check_within_half_diameter("edge_exclusion", value)?;
        self.edge_exclusion = Some(value);
        Ok(())
    }

    pub fn set_wafer_process_yield(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("wafer_process_yield")?;
        Self::check_unit_interval("wafer_process_yield", value)?;
        self.wafer_process_yield = Some(value);
        Ok(())
    }

    pub fn set_dicing_distance(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("dicing_distance")?;
        Self::check_nonneg("dicing_distance", value)?;
        self.check_within_half_diameter("dicing_distance", value)?;
        self.dicing_distance = Some(value);
        Ok(())
    }

    pub fn set_reticle_x(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("reticle_x")?;
        Self::check_nonneg("reticle_x", value)?;
        self.check_within_half_diameter("reticle_x", value)?;
        self.reticle_x = Some(value);
        Ok(())
    }

    pub fn set_reticle_y(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("reticle_y")?;
        Self::check_nonneg("reticle_y", value)?;
        self.check_within_half_diameter("reticle_y", value)?;
        self.reticle_y = Some(value);
        Ok(())
    }

    pub fn set_grid_fill(&mut self, value: bool) -> CoreResult<()> {
        self.ensure_mutable("grid_fill")?;
        self.grid_fill = Some(value);
        Ok(())
    }

    pub fn set_nre_front_end_cost_per_mm2_memory(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_front_end_cost_per_mm2_memory")?;
        Self::check_nonneg("nre_front_end_cost_per_mm2_memory", value)?;
        self.nre_front_end_cost_per_mm2_memory = Some(value);
        Ok(())
    }

    pub fn set_nre_front_end_cost_per_mm2_logic(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_front_end_cost_per_mm2_logic")?;
        Self::check_nonneg("nre_front_end_cost_per_mm2_logic", value)?;
        self.nre_front_end_cost_per_mm2_logic = Some(value);
        Ok(())
    }

    pub fn set_nre_front_end_cost_per_mm2_analog(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_front_end_cost_per_mm2_analog")?;
        Self::check_nonneg("nre_front_end_cost_per_mm2_analog", value)?;
        self.nre_front_end_cost_per_mm2_analog = Some(value);
        Ok(())
    }

    pub fn set_nre_back_end_cost_per_mm2_memory(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_back_end_cost_per_mm2_memory")?;
        Self::check_nonneg("nre_back_end_cost_per_mm2_memory", value)?;
        self.nre_back_end_cost_per_mm2_memory = Some(value);
        Ok(())
    }

    pub fn set_nre_back_end_cost_per_mm2_logic(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_back_end_cost_per_mm2_logic")?;
        Self::check_nonneg("nre_back_end_cost_per_mm2_logic", value)?;
        self.nre_back_end_cost_per_mm2_logic = Some(value);
        Ok(())
    }

    pub fn set_nre_back_end_cost_per_mm2_analog(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("nre_back_end_cost_per_mm2_analog")?;
        Self::check_nonneg("nre_back_end_cost_per_mm2_analog", value)?;
        self.nre_back_end_cost_per_mm2_analog = Some(value);
        Ok(())
    }

    pub fn wafer_diameter(&self) -> Option<f64> {
        self.wafer_diameter
    }

    pub fn edge_exclusion(&self) -> Option<f64> {
        self.edge_exclusion
    }

    pub fn wafer_process_yield(&self) -> Option<f64> {
        self.wafer_process_yield
    }

    pub fn dicing_distance(&self) -> Option<f64> {
        self.dicing_distance
    }

    pub fn wafer_process_yield_or(&self, default: f64) -> f64 {
        self.wafer_process_yield.unwrap_or(default)
    }

    pub fn reticle_x(&self) -> Option<f64> {
        self.reticle_x
    }

    pub fn reticle_y(&self) -> Option<f64> {
        self.reticle_y
    }

    pub fn grid_fill(&self) -> Option<bool> {
        self.grid_fill
    }

    pub fn nre_front_end_cost_per_mm2(&self, memory: f64, logic: f64, analog: f64) -> f64 {
        memory * self.nre_front_end_cost_per_mm2_memory.unwrap_or(0.0)
            + logic * self.nre_front_end_cost_per_mm2_logic.unwrap_or(0.0)
            + analog * self.nre_front_end_cost_per_mm2_analog.unwrap_or(0.0)
    }

    pub fn nre_back_end_cost_per_mm2(&self, memory: f64, logic: f64, analog: f64) -> f64 {
        memory * self.nre_back_end_cost_per_mm2_memory.unwrap_or(0.0)
            + logic * self.nre_back_end_cost_per_mm2_logic.unwrap_or(0.0)
            + analog * self.nre_back_end_cost_per_mm2_analog.unwrap_or(0.0)
    }

    pub fn is_fully_defined(&self) -> bool {
        self.wafer_diameter.is_some()
            && self.edge_exclusion.is_some()
            && self.wafer_process_yield.is_some()
            && self.dicing_distance.is_some()
            && self.reticle_x.is_some()
            && self.reticle_y.is_some()
            && self.grid_fill.is_some()
            && self.nre_front_end_cost_per_mm2_memory.is_some()
            && self.nre_front_end_cost_per_mm2_logic.is_some()
            && self.nre_front_end_cost_per_mm2_analog.is_some()
            && self.nre_back_end_cost_per_mm2_memory.is_some()
            && self.nre_back_end_cost_per_mm2_logic.is_some()
            && self.nre_back_end_cost_per_mm2_analog.is_some()
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let present = [
            (self.wafer_diameter.is_some(), "wafer_diameter"),
            (self.edge_exclusion.is_some(), "edge_exclusion"),
            (self.wafer_process_yield.is_some(), "wafer_process_yield"),
            (self.dicing_distance.is_some(), "dicing_distance"),
            (self.reticle_x.is_some(), "reticle_x"),
            (self.reticle_y.is_some(), "reticle_y"),
            (self.grid_fill.is_some(), "grid_fill"),
            (self.nre_front_end_cost_per_mm2_memory.is_some(), "nre_front_end_cost_per_mm2_memory"),
            (self.nre_front_end_cost_per_mm2_logic.is_some(), "nre_front_end_cost_per_mm2_logic"),
            (self.nre_front_end_cost_per_mm2_analog.is_some(), "nre_front_end_cost_per_mm2_analog"),
            (self.nre_back_end_cost_per_mm2_memory.is_some(), "nre_back_end_cost_per_mm2_memory"),
            (self.nre_back_end_cost_per_mm2_logic.is_some(), "nre_back_end_cost_per_mm2_logic"),
            (self.nre_back_end_cost_per_mm2_analog.is_some(), "nre_back_end_cost_per_mm2_analog"),
        ];
        present.iter().filter(|(ok, _)| !ok).map(|(_, name)| *name).collect()
    }

    pub fn freeze(&mut self) -> CoreResult<()> {
        if !self.is_fully_defined() {
            let missing = self.missing_fields();
            tracing::error!(?missing, "wafer process freeze rejected: underspecified");
            return Err(CoreError::Underspecified(missing));
        }
        self.frozen = true;
        Ok(())
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defined_wafer() -> WaferProcess {
        let mut w = WaferProcess::new();
        w.set_wafer_diameter(300.0).unwrap();
        w.set_edge_exclusion(5.0).unwrap();
        w.set_wafer_process_yield(0.9).unwrap();
        w.set_dicing_distance(0.1).unwrap();
        w.set_reticle_x(26.0).unwrap();
        w.set_reticle_y(33.0).unwrap();
        w.set_grid_fill(true).unwrap();
        w.set_nre_front_end_cost_per_mm2_memory(0.0).unwrap();
        w.set_nre_front_end_cost_per_mm2_logic(0.0).unwrap();
        w.set_nre_front_end_cost_per_mm2_analog(0.0).unwrap();
        w.set_nre_back_end_cost_per_mm2_memory(0.0).unwrap();
        w.set_nre_back_end_cost_per_mm2_logic(0.0).unwrap();
        w.set_nre_back_end_cost_per_mm2_analog(0.0).unwrap();
        w
    }

    #[test]
    fn freeze_requires_full_definition() {
        let mut w = WaferProcess::new();
        assert!(matches!(w.freeze(), Err(CoreError::Underspecified(_))));
    }

    #[test]
    fn freeze_then_mutate_fails() {
        let mut w = defined_wafer();
        w.freeze().unwrap();
        assert!(matches!(
            w.set_wafer_diameter(400.0),
            Err(CoreError::FrozenMutation("wafer_diameter"))
        ));
    }

    #[test]
    fn edge_exclusion_bounded_by_half_diameter() {
        let mut w = WaferProcess::new();
        w.set_wafer_diameter(10.0).unwrap();
        assert!(matches!(
            w.set_edge_exclusion(6.0),
            Err(CoreError::RangeViolation { .. })
        ));
        assert!(w.set_edge_exclusion(4.0).is_ok());
    }

    #[test]
    fn yield_out_of_unit_interval_rejected() {
        let mut w = WaferProcess::new();
        assert!(matches!(
            w.set_wafer_process_yield(1.5),
            Err(CoreError::RangeViolation { .. })
        ));
    }

    use proptest::prelude::*;

    proptest! {
        #[test]
        fn frozen_record_rejects_every_setter(new_diameter in 1.0f64..1000.0) {
            let mut w = defined_wafer();
            w.freeze().unwrap();
            prop_assert!(matches!(w.set_wafer_diameter(new_diameter), Err(CoreError::FrozenMutation(_))));
            prop_assert!(matches!(w.set_edge_exclusion(new_diameter), Err(CoreError::FrozenMutation(_))));
            prop_assert!(matches!(w.set_wafer_process_yield(0.5), Err(CoreError::FrozenMutation(_))));
            prop_assert!(w.is_frozen());
        }
    }
}

//! `Assembly` process record (C1): packaging/bonding cost and yield.

use crate::error::{CoreError, CoreResult};
use rust_decimal::Decimal;
use std::str::FromStr;

const SECONDS_PER_YEAR: f64 = 365.0 * 24.0 * 60.0 * 60.0;

/// Packaging/assembly parameters: pick-and-place and bonding machine
/// economics, pad pitch and current limits, and assembly yield terms.
#[derive(Clone, Debug, Default)]
pub struct Assembly {
    materials_cost_per_mm2: Option<f64>,
    bb_cost_per_second: Option<f64>,

    picknplace_machine_cost: Option<f64>,
    picknplace_machine_lifetime: Option<f64>,
    picknplace_machine_uptime: Option<f64>,
    picknplace_technician_yearly_cost: Option<f64>,
    picknplace_time: Option<f64>,
    picknplace_group: Option<f64>,

    bonding_machine_cost: Option<f64>,
    bonding_machine_lifetime: Option<f64>,
    bonding_machine_uptime: Option<f64>,
    bonding_technician_yearly_cost: Option<f64>,
    bonding_time: Option<f64>,
    bonding_group: Option<f64>,

    die_separation: Option<f64>,
    edge_exclusion: Option<f64>,
    max_pad_current_density: Option<f64>,
    bonding_pitch: Option<f64>,
    alignment_yield: Option<f64>,
    bonding_yield: Option<f64>,
    dielectric_bond_defect_density: Option<f64>,

    frozen: bool,
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

/// Exponentiation by squaring over `Decimal`, preserving the ~28
/// significant digits needed for `yield^40000` where `yield ≈ 1`.
fn decimal_powi(mut base: Decimal, mut exp: u64) -> Decimal {
    let mut acc = Decimal::from(1u64);
    while exp > 0 {
        if exp & 1 == 1 {
            acc *= base;
        }
        exp >>= 1;
        if exp > 0 {
            base *= base;
        }
    }
    acc
}

impl Assembly {
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

    pub fn set_materials_cost_per_mm2(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("materials_cost_per_mm2")?;
        check_nonneg("materials_cost_per_mm2", value)?;
        self.materials_cost_per_mm2 = Some(value);
        Ok(())
    }

    pub fn set_bb_cost_per_second(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bb_cost_per_second")?;
        check_nonneg("bb_cost_per_second", value)?;
        self.bb_cost_per_second = Some(value);
        Ok(())
    }

    pub fn set_picknplace_machine_cost(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_machine_cost")?;
        check_nonneg("picknplace_machine_cost", value)?;
        self.picknplace_machine_cost = Some(value);
        Ok(())
    }

    pub fn set_picknplace_machine_lifetime(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_machine_lifetime")?;
        check_nonneg("picknplace_machine_lifetime", value)?;
        self.picknplace_machine_lifetime = Some(value);
        Ok(())
    }

    pub fn set_picknplace_machine_uptime(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_machine_uptime")?;
        check_unit_interval("picknplace_machine_uptime", value)?;
        self.picknplace_machine_uptime = Some(value);
        Ok(())
    }

    pub fn set_picknplace_technician_yearly_cost(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_technician_yearly_cost")?;
        check_nonneg("picknplace_technician_yearly_cost", value)?;
        self.picknplace_technician_yearly_cost = Some(value);
        Ok(())
    }

    pub fn set_picknplace_time(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_time")?;
        check_nonneg("picknplace_time", value)?;
        self.picknplace_time = Some(value);
        Ok(())
    }

    pub fn set_picknplace_group(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("picknplace_group")?;
        if value <= 0.0 {
            return Err(CoreError::RangeViolation { field: "picknplace_group", value, bound: "> 0" });
        }
        self.picknplace_group = Some(value);
        Ok(())
    }

    pub fn set_bonding_machine_cost(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_machine_cost")?;
        check_nonneg("bonding_machine_cost", value)?;
        self.bonding_machine_cost = Some(value);
        Ok(())
    }

    pub fn set_bonding_machine_lifetime(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_machine_lifetime")?;
        check_nonneg("bonding_machine_lifetime", value)?;
        self.bonding_machine_lifetime = Some(value);
        Ok(())
    }

    pub fn set_bonding_machine_uptime(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_machine_uptime")?;
        check_unit_interval("bonding_machine_uptime", value)?;
        self.bonding_machine_uptime = Some(value);
        Ok(())
    }

    pub fn set_bonding_technician_yearly_cost(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_technician_yearly_cost")?;
        check_nonneg("bonding_technician_yearly_cost", value)?;
        self.bonding_technician_yearly_cost = Some(value);
        Ok(())
    }

    pub fn set_bonding_time(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_time")?;
        check_nonneg("bonding_time", value)?;
        self.bonding_time = Some(value);
        Ok(())
    }

    pub fn set_bonding_group(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_group")?;
        if value <= 0.0 {
            return Err(CoreError::RangeViolation { field: "bonding_group", value, bound: "> 0" });
        }
        self.bonding_group = Some(value);
        Ok(())
    }

    pub fn set_die_separation(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("die_separation")?;
        check_nonneg("die_separation", value)?;
        self.die_separation = Some(value);
        Ok(())
    }

    pub fn set_edge_exclusion(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("edge_exclusion")?;
        check_nonneg("edge_exclusion", value)?;
        self.edge_exclusion = Some(value);
        Ok(())
    }

    pub fn set_max_pad_current_density(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("max_pad_current_density")?;
        check_nonneg("max_pad_current_density", value)?;
        self.max_pad_current_density = Some(value);
        Ok(())
    }

    pub fn set_bonding_pitch(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_pitch")?;
        if value <= 0.0 {
            return Err(CoreError::RangeViolation { field: "bonding_pitch", value, bound: "> 0" });
        }
        self.bonding_pitch = Some(value);
        Ok(())
    }

    pub fn set_alignment_yield(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("alignment_yield")?;
        check_unit_interval("alignment_yield", value)?;
        self.alignment_yield = Some(value);
        Ok(())
    }

    pub fn set_bonding_yield(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bonding_yield")?;
        check_unit_interval("bonding_yield", value)?;
        self.bonding_yield = Some(value);
        Ok(())
    }

    pub fn set_dielectric_bond_defect_density(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("dielectric_bond_defect_density")?;
        check_nonneg("dielectric_bond_defect_density", value)?;
        self.dielectric_bond_defect_density = Some(value);
        Ok(())
    }

    pub fn bonding_pitch(&self) -> Option<f64> {
        self.bonding_pitch
    }

    pub fn die_separation(&self) -> f64 {
        self.die_separation.unwrap_or(0.0)
    }

    pub fn edge_exclusion(&self) -> f64 {
        self.edge_exclusion.unwrap_or(0.0)
    }

    pub fn is_fully_defined(&self) -> bool {
        self.materials_cost_per_mm2.is_some()
            && self.picknplace_machine_lifetime.is_some()
            && self.picknplace_machine_uptime.is_some()
            && self.picknplace_technician_yearly_cost.is_some()
            && self.picknplace_time.is_some()
            && self.picknplace_group.is_some()
            && self.bonding_machine_lifetime.is_some()
            && self.bonding_machine_uptime.is_some()
            && self.bonding_technician_yearly_cost.is_some()
            && self.bonding_time.is_some()
            && self.bonding_group.is_some()
            && self.die_separation.is_some()
            && self.edge_exclusion.is_some()
            && self.max_pad_current_density.is_some()
            && self.bonding_pitch.is_some()
            && self.alignment_yield.is_some()
            && self.bonding_yield.is_some()
            && self.dielectric_bond_defect_density.is_some()
            && (self.bb_cost_per_second.is_some()
                || (self.picknplace_machine_cost.is_some() && self.bonding_machine_cost.is_some()))
    }

    pub fn freeze(&mut self) -> CoreResult<()> {
        if !self.is_fully_defined() {
            tracing::error!("assembly process freeze rejected: underspecified");
            return Err(CoreError::Underspecified(vec!["assembly: see is_fully_defined"]));
        }
        self.frozen = true;
        Ok(())
    }

    /// Power dissipated per signal pad at a given core voltage.
    pub fn power_per_pad(&self, core_voltage: f64) -> f64 {
        let pitch = self.bonding_pitch.unwrap_or(0.0);
        let pad_area = std::f64::consts::PI * (pitch / 4.0).powi(2);
        let current_per_pad = self.max_pad_current_density.unwrap_or(0.0) * pad_area;
        current_per_pad * core_voltage
    }

    fn picknplace_time(&self, n: u32) -> f64 {
        let group = self.picknplace_group.unwrap_or(1.0).max(1.0);
        let steps = (n as f64 / group).ceil();
        self.picknplace_time.unwrap_or(0.0) * steps
    }

    fn bonding_time(&self, n: u32) -> f64 {
        let group = self.bonding_group.unwrap_or(1.0).max(1.0);
        let steps = (n as f64 / group).ceil();
        self.bonding_time.unwrap_or(0.0) * steps
    }

    pub fn assembly_time(&self, n: u32) -> f64 {
        self.picknplace_time(n) + self.bonding_time(n)
    }

    fn picknplace_cost_per_second(&self) -> f64 {
        if let Some(bb) = self.bb_cost_per_second {
            return bb;
        }
        let machine = self.picknplace_machine_cost.unwrap_or(0.0);
        let lifetime = self.picknplace_machine_lifetime.unwrap_or(1.0).max(f64::EPSILON);
        let technician = self.picknplace_technician_yearly_cost.unwrap_or(0.0);
        ((machine / lifetime) + technician) / SECONDS_PER_YEAR * self.picknplace_machine_uptime.unwrap_or(0.0)
    }

    fn bonding_cost_per_second(&self) -> f64 {
        if let Some(bb) = self.bb_cost_per_second {
            return bb;
        }
        let machine = self.bonding_machine_cost.unwrap_or(0.0);
        let lifetime = self.bonding_machine_lifetime.unwrap_or(1.0).max(f64::EPSILON);
        let technician = self.bonding_technician_yearly_cost.unwrap_or(0.0);
        ((machine / lifetime) + technician) / SECONDS_PER_YEAR * self.bonding_machine_uptime.unwrap_or(0.0)
    }

    /// Assembly cost of bonding `n` dies with total stacked-die `area`.
    pub fn assembly_cost(&self, n: u32, area: f64) -> f64 {
        self.picknplace_cost_per_second() * self.picknplace_time(n)
            + self.bonding_cost_per_second() * self.bonding_time(n)
            + self.materials_cost_per_mm2.unwrap_or(0.0) * area
    }

    /// Assembly yield for `n_chips` aligned dies and `n_bonds` bonded
    /// interconnects over stacked-die `area`.
    ///
    /// Uses `Decimal` exponentiation so `alignment_yield^n_chips` and
    /// `bonding_yield^n_bonds` retain precision at bond counts in the tens
    /// of thousands, where `yield` is close enough to 1 that `f64::powi`
    /// would lose the relevant digits.
    pub fn assembly_yield(&self, n_chips: u32, n_bonds: u32, area: f64) -> f64 {
        let alignment = decimal_from_f64(self.alignment_yield.unwrap_or(1.0));
        let bonding = decimal_from_f64(self.bonding_yield.unwrap_or(1.0));
        let assem_yield = decimal_powi(alignment, n_chips as u64) * decimal_powi(bonding, n_bonds as u64);
        let dielectric_bond_yield = 1.0 / (1.0 + self.dielectric_bond_defect_density.unwrap_or(0.0) * area);
        to_f64(assem_yield) * dielectric_bond_yield
    }
}

fn decimal_from_f64(v: f64) -> Decimal {
    Decimal::from_str(&format!("{v:.15}")).unwrap_or_else(|_| Decimal::from(1u64))
}

fn to_f64(d: Decimal) -> f64 {
    d.to_string().parse().unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_assembly() -> Assembly {
        let mut a = Assembly::new();
        a.set_materials_cost_per_mm2(0.0).unwrap();
        a.set_picknplace_machine_cost(0.0).unwrap();
        a.set_picknplace_machine_lifetime(1.0).unwrap();
        a.set_picknplace_machine_uptime(1.0).unwrap();
        a.set_picknplace_technician_yearly_cost(0.0).unwrap();
        a.set_picknplace_time(0.0).unwrap();
        a.set_picknplace_group(1.0).unwrap();
        a.set_bonding_machine_cost(0.0).unwrap();
        a.set_bonding_machine_lifetime(1.0).unwrap();
        a.set_bonding_machine_uptime(1.0).unwrap();
        a.set_bonding_technician_yearly_cost(0.0).unwrap();
        a.set_bonding_time(0.0).unwrap();
        a.set_bonding_group(1.0).unwrap();
        a.set_die_separation(0.0).unwrap();
        a.set_edge_exclusion(0.0).unwrap();
        a.set_max_pad_current_density(0.4).unwrap();
        a.set_bonding_pitch(0.5).unwrap();
        a.set_alignment_yield(0.987).unwrap();
        a.set_bonding_yield(0.999).unwrap();
        a.set_dielectric_bond_defect_density(0.0003).unwrap();
        a
    }

    #[test]
    fn assembly_yield_reference_values() {
        let a = reference_assembly();
        assert!((a.assembly_yield(1, 1, 10.0) - 0.9830638085742773).abs() < 1e-9);
        assert!((a.assembly_yield(100, 1000, 10.0) - 0.0990609662748996).abs() < 1e-7);
        assert!((a.assembly_yield(10, 1, 15.0) - 0.8725434723594329).abs() < 1e-9);
    }

    #[test]
    fn assembly_yield_boundary_is_alignment_yield() {
        let a = reference_assembly();
        assert!((a.assembly_yield(1, 0, 0.0) - 0.987).abs() < 1e-12);
    }

    #[test]
    fn power_per_pad_reference_value() {
        let mut a = Assembly::new();
        a.set_bonding_pitch(0.5).unwrap();
        a.set_max_pad_current_density(0.4).unwrap();
        assert!((a.power_per_pad(1.0) - 0.019634954084936207).abs() < 1e-12);
    }

    #[test]
    fn frozen_rejects_mutation() {
        let mut a = reference_assembly();
        a.freeze().unwrap();
        assert!(matches!(a.set_bonding_pitch(1.0), Err(CoreError::FrozenMutation(_))));
    }
}

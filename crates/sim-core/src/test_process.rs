//! `Test` process record (C1): self-test and assembly-test cost/yield model.
//!
//! Methods take the chip-derived scalars (core area, gates/mm2, gate/flop
//! ratio, true yield) as arguments instead of holding a back-reference to a
//! `Chip`, so a `Test` can be frozen and shared independently of the chip
//! tree that consumes it.

use crate::error::{CoreError, CoreResult};

#[derive(Clone, Debug, Default)]
pub struct TestProcess {
    name: Option<String>,
    time_per_test_cycle: Option<f64>,
    cost_per_second: Option<f64>,
    samples_per_input: Option<i64>,

    test_self: Option<bool>,
    bb_self_pattern_count: Option<f64>,
    bb_self_scan_chain_length: Option<f64>,
    self_defect_coverage: Option<f64>,
    self_test_reuse: Option<f64>,
    self_num_scan_chains: Option<i64>,
    self_num_io_per_scan_chain: Option<i64>,
    self_num_test_io_offset: Option<i64>,
    self_test_failure_dist: Option<String>,

    test_assembly: Option<bool>,
    bb_assembly_pattern_count: Option<f64>,
    bb_assembly_scan_chain_length: Option<f64>,
    assembly_defect_coverage: Option<f64>,
    assembly_test_reuse: Option<f64>,
    assembly_gate_flop_ratio: Option<f64>,
    assembly_num_scan_chains: Option<i64>,
    assembly_num_io_per_scan_chain: Option<i64>,
    assembly_num_test_io_offset: Option<i64>,
    assembly_test_failure_dist: Option<String>,

    frozen: bool,
}

fn check_nonneg(field: &'static str, value: f64) -> CoreResult<()> {
    if value < 0.0 {
        Err(CoreError::RangeViolation { field, value, bound: ">= 0" })
    } else {
        Ok(())
    }
}

macro_rules! simple_setter {
    ($setter:ident, $field:ident, $ty:ty) => {
        pub fn $setter(&mut self, value: $ty) -> CoreResult<()> {
            self.ensure_mutable(stringify!($field))?;
            self.$field = Some(value);
            Ok(())
        }
    };
}

impl TestProcess {
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

    pub fn set_name(&mut self, value: impl Into<String>) -> CoreResult<()> {
        self.ensure_mutable("name")?;
        self.name = Some(value.into());
        Ok(())
    }

    pub fn set_time_per_test_cycle(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("time_per_test_cycle")?;
        check_nonneg("time_per_test_cycle", value)?;
        self.time_per_test_cycle = Some(value);
        Ok(())
    }

    pub fn set_cost_per_second(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("cost_per_second")?;
        check_nonneg("cost_per_second", value)?;
        self.cost_per_second = Some(value);
        Ok(())
    }

    simple_setter!(set_samples_per_input, samples_per_input, i64);
    simple_setter!(set_test_self, test_self, bool);
    simple_setter!(set_bb_self_pattern_count, bb_self_pattern_count, f64);
    simple_setter!(set_bb_self_scan_chain_length, bb_self_scan_chain_length, f64);
    simple_setter!(set_self_defect_coverage, self_defect_coverage, f64);
    simple_setter!(set_self_test_reuse, self_test_reuse, f64);
    simple_setter!(set_self_num_scan_chains, self_num_scan_chains, i64);
    simple_setter!(set_self_num_io_per_scan_chain, self_num_io_per_scan_chain, i64);
    simple_setter!(set_self_num_test_io_offset, self_num_test_io_offset, i64);
    simple_setter!(set_test_assembly, test_assembly, bool);
    simple_setter!(set_bb_assembly_pattern_count, bb_assembly_pattern_count, f64);
    simple_setter!(set_bb_assembly_scan_chain_length, bb_assembly_scan_chain_length, f64);
    simple_setter!(set_assembly_defect_coverage, assembly_defect_coverage, f64);
    simple_setter!(set_assembly_test_reuse, assembly_test_reuse, f64);
    simple_setter!(set_assembly_gate_flop_ratio, assembly_gate_flop_ratio, f64);
    simple_setter!(set_assembly_num_scan_chains, assembly_num_scan_chains, i64);
    simple_setter!(set_assembly_num_io_per_scan_chain, assembly_num_io_per_scan_chain, i64);
    simple_setter!(set_assembly_num_test_io_offset, assembly_num_test_io_offset, i64);

    pub fn set_self_test_failure_dist(&mut self, value: impl Into<String>) -> CoreResult<()> {
        self.ensure_mutable("self_test_failure_dist")?;
        self.self_test_failure_dist = Some(value.into());
        Ok(())
    }

    pub fn set_assembly_test_failure_dist(&mut self, value: impl Into<String>) -> CoreResult<()> {
        self.ensure_mutable("assembly_test_failure_dist")?;
        self.assembly_test_failure_dist = Some(value.into());
        Ok(())
    }

    pub fn is_fully_defined(&self) -> bool {
        self.name.is_some()
            && self.time_per_test_cycle.is_some()
            && self.cost_per_second.is_some()
            && self.samples_per_input.is_some()
            && self.test_self.is_some()
            && self.self_defect_coverage.is_some()
            && self.self_test_reuse.is_some()
            && self.self_num_scan_chains.is_some()
            && self.self_num_io_per_scan_chain.is_some()
            && self.self_num_test_io_offset.is_some()
            && self.self_test_failure_dist.is_some()
            && self.test_assembly.is_some()
            && self.assembly_defect_coverage.is_some()
            && self.assembly_test_reuse.is_some()
            && self.assembly_num_scan_chains.is_some()
            && self.assembly_num_io_per_scan_chain.is_some()
            && self.assembly_num_test_io_offset.is_some()
            && self.assembly_test_failure_dist.is_some()
    }

    pub fn freeze(&mut self) -> CoreResult<()> {
        if !self.is_fully_defined() {
            tracing::error!("test process freeze rejected: underspecified");
            return Err(CoreError::Underspecified(vec!["test: see is_fully_defined"]));
        }
        self.frozen = true;
        Ok(())
    }

    fn test_self(&self) -> bool {
        self.test_self.unwrap_or(false)
    }

    fn test_assembly(&self) -> bool {
        self.test_assembly.unwrap_or(false)
    }

    fn cycles_per_pattern(gate_count: f64, test_coverage: f64, bb_pattern_count: f64, bb_scan_chain_length: f64) -> f64 {
        if gate_count <= 0.0 || bb_pattern_count <= 0.0 || bb_scan_chain_length <= 0.0 {
            return 0.0;
        }
        gate_count * test_coverage / bb_pattern_count / bb_scan_chain_length
    }

    fn self_time(&self, gate_count: f64) -> f64 {
        if !self.test_self() {
            return 0.0;
        }
        let bb_pattern_count = self.bb_self_pattern_count.unwrap_or(0.0);
        let bb_scan_chain_length = self.bb_self_scan_chain_length.unwrap_or(0.0);
        if bb_pattern_count <= 0.0 || bb_scan_chain_length <= 0.0 {
            return 0.0;
        }
        let cycles = Self::cycles_per_pattern(
            gate_count,
            self.self_defect_coverage.unwrap_or(0.0),
            bb_pattern_count,
            bb_scan_chain_length,
        );
        cycles * self.time_per_test_cycle.unwrap_or(0.0) / self.self_test_reuse.unwrap_or(1.0).max(f64::EPSILON)
    }

    fn assembly_time(&self, gate_count: f64) -> f64 {
        if !self.test_assembly() {
            return 0.0;
        }
        let bb_pattern_count = self.bb_assembly_pattern_count.unwrap_or(0.0);
        let bb_scan_chain_length = self.bb_assembly_scan_chain_length.unwrap_or(0.0);
        if bb_pattern_count <= 0.0 || bb_scan_chain_length <= 0.0 {
            return 0.0;
        }
        let cycles = Self::cycles_per_pattern(
            gate_count,
            self.assembly_defect_coverage.unwrap_or(0.0),
            bb_pattern_count,
            bb_scan_chain_length,
        );
        cycles * self.time_per_test_cycle.unwrap_or(0.0) / self.assembly_test_reuse.unwrap_or(1.0).max(f64::EPSILON)
    }

    pub fn compute_total_time(&self, gate_count: f64) -> f64 {
        self.self_time(gate_count) + self.assembly_time(gate_count)
    }

    fn required_self_io(&self) -> i64 {
        if !self.test_self() {
            return 0;
        }
        let chains = self.self_num_scan_chains.unwrap_or(0);
        let io_per_chain = self.self_num_io_per_scan_chain.unwrap_or(0);
        if chains <= 0 || io_per_chain <= 0 {
            return 0;
        }
        chains * io_per_chain + self.self_num_test_io_offset.unwrap_or(0)
    }

    fn required_assembly_io(&self) -> i64 {
        if !self.test_assembly() {
            return 0;
        }
        let chains = self.assembly_num_scan_chains.unwrap_or(0);
        let io_per_chain = self.assembly_num_io_per_scan_chain.unwrap_or(0);
        if chains <= 0 || io_per_chain <= 0 {
            return 0;
        }
        chains * io_per_chain + self.assembly_num_test_io_offset.unwrap_or(0)
    }

    /// Number of dedicated test IOs this chip must budget pad area for.
    pub fn num_test_ios(&self) -> i64 {
        let mut num_ios = 0;
        if self.test_self() {
            num_ios = num_ios.max(self.required_self_io());
        }
        if self.test_assembly() {
            num_ios = num_ios.max(self.required_assembly_io());
        }
        num_ios
    }

    fn self_scan_chain_length_per_mm2(&self, core_area: f64, self_gates_per_mm2: f64, gate_flop_ratio: f64) -> f64 {
        if let Some(len) = self.bb_self_scan_chain_length {
            return len;
        }
        let num_gates = core_area * self_gates_per_mm2;
        let num_flops = num_gates / gate_flop_ratio.max(f64::EPSILON);
        num_flops / self.self_num_scan_chains.unwrap_or(1).max(1) as f64
    }

    fn assembly_gate_flop_ratio(&self, assembly_core_area: f64, assembly_gates_per_mm2: f64) -> f64 {
        if let Some(ratio) = self.assembly_gate_flop_ratio {
            if ratio > 0.0 {
                return ratio;
            }
        }
        let num_gates = assembly_core_area * assembly_gates_per_mm2;
        if num_gates <= 0.0 {
            1.0
        } else {
            num_gates
        }
    }

    fn assembly_scan_chain_length_per_mm2(&self, assembly_core_area: f64, assembly_gates_per_mm2: f64) -> f64 {
        if let Some(len) = self.bb_assembly_scan_chain_length {
            return len;
        }
        let gate_flop_ratio = self.assembly_gate_flop_ratio(assembly_core_area, assembly_gates_per_mm2);
        let num_gates = assembly_core_area * assembly_gates_per_mm2;
        let num_flops = num_gates / gate_flop_ratio.max(f64::EPSILON);
        num_flops / self.assembly_num_scan_chains.unwrap_or(1).max(1) as f64
    }

    fn self_pattern_count(&self, core_area: f64, self_gates_per_mm2: f64, gate_flop_ratio: f64) -> f64 {
        if let Some(count) = self.bb_self_pattern_count {
            return count;
        }
        let num_gates = core_area * self_gates_per_mm2;
        let num_flops = num_gates / gate_flop_ratio.max(f64::EPSILON);
        let scan_length = num_flops / self.self_num_scan_chains.unwrap_or(1).max(1) as f64;
        let mut pattern_count = 2.0 * scan_length * scan_length.max(0.0).sqrt();
        pattern_count *= self.self_defect_coverage.unwrap_or(0.0);
        pattern_count *= 1.0 - self.self_test_reuse.unwrap_or(0.0);
        pattern_count
    }

    fn assembly_pattern_count(&self, assembly_core_area: f64, assembly_gates_per_mm2: f64) -> f64 {
        if let Some(count) = self.bb_assembly_pattern_count {
            return count;
        }
        let gate_flop_ratio = self.assembly_gate_flop_ratio(assembly_core_area, assembly_gates_per_mm2);
        let num_gates = assembly_core_area * assembly_gates_per_mm2;
        let num_flops = num_gates / gate_flop_ratio.max(f64::EPSILON);
        let scan_length = num_flops / self.assembly_num_scan_chains.unwrap_or(1).max(1) as f64;
        let mut pattern_count = 2.0 * scan_length * scan_length.max(0.0).sqrt();
        pattern_count *= self.assembly_defect_coverage.unwrap_or(0.0);
        pattern_count *= 1.0 - self.assembly_test_reuse.unwrap_or(0.0);
        pattern_count
    }

    /// Cost of self-testing a die with `core_area` mm^2 of core logic.
    pub fn compute_self_test_cost(&self, core_area: f64, self_gates_per_mm2: f64, gate_flop_ratio: f64) -> f64 {
        if !self.test_self() {
            return 0.0;
        }
        let pattern_count = self.self_pattern_count(core_area, self_gates_per_mm2, gate_flop_ratio);
        let scan_chain_length = self.self_scan_chain_length_per_mm2(core_area, self_gates_per_mm2, gate_flop_ratio);
        core_area
            * self.time_per_test_cycle.unwrap_or(0.0)
            * self.cost_per_second.unwrap_or(0.0)
            * (pattern_count + self.samples_per_input.unwrap_or(0) as f64)
            * scan_chain_length
    }

    /// Cost of testing the assembled stack with `assembly_core_area` mm^2 of
    /// aggregate core logic.
    pub fn compute_assembly_test_cost(&self, assembly_core_area: f64, assembly_gates_per_mm2: f64) -> f64 {
        if !self.test_assembly() {
            return 0.0;
        }
        let pattern_count = self.assembly_pattern_count(assembly_core_area, assembly_gates_per_mm2);
        let scan_chain_length = self.assembly_scan_chain_length_per_mm2(assembly_core_area, assembly_gates_per_mm2);
        assembly_core_area
            * self.time_per_test_cycle.unwrap_or(0.0)
            * self.cost_per_second.unwrap_or(0.0)
            * (pattern_count + self.samples_per_input.unwrap_or(0) as f64)
            * scan_chain_length
    }

    /// ATPG cost. Always zero: pattern-generation cost is not separately
    /// amortized in this model's NRE accounting.
    pub fn atpg_cost(&self) -> f64 {
        0.0
    }

    pub fn compute_self_test_yield(&self, self_true_yield: f64) -> f64 {
        if !self.test_self() {
            return 1.0;
        }
        1.0 - (1.0 - self_true_yield) * self.self_defect_coverage.unwrap_or(0.0)
    }

    pub fn compute_self_quality(&self, self_true_yield: f64, self_test_yield: f64) -> f64 {
        if !self.test_self() {
            return 1.0;
        }
        if self_test_yield == 0.0 {
            0.0
        } else {
            self_true_yield / self_test_yield
        }
    }

    pub fn compute_assembly_test_yield(&self, chip_true_yield: f64) -> f64 {
        if !self.test_assembly() {
            return 1.0;
        }
        1.0 - (1.0 - chip_true_yield) * self.assembly_defect_coverage.unwrap_or(0.0)
    }

    pub fn compute_assembly_quality(&self, chip_true_yield: f64, chip_test_yield: f64) -> f64 {
        if !self.test_assembly() {
            return 1.0;
        }
        if chip_test_yield == 0.0 {
            0.0
        } else {
            chip_true_yield / chip_test_yield
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_test() -> TestProcess {
        let mut t = TestProcess::new();
        t.set_name("wafer_probe").unwrap();
        t.set_time_per_test_cycle(1e-8).unwrap();
        t.set_cost_per_second(0.001).unwrap();
        t.set_samples_per_input(4).unwrap();
        t.set_test_self(true).unwrap();
        t.set_bb_self_pattern_count(1000.0).unwrap();
        t.set_bb_self_scan_chain_length(64.0).unwrap();
        t.set_self_defect_coverage(0.95).unwrap();
        t.set_self_test_reuse(0.0).unwrap();
        t.set_self_num_scan_chains(8).unwrap();
        t.set_self_num_io_per_scan_chain(2).unwrap();
        t.set_self_num_test_io_offset(4).unwrap();
        t.set_self_test_failure_dist("weibull").unwrap();
        t.set_test_assembly(true).unwrap();
        t.set_bb_assembly_pattern_count(2000.0).unwrap();
        t.set_bb_assembly_scan_chain_length(128.0).unwrap();
        t.set_assembly_defect_coverage(0.9).unwrap();
        t.set_assembly_test_reuse(0.0).unwrap();
        t.set_assembly_gate_flop_ratio(6.0).unwrap();
        t.set_assembly_num_scan_chains(8).unwrap();
        t.set_assembly_num_io_per_scan_chain(2).unwrap();
        t.set_assembly_num_test_io_offset(4).unwrap();
        t.set_assembly_test_failure_dist("weibull").unwrap();
        t
    }

    #[test]
    fn freeze_requires_full_definition() {
        let mut t = TestProcess::new();
        assert!(matches!(t.freeze(), Err(CoreError::Underspecified(_))));
        assert!(reference_test().freeze().is_ok());
    }

    #[test]
    fn self_test_yield_reduces_with_defect_coverage() {
        let t = reference_test();
        let y = t.compute_self_test_yield(0.8);
        assert!((y - (1.0 - 0.2 * 0.95)).abs() < 1e-12);
    }

    #[test]
    fn quality_is_one_without_testing() {
        let mut t = TestProcess::new();
        t.set_test_self(false).unwrap();
        t.set_test_assembly(false).unwrap();
        assert_eq!(t.compute_self_test_yield(0.5), 1.0);
        assert_eq!(t.compute_self_quality(0.5, 0.5), 1.0);
        assert_eq!(t.compute_assembly_test_yield(0.5), 1.0);
        assert_eq!(t.num_test_ios(), 0);
    }

    #[test]
    fn num_test_ios_is_max_of_self_and_assembly() {
        let t = reference_test();
        assert_eq!(t.num_test_ios(), 20);
    }
}

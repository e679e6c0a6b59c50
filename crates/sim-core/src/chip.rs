//! Chip Tree (C4): hierarchical chiplet/assembly model over the process
//! library, netlist, and IO records.
//!
//! A `Chip` is built bottom-up in two phases: [`Chip::new`] sets the chip's
//! own parameters and children are attached with [`Chip::add_child`], then
//! [`Chip::initialize`] walks the (already-built) subtree post-order to
//! compute yields, quality, and cost. This avoids the self-referential
//! Chip/Test cycle of the original design: `Test`'s methods take the scalars
//! they need (core area, gates/mm2, gate/flop ratio, true yield) as
//! arguments rather than holding a handle back into the `Chip` that owns
//! them.

use crate::assembly::Assembly;
use crate::error::{CoreError, CoreResult};
use crate::io::Io;
use crate::layer::Layer;
use crate::netlist::ConnectivityGraph;
use crate::test_process::TestProcess;
use crate::wafer::WaferProcess;
use std::collections::BTreeMap;

#[derive(Clone, Debug)]
pub struct Chip {
    name: String,
    core_area: f64,
    aspect_ratio: f64,
    x_location: f64,
    y_location: f64,
    bb_area: Option<f64>,
    bb_cost: Option<f64>,
    bb_quality: Option<f64>,
    bb_power: Option<f64>,
    fraction_memory: f64,
    fraction_logic: f64,
    fraction_analog: f64,
    gate_flop_ratio: f64,
    reticle_share: f64,
    buried: bool,
    core_voltage: f64,
    power: f64,
    quantity: i64,

    assembly_process: Option<Assembly>,
    test_process: Option<TestProcess>,
    stackup: Vec<Layer>,
    wafer_process: Option<WaferProcess>,

    children: Vec<Chip>,
    block_names: Vec<String>,
    io_list: Vec<Io>,
    connectivity: ConnectivityGraph,

    area: f64,
    stack_power: f64,
    io_power: f64,
    total_power: f64,
    nre_design_cost: f64,
    self_true_yield: f64,
    self_test_yield: f64,
    self_quality: f64,
    chip_true_yield: f64,
    chip_test_yield: f64,
    quality: f64,
    self_cost: f64,
    cost: f64,

    frozen: bool,
}

/// Parameters a `Chip` is constructed from; everything downstream (area,
/// yield, cost) is derived by [`Chip::initialize`].
pub struct ChipSpec {
    pub name: String,
    pub core_area: f64,
    pub aspect_ratio: f64,
    pub x_location: f64,
    pub y_location: f64,
    pub bb_area: Option<f64>,
    pub bb_cost: Option<f64>,
    pub bb_quality: Option<f64>,
    pub bb_power: Option<f64>,
    pub fraction_memory: f64,
    pub fraction_logic: f64,
    pub fraction_analog: f64,
    pub gate_flop_ratio: f64,
    pub reticle_share: f64,
    pub buried: bool,
    pub core_voltage: f64,
    pub power: f64,
    pub quantity: i64,
    pub assembly_process: Option<Assembly>,
    pub test_process: Option<TestProcess>,
    pub stackup: Vec<Layer>,
    pub wafer_process: Option<WaferProcess>,
    pub block_names: Vec<String>,
    pub io_list: Vec<Io>,
    pub connectivity: ConnectivityGraph,
}

impl Chip {
    pub fn new(spec: ChipSpec) -> CoreResult<Self> {
        if spec.core_area < 0.0 {
            return Err(CoreError::RangeViolation { field: "core_area", value: spec.core_area, bound: ">= 0" });
        }
        Ok(Chip {
            name: spec.name,
            core_area: spec.core_area,
            aspect_ratio: if spec.aspect_ratio > 0.0 { spec.aspect_ratio } else { 1.0 },
            x_location: spec.x_location,
            y_location: spec.y_location,
            bb_area: spec.bb_area,
            bb_cost: spec.bb_cost,
            bb_quality: spec.bb_quality,
            bb_power: spec.bb_power,
            fraction_memory: spec.fraction_memory,
            fraction_logic: spec.fraction_logic,
            fraction_analog: spec.fraction_analog,
            gate_flop_ratio: spec.gate_flop_ratio,
            reticle_share: spec.reticle_share,
            buried: spec.buried,
            core_voltage: spec.core_voltage,
            power: spec.power,
            quantity: spec.quantity,
            assembly_process: spec.assembly_process,
            test_process: spec.test_process,
            stackup: spec.stackup,
            wafer_process: spec.wafer_process,
            children: Vec::new(),
            block_names: spec.block_names,
            io_list: spec.io_list,
            connectivity: spec.connectivity,
            area: 0.0,
            stack_power: 0.0,
            io_power: 0.0,
            total_power: 0.0,
            nre_design_cost: 0.0,
            self_true_yield: 0.0,
            self_test_yield: 0.0,
            self_quality: 0.0,
            chip_true_yield: 0.0,
            chip_test_yield: 0.0,
            quality: 0.0,
            self_cost: 0.0,
            cost: 0.0,
            frozen: false,
        })
    }

    pub fn add_child(&mut self, child: Chip) -> CoreResult<()> {
        if self.frozen {
            return Err(CoreError::FrozenMutation("children"));
        }
        self.children.push(child);
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn core_area(&self) -> f64 {
        self.core_area
    }

    pub fn aspect_ratio(&self) -> f64 {
        self.aspect_ratio
    }

    pub fn x_location(&self) -> f64 {
        self.x_location
    }

    pub fn y_location(&self) -> f64 {
        self.y_location
    }

    pub fn is_buried(&self) -> bool {
        self.buried
    }

    pub fn children(&self) -> &[Chip] {
        &self.children
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn total_power(&self) -> f64 {
        self.total_power
    }

    pub fn chip_true_yield(&self) -> f64 {
        self.chip_true_yield
    }

    pub fn chip_test_yield(&self) -> f64 {
        self.chip_test_yield
    }

    pub fn quality(&self) -> f64 {
        self.quality
    }

    pub fn cost(&self) -> f64 {
        self.cost
    }

    pub fn self_cost(&self) -> f64 {
        self.self_cost
    }

    /// Recursively computes derived quantities for this chip and its whole
    /// subtree, bottom-up: children must already be attached.
    pub fn initialize(&mut self) -> CoreResult<()> {
        for child in &mut self.children {
            child.initialize()?;
        }

        self.self_true_yield = self.compute_layer_aware_yield();

        if let Some(test) = &self.test_process {
            self.self_test_yield = test.compute_self_test_yield(self.self_true_yield);
            self.self_quality = match self.bb_quality {
                Some(q) => q,
                None => test.compute_self_quality(self.self_true_yield, self.self_test_yield),
            };
        } else {
            self.self_test_yield = 1.0;
            self.self_quality = self.bb_quality.unwrap_or(1.0);
        }

        self.chip_true_yield = self.compute_chip_yield();

        if let Some(test) = &self.test_process {
            self.chip_test_yield = test.compute_assembly_test_yield(self.chip_true_yield);
            self.quality = test.compute_assembly_quality(self.chip_true_yield, self.chip_test_yield);
        } else {
            self.chip_test_yield = 1.0;
            self.quality = 1.0;
        }

        self.stack_power = self.compute_stack_power();
        self.io_power = self.compute_io_power();
        self.total_power = match self.bb_power {
            Some(bb_power) => bb_power + self.stack_power,
            None => self.power + self.io_power + self.stack_power,
        };

        self.area = self.compute_area()?;
        self.nre_design_cost = self.compute_nre_design_cost();

        self.self_cost = self.compute_self_cost()?;
        self.cost = self.compute_cost()?;

        Ok(())
    }

    fn block_index(&self) -> Option<usize> {
        self.block_names.iter().position(|n| n == &self.name)
    }

    fn io_by_type(&self, io_type: &str) -> Option<&Io> {
        self.io_list.iter().find(|io| io.io_type() == Some(io_type))
    }

    fn compute_layer_aware_yield(&self) -> f64 {
        let area = self.core_area + self.get_io_area();
        self.stackup.iter().fold(1.0, |acc, layer| acc * layer.layer_yield(area))
    }

    /// Sum of outgoing tx_area and incoming rx_area, over every IO type this
    /// chip is a connectivity-graph endpoint for.
    fn get_io_area(&self) -> f64 {
        let Some(block_index) = self.block_index() else { return 0.0 };
        let n = self.block_names.len();
        let mut io_area = 0.0;
        for io_type in self.connectivity.io_types() {
            let Some(io) = self.io_by_type(io_type) else { continue };
            let Some(adj) = self.connectivity.adjacency(io_type) else { continue };
            let mut outgoing = 0.0;
            let mut incoming = 0.0;
            for j in 0..n {
                outgoing += *adj.get(block_index, j) as f64;
                incoming += *adj.get(j, block_index) as f64;
            }
            io_area += outgoing * io.tx_area() + incoming * io.rx_area();
        }
        io_area
    }

    /// Power burned driving signals that cross this chip's boundary: every
    /// connection between a block inside `internal_block_list` and one
    /// outside it.
    ///
    /// `signal_power` is a single accumulator carried across the whole
    /// IO-type loop, not reset per type: each type's connections are added
    /// in, then the running total is scaled by that type's bandwidth/energy
    /// factors, so a later type's `*=` compounds onto an earlier type's
    /// already-scaled contribution. This matches the accumulate-then-scale
    /// statement order of the upstream power model, not the more obvious
    /// per-type-independent sum.
    fn get_signal_power(&self, internal_block_list: &[String]) -> f64 {
        let Some(block_index) = self.block_index() else { return 0.0 };
        let n = self.block_names.len();
        let mut signal_power = 0.0;
        for io_type in self.connectivity.io_types() {
            let Some(io) = self.io_by_type(io_type) else { continue };
            let Some(adj) = self.connectivity.adjacency(io_type) else { continue };
            let Some(util) = self.connectivity.utilization(io_type) else { continue };
            let bidirectional_factor = if io.is_bidirectional() { 0.5 } else { 1.0 };
            for j in 0..n {
                if internal_block_list.iter().any(|b| b == &self.block_names[j]) {
                    continue;
                }
                let outgoing = *adj.get(block_index, j) as f64 * *util.get(block_index, j);
                let incoming = *adj.get(j, block_index) as f64 * *util.get(j, block_index);
                signal_power += outgoing + incoming;
            }
            signal_power *= io.bandwidth() * io.energy_per_bit() * bidirectional_factor;
        }
        signal_power
    }

    fn io_power_contribution(&self) -> f64 {
        let list = self.chip_list();
        self.get_signal_power(&list)
    }

    fn compute_io_power(&self) -> f64 {
        self.io_power_contribution()
    }

    /// Every chip name in this subtree, children first, this chip last.
    fn chip_list(&self) -> Vec<String> {
        let mut list: Vec<String> = self.children.iter().flat_map(|c| c.chip_list()).collect();
        list.push(self.name.clone());
        list
    }

    fn self_gates_per_mm2(&self) -> f64 {
        self.stackup.iter().map(|l| l.gates_per_mm2()).sum()
    }

    fn assembly_core_area(&self) -> f64 {
        self.core_area + self.children.iter().map(|c| c.assembly_core_area()).sum::<f64>()
    }

    fn assembly_gates_per_mm2(&self) -> f64 {
        let total_core_area = self.assembly_core_area();
        let total_gates = self.self_gates_per_mm2() + self.children.iter().map(|c| c.assembly_gates_per_mm2()).sum::<f64>();
        if total_core_area == 0.0 {
            0.0
        } else {
            total_gates / total_core_area
        }
    }

    fn expanded_area(area: f64, margin: f64, aspect_ratio: f64) -> f64 {
        if area <= 0.0 {
            return 0.0;
        }
        let aspect_ratio = if aspect_ratio <= 0.0 { 1.0 } else { aspect_ratio };
        let x = (area * aspect_ratio).sqrt();
        let y = (area / aspect_ratio).sqrt();
        (x + 2.0 * margin) * (y + 2.0 * margin)
    }

    fn stacked_die_area(&self) -> f64 {
        let Some(assembly) = &self.assembly_process else { return 0.0 };
        let raw: f64 = self
            .children
            .iter()
            .filter(|c| !c.is_buried())
            .map(|c| Self::expanded_area(c.area, assembly.die_separation() / 2.0, c.aspect_ratio))
            .sum();
        Self::expanded_area(raw, assembly.edge_exclusion(), 1.0)
    }

    fn chips_signal_count(&self) -> i64 {
        let internal = self.chip_list();
        self.children.iter().map(|c| c.signal_count(&internal).0).sum()
    }

    /// Returns (total signal count crossing this chip's boundary, counts
    /// bucketed by IO reach) over every connection not fully internal to
    /// `internal_block_list`.
    fn signal_count(&self, internal_block_list: &[String]) -> (i64, BTreeMap<String, i64>) {
        let Some(block_index) = self.block_index() else { return (0, BTreeMap::new()) };
        let _ = internal_block_list;
        let n = self.block_names.len();
        let mut total = 0i64;
        let mut by_reach: BTreeMap<String, i64> = BTreeMap::new();
        for io_type in self.connectivity.io_types() {
            let Some(io) = self.io_by_type(io_type) else { continue };
            let Some(adj) = self.connectivity.adjacency(io_type) else { continue };
            let bidirectional_factor = if io.is_bidirectional() { 0.5 } else { 1.0 };
            for j in 0..n {
                let outgoing = *adj.get(block_index, j);
                let incoming = *adj.get(j, block_index);
                let count = ((outgoing + incoming) as f64 * io.wire_count() * bidirectional_factor) as i64;
                if count > 0 {
                    total += count;
                    let reach_key = format!("{}", io.reach());
                    *by_reach.entry(reach_key).or_insert(0) += count;
                }
            }
        }
        (total, by_reach)
    }

    fn power_per_pad(&self) -> f64 {
        self.assembly_process
            .as_ref()
            .map(|a| a.power_per_pad(self.core_voltage))
            .unwrap_or(1.0)
    }

    fn power_pads(&self) -> i64 {
        if self.assembly_process.is_none() {
            return 0;
        }
        let per_pad = self.power_per_pad().max(f64::EPSILON);
        let pads = (self.total_power / per_pad).ceil() as i64;
        pads * 2
    }

    fn bonding_pitch_and_separation(&self) -> (f64, f64) {
        match &self.assembly_process {
            Some(a) => (a.bonding_pitch().unwrap_or(0.1), a.die_separation()),
            None => (0.1, 0.1),
        }
    }

    /// Required pad-field area: power pads, test IOs, and signal pads
    /// bucketed by reach, packed so that every signal reaches far enough to
    /// clear already-placed pads of shorter reach.
    fn get_pad_area(&self) -> CoreResult<f64> {
        if self.assembly_process.is_none() {
            return Ok(0.0);
        }
        let num_power_pads = self.power_pads();
        let num_test_pads = self.test_process.as_ref().map(|t| t.num_test_ios()).unwrap_or(0);
        let chip_list = self.chip_list();
        let (signal_pads, signal_with_reach_count) = self.signal_count(&chip_list);
        let num_pads = signal_pads + num_power_pads + num_test_pads;

        let (bonding_pitch, die_separation) = self.bonding_pitch_and_separation();
        let area_per_pad = bonding_pitch * bonding_pitch;

        let mut reaches: Vec<f64> = signal_with_reach_count.keys().filter_map(|k| k.parse().ok()).collect();
        reaches.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let mut current_x = 0.0f64;
        let mut current_y = 0.0f64;
        let mut current_count = 0i64;

        for reach in reaches {
            let reach_with_separation = reach - die_separation;
            if reach_with_separation < 0.0 {
                return Err(CoreError::RangeViolation {
                    field: "reach_with_separation",
                    value: reach_with_separation,
                    bound: ">= 0 (reach smaller than chip separation)",
                });
            }
            let reach_key = format!("{reach}");
            current_count += signal_with_reach_count.get(&reach_key).copied().unwrap_or(0);

            let required_area = current_count as f64 * area_per_pad;
            let usable_area = if reach_with_separation < current_x && reach_with_separation < current_y {
                reach_with_separation * (current_x + current_y) - reach_with_separation * reach_with_separation
            } else {
                current_x * current_y
            };

            if usable_area <= required_area {
                let required_x = (required_area * self.aspect_ratio).sqrt();
                let required_y = (required_area / self.aspect_ratio).sqrt();

                let (mut new_req_x, mut new_req_y) = (required_x, required_y);
                if required_x > reach_with_separation && required_y > reach_with_separation {
                    new_req_y = ((2.0 * required_area / reach_with_separation) + 2.0 * reach_with_separation)
                        / (2.0 * self.aspect_ratio + 2.0);
                    new_req_x = self.aspect_ratio * new_req_y;
                }

                new_req_x = (new_req_x / bonding_pitch).ceil() * bonding_pitch;
                new_req_y = (new_req_y / bonding_pitch).ceil() * bonding_pitch;

                current_x = current_x.max(new_req_x);
                current_y = current_y.max(new_req_y);
            }
        }

        let required_area = area_per_pad * num_pads as f64;
        let (grid_x, grid_y) = if required_area <= current_x * current_y {
            ((current_x / bonding_pitch).ceil(), (current_y / bonding_pitch).ceil())
        } else if current_x < current_y {
            if current_y * current_y <= required_area {
                ((required_area / current_y / bonding_pitch).ceil(), (current_y / bonding_pitch).ceil())
            } else {
                let side = (required_area.sqrt() / bonding_pitch).ceil();
                (side, side)
            }
        } else if current_y < current_x {
            if current_x * current_x <= required_area {
                ((current_x / bonding_pitch).ceil(), (required_area / current_x / bonding_pitch).ceil())
            } else {
                let side = (required_area.sqrt() / bonding_pitch).ceil();
                (side, side)
            }
        } else {
            let side = (required_area.sqrt() / bonding_pitch).ceil();
            (side, side)
        };

        Ok(grid_x * grid_y * area_per_pad)
    }

    fn compute_area(&self) -> CoreResult<f64> {
        if let Some(bb_area) = self.bb_area {
            return Ok(bb_area);
        }
        let chip_io_area = self.core_area + self.get_io_area();
        let pad_required_area = self.get_pad_area()?;
        let stacked_die_bound_area = self.stacked_die_area();
        Ok(stacked_die_bound_area.max(pad_required_area).max(chip_io_area))
    }

    fn compute_stack_power(&self) -> f64 {
        self.children.iter().map(|c| c.total_power).sum()
    }

    fn quality_yield(&self) -> f64 {
        self.children.iter().fold(1.0, |acc, c| acc * c.quality)
    }

    fn compute_chip_yield(&self) -> f64 {
        let chip_true_yield = self.self_quality;
        let quality_yield = self.quality_yield();
        let assembly_yield = match &self.assembly_process {
            Some(a) => a.assembly_yield(self.children.len() as u32, self.chips_signal_count() as u32, self.stacked_die_area()),
            None => 1.0,
        };
        let wafer_process_yield = self.wafer_process.as_ref().map(|w| w.wafer_process_yield_or(1.0)).unwrap_or(1.0);
        chip_true_yield * quality_yield * assembly_yield * wafer_process_yield
    }

    fn compute_nre_front_end_cost(&self) -> f64 {
        match &self.wafer_process {
            Some(w) => self.core_area * w.nre_front_end_cost_per_mm2(self.fraction_memory, self.fraction_logic, self.fraction_analog),
            None => 0.0,
        }
    }

    fn compute_nre_back_end_cost(&self) -> f64 {
        match &self.wafer_process {
            Some(w) => self.core_area * w.nre_back_end_cost_per_mm2(self.fraction_memory, self.fraction_logic, self.fraction_analog),
            None => 0.0,
        }
    }

    fn compute_nre_design_cost(&self) -> f64 {
        self.compute_nre_front_end_cost() + self.compute_nre_back_end_cost()
    }

    fn mask_cost(&self) -> f64 {
        self.stackup.iter().map(|l| l.mask_cost()).sum::<f64>() * self.reticle_share
    }

    /// Non-recurring-engineering cost for this chip, amortized over
    /// `quantity`, plus the (already-amortized) NRE cost of every child.
    pub fn compute_nre_cost(&self) -> f64 {
        let mut nre_cost = self.nre_design_cost + self.mask_cost();
        if let Some(test) = &self.test_process {
            nre_cost += test.atpg_cost();
        }
        if self.quantity > 0 {
            nre_cost /= self.quantity as f64;
        }
        nre_cost + self.children.iter().map(|c| c.compute_nre_cost()).sum::<f64>()
    }

    fn layer_aware_cost(&self) -> CoreResult<f64> {
        let Some(wafer) = &self.wafer_process else { return Ok(0.0) };
        let mut cost = 0.0;
        for layer in &self.stackup {
            cost += layer.layer_cost(self.area, self.aspect_ratio, wafer)?;
        }
        Ok(cost)
    }

    fn compute_self_cost(&self) -> CoreResult<f64> {
        if let Some(bb_cost) = self.bb_cost {
            return Ok(bb_cost);
        }
        let mut cost = self.layer_aware_cost()?;
        if let Some(test) = &self.test_process {
            cost += test.compute_self_test_cost(self.core_area, self.self_gates_per_mm2(), self.gate_flop_ratio);
        }
        if self.self_test_yield > 0.0 {
            Ok(cost / self.self_test_yield)
        } else {
            Err(CoreError::RangeViolation { field: "self_test_yield", value: self.self_test_yield, bound: "> 0" })
        }
    }

    fn compute_cost(&self) -> CoreResult<f64> {
        let mut cost = self.self_cost;
        for child in &self.children {
            cost += child.cost;
        }

        let assembly_cost = self
            .assembly_process
            .as_ref()
            .map(|a| a.assembly_cost(self.children.len() as u32, self.stacked_die_area()))
            .unwrap_or(0.0);
        cost += assembly_cost;

        if let Some(test) = &self.test_process {
            cost += test.compute_assembly_test_cost(self.assembly_core_area(), self.assembly_gates_per_mm2());
        }

        if self.chip_test_yield > 0.0 {
            Ok(cost / self.chip_test_yield)
        } else {
            Err(CoreError::RangeViolation { field: "chip_test_yield", value: self.chip_test_yield, bound: "> 0" })
        }
    }

    /// `(number_of_reticles, number_of_stitches)` needed to expose `area` of
    /// silicon given this chip's wafer process's reticle geometry.
    pub fn compute_number_reticles(&self, area: f64) -> (i64, i64) {
        let Some(wafer) = &self.wafer_process else { return (0, 0) };
        let reticle_area = wafer.reticle_x().unwrap_or(0.0) * wafer.reticle_y().unwrap_or(0.0);
        if reticle_area <= 0.0 {
            return (0, 0);
        }
        let num_reticles = (area / reticle_area).ceil() as i64;
        let largest_square_side = (num_reticles as f64).sqrt().floor() as i64;
        let largest_square_num_reticles = largest_square_side * largest_square_side;
        let remainder = num_reticles - largest_square_num_reticles;
        let num_stitches = largest_square_side * (largest_square_side - 1) * 2 + 2 * remainder
            - if largest_square_side > 0 {
                (remainder as f64 / largest_square_side as f64).ceil() as i64
            } else {
                0
            };
        (num_reticles, num_stitches)
    }

    pub fn wafer_area_eff(&self) -> f64 {
        let Some(wafer) = &self.wafer_process else { return 0.0 };
        let usable_radius = wafer.wafer_diameter().unwrap_or(0.0) / 2.0 - wafer.edge_exclusion().unwrap_or(0.0);
        std::f64::consts::PI * usable_radius * usable_radius
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn smoke_wafer() -> WaferProcess {
        let mut w = WaferProcess::new();
        w.set_wafer_diameter(234.0).unwrap();
        w.set_edge_exclusion(1.2).unwrap();
        w.set_wafer_process_yield(0.98).unwrap();
        w.set_dicing_distance(0.87).unwrap();
        w.set_reticle_x(32.0).unwrap();
        w.set_reticle_y(23.0).unwrap();
        w.set_grid_fill(false).unwrap();
        w.set_nre_front_end_cost_per_mm2_memory(0.1).unwrap();
        w.set_nre_back_end_cost_per_mm2_memory(0.2).unwrap();
        w.set_nre_front_end_cost_per_mm2_logic(0.3).unwrap();
        w.set_nre_back_end_cost_per_mm2_logic(0.4).unwrap();
        w.set_nre_front_end_cost_per_mm2_analog(0.5).unwrap();
        w.set_nre_back_end_cost_per_mm2_analog(0.6).unwrap();
        w.freeze().unwrap();
        w
    }

    fn smoke_assembly() -> Assembly {
        let mut a = Assembly::new();
        a.set_materials_cost_per_mm2(0.1).unwrap();
        a.set_picknplace_machine_cost(1_000_000.0).unwrap();
        a.set_picknplace_machine_lifetime(5.0).unwrap();
        a.set_picknplace_machine_uptime(0.9).unwrap();
        a.set_picknplace_technician_yearly_cost(200_000.0).unwrap();
        a.set_picknplace_time(10.0).unwrap();
        a.set_picknplace_group(1.0).unwrap();
        a.set_bonding_machine_cost(2_000_000.0).unwrap();
        a.set_bonding_machine_lifetime(5.0).unwrap();
        a.set_bonding_machine_uptime(0.8).unwrap();
        a.set_bonding_technician_yearly_cost(210_000.0).unwrap();
        a.set_bonding_time(20.0).unwrap();
        a.set_bonding_group(2.0).unwrap();
        a.set_die_separation(0.2).unwrap();
        a.set_edge_exclusion(0.3).unwrap();
        a.set_max_pad_current_density(0.4).unwrap();
        a.set_bonding_pitch(0.5).unwrap();
        a.set_alignment_yield(0.987).unwrap();
        a.set_bonding_yield(0.999).unwrap();
        a.set_dielectric_bond_defect_density(0.0003).unwrap();
        a.freeze().unwrap();
        a
    }

    fn smoke_layer() -> Layer {
        let mut l = Layer::new();
        l.set_name("smoke_layer_process").unwrap();
        l.set_active(true).unwrap();
        l.set_cost_per_mm2(0.1234).unwrap();
        l.set_transistor_density(0.0321).unwrap();
        l.set_defect_density(0.00543).unwrap();
        l.set_critical_area_ratio(0.5).unwrap();
        l.set_clustering_factor(2.0).unwrap();
        l.set_litho_percent(0.3).unwrap();
        l.set_mask_cost(100_000.0).unwrap();
        l.set_stitching_yield(0.98).unwrap();
        l.freeze().unwrap();
        l
    }

    fn smoke_test_process() -> TestProcess {
        let mut t = TestProcess::new();
        t.set_name("smoke_test_process").unwrap();
        t.set_time_per_test_cycle(0.000001).unwrap();
        t.set_cost_per_second(0.01).unwrap();
        t.set_samples_per_input(1).unwrap();
        t.set_test_self(false).unwrap();
        t.set_self_defect_coverage(0.9).unwrap();
        t.set_self_test_reuse(1.0).unwrap();
        t.set_self_num_scan_chains(7).unwrap();
        t.set_self_num_io_per_scan_chain(2).unwrap();
        t.set_self_num_test_io_offset(1).unwrap();
        t.set_self_test_failure_dist("normal").unwrap();
        t.set_test_assembly(false).unwrap();
        t.set_assembly_defect_coverage(0.5).unwrap();
        t.set_assembly_test_reuse(1.0).unwrap();
        t.set_assembly_num_scan_chains(3).unwrap();
        t.set_assembly_num_io_per_scan_chain(4).unwrap();
        t.set_assembly_num_test_io_offset(2).unwrap();
        t.set_assembly_test_failure_dist("normal").unwrap();
        t.freeze().unwrap();
        t
    }

    /// Single-block, single-layer chip with no netlist, no self/assembly
    /// test, reproducing the reference fixture's headline numbers: a
    /// 10mm^2 core dominated by a 306-power-pad field that forces the
    /// chip into an 81mm^2 pad-limited area.
    fn smoke_chip() -> Chip {
        Chip::new(ChipSpec {
            name: "smoke_chip".to_string(),
            core_area: 10.0,
            aspect_ratio: 1.0,
            x_location: 0.0,
            y_location: 0.0,
            bb_area: None,
            bb_cost: None,
            bb_quality: None,
            bb_power: None,
            fraction_memory: 0.2,
            fraction_logic: 0.5,
            fraction_analog: 0.3,
            gate_flop_ratio: 1.0,
            reticle_share: 1.0,
            buried: false,
            core_voltage: 1.0,
            power: 3.0,
            quantity: 1_000_000,
            assembly_process: Some(smoke_assembly()),
            test_process: Some(smoke_test_process()),
            stackup: vec![smoke_layer()],
            wafer_process: Some(smoke_wafer()),
            block_names: Vec::new(),
            io_list: Vec::new(),
            connectivity: ConnectivityGraph::new(Vec::new()),
        })
        .unwrap()
    }

    #[test]
    fn smoke_chip_reproduces_reference_fixture() {
        let mut chip = smoke_chip();
        chip.initialize().unwrap();

        assert_eq!(chip.power_pads(), 306);
        assert!((chip.area() - 81.0).abs() < 1e-9);
        assert!((chip.self_true_yield - 0.9733930025109545).abs() < 1e-9);
        assert!((chip.self_cost() - 13.206294120778358).abs() < 1e-6);
        assert!((chip.cost() - 13.206294120778358).abs() < 1e-6);
        assert!((chip.cost() + chip.compute_nre_cost() - 13.30630152077835).abs() < 1e-6);

        // test_self/test_assembly are both disabled, so the guarded quality
        // path short-circuits to 1.0 rather than folding in true_yield.
        assert_eq!(chip.self_quality, 1.0);
        assert_eq!(chip.quality(), 1.0);
    }

    #[test]
    fn negative_core_area_rejected() {
        let err = Chip::new(ChipSpec {
            name: "bad".to_string(),
            core_area: -1.0,
            aspect_ratio: 1.0,
            x_location: 0.0,
            y_location: 0.0,
            bb_area: None,
            bb_cost: None,
            bb_quality: None,
            bb_power: None,
            fraction_memory: 0.2,
            fraction_logic: 0.5,
            fraction_analog: 0.3,
            gate_flop_ratio: 1.0,
            reticle_share: 1.0,
            buried: false,
            core_voltage: 1.0,
            power: 3.0,
            quantity: 1,
            assembly_process: None,
            test_process: None,
            stackup: Vec::new(),
            wafer_process: None,
            block_names: Vec::new(),
            io_list: Vec::new(),
            connectivity: ConnectivityGraph::new(Vec::new()),
        })
        .unwrap_err();
        assert!(matches!(err, CoreError::RangeViolation { field: "core_area", .. }));
    }
}

//! `Layer` process record (C1): per-layer yield, cost, and dies-per-wafer.

use crate::error::{CoreError, CoreResult};
use crate::wafer::WaferProcess;

/// A single layer in a chip's stackup: active silicon or a passive/dielectric
/// layer, each with its own yield and cost model.
#[derive(Clone, Debug, Default)]
pub struct Layer {
    name: Option<String>,
    active: Option<bool>,
    cost_per_mm2: Option<f64>,
    transistor_density: Option<f64>,
    defect_density: Option<f64>,
    critical_area_ratio: Option<f64>,
    clustering_factor: Option<f64>,
    litho_percent: Option<f64>,
    mask_cost: Option<f64>,
    stitching_yield: Option<f64>,
    approx: bool,
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

impl Layer {
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

    pub fn set_active(&mut self, value: bool) -> CoreResult<()> {
        self.ensure_mutable("active")?;
        self.active = Some(value);
        Ok(())
    }

    pub fn set_cost_per_mm2(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("cost_per_mm2")?;
        check_nonneg("cost_per_mm2", value)?;
        self.cost_per_mm2 = Some(value);
        Ok(())
    }

    pub fn set_transistor_density(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("transistor_density")?;
        check_nonneg("transistor_density", value)?;
        self.transistor_density = Some(value);
        Ok(())
    }

    pub fn set_defect_density(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("defect_density")?;
        check_nonneg("defect_density", value)?;
        self.defect_density = Some(value);
        Ok(())
    }

    pub fn set_critical_area_ratio(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("critical_area_ratio")?;
        check_nonneg("critical_area_ratio", value)?;
        self.critical_area_ratio = Some(value);
        Ok(())
    }

    pub fn set_clustering_factor(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("clustering_factor")?;
        check_nonneg("clustering_factor", value)?;
        self.clustering_factor = Some(value);
        Ok(())
    }

    pub fn set_litho_percent(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("litho_percent")?;
        check_unit_interval("litho_percent", value)?;
        self.litho_percent = Some(value);
        Ok(())
    }

    pub fn set_mask_cost(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("mask_cost")?;
        check_nonneg("mask_cost", value)?;
        self.mask_cost = Some(value);
        Ok(())
    }

    pub fn set_stitching_yield(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("stitching_yield")?;
        check_unit_interval("stitching_yield", value)?;
        self.stitching_yield = Some(value);
        Ok(())
    }

    pub fn set_approx(&mut self, value: bool) -> CoreResult<()> {
        self.ensure_mutable("approx")?;
        self.approx = value;
        Ok(())
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn mask_cost(&self) -> f64 {
        self.mask_cost.unwrap_or(0.0)
    }

    pub fn is_active(&self) -> bool {
        self.active.unwrap_or(false)
    }

    /// Gates per mm^2, assuming roughly four transistors per gate.
    pub fn gates_per_mm2(&self) -> f64 {
        self.transistor_density.unwrap_or(0.0) * 1e6 / 4.0
    }

    pub fn is_fully_defined(&self) -> bool {
        self.name.is_some()
            && self.active.is_some()
            && self.cost_per_mm2.is_some()
            && self.transistor_density.is_some()
            && self.defect_density.is_some()
            && self.critical_area_ratio.is_some()
            && self.clustering_factor.is_some()
            && self.litho_percent.is_some()
            && self.mask_cost.is_some()
            && self.stitching_yield.is_some()
    }

    pub fn freeze(&mut self) -> CoreResult<()> {
        if !self.is_fully_defined() {
            tracing::error!("layer freeze rejected: underspecified");
            return Err(CoreError::Underspecified(vec!["layer: see is_fully_defined"]));
        }
        self.frozen = true;
        Ok(())
    }

    /// Yield of this layer over `area`, at zero reticle stitches (stitches
    /// are not tracked independently of the Chip Tree's reticle accounting).
    pub fn layer_yield(&self, area: f64) -> f64 {
        let num_stitches: i32 = 0;
        let defect_density = self.defect_density.unwrap_or(0.0);
        let critical_area_ratio = self.critical_area_ratio.unwrap_or(1.0);
        let clustering_factor = self.clustering_factor.unwrap_or(1.0).max(f64::EPSILON);
        let defect_yield = (1.0 + defect_density * area * critical_area_ratio / clustering_factor)
            .powf(-clustering_factor);
        let stitching_yield = self.stitching_yield.unwrap_or(1.0).powi(num_stitches);
        stitching_yield * defect_yield
    }

    /// Fraction of the (possibly multi-reticle) exposure field that is
    /// usable die area rather than wasted stitched overhang.
    pub fn reticle_utilization(&self, area: f64, reticle_x: f64, reticle_y: f64) -> f64 {
        let unit = reticle_x * reticle_y;
        if unit <= 0.0 || area <= 0.0 {
            return 1.0;
        }
        let mut reticle_area = unit;
        while reticle_area < area {
            reticle_area += unit;
        }
        let number_chips_in_reticle = (reticle_area / area).trunc();
        let unutilized = reticle_area - number_chips_in_reticle * area;
        (reticle_area - unutilized) / reticle_area
    }

    fn compute_cost_per_mm2(&self, area: f64, aspect_ratio: f64, wafer: &WaferProcess) -> CoreResult<f64> {
        let wafer_diameter = wafer.wafer_diameter().unwrap_or(0.0);
        let grid_fill = wafer.grid_fill().unwrap_or(false);

        let x_dim = (area * aspect_ratio).sqrt();
        let y_dim = (area / aspect_ratio).sqrt();
        let usable_wafer_diameter = wafer_diameter - 2.0 * wafer.edge_exclusion().unwrap_or(0.0);

        if (x_dim * x_dim + y_dim * y_dim).sqrt() > usable_wafer_diameter / 2.0 {
            return Err(CoreError::RangeViolation {
                field: "layer_area",
                value: area,
                bound: "<= wafer usable area",
            });
        }
        if x_dim == 0.0 || y_dim == 0.0 {
            return Err(CoreError::RangeViolation { field: "layer_area", value: area, bound: "> 0" });
        }

        let dicing_distance = wafer.dicing_distance().unwrap_or(0.0);
        let dies_per_wafer =
            self.dies_per_wafer(x_dim, y_dim, usable_wafer_diameter, dicing_distance, grid_fill);
        if dies_per_wafer == 0 {
            return Err(CoreError::RangeViolation { field: "dies_per_wafer", value: 0.0, bound: "> 0" });
        }

        let used_area = dies_per_wafer as f64 * area;
        let circle_area = std::f64::consts::PI * (wafer_diameter / 2.0).powi(2);
        Ok(self.cost_per_mm2.unwrap_or(0.0) * circle_area / used_area)
    }

    /// Manufacturing cost of this layer over `area`, split between a
    /// litho-limited and non-litho-limited share per `litho_percent`.
    pub fn layer_cost(&self, area: f64, aspect_ratio: f64, wafer: &WaferProcess) -> CoreResult<f64> {
        if area == 0.0 {
            return Ok(0.0);
        }
        if area < 0.0 {
            return Err(CoreError::RangeViolation { field: "layer_area", value: area, bound: ">= 0" });
        }
        let mut layer_cost = area * self.compute_cost_per_mm2(area, aspect_ratio, wafer)?;
        let litho_percent = self.litho_percent.unwrap_or(0.0);
        let reticle_utilization = if litho_percent == 0.0 {
            1.0
        } else if litho_percent > 0.0 {
            self.reticle_utilization(area, wafer.reticle_x().unwrap_or(0.0), wafer.reticle_y().unwrap_or(0.0))
        } else {
            return Err(CoreError::RangeViolation {
                field: "litho_percent",
                value: litho_percent,
                bound: ">= 0",
            });
        };
        layer_cost = layer_cost * (1.0 - litho_percent) + (layer_cost * litho_percent) / reticle_utilization;
        Ok(layer_cost)
    }

    /// Dispatches to the grid or non-grid dies-per-wafer search, or the
    /// closed-form `approx` estimate.
    pub fn dies_per_wafer(
        &self,
        x_dim: f64,
        y_dim: f64,
        usable_wafer_diameter: f64,
        dicing_distance: f64,
        grid_fill: bool,
    ) -> u64 {
        if grid_fill {
            self.grid_dies_per_wafer(x_dim, y_dim, usable_wafer_diameter, dicing_distance)
        } else {
            self.nogrid_dies_per_wafer(x_dim, y_dim, usable_wafer_diameter, dicing_distance)
        }
    }

    fn grid_dies_per_wafer(&self, x_dim: f64, y_dim: f64, usable_wafer_diameter: f64, dicing_distance: f64) -> u64 {
        if self.approx {
            let common_term = dicing_distance + (x_dim * y_dim).sqrt();
            let term1 = usable_wafer_diameter / (4.0 * common_term.powi(2));
            let term2 = 1.0 / (2.0 * common_term.powi(2)).sqrt();
            let approx = (usable_wafer_diameter * std::f64::consts::PI * (term1 - term2)).floor();
            return approx.max(0.0) as u64;
        }

        if x_dim <= 0.0 || y_dim <= 0.0 || usable_wafer_diameter <= 0.0 {
            return 0;
        }

        let r = usable_wafer_diameter * 0.5;
        let r_squared = r * r;
        let x_dim_eff = x_dim + dicing_distance;
        let y_dim_eff = y_dim + dicing_distance;
        let half_x_dim_eff = x_dim_eff * 0.5;
        let half_y_dim_eff = y_dim_eff * 0.5;
        let half_dicing_distance = dicing_distance * 0.5;

        let crossover_column_height = (r_squared - (half_x_dim_eff - half_dicing_distance).powi(2)).sqrt() * 2.0;
        let max_left_column = (crossover_column_height / half_y_dim_eff).ceil() as i64 + 1;

        let mut best_dies_per_wafer: i64 = 0;
        if max_left_column > 0 && x_dim >= usable_wafer_diameter * 0.25 {
            best_dies_per_wafer = (3.14159 * r_squared / (x_dim_eff * y_dim_eff)) as i64;
        }

        for left_column_height in 1..max_left_column {
            if left_column_height == 1 && x_dim >= usable_wafer_diameter * 0.25 {
                continue;
            }

            let row_chord_height = (left_column_height as f64 * half_y_dim_eff) - half_dicing_distance;
            if row_chord_height >= r {
                continue;
            }

            let row_chord_height_squared = row_chord_height * row_chord_height;
            let sqrt_term = (r_squared - row_chord_height_squared).sqrt();
            let chord_length = 2.0 * sqrt_term;
            let num_dies_in_row = ((chord_length + dicing_distance) / x_dim_eff) as i64;
            if num_dies_in_row <= 0 {
                continue;
            }

            let mut dies_per_wafer = num_dies_in_row * left_column_height;

            let next_row_chord_height = row_chord_height + y_dim_eff;
            let half_chord_length = chord_length * 0.5;
            let end_of_rows = num_dies_in_row as f64 * x_dim_eff - half_chord_length;
            let end_plus_eff = end_of_rows + x_dim_eff;
            let end_plus_eff_squared = end_plus_eff * end_plus_eff;

            for i in 0..left_column_height {
                let y = y_dim_eff * i as f64 - next_row_chord_height + y_dim_eff;
                let y_squared = y * y;
                if end_plus_eff_squared + y_squared > r_squared {
                    continue;
                }
                let y_plus_dim_eff = y + y_dim_eff;
                let y_plus_squared = y_plus_dim_eff * y_plus_dim_eff;
                if end_plus_eff_squared + y_plus_squared <= r_squared {
                    dies_per_wafer += 1;
                }
            }

            let mut current_row_chord_height = next_row_chord_height;
            let starting_distance_from_left = (usable_wafer_diameter - chord_length) * 0.5;
            while current_row_chord_height < r {
                let current_chord_height_squared = current_row_chord_height * current_row_chord_height;
                if current_chord_height_squared >= r_squared {
                    break;
                }
                let sqrt_term_current = (r_squared - current_chord_height_squared).sqrt();
                let current_chord_length = 2.0 * sqrt_term_current;

                let location_of_first_fit = (usable_wafer_diameter - current_chord_length) * 0.5;
                let diff = location_of_first_fit - starting_distance_from_left;
                let starting_location = (diff / x_dim_eff).ceil() * x_dim_eff + starting_distance_from_left;
                let effective_cord_length = current_chord_length - (starting_location - location_of_first_fit);

                if effective_cord_length <= 0.0 {
                    current_row_chord_height += y_dim_eff;
                    continue;
                }

                let dies_per_row = (effective_cord_length / x_dim_eff) as i64;
                dies_per_wafer += 2 * dies_per_row;
                current_row_chord_height += y_dim_eff;
            }

            if dies_per_wafer > best_dies_per_wafer {
                best_dies_per_wafer = dies_per_wafer;
            }
        }

        best_dies_per_wafer.max(0) as u64
    }

    fn nogrid_dies_per_wafer(&self, x_dim: f64, y_dim: f64, usable_wafer_diameter: f64, dicing_distance: f64) -> u64 {
        if x_dim <= 0.0 || y_dim <= 0.0 || usable_wafer_diameter <= 0.0 {
            return 0;
        }

        let x_dim_eff = x_dim + dicing_distance;
        let y_dim_eff = y_dim + dicing_distance;
        let r = usable_wafer_diameter * 0.5;
        let r_squared = r * r;
        let half_dicing_distance = dicing_distance * 0.5;

        // Case 1: a row of dies centered on the wafer's diameter line, plus
        // symmetric rows above and below.
        let mut num_squares_case_1: i64 = 0;
        let mut row_chord_height = y_dim_eff * 0.5;
        if row_chord_height - half_dicing_distance < r {
            let chord_length =
                (r_squared - (row_chord_height - half_dicing_distance).powi(2)).sqrt() * 2.0 + dicing_distance;
            let dies_in_first_row = (chord_length / x_dim_eff).floor() as i64;
            num_squares_case_1 += dies_in_first_row;

            row_chord_height += y_dim_eff;
            while row_chord_height < r {
                if row_chord_height - half_dicing_distance >= r {
                    break;
                }
                let current_chord_length =
                    (r_squared - (row_chord_height - half_dicing_distance).powi(2)).sqrt() * 2.0 + dicing_distance;
                let squares_in_row = (current_chord_length / x_dim_eff).floor() as i64;
                num_squares_case_1 += squares_in_row * 2;
                row_chord_height += y_dim_eff;
            }
        }

        // Case 2: rows flanking, but not crossing, the diameter line.
        let mut num_squares_case_2: i64 = 0;
        let mut row_chord_height = y_dim_eff;
        if row_chord_height - half_dicing_distance < r {
            let initial_chord_length =
                (r_squared - (row_chord_height - half_dicing_distance).powi(2)).sqrt() * 2.0 + dicing_distance;
            let initial_squares = (initial_chord_length / x_dim_eff).floor() as i64;
            num_squares_case_2 += 2 * initial_squares;

            row_chord_height += y_dim_eff;
            while row_chord_height < r {
                if row_chord_height - half_dicing_distance >= r {
                    break;
                }
                let current_chord_length =
                    (r_squared - (row_chord_height - half_dicing_distance).powi(2)).sqrt() * 2.0 + dicing_distance;
                let squares_in_row = (current_chord_length / x_dim_eff).floor() as i64;
                num_squares_case_2 += squares_in_row * 2;
                row_chord_height += y_dim_eff;
            }
        }

        num_squares_case_1.max(num_squares_case_2).max(0) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference_layer() -> Layer {
        let mut l = Layer::new();
        l.set_name("logic").unwrap();
        l.set_active(true).unwrap();
        l.set_cost_per_mm2(0.1234).unwrap();
        l.set_transistor_density(100.0).unwrap();
        l.set_defect_density(0.00543).unwrap();
        l.set_critical_area_ratio(0.5).unwrap();
        l.set_clustering_factor(2.0).unwrap();
        l.set_litho_percent(0.0).unwrap();
        l.set_mask_cost(0.0).unwrap();
        l.set_stitching_yield(0.98).unwrap();
        l
    }

    #[test]
    fn layer_yield_reference_values() {
        let l = reference_layer();
        assert!((l.layer_yield(10.0) - 0.9733930025109545).abs() < 1e-12);
        assert!((l.layer_yield(1000.0) - 0.17992710703076417).abs() < 1e-10);
    }

    #[test]
    fn dies_per_wafer_grid_fixtures() {
        let l = Layer::new();
        assert_eq!(l.dies_per_wafer(10.0, 10.0, 300.0, 1.0, true), 540);
        assert_eq!(l.dies_per_wafer(1.0, 1.0, 300.0, 1.0, true), 17470);
        assert_eq!(l.dies_per_wafer(100.0, 100.0, 300.0, 1.0, true), 4);
    }

    #[test]
    fn dies_per_wafer_zero_when_die_too_large() {
        let l = Layer::new();
        // x*y > pi*(d/2)^2
        assert_eq!(l.dies_per_wafer(400.0, 400.0, 300.0, 1.0, true), 0);
        assert_eq!(l.dies_per_wafer(400.0, 400.0, 300.0, 1.0, false), 0);
    }

    #[test]
    fn dies_per_wafer_monotone_in_die_size() {
        let l = Layer::new();
        let small = l.dies_per_wafer(10.0, 10.0, 300.0, 1.0, false);
        let big = l.dies_per_wafer(20.0, 20.0, 300.0, 1.0, false);
        assert!(big <= small);
    }
}

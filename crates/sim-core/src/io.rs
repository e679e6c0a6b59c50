//! `IO` process record (C1): a single signaling interface type a block can use.

use crate::error::{CoreError, CoreResult};

/// One interconnect/IO type (e.g. a D2D SerDes, a UCIe PHY, a wirebond pad).
/// Purely a data record; the chip tree computes IO area and power from it.
#[derive(Clone, Debug, Default)]
pub struct Io {
    io_type: Option<String>,
    rx_area: Option<f64>,
    tx_area: Option<f64>,
    shoreline: Option<f64>,
    bandwidth: Option<f64>,
    wire_count: Option<f64>,
    bidirectional: Option<bool>,
    energy_per_bit: Option<f64>,
    reach: Option<f64>,
    frozen: bool,
}

fn check_nonneg(field: &'static str, value: f64) -> CoreResult<()> {
    if value < 0.0 {
        Err(CoreError::RangeViolation { field, value, bound: ">= 0" })
    } else {
        Ok(())
    }
}

impl Io {
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

    pub fn set_io_type(&mut self, value: impl Into<String>) -> CoreResult<()> {
        self.ensure_mutable("io_type")?;
        self.io_type = Some(value.into());
        Ok(())
    }

    pub fn set_rx_area(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("rx_area")?;
        check_nonneg("rx_area", value)?;
        self.rx_area = Some(value);
        Ok(())
    }

    pub fn set_tx_area(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("tx_area")?;
        check_nonneg("tx_area", value)?;
        self.tx_area = Some(value);
        Ok(())
    }

    pub fn set_shoreline(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("shoreline")?;
        check_nonneg("shoreline", value)?;
        self.shoreline = Some(value);
        Ok(())
    }

    pub fn set_bandwidth(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("bandwidth")?;
        check_nonneg("bandwidth", value)?;
        self.bandwidth = Some(value);
        Ok(())
    }

    pub fn set_wire_count(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("wire_count")?;
        check_nonneg("wire_count", value)?;
        self.wire_count = Some(value);
        Ok(())
    }

    pub fn set_bidirectional(&mut self, value: bool) -> CoreResult<()> {
        self.ensure_mutable("bidirectional")?;
        self.bidirectional = Some(value);
        Ok(())
    }

    pub fn set_energy_per_bit(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("energy_per_bit")?;
        check_nonneg("energy_per_bit", value)?;
        self.energy_per_bit = Some(value);
        Ok(())
    }

    pub fn set_reach(&mut self, value: f64) -> CoreResult<()> {
        self.ensure_mutable("reach")?;
        check_nonneg("reach", value)?;
        self.reach = Some(value);
        Ok(())
    }

    pub fn io_type(&self) -> Option<&str> {
        self.io_type.as_deref()
    }

    pub fn rx_area(&self) -> f64 {
        self.rx_area.unwrap_or(0.0)
    }

    pub fn tx_area(&self) -> f64 {
        self.tx_area.unwrap_or(0.0)
    }

    pub fn shoreline(&self) -> f64 {
        self.shoreline.unwrap_or(0.0)
    }

    pub fn bandwidth(&self) -> f64 {
        self.bandwidth.unwrap_or(0.0)
    }

    pub fn wire_count(&self) -> f64 {
        self.wire_count.unwrap_or(0.0)
    }

    pub fn is_bidirectional(&self) -> bool {
        self.bidirectional.unwrap_or(false)
    }

    pub fn energy_per_bit(&self) -> f64 {
        self.energy_per_bit.unwrap_or(0.0)
    }

    pub fn reach(&self) -> f64 {
        self.reach.unwrap_or(0.0)
    }

    pub fn is_fully_defined(&self) -> bool {
        self.io_type.is_some()
            && self.rx_area.is_some()
            && self.tx_area.is_some()
            && self.shoreline.is_some()
            && self.bandwidth.is_some()
            && self.wire_count.is_some()
            && self.energy_per_bit.is_some()
            && self.reach.is_some()
    }

    pub fn freeze(&mut self) -> CoreResult<()> {
        if !self.is_fully_defined() {
            tracing::error!("io freeze rejected: underspecified");
            return Err(CoreError::Underspecified(vec!["io: see is_fully_defined"]));
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

    fn reference_io() -> Io {
        let mut io = Io::new();
        io.set_io_type("ucie_standard").unwrap();
        io.set_rx_area(0.006).unwrap();
        io.set_tx_area(0.006).unwrap();
        io.set_shoreline(0.01).unwrap();
        io.set_bandwidth(16.0).unwrap();
        io.set_wire_count(64.0).unwrap();
        io.set_bidirectional(true).unwrap();
        io.set_energy_per_bit(0.5).unwrap();
        io.set_reach(2.0).unwrap();
        io
    }

    #[test]
    fn freeze_requires_full_definition() {
        let mut io = Io::new();
        assert!(matches!(io.freeze(), Err(CoreError::Underspecified(_))));
    }

    #[test]
    fn freeze_then_mutate_fails() {
        let mut io = reference_io();
        io.freeze().unwrap();
        assert!(matches!(io.set_bandwidth(32.0), Err(CoreError::FrozenMutation("bandwidth"))));
    }

    #[test]
    fn negative_area_rejected() {
        let mut io = Io::new();
        assert!(matches!(io.set_rx_area(-1.0), Err(CoreError::RangeViolation { .. })));
    }
}

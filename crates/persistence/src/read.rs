//! Text-file readers for the process library, blocks, and netlist (C9, §6.1).
//!
//! Every format is a header line of field names followed by one or more
//! whitespace-separated data lines, per the field order of the corresponding
//! §3.2 record. `-` in an optional column means "leave unset". The *blocks*
//! file is the one exception: its exact column order (`name area power tech
//! is_memory`, no header) is pinned by the original evaluator's reader, not
//! invented here.

use crate::error::{PersistenceError, PersistenceResult};
use sim_core::netlist::{Block, ConnectivityGraph, Matrix};
use sim_core::tech::TechNode;
use sim_core::{Assembly, Io, Layer, TestProcess, WaferProcess};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

fn read_lines(path: &Path) -> PersistenceResult<Vec<String>> {
    let text = std::fs::read_to_string(path)?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn expect_header(path: &Path, line: &str, expected: &[&str]) -> PersistenceResult<()> {
    let got: Vec<&str> = line.split_whitespace().collect();
    if got != expected {
        return Err(PersistenceError::HeaderMismatch {
            path: path.display().to_string(),
            expected: expected.join(" "),
            got: line.to_string(),
        });
    }
    Ok(())
}

fn field<'a>(path: &Path, tokens: &'a [&str], idx: usize, name: &'static str) -> PersistenceResult<&'a str> {
    tokens.get(idx).copied().ok_or_else(|| PersistenceError::Field {
        path: path.display().to_string(),
        field: name,
        token: String::new(),
    })
}

fn parse_f64(path: &Path, tokens: &[&str], idx: usize, name: &'static str) -> PersistenceResult<f64> {
    let tok = field(path, tokens, idx, name)?;
    tok.parse().map_err(|_| PersistenceError::Field { path: path.display().to_string(), field: name, token: tok.to_string() })
}

fn parse_opt_f64(path: &Path, tokens: &[&str], idx: usize, name: &'static str) -> PersistenceResult<Option<f64>> {
    let tok = field(path, tokens, idx, name)?;
    if tok == "-" {
        return Ok(None);
    }
    tok.parse().map(Some).map_err(|_| PersistenceError::Field { path: path.display().to_string(), field: name, token: tok.to_string() })
}

fn parse_i64(path: &Path, tokens: &[&str], idx: usize, name: &'static str) -> PersistenceResult<i64> {
    let tok = field(path, tokens, idx, name)?;
    tok.parse().map_err(|_| PersistenceError::Field { path: path.display().to_string(), field: name, token: tok.to_string() })
}

fn parse_bool(path: &Path, tokens: &[&str], idx: usize, name: &'static str) -> PersistenceResult<bool> {
    let tok = field(path, tokens, idx, name)?;
    tok.parse().map_err(|_| PersistenceError::Field { path: path.display().to_string(), field: name, token: tok.to_string() })
}

const WAFER_FIELDS: &[&str] = &[
    "wafer_diameter",
    "edge_exclusion",
    "wafer_process_yield",
    "dicing_distance",
    "reticle_x",
    "reticle_y",
    "grid_fill",
    "nre_front_end_cost_per_mm2_memory",
    "nre_front_end_cost_per_mm2_logic",
    "nre_front_end_cost_per_mm2_analog",
    "nre_back_end_cost_per_mm2_memory",
    "nre_back_end_cost_per_mm2_logic",
    "nre_back_end_cost_per_mm2_analog",
];

pub fn read_wafer_process(path: impl AsRef<Path>) -> PersistenceResult<WaferProcess> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.len() < 2 {
        return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: "expected a header line and one data line".into() });
    }
    expect_header(path, &lines[0], WAFER_FIELDS)?;
    let t: Vec<&str> = lines[1].split_whitespace().collect();

    let mut w = WaferProcess::new();
    w.set_wafer_diameter(parse_f64(path, &t, 0, "wafer_diameter")?)?;
    w.set_edge_exclusion(parse_f64(path, &t, 1, "edge_exclusion")?)?;
    w.set_wafer_process_yield(parse_f64(path, &t, 2, "wafer_process_yield")?)?;
    w.set_dicing_distance(parse_f64(path, &t, 3, "dicing_distance")?)?;
    w.set_reticle_x(parse_f64(path, &t, 4, "reticle_x")?)?;
    w.set_reticle_y(parse_f64(path, &t, 5, "reticle_y")?)?;
    w.set_grid_fill(parse_bool(path, &t, 6, "grid_fill")?)?;
    w.set_nre_front_end_cost_per_mm2_memory(parse_f64(path, &t, 7, "nre_front_end_cost_per_mm2_memory")?)?;
    w.set_nre_front_end_cost_per_mm2_logic(parse_f64(path, &t, 8, "nre_front_end_cost_per_mm2_logic")?)?;
    w.set_nre_front_end_cost_per_mm2_analog(parse_f64(path, &t, 9, "nre_front_end_cost_per_mm2_analog")?)?;
    w.set_nre_back_end_cost_per_mm2_memory(parse_f64(path, &t, 10, "nre_back_end_cost_per_mm2_memory")?)?;
    w.set_nre_back_end_cost_per_mm2_logic(parse_f64(path, &t, 11, "nre_back_end_cost_per_mm2_logic")?)?;
    w.set_nre_back_end_cost_per_mm2_analog(parse_f64(path, &t, 12, "nre_back_end_cost_per_mm2_analog")?)?;
    w.freeze()?;
    Ok(w)
}

const ASSEMBLY_FIELDS: &[&str] = &[
    "materials_cost_per_mm2",
    "bb_cost_per_second",
    "picknplace_machine_cost",
    "picknplace_machine_lifetime",
    "picknplace_machine_uptime",
    "picknplace_technician_yearly_cost",
    "picknplace_time",
    "picknplace_group",
    "bonding_machine_cost",
    "bonding_machine_lifetime",
    "bonding_machine_uptime",
    "bonding_technician_yearly_cost",
    "bonding_time",
    "bonding_group",
    "die_separation",
    "edge_exclusion",
    "max_pad_current_density",
    "bonding_pitch",
    "alignment_yield",
    "bonding_yield",
    "dielectric_bond_defect_density",
];

pub fn read_assembly_process(path: impl AsRef<Path>) -> PersistenceResult<Assembly> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.len() < 2 {
        return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: "expected a header line and one data line".into() });
    }
    expect_header(path, &lines[0], ASSEMBLY_FIELDS)?;
    let t: Vec<&str> = lines[1].split_whitespace().collect();

    let mut a = Assembly::new();
    a.set_materials_cost_per_mm2(parse_f64(path, &t, 0, "materials_cost_per_mm2")?)?;
    if let Some(v) = parse_opt_f64(path, &t, 1, "bb_cost_per_second")? {
        a.set_bb_cost_per_second(v)?;
    }
    if let Some(v) = parse_opt_f64(path, &t, 2, "picknplace_machine_cost")? {
        a.set_picknplace_machine_cost(v)?;
    }
    a.set_picknplace_machine_lifetime(parse_f64(path, &t, 3, "picknplace_machine_lifetime")?)?;
    a.set_picknplace_machine_uptime(parse_f64(path, &t, 4, "picknplace_machine_uptime")?)?;
    a.set_picknplace_technician_yearly_cost(parse_f64(path, &t, 5, "picknplace_technician_yearly_cost")?)?;
    a.set_picknplace_time(parse_f64(path, &t, 6, "picknplace_time")?)?;
    a.set_picknplace_group(parse_f64(path, &t, 7, "picknplace_group")?)?;
    if let Some(v) = parse_opt_f64(path, &t, 8, "bonding_machine_cost")? {
        a.set_bonding_machine_cost(v)?;
    }
    a.set_bonding_machine_lifetime(parse_f64(path, &t, 9, "bonding_machine_lifetime")?)?;
    a.set_bonding_machine_uptime(parse_f64(path, &t, 10, "bonding_machine_uptime")?)?;
    a.set_bonding_technician_yearly_cost(parse_f64(path, &t, 11, "bonding_technician_yearly_cost")?)?;
    a.set_bonding_time(parse_f64(path, &t, 12, "bonding_time")?)?;
    a.set_bonding_group(parse_f64(path, &t, 13, "bonding_group")?)?;
    a.set_die_separation(parse_f64(path, &t, 14, "die_separation")?)?;
    a.set_edge_exclusion(parse_f64(path, &t, 15, "edge_exclusion")?)?;
    a.set_max_pad_current_density(parse_f64(path, &t, 16, "max_pad_current_density")?)?;
    a.set_bonding_pitch(parse_f64(path, &t, 17, "bonding_pitch")?)?;
    a.set_alignment_yield(parse_f64(path, &t, 18, "alignment_yield")?)?;
    a.set_bonding_yield(parse_f64(path, &t, 19, "bonding_yield")?)?;
    a.set_dielectric_bond_defect_density(parse_f64(path, &t, 20, "dielectric_bond_defect_density")?)?;
    a.freeze()?;
    Ok(a)
}

const TEST_FIELDS: &[&str] = &[
    "name",
    "time_per_test_cycle",
    "cost_per_second",
    "samples_per_input",
    "test_self",
    "bb_self_pattern_count",
    "bb_self_scan_chain_length",
    "self_defect_coverage",
    "self_test_reuse",
    "self_num_scan_chains",
    "self_num_io_per_scan_chain",
    "self_num_test_io_offset",
    "self_test_failure_dist",
    "test_assembly",
    "bb_assembly_pattern_count",
    "bb_assembly_scan_chain_length",
    "assembly_defect_coverage",
    "assembly_test_reuse",
    "assembly_gate_flop_ratio",
    "assembly_num_scan_chains",
    "assembly_num_io_per_scan_chain",
    "assembly_num_test_io_offset",
    "assembly_test_failure_dist",
];

/// Returns `None` when the file has no data line: a run need not test at all.
pub fn read_test_process(path: impl AsRef<Path>) -> PersistenceResult<Option<TestProcess>> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.is_empty() {
        return Ok(None);
    }
    if lines.len() < 2 {
        return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: "expected a header line and one data line".into() });
    }
    expect_header(path, &lines[0], TEST_FIELDS)?;
    let t: Vec<&str> = lines[1].split_whitespace().collect();

    let mut test = TestProcess::new();
    test.set_name(field(path, &t, 0, "name")?)?;
    test.set_time_per_test_cycle(parse_f64(path, &t, 1, "time_per_test_cycle")?)?;
    test.set_cost_per_second(parse_f64(path, &t, 2, "cost_per_second")?)?;
    test.set_samples_per_input(parse_i64(path, &t, 3, "samples_per_input")?)?;
    test.set_test_self(parse_bool(path, &t, 4, "test_self")?)?;
    if let Some(v) = parse_opt_f64(path, &t, 5, "bb_self_pattern_count")? {
        test.set_bb_self_pattern_count(v)?;
    }
    if let Some(v) = parse_opt_f64(path, &t, 6, "bb_self_scan_chain_length")? {
        test.set_bb_self_scan_chain_length(v)?;
    }
    test.set_self_defect_coverage(parse_f64(path, &t, 7, "self_defect_coverage")?)?;
    test.set_self_test_reuse(parse_f64(path, &t, 8, "self_test_reuse")?)?;
    test.set_self_num_scan_chains(parse_i64(path, &t, 9, "self_num_scan_chains")?)?;
    test.set_self_num_io_per_scan_chain(parse_i64(path, &t, 10, "self_num_io_per_scan_chain")?)?;
    test.set_self_num_test_io_offset(parse_i64(path, &t, 11, "self_num_test_io_offset")?)?;
    test.set_self_test_failure_dist(field(path, &t, 12, "self_test_failure_dist")?)?;
    test.set_test_assembly(parse_bool(path, &t, 13, "test_assembly")?)?;
    if let Some(v) = parse_opt_f64(path, &t, 14, "bb_assembly_pattern_count")? {
        test.set_bb_assembly_pattern_count(v)?;
    }
    if let Some(v) = parse_opt_f64(path, &t, 15, "bb_assembly_scan_chain_length")? {
        test.set_bb_assembly_scan_chain_length(v)?;
    }
    test.set_assembly_defect_coverage(parse_f64(path, &t, 16, "assembly_defect_coverage")?)?;
    test.set_assembly_test_reuse(parse_f64(path, &t, 17, "assembly_test_reuse")?)?;
    if let Some(v) = parse_opt_f64(path, &t, 18, "assembly_gate_flop_ratio")? {
        test.set_assembly_gate_flop_ratio(v)?;
    }
    test.set_assembly_num_scan_chains(parse_i64(path, &t, 19, "assembly_num_scan_chains")?)?;
    test.set_assembly_num_io_per_scan_chain(parse_i64(path, &t, 20, "assembly_num_io_per_scan_chain")?)?;
    test.set_assembly_num_test_io_offset(parse_i64(path, &t, 21, "assembly_num_test_io_offset")?)?;
    test.set_assembly_test_failure_dist(field(path, &t, 22, "assembly_test_failure_dist")?)?;
    test.freeze()?;
    Ok(Some(test))
}

const LAYER_FIELDS: &[&str] = &[
    "tech",
    "name",
    "active",
    "cost_per_mm2",
    "transistor_density",
    "defect_density",
    "critical_area_ratio",
    "clustering_factor",
    "litho_percent",
    "mask_cost",
    "stitching_yield",
];

pub fn read_layers(path: impl AsRef<Path>) -> PersistenceResult<BTreeMap<TechNode, Layer>> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.is_empty() {
        return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: "expected a header line and at least one data line".into() });
    }
    expect_header(path, &lines[0], LAYER_FIELDS)?;

    let mut layers = BTreeMap::new();
    for line in &lines[1..] {
        let t: Vec<&str> = line.split_whitespace().collect();
        let tech_tok = field(path, &t, 0, "tech")?;
        let tech = TechNode::from_str(tech_tok)?;

        let mut layer = Layer::new();
        layer.set_name(field(path, &t, 1, "name")?)?;
        layer.set_active(parse_bool(path, &t, 2, "active")?)?;
        layer.set_cost_per_mm2(parse_f64(path, &t, 3, "cost_per_mm2")?)?;
        layer.set_transistor_density(parse_f64(path, &t, 4, "transistor_density")?)?;
        layer.set_defect_density(parse_f64(path, &t, 5, "defect_density")?)?;
        layer.set_critical_area_ratio(parse_f64(path, &t, 6, "critical_area_ratio")?)?;
        layer.set_clustering_factor(parse_f64(path, &t, 7, "clustering_factor")?)?;
        layer.set_litho_percent(parse_f64(path, &t, 8, "litho_percent")?)?;
        layer.set_mask_cost(parse_f64(path, &t, 9, "mask_cost")?)?;
        layer.set_stitching_yield(parse_f64(path, &t, 10, "stitching_yield")?)?;
        layer.freeze()?;
        layers.insert(tech, layer);
    }
    Ok(layers)
}

const IO_FIELDS: &[&str] =
    &["io_type", "rx_area", "tx_area", "shoreline", "bandwidth", "wire_count", "bidirectional", "energy_per_bit", "reach"];

pub fn read_ios(path: impl AsRef<Path>) -> PersistenceResult<BTreeMap<String, Io>> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.is_empty() {
        return Ok(BTreeMap::new());
    }
    expect_header(path, &lines[0], IO_FIELDS)?;

    let mut ios = BTreeMap::new();
    for line in &lines[1..] {
        let t: Vec<&str> = line.split_whitespace().collect();
        let io_type = field(path, &t, 0, "io_type")?.to_string();

        let mut io = Io::new();
        io.set_io_type(io_type.clone())?;
        io.set_rx_area(parse_f64(path, &t, 1, "rx_area")?)?;
        io.set_tx_area(parse_f64(path, &t, 2, "tx_area")?)?;
        io.set_shoreline(parse_f64(path, &t, 3, "shoreline")?)?;
        io.set_bandwidth(parse_f64(path, &t, 4, "bandwidth")?)?;
        io.set_wire_count(parse_f64(path, &t, 5, "wire_count")?)?;
        io.set_bidirectional(parse_bool(path, &t, 6, "bidirectional")?)?;
        io.set_energy_per_bit(parse_f64(path, &t, 7, "energy_per_bit")?)?;
        io.set_reach(parse_f64(path, &t, 8, "reach")?)?;
        io.freeze()?;
        ios.insert(io_type, io);
    }
    Ok(ios)
}

/// Reads the blocks file: one block per line, `name area power tech
/// is_memory`, whitespace-separated and header-free — the one format pinned
/// verbatim against the original evaluator's reader rather than invented.
pub fn read_blocks(path: impl AsRef<Path>) -> PersistenceResult<Vec<Block>> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    let mut blocks = Vec::with_capacity(lines.len());
    for line in &lines {
        let t: Vec<&str> = line.split_whitespace().collect();
        let name = field(path, &t, 0, "name")?;
        let area = parse_f64(path, &t, 1, "area")?;
        let power = parse_f64(path, &t, 2, "power")?;
        let tech = TechNode::from_str(field(path, &t, 3, "tech")?)?;
        let is_memory = parse_bool(path, &t, 4, "is_memory")?;
        blocks.push(Block::new(name, area, power, tech, is_memory)?);
    }
    Ok(blocks)
}

/// Reads the netlist file. Format (no precedent survives in the retrieved
/// original sources, so this one is newly designed): a `BLOCKS` line naming
/// every block in the order the blocks file defines them, followed by one
/// `IO <type>` section per IO type, each holding `i j count util` sparse
/// entries (indices into the `BLOCKS` line) terminated by `END`.
pub fn read_netlist(path: impl AsRef<Path>, block_names: &[String]) -> PersistenceResult<ConnectivityGraph> {
    let path = path.as_ref();
    let lines = read_lines(path)?;
    if lines.is_empty() {
        return Ok(ConnectivityGraph::new(block_names.to_vec()));
    }

    let header: Vec<&str> = lines[0].split_whitespace().collect();
    if header.first().copied() != Some("BLOCKS") {
        return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: "netlist file must start with a BLOCKS line".into() });
    }
    let declared: Vec<String> = header[1..].iter().map(|s| s.to_string()).collect();
    if declared != block_names {
        return Err(PersistenceError::Malformed {
            path: path.display().to_string(),
            reason: "BLOCKS line does not match the blocks file's names/order".into(),
        });
    }

    let n = block_names.len();
    let mut graph = ConnectivityGraph::new(block_names.to_vec());
    let mut i = 1;
    while i < lines.len() {
        let tokens: Vec<&str> = lines[i].split_whitespace().collect();
        if tokens.first().copied() != Some("IO") {
            return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: format!("expected an IO section, got `{}`", lines[i]) });
        }
        let io_type = field(path, &tokens, 1, "io_type")?.to_string();
        i += 1;

        let mut adjacency = Matrix::<i32>::zeroed(n);
        let mut utilization = Matrix::<f64>::zeroed(n);
        while i < lines.len() && lines[i] != "END" {
            let t: Vec<&str> = lines[i].split_whitespace().collect();
            let a = parse_i64(path, &t, 0, "i")? as usize;
            let b = parse_i64(path, &t, 1, "j")? as usize;
            let count = parse_i64(path, &t, 2, "count")? as i32;
            let util = parse_f64(path, &t, 3, "util")?;
            if a >= n || b >= n {
                return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: format!("block index out of range in `{}`", lines[i]) });
            }
            adjacency.set(a, b, count);
            utilization.set(a, b, util);
            i += 1;
        }
        if i >= lines.len() {
            return Err(PersistenceError::Malformed { path: path.display().to_string(), reason: format!("IO section `{io_type}` missing END") });
        }
        i += 1;

        graph.set_io_type(io_type, adjacency, utilization)?;
    }
    Ok(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("persistence-read-tests-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn wafer_round_trip() {
        let path = write_temp(
            "wafer.txt",
            "wafer_diameter edge_exclusion wafer_process_yield dicing_distance reticle_x reticle_y grid_fill nre_front_end_cost_per_mm2_memory nre_front_end_cost_per_mm2_logic nre_front_end_cost_per_mm2_analog nre_back_end_cost_per_mm2_memory nre_back_end_cost_per_mm2_logic nre_back_end_cost_per_mm2_analog\n300.0 3.0 0.95 0.1 26.0 33.0 false 0.0 0.0 0.0 0.0 0.0 0.0\n",
        );
        let wafer = read_wafer_process(&path).unwrap();
        assert_eq!(wafer.wafer_diameter(), Some(300.0));
        assert!(wafer.is_frozen());
    }

    #[test]
    fn blocks_parses_whitespace_separated_fields() {
        let path = write_temp("blocks.txt", "b0 1.0 0.5 7nm false\nb1 2.0 0.8 14nm true\n");
        let blocks = read_blocks(&path).unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].name, "b0");
        assert_eq!(blocks[1].tech, TechNode::N14);
        assert!(blocks[1].is_memory);
    }

    #[test]
    fn netlist_round_trip() {
        let names = vec!["b0".to_string(), "b1".to_string(), "b2".to_string()];
        let path = write_temp("netlist.txt", "BLOCKS b0 b1 b2\nIO d2d\n0 1 4 0.5\n1 2 2 0.9\nEND\n");
        let graph = read_netlist(&path, &names).unwrap();
        assert_eq!(graph.connections_between("d2d", &[0, 1, 2], 0, 1), 4);
    }

    #[test]
    fn netlist_rejects_mismatched_block_names() {
        let names = vec!["b0".to_string(), "b1".to_string()];
        let path = write_temp("netlist_bad.txt", "BLOCKS x0 x1\nEND\n");
        assert!(read_netlist(&path, &names).is_err());
    }

    #[test]
    fn test_process_file_empty_is_none() {
        let path = write_temp("test_empty.txt", "\n");
        assert!(read_test_process(&path).unwrap().is_none());
    }
}

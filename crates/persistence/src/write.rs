//! Text-file writers for per-run outputs (C9, §6.2).

use crate::error::PersistenceResult;
use sim_core::tech::TechNode;
use std::path::Path;

fn num_partitions(partition_ids: &[usize]) -> usize {
    partition_ids.iter().copied().max().map(|m| m + 1).unwrap_or(0)
}

/// Writes `<prefix>.parts.<K>`: one partition ID per vertex, one per line.
pub fn write_parts(prefix: &str, partition_ids: &[usize]) -> PersistenceResult<()> {
    let k = num_partitions(partition_ids);
    let path = format!("{prefix}.parts.{k}");
    let body: String = partition_ids.iter().map(|p| format!("{p}\n")).collect();
    std::fs::write(path, body)?;
    Ok(())
}

/// Writes `<prefix>.techs.<K>`: one tech tag per partition, in partition-ID order.
pub fn write_techs(prefix: &str, tech_per_partition: &[TechNode]) -> PersistenceResult<()> {
    let k = tech_per_partition.len();
    let path = format!("{prefix}.techs.{k}");
    let body: String = tech_per_partition.iter().map(|t| format!("{t}\n")).collect();
    std::fs::write(path, body)?;
    Ok(())
}

/// Builds the `<prefix>.summary.txt` contents per §6.2's field list.
pub fn summary_text(partition_ids: &[usize], tech_per_partition: &[TechNode], cost: f64, valid: bool) -> String {
    let k = num_partitions(partition_ids);
    let mut counts = vec![0usize; k];
    for &p in partition_ids {
        counts[p] += 1;
    }
    let total = partition_ids.len().max(1) as f64;

    let mut out = String::new();
    out.push_str(&format!("Number of Partitions: {k}\n"));
    out.push_str(&format!("Cost: {cost}\n"));
    out.push_str(&format!("Valid: {}\n", if valid { "Yes" } else { "No" }));
    out.push_str("Technology Assignment:\n");
    for (p, tech) in tech_per_partition.iter().enumerate().take(k) {
        out.push_str(&format!("    Partition {p}: {tech}\n"));
    }
    out.push_str("Partition Statistics:\n");
    for (p, &count) in counts.iter().enumerate() {
        let pct = 100.0 * count as f64 / total;
        out.push_str(&format!("    Partition {p}: {count} vertices ({pct:.1}%)\n"));
    }
    out
}

/// Writes `<prefix>.summary.txt` and returns its contents, so the caller can
/// also print them to stdout per the CLI's user-visible-behavior contract.
pub fn write_summary(prefix: &str, partition_ids: &[usize], tech_per_partition: &[TechNode], cost: f64, valid: bool) -> PersistenceResult<String> {
    let text = summary_text(partition_ids, tech_per_partition, cost, valid);
    std::fs::write(Path::new(&format!("{prefix}.summary.txt")), &text)?;
    Ok(text)
}

/// Writes all three §6.2 output files and returns the summary text.
pub fn write_outputs(prefix: &str, partition_ids: &[usize], tech_per_partition: &[TechNode], cost: f64, valid: bool) -> PersistenceResult<String> {
    write_parts(prefix, partition_ids)?;
    write_techs(prefix, tech_per_partition)?;
    write_summary(prefix, partition_ids, tech_per_partition, cost, valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_prefix(name: &str) -> String {
        let dir = std::env::temp_dir().join(format!("persistence-write-tests-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir.join(name).display().to_string()
    }

    #[test]
    fn parts_file_has_one_line_per_vertex() {
        let prefix = temp_prefix("run1");
        write_parts(&prefix, &[0, 1, 0, 1]).unwrap();
        let body = std::fs::read_to_string(format!("{prefix}.parts.2")).unwrap();
        assert_eq!(body.lines().count(), 4);
    }

    #[test]
    fn summary_reports_partition_percentages() {
        let text = summary_text(&[0, 0, 1], &[TechNode::N7, TechNode::N14], 123.5, true);
        assert!(text.contains("Number of Partitions: 2"));
        assert!(text.contains("Cost: 123.5"));
        assert!(text.contains("Valid: Yes"));
        assert!(text.contains("Partition 0: 2 vertices (66.7%)"));
        assert!(text.contains("Partition 1: 1 vertices (33.3%)"));
    }

    #[test]
    fn write_outputs_round_trips_all_three_files() {
        let prefix = temp_prefix("run2");
        let text = write_outputs(&prefix, &[0, 1], &[TechNode::N7, TechNode::N14], 1.0, true).unwrap();
        assert!(std::path::Path::new(&format!("{prefix}.parts.2")).exists());
        assert!(std::path::Path::new(&format!("{prefix}.techs.2")).exists());
        let on_disk = std::fs::read_to_string(format!("{prefix}.summary.txt")).unwrap();
        assert_eq!(on_disk, text);
    }
}

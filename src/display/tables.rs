//! Table formatting for search results and index summaries.

use comfy_table::{
    Attribute, Cell, CellAlignment, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL,
};

use crate::catalog::CandidateCatalog;
use crate::snapshot::IndexSnapshot;
use crate::vector::{BuildReport, SearchHit};

/// Longest profile excerpt shown in a results table.
const EXCERPT_CHARS: usize = 60;

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.apply_modifier(UTF8_ROUND_CORNERS);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    table
}

fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

/// Ranked hits with the matching profile excerpt from `catalog`.
pub fn create_hits_table(hits: &[SearchHit], catalog: &CandidateCatalog) -> String {
    let mut table = new_table(&["#", "Candidate", "Score", "Profile"]);

    for (rank, hit) in hits.iter().enumerate() {
        let profile = catalog
            .get(hit.row)
            .map(|record| excerpt(&record.profile_text))
            .unwrap_or_default();
        // Scores are cosine similarities; highlight strong matches
        let color = if hit.score >= 0.8 {
            Color::Green
        } else if hit.score >= 0.5 {
            Color::Yellow
        } else {
            Color::Reset
        };

        table.add_row(vec![
            Cell::new(rank + 1).set_alignment(CellAlignment::Right),
            Cell::new(hit.id.as_str()),
            Cell::new(format!("{:.4}", hit.score))
                .fg(color)
                .set_alignment(CellAlignment::Right),
            Cell::new(profile),
        ]);
    }

    table.to_string()
}

/// Summary of a finished build.
pub fn create_build_table(report: &BuildReport) -> String {
    let mut table = new_table(&["Metric", "Value"]);

    table.add_row(vec!["Rows", &report.rows.to_string()]);
    table.add_row(vec!["Dimension", &report.dimension.to_string()]);
    table.add_row(vec![
        "Zero-norm rows",
        &report.degenerate_rows.len().to_string(),
    ]);
    table.add_row(vec!["Index", &report.index_path.display().to_string()]);
    if let Some(path) = &report.embeddings_path {
        table.add_row(vec!["Embeddings", &path.display().to_string()]);
    }

    table.to_string()
}

/// Summary of a loaded snapshot and its manifest.
pub fn create_snapshot_table(snapshot: &IndexSnapshot) -> String {
    let mut table = new_table(&["Metric", "Value"]);

    table.add_row(vec!["Rows", &snapshot.store().row_count().to_string()]);
    table.add_row(vec![
        "Dimension",
        &snapshot.store().dimension().get().to_string(),
    ]);
    table.add_row(vec!["Metric", &snapshot.store().metric().to_string()]);

    match snapshot.manifest() {
        Some(manifest) => {
            table.add_row(vec![
                "Model",
                manifest.model_name.as_deref().unwrap_or("unknown"),
            ]);
            let built = chrono::DateTime::from_timestamp(manifest.created_at, 0)
                .map(|t| t.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(|| manifest.created_at.to_string());
            table.add_row(vec!["Built", &built]);
        }
        None => {
            table.add_row(vec![
                Cell::new("Manifest"),
                Cell::new("missing").fg(Color::Yellow),
            ]);
        }
    }

    table.to_string()
}

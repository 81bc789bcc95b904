use std::fmt::Write;

use ktcalc::prelude::*;
use ktcalc::statistics::comparison::{ComparisonRow, SaveComparison};
use unicode_width::UnicodeWidthStr;

/// Lays out rows as a left-aligned text table. Widths are measured in
/// terminal columns so the verdict arrows and the delta sign line up.
fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.width()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            if i < widths.len() {
                widths[i] = widths[i].max(cell.width());
            }
        }
    }

    let mut out = String::new();
    let header_row: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    for row in std::iter::once(&header_row).chain(rows.iter()) {
        for (i, cell) in row.iter().enumerate() {
            let width = widths.get(i).copied().unwrap_or(0);
            out.push_str(cell);
            out.push_str(&" ".repeat(width.saturating_sub(cell.width()) + 2));
        }
        out.truncate(out.trim_end().len());
        out.push('\n');
    }
    out
}

fn marker(verdict: Verdict) -> &'static str {
    match verdict {
        Verdict::Better => "▲",
        Verdict::Worse => "▼",
        Verdict::Equal => "＝",
    }
}

fn signed(value: f64, precision: usize) -> String {
    let sign = if value > 0.0 { "+" } else { "" };
    format!("{sign}{value:.precision$}")
}

fn percent(value: f64) -> String {
    format!("{:.0}%", value * 100.0)
}

fn average_row(save: &SaveComparison) -> Vec<String> {
    let ComparisonRow {
        s1,
        s2,
        difference,
        verdict,
    } = save.average_damage;
    vec![
        format!("{}+", save.save),
        format!("{s1:.2} {}", marker(verdict)),
        format!("{s2:.2} {}", marker(verdict.flip())),
        signed(difference, 2),
    ]
}

fn kill_rows(save: &SaveComparison) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = save
        .kill_chances
        .iter()
        .map(|row| {
            let chance = row.chance;
            vec![
                row.wounds.to_string(),
                format!("{} {}", percent(chance.s1), marker(chance.verdict)),
                format!("{} {}", percent(chance.s2), marker(chance.verdict.flip())),
                signed(chance.difference * 100.0, 0) + "%",
            ]
        })
        .collect();
    if let Some(zero_from) = save.zero_from {
        rows.push(vec![format!("{zero_from}+"), "0%".into(), "0%".into(), String::new()]);
    }
    rows
}

/// Renders every table of a comparison for a terminal.
pub fn comparison(comparison: &ScenarioComparison) -> String {
    let mut out = String::new();

    let averages: Vec<Vec<String>> = comparison.saves.iter().map(average_row).collect();
    let _ = writeln!(out, "Average damage");
    out.push_str(&table(&["Sv", "S1 Avg", "S2 Avg", "Δ"], &averages));

    let combined: Vec<Vec<String>> = comparison
        .saves
        .iter()
        .map(|save| {
            vec![
                format!("{}+", save.save),
                format!("{:.2}", save.combined.average_damage),
                percent(save.combined.kill_chance),
            ]
        })
        .collect();
    let _ = writeln!(out, "\nS1 & S2 combined (W={})", comparison.combo_wounds);
    out.push_str(&table(&["Sv", "Avg", "Kill%"], &combined));

    let _ = writeln!(out, "\nKill chance (W: 1-{})", comparison.max_wounds);
    for save in &comparison.saves {
        let _ = writeln!(out, "\nSv {}+", save.save);
        out.push_str(&table(&["W", "S1", "S2", "Δ"], &kill_rows(save)));
    }
    out
}

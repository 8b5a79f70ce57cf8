//! Fixed-layout statistics table for one output.

use crate::consts::TABLE_PERCENTILES;
use crate::errors::ContractBreach;
use crate::helpers::format_stat;
use crate::types::OutputStats;

/// One table row. A missing percentile fails only its own row.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsRow {
    pub label: String,
    pub value: Result<String, ContractBreach>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatsTable {
    pub rows: Vec<StatsRow>,
}

impl StatsTable {
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.label.as_str())
    }

    pub fn failed_rows(&self) -> impl Iterator<Item = &StatsRow> {
        self.rows.iter().filter(|r| r.value.is_err())
    }
}

/// Build the 13-row table: five summary rows, then eight percentiles in
/// ascending order, every value to four decimals.
pub fn stats_table(output: &str, stats: &OutputStats) -> StatsTable {
    let summary = [
        ("Mean", stats.mean),
        ("Median", stats.median),
        ("Standard Deviation", stats.std),
        ("Minimum", stats.min),
        ("Maximum", stats.max),
    ];

    let mut rows: Vec<StatsRow> = summary
        .into_iter()
        .map(|(label, value)| StatsRow {
            label: label.to_string(),
            value: Ok(format_stat(value)),
        })
        .collect();

    for label in TABLE_PERCENTILES {
        let value = stats
            .percentiles
            .get(label)
            .map(|&v| format_stat(v))
            .ok_or_else(|| ContractBreach::MissingPercentile {
                output: output.to_string(),
                label: label.to_string(),
            });
        rows.push(StatsRow {
            label: format!("{label} Percentile"),
            value,
        });
    }

    StatsTable { rows }
}

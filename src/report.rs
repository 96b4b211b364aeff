use anyhow::{Context, Result};
use serde::Serialize;

use crate::tracker::{AggregateResult, SlotResult};

/// What to print for a successful batch
#[derive(Debug, Clone, Copy, Default)]
pub struct ReportOptions {
    /// Only print per-slot counts
    pub count_only: bool,
    /// Append the total across slots
    pub print_total: bool,
}

/// Plain-text report, one header line per slot followed by its locations
pub fn render_text(result: &AggregateResult, options: ReportOptions) -> String {
    let mut out = String::new();

    for slot in result.iter() {
        out.push_str(&format!(
            "{} unchecked locations for '{}'\n",
            slot.items.len(),
            slot.slot
        ));
        if !options.count_only {
            for location in &slot.items {
                out.push_str(&format!("\t{}\n", location));
            }
        }
    }

    if options.print_total {
        out.push_str(&format!("{} total unchecked locations\n", result.total()));
    }

    out
}

#[derive(Serialize)]
struct JsonSlot<'a> {
    slot: &'a str,
    count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    locations: Option<&'a [String]>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    slots: Vec<JsonSlot<'a>>,
    total: usize,
}

fn json_slot(slot: &SlotResult, options: ReportOptions) -> JsonSlot<'_> {
    JsonSlot {
        slot: &slot.slot,
        count: slot.items.len(),
        locations: (!options.count_only).then_some(slot.items.as_slice()),
    }
}

/// JSON report. `count_only` drops the location lists.
pub fn render_json(result: &AggregateResult, options: ReportOptions) -> Result<String> {
    let report = JsonReport {
        slots: result
            .iter()
            .map(|slot| json_slot(slot, options))
            .collect(),
        total: result.total(),
    };

    serde_json::to_string_pretty(&report).context("Failed to serialize report")
}

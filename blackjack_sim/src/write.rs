use crate::SimulationSummary;
use std::io::{self, Write};

const WIDTH: usize = 80;

fn format_summary(id: usize, summary: &SimulationSummary) -> String {
    let sim_num = format!("simulation #{}", id);
    let header = format!("{:-^WIDTH$}\n", sim_num);
    format!("{}{}{}\n", header, summary, "-".repeat(WIDTH))
}

/// Writes each summary under a numbered header, in the order given.
pub fn write_summaries<W: Write>(summaries: &[SimulationSummary], mut writer: W) -> io::Result<()> {
    for (i, summary) in summaries.iter().enumerate() {
        writer.write_all(format_summary(i + 1, summary).as_bytes())?;
    }
    writer.flush()
}

/// Renders the summaries as a pretty printed JSON array.
pub fn summaries_to_json(summaries: &[SimulationSummary]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summaries)
}

//! Progress accounting against prescanned totals.
//!
//! Totals are fixed once by a prescan traversal; the pipeline then bumps
//! running counts as hashes complete and pushes a rendered line to a
//! [`Meter`]. Rendering a terminal meter is external; this module only
//! formats the line.

use crate::errors::TreeError;
use crate::node::needs_hash;
use crate::stream::NodeSource;

/// Receiver for rendered progress lines.
///
/// Implementations own redraw pacing and terminal handling; the pipeline
/// calls `update` once per completed file and once at the end.
pub trait Meter {
    fn update(&mut self, line: &str);
}

/// Meter that discards every update.
#[derive(Debug, Default)]
pub struct NullMeter;

impl Meter for NullMeter {
    fn update(&mut self, _line: &str) {}
}

impl Meter for Vec<String> {
    fn update(&mut self, line: &str) {
        self.push(line.to_string());
    }
}

/// Running counts against fixed totals.
///
/// # Invariants
/// - `files <= total_files` and `octets <= total_octets`.
/// - Both counters are monotonically non-decreasing.
#[derive(Clone, Copy, Debug, Default)]
pub struct Progress {
    files: u64,
    total_files: u64,
    octets: u64,
    total_octets: u64,
}

impl Progress {
    /// Fixes totals by walking `source` once, counting every node that
    /// needs a hash and summing its `size` attribute.
    pub fn prescan<S: NodeSource>(source: &mut S) -> Result<Self, TreeError> {
        let mut total_files = 0u64;
        let mut total_octets = 0u64;
        while let Some(node) = source.next_node()? {
            if needs_hash(&node) {
                total_files += 1;
                total_octets = total_octets.saturating_add(node.size());
            }
        }
        Ok(Self {
            files: 0,
            total_files,
            octets: 0,
            total_octets,
        })
    }

    /// Totals fixed at prescan: `(files, octets)`.
    pub fn totals(&self) -> (u64, u64) {
        (self.total_files, self.total_octets)
    }

    /// Running counts: `(files, octets)`.
    pub fn counts(&self) -> (u64, u64) {
        (self.files, self.octets)
    }

    /// Records one hashed file of `size` bytes and redraws the meter.
    pub fn update(&mut self, size: u64, meter: &mut dyn Meter) {
        self.files += 1;
        self.octets = self.octets.saturating_add(size);

        assert!(self.files <= self.total_files, "file count exceeded prescan total");
        assert!(self.octets <= self.total_octets, "octet count exceeded prescan total");

        meter.update(&self.render());
    }

    /// Emits a final meter line with the counts reached.
    pub fn done(&self, meter: &mut dyn Meter) {
        meter.update(&self.render());
    }

    fn render(&self) -> String {
        format!(
            "  {}/{} ({:5.1}%) files, {}/{} ({:5.1}%) bytes",
            self.files,
            self.total_files,
            pct(self.files, self.total_files),
            humanize(self.octets),
            humanize(self.total_octets),
            pct(self.octets, self.total_octets),
        )
    }
}

fn pct(part: u64, total: u64) -> f64 {
    if total == 0 {
        return 100.0;
    }
    100.0 * part as f64 / total as f64
}

/// Formats a byte count with binary-prefix suffixes at three significant
/// digits.
pub fn humanize(octets: u64) -> String {
    const UNITS: [&str; 6] = ["B", "KiB", "MiB", "GiB", "TiB", "PiB"];

    let mut value = octets as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        return format!("{octets} B");
    }
    let precision = if value >= 100.0 {
        0
    } else if value >= 10.0 {
        1
    } else {
        2
    };
    format!("{value:.precision$} {}", UNITS[unit])
}

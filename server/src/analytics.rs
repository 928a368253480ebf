//! Optional append-only CSV sink for combat and movement telemetry.
//!
//! One row per considered attack target (distance vs hit outcome) and one
//! per movement attempt. Purely a side channel: every write error is logged
//! and swallowed, the game state never depends on it.

use crate::utils::now_ms;
use crate::world::{AttackSample, MoveSample};
use log::{info, warn};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER: &str = "row,ts,actor,target,distance,hit,x,y,accepted";

pub struct AnalyticsSink {
    writer: Option<BufWriter<File>>,
}

impl AnalyticsSink {
    pub fn disabled() -> Self {
        Self { writer: None }
    }

    /// Opens (or creates) the CSV file in append mode. The header is written
    /// only for a fresh file.
    pub fn to_file(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let fresh = file.metadata()?.len() == 0;
        let mut writer = BufWriter::new(file);
        if fresh {
            writeln!(writer, "{}", HEADER)?;
        }
        info!("Analytics log at {}", path.display());
        Ok(Self {
            writer: Some(writer),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.writer.is_some()
    }

    pub fn record_attack(&mut self, sample: &AttackSample) {
        self.write_row(format!(
            "attack,{},{},{},{:.1},{},,,",
            now_ms(),
            sample.attacker,
            sample.target,
            sample.distance,
            sample.hit
        ));
    }

    pub fn record_move(&mut self, sample: &MoveSample) {
        self.write_row(format!(
            "move,{},{},,,,{:.1},{:.1},{}",
            now_ms(),
            sample.player,
            sample.x,
            sample.y,
            sample.accepted
        ));
    }

    fn write_row(&mut self, row: String) {
        let Some(writer) = self.writer.as_mut() else {
            return;
        };
        if writeln!(writer, "{}", row).and_then(|_| writer.flush()).is_err() {
            warn!("Failed to append analytics row, disabling sink");
            self.writer = None;
        }
    }
}

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context};
use serde::Serialize;

use crate::session::TrackId;

/// Summary key reserved for frames with no detection data at all.
pub const EMPTY_FRAMES_KEY: &str = "empty_frames";

/// An object whose class label changed between sightings.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TypeMismatch {
    pub track_id: TrackId,
    pub previous_object_type: String,
    pub new_object_type: String,
}

/// Perception anomalies, split into per-frame raw entries and aggregate
/// counts.
///
/// `raw` holds at most one entry per frame: `None` for a frame missing
/// from the detection stream, otherwise the last mismatch found in that
/// frame. `summary` counts every mismatch under its transition key
/// (`"<prev>_2_<new>"`, lowercased) plus the reserved
/// [`EMPTY_FRAMES_KEY`] counter, so it can exceed what `raw` shows.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PerceptionReport {
    pub raw: BTreeMap<usize, Option<TypeMismatch>>,
    pub summary: BTreeMap<String, u64>,
}

impl PerceptionReport {
    /// Record a frame that carried no detection data.
    pub fn record_empty_frame(&mut self, frame: usize) {
        self.raw.insert(frame, None);
        *self.summary.entry(EMPTY_FRAMES_KEY.to_string()).or_insert(0) += 1;
    }

    /// Record a class-label mismatch. The raw entry for the frame is
    /// overwritten, the summary counter always increments.
    pub fn record_mismatch(&mut self, frame: usize, mismatch: TypeMismatch) {
        let key = format!(
            "{}_2_{}",
            mismatch.previous_object_type.to_lowercase(),
            mismatch.new_object_type.to_lowercase()
        );
        *self.summary.entry(key).or_insert(0) += 1;
        self.raw.insert(frame, Some(mismatch));
    }

    /// Number of frames whose raw entry is a mismatch (not a gap).
    pub fn mismatch_frames(&self) -> usize {
        self.raw.values().filter(|v| v.is_some()).count()
    }

    /// Number of frames recorded as empty.
    pub fn empty_frames(&self) -> u64 {
        self.summary.get(EMPTY_FRAMES_KEY).copied().unwrap_or(0)
    }
}

/// All anomalies found in one analysis pass. Accumulates monotonically
/// and is written out once at the end of the run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AnomalyReport {
    /// Frame index -> dead-reckoning deviation in metres, 2 decimals.
    /// Only frames over the threshold appear here.
    pub localisation: BTreeMap<usize, f64>,
    pub perception: PerceptionReport,
}

impl AnomalyReport {
    /// Write the report as JSON. The parent directory must already exist;
    /// callers are expected to have verified that before the analysis ran.
    pub fn save(&self, path: &Path, pretty: bool) -> anyhow::Result<()> {
        let file = File::create(path)
            .with_context(|| format!("Cannot create report file {}", path.display()))?;
        let writer = BufWriter::new(file);
        if pretty {
            serde_json::to_writer_pretty(writer, self)?;
        } else {
            serde_json::to_writer(writer, self)?;
        }
        Ok(())
    }
}

/// Setup check: the directory the report will be written into must exist
/// before any analysis starts.
pub fn check_output_dir(output_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = output_file.parent() {
        if !parent.as_os_str().is_empty() && !parent.is_dir() {
            bail!("Directory {} does not exist", parent.display());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_frame_accounting() {
        let mut report = PerceptionReport::default();
        report.record_empty_frame(3);
        report.record_empty_frame(7);

        assert_eq!(report.raw.get(&3), Some(&None));
        assert_eq!(report.raw.get(&7), Some(&None));
        assert_eq!(report.empty_frames(), 2);
    }

    #[test]
    fn test_mismatch_overwrites_raw_but_counts_both() {
        let mut report = PerceptionReport::default();
        report.record_mismatch(
            1,
            TypeMismatch {
                track_id: 1,
                previous_object_type: "car".to_string(),
                new_object_type: "truck".to_string(),
            },
        );
        report.record_mismatch(
            1,
            TypeMismatch {
                track_id: 2,
                previous_object_type: "truck".to_string(),
                new_object_type: "car".to_string(),
            },
        );

        // Last mismatch wins the raw slot
        let raw = report.raw.get(&1).unwrap().as_ref().unwrap();
        assert_eq!(raw.track_id, 2);
        // But both transitions are counted
        assert_eq!(report.summary.get("car_2_truck"), Some(&1));
        assert_eq!(report.summary.get("truck_2_car"), Some(&1));
        assert_eq!(report.mismatch_frames(), 1);
    }

    #[test]
    fn test_json_shape() {
        let mut report = AnomalyReport::default();
        report.localisation.insert(1, 4.0);
        report.perception.record_empty_frame(2);
        report.perception.record_mismatch(
            1,
            TypeMismatch {
                track_id: 1,
                previous_object_type: "car".to_string(),
                new_object_type: "truck".to_string(),
            },
        );

        let value = serde_json::to_value(&report).unwrap();
        // Integer map keys serialize as strings
        assert_eq!(value["localisation"]["1"], 4.0);
        assert!(value["perception"]["raw"]["2"].is_null());
        assert_eq!(value["perception"]["raw"]["1"]["track_id"], 1);
        assert_eq!(value["perception"]["summary"]["car_2_truck"], 1);
        assert_eq!(value["perception"]["summary"]["empty_frames"], 1);
    }

    #[test]
    fn test_save_report() {
        let path = std::env::temp_dir().join("drive_analyzer_report_save_test.json");
        let report = AnomalyReport::default();
        report.save(&path, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("localisation"));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_check_output_dir_missing() {
        let result = check_output_dir(Path::new("/nonexistent_dir_for_sure/out.json"));
        assert!(result.is_err());
    }
}

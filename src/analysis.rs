use log::info;

use crate::localisation::LocalisationDetector;
use crate::perception::PerceptionTracker;
use crate::report::AnomalyReport;
use crate::session::SessionLog;

/// Tuning knobs for one analysis pass. Defaults match the reference
/// analyzer.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Maximum allowed distance in metres between the dead-reckoned and
    /// recorded ego position.
    pub localisation_max_diff: f64,
    /// Frames a track id may stay undetected before being dropped.
    pub del_track_id_after_missed_frames: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            localisation_max_diff: 3.0,
            del_track_id_after_missed_frames: 0,
        }
    }
}

/// Drives both detectors over the session in a single sequential pass
/// and owns the accumulating report.
pub struct Analysis {
    log: SessionLog,
    localisation: LocalisationDetector,
    perception: PerceptionTracker,
    report: AnomalyReport,
}

impl Analysis {
    pub fn new(log: SessionLog, config: AnalysisConfig) -> Self {
        Self {
            log,
            localisation: LocalisationDetector::new(config.localisation_max_diff),
            perception: PerceptionTracker::new(config.del_track_id_after_missed_frames),
            report: AnomalyReport::default(),
        }
    }

    /// Run the full pass and return the finished report.
    ///
    /// The loop counter runs over `1..max(N_loc, N_obs)`. Localisation is
    /// checked on the transition `(i-1) -> i`. Perception is evaluated at
    /// `i - 1` so frame 0 seeds the tracked-object table on the first
    /// iteration; as a consequence the final perception frame is never
    /// visited. That boundary matches the reference analyzer and is kept
    /// deliberately.
    pub fn run(mut self) -> AnomalyReport {
        let n_loc = self.log.localisation_frames();
        let n_obs = self.log.perception_frames();
        let total = n_loc.max(n_obs);

        for i in 1..total {
            if i < n_loc {
                if let Some(deviation) =
                    self.localisation.check(&self.log.ego, self.log.fps, i, i - 1)
                {
                    self.report.localisation.insert(i, deviation);
                }
            }
            if i < n_obs {
                self.perception
                    .check(i - 1, &self.log.obs, &mut self.report.perception);
            }
        }

        info!(
            "Analysis pass complete: {} localisation anomalies, {} mismatch frames, {} empty frames",
            self.report.localisation.len(),
            self.report.perception.mismatch_frames(),
            self.report.perception.empty_frames()
        );
        self.report
    }
}

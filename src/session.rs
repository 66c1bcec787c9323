use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{bail, Context};
use flate2::read::GzDecoder;
use serde::Deserialize;

/// Stable identifier assigned by the upstream tracking system.
/// Not required to be unique across frames.
pub type TrackId = i64;

/// Ego localisation series, one entry per frame.
/// All vectors are parallel: `x[t]`, `y[t]`, `speed[t]`, `yaw[t]`
/// describe the vehicle at frame `t`.
#[derive(Debug, Clone, Deserialize)]
pub struct EgoTrajectory {
    /// Position east, metres
    pub x: Vec<f64>,
    /// Position north, metres
    pub y: Vec<f64>,
    /// Ground speed, m/s
    pub speed: Vec<f64>,
    /// Heading, radians
    pub yaw: Vec<f64>,
    /// Scene identifier column carried through from the recorder
    pub scene_id: Vec<i64>,
}

/// Detections reported in one frame. `scene_id[i]` and `object_types[i]`
/// describe the same detection.
#[derive(Debug, Clone, Deserialize)]
pub struct SceneDetections {
    pub scene_id: Vec<TrackId>,
    #[serde(rename = "type")]
    pub object_types: Vec<String>,
}

/// A fully loaded recording session. Immutable after load.
///
/// Frames absent from `obs` mean "no detections recorded this frame",
/// which downstream analysis treats as a data gap, not an error.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionLog {
    /// Sampling rate of the recording, frames per second
    pub fps: f64,
    pub ego: EgoTrajectory,
    pub obs: BTreeMap<usize, SceneDetections>,
}

impl SessionLog {
    /// Load a session log from a `.json` or `.json.gz` file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("The path {} does not exist or cannot be read", path.display()))?;
        let log: SessionLog = if path.extension().map(|e| e == "gz").unwrap_or(false) {
            let gz = GzDecoder::new(file);
            let reader = BufReader::new(gz);
            serde_json::from_reader(reader)
                .with_context(|| format!("Malformed session log {}", path.display()))?
        } else {
            let reader = BufReader::new(file);
            serde_json::from_reader(reader)
                .with_context(|| format!("Malformed session log {}", path.display()))?
        };
        log.validate()?;
        Ok(log)
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.fps <= 0.0 {
            bail!("fps must be > 0, got {}", self.fps);
        }
        let n = self.ego.scene_id.len();
        if self.ego.x.len() != n
            || self.ego.y.len() != n
            || self.ego.speed.len() != n
            || self.ego.yaw.len() != n
        {
            bail!("ego series are not parallel (scene_id has {} entries)", n);
        }
        for (frame, scene) in &self.obs {
            if scene.scene_id.len() != scene.object_types.len() {
                bail!(
                    "frame {}: {} track ids but {} object types",
                    frame,
                    scene.scene_id.len(),
                    scene.object_types.len()
                );
            }
        }
        Ok(())
    }

    /// Number of localisation frames in the session.
    pub fn localisation_frames(&self) -> usize {
        self.ego.scene_id.len()
    }

    /// Number of perception entries in the session. Counts map entries,
    /// so sparse frame keys are not included.
    pub fn perception_frames(&self) -> usize {
        self.obs.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn sample_json() -> &'static str {
        r#"{
            "fps": 10.0,
            "ego": {
                "x": [0.0, 1.0],
                "y": [0.0, 0.0],
                "speed": [10.0, 10.0],
                "yaw": [0.0, 0.0],
                "scene_id": [0, 1]
            },
            "obs": {
                "0": {"scene_id": [1, 2], "type": ["car", "truck"]}
            }
        }"#
    }

    #[test]
    fn test_parse_session() {
        let log: SessionLog = serde_json::from_str(sample_json()).unwrap();
        assert_eq!(log.localisation_frames(), 2);
        assert_eq!(log.perception_frames(), 1);
        let scene = log.obs.get(&0).unwrap();
        assert_eq!(scene.scene_id, vec![1, 2]);
        assert_eq!(scene.object_types, vec!["car", "truck"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = SessionLog::load(Path::new("/nonexistent/session.json"));
        assert!(result.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join("drive_analyzer_session_load_test.json");
        let mut f = File::create(&path).unwrap();
        f.write_all(sample_json().as_bytes()).unwrap();
        drop(f);

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.fps, 10.0);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let path = std::env::temp_dir().join("drive_analyzer_session_load_test.json.gz");
        let f = File::create(&path).unwrap();
        let mut gz = GzEncoder::new(f, Compression::default());
        gz.write_all(sample_json().as_bytes()).unwrap();
        gz.finish().unwrap();

        let log = SessionLog::load(&path).unwrap();
        assert_eq!(log.perception_frames(), 1);
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_rejects_non_positive_fps() {
        let json = sample_json().replace("\"fps\": 10.0", "\"fps\": 0.0");
        let log: SessionLog = serde_json::from_str(&json).unwrap();
        assert!(log.validate().is_err());
    }

    #[test]
    fn test_rejects_unbalanced_scene() {
        let json = sample_json().replace("[\"car\", \"truck\"]", "[\"car\"]");
        let log: SessionLog = serde_json::from_str(&json).unwrap();
        assert!(log.validate().is_err());
    }
}

use crate::session::EgoTrajectory;

/// Flags physically implausible jumps in the ego localisation trajectory.
///
/// The expected position at frame `t` is dead-reckoned from the state at
/// `t - 1`: since `distance = speed * time`, the movement along each axis
/// over one sample interval is `speed * cos(yaw) / fps` and
/// `speed * sin(yaw) / fps`. A recorded position further than `max_diff`
/// metres from that prediction is an anomaly.
///
/// Purely functional between calls; the detector keeps no state.
pub struct LocalisationDetector {
    /// Maximum tolerated deviation between predicted and recorded
    /// position, metres.
    pub max_diff: f64,
}

impl LocalisationDetector {
    pub fn new(max_diff: f64) -> Self {
        Self { max_diff }
    }

    /// Euclidean distance between the dead-reckoned and the recorded
    /// position at `frame`, predicting from `prev_frame`.
    ///
    /// Both indices must be valid for the trajectory; the caller
    /// guarantees `frame = prev_frame + 1` semantics.
    pub fn deviation(&self, ego: &EgoTrajectory, fps: f64, frame: usize, prev_frame: usize) -> f64 {
        let prev_x = ego.x[prev_frame];
        let prev_y = ego.y[prev_frame];
        let prev_speed = ego.speed[prev_frame];
        let prev_yaw = ego.yaw[prev_frame];

        // Constant-velocity, constant-heading prediction over one interval
        let expected_x = prev_x + prev_speed * prev_yaw.cos() * (1.0 / fps);
        let expected_y = prev_y + prev_speed * prev_yaw.sin() * (1.0 / fps);

        let diff_x = ego.x[frame] - expected_x;
        let diff_y = ego.y[frame] - expected_y;
        (diff_x * diff_x + diff_y * diff_y).sqrt()
    }

    /// Check one frame transition. Returns the deviation rounded to two
    /// decimals when it strictly exceeds the threshold, `None` otherwise.
    pub fn check(&self, ego: &EgoTrajectory, fps: f64, frame: usize, prev_frame: usize) -> Option<f64> {
        let deviation = self.deviation(ego, fps, frame, prev_frame);
        if deviation > self.max_diff {
            Some(round2(deviation))
        } else {
            None
        }
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

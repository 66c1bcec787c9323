use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};

use crate::report::{PerceptionReport, TypeMismatch};
use crate::session::{SceneDetections, TrackId};

/// Sentinel class emitted by the detector for low-confidence readings,
/// typically objects at range. Transitions into or out of this label are
/// never anomalies.
pub const UNKNOWN_LABEL: &str = "UNKNOWN";

/// Bookkeeping for one currently-tracked identifier.
#[derive(Debug, Clone)]
pub struct TrackedObject {
    /// Class label learned on first sighting. Kept as the baseline for
    /// all later consistency checks, even after a mismatch is flagged.
    pub object_type: String,
    /// Consecutive frames this identifier has gone undetected.
    pub undetected_frame_count: u32,
}

/// Checks that the class label of each tracked object stays consistent
/// across frames.
///
/// Maintains a table of currently-tracked identifiers. An identifier
/// missing from a frame is aged rather than dropped immediately, so
/// tracking survives short occlusions; once the undetected streak exceeds
/// the grace threshold the identifier is considered lost and its entry is
/// deleted. Frames must be processed in strictly increasing order
/// starting at 0.
pub struct PerceptionTracker {
    tracked: HashMap<TrackId, TrackedObject>,
    /// Frames an identifier may go undetected before its entry is
    /// deleted. 0 means deletion on the first missed frame.
    del_after_missed_frames: u32,
}

impl PerceptionTracker {
    pub fn new(del_after_missed_frames: u32) -> Self {
        Self {
            tracked: HashMap::new(),
            del_after_missed_frames,
        }
    }

    /// Number of identifiers currently in the table.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_tracked(&self, id: TrackId) -> bool {
        self.tracked.contains_key(&id)
    }

    /// Process one frame of the detection stream.
    ///
    /// A frame absent from `obs` is recorded as an empty-frame anomaly
    /// and leaves the table untouched.
    pub fn check(
        &mut self,
        frame: usize,
        obs: &BTreeMap<usize, SceneDetections>,
        report: &mut PerceptionReport,
    ) {
        let Some(scene) = obs.get(&frame) else {
            report.record_empty_frame(frame);
            return;
        };

        self.age_absent_tracks(scene);

        for (track_id, object_type) in scene.scene_id.iter().zip(scene.object_types.iter()) {
            match self.tracked.entry(*track_id) {
                Entry::Vacant(slot) => {
                    slot.insert(TrackedObject {
                        object_type: object_type.clone(),
                        undetected_frame_count: 0,
                    });
                }
                Entry::Occupied(mut slot) => {
                    let state = slot.get_mut();
                    // Present this frame: the occlusion streak is over
                    state.undetected_frame_count = 0;

                    if state.object_type == *object_type {
                        continue;
                    }
                    if state.object_type == UNKNOWN_LABEL || object_type == UNKNOWN_LABEL {
                        continue;
                    }
                    // The baseline stays what was first learned, so
                    // repeated flips keep counting against it.
                    report.record_mismatch(
                        frame,
                        TypeMismatch {
                            track_id: *track_id,
                            previous_object_type: state.object_type.clone(),
                            new_object_type: object_type.clone(),
                        },
                    );
                }
            }
        }
    }

    /// Age every tracked identifier absent from this frame and drop the
    /// ones whose streak exceeds the grace threshold. Deletions are
    /// collected first so the table is never mutated mid-scan.
    fn age_absent_tracks(&mut self, scene: &SceneDetections) {
        let present: HashSet<TrackId> = scene.scene_id.iter().copied().collect();

        let mut lost = Vec::new();
        for (id, state) in self.tracked.iter_mut() {
            if present.contains(id) {
                continue;
            }
            state.undetected_frame_count += 1;
            if state.undetected_frame_count > self.del_after_missed_frames {
                lost.push(*id);
            }
        }
        for id in lost {
            self.tracked.remove(&id);
        }
    }
}

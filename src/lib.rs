pub mod analysis;
pub mod localisation;
pub mod perception;
pub mod report;
pub mod session;

pub use analysis::{Analysis, AnalysisConfig};
pub use localisation::LocalisationDetector;
pub use perception::PerceptionTracker;
pub use report::AnomalyReport;
pub use session::SessionLog;

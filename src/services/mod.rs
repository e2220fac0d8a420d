pub mod consistency;
pub mod pipeline;
pub mod rankings;
pub mod schedule;

pub use consistency::{ConsistencyGuard, ConsistencyReport};
pub use pipeline::{Mode, Pipeline, RunReport};
pub use rankings::{BoardRankingsGenerator, RankingsReport};
pub use schedule::{ScheduleDriver, status_summary};

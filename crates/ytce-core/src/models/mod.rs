pub mod comment;
pub mod error;
pub mod job;
pub mod result;
pub mod task;
pub mod usage;

pub use comment::Comment;
pub use error::{CoreError, CoreErrorKind, ModelError, ModelErrorKind};
pub use job::JobSpec;
pub use result::{AnalysisResult, EnrichedComment, ResultStatus, ResultValue, TaskResult};
pub use task::{ScoreScale, TaskConfig, TaskDefinition, TaskKind, TaskType};
pub use usage::TokenUsage;

use serde::{Deserialize, Serialize};

use crate::models::TaskDefinition;

/// A configured analysis run as handed over by the job loader.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub tasks: Vec<TaskDefinition>,
    #[serde(default)]
    pub custom_prompt: Option<String>,
    /// Opaque reference to where the records came from.
    #[serde(default)]
    pub input: Option<serde_json::Value>,
}

impl JobSpec {
    pub fn shared_context(&self) -> Option<&str> {
        self.custom_prompt
            .as_deref()
            .filter(|context| !context.trim().is_empty())
    }
}

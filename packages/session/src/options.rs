use serde::{Deserialize, Serialize};

/// Tunables for a session. Deserializable so hosts can ship them as
/// plain JSON config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Committed transactions kept for undo.
    pub max_undo_levels: usize,
    /// Validation errors handled per task cycle.
    pub task_batch_size: usize,
    /// Task cycles run per idle tick before yielding.
    pub max_cycles_per_step: usize,
    /// Committed edits between automatic saves. Zero disables autosave.
    pub autosave_every: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            max_undo_levels: 100,
            task_batch_size: 24,
            max_cycles_per_step: 5,
            autosave_every: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_deserialize_with_defaults() {
        let options: SessionOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options.max_undo_levels, 100);
        assert_eq!(options.task_batch_size, 24);
        assert_eq!(options.max_cycles_per_step, 5);
        assert_eq!(options.autosave_every, 0);

        let options: SessionOptions =
            serde_json::from_str(r#"{"autosave_every": 3, "max_undo_levels": 7}"#).unwrap();
        assert_eq!(options.autosave_every, 3);
        assert_eq!(options.max_undo_levels, 7);
        assert_eq!(options.task_batch_size, 24);
    }
}

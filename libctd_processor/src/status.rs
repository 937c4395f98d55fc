#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunStatus {
    pub progress: f32,
    pub raw_index: usize,
    pub raw_total: usize,
    pub step_index: usize,
    pub step_total: usize,
    pub step_name: String,
}

impl RunStatus {
    /// Status for the step about to run. Indices are zero-based.
    pub fn new(
        raw_index: usize,
        raw_total: usize,
        step_index: usize,
        step_total: usize,
        step_name: &str,
    ) -> Self {
        let total = (raw_total * step_total).max(1);
        let done = raw_index * step_total + step_index;
        Self {
            progress: done as f32 / total as f32,
            raw_index,
            raw_total,
            step_index,
            step_total,
            step_name: step_name.to_string(),
        }
    }

    /// Status once everything has run
    pub fn finished(raw_total: usize, step_total: usize) -> Self {
        Self {
            progress: 1.0,
            raw_index: raw_total,
            raw_total,
            step_index: step_total,
            step_total,
            step_name: String::new(),
        }
    }
}

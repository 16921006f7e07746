//! Worker thread configuration

/// Configuration for subdivision worker threads
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Name given to every worker thread
    pub thread_name_prefix: String,
    /// Thread stack size in bytes (None = platform default)
    pub stack_size: Option<usize>,
}

impl WorkerConfig {
    /// Set the thread name prefix
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }

    /// Set the stack size
    pub fn with_stack_size(mut self, stack_size: usize) -> Self {
        self.stack_size = Some(stack_size);
        self
    }

    /// Use the platform default stack size
    pub fn with_default_stack(mut self) -> Self {
        self.stack_size = None;
        self
    }

    pub(crate) fn thread_name(&self, depth: u32) -> String {
        format!("{}-d{}", self.thread_name_prefix, depth)
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            thread_name_prefix: "tetrafractal-subdivision".to_string(),
            stack_size: Some(8 * 1024 * 1024), // 8MB stack
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = WorkerConfig::default()
            .with_thread_name_prefix("fractal")
            .with_stack_size(1024 * 1024);
        assert_eq!(config.thread_name_prefix, "fractal");
        assert_eq!(config.stack_size, Some(1024 * 1024));
        assert_eq!(config.thread_name(4), "fractal-d4");

        assert_eq!(config.with_default_stack().stack_size, None);
    }
}

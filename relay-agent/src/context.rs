//! Per-build job execution context
//!
//! Single owned record of what the agent knows about the job of the current
//! build. It moves through explicit phases and is reset at the very first
//! lifecycle hook of every build.

/// Progress of the current build through the job lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    InputsProcessed,
    OutputsPublished,
}

#[derive(Debug, Clone, Default)]
pub struct JobExecutionContext {
    phase: Phase,
    job_id: Option<String>,
}

impl JobExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets everything about the previous build
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Moves to `InputsProcessed`; returns false when inputs were already handled
    pub fn begin_inputs(&mut self) -> bool {
        if self.phase != Phase::Idle {
            return false;
        }
        self.phase = Phase::InputsProcessed;
        true
    }

    pub fn set_job_id(&mut self, job_id: impl Into<String>) {
        self.job_id = Some(job_id.into());
    }

    /// Drops the job id so no later event reports on this job again
    pub fn clear_job_id(&mut self) -> Option<String> {
        self.job_id.take()
    }

    pub fn mark_outputs_published(&mut self) {
        self.phase = Phase::OutputsPublished;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inputs_processed_once() {
        let mut ctx = JobExecutionContext::new();
        assert!(ctx.begin_inputs());
        assert!(!ctx.begin_inputs());
        assert_eq!(ctx.phase(), Phase::InputsProcessed);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut ctx = JobExecutionContext::new();
        ctx.begin_inputs();
        ctx.set_job_id("job-1");
        ctx.mark_outputs_published();

        ctx.reset();
        assert_eq!(ctx.phase(), Phase::Idle);
        assert_eq!(ctx.job_id(), None);
        assert!(ctx.begin_inputs());
    }

    #[test]
    fn test_clear_job_id() {
        let mut ctx = JobExecutionContext::new();
        ctx.set_job_id("job-1");
        assert_eq!(ctx.clear_job_id().as_deref(), Some("job-1"));
        assert_eq!(ctx.job_id(), None);
    }
}

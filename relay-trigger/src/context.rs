//! Poll context for one trigger instance
//!
//! Carries everything a poll cycle reads about the trigger: its identity, the
//! build configuration it queues builds for and both parameter maps.

use relay_core::domain::trigger::TriggerDefinition;
use relay_core::params::Params;
use std::fmt;

#[derive(Debug, Clone, Default)]
pub struct TriggerContext {
    pub trigger_id: String,
    /// Build configuration the trigger queues builds for
    pub build_type_id: String,
    /// Trigger properties
    pub params: Params,
    /// Configuration parameters of the build configuration
    pub build_params: Params,
}

impl TriggerContext {
    pub fn new(build_type_id: impl Into<String>, definition: TriggerDefinition) -> Self {
        let build_type_id = build_type_id.into();
        Self {
            trigger_id: definition
                .id
                .unwrap_or_else(|| format!("{}-trigger", build_type_id)),
            build_type_id,
            params: definition.parameters,
            build_params: definition.build_parameters,
        }
    }

    /// Prefix for log lines about this trigger
    pub fn msg(&self, msg: impl fmt::Display) -> String {
        format!("{}: {}", self.build_type_id, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trigger_id_defaults_to_build_type() {
        let ctx = TriggerContext::new("Deploy_Main", TriggerDefinition::default());
        assert_eq!(ctx.trigger_id, "Deploy_Main-trigger");
        assert_eq!(ctx.msg("No jobs found"), "Deploy_Main: No jobs found");
    }
}

//! Per-invocation evaluation state
//!
//! Everything a generation needs beyond the graph and the document is passed
//! in here, so independent engines never share counters.

use crate::query::QueryPort;
use ur_expression::expression::IdGenerator;
use ur_expression::EnginePreferences;

pub struct EvaluationContext<'a> {
    pub preferences: &'a EnginePreferences,
    pub id_generator: &'a dyn IdGenerator,
    pub query_port: Option<&'a dyn QueryPort>,
    /// Events for another tenant are ignored
    pub tenant_id: Option<&'a str>,
    pub generation: u64,
    iteration: usize,
}

impl<'a> EvaluationContext<'a> {
    pub fn new(preferences: &'a EnginePreferences, id_generator: &'a dyn IdGenerator) -> Self {
        Self {
            preferences,
            id_generator,
            query_port: None,
            tenant_id: None,
            generation: 0,
            iteration: 0,
        }
    }

    pub fn with_query_port(mut self, port: &'a dyn QueryPort) -> Self {
        self.query_port = Some(port);
        self
    }

    pub fn with_tenant(mut self, tenant_id: &'a str) -> Self {
        self.tenant_id = Some(tenant_id);
        self
    }

    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = generation;
        self
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    /// Advance the iteration counter; `false` once the bound is exceeded
    pub fn next_iteration(&mut self) -> bool {
        self.iteration += 1;
        self.iteration <= self.preferences.max_iterations
    }

    /// Whether an event addressed to `tenant` belongs to this engine
    pub fn accepts_tenant(&self, tenant: Option<&str>) -> bool {
        match (self.tenant_id, tenant) {
            (Some(own), Some(other)) => own == other,
            _ => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ur_expression::expression::SequentialIdGenerator;

    #[test]
    fn test_iteration_bound() {
        let preferences = EnginePreferences {
            max_iterations: 2,
            ..EnginePreferences::default()
        };
        let ids = SequentialIdGenerator::new("id");
        let mut context = EvaluationContext::new(&preferences, &ids);

        assert!(context.next_iteration());
        assert!(context.next_iteration());
        assert!(!context.next_iteration());
        assert_eq!(context.iteration(), 3);
    }

    #[test]
    fn test_tenant_filter() {
        let preferences = EnginePreferences::default();
        let ids = SequentialIdGenerator::new("id");
        let context = EvaluationContext::new(&preferences, &ids).with_tenant("acme");

        assert!(context.accepts_tenant(Some("acme")));
        assert!(context.accepts_tenant(None));
        assert!(!context.accepts_tenant(Some("globex")));
    }
}

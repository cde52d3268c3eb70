//! # Reporting Engine
//!
//! Owns the dependency graph and the committed document for one form, queues
//! incoming events and folds them into generations.

use super::config::EngineConfig;
use super::errors::EngineError;
use crate::evaluation::{run_generation, EvaluationContext, GenerationReport};
use crate::graph::{self, DependencyGraph, GraphStats, Node, NodeDiagnostic};
use crate::model::{Document, Event, Field, Representation};
use crate::query::QueryPort;
use crate::target::Target;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use ur_expression::expression::IdGenerator;
use ur_expression::{log_debug, log_error, log_info};

pub struct ReportingEngine {
    fields: Vec<Field>,
    representations: Vec<Representation>,
    graph: DependencyGraph,
    document: Document,
    config: EngineConfig,
    id_generator: Box<dyn IdGenerator>,
    query_port: Option<Arc<dyn QueryPort>>,
    pending: VecDeque<Event>,
    generation: u64,
}

impl ReportingEngine {
    /// Build the graph for `fields` and `representations` over `data`
    ///
    /// Nothing is evaluated until the first [`run_generation`](Self::run_generation);
    /// every computed node starts dirty.
    pub fn new(
        fields: Vec<Field>,
        representations: Vec<Representation>,
        data: Value,
        config: EngineConfig,
    ) -> Result<Self, EngineError> {
        config.validate()?;
        let document = Document::new(data);
        let graph = graph::build(&fields, &representations, &document, &config.preferences)?;

        log_info!("Reporting engine created",
            "fields" => fields.len(),
            "representations" => representations.len(),
            "nodes" => graph.len());

        Ok(Self {
            fields,
            representations,
            graph,
            document,
            id_generator: config.id_generator(),
            config,
            query_port: None,
            pending: VecDeque::new(),
            generation: 0,
        })
    }

    pub fn with_query_port(mut self, port: Arc<dyn QueryPort>) -> Self {
        self.query_port = Some(port);
        self
    }

    /// Queue an event for the next generation
    pub fn submit(&mut self, event: Event) {
        log_debug!("Event queued",
            "source" => event.source,
            "doc" => event.source_doc_id);
        self.pending.push_back(event);
    }

    /// Queue a user edit of `values` under `source_doc_id`
    pub fn submit_edit(&mut self, source: &str, source_doc_id: &str, values: Map<String, Value>) {
        self.submit(Event::edit(source, source_doc_id, values));
    }

    pub fn pending_events(&self) -> usize {
        self.pending.len()
    }

    /// Fold every queued event into one generation
    ///
    /// The queue is drained either way. On error the committed document is
    /// left exactly as it was.
    pub fn run_generation(&mut self) -> Result<GenerationReport, EngineError> {
        let events: Vec<Event> = self.pending.drain(..).collect();
        self.generation += 1;

        let mut context = EvaluationContext::new(&self.config.preferences, &*self.id_generator)
            .with_generation(self.generation);
        if let Some(port) = self.query_port.as_deref() {
            context = context.with_query_port(port);
        }
        if let Some(tenant) = self.config.tenant_id.as_deref() {
            context = context.with_tenant(tenant);
        }

        match run_generation(&mut self.graph, &self.document, &events, &mut context) {
            Ok(outcome) => {
                self.document = outcome.document;
                Ok(outcome.report)
            }
            Err(e) => {
                log_error!(e.error_code(), "Generation discarded",
                    "generation" => self.generation,
                    "events" => events.len(),
                    "error" => e);
                Err(e.into())
            }
        }
    }

    /// Replace the field and representation definitions
    ///
    /// The data tree is kept. The `fields` and `representation` trees are
    /// derived state and are recomputed from scratch by the next generation.
    pub fn rebuild(
        &mut self,
        fields: Vec<Field>,
        representations: Vec<Representation>,
    ) -> Result<(), EngineError> {
        let mut document = self.document.clone();
        document.fields = Value::Object(Map::new());
        document.representation = Value::Object(Map::new());

        let graph = graph::build(&fields, &representations, &document, &self.config.preferences)?;

        self.graph = graph;
        self.document = document;
        self.fields = fields;
        self.representations = representations;
        log_info!("Reporting engine rebuilt", "nodes" => self.graph.len());
        Ok(())
    }

    /// Committed data tree
    pub fn data(&self) -> &Value {
        &self.document.data
    }

    /// Committed document, all three trees
    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn representations(&self) -> &[Representation] {
        &self.representations
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of generations run so far, including failed ones
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn diagnostics(&self) -> Vec<NodeDiagnostic> {
        self.graph.diagnostics()
    }

    pub fn stats(&self) -> GraphStats {
        self.graph.stats()
    }

    pub fn cycles(&self) -> &[Vec<String>] {
        self.graph.cycles()
    }

    /// Node at `path`, if the path parses and a node lives there
    pub fn node(&self, path: &str) -> Option<&Node> {
        let target = Target::parse(path).ok()?;
        self.graph.node(&target)
    }
}

impl std::fmt::Debug for ReportingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportingEngine")
            .field("fields", &self.fields.len())
            .field("representations", &self.representations.len())
            .field("nodes", &self.graph.len())
            .field("pending", &self.pending.len())
            .field("generation", &self.generation)
            .finish()
    }
}

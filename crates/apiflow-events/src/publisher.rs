use apiflow_core::Id;
use apiflow_import_types::{
    Edge, Environment, File, Flow, HttpAssert, HttpBodyForm, HttpBodyRaw, HttpBodyUrlEncoded,
    HttpHeader, HttpRequest, HttpSearchParam, Node, Variable,
};
use tracing::debug;

use crate::topic::{Event, EventKind, Topic};

/// Process-wide set of topics, one per entity kind
///
/// Workspace-scoped entities are keyed by workspace id; environments and
/// variables by environment id.
pub struct EventPublisher {
    pub http: Topic<HttpRequest>,
    pub headers: Topic<HttpHeader>,
    pub search_params: Topic<HttpSearchParam>,
    pub body_forms: Topic<HttpBodyForm>,
    pub body_urlencoded: Topic<HttpBodyUrlEncoded>,
    pub body_raw: Topic<HttpBodyRaw>,
    pub asserts: Topic<HttpAssert>,
    pub files: Topic<File>,
    pub flows: Topic<Flow>,
    pub nodes: Topic<Node>,
    pub edges: Topic<Edge>,
    pub environments: Topic<Environment>,
    pub variables: Topic<Variable>,
}

impl EventPublisher {
    pub fn new() -> Self {
        Self {
            http: Topic::new("http"),
            headers: Topic::new("http_headers"),
            search_params: Topic::new("http_search_params"),
            body_forms: Topic::new("http_body_forms"),
            body_urlencoded: Topic::new("http_body_urlencoded"),
            body_raw: Topic::new("http_body_raw"),
            asserts: Topic::new("http_asserts"),
            files: Topic::new("files"),
            flows: Topic::new("flows"),
            nodes: Topic::new("flow_nodes"),
            edges: Topic::new("flow_edges"),
            environments: Topic::new("environments"),
            variables: Topic::new("variables"),
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Events collected while a transaction is open
///
/// Nothing reaches subscribers until [`ChangeSet::publish`] is called,
/// which the caller does only after the commit succeeded.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub http: Vec<(Id, Event<HttpRequest>)>,
    pub headers: Vec<(Id, Event<HttpHeader>)>,
    pub search_params: Vec<(Id, Event<HttpSearchParam>)>,
    pub body_forms: Vec<(Id, Event<HttpBodyForm>)>,
    pub body_urlencoded: Vec<(Id, Event<HttpBodyUrlEncoded>)>,
    pub body_raw: Vec<(Id, Event<HttpBodyRaw>)>,
    pub asserts: Vec<(Id, Event<HttpAssert>)>,
    pub files: Vec<(Id, Event<File>)>,
    pub flows: Vec<(Id, Event<Flow>)>,
    pub nodes: Vec<(Id, Event<Node>)>,
    pub edges: Vec<(Id, Event<Edge>)>,
    pub environments: Vec<(Id, Event<Environment>)>,
    pub variables: Vec<(Id, Event<Variable>)>,
}

macro_rules! record {
    ($name:ident, $field:ident, $ty:ty, $key:ident) => {
        pub fn $name(&mut self, kind: EventKind, entity: $ty) {
            self.$field.push((entity.$key, Event::new(kind, entity)));
        }
    };
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    record!(http_request, http, HttpRequest, workspace_id);
    record!(file, files, File, workspace_id);
    record!(flow, flows, Flow, workspace_id);
    record!(environment, environments, Environment, id);
    record!(variable, variables, Variable, env_id);

    pub fn header(&mut self, workspace_id: Id, kind: EventKind, entity: HttpHeader) {
        self.headers.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn search_param(&mut self, workspace_id: Id, kind: EventKind, entity: HttpSearchParam) {
        self.search_params.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn body_form(&mut self, workspace_id: Id, kind: EventKind, entity: HttpBodyForm) {
        self.body_forms.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn body_urlencoded(&mut self, workspace_id: Id, kind: EventKind, entity: HttpBodyUrlEncoded) {
        self.body_urlencoded.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn body_raw(&mut self, workspace_id: Id, kind: EventKind, entity: HttpBodyRaw) {
        self.body_raw.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn assert(&mut self, workspace_id: Id, kind: EventKind, entity: HttpAssert) {
        self.asserts.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn node(&mut self, workspace_id: Id, kind: EventKind, entity: Node) {
        self.nodes.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn edge(&mut self, workspace_id: Id, kind: EventKind, entity: Edge) {
        self.edges.push((workspace_id, Event::new(kind, entity)));
    }

    pub fn len(&self) -> usize {
        self.http.len()
            + self.headers.len()
            + self.search_params.len()
            + self.body_forms.len()
            + self.body_urlencoded.len()
            + self.body_raw.len()
            + self.asserts.len()
            + self.files.len()
            + self.flows.len()
            + self.nodes.len()
            + self.edges.len()
            + self.environments.len()
            + self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append another change set, keeping order
    pub fn extend(&mut self, other: ChangeSet) {
        self.http.extend(other.http);
        self.headers.extend(other.headers);
        self.search_params.extend(other.search_params);
        self.body_forms.extend(other.body_forms);
        self.body_urlencoded.extend(other.body_urlencoded);
        self.body_raw.extend(other.body_raw);
        self.asserts.extend(other.asserts);
        self.files.extend(other.files);
        self.flows.extend(other.flows);
        self.nodes.extend(other.nodes);
        self.edges.extend(other.edges);
        self.environments.extend(other.environments);
        self.variables.extend(other.variables);
    }

    /// Drain every buffered event into its topic; returns the event count
    pub fn publish(self, publisher: &EventPublisher) -> usize {
        fn drain<T: Clone + Send + 'static>(topic: &Topic<T>, events: Vec<(Id, Event<T>)>) -> usize {
            let count = events.len();
            for (key, event) in events {
                topic.publish(key, event);
            }
            count
        }

        // Environments before variables and parents before children
        let total = drain(&publisher.environments, self.environments)
            + drain(&publisher.variables, self.variables)
            + drain(&publisher.files, self.files)
            + drain(&publisher.http, self.http)
            + drain(&publisher.headers, self.headers)
            + drain(&publisher.search_params, self.search_params)
            + drain(&publisher.body_forms, self.body_forms)
            + drain(&publisher.body_urlencoded, self.body_urlencoded)
            + drain(&publisher.body_raw, self.body_raw)
            + drain(&publisher.asserts, self.asserts)
            + drain(&publisher.flows, self.flows)
            + drain(&publisher.nodes, self.nodes)
            + drain(&publisher.edges, self.edges);

        debug!(events = total, "Published change set");
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiflow_import_types::{BodyKind, EnvironmentKind};

    fn request(workspace_id: Id) -> HttpRequest {
        let now = chrono::Utc::now();
        HttpRequest {
            id: Id::new(),
            workspace_id,
            parent_folder_id: None,
            name: "GET /users".to_string(),
            method: "GET".to_string(),
            url: "https://api.example.com/users".to_string(),
            description: String::new(),
            body_kind: BodyKind::None,
            is_delta: false,
            delta_parent_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_nothing_is_sent_before_publish() {
        let publisher = EventPublisher::new();
        let workspace_id = Id::new();
        let mut http_events = publisher.http.subscribe_key(workspace_id);

        let mut changes = ChangeSet::new();
        changes.http_request(EventKind::Insert, request(workspace_id));
        assert!(http_events.try_recv().unwrap().is_none());

        assert_eq!(changes.publish(&publisher), 1);
        let envelope = http_events.recv().await.unwrap();
        assert_eq!(envelope.key, workspace_id);
        assert_eq!(envelope.event.kind, EventKind::Insert);
    }

    #[test]
    fn test_environment_topics_are_keyed_by_env() {
        let publisher = EventPublisher::new();
        let env = Environment {
            id: Id::new(),
            workspace_id: Id::new(),
            name: "default".to_string(),
            kind: EnvironmentKind::Global,
        };
        let variable = Variable {
            id: Id::new(),
            env_id: env.id,
            key: "API_HOST".to_string(),
            value: "https://api.example.com".to_string(),
            enabled: true,
            description: String::new(),
            order: 0,
        };
        let mut env_events = publisher.environments.subscribe_key(env.id);
        let mut var_events = publisher.variables.subscribe_key(env.id);

        let mut changes = ChangeSet::new();
        changes.environment(EventKind::Create, env.clone());
        changes.variable(EventKind::Create, variable);
        assert_eq!(changes.len(), 2);
        changes.publish(&publisher);

        assert_eq!(env_events.drain().len(), 1);
        assert_eq!(var_events.drain().len(), 1);
    }

    #[test]
    fn test_extend_keeps_both_sets() {
        let workspace_id = Id::new();
        let mut first = ChangeSet::new();
        first.http_request(EventKind::Insert, request(workspace_id));
        let mut second = ChangeSet::new();
        second.http_request(EventKind::Insert, request(workspace_id));
        first.extend(second);
        assert_eq!(first.http.len(), 2);
        assert!(!first.is_empty());
    }
}

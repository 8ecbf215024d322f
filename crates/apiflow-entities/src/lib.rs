pub mod types;
pub mod workspaces;

// HTTP requests and their child tables
pub mod http;
pub mod http_asserts;
pub mod http_body_forms;
pub mod http_body_raw;
pub mod http_body_urlencoded;
pub mod http_headers;
pub mod http_search_params;

// File tree
pub mod files;

// Flow graph
pub mod flow_edges;
pub mod flow_node_noops;
pub mod flow_node_requests;
pub mod flow_nodes;
pub mod flows;

// Environments
pub mod environments;
pub mod variables;

pub mod prelude;

pub use super::environments::Entity as Environments;
pub use super::files::Entity as Files;
pub use super::flow_edges::Entity as FlowEdges;
pub use super::flow_node_noops::Entity as FlowNodeNoops;
pub use super::flow_node_requests::Entity as FlowNodeRequests;
pub use super::flow_nodes::Entity as FlowNodes;
pub use super::flows::Entity as Flows;
pub use super::http::Entity as Http;
pub use super::http_asserts::Entity as HttpAsserts;
pub use super::http_body_forms::Entity as HttpBodyForms;
pub use super::http_body_raw::Entity as HttpBodyRaw;
pub use super::http_body_urlencoded::Entity as HttpBodyUrlEncoded;
pub use super::http_headers::Entity as HttpHeaders;
pub use super::http_search_params::Entity as HttpSearchParams;
pub use super::variables::Entity as Variables;
pub use super::workspaces::Entity as Workspaces;

pub(crate) mod import_handler;
pub(crate) mod types;

pub use import_handler::{configure_routes, import_problem, ImportApiDoc};
pub use types::{create_import_app_state, ImportAppState, ImportRpcRequest, RpcCode};

//! Core types and traits for the Apiflow import system
//!
//! This crate provides the foundational abstractions shared by every
//! import stage:
//!
//! - **Model**: the in-memory entities a translator produces (`HttpRequest`,
//!   `File`, `Flow`, `Node`, ...)
//! - **TranslationResult**: the uniform output of every translator, built
//!   incrementally with `TranslationBuilder`
//! - **Translator**: the trait each format implementation conforms to
//! - **Errors**: the closed set of import failures and their `ErrorKind`
//!
//! Format implementations live in `apiflow-import-formats`; the pipeline
//! that persists a `TranslationResult` lives in `apiflow-import`.

pub mod error;
pub mod format;
pub mod model;
pub mod request;
pub mod translation;
pub mod translator;
pub mod xhr;

pub use error::{ErrorKind, ImportError, ImportResult};
pub use format::ImportFormat;
pub use model::{
    Edge, Environment, File, Flow, HttpAssert, HttpBodyForm, HttpBodyRaw, HttpBodyUrlEncoded,
    HttpHeader, HttpKeyValue, HttpRequest, HttpSearchParam, NoOpNode, Node, NodeRequest, Variable,
};
pub use request::{DomainMapping, ImportRequest, ImportResponse, MissingData};
pub use translation::{
    split_query, BodyDraft, FlowRef, KeyValueDraft, RequestDraft, RequestRef, TranslationBuilder,
    TranslationResult,
};
pub use translator::Translator;
pub use xhr::{extract_domains, is_xhr_like, url_host};

pub use apiflow_core::{Id, WorkspaceId};
pub use apiflow_entities::types::{
    BodyKind, EdgeHandle, EdgeKind, EnvironmentKind, FileContentType, NoOpKind, NodeKind,
};

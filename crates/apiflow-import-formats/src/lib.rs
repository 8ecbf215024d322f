//! Format detection and translators for Apiflow imports
//!
//! [`FormatDetector`] scores a payload against every known format and
//! [`TranslatorRegistry`] maps the detected format to the translator that
//! turns it into a `TranslationResult`.

pub mod detector;
pub mod registry;
pub mod translators;
mod value;

pub use detector::{Detection, FormatDetector, MIN_CONFIDENCE};
pub use registry::TranslatorRegistry;
pub use translators::{
    curl::CurlTranslator, har::HarTranslator, openapi::OpenApiTranslator,
    postman::PostmanTranslator, yamlflow::YamlFlowTranslator,
};

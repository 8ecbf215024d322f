use std::collections::HashMap;
use std::sync::Arc;

use apiflow_core::{ImportConfig, WorkspaceId};
use apiflow_import_types::{ImportError, ImportFormat, ImportResult, TranslationResult, Translator};

use crate::translators::{
    curl::CurlTranslator, har::HarTranslator, openapi::OpenApiTranslator,
    postman::PostmanTranslator, yamlflow::YamlFlowTranslator,
};

/// Maps each translatable format to its translator
pub struct TranslatorRegistry {
    translators: HashMap<ImportFormat, Arc<dyn Translator>>,
}

impl TranslatorRegistry {
    pub fn new() -> Self {
        Self {
            translators: HashMap::new(),
        }
    }

    /// Registry with every built-in translator
    pub fn with_defaults(config: &ImportConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(HarTranslator::with_delta_mode(config.har_delta_mode)));
        registry.register(Arc::new(OpenApiTranslator::new()));
        registry.register(Arc::new(PostmanTranslator::new()));
        registry.register(Arc::new(YamlFlowTranslator::new()));
        registry.register(Arc::new(CurlTranslator::new()));
        registry
    }

    /// Register a translator, replacing any previous one for its format
    pub fn register(&mut self, translator: Arc<dyn Translator>) {
        self.translators.insert(translator.format(), translator);
    }

    pub fn get(&self, format: ImportFormat) -> Option<Arc<dyn Translator>> {
        self.translators.get(&format).cloned()
    }

    /// Registered formats, sorted by name
    pub fn formats(&self) -> Vec<ImportFormat> {
        let mut formats: Vec<_> = self.translators.keys().copied().collect();
        formats.sort_by_key(|f| f.as_str());
        formats
    }

    pub fn translate(
        &self,
        format: ImportFormat,
        data: &[u8],
        workspace_id: WorkspaceId,
    ) -> ImportResult<TranslationResult> {
        let translator = self.get(format).ok_or_else(|| {
            ImportError::FormatDetection(format!("no translator for format {}", format))
        })?;
        translator.translate(data, workspace_id)
    }
}

impl Default for TranslatorRegistry {
    fn default() -> Self {
        Self::with_defaults(&ImportConfig::default())
    }
}

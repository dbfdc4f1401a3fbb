use std::sync::Arc;
use std::time::Instant;

use crate::config::{Settings, TemplatingConfig};
use crate::email::EmailEventDispatcher;
use crate::metrics::TemplateMetrics;
use crate::template::{CapabilitySet, ContentProcessor, TemplateEngines};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub engines: TemplateEngines,
    pub processor: Arc<ContentProcessor>,
    pub dispatcher: Arc<EmailEventDispatcher>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let capabilities = resolve_capabilities(&settings.templating);
        let engines = TemplateEngines::new(&capabilities);

        let processor = Arc::new(
            ContentProcessor::new(engines.lenient.clone())
                .with_enabled(settings.templating.enabled),
        );
        let dispatcher = Arc::new(EmailEventDispatcher::with_template_processing(
            processor.clone(),
            settings.templating.token_replacement,
        ));

        tracing::info!(
            enabled = settings.templating.enabled,
            token_replacement = settings.templating.token_replacement,
            capabilities = ?engines.lenient.capabilities(),
            "Template processing configured"
        );

        Self {
            settings: Arc::new(settings),
            engines,
            processor,
            dispatcher,
            start_time: Instant::now(),
        }
    }
}

fn resolve_capabilities(config: &TemplatingConfig) -> CapabilitySet {
    let Some(names) = &config.capabilities else {
        return CapabilitySet::all();
    };

    let (capabilities, errors) = CapabilitySet::from_names(names);
    for error in &errors {
        tracing::warn!(error = %error, "Ignoring configured template capability");
    }
    TemplateMetrics::record_capabilities_skipped(errors.len());
    capabilities
}

use std::sync::Arc;

use coldpress_core::{Config, JobRunner, Transcoder};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    transcoder: Arc<dyn Transcoder>,
    runner: JobRunner,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        transcoder: Arc<dyn Transcoder>,
        runner: JobRunner,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            transcoder,
            runner,
            ws_broadcaster,
        }
    }

    #[allow(dead_code)]
    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn transcoder(&self) -> &dyn Transcoder {
        self.transcoder.as_ref()
    }

    pub fn runner(&self) -> &JobRunner {
        &self.runner
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}

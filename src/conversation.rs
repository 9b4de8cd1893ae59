//! Text conversation turn: understand, dispatch, then render the reply.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::ability::{Context, Device};
use crate::dispatch::Dispatcher;
use crate::nlg::Generator;
use crate::nlu::Understander;

/// Vocal reply used when the NLG service fails.
pub const NLG_ERROR_SENTENCE: &str = "error";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub device: Device,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    pub vocal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visu: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
    #[serde(default)]
    pub auto_reprompt: bool,
    #[serde(default)]
    pub context: Context,
}

pub struct TextOrchestrator {
    understander: Arc<dyn Understander>,
    dispatcher: Arc<Dispatcher>,
    generator: Arc<dyn Generator>,
}

impl TextOrchestrator {
    pub fn new(
        understander: Arc<dyn Understander>,
        dispatcher: Arc<Dispatcher>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self {
            understander,
            dispatcher,
            generator,
        }
    }

    pub async fn handle_text(&self, request: TextRequest) -> TextResponse {
        let nlu = self.understander.understand(&request.text).await;
        debug!(best_intent = %nlu.best_intent, "Understood the request");

        let response = self
            .dispatcher
            .request_ability(nlu, request.context, request.device)
            .await;

        let vocal = match self.generator.generate(&response.nlg).await {
            Ok(vocal) => vocal,
            Err(e) => {
                error!(error = %e, sentence = %response.nlg.sentence, "Generation failed");
                NLG_ERROR_SENTENCE.to_string()
            }
        };

        TextResponse {
            vocal,
            visu: response.visu,
            actions: response.actions,
            auto_reprompt: response.auto_reprompt,
            context: response.context,
        }
    }
}

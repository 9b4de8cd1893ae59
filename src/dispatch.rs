//! Dispatch engine: picks the ability serving a turn and calls it.
//!
//! The target of a turn is normally the best NLU intent. While an ability is
//! filling a slot (the caller sent back a context with `slot_filling`), every
//! turn is forced back to that ability, unless the user said the stop intent.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::ability::{Context, Device, Request, Response};
use crate::nlu::Nlu;
use crate::registry::AbilityRegistry;

/// Sentence returned when no ability could serve the turn.
pub const APOLOGY_SENTENCE: &str = "I didn't find any ability corresponding to your request.";

/// Dispatch settings.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub stop_intent: String,
    /// Intents answered locally with a fixed sentence.
    pub local_intents: HashMap<String, String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            stop_intent: "STOP".to_string(),
            local_intents: HashMap::from([("HELLO".to_string(), "Hello".to_string())]),
        }
    }
}

pub struct Dispatcher {
    registry: Arc<AbilityRegistry>,
    config: DispatchConfig,
}

impl Dispatcher {
    pub fn new(registry: Arc<AbilityRegistry>, config: DispatchConfig) -> Self {
        Self { registry, config }
    }

    /// Intent or ability name the turn should go to.
    pub fn resolve_target(&self, nlu: &Nlu, context: &Context) -> String {
        let best_intent = if nlu.intents.is_empty() {
            ""
        } else {
            nlu.best_intent.as_str()
        };

        if !context.is_slot_filling() || best_intent == self.config.stop_intent {
            best_intent.to_string()
        } else {
            context.last_ability.clone()
        }
    }

    /// Route one turn and return the reply to render. Never fails: every
    /// failure becomes the apology reply with an empty context.
    pub async fn request_ability(&self, nlu: Nlu, context: Context, device: Device) -> Response {
        let target = self.resolve_target(&nlu, &context);

        if target == self.config.stop_intent {
            info!(intent = %target, "Stop intent, closing the conversation");
            return Response::simple("");
        }

        if let Some(sentence) = self.config.local_intents.get(&target) {
            info!(intent = %target, "Answered locally");
            return Response::simple(sentence.clone());
        }

        let Some((client, source)) = self.registry.lookup(&target).await else {
            return Response::simple(APOLOGY_SENTENCE);
        };

        let request = Request {
            nlu,
            context,
            device,
        };
        match client.call_ability(&request).await {
            Ok(mut response) => {
                info!(
                    intent_or_ability = %target,
                    ability = %client.name(),
                    %source,
                    slot_filling = response.context.is_slot_filling(),
                    "Ability answered"
                );
                response.context.last_ability = client.name().to_string();
                response
            }
            Err(e) => {
                warn!(
                    intent_or_ability = %target,
                    ability = %client.name(),
                    error = %e,
                    "Ability call failed"
                );
                Response::simple(APOLOGY_SENTENCE)
            }
        }
    }
}

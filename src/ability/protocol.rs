//! JSON contract shared with ability backends (`POST /resolve`).

use serde::{Deserialize, Serialize};

use crate::nlg::Nlg;
use crate::nlu::Nlu;

/// Conversation state handed back to the caller and returned on the next turn.
///
/// `slot_filling` belongs to the ability that opened it. Only its presence
/// matters here; its content is forwarded untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub last_ability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slot_filling: Option<serde_json::Value>,
}

impl Context {
    /// An ability is waiting for the user to fill a slot.
    pub fn is_slot_filling(&self) -> bool {
        self.slot_filling.is_some()
    }
}

/// Device information sent with each turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Device {
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty", deserialize_with = "crate::nlg::null_as_default")]
    pub state: serde_json::Map<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty", deserialize_with = "crate::nlg::null_as_default")]
    pub instruments: Vec<serde_json::Value>,
}

/// Body posted to an ability's `/resolve` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub nlu: Nlu,
    #[serde(default)]
    pub context: Context,
    #[serde(default)]
    pub device: Device,
}

/// Structured reply of an ability, or a canned reply built locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub nlg: Nlg,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visu: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actions: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_reprompt: bool,
    #[serde(default)]
    pub context: Context,
}

impl Response {
    /// A reply carrying only a sentence, with an empty context.
    pub fn simple(sentence: impl Into<String>) -> Self {
        Self {
            nlg: Nlg::sentence(sentence),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_slot_filling_means_no_slot() {
        let ctx: Context =
            serde_json::from_str(r#"{"last_ability":"shopping","slot_filling":null}"#).unwrap();
        assert!(!ctx.is_slot_filling());
        assert_eq!(ctx.last_ability, "shopping");
    }

    #[test]
    fn slot_filling_is_kept_verbatim() {
        let raw = serde_json::json!({"missing": ["city"], "nested": {"n": 1}});
        let ctx = Context {
            last_ability: "weather".into(),
            slot_filling: Some(raw.clone()),
        };
        let back: Context = serde_json::from_value(serde_json::to_value(&ctx).unwrap()).unwrap();
        assert_eq!(back.slot_filling, Some(raw));
    }

    #[test]
    fn response_decodes_partial_body() {
        let resp: Response =
            serde_json::from_str(r#"{"nlg":{"sentence":"It is sunny"},"auto_reprompt":false}"#)
                .unwrap();
        assert_eq!(resp.nlg.sentence, "It is sunny");
        assert_eq!(resp.context, Context::default());
        assert!(resp.visu.is_none());
    }

    #[test]
    fn null_collections_decode_as_empty() {
        let resp: Response =
            serde_json::from_str(r#"{"nlg":{"sentence":"ok","params":null},"context":{}}"#)
                .unwrap();
        assert_eq!(resp.nlg.sentence, "ok");
        assert!(resp.nlg.params.is_empty());

        let device: Device =
            serde_json::from_str(r#"{"state":null,"instruments":null}"#).unwrap();
        assert_eq!(device, Device::default());
    }

    #[test]
    fn simple_response_has_zero_context() {
        let resp = Response::simple("Hello");
        assert_eq!(resp.nlg.sentence, "Hello");
        assert!(!resp.auto_reprompt);
        assert_eq!(resp.context, Context::default());
    }
}

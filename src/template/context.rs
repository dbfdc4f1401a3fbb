//! Template context construction from API tokens and contact data.

use std::collections::BTreeMap;

use minijinja::Value;
use serde::Serialize;

/// API tokens supplied for a single send, keyed as given by the caller
/// (usually brace-wrapped, e.g. `{orderTotal}`). Insertion order is kept.
pub type TokenBag = serde_json::Map<String, serde_json::Value>;

/// Recipient attributes (name, email, custom fields).
pub type ContactBag = serde_json::Map<String, serde_json::Value>;

/// Namespaced access to all tokens: `{{ tokens.orderTotal }}`
pub const TOKENS_KEY: &str = "tokens";
/// Contact data: `{{ lead.firstname }}`
pub const LEAD_KEY: &str = "lead";
/// Alias of [`LEAD_KEY`]: `{{ contact.firstname }}`
pub const CONTACT_KEY: &str = "contact";

const SYNTHESIZED_KEYS: [&str; 3] = [TOKENS_KEY, LEAD_KEY, CONTACT_KEY];

/// Strip surrounding brace delimiters from a token key.
///
/// `{orderTotal}` and `orderTotal` both yield `orderTotal`.
pub fn normalize_token_key(key: &str) -> &str {
    key.trim_matches(|c| c == '{' || c == '}')
}

/// Variables a template is rendered against.
///
/// Holds every token at the top level under its normalized key, the same
/// tokens under `tokens`, and the contact data under both `lead` and
/// `contact`. The two contact entries share one value rather than holding
/// separate copies.
///
/// A token whose normalized key is `tokens`, `lead` or `contact` replaces
/// the synthesized entry of that name.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct TemplateContext {
    vars: BTreeMap<String, Value>,
}

impl TemplateContext {
    /// Build the context for one render call
    pub fn build(tokens: &TokenBag, lead: &ContactBag) -> Self {
        let mut clean_tokens = serde_json::Map::with_capacity(tokens.len());
        for (key, value) in tokens {
            clean_tokens.insert(normalize_token_key(key).to_string(), value.clone());
        }

        let lead = Value::from_serialize(lead);
        let mut vars = BTreeMap::new();
        vars.insert(TOKENS_KEY.to_string(), Value::from_serialize(&clean_tokens));
        vars.insert(LEAD_KEY.to_string(), lead.clone());
        vars.insert(CONTACT_KEY.to_string(), lead);

        for (key, value) in clean_tokens {
            if SYNTHESIZED_KEYS.contains(&key.as_str()) {
                tracing::warn!(
                    token = %key,
                    "Token name collides with a built-in template variable and replaces it"
                );
            }
            vars.insert(key, Value::from_serialize(&value));
        }

        Self { vars }
    }

    /// Look up a top-level variable
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    /// Top-level variable names
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.vars.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bag(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("expected a JSON object"),
        }
    }

    #[test]
    fn test_normalize_token_key() {
        assert_eq!(normalize_token_key("{orderTotal}"), "orderTotal");
        assert_eq!(normalize_token_key("orderTotal"), "orderTotal");
        assert_eq!(normalize_token_key("{{orderTotal}}"), "orderTotal");
        assert_eq!(
            normalize_token_key(normalize_token_key("{orderTotal}")),
            "orderTotal"
        );
    }

    #[test]
    fn test_context_completeness() {
        let tokens = bag(json!({"{orderTotal}": "42"}));
        let lead = bag(json!({"firstname": "Ann"}));

        let ctx = TemplateContext::build(&tokens, &lead);

        assert_eq!(ctx.get("orderTotal"), Some(&Value::from("42")));
        let namespaced = ctx.get(TOKENS_KEY).unwrap();
        assert_eq!(namespaced.get_attr("orderTotal").unwrap(), Value::from("42"));
        let lead_value = ctx.get(LEAD_KEY).unwrap();
        assert_eq!(lead_value.get_attr("firstname").unwrap(), Value::from("Ann"));
        let contact_value = ctx.get(CONTACT_KEY).unwrap();
        assert_eq!(contact_value.get_attr("firstname").unwrap(), Value::from("Ann"));
    }

    #[test]
    fn test_no_other_synthesized_keys() {
        let ctx = TemplateContext::build(&TokenBag::new(), &ContactBag::new());
        let keys: Vec<&str> = ctx.keys().collect();
        assert_eq!(keys, vec![CONTACT_KEY, LEAD_KEY, TOKENS_KEY]);
    }

    #[test]
    fn test_contact_aliases_lead() {
        let lead = bag(json!({"firstname": "Ann", "custom": {"tier": "gold"}}));
        let ctx = TemplateContext::build(&TokenBag::new(), &lead);
        assert_eq!(ctx.get(LEAD_KEY), ctx.get(CONTACT_KEY));
    }

    #[test]
    fn test_braced_and_plain_keys_normalize_to_same_variable() {
        let tokens = bag(json!({"orderTotal": "1", "{orderTotal}": "2"}));
        let ctx = TemplateContext::build(&tokens, &ContactBag::new());
        assert_eq!(ctx.get("orderTotal"), Some(&Value::from("2")));
        assert_eq!(ctx.len(), 4);
    }

    // Flagged behaviour: a token named like a built-in variable shadows it.
    // The PHP plugin assigns `tokens`, `lead` and `contact` after the tokens,
    // so there the built-in variables win; this departure is intentional.
    #[test]
    fn test_token_named_lead_replaces_contact_data() {
        let tokens = bag(json!({"{lead}": "token wins"}));
        let lead = bag(json!({"firstname": "Ann"}));
        let ctx = TemplateContext::build(&tokens, &lead);

        assert_eq!(ctx.get(LEAD_KEY), Some(&Value::from("token wins")));
        let contact_value = ctx.get(CONTACT_KEY).unwrap();
        assert_eq!(contact_value.get_attr("firstname").unwrap(), Value::from("Ann"));
    }
}

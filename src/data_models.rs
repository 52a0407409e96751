use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    System,
}

/// Client-side view of one search hit. Upstream objects that lack a field
/// get an empty string rather than failing the whole reply.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct SearchResultItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
}

impl SearchResultItem {
    /// Read a raw result relayed by the proxy. Discovery Engine nests the
    /// interesting fields under `document.derivedStructData`; flat objects are
    /// taken as they are.
    pub fn from_value(value: &Value) -> SearchResultItem {
        let str_at = |v: &Value, key: &str| {
            v.get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let document = value.get("document");
        let derived = document.and_then(|d| d.get("derivedStructData"));
        match derived {
            Some(data) => {
                let snippet = data
                    .get("snippets")
                    .and_then(Value::as_array)
                    .and_then(|s| s.first())
                    .map(|s| str_at(s, "snippet"))
                    .unwrap_or_default();
                SearchResultItem {
                    id: document.map(|d| str_at(d, "id")).unwrap_or_default(),
                    title: str_at(data, "title"),
                    link: str_at(data, "link"),
                    snippet,
                }
            }
            None => serde_json::from_value(value.clone()).unwrap_or_default(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub sender: Sender,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<SearchResultItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn user(query: &str) -> Message {
        Message {
            sender: Sender::User,
            text: query.to_string(),
            search_results: None,
            search_summary: None,
            original_query: Some(query.to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn bot(
        query: &str,
        results: Vec<SearchResultItem>,
        summary: Option<String>,
    ) -> Message {
        Message {
            sender: Sender::Bot,
            text: String::new(),
            search_results: Some(results),
            search_summary: summary,
            original_query: Some(query.to_string()),
            created_at: Utc::now(),
        }
    }

    pub fn system(text: impl Into<String>) -> Message {
        Message {
            sender: Sender::System,
            text: text.into(),
            search_results: None,
            search_summary: None,
            original_query: None,
            created_at: Utc::now(),
        }
    }
}

use serde::{Deserialize, Deserializer, Serialize};

/// A single story as returned by the news API.
///
/// The API is treated as opaque: only `id` has to be present, the rest
/// default to empty strings when missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub image: String,
    #[serde(rename = "newsURL", default)]
    pub news_url: String,
}

impl NewsItem {
    pub fn has_image(&self) -> bool {
        !self.image.trim().is_empty()
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Str(String),
        Num(serde_json::Number),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Str(s) => s.trim().to_string(),
        Id::Num(n) => n.to_string(),
    })
}

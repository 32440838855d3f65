use serde::{Deserialize, Deserializer, Serialize};

/// Flexible integer deserializer to handle string, float, or int inputs from browser clients
fn deserialize_flexible_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum FlexibleInt {
        Int(u64),
        Float(f64),
        String(String),
        Null(()),
    }

    let value = FlexibleInt::deserialize(deserializer)?;
    match value {
        FlexibleInt::Int(i) => u32::try_from(i).map(Some).map_err(serde::de::Error::custom),
        FlexibleInt::Float(f) if f >= 0.0 => Ok(Some(f as u32)),
        FlexibleInt::Float(f) => Err(serde::de::Error::custom(format!(
            "expected a non-negative number, got {f}"
        ))),
        FlexibleInt::String(s) if s.trim().is_empty() => Ok(None),
        FlexibleInt::String(s) => s
            .trim()
            .parse::<u32>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        FlexibleInt::Null(()) => Ok(None),
    }
}

/// Body of `POST /api/recommend`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendRequest {
    #[serde(default)]
    pub query: Option<String>,

    /// Advisory page size sent by the front-end; the backend always asks for 3.
    #[serde(default, deserialize_with = "deserialize_flexible_u32")]
    pub count: Option<u32>,

    #[serde(default, deserialize_with = "deserialize_flexible_u32")]
    pub offset: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendResponse {
    pub recommendations: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub details: Option<String>,
}

/// One normalized gift suggestion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GiftRecord {
    pub index: usize,
    pub name: String,
    pub price: String,
    pub image_url: String,
    pub why: String,
}

// OpenRouter chat message format
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

// OpenRouter API request format
#[derive(Debug, Serialize, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: i32,
}

// OpenRouter API response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Choice {
    pub message: ChoiceMessage,
}

/// Assistant message inside a choice; providers sometimes send `content: null`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ChoiceMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Error envelope returned by the provider on non-success statuses
#[derive(Debug, Deserialize)]
pub struct ProviderErrorBody {
    pub error: Option<ProviderError>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderError {
    pub message: Option<String>,
}

// Unsplash search response format
#[derive(Debug, Deserialize)]
pub struct PhotoSearchResponse {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub results: Vec<Photo>,
}

#[derive(Debug, Deserialize)]
pub struct Photo {
    pub urls: PhotoUrls,
}

#[derive(Debug, Deserialize)]
pub struct PhotoUrls {
    pub regular: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recommend_request_accepts_flexible_numbers() {
        let req: RecommendRequest =
            serde_json::from_str(r#"{"query":"socks","count":"6","offset":12.0}"#).unwrap();
        assert_eq!(req.query.as_deref(), Some("socks"));
        assert_eq!(req.count, Some(6));
        assert_eq!(req.offset, Some(12));
    }

    #[test]
    fn test_recommend_request_defaults() {
        let req: RecommendRequest = serde_json::from_str(r#"{"offset":null}"#).unwrap();
        assert!(req.query.is_none());
        assert!(req.count.is_none());
        assert!(req.offset.is_none());
    }

    #[test]
    fn test_recommend_request_rejects_garbage_offset() {
        let res = serde_json::from_str::<RecommendRequest>(r#"{"query":"x","offset":"many"}"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_chat_response_tolerates_null_content() {
        let resp: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#)
                .unwrap();
        assert!(resp.choices[0].message.content.is_none());
    }
}

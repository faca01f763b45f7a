use chrono::{DateTime, Utc};
use companion_storage::UploadedPart;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Parameters of a single-PUT signing request, read from the query string
/// (GET) or the JSON body (POST).
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignS3Params {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    /// Accepted in place of `contentType`.
    #[serde(rename = "type")]
    pub file_type: Option<String>,
    /// Upload metadata. On GET it may arrive as a JSON-encoded string.
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

impl SignS3Params {
    pub fn content_type(&self) -> Option<&str> {
        self.content_type
            .as_deref()
            .filter(|s| !s.is_empty())
            .or(self.file_type.as_deref())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedPut {
    pub method: &'static str,
    pub url: String,
    /// Always empty: the upload is a plain PUT, not a POST policy.
    #[schema(value_type = Object)]
    pub fields: Map<String, Value>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateMultipartRequest {
    pub filename: Option<Value>,
    #[serde(rename = "type")]
    pub file_type: Option<Value>,
    #[schema(value_type = Object)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MultipartCreated {
    pub key: String,
    pub upload_id: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SignedPart {
    pub url: String,
    /// Seconds until the URL expires.
    pub expires: u64,
}

/// A part as the browser client expects it, with S3 wire names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "PascalCase")]
pub struct PartDescriptor {
    pub part_number: i32,
    #[serde(rename = "ETag")]
    pub e_tag: String,
    pub size: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl From<UploadedPart> for PartDescriptor {
    fn from(part: UploadedPart) -> Self {
        Self {
            part_number: part.part_number,
            e_tag: part.e_tag,
            size: part.size,
            last_modified: part.last_modified,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteMultipartRequest {
    #[schema(value_type = Vec<Object>)]
    pub parts: Option<Value>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MultipartCompleted {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct KeyQuery {
    pub key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_part_descriptor_uses_s3_wire_names() {
        let part = PartDescriptor {
            part_number: 3,
            e_tag: "\"abc\"".into(),
            size: 5_242_880,
            last_modified: None,
        };
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["PartNumber"], 3);
        assert_eq!(json["ETag"], "\"abc\"");
        assert_eq!(json["Size"], 5_242_880);
        assert!(json.get("LastModified").is_none());
    }

    #[test]
    fn test_sign_params_accept_type_alias() {
        let params: SignS3Params =
            serde_json::from_str(r#"{"filename": "a.png", "type": "image/png"}"#).unwrap();
        assert_eq!(params.content_type(), Some("image/png"));

        let params: SignS3Params = serde_json::from_str(
            r#"{"filename": "a.png", "contentType": "image/jpeg", "type": "image/png"}"#,
        )
        .unwrap();
        assert_eq!(params.content_type(), Some("image/jpeg"));
    }
}

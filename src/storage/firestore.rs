//! Firestore REST adapter
//!
//! Implements [`DocumentStore`] over the Firestore v1 REST API. Documents are
//! plain JSON maps on our side; this module converts them to and from
//! Firestore's typed value encoding.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Map, Number, Value};

use crate::storage::backend::{Document, DocumentStore};
use crate::storage::{check_status, Result, StorageError};
use crate::types::StoreConfig;

/// Documents requested per page when scanning a collection
const PAGE_SIZE: u32 = 300;

/// Document store backed by the Firestore REST API
pub struct FirestoreStore {
    client: Client,
    /// `projects/{project}/databases/(default)/documents`
    database_path: String,
    base_url: String,
    api_key: Option<String>,
}

impl FirestoreStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            database_path: format!(
                "projects/{}/databases/(default)/documents",
                config.project_id
            ),
            base_url: format!("{}/v1", config.firestore_base_url),
            api_key: config.api_key.clone(),
        })
    }

    fn documents_url(&self) -> String {
        format!("{}/{}", self.base_url, self.database_path)
    }

    fn collection_url(&self, collection: &str) -> String {
        format!(
            "{}/{}",
            self.documents_url(),
            urlencoding::encode(collection)
        )
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{}/{}",
            self.collection_url(collection),
            urlencoding::encode(id)
        )
    }

    /// Full resource name, as used inside commit requests
    fn document_name(&self, collection: &str, id: &str) -> String {
        format!("{}/{}/{}", self.database_path, collection, id)
    }

    fn with_key(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.query(&[("key", key)]),
            None => request,
        }
    }

    async fn patch(
        &self,
        collection: &str,
        id: &str,
        fields: Document,
        mask: Option<Vec<String>>,
        must_exist: bool,
    ) -> Result<()> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(paths) = mask {
            query.extend(paths.into_iter().map(|p| ("updateMask.fieldPaths", p)));
        }
        if must_exist {
            query.push(("currentDocument.exists", "true".to_string()));
        }

        let request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&query)
            .json(&json!({ "fields": encode_fields(&fields) }));

        let response = self.with_key(request).send().await?;
        if must_exist && response.status() == StatusCode::NOT_FOUND {
            return Err(StorageError::NotFound(format!("{}/{}", collection, id)));
        }
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>> {
        let mut documents = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(self.collection_url(collection))
                .query(&[("pageSize", PAGE_SIZE.to_string())]);
            if let Some(token) = &page_token {
                request = request.query(&[("pageToken", token)]);
            }

            let response = check_status(self.with_key(request).send().await?).await?;
            let body: Value = response.json().await?;

            if let Some(page) = body.get("documents").and_then(Value::as_array) {
                for doc in page {
                    documents.push(decode_document(doc)?);
                }
            }

            page_token = body
                .get("nextPageToken")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string);
            if page_token.is_none() {
                break;
            }
        }

        tracing::debug!("Listed {} documents from '{}'", documents.len(), collection);
        Ok(documents)
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let request = self.client.get(self.document_url(collection, id));
        let response = self.with_key(request).send().await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let body: Value = check_status(response).await?.json().await?;
        decode_document(&body).map(Some)
    }

    async fn set(&self, collection: &str, id: &str, document: Document) -> Result<()> {
        self.patch(collection, id, document, None, false).await
    }

    async fn merge(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mask = fields.keys().map(|k| quote_field_path(k)).collect();
        self.patch(collection, id, fields, Some(mask), false).await
    }

    async fn update(&self, collection: &str, id: &str, fields: Document) -> Result<()> {
        let mask = fields.keys().map(|k| quote_field_path(k)).collect();
        self.patch(collection, id, fields, Some(mask), true).await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let request = self.client.delete(self.document_url(collection, id));
        check_status(self.with_key(request).send().await?).await?;
        Ok(())
    }

    async fn array_union(
        &self,
        collection: &str,
        id: &str,
        field: &str,
        values: Vec<Value>,
    ) -> Result<()> {
        // An empty mask leaves existing fields alone but still upserts the document
        let body = json!({
            "writes": [{
                "update": {
                    "name": self.document_name(collection, id),
                    "fields": {}
                },
                "updateMask": { "fieldPaths": [] },
                "updateTransforms": [{
                    "fieldPath": quote_field_path(field),
                    "appendMissingElements": {
                        "values": values.iter().map(encode_value).collect::<Vec<_>>()
                    }
                }]
            }]
        });

        let request = self
            .client
            .post(format!("{}:commit", self.documents_url()))
            .json(&body);
        check_status(self.with_key(request).send().await?).await?;
        Ok(())
    }
}

/// Backtick-quote a single field name so keys such as `2024_Nursing` are valid paths
pub fn quote_field_path(name: &str) -> String {
    let escaped = name.replace('\\', "\\\\").replace('`', "\\`");
    format!("`{}`", escaped)
}

pub fn encode_fields(fields: &Document) -> Value {
    Value::Object(
        fields
            .iter()
            .map(|(k, v)| (k.clone(), encode_value(v)))
            .collect(),
    )
}

/// JSON value to Firestore typed value
pub fn encode_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(b) => json!({ "booleanValue": b }),
        Value::Number(n) => match n.as_i64() {
            // integerValue travels as a string
            Some(i) => json!({ "integerValue": i.to_string() }),
            None => json!({ "doubleValue": n.as_f64().unwrap_or(0.0) }),
        },
        Value::String(s) => json!({ "stringValue": s }),
        Value::Array(items) => json!({
            "arrayValue": { "values": items.iter().map(encode_value).collect::<Vec<_>>() }
        }),
        Value::Object(map) => json!({ "mapValue": { "fields": encode_fields(map) } }),
    }
}

/// The `fields` of a Firestore document resource
pub fn decode_document(resource: &Value) -> Result<Document> {
    match resource.get("fields") {
        // Documents with no fields omit the key entirely
        None => Ok(Map::new()),
        Some(Value::Object(fields)) => fields
            .iter()
            .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
            .collect(),
        Some(other) => Err(StorageError::InvalidResponse(format!(
            "document fields are not an object: {}",
            other
        ))),
    }
}

/// Firestore typed value to JSON value
pub fn decode_value(value: &Value) -> Result<Value> {
    let (kind, inner) = value
        .as_object()
        .and_then(|obj| obj.iter().next())
        .ok_or_else(|| StorageError::InvalidResponse(format!("untyped value: {}", value)))?;

    let decoded = match kind.as_str() {
        "nullValue" => Value::Null,
        "booleanValue" => Value::Bool(inner.as_bool().unwrap_or(false)),
        "integerValue" => {
            let parsed = match inner {
                Value::String(s) => s.parse::<i64>().ok(),
                other => other.as_i64(),
            };
            let n = parsed.ok_or_else(|| {
                StorageError::InvalidResponse(format!("bad integerValue: {}", inner))
            })?;
            Value::Number(n.into())
        }
        "doubleValue" => match inner {
            // NaN and infinities arrive as strings and have no JSON form
            Value::Number(_) => inner.clone(),
            _ => Value::Null,
        },
        "stringValue" | "timestampValue" | "referenceValue" | "bytesValue" => inner.clone(),
        "geoPointValue" => json!({
            "latitude": inner.get("latitude").cloned().unwrap_or(Value::Number(Number::from(0))),
            "longitude": inner.get("longitude").cloned().unwrap_or(Value::Number(Number::from(0))),
        }),
        "arrayValue" => Value::Array(
            inner
                .get("values")
                .and_then(Value::as_array)
                .map(|items| items.iter().map(decode_value).collect::<Result<Vec<_>>>())
                .transpose()?
                .unwrap_or_default(),
        ),
        "mapValue" => Value::Object(match inner.get("fields") {
            Some(fields) => fields
                .as_object()
                .map(|map| {
                    map.iter()
                        .map(|(k, v)| Ok((k.clone(), decode_value(v)?)))
                        .collect::<Result<Map<_, _>>>()
                })
                .transpose()?
                .unwrap_or_default(),
            None => Map::new(),
        }),
        other => {
            return Err(StorageError::InvalidResponse(format!(
                "unknown value type: {}",
                other
            )))
        }
    };

    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const DOCS: &str = "/v1/projects/demo/databases/(default)/documents";

    fn config(server: &MockServer) -> StoreConfig {
        StoreConfig {
            project_id: "demo".to_string(),
            api_key: Some("test-key".to_string()),
            firestore_base_url: server.uri(),
            ..Default::default()
        }
    }

    fn doc(value: Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_value_codec() {
        let input = json!({
            "id": "a1",
            "createdAt": 1700000000000i64,
            "ratio": 0.5,
            "published": true,
            "note": null,
            "tags": ["x", "y"],
            "nested": {"k": "v"}
        });
        let encoded = encode_fields(&doc(input.clone()));

        assert_eq!(encoded["createdAt"], json!({"integerValue": "1700000000000"}));
        assert_eq!(encoded["ratio"], json!({"doubleValue": 0.5}));
        assert_eq!(
            encoded["tags"],
            json!({"arrayValue": {"values": [{"stringValue": "x"}, {"stringValue": "y"}]}})
        );

        let decoded = decode_document(&json!({ "fields": encoded })).unwrap();
        assert_eq!(Value::Object(decoded), input);
    }

    #[test]
    fn test_decode_server_only_types() {
        let fields = json!({
            "fields": {
                "at": {"timestampValue": "2024-01-01T00:00:00Z"},
                "where": {"geoPointValue": {"latitude": 1.5, "longitude": 2.5}},
                "empty": {"arrayValue": {}},
                "bare": {"mapValue": {}}
            }
        });
        let decoded = decode_document(&fields).unwrap();
        assert_eq!(decoded["at"], "2024-01-01T00:00:00Z");
        assert_eq!(decoded["where"], json!({"latitude": 1.5, "longitude": 2.5}));
        assert_eq!(decoded["empty"], json!([]));
        assert_eq!(decoded["bare"], json!({}));

        assert!(decode_document(&json!({"name": "x"})).unwrap().is_empty());
        assert!(decode_value(&json!({"mysteryValue": 1})).is_err());
    }

    #[test]
    fn test_quote_field_path() {
        assert_eq!(quote_field_path("2024_Nursing"), "`2024_Nursing`");
        assert_eq!(quote_field_path("a`b\\c"), "`a\\`b\\\\c`");
    }

    #[tokio::test]
    async fn test_get_missing_document_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/settings/admin", DOCS)))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "Document not found", "status": "NOT_FOUND"}
            })))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        assert!(store.get("settings", "admin").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_decodes_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/settings/admin", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name": "projects/demo/databases/(default)/documents/settings/admin",
                "fields": {"passwordHash": {"stringValue": "s3cret"}}
            })))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        let found = store.get("settings", "admin").await.unwrap().unwrap();
        assert_eq!(found["passwordHash"], "s3cret");
    }

    #[tokio::test]
    async fn test_list_follows_page_tokens() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/sheets", DOCS)))
            .and(query_param("pageToken", "next"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [{"fields": {"id": {"stringValue": "b"}}}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{}/sheets", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "documents": [{"fields": {"id": {"stringValue": "a"}}}],
                "nextPageToken": "next"
            })))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        let docs = store.list("sheets").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d["id"].as_str().unwrap()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_list_empty_collection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{}/sheets", DOCS)))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        assert!(store.list("sheets").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_merge_sends_field_mask() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/settings/admin", DOCS)))
            .and(query_param("updateMask.fieldPaths", "`passwordHash`"))
            .and(body_json(json!({
                "fields": {"passwordHash": {"stringValue": "new"}}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        store
            .merge("settings", "admin", doc(json!({"passwordHash": "new"})))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_set_sends_no_field_mask() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/sheets/a1", DOCS)))
            .and(body_json(json!({
                "fields": {
                    "id": {"stringValue": "a1"},
                    "createdAt": {"integerValue": "1000"}
                }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        store
            .set("sheets", "a1", doc(json!({"id": "a1", "createdAt": 1000})))
            .await
            .unwrap();

        // Without a mask the stored document is replaced rather than merged
        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 1);
        let params: Vec<String> = requests[0]
            .url
            .query_pairs()
            .map(|(name, _)| name.into_owned())
            .collect();
        assert_eq!(params, vec!["key".to_string()]);
    }

    #[tokio::test]
    async fn test_update_of_missing_document_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(format!("{}/sheets/zz", DOCS)))
            .and(query_param("currentDocument.exists", "true"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "error": {"code": 404, "message": "No document to update"}
            })))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        let result = store.update("sheets", "zz", doc(json!({"id": "zz"}))).await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_server_error_carries_message() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(format!("{}/sheets/a1", DOCS)))
            .respond_with(ResponseTemplate::new(403).set_body_json(json!({
                "error": {"code": 403, "message": "Missing or insufficient permissions."}
            })))
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        match store.delete("sheets", "a1").await {
            Err(StorageError::Server { status, message }) => {
                assert_eq!(status, 403);
                assert_eq!(message, "Missing or insufficient permissions.");
            }
            other => panic!("expected a server error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_array_union_commits_transform() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("{}:commit", DOCS)))
            .and(body_json(json!({
                "writes": [{
                    "update": {
                        "name": "projects/demo/databases/(default)/documents/settings/customSubjects",
                        "fields": {}
                    },
                    "updateMask": {"fieldPaths": []},
                    "updateTransforms": [{
                        "fieldPath": "`2024_Nursing`",
                        "appendMissingElements": {"values": [{"stringValue": "Pharmacology"}]}
                    }]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"writeResults": [{}]})))
            .expect(1)
            .mount(&server)
            .await;

        let store = FirestoreStore::new(&config(&server)).unwrap();
        store
            .array_union(
                "settings",
                "customSubjects",
                "2024_Nursing",
                vec![json!("Pharmacology")],
            )
            .await
            .unwrap();
    }
}

//! # 📡 THE ELASTICSEARCH BACKEND
//!
//! 🎬 COLD OPEN — INT. MALWARE LAB — 3:47 AM
//!
//! The scanner farm has been running all night. Forty thousand samples. Twelve plugins
//! each. Somewhere in a rack, a JVM is garbage collecting with the intensity of a
//! raccoon going through a dumpster. Every plugin result needs a home, and every home
//! is a document in the `malice` index.
//!
//! 🚀 This module speaks just enough of the Elasticsearch REST API to get those results
//! there: cluster health, index exists/create, get-by-id, create, and a scripted update
//! that swaps in one plugin's entry.
//! It does not search. It does not aggregate. It does not bulk. It upserts, one sample
//! at a time, and it tells you exactly which request went sideways when one does.
//!
//! ⚠️ Auth is tri-modal: API key, username+password, or "I hope anonymous works".
//! API key wins when both are set. This is not a democracy.
//!
//! 🦆

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, trace};

use crate::backends::{DocumentStore, VersionGuard};
use crate::common::{
    ClusterHealth, IndexStatus, PluginEntry, StoredDocument, UpsertOutcome, WriteResult,
};
use crate::endpoint::EndpointConfig;
use crate::errors::{Result, StoreError};
use crate::mapping::IndexSchema;

/// 📡 ElasticsearchConfig — "It's just Elasticsearch", she said, before the cluster went red.
///
/// The endpoint fields are flattened in, so `url` / `host` / `port` / `in_docker` sit
/// right next to the credentials in TOML.
#[derive(Debug, Clone, Deserialize)]
pub struct ElasticsearchConfig {
    /// 📡 Where the cluster lives. See [`EndpointConfig`] for the precedence rules.
    #[serde(flatten)]
    pub endpoint: EndpointConfig,
    /// 🔒 Username for basic auth. Optional, like flossing.
    #[serde(default)]
    pub username: Option<String>,
    /// 🔒 Password. "password123" is not a password. It is a confession.
    #[serde(default)]
    pub password: Option<String>,
    /// 🔒 API key auth — the velvet rope variant. Beats basic auth when both are set.
    #[serde(default)]
    pub api_key: Option<String>,
    /// ⏱️ How long to wait for a TCP handshake before declaring the cluster ghosted us.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// ⏱️ How long a single request may take, end to end.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

// 🔧 10 seconds: if ES can't handshake in 10 seconds, it's not having a good time and neither are we.
fn default_connect_timeout_secs() -> u64 {
    10
}

// 🔧 30 seconds: generous, because single-doc requests should never need it.
fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ElasticsearchConfig {
    fn default() -> Self {
        Self {
            endpoint: EndpointConfig::default(),
            username: None,
            password: None,
            api_key: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// 📦 The HTTP-speaking document store.
///
/// Holds one `reqwest::Client` for its whole life. Connection pooling is the client's job.
/// Spinning up a new client per request is the networking equivalent of buying a new car
/// every time you need groceries.
#[derive(Debug, Clone)]
pub struct ElasticsearchStore {
    client: reqwest::Client,
    base: Url,
    config: ElasticsearchConfig,
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version", default)]
    version: Option<u64>,
    #[serde(rename = "_seq_no", default)]
    seq_no: Option<u64>,
    #[serde(rename = "_primary_term", default)]
    primary_term: Option<u64>,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source", default)]
    source: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct WriteResponse {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_version", default)]
    version: Option<u64>,
    result: String,
}

#[derive(Debug, Deserialize)]
struct CreateIndexResponse {
    #[serde(default)]
    acknowledged: bool,
}

impl ElasticsearchStore {
    /// 🚀 Resolve the endpoint and build the HTTP client. No request is sent yet;
    /// that's what `cluster_health` is for.
    pub fn new(config: ElasticsearchConfig) -> Result<Self> {
        let resolved = config.endpoint.resolve()?;
        let base = Url::parse(&resolved).map_err(|e| {
            StoreError::Config(format!(
                "'{resolved}' is not a URL we can talk to ({e}). Include a scheme, a host, and hope."
            ))
        })?;
        if base.cannot_be_a_base() {
            return Err(StoreError::Config(format!(
                "'{resolved}' can't have paths appended to it. Elasticsearch lives at paths."
            )));
        }

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| {
                StoreError::Config(format!(
                    "the HTTP client refused to be born ({e}). Probably TLS. It's always TLS."
                ))
            })?;

        debug!("📡 Elasticsearch backend aimed at {}", base);
        Ok(Self {
            client,
            base,
            config,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    // 🔧 base + percent-encoded path segments. Sample IDs are hashes, but we don't bet on it.
    fn url_for(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut path = url.path_segments_mut().map_err(|_| {
                StoreError::Config(format!("'{}' can't have paths appended to it", self.base))
            })?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    // 🔒 api_key beats basic auth in this club
    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        if let Some(ref api_key) = self.config.api_key {
            request.header("Authorization", format!("ApiKey {}", api_key))
        } else if let Some(ref username) = self.config.username {
            request.basic_auth(username, self.config.password.as_ref())
        } else {
            request
        }
    }

    async fn dispatch(
        &self,
        op: &'static str,
        target: &str,
        request: RequestBuilder,
    ) -> Result<Response> {
        trace!(op, resource = target, "📡 sending request");
        self.authorize(request)
            .send()
            .await
            .map_err(|e| StoreError::connectivity(op, target, e))
    }
}

// 💀 The store answered, the answer was bad. Grab the body, it usually explains which shard is sad.
async fn bad_news(op: &'static str, target: &str, response: Response) -> StoreError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    StoreError::protocol(op, target, Some(status), body)
}

async fn parse_body<T: DeserializeOwned>(
    op: &'static str,
    target: &str,
    response: Response,
) -> Result<T> {
    let status = response.status().as_u16();
    response.json::<T>().await.map_err(|e| {
        StoreError::protocol(op, target, Some(status), format!("unparseable response body: {e}"))
    })
}

fn into_outcome(op: &'static str, target: &str, write: WriteResponse) -> Result<UpsertOutcome> {
    let result = match write.result.as_str() {
        "created" => WriteResult::Created,
        "updated" => WriteResult::Updated,
        "noop" => WriteResult::Noop,
        other => {
            return Err(StoreError::protocol(
                op,
                target,
                None,
                format!("unexpected write result '{other}'"),
            ));
        }
    };
    Ok(UpsertOutcome {
        id: write.id,
        result,
        version: write.version,
    })
}

#[async_trait]
impl DocumentStore for ElasticsearchStore {
    /// 🩺 `GET /_cluster/health`. 2xx and parseable, or it didn't happen.
    async fn cluster_health(&self) -> Result<ClusterHealth> {
        const OP: &str = "cluster health";
        let target = self.base.as_str();
        let url = self.url_for(&["_cluster", "health"])?;
        let response = self.dispatch(OP, target, self.client.get(url)).await?;
        if !response.status().is_success() {
            return Err(bad_news(OP, target, response).await);
        }
        parse_body(OP, target, response).await
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        const OP: &str = "index exists";
        let url = self.url_for(&[index])?;
        let response = self.dispatch(OP, index, self.client.head(url)).await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(bad_news(OP, index, response).await),
        }
    }

    async fn create_index(&self, index: &str, schema: &IndexSchema) -> Result<IndexStatus> {
        const OP: &str = "create index";
        let url = self.url_for(&[index])?;
        let request = self.client.put(url).json(&schema.to_body());
        let response = self.dispatch(OP, index, request).await?;
        let status = response.status();

        if status == StatusCode::BAD_REQUEST {
            // 🏁 somebody else created it between our HEAD and our PUT. Same outcome, less work.
            let body = response.text().await.unwrap_or_default();
            if body.contains("resource_already_exists_exception") {
                debug!("🏁 index '{}' appeared while we were creating it", index);
                return Ok(IndexStatus::AlreadyExists);
            }
            return Err(StoreError::protocol(OP, index, Some(status.as_u16()), body));
        }
        if !status.is_success() {
            return Err(bad_news(OP, index, response).await);
        }

        let created: CreateIndexResponse = parse_body(OP, index, response).await?;
        Ok(if created.acknowledged {
            IndexStatus::Created
        } else {
            IndexStatus::CreatedUnacknowledged
        })
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<StoredDocument>> {
        const OP: &str = "get document";
        let target = format!("{index}/{id}");
        let url = self.url_for(&[index, "_doc", id])?;
        let response = self.dispatch(OP, &target, self.client.get(url)).await?;

        // 🔍 404 covers both "no such doc" and "no such index". Either way: not found, not an error.
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(bad_news(OP, &target, response).await);
        }

        let got: GetResponse = parse_body(OP, &target, response).await?;
        if !got.found {
            return Ok(None);
        }
        Ok(Some(StoredDocument {
            id: got.id,
            version: got.version,
            seq_no: got.seq_no,
            primary_term: got.primary_term,
            source: got.source.unwrap_or(Value::Null),
        }))
    }

    async fn create_document(
        &self,
        index: &str,
        id: Option<&str>,
        document: &Value,
    ) -> Result<UpsertOutcome> {
        const OP: &str = "create document";
        let (target, request) = match id {
            Some(id) => (
                format!("{index}/{id}"),
                self.client.put(self.url_for(&[index, "_create", id])?),
            ),
            None => (
                format!("{index}/<server-assigned>"),
                self.client.post(self.url_for(&[index, "_doc"])?),
            ),
        };

        let response = self.dispatch(OP, &target, request.json(document)).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::conflict(OP, target)),
            status if status.is_success() => {
                let written: WriteResponse = parse_body(OP, &target, response).await?;
                into_outcome(OP, &target, written)
            }
            _ => Err(bad_news(OP, &target, response).await),
        }
    }

    /// 🔄 `POST /{index}/_update/{id}` with a painless script that drops the payload in at
    /// `plugins.<category>.<name>`. A `{"doc": ...}` partial update would merge *into* the old
    /// payload and keep keys the plugin no longer reports, so the script replaces the entry whole.
    async fn put_plugin_entry(
        &self,
        index: &str,
        id: &str,
        entry: &PluginEntry,
        guard: Option<VersionGuard>,
    ) -> Result<UpsertOutcome> {
        const OP: &str = "put plugin entry";
        let target = format!("{index}/{id}");
        let mut url = self.url_for(&[index, "_update", id])?;
        if let Some(guard) = guard {
            url.query_pairs_mut()
                .append_pair("if_seq_no", &guard.seq_no.to_string())
                .append_pair("if_primary_term", &guard.primary_term.to_string());
        }

        let request = self.client.post(url).json(&plugin_entry_script(entry));
        let response = self.dispatch(OP, &target, request).await?;
        match response.status() {
            StatusCode::CONFLICT => Err(StoreError::conflict(OP, target)),
            status if status.is_success() => {
                let written: WriteResponse = parse_body(OP, &target, response).await?;
                into_outcome(OP, &target, written)
            }
            _ => Err(bad_news(OP, &target, response).await),
        }
    }
}

// 🧪 non-map `plugins` or category slots (legacy placeholders, nulls) get a fresh map first
const PUT_PLUGIN_ENTRY_SCRIPT: &str = "\
if (!(ctx._source.plugins instanceof Map)) { ctx._source.plugins = new HashMap(); } \
if (!(ctx._source.plugins[params.category] instanceof Map)) { ctx._source.plugins[params.category] = new HashMap(); } \
ctx._source.plugins[params.category][params.name] = params.payload; \
ctx._source.scan_date = params.scan_date;";

fn plugin_entry_script(entry: &PluginEntry) -> Value {
    json!({
        "script": {
            "lang": "painless",
            "source": PUT_PLUGIN_ENTRY_SCRIPT,
            "params": {
                "category": entry.category,
                "name": entry.name,
                "payload": entry.payload,
                "scan_date": entry.scan_date,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::HealthStatus;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn store_for(server: &MockServer) -> ElasticsearchStore {
        let config = ElasticsearchConfig {
            endpoint: EndpointConfig {
                url: Some(server.uri()),
                ..Default::default()
            },
            ..Default::default()
        };
        ElasticsearchStore::new(config).expect("💀 store should build against the mock server")
    }

    #[tokio::test]
    async fn the_one_where_the_cluster_says_its_feeling_green() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"cluster_name": "malice", "status": "green", "number_of_nodes": 1})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let the_health = store_for(&server)
            .cluster_health()
            .await
            .expect("💀 healthy cluster should report healthy");
        assert_eq!(the_health.status, HealthStatus::Green);
        assert_eq!(the_health.cluster_name, "malice");
    }

    #[tokio::test]
    async fn the_one_where_a_503_is_not_a_health_certificate() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(503).set_body_string("master_not_discovered"))
            .mount(&server)
            .await;

        let the_verdict = store_for(&server).cluster_health().await;
        match the_verdict {
            Err(StoreError::Protocol { status, detail, .. }) => {
                assert_eq!(status, Some(503));
                assert!(detail.contains("master_not_discovered"));
            }
            other => panic!("💀 expected a protocol error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn the_one_where_the_health_payload_is_modern_art() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>it works!</html>"))
            .mount(&server)
            .await;

        let the_verdict = store_for(&server).cluster_health().await;
        assert!(matches!(the_verdict, Err(StoreError::Protocol { status: Some(200), .. })));
    }

    #[tokio::test]
    async fn the_one_where_nobody_is_listening_on_port_one() {
        let config = ElasticsearchConfig {
            endpoint: EndpointConfig {
                url: Some("http://127.0.0.1:1".into()),
                ..Default::default()
            },
            connect_timeout_secs: 1,
            request_timeout_secs: 1,
            ..Default::default()
        };
        let the_lonely_store = ElasticsearchStore::new(config).expect("💀 store should build");
        let the_verdict = the_lonely_store.cluster_health().await;
        assert!(matches!(the_verdict, Err(StoreError::Connectivity { op: "cluster health", .. })));
    }

    #[tokio::test]
    async fn the_one_where_index_existence_is_a_yes_or_no_question() {
        let server = MockServer::start().await;
        Mock::given(method("HEAD"))
            .and(path("/malice"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .and(path("/ghost-index"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let store = store_for(&server);
        assert!(store.index_exists("malice").await.expect("💀 HEAD 200"));
        assert!(!store.index_exists("ghost-index").await.expect("💀 HEAD 404"));
    }

    #[tokio::test]
    async fn the_one_where_index_creation_sends_the_schema_and_gets_ghosted() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/malice"))
            .and(body_json(IndexSchema::samples().to_body()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"acknowledged": false, "shards_acknowledged": false, "index": "malice"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let the_status = store_for(&server)
            .create_index("malice", &IndexSchema::samples())
            .await
            .expect("💀 unacknowledged creation is still a success");
        assert_eq!(the_status, IndexStatus::CreatedUnacknowledged);
    }

    #[tokio::test]
    async fn the_one_where_someone_else_built_the_index_first() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/malice"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"type": "resource_already_exists_exception", "reason": "index [malice] already exists"},
                "status": 400
            })))
            .mount(&server)
            .await;

        let the_status = store_for(&server)
            .create_index("malice", &IndexSchema::samples())
            .await
            .expect("💀 already-exists race should be a no-op");
        assert_eq!(the_status, IndexStatus::AlreadyExists);
    }

    #[tokio::test]
    async fn the_one_where_a_missing_doc_is_a_branch_not_a_tragedy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/malice/_doc/abc123"))
            .respond_with(
                ResponseTemplate::new(404)
                    .set_body_json(json!({"_index": "malice", "_id": "abc123", "found": false})),
            )
            .mount(&server)
            .await;

        let the_doc = store_for(&server)
            .get_document("malice", "abc123")
            .await
            .expect("💀 404 should be Ok(None)");
        assert!(the_doc.is_none());
    }

    #[tokio::test]
    async fn the_one_where_a_found_doc_brings_its_version_papers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/malice/_doc/abc123"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "malice",
                "_id": "abc123",
                "_version": 4,
                "_seq_no": 7,
                "_primary_term": 1,
                "found": true,
                "_source": {"plugins": {"av": {"clamav": {"infected": false}}}}
            })))
            .mount(&server)
            .await;

        let the_doc = store_for(&server)
            .get_document("malice", "abc123")
            .await
            .expect("💀 get should succeed")
            .expect("💀 doc should be found");
        assert_eq!(the_doc.version, Some(4));
        assert_eq!(the_doc.seq_no, Some(7));
        assert_eq!(the_doc.primary_term, Some(1));
        assert_eq!(
            the_doc.plugins().and_then(|p| p.get("av")),
            Some(&json!({"clamav": {"infected": false}}))
        );
    }

    #[tokio::test]
    async fn the_one_where_create_pins_the_id_and_refuses_to_overwrite() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/malice/_create/abc123"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_index": "malice", "_id": "abc123", "_version": 1, "result": "created"
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/malice/_create/abc123"))
            .respond_with(ResponseTemplate::new(409).set_body_json(json!({
                "error": {"type": "version_conflict_engine_exception"}, "status": 409
            })))
            .mount(&server)
            .await;

        let store = store_for(&server);
        let the_doc = json!({"plugins": {}});
        let first = store
            .create_document("malice", Some("abc123"), &the_doc)
            .await
            .expect("💀 first create should land");
        assert_eq!(
            first,
            UpsertOutcome {
                id: "abc123".into(),
                result: WriteResult::Created,
                version: Some(1)
            }
        );

        let second = store.create_document("malice", Some("abc123"), &the_doc).await;
        assert!(matches!(second, Err(StoreError::Conflict { op: "create document", .. })));
    }

    #[tokio::test]
    async fn the_one_where_the_server_names_the_baby() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/malice/_doc"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "_index": "malice", "_id": "AVdfQ7Ufx2vUEcJdYX65", "_version": 1, "result": "created"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let the_outcome = store_for(&server)
            .create_document("malice", None, &json!({"file": {"name": "evil.exe"}}))
            .await
            .expect("💀 server-assigned create should land");
        assert_eq!(the_outcome.id, "AVdfQ7Ufx2vUEcJdYX65");
    }

    fn the_entry() -> PluginEntry {
        PluginEntry {
            category: "intel".into(),
            name: "vt".into(),
            payload: json!({"positives": 3}),
            scan_date: "2016-09-25T00:00:00.000Z".into(),
        }
    }

    #[tokio::test]
    async fn the_one_where_the_update_carries_its_cas_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/malice/_update/abc123"))
            .and(query_param("if_seq_no", "7"))
            .and(query_param("if_primary_term", "1"))
            .and(body_json(plugin_entry_script(&the_entry())))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "_index": "malice", "_id": "abc123", "_version": 5, "result": "updated"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let the_outcome = store_for(&server)
            .put_plugin_entry(
                "malice",
                "abc123",
                &the_entry(),
                Some(VersionGuard {
                    seq_no: 7,
                    primary_term: 1,
                }),
            )
            .await
            .expect("💀 guarded update should land");
        assert_eq!(the_outcome.result, WriteResult::Updated);
        assert_eq!(the_outcome.version, Some(5));
    }

    #[test]
    fn the_one_where_the_script_swaps_the_entry_instead_of_merging_into_it() {
        let the_body = plugin_entry_script(&PluginEntry {
            category: "av".into(),
            name: "clamav".into(),
            payload: json!({"infected": false}),
            scan_date: "2016-09-25T00:00:00.000Z".into(),
        });

        assert!(the_body.get("doc").is_none(), "a doc merge would keep stale keys");
        let the_params = &the_body["script"]["params"];
        assert_eq!(the_params["category"], "av");
        assert_eq!(the_params["name"], "clamav");
        assert_eq!(the_params["payload"], json!({"infected": false}));
        assert_eq!(the_params["scan_date"], "2016-09-25T00:00:00.000Z");

        let the_source = the_body["script"]["source"]
            .as_str()
            .expect("💀 script source should be a string");
        assert!(the_source.contains("ctx._source.plugins[params.category][params.name] = params.payload"));
    }

    #[tokio::test]
    async fn the_one_where_a_stale_guard_loses_the_race() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/malice/_update/abc123"))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;

        let the_verdict = store_for(&server)
            .put_plugin_entry(
                "malice",
                "abc123",
                &the_entry(),
                Some(VersionGuard {
                    seq_no: 1,
                    primary_term: 1,
                }),
            )
            .await;
        assert!(matches!(the_verdict, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn the_one_where_the_api_key_gets_past_the_bouncer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/_cluster/health"))
            .and(header("Authorization", "ApiKey s3cr3t"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "yellow"})))
            .expect(1)
            .mount(&server)
            .await;

        let config = ElasticsearchConfig {
            endpoint: EndpointConfig {
                url: Some(server.uri()),
                ..Default::default()
            },
            username: Some("elastic".into()),
            password: Some("changeme".into()),
            api_key: Some("s3cr3t".into()),
            ..Default::default()
        };
        let the_health = ElasticsearchStore::new(config)
            .expect("💀 store should build")
            .cluster_health()
            .await
            .expect("💀 api key should be accepted");
        assert_eq!(the_health.status, HealthStatus::Yellow);
    }
}

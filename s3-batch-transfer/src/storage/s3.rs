/*
 * Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::http::{HttpRequest, HttpResponse};
use aws_sdk_s3::config::{
    Credentials, Region, RequestChecksumCalculation, ResponseChecksumValidation,
};
use aws_sdk_s3::error::SdkError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::MetadataDirective;
use bytes::Bytes;
use futures_util::StreamExt;
use tokio::sync::Mutex;

use crate::error::BoxError;
use crate::storage::{
    ObjectBody, ObjectResponse, StorageClient, COPY_SOURCE_HEADER, METADATA_DIRECTIVE_HEADER,
};
use crate::types::Headers;
use crate::Config;

const CREDENTIALS_PROVIDER: &str = "s3-batch-transfer";

/// Headers the SDK sets itself from typed request fields
const RESERVED_HEADERS: &[&str] = &[
    "content-length",
    COPY_SOURCE_HEADER,
    METADATA_DIRECTIVE_HEADER,
];

/// Connection settings that require a distinct SDK client
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    endpoint_url: Option<String>,
    region: String,
    access_key_id: String,
    secret_access_key: String,
}

impl ClientKey {
    fn new(config: &Config) -> Self {
        Self {
            endpoint_url: config.endpoint_url(),
            region: config.region().to_owned(),
            access_key_id: config.access_key_id().unwrap_or_default().to_owned(),
            secret_access_key: config.secret_access_key().unwrap_or_default().to_owned(),
        }
    }
}

/// [`StorageClient`] backed by the AWS SDK for S3.
///
/// Clients are created lazily for each distinct combination of endpoint, region and
/// credentials and reused for the rest of the batch. Custom endpoints are addressed
/// path style, which is what most S3 compatible servers expect.
#[derive(Debug, Clone, Default)]
pub struct S3StorageClient {
    clients: Arc<Mutex<HashMap<ClientKey, aws_sdk_s3::Client>>>,
    fixed: Option<aws_sdk_s3::Client>,
}

impl S3StorageClient {
    /// Create a storage client that builds SDK clients from each transfer's [`Config`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage client that sends every request through `client`.
    ///
    /// Endpoint, region and credentials of the transfer config are ignored; the bucket still
    /// comes from the config.
    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self {
            clients: Default::default(),
            fixed: Some(client),
        }
    }

    async fn client_for(&self, config: &Config) -> aws_sdk_s3::Client {
        if let Some(client) = &self.fixed {
            return client.clone();
        }

        let key = ClientKey::new(config);
        let mut clients = self.clients.lock().await;
        if let Some(client) = clients.get(&key) {
            return client.clone();
        }

        tracing::debug!(
            "creating S3 client for endpoint {:?} in {}",
            key.endpoint_url,
            key.region
        );
        let credentials = Credentials::new(
            key.access_key_id.clone(),
            key.secret_access_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let shared_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(key.region.clone()))
            .credentials_provider(credentials)
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared_config)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .response_checksum_validation(ResponseChecksumValidation::WhenRequired);
        if let Some(endpoint_url) = &key.endpoint_url {
            builder = builder.endpoint_url(endpoint_url).force_path_style(true);
        }

        let client = aws_sdk_s3::Client::from_conf(builder.build());
        clients.insert(key, client.clone());
        client
    }
}

fn bucket(config: &Config) -> Result<&str, BoxError> {
    config
        .bucket()
        .filter(|bucket| !bucket.is_empty())
        .ok_or_else(|| "no bucket configured".into())
}

/// Returns a request mutator that sets every non-reserved header in `headers`
fn apply_headers(headers: &Headers) -> impl Fn(&mut HttpRequest) + Send + Sync + 'static {
    let headers: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| !RESERVED_HEADERS.contains(name))
        .map(|(name, value)| (name.to_owned(), value.to_owned()))
        .collect();

    move |request: &mut HttpRequest| {
        for (name, value) in &headers {
            if let Err(err) = request
                .headers_mut()
                .try_insert(name.clone(), value.clone())
            {
                tracing::warn!("dropping invalid request header {name}: {err}");
            }
        }
    }
}

/// Map an SDK failure back to the raw status the backend answered with.
///
/// Failures without a response (dispatch, timeout, construction) are returned as errors.
fn status_from_error<E>(err: SdkError<E, HttpResponse>) -> Result<ObjectResponse, BoxError>
where
    E: std::error::Error + Send + Sync + 'static,
{
    match err.raw_response().map(|resp| resp.status().as_u16()) {
        Some(status) => {
            tracing::debug!("request failed with status {status}");
            Ok(ObjectResponse::new(status))
        }
        None => Err(err.into()),
    }
}

fn into_body(body: ByteStream) -> ObjectBody {
    futures_util::stream::unfold(body, |mut body| async move {
        match body.next().await {
            Some(Ok(chunk)) => Some((Ok(chunk), body)),
            Some(Err(err)) => Some((Err(BoxError::from(err)), body)),
            None => None,
        }
    })
    .boxed()
}

fn with_optional_header(resp: ObjectResponse, name: &str, value: Option<&str>) -> ObjectResponse {
    match value {
        Some(value) => resp.with_header(name, value),
        None => resp,
    }
}

#[async_trait]
impl StorageClient for S3StorageClient {
    #[tracing::instrument(skip_all, level = "debug", fields(key = key))]
    async fn put_object(
        &self,
        config: &Config,
        key: &str,
        body: Bytes,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError> {
        let client = self.client_for(config).await;
        let result = client
            .put_object()
            .bucket(bucket(config)?)
            .key(key)
            .body(ByteStream::from(body))
            .customize()
            .mutate_request(apply_headers(headers))
            .send()
            .await;

        match result {
            Ok(output) => Ok(with_optional_header(
                ObjectResponse::new(200),
                "etag",
                output.e_tag(),
            )),
            Err(err) => status_from_error(err),
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(key = key))]
    async fn get_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError> {
        let client = self.client_for(config).await;
        let result = client
            .get_object()
            .bucket(bucket(config)?)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => {
                let resp = with_optional_header(ObjectResponse::new(200), "etag", output.e_tag());
                let resp = with_optional_header(resp, "content-type", output.content_type());
                let resp =
                    with_optional_header(resp, "content-encoding", output.content_encoding());
                Ok(resp.with_body(into_body(output.body)))
            }
            Err(err) => status_from_error(err),
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(source = source, key = key))]
    async fn copy_object(
        &self,
        config: &Config,
        source: &str,
        key: &str,
        headers: &Headers,
    ) -> Result<ObjectResponse, BoxError> {
        let client = self.client_for(config).await;
        let bucket = bucket(config)?;
        let copy_source = match headers.get(COPY_SOURCE_HEADER) {
            Some(copy_source) => copy_source.to_owned(),
            None => crate::operation::copy::copy_source(bucket, source),
        };

        let mut request = client
            .copy_object()
            .bucket(bucket)
            .key(key)
            .copy_source(copy_source);
        if headers
            .get(METADATA_DIRECTIVE_HEADER)
            .is_some_and(|directive| directive.eq_ignore_ascii_case("REPLACE"))
        {
            request = request.metadata_directive(MetadataDirective::Replace);
        }

        let result = request
            .customize()
            .mutate_request(apply_headers(headers))
            .send()
            .await;

        match result {
            Ok(output) => Ok(with_optional_header(
                ObjectResponse::new(200),
                "etag",
                output.copy_object_result().and_then(|r| r.e_tag()),
            )),
            Err(err) => status_from_error(err),
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(key = key))]
    async fn delete_object(
        &self,
        config: &Config,
        key: &str,
    ) -> Result<ObjectResponse, BoxError> {
        let client = self.client_for(config).await;
        let result = client
            .delete_object()
            .bucket(bucket(config)?)
            .key(key)
            .send()
            .await;

        match result {
            Ok(_) => Ok(ObjectResponse::new(204)),
            Err(err) => status_from_error(err),
        }
    }

    #[tracing::instrument(skip_all, level = "debug", fields(key = key))]
    async fn head_object(&self, config: &Config, key: &str) -> Result<ObjectResponse, BoxError> {
        let client = self.client_for(config).await;
        let result = client
            .head_object()
            .bucket(bucket(config)?)
            .key(key)
            .send()
            .await;

        match result {
            Ok(output) => Ok(with_optional_header(
                ObjectResponse::new(200),
                "etag",
                output.e_tag(),
            )),
            Err(err) => status_from_error(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::copy_object::CopyObjectOutput;
    use aws_sdk_s3::operation::delete_object::DeleteObjectOutput;
    use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
    use aws_sdk_s3::operation::head_object::HeadObjectOutput;
    use aws_sdk_s3::operation::put_object::PutObjectOutput;
    use aws_sdk_s3::types::CopyObjectResult;
    use aws_smithy_mocks_experimental::{mock, mock_client, RuleMode};
    use aws_smithy_runtime_api::http::StatusCode;
    use aws_smithy_types::body::SdkBody;
    use aws_smithy_types::error::ErrorMetadata;

    fn test_config() -> Config {
        Config::builder()
            .access_key_id("abc")
            .secret_access_key("def")
            .bucket("test-bucket")
            .build()
    }

    #[tokio::test]
    async fn test_put_object_returns_etag() {
        let put_object = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(|input| {
                input.bucket() == Some("test-bucket") && input.key() == Some("a.txt")
            })
            .then_output(|| {
                PutObjectOutput::builder()
                    .e_tag("\"5eb63bbbe01eeed093cb22bb8f5acdc3\"")
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::MatchAny, &[&put_object]);
        let storage = S3StorageClient::from_client(client);

        let headers: Headers = [("x-amz-acl", "public-read")].into_iter().collect();
        let resp = storage
            .put_object(
                &test_config(),
                "a.txt",
                Bytes::from_static(b"hello world"),
                &headers,
            )
            .await
            .unwrap();
        assert_eq!(200, resp.status());
        assert_eq!(Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""), resp.etag());
    }

    #[tokio::test]
    async fn test_get_object_streams_body() {
        let get_object = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(|input| input.key() == Some("a.txt"))
            .then_output(|| {
                GetObjectOutput::builder()
                    .e_tag("\"5eb63bbbe01eeed093cb22bb8f5acdc3\"")
                    .body(ByteStream::from_static(b"hello world"))
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::MatchAny, &[&get_object]);
        let storage = S3StorageClient::from_client(client);

        let mut resp = storage.get_object(&test_config(), "a.txt").await.unwrap();
        assert_eq!(200, resp.status());
        assert_eq!(Some("\"5eb63bbbe01eeed093cb22bb8f5acdc3\""), resp.etag());

        let mut body = resp.take_body().unwrap();
        let mut data = Vec::new();
        while let Some(chunk) = body.next().await {
            data.extend_from_slice(&chunk.unwrap());
        }
        assert_eq!(b"hello world", &data[..]);
    }

    #[tokio::test]
    async fn test_copy_object_replaces_metadata() {
        let copy_object = mock!(aws_sdk_s3::Client::copy_object)
            .match_requests(|input| {
                input.copy_source() == Some("/test-bucket/a.txt")
                    && input.key() == Some("b.txt")
                    && input.metadata_directive() == Some(&MetadataDirective::Replace)
            })
            .then_output(|| {
                CopyObjectOutput::builder()
                    .copy_object_result(CopyObjectResult::builder().e_tag("\"abc\"").build())
                    .build()
            });
        let client = mock_client!(aws_sdk_s3, RuleMode::MatchAny, &[&copy_object]);
        let storage = S3StorageClient::from_client(client);

        let headers: Headers = [
            ("content-length", "0"),
            (COPY_SOURCE_HEADER, "/test-bucket/a.txt"),
            (METADATA_DIRECTIVE_HEADER, "REPLACE"),
            ("cache-control", "max-age=60"),
        ]
        .into_iter()
        .collect();
        let resp = storage
            .copy_object(&test_config(), "a.txt", "b.txt", &headers)
            .await
            .unwrap();
        assert_eq!(200, resp.status());
        assert_eq!(Some("\"abc\""), resp.etag());
    }

    #[tokio::test]
    async fn test_delete_object_reports_no_content() {
        let delete_object = mock!(aws_sdk_s3::Client::delete_object)
            .match_requests(|input| input.key() == Some("old.txt"))
            .then_output(|| DeleteObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::MatchAny, &[&delete_object]);
        let storage = S3StorageClient::from_client(client);

        let resp = storage
            .delete_object(&test_config(), "old.txt")
            .await
            .unwrap();
        assert_eq!(204, resp.status());
    }

    #[tokio::test]
    async fn test_missing_bucket_is_an_error() {
        let head_object = mock!(aws_sdk_s3::Client::head_object)
            .then_output(|| HeadObjectOutput::builder().build());
        let client = mock_client!(aws_sdk_s3, RuleMode::MatchAny, &[&head_object]);
        let storage = S3StorageClient::from_client(client);
        let config = Config::builder().access_key_id("abc").build();
        storage.head_object(&config, "a.txt").await.unwrap_err();
    }

    #[test]
    fn test_service_error_maps_to_raw_status() {
        let err = SdkError::service_error(
            GetObjectError::generic(ErrorMetadata::builder().code("NoSuchKey").build()),
            HttpResponse::new(StatusCode::try_from(404).unwrap(), SdkBody::empty()),
        );
        let resp = status_from_error(err).unwrap();
        assert_eq!(404, resp.status());
        assert!(!resp.is_success());
    }

    #[test]
    fn test_error_without_response_is_propagated() {
        let err: SdkError<GetObjectError, HttpResponse> = SdkError::timeout_error("too slow");
        status_from_error(err).unwrap_err();
    }

    #[test]
    fn test_reserved_headers_are_not_forwarded() {
        let headers: Headers = [
            ("content-length", "0"),
            (COPY_SOURCE_HEADER, "/b/k"),
            ("x-amz-acl", "private"),
        ]
        .into_iter()
        .collect();
        let mutate = apply_headers(&headers);
        let mut request = HttpRequest::empty();
        mutate(&mut request);
        assert_eq!(Some("private"), request.headers().get("x-amz-acl"));
        assert_eq!(None, request.headers().get(COPY_SOURCE_HEADER));
        assert_eq!(None, request.headers().get("content-length"));
    }

    #[tokio::test]
    async fn test_clients_are_cached_per_connection() {
        let storage = S3StorageClient::new();
        let config = test_config();
        storage.client_for(&config).await;
        storage.client_for(&config).await;
        assert_eq!(1, storage.clients.lock().await.len());

        let other = Config::builder()
            .access_key_id("abc")
            .secret_access_key("def")
            .bucket("test-bucket")
            .endpoint("127.0.0.1")
            .port(9000)
            .secure(false)
            .build();
        storage.client_for(&other).await;
        assert_eq!(2, storage.clients.lock().await.len());
    }
}

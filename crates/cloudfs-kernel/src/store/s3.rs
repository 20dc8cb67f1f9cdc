//! S3 object store backed by the `object_store` crate.

use std::io;
use std::time::SystemTime;

use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use http::{HeaderMap, HeaderValue};
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path as StorePath;
use object_store::{
    Attribute, Attributes, ClientOptions, ObjectStore as _, PutOptions as S3PutOptions, PutPayload,
};
use tokio_util::io::StreamReader;

use super::error::{StoreError, StoreOp, StoreResult};
use super::ops::ObjectStore;
use super::types::{
    GetObjectOutput, HeadObjectOutput, ListOutput, ObjectAcl, ObjectInfo, PutOptions,
};
use crate::config::CloudFsConfig;

/// Client for one S3 (or S3-compatible) bucket.
///
/// The canned ACL is sent as a client-wide default header, so it is fixed
/// at construction by [`CloudFsConfig::public_read`]. Listing follows
/// continuation tokens, so results are not capped at one page.
#[derive(Debug)]
pub struct S3Store {
    inner: AmazonS3,
    bucket: String,
    acl: ObjectAcl,
}

impl S3Store {
    /// Build a client from explicit configuration.
    pub fn from_config(config: &CloudFsConfig) -> StoreResult<Self> {
        let acl = if config.public_read {
            ObjectAcl::PublicRead
        } else {
            ObjectAcl::Private
        };

        let mut headers = HeaderMap::new();
        headers.insert("x-amz-acl", HeaderValue::from_static(acl.as_header_value()));

        let client_options = ClientOptions::new()
            .with_timeout(config.request_timeout)
            .with_connect_timeout(config.connect_timeout)
            .with_default_headers(headers);

        let mut builder = AmazonS3Builder::new()
            .with_bucket_name(&config.bucket)
            .with_region(&config.region)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_client_options(client_options);

        if let Some(endpoint) = &config.endpoint {
            builder = builder
                .with_endpoint(endpoint)
                .with_allow_http(endpoint.starts_with("http://"));
        }

        let inner = builder
            .build()
            .map_err(|e| StoreError::Setup(e.to_string()))?;

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = ?config.endpoint,
            "S3 store ready"
        );

        Ok(Self {
            inner,
            bucket: config.bucket.clone(),
            acl,
        })
    }

    fn map_err(op: StoreOp, key: &str, err: object_store::Error) -> StoreError {
        match err {
            object_store::Error::NotFound { .. } => StoreError::not_found(key),
            other => StoreError::request(op, key, other),
        }
    }
}

/// Object location for a raw key.
///
/// `Path::parse` keeps the key verbatim, which is what S3 listings hand
/// back; `Path::from` would percent-encode characters like `[` or `%` and
/// store the object somewhere else. Keys with empty or `.`/`..` segments
/// are rejected rather than rewritten.
fn store_path(op: StoreOp, key: &str) -> StoreResult<StorePath> {
    StorePath::parse(key).map_err(|e| StoreError::request(op, key, e))
}

fn attributes(options: &PutOptions) -> Attributes {
    let mut attributes = Attributes::new();
    if let Some(content_type) = &options.content_type {
        attributes.insert(Attribute::ContentType, content_type.clone().into());
    }
    if let Some(cache_control) = &options.cache_control {
        attributes.insert(Attribute::CacheControl, cache_control.clone().into());
    }
    for (key, value) in &options.metadata {
        attributes.insert(Attribute::Metadata(key.clone().into()), value.clone().into());
    }
    attributes
}

/// True when a copy must rewrite headers that a plain CopyObject would
/// carry over from the source.
fn rewrites_headers(options: &PutOptions) -> bool {
    options.content_type.is_some() || options.cache_control.is_some() || !options.metadata.is_empty()
}

/// Source headers overlaid with the ones `options` sets.
fn copy_attributes(source: Attributes, options: &PutOptions) -> Attributes {
    let mut merged = source;
    for (key, value) in attributes(options).iter() {
        merged.insert(key.clone(), value.clone());
    }
    merged
}

#[async_trait]
impl ObjectStore for S3Store {
    fn bucket(&self) -> &str {
        &self.bucket
    }

    async fn list(&self, prefix: &str, delimiter: char) -> StoreResult<ListOutput> {
        if delimiter != '/' {
            return Err(StoreError::request(
                StoreOp::List,
                prefix,
                format!("unsupported delimiter {delimiter:?}"),
            ));
        }

        // object_store paths carry no trailing delimiter.
        let trimmed = prefix.trim_end_matches('/');
        let path = if trimmed.is_empty() {
            None
        } else {
            Some(store_path(StoreOp::List, trimmed)?)
        };

        let result = self
            .inner
            .list_with_delimiter(path.as_ref())
            .await
            .map_err(|e| Self::map_err(StoreOp::List, prefix, e))?;

        Ok(ListOutput {
            objects: result
                .objects
                .into_iter()
                .map(|meta| ObjectInfo {
                    key: meta.location.to_string(),
                    size: meta.size,
                    last_modified: SystemTime::from(meta.last_modified),
                })
                .collect(),
            common_prefixes: result
                .common_prefixes
                .into_iter()
                .map(|p| format!("{p}/"))
                .collect(),
        })
    }

    async fn get_object(&self, key: &str) -> StoreResult<GetObjectOutput> {
        let location = store_path(StoreOp::GetObject, key)?;
        let result = self
            .inner
            .get(&location)
            .await
            .map_err(|e| Self::map_err(StoreOp::GetObject, key, e))?;

        let content_length = result.meta.size;
        let last_modified = SystemTime::from(result.meta.last_modified);
        let stream = result.into_stream().map_err(io::Error::other);

        Ok(GetObjectOutput {
            content_length,
            last_modified,
            body: Box::pin(StreamReader::new(stream)),
        })
    }

    async fn put_object(&self, key: &str, body: Bytes, options: &PutOptions) -> StoreResult<()> {
        let location = store_path(StoreOp::PutObject, key)?;
        if options.acl != self.acl {
            tracing::debug!(key, requested = ?options.acl, applied = ?self.acl, "per-object ACL not supported, using client ACL");
        }
        let opts = S3PutOptions {
            attributes: attributes(options),
            ..Default::default()
        };
        self.inner
            .put_opts(&location, PutPayload::from(body), opts)
            .await
            .map_err(|e| Self::map_err(StoreOp::PutObject, key, e))?;
        Ok(())
    }

    async fn delete_object(&self, key: &str) -> StoreResult<()> {
        let location = store_path(StoreOp::DeleteObject, key)?;
        self.inner
            .delete(&location)
            .await
            .map_err(|e| Self::map_err(StoreOp::DeleteObject, key, e))
    }

    async fn copy_object(&self, src: &str, dst: &str, options: &PutOptions) -> StoreResult<()> {
        let from = store_path(StoreOp::CopyObject, src)?;
        let to = store_path(StoreOp::CopyObject, dst)?;
        if options.acl != self.acl {
            tracing::debug!(src, dst, requested = ?options.acl, "per-object ACL not supported on copy");
        }

        if !rewrites_headers(options) {
            return self
                .inner
                .copy(&from, &to)
                .await
                .map_err(|e| Self::map_err(StoreOp::CopyObject, src, e));
        }

        // object_store's copy has no header-replacing variant, so the object
        // is re-uploaded with the merged headers.
        let source = self
            .inner
            .get(&from)
            .await
            .map_err(|e| Self::map_err(StoreOp::CopyObject, src, e))?;
        let merged = copy_attributes(source.attributes.clone(), options);
        let data = source
            .bytes()
            .await
            .map_err(|e| Self::map_err(StoreOp::CopyObject, src, e))?;
        tracing::debug!(src, dst, bytes = data.len(), "copy rewrites headers via get + put");

        let opts = S3PutOptions {
            attributes: merged,
            ..Default::default()
        };
        self.inner
            .put_opts(&to, PutPayload::from(data), opts)
            .await
            .map_err(|e| Self::map_err(StoreOp::CopyObject, dst, e))?;
        Ok(())
    }

    async fn head_object(&self, key: &str) -> StoreResult<HeadObjectOutput> {
        let location = store_path(StoreOp::HeadObject, key)?;
        let meta = self
            .inner
            .head(&location)
            .await
            .map_err(|e| Self::map_err(StoreOp::HeadObject, key, e))?;
        Ok(HeadObjectOutput {
            size: meta.size,
            last_modified: SystemTime::from(meta.last_modified),
            content_type: None,
        })
    }
}

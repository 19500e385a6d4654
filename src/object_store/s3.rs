use bytes::Bytes;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode};

use crate::aws::{self, uri_encode_path, Credentials, SigningRequest};

use super::{ObjectStore, ObjectStoreError};

/// S3 object store backend, speaking the REST API with path-style addressing.
pub struct S3Store {
    client: Client,
    credentials: Credentials,
    host: String,
    region: String,
}

impl S3Store {
    pub fn new(region: &str, credentials: Credentials) -> Result<Self, anyhow::Error> {
        let client = Client::builder().build()?;
        Ok(Self {
            client,
            credentials,
            host: format!("s3.{region}.amazonaws.com"),
            region: region.to_string(),
        })
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &str,
        headers: Vec<(String, String)>,
        body: Vec<u8>,
    ) -> Result<reqwest::Response, ObjectStoreError> {
        let signed = aws::sign(
            &self.credentials,
            &SigningRequest {
                method: method.as_str(),
                host: &self.host,
                path,
                query,
                headers: &headers,
                payload: &body,
                service: "s3",
                region: &self.region,
                time: Utc::now(),
            },
        );

        let mut url = format!("https://{}{}", self.host, path);
        if !query.is_empty() {
            url = format!("{url}?{query}");
        }

        let mut request = self.client.request(method, url).body(body);
        for (name, value) in headers.iter().chain(signed.iter()) {
            request = request.header(name, value);
        }

        request
            .send()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))
    }
}

#[async_trait::async_trait]
impl ObjectStore for S3Store {
    async fn list_buckets(&self) -> Result<Vec<String>, ObjectStoreError> {
        let resp = self
            .request(Method::GET, "/", "", Vec::new(), Vec::new())
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "S3 list buckets failed ({status}): {body}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        Ok(tag_values(&body, "Name"))
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        // us-east-1 is the one region that rejects an explicit location constraint
        let body = if self.region == "us-east-1" {
            Vec::new()
        } else {
            format!(
                "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
                 <LocationConstraint>{}</LocationConstraint>\
                 </CreateBucketConfiguration>",
                self.region
            )
            .into_bytes()
        };

        let resp = self
            .request(Method::PUT, &format!("/{bucket}"), "", Vec::new(), body)
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let code = tag_values(&body, "Code");
            if code
                .iter()
                .any(|c| c == "BucketAlreadyExists" || c == "BucketAlreadyOwnedByYou")
            {
                return Err(ObjectStoreError::BucketTaken(bucket.to_string()));
            }
            return Err(ObjectStoreError::Backend(format!(
                "S3 create bucket '{bucket}' failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), ObjectStoreError> {
        let resp = self
            .request(
                Method::DELETE,
                &format!("/{bucket}"),
                "",
                Vec::new(),
                Vec::new(),
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(bucket.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "S3 delete bucket '{bucket}' failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<String>, ObjectStoreError> {
        let resp = self
            .request(
                Method::GET,
                &format!("/{bucket}"),
                "list-type=2",
                Vec::new(),
                Vec::new(),
            )
            .await?;

        if resp.status() == StatusCode::NOT_FOUND {
            return Err(ObjectStoreError::NotFound(bucket.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "S3 list objects in '{bucket}' failed ({status}): {body}"
            )));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| ObjectStoreError::Backend(e.to_string()))?;
        Ok(tag_values(&body, "Key"))
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
    ) -> Result<(), ObjectStoreError> {
        let headers = vec![(
            "content-type".to_string(),
            "application/octet-stream".to_string(),
        )];
        let path = format!("/{bucket}/{}", uri_encode_path(key));
        let resp = self
            .request(Method::PUT, &path, "", headers, data.to_vec())
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "S3 upload of '{key}' to '{bucket}' failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let path = format!("/{bucket}/{}", uri_encode_path(key));
        let resp = self
            .request(Method::DELETE, &path, "", Vec::new(), Vec::new())
            .await?;

        // 404 is fine -- object already gone
        if !resp.status().is_success() && resp.status() != StatusCode::NOT_FOUND {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(ObjectStoreError::Backend(format!(
                "S3 delete of '{key}' from '{bucket}' failed ({status}): {body}"
            )));
        }

        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://{bucket}.s3.amazonaws.com/{}", uri_encode_path(key))
    }
}

/// Extract the text content of every `<tag>...</tag>` element. The S3 list
/// responses are flat enough that full XML parsing buys nothing here.
fn tag_values(xml: &str, tag: &str) -> Vec<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let mut values = Vec::new();
    let mut rest = xml;
    while let Some(start) = rest.find(&open) {
        rest = &rest[start + open.len()..];
        match rest.find(&close) {
            Some(end) => {
                values.push(rest[..end].to_string());
                rest = &rest[end + close.len()..];
            }
            None => break,
        }
    }
    values
}

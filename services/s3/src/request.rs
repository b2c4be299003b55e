// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use crate::constants::{
    AWS_URI_ENCODE_SET, DEFAULT_ENDPOINT, DEFAULT_EXPIRES_IN_SECS, DEFAULT_REGION,
    MAX_EXPIRES_IN_SECS,
};
use crate::Credential;
use http::uri::{Authority, Scheme};
use percent_encoding::utf8_percent_encode;
use presign_core::time::{now, DateTime};
use presign_core::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// HTTP methods that can be presigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    /// Download an object.
    #[default]
    Get,
    /// Upload an object.
    Put,
    /// Fetch object metadata.
    Head,
    /// Remove an object.
    Delete,
}

impl Method {
    /// The method name as it appears in the canonical request.
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Head => "HEAD",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        [Method::Get, Method::Put, Method::Head, Method::Delete]
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::request_invalid(format!("method {s:?} is not supported")))
    }
}

impl TryFrom<&http::Method> for Method {
    type Error = Error;

    fn try_from(value: &http::Method) -> Result<Self> {
        value.as_str().parse()
    }
}

/// Where the bucket name goes in the url.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UrlStyle {
    /// `https://{bucket}.{endpoint}/{key}`
    #[default]
    VirtualHosted,
    /// `https://{endpoint}/{bucket}/{key}`
    Path,
}

/// Input of one presign call.
///
/// Only bucket, key and credential are required; everything else falls back
/// to a default during [`SigningRequest::resolve`].
#[derive(Debug, Clone)]
pub struct SigningRequest {
    bucket: String,
    key: String,
    credential: Credential,

    method: Option<Method>,
    region: Option<String>,
    expires_in: Option<Duration>,
    time: Option<DateTime>,
    endpoint: Option<String>,
    url_style: Option<UrlStyle>,
    scheme: Option<Scheme>,
    query: BTreeMap<String, String>,
}

impl SigningRequest {
    /// Create a new request for the object `key` in `bucket`.
    pub fn new(bucket: &str, key: &str, credential: Credential) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
            credential,

            method: None,
            region: None,
            expires_in: None,
            time: None,
            endpoint: None,
            url_style: None,
            scheme: None,
            query: BTreeMap::new(),
        }
    }

    /// Set the HTTP method, defaults to `GET`.
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    /// Set the region, defaults to `us-east-1`.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    /// Set how long the url stays valid, defaults to one day.
    ///
    /// Sub-second precision is dropped.
    pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
        self.expires_in = Some(expires_in);
        self
    }

    /// Pin the signing time, defaults to the current time.
    pub fn with_time(mut self, time: DateTime) -> Self {
        self.time = Some(time);
        self
    }

    /// Set the endpoint host suffix, defaults to `s3.amazonaws.com`.
    ///
    /// May carry a port like `localhost:9000`.
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = Some(endpoint.to_string());
        self
    }

    /// Set the url style, defaults to virtual hosted.
    pub fn with_url_style(mut self, style: UrlStyle) -> Self {
        self.url_style = Some(style);
        self
    }

    /// Set the url scheme, defaults to `https`.
    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    /// Add an extra query parameter to be signed.
    ///
    /// Parameters named like the `X-Amz-*` values computed by the signer are
    /// dropped during signing.
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.insert(key.to_string(), value.to_string());
        self
    }

    /// Fill every absent option with its default and derive host and path.
    ///
    /// This is the only place that reads the clock.
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        if self.bucket.is_empty() {
            return Err(Error::request_invalid("bucket must not be empty"));
        }
        if self.key.is_empty() {
            return Err(Error::request_invalid("key must not be empty"));
        }
        self.credential.check()?;

        let expires_in = self
            .expires_in
            .map(|v| v.as_secs())
            .unwrap_or(DEFAULT_EXPIRES_IN_SECS);
        if expires_in == 0 || expires_in > MAX_EXPIRES_IN_SECS {
            return Err(Error::request_invalid(format!(
                "expires_in must be between 1 and {MAX_EXPIRES_IN_SECS} seconds, got {expires_in}"
            )));
        }

        let endpoint = self.endpoint.as_deref().unwrap_or(DEFAULT_ENDPOINT);
        if endpoint.is_empty() {
            return Err(Error::config_invalid("endpoint must not be empty"));
        }

        let url_style = self.url_style.unwrap_or_default();
        let (host, path) = match url_style {
            UrlStyle::VirtualHosted => (
                format!("{}.{}", self.bucket, endpoint),
                format!("/{}", self.key),
            ),
            UrlStyle::Path => (
                endpoint.to_string(),
                format!("/{}/{}", self.bucket, self.key),
            ),
        };
        // Host goes into both the url and the canonical host header.
        let host = Authority::from_str(&host)
            .map_err(|e| {
                Error::config_invalid(format!("{host:?} is not a valid host")).with_source(e)
            })?
            .to_string();
        let path = utf8_percent_encode(&collapse_slashes(&path), &AWS_URI_ENCODE_SET).to_string();

        Ok(ResolvedOptions {
            method: self.method.unwrap_or_default(),
            scheme: self.scheme.clone().unwrap_or(Scheme::HTTPS),
            host,
            path,
            region: self
                .region
                .clone()
                .unwrap_or_else(|| DEFAULT_REGION.to_string()),
            credential: self.credential.clone(),
            expires_in,
            time: self.time.unwrap_or_else(now),
            query: self.query.clone(),
        })
    }
}

/// A [`SigningRequest`] with every option populated.
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    /// HTTP method.
    pub method: Method,
    /// Url scheme.
    pub scheme: Scheme,
    /// Host the url points at, also the only signed header.
    pub host: String,
    /// Percent encoded absolute path without duplicated slashes.
    pub path: String,
    /// Region used in the credential scope.
    pub region: String,
    /// Credential used to sign.
    pub credential: Credential,
    /// Seconds the url stays valid.
    pub expires_in: u64,
    /// Signing time shared by every derived string.
    pub time: DateTime,
    /// Extra query parameters supplied by the caller.
    pub query: BTreeMap<String, String>,
}

fn collapse_slashes(path: &str) -> String {
    let mut s = String::with_capacity(path.len());
    for c in path.chars() {
        if c == '/' && s.ends_with('/') {
            continue;
        }
        s.push(c);
    }
    s
}

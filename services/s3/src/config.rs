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

use crate::constants::*;
use crate::{Credential, SigningRequest, UrlStyle};
use http::uri::{Authority, Scheme};
use http::Uri;
use log::debug;
use presign_core::utils::Redact;
use presign_core::{Env, Error, Result};
use std::fmt::{Debug, Formatter};
use std::str::FromStr;

/// Config for presigning s3 urls.
///
/// Every field left as `None` falls back to the environment in
/// [`Config::from_env`], then to the defaults of [`SigningRequest`].
#[derive(Clone, Default)]
pub struct Config {
    /// `access_key_id` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_ACCESS_KEY_ID`
    pub access_key_id: Option<String>,
    /// `secret_access_key` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_SECRET_ACCESS_KEY`
    pub secret_access_key: Option<String>,
    /// `session_token` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_SESSION_TOKEN`
    pub session_token: Option<String>,
    /// `region` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_REGION`
    /// - env value: `AWS_DEFAULT_REGION`
    pub region: Option<String>,
    /// `endpoint` is the host suffix like `s3.amazonaws.com` or
    /// `localhost:9000`, loaded from
    ///
    /// - this field if it's `is_some`
    /// - env value: `AWS_ENDPOINT_URL_S3`
    /// - env value: `AWS_ENDPOINT_URL`
    pub endpoint: Option<String>,
    /// `scheme` will be loaded from
    ///
    /// - this field if it's `is_some`
    /// - the scheme of the endpoint url found in env
    pub scheme: Option<Scheme>,
    /// Where the bucket goes in the url, virtual hosted by default.
    pub url_style: UrlStyle,
}

impl Debug for Config {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_key_id", &Redact::from(&self.access_key_id))
            .field("secret_access_key", &Redact::from(&self.secret_access_key))
            .field("session_token", &Redact::from(&self.session_token))
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("scheme", &self.scheme)
            .field("url_style", &self.url_style)
            .finish()
    }
}

impl Config {
    /// Load config from env.
    pub fn from_env(mut self, env: &impl Env) -> Result<Self> {
        if self.access_key_id.is_none() {
            self.access_key_id = env.var(AWS_ACCESS_KEY_ID);
        }
        if self.secret_access_key.is_none() {
            self.secret_access_key = env.var(AWS_SECRET_ACCESS_KEY);
        }
        if self.session_token.is_none() {
            self.session_token = env.var(AWS_SESSION_TOKEN);
        }
        if self.region.is_none() {
            self.region = env
                .var(AWS_REGION)
                .or_else(|| env.var(AWS_DEFAULT_REGION));
        }
        if self.endpoint.is_none() {
            if let Some(url) = env
                .var(AWS_ENDPOINT_URL_S3)
                .or_else(|| env.var(AWS_ENDPOINT_URL))
            {
                let (scheme, authority) = parse_endpoint(&url)?;
                debug!("loaded endpoint {authority} from env");

                self.endpoint = Some(authority.to_string());
                if self.scheme.is_none() {
                    self.scheme = scheme;
                }
            }
        }

        Ok(self)
    }

    /// Build the credential from config, `None` if access key or secret is missing.
    pub fn credential(&self) -> Option<Credential> {
        let (Some(ak), Some(sk)) = (&self.access_key_id, &self.secret_access_key) else {
            return None;
        };

        Some(Credential {
            access_key_id: ak.clone(),
            secret_access_key: sk.clone(),
            session_token: self.session_token.clone(),
        })
    }

    /// Build a signing request for `key` in `bucket` using this config.
    pub fn signing_request(&self, bucket: &str, key: &str) -> Result<SigningRequest> {
        let credential = self.credential().ok_or_else(|| {
            Error::credential_invalid("access key id and secret access key must be set")
        })?;

        let mut req = SigningRequest::new(bucket, key, credential).with_url_style(self.url_style);
        if let Some(region) = &self.region {
            req = req.with_region(region);
        }
        if let Some(endpoint) = &self.endpoint {
            req = req.with_endpoint(endpoint);
        }
        if let Some(scheme) = &self.scheme {
            req = req.with_scheme(scheme.clone());
        }

        Ok(req)
    }
}

/// Split an endpoint like `http://localhost:9000` or `s3.example.com` into
/// scheme and authority.
fn parse_endpoint(url: &str) -> Result<(Option<Scheme>, Authority)> {
    if !url.contains("://") {
        return Ok((None, Authority::from_str(url)?));
    }

    let uri = Uri::from_str(url)?;
    if !matches!(uri.path(), "" | "/") || uri.query().is_some() {
        return Err(Error::config_invalid(format!(
            "endpoint {url:?} must not carry a path or query"
        )));
    }

    let parts = uri.into_parts();
    let authority = parts
        .authority
        .ok_or_else(|| Error::config_invalid(format!("endpoint {url:?} has no host")))?;
    Ok((parts.scheme, authority))
}

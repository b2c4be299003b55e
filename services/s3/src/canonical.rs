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
use crate::ResolvedOptions;
use log::{debug, warn};
use percent_encoding::utf8_percent_encode;
use presign_core::time::{format_date, format_iso8601};
use presign_core::Result;
use std::fmt;
use std::fmt::Write;

/// The canonical request of a presigned url.
///
/// ```text
/// GET
/// /test.txt
/// X-Amz-Algorithm=AWS4-HMAC-SHA256&X-Amz-Credential=...&X-Amz-SignedHeaders=host
/// host:examplebucket.s3.amazonaws.com
///
/// host
/// UNSIGNED-PAYLOAD
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    query: Vec<(String, String)>,
    query_string: String,
    request: String,
}

impl CanonicalRequest {
    /// Build the canonical request for resolved options.
    pub fn build(opts: &ResolvedOptions) -> Result<Self> {
        let query = canonicalize_query(opts);
        let query_string = query_to_string(&query);
        let request = canonical_request_string(opts, &query_string)?;
        debug!("calculated canonical request: {request}");

        Ok(Self {
            query,
            query_string,
            request,
        })
    }

    /// Percent encoded query pairs sorted by name.
    pub fn query(&self) -> &[(String, String)] {
        &self.query
    }

    /// Query pairs joined as `k=v&k=v`, the exact query of the final url before
    /// the signature is appended.
    pub fn query_string(&self) -> &str {
        &self.query_string
    }

    /// The canonical request text that gets hashed.
    pub fn as_str(&self) -> &str {
        &self.request
    }
}

impl fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.request)
    }
}

/// Credential scope: `20130524/us-east-1/s3/aws4_request`
pub(crate) fn credential_scope(opts: &ResolvedOptions) -> String {
    format!(
        "{}/{}/{SERVICE}/{TERMINATOR}",
        format_date(opts.time),
        opts.region
    )
}

fn is_reserved(key: &str) -> bool {
    RESERVED_QUERY_PARAMS
        .iter()
        .any(|v| v.eq_ignore_ascii_case(key))
}

fn canonicalize_query(opts: &ResolvedOptions) -> Vec<(String, String)> {
    let mut query: Vec<(String, String)> = Vec::with_capacity(opts.query.len() + 6);

    for (k, v) in &opts.query {
        if is_reserved(k) {
            warn!("query parameter {k} is computed by the signer, caller value ignored");
            continue;
        }
        query.push((k.clone(), v.clone()));
    }

    query.push((X_AMZ_ALGORITHM.into(), ALGORITHM.into()));
    query.push((
        X_AMZ_CREDENTIAL.into(),
        format!(
            "{}/{}",
            opts.credential.access_key_id,
            credential_scope(opts)
        ),
    ));
    query.push((X_AMZ_DATE.into(), format_iso8601(opts.time)));
    query.push((X_AMZ_EXPIRES.into(), opts.expires_in.to_string()));
    query.push((X_AMZ_SIGNED_HEADERS.into(), SIGNED_HEADERS.into()));
    if let Some(token) = &opts.credential.session_token {
        query.push((X_AMZ_SECURITY_TOKEN.into(), token.clone()));
    }

    let mut query: Vec<(String, String)> = query
        .into_iter()
        .map(|(k, v)| {
            (
                utf8_percent_encode(&k, &AWS_QUERY_ENCODE_SET).to_string(),
                utf8_percent_encode(&v, &AWS_QUERY_ENCODE_SET).to_string(),
            )
        })
        .collect();

    // Verifiers sort the encoded pairs, encoding may reorder raw names.
    query.sort();
    query
}

fn query_to_string(query: &[(String, String)]) -> String {
    let mut s = String::with_capacity(query.iter().map(|(k, v)| k.len() + v.len() + 2).sum());

    for (idx, (k, v)) in query.iter().enumerate() {
        if idx != 0 {
            s.push('&');
        }

        s.push_str(k);
        s.push('=');
        s.push_str(v);
    }

    s
}

fn canonical_request_string(opts: &ResolvedOptions, query: &str) -> Result<String> {
    // 512 is specially chosen to avoid reallocation for most requests.
    let mut f = String::with_capacity(512);

    writeln!(f, "{}", opts.method)?;
    writeln!(f, "{}", opts.path)?;
    writeln!(f, "{query}")?;
    // Host is the only signed header, followed by the blank line closing the header block.
    writeln!(f, "{SIGNED_HEADERS}:{}", opts.host)?;
    writeln!(f)?;
    writeln!(f, "{SIGNED_HEADERS}")?;
    write!(f, "{UNSIGNED_PAYLOAD}")?;

    Ok(f)
}

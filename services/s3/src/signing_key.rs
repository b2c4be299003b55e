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

use crate::constants::{SERVICE, TERMINATOR};
use presign_core::hash::{hmac_sha256, SHA256_OUTPUT_LEN};
use presign_core::time::{format_date, DateTime};
use presign_core::{Error, Result};
use std::fmt::{Debug, Formatter};

/// Request scoped key derived from the secret access key.
///
/// A key is bound to one `(secret, date, region)` triple. Callers signing many
/// urls for the same triple can derive it once with [`derive_signing_key`] and
/// share it, including across threads.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningKey([u8; SHA256_OUTPUT_LEN]);

impl SigningKey {
    /// Raw key bytes.
    pub fn as_bytes(&self) -> &[u8; SHA256_OUTPUT_LEN] {
        &self.0
    }
}

impl From<[u8; SHA256_OUTPUT_LEN]> for SigningKey {
    fn from(value: [u8; SHA256_OUTPUT_LEN]) -> Self {
        Self(value)
    }
}

impl TryFrom<&[u8]> for SigningKey {
    type Error = Error;

    fn try_from(value: &[u8]) -> Result<Self> {
        let key = <[u8; SHA256_OUTPUT_LEN]>::try_from(value).map_err(|_| {
            Error::request_invalid(format!(
                "signing key must be {SHA256_OUTPUT_LEN} bytes, got {}",
                value.len()
            ))
        })?;
        Ok(Self(key))
    }
}

impl Debug for SigningKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("SigningKey(***)")
    }
}

/// Derive the s3 signing key for `secret` on the UTC date of `time` in `region`.
pub fn derive_signing_key(secret: &str, time: DateTime, region: &str) -> SigningKey {
    generate_signing_key(secret, time, region, SERVICE)
}

fn generate_signing_key(secret: &str, time: DateTime, region: &str, service: &str) -> SigningKey {
    // Sign secret
    let secret = format!("AWS4{secret}");
    // Sign date
    let sign_date = hmac_sha256(secret.as_bytes(), format_date(time).as_bytes());
    // Sign region
    let sign_region = hmac_sha256(&sign_date, region.as_bytes());
    // Sign service
    let sign_service = hmac_sha256(&sign_region, service.as_bytes());
    // Sign request
    let sign_request = hmac_sha256(&sign_service, TERMINATOR.as_bytes());

    SigningKey(sign_request)
}

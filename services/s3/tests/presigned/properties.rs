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

use super::{
    example_credential, example_request, init_presign_test, raw_query, verify, SECRET_ACCESS_KEY,
};
use anyhow::Result;
use http::uri::Scheme;
use presign_core::time::now;
use presign_s3::{create_signed_url, derive_signing_key, Method, SigningRequest, UrlStyle};
use pretty_assertions::assert_eq;
use std::time::Duration;
use test_case::test_case;

#[test]
fn test_presign_is_deterministic() -> Result<()> {
    init_presign_test();

    let req = example_request(example_credential())
        .with_query("response-cache-control", "no-cache")
        .with_expires_in(Duration::from_secs(900));

    let first = create_signed_url(&req, None)?;
    for _ in 0..8 {
        assert_eq!(create_signed_url(&req, None)?, first);
    }
    Ok(())
}

#[test]
fn test_default_time_is_read_once() -> Result<()> {
    init_presign_test();

    let req = SigningRequest::new("examplebucket", "test.txt", example_credential());
    let opts = req.resolve()?;
    let url = create_signed_url(&req.clone().with_time(opts.time), None)?;

    // Credential date and X-Amz-Date both come from the same instant.
    let query = raw_query(&url);
    let date = &query.iter().find(|(k, _)| k == "X-Amz-Date").unwrap().1;
    let credential = &query
        .iter()
        .find(|(k, _)| k == "X-Amz-Credential")
        .unwrap()
        .1;
    assert!(credential.contains(&format!("%2F{}%2F", &date[..8])));
    assert!(verify("GET", &url, SECRET_ACCESS_KEY));

    let unpinned = create_signed_url(&req, None)?;
    assert!(verify("GET", &unpinned, SECRET_ACCESS_KEY));
    Ok(())
}

#[test_case(example_request(example_credential()); "plain")]
#[test_case(example_request(example_credential().with_session_token("token+with/chars")); "session token")]
#[test_case(example_request(example_credential())
    .with_query("x-id", "GetObject")
    .with_query("response-content-disposition", "attachment; filename=\"a b.txt\"")
    .with_query("partNumber", "1"); "extra query")]
#[test_case(example_request(example_credential())
    .with_query("a-b", "1")
    .with_query("a/b", "2")
    .with_query("a.b", "3"); "names reordered by encoding")]
#[test_case(example_request(example_credential())
    .with_query("X-Amz-Date", "19700101T000000Z")
    .with_query("x-amz-expires", "1"); "reserved extras")]
fn test_query_is_sorted_with_signature_last(req: SigningRequest) -> Result<()> {
    init_presign_test();

    let url = create_signed_url(&req, None)?;
    let query = raw_query(&url);

    let (last, _) = query.last().expect("query must not be empty");
    assert_eq!(last, "X-Amz-Signature");

    let keys: Vec<&str> = query[..query.len() - 1]
        .iter()
        .map(|(k, _)| k.as_str())
        .collect();
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1], "{} must sort before {}", pair[0], pair[1]);
    }
    assert_eq!(
        query.iter().filter(|(k, _)| k == "X-Amz-Date").count(),
        1,
        "reserved params must appear once"
    );
    assert!(verify("GET", &url, SECRET_ACCESS_KEY));
    Ok(())
}

#[test]
fn test_reserved_extras_do_not_override_protocol_values() -> Result<()> {
    init_presign_test();

    let url = create_signed_url(
        &example_request(example_credential())
            .with_query("X-Amz-Expires", "1")
            .with_query("X-Amz-Signature", "forged"),
        None,
    )?;

    assert_eq!(url, create_signed_url(&example_request(example_credential()), None)?);
    Ok(())
}

#[test_case(Method::Get, UrlStyle::VirtualHosted)]
#[test_case(Method::Put, UrlStyle::VirtualHosted)]
#[test_case(Method::Head, UrlStyle::Path)]
#[test_case(Method::Delete, UrlStyle::Path)]
fn test_round_trip_verification(method: Method, style: UrlStyle) -> Result<()> {
    init_presign_test();

    let req = example_request(example_credential())
        .with_method(method)
        .with_url_style(style);
    let url = create_signed_url(&req, None)?;

    assert!(verify(method.as_str(), &url, SECRET_ACCESS_KEY));
    assert!(!verify(method.as_str(), &url, "wrong secret"));
    Ok(())
}

#[test]
fn test_url_style_changes_host_and_path() -> Result<()> {
    init_presign_test();

    let virtual_hosted = create_signed_url(&example_request(example_credential()), None)?;
    let path_style = create_signed_url(
        &example_request(example_credential()).with_url_style(UrlStyle::Path),
        None,
    )?;

    assert!(virtual_hosted.starts_with("https://examplebucket.s3.amazonaws.com/test.txt?"));
    assert!(path_style.starts_with("https://s3.amazonaws.com/examplebucket/test.txt?"));
    assert_ne!(raw_query(&virtual_hosted).last(), raw_query(&path_style).last());

    assert!(verify("GET", &virtual_hosted, SECRET_ACCESS_KEY));
    assert!(verify("GET", &path_style, SECRET_ACCESS_KEY));
    Ok(())
}

#[test]
fn test_custom_endpoint_and_scheme() -> Result<()> {
    init_presign_test();

    let url = create_signed_url(
        &example_request(example_credential())
            .with_endpoint("localhost:9000")
            .with_url_style(UrlStyle::Path)
            .with_scheme(Scheme::HTTP),
        None,
    )?;

    assert!(url.starts_with("http://localhost:9000/examplebucket/test.txt?"));
    assert!(verify("GET", &url, SECRET_ACCESS_KEY));
    Ok(())
}

#[test]
fn test_special_characters_in_key() -> Result<()> {
    init_presign_test();

    let req = SigningRequest::new(
        "examplebucket",
        "!@#$%^&*()_+-=;:'><,/?.txt",
        example_credential(),
    )
    .with_time(now());
    let url = create_signed_url(&req, None)?;

    assert!(url.starts_with(
        "https://examplebucket.s3.amazonaws.com/%21%40%23%24%25%5E%26%2A%28%29_%2B-%3D%3B%3A%27%3E%3C%2C/%3F.txt?"
    ));
    assert!(verify("GET", &url, SECRET_ACCESS_KEY));
    Ok(())
}

#[test]
fn test_shared_key_across_threads() -> Result<()> {
    init_presign_test();

    let time = now();
    let key = derive_signing_key(SECRET_ACCESS_KEY, time, "us-east-1");

    let urls = std::thread::scope(|s| {
        let handles: Vec<_> = (0..4)
            .map(|i| {
                let key = &key;
                s.spawn(move || {
                    let req = SigningRequest::new(
                        "examplebucket",
                        &format!("object-{i}"),
                        example_credential(),
                    )
                    .with_time(time);
                    create_signed_url(&req, Some(key))
                })
            })
            .collect();

        handles
            .into_iter()
            .map(|h| h.join().expect("thread must not panic"))
            .collect::<Result<Vec<_>, _>>()
    })?;

    for url in urls {
        assert!(verify("GET", &url, SECRET_ACCESS_KEY));
    }
    Ok(())
}

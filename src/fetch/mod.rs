//! HTTP plumbing: the client seam, auth wrappers, dataset downloads and
//! archive extraction.

mod basic;
mod client;
pub mod archive;
pub mod auth;
pub mod download;

pub use basic::BasicClient;
pub use client::HttpClient;
pub use download::{DownloadOutcome, DownloadReport, Downloader};

use anyhow::Result;
use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::PipelineError;

async fn send<C: HttpClient + ?Sized>(client: &C, req: reqwest::Request) -> Result<reqwest::Response> {
    let url = req.url().to_string();
    client
        .execute(req)
        .await
        .and_then(|r| r.error_for_status())
        .map_err(|e| {
            PipelineError::Transport {
                url,
                message: e.to_string(),
            }
            .into()
        })
}

pub async fn fetch_bytes<C: HttpClient + ?Sized>(client: &C, url: &str) -> Result<Bytes> {
    let req = reqwest::Request::new(reqwest::Method::GET, url.parse()?);
    let resp = send(client, req).await?;
    Ok(resp.bytes().await?)
}

/// GETs `url` and decodes the JSON body.
pub async fn fetch_json<C: HttpClient + ?Sized, T: DeserializeOwned>(client: &C, url: &str) -> Result<T> {
    let bytes = fetch_bytes(client, url).await?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::parse(url, e).into())
}

/// POSTs `body` as JSON to `url` and decodes the JSON reply.
pub async fn post_json<C, B, T>(client: &C, url: &str, body: &B) -> Result<T>
where
    C: HttpClient + ?Sized,
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let mut req = reqwest::Request::new(reqwest::Method::POST, url.parse()?);
    req.headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    *req.body_mut() = Some(serde_json::to_vec(body)?.into());

    let resp = send(client, req).await?;
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| PipelineError::parse(url, e).into())
}

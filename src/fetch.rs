//! Abstractions for obtaining the input buffer.

use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};

use crate::error::MetadataResult;

/// The asynchronous interface used to fetch a whole file before decoding its metadata.
///
/// Notes:
///
/// 1. [`ReqwestSource`], available when the `reqwest` crate feature is enabled, downloads a URL.
///
/// 2. You can use [`TokioSource`] for types that implement [`tokio::io::AsyncRead`] and
///    [`tokio::io::AsyncSeek`], for example [`tokio::fs::File`].
///
/// 3. [`Bytes`] is a source of itself.
///
/// [`tokio::fs::File`]: https://docs.rs/tokio/latest/tokio/fs/struct.File.html
pub trait BufferSource: Debug + Send + Sync {
    /// Retrieve the complete file.
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>>;
}

/// This allows Box<dyn BufferSource + '_> to be used as a BufferSource.
impl BufferSource for Box<dyn BufferSource + '_> {
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        self.as_ref().get_bytes()
    }
}

/// This allows Arc<dyn BufferSource + '_> to be used as a BufferSource.
impl BufferSource for Arc<dyn BufferSource + '_> {
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        self.as_ref().get_bytes()
    }
}

impl BufferSource for Bytes {
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        futures::future::ready(Ok(self.clone())).boxed()
    }
}

/// A wrapper for things that implement [AsyncRead] and [AsyncSeek] to also implement
/// [BufferSource].
///
/// This wrapper is needed because `AsyncRead` and `AsyncSeek` require mutable access to seek and
/// read data, while the `BufferSource` trait requires immutable access to read data.
///
/// This wrapper stores the inner reader in a `Mutex`.
///
/// [AsyncRead]: tokio::io::AsyncRead
/// [AsyncSeek]: tokio::io::AsyncSeek
#[cfg(feature = "tokio")]
#[derive(Debug)]
pub struct TokioSource<T: tokio::io::AsyncRead + tokio::io::AsyncSeek + Unpin + Send + Debug>(
    tokio::sync::Mutex<T>,
);

#[cfg(feature = "tokio")]
impl<T: tokio::io::AsyncRead + tokio::io::AsyncSeek + Unpin + Send + Debug> TokioSource<T> {
    /// Create a new TokioSource from a reader.
    pub fn new(inner: T) -> Self {
        Self(tokio::sync::Mutex::new(inner))
    }

    async fn read_all(&self) -> MetadataResult<Bytes> {
        use tokio::io::{AsyncReadExt, AsyncSeekExt};

        let mut file = self.0.lock().await;
        file.rewind().await?;

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer).await?;
        log::debug!("read {} bytes", buffer.len());
        Ok(buffer.into())
    }
}

#[cfg(feature = "tokio")]
impl<T: tokio::io::AsyncRead + tokio::io::AsyncSeek + Unpin + Send + Debug> BufferSource
    for TokioSource<T>
{
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        self.read_all().boxed()
    }
}

/// A BufferSource that downloads a URL using reqwest.
#[cfg(feature = "reqwest")]
#[derive(Debug, Clone)]
pub struct ReqwestSource {
    client: reqwest::Client,
    url: reqwest::Url,
}

#[cfg(feature = "reqwest")]
impl ReqwestSource {
    /// Construct a new ReqwestSource from a reqwest client and URL.
    pub fn new(client: reqwest::Client, url: reqwest::Url) -> Self {
        Self { client, url }
    }

    fn make_request(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        let url = self.url.clone();
        let client = self.client.clone();
        async move {
            let response = client.get(url).send().await?.error_for_status()?;
            let bytes = response.bytes().await?;
            log::debug!("downloaded {} bytes", bytes.len());
            Ok(bytes)
        }
        .boxed()
    }
}

#[cfg(feature = "reqwest")]
impl BufferSource for ReqwestSource {
    fn get_bytes(&self) -> BoxFuture<'_, MetadataResult<Bytes>> {
        self.make_request()
    }
}

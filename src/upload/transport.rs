//! HTTP implementation of the conversion transport.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Body, Client};
use reqwest::cookie::Jar;
use reqwest::header::ACCEPT;
use reqwest::multipart::{Form, Part};
use tokio::fs::File;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};
use url::Url;

use super::csrf::CSRF_HEADER;
use super::{ConversionTransport, RawResponse, TransportError, UploadRequest};
use crate::http_client::{ClientBuildError, HttpTimeouts, build_http_client};
use crate::validate::{FileSource, SelectedFile};

/// Talks to the conversion service over HTTP.
///
/// Create once and reuse; the inner client pools connections.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with the given timeouts and no cookie jar.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn new(timeouts: HttpTimeouts) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_http_client(timeouts, None)?,
        })
    }

    /// Creates a transport that sends (and stores) cookies from `jar`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientBuildError`] when the HTTP client cannot be built.
    pub fn with_cookie_jar(
        timeouts: HttpTimeouts,
        jar: Arc<Jar>,
    ) -> Result<Self, ClientBuildError> {
        Ok(Self {
            client: build_http_client(timeouts, Some(jar))?,
        })
    }

    /// Wraps an existing client.
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches `url` so the client's cookie jar picks up whatever the service
    /// sets (notably its anti-forgery cookie). Returns the response status.
    ///
    /// # Errors
    ///
    /// Same as [`ConversionTransport::status`].
    #[instrument(skip(self, cancel), fields(url = %url))]
    pub async fn prime_cookies(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<u16, TransportError> {
        Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;
        let response = execute(self.client.get(url), url, cancel).await?;
        debug!(status = response.status, "cookie priming request finished");
        Ok(response.status)
    }

    async fn build_form(request: &UploadRequest) -> Result<Form, TransportError> {
        let mut form = Form::new();
        for (name, value) in &request.fields {
            form = form.text(*name, value.clone());
        }
        for file in request.files.files() {
            let mut part = file_part(file).await?.file_name(file.name.clone());
            // A declared type that is not `type/subtype` is left off the part.
            if let Some(media_type) = file.media_type.as_deref().filter(|mt| is_media_type(mt)) {
                part = part
                    .mime_str(media_type)
                    .map_err(|e| TransportError::network(request.endpoint.clone(), e))?;
            }
            form = form.part(request.file_field, part);
        }
        Ok(form)
    }
}

/// Disk-backed files are streamed into the body rather than read up front.
async fn file_part(file: &SelectedFile) -> Result<Part, TransportError> {
    match &file.source {
        FileSource::Memory(bytes) => Ok(Part::bytes(bytes.clone())),
        FileSource::Path(path) => {
            let opened = File::open(path)
                .await
                .map_err(|e| TransportError::file_read(file.name.clone(), e))?;
            let len = opened
                .metadata()
                .await
                .map_err(|e| TransportError::file_read(file.name.clone(), e))?
                .len();
            Ok(Part::stream_with_length(Body::from(opened), len))
        }
    }
}

fn is_media_type(value: &str) -> bool {
    value
        .split(';')
        .next()
        .and_then(|essence| essence.trim().split_once('/'))
        .is_some_and(|(kind, subtype)| {
            !kind.is_empty()
                && !subtype.is_empty()
                && !kind.contains(char::is_whitespace)
                && !subtype.contains(char::is_whitespace)
        })
}

#[async_trait]
impl ConversionTransport for HttpTransport {
    #[instrument(
        skip(self, request, cancel),
        fields(url = %request.endpoint, files = request.files.len())
    )]
    async fn send(
        &self,
        request: &UploadRequest,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        Url::parse(&request.endpoint)
            .map_err(|_| TransportError::invalid_url(request.endpoint.clone()))?;

        let form = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!("upload aborted while preparing files");
                return Err(TransportError::aborted(&request.endpoint));
            }
            form = Self::build_form(request) => form?,
        };
        let mut builder = self
            .client
            .post(&request.endpoint)
            .header(ACCEPT, "application/json")
            .multipart(form);
        if let Some(token) = request.csrf_token.as_deref() {
            builder = builder.header(CSRF_HEADER, token);
        }

        debug!(has_csrf = request.csrf_token.is_some(), "sending upload");
        execute(builder, &request.endpoint, cancel).await
    }

    #[instrument(skip(self, cancel), fields(url = %url))]
    async fn status(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<RawResponse, TransportError> {
        Url::parse(url).map_err(|_| TransportError::invalid_url(url))?;
        let builder = self.client.get(url).header(ACCEPT, "application/json");
        execute(builder, url, cancel).await
    }
}

/// Sends a request and reads its body, racing both against the token.
///
/// Dropping the in-flight future on cancellation closes the connection.
async fn execute(
    builder: reqwest::RequestBuilder,
    url: &str,
    cancel: &CancellationToken,
) -> Result<RawResponse, TransportError> {
    if cancel.is_cancelled() {
        return Err(TransportError::aborted(url));
    }

    let exchange = async {
        let response = builder
            .send()
            .await
            .map_err(|e| TransportError::network(url, e))?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError::network(url, e))?;
        Ok::<_, TransportError>(RawResponse::from_body(status, &body))
    };

    tokio::select! {
        biased;
        () = cancel.cancelled() => {
            debug!(url = %url, "request aborted");
            Err(TransportError::aborted(url))
        }
        result = exchange => result,
    }
}

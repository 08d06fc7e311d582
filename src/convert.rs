//! Conversions to and from `hyper` message types

use crate::message::{Message, Request, Response};
use crate::{Result, RewindError};

fn version_text(version: hyper::Version) -> &'static str {
    if version == hyper::Version::HTTP_09 {
        "HTTP/0.9"
    } else if version == hyper::Version::HTTP_10 {
        "HTTP/1.0"
    } else if version == hyper::Version::HTTP_2 {
        "HTTP/2.0"
    } else if version == hyper::Version::HTTP_3 {
        "HTTP/3.0"
    } else {
        "HTTP/1.1"
    }
}

fn parse_version(text: &str) -> Result<hyper::Version> {
    match text {
        "HTTP/0.9" => Ok(hyper::Version::HTTP_09),
        "HTTP/1.0" => Ok(hyper::Version::HTTP_10),
        "HTTP/1.1" => Ok(hyper::Version::HTTP_11),
        "HTTP/2" | "HTTP/2.0" => Ok(hyper::Version::HTTP_2),
        "HTTP/3" | "HTTP/3.0" => Ok(hyper::Version::HTTP_3),
        other => Err(RewindError::InvalidMessage(format!(
            "Unsupported protocol version: {other}"
        ))),
    }
}

impl<B: AsRef<[u8]>> From<hyper::Request<B>> for Request {
    fn from(request: hyper::Request<B>) -> Self {
        let (parts, body) = request.into_parts();

        let mut converted = Request::new(parts.method.as_str(), parts.uri.to_string())
            .with_version(version_text(parts.version));
        for (name, value) in &parts.headers {
            converted =
                converted.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        converted.with_body(body.as_ref())
    }
}

impl<B: AsRef<[u8]>> From<hyper::Response<B>> for Response {
    fn from(response: hyper::Response<B>) -> Self {
        let (parts, body) = response.into_parts();

        let mut converted =
            Response::new(parts.status.as_u16()).with_version(version_text(parts.version));
        for (name, value) in &parts.headers {
            converted =
                converted.with_header(name.as_str(), String::from_utf8_lossy(value.as_bytes()));
        }

        converted.with_body(body.as_ref())
    }
}

impl Request {
    /// Convert into a `hyper` request
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the method, URI, version or a header is
    /// not valid HTTP
    pub fn to_hyper(&self) -> Result<hyper::Request<Vec<u8>>> {
        let mut builder = hyper::Request::builder()
            .method(self.method())
            .uri(self.uri())
            .version(parse_version(self.version())?);
        for (name, value) in self.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(self.body().to_vec())
            .map_err(|e| RewindError::InvalidMessage(format!("Cannot build request: {e}")))
    }
}

impl Response {
    /// Convert into a `hyper` response
    ///
    /// The reason phrase is not carried over.
    ///
    /// # Errors
    ///
    /// Returns `InvalidMessage` if the status, version or a header is not
    /// valid HTTP
    pub fn to_hyper(&self) -> Result<hyper::Response<Vec<u8>>> {
        let mut builder = hyper::Response::builder()
            .status(self.status())
            .version(parse_version(self.version())?);
        for (name, value) in self.headers() {
            builder = builder.header(name.as_str(), value.as_str());
        }

        builder
            .body(self.body().to_vec())
            .map_err(|e| RewindError::InvalidMessage(format!("Cannot build response: {e}")))
    }
}

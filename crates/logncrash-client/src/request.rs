//! The flat record submitted to the ingestion service for each log event.

use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// One log event summarized for the Log & Crash ingestion API.
///
/// Field names on the wire follow the service's JSON schema, including the
/// capitalized `Platform` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogNCrashRequest {
    /// Project identity (the application key).
    pub project_name: String,
    /// Version of the reporting service.
    pub project_version: String,
    /// Version of the log format.
    pub log_version: String,
    /// The formatted log message.
    pub body: String,
    /// Source tag.
    pub log_source: String,
    /// Type tag.
    pub log_type: String,
    /// Originating host.
    pub host: String,
    /// Platform identifier.
    #[serde(rename = "Platform")]
    pub platform: String,
    /// Severity level as text, e.g. `DEBUG`.
    pub log_level: String,
}

impl LogNCrashRequest {
    /// Creates a new request builder.
    #[must_use]
    pub fn builder() -> LogNCrashRequestBuilder {
        LogNCrashRequestBuilder::default()
    }

    /// Serializes the request to its JSON wire form.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(ClientError::from)
    }
}

/// Builder for [`LogNCrashRequest`].
#[derive(Debug, Default)]
pub struct LogNCrashRequestBuilder {
    project_name: Option<String>,
    project_version: Option<String>,
    log_version: Option<String>,
    body: Option<String>,
    log_source: Option<String>,
    log_type: Option<String>,
    host: Option<String>,
    platform: Option<String>,
    log_level: Option<String>,
}

impl LogNCrashRequestBuilder {
    /// Sets the project name.
    #[must_use]
    pub fn project_name(mut self, value: impl Into<String>) -> Self {
        self.project_name = Some(value.into());
        self
    }

    /// Sets the project version.
    #[must_use]
    pub fn project_version(mut self, value: impl Into<String>) -> Self {
        self.project_version = Some(value.into());
        self
    }

    /// Sets the log format version.
    #[must_use]
    pub fn log_version(mut self, value: impl Into<String>) -> Self {
        self.log_version = Some(value.into());
        self
    }

    /// Sets the message body.
    #[must_use]
    pub fn body(mut self, value: impl Into<String>) -> Self {
        self.body = Some(value.into());
        self
    }

    /// Sets the source tag.
    #[must_use]
    pub fn log_source(mut self, value: impl Into<String>) -> Self {
        self.log_source = Some(value.into());
        self
    }

    /// Sets the type tag.
    #[must_use]
    pub fn log_type(mut self, value: impl Into<String>) -> Self {
        self.log_type = Some(value.into());
        self
    }

    /// Sets the originating host.
    #[must_use]
    pub fn host(mut self, value: impl Into<String>) -> Self {
        self.host = Some(value.into());
        self
    }

    /// Sets the platform.
    #[must_use]
    pub fn platform(mut self, value: impl Into<String>) -> Self {
        self.platform = Some(value.into());
        self
    }

    /// Sets the severity text.
    #[must_use]
    pub fn log_level(mut self, value: impl Into<String>) -> Self {
        self.log_level = Some(value.into());
        self
    }

    /// Builds the request, returning an error if a field is missing.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::MissingField` naming the first unset field.
    pub fn build(self) -> Result<LogNCrashRequest> {
        Ok(LogNCrashRequest {
            project_name: self
                .project_name
                .ok_or(ClientError::MissingField("project_name"))?,
            project_version: self
                .project_version
                .ok_or(ClientError::MissingField("project_version"))?,
            log_version: self
                .log_version
                .ok_or(ClientError::MissingField("log_version"))?,
            body: self.body.ok_or(ClientError::MissingField("body"))?,
            log_source: self
                .log_source
                .ok_or(ClientError::MissingField("log_source"))?,
            log_type: self.log_type.ok_or(ClientError::MissingField("log_type"))?,
            host: self.host.ok_or(ClientError::MissingField("host"))?,
            platform: self.platform.ok_or(ClientError::MissingField("platform"))?,
            log_level: self
                .log_level
                .ok_or(ClientError::MissingField("log_level"))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_builder() -> LogNCrashRequestBuilder {
        LogNCrashRequest::builder()
            .project_name("buzz")
            .project_version("1.0")
            .log_version("v1")
            .body("user login failed")
            .log_source("auth")
            .log_type("app")
            .host("h1")
            .platform("web")
            .log_level("DEBUG")
    }

    #[test]
    fn builder_success() {
        let request = full_builder().build().expect("should build");

        assert_eq!(request.project_name, "buzz");
        assert_eq!(request.body, "user login failed");
        assert_eq!(request.platform, "web");
        assert_eq!(request.log_level, "DEBUG");
    }

    #[test]
    fn builder_missing_field() {
        let result = LogNCrashRequest::builder().project_name("buzz").build();
        assert!(matches!(
            result,
            Err(ClientError::MissingField("project_version"))
        ));
    }

    #[test]
    fn wire_field_names() {
        let request = full_builder().build().expect("should build");
        let json: serde_json::Value =
            serde_json::from_str(&request.to_json().expect("serialize")).expect("parse");

        assert_eq!(json["projectName"], "buzz");
        assert_eq!(json["projectVersion"], "1.0");
        assert_eq!(json["logVersion"], "v1");
        assert_eq!(json["body"], "user login failed");
        assert_eq!(json["logSource"], "auth");
        assert_eq!(json["logType"], "app");
        assert_eq!(json["host"], "h1");
        assert_eq!(json["Platform"], "web");
        assert_eq!(json["logLevel"], "DEBUG");
        assert!(json.get("platform").is_none());
    }

    #[test]
    fn request_is_comparable() {
        let a = full_builder().build().expect("build");
        let b = full_builder().build().expect("build");
        assert_eq!(a, b);

        let c = full_builder().body("other").build().expect("build");
        assert_ne!(a, c);
    }
}

use crate::client::{TransportError, TransportErrorKind};
use serde::{Deserialize, Serialize};
use serde_json::json;

/// One durable log line inside a stream. Events keep their submission
/// order in the store; the timestamp is advisory (see channel::timestamp).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub timestamp_millis: i64,
    pub message: String,
}

/// Remote log store surface consumed by the channel manager and the
/// orchestrator. Implementations must classify deleting an absent stream
/// as success.
pub trait LogStore {
    fn group_exists(&self, prefix: &str) -> Result<bool, TransportError>;
    fn create_stream(&self, group: &str, stream: &str) -> Result<(), TransportError>;
    fn delete_stream(&self, group: &str, stream: &str) -> Result<(), TransportError>;
    fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), TransportError>;
    fn get_events(&self, group: &str, stream: &str) -> Result<Vec<LogEvent>, TransportError>;
}

#[derive(Debug, Clone)]
pub struct HttpLogStore {
    api_base: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct GroupsData {
    #[serde(default)]
    groups: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct EventsData {
    #[serde(default)]
    events: Vec<LogEvent>,
}

pub(crate) fn kind_for_status(code: u16) -> TransportErrorKind {
    match code {
        400 => TransportErrorKind::InvalidParameter,
        404 => TransportErrorKind::NotFound,
        409 => TransportErrorKind::OperationAborted,
        503 => TransportErrorKind::ServiceUnavailable,
        _ => TransportErrorKind::Http,
    }
}

pub(crate) fn transport_error(operation: &str, err: ureq::Error) -> TransportError {
    match err {
        ureq::Error::Status(code, _) => TransportError::new(
            kind_for_status(code),
            operation,
            format!("http status {code}"),
        ),
        ureq::Error::Transport(transport) => {
            TransportError::new(TransportErrorKind::Io, operation, transport.to_string())
        }
    }
}

pub(crate) fn body_error(operation: &str, err: std::io::Error) -> TransportError {
    TransportError::new(
        TransportErrorKind::Io,
        operation,
        format!("failed to read response body: {err}"),
    )
}

impl HttpLogStore {
    pub fn new(api_base: &str) -> Self {
        Self {
            api_base: api_base.trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_base, path)
    }

    fn stream_endpoint(&self, group: &str, stream: &str, suffix: &str) -> String {
        self.endpoint(&format!(
            "groups/{}/streams/{}{}",
            urlencoding::encode(group),
            urlencoding::encode(stream),
            suffix
        ))
    }
}

impl LogStore for HttpLogStore {
    fn group_exists(&self, prefix: &str) -> Result<bool, TransportError> {
        let url = format!(
            "{}?prefix={}",
            self.endpoint("groups"),
            urlencoding::encode(prefix)
        );
        let response = ureq::get(&url)
            .call()
            .map_err(|err| transport_error("describe groups", err))?;
        let data: GroupsData = response
            .into_json()
            .map_err(|err| body_error("describe groups", err))?;
        Ok(!data.groups.is_empty())
    }

    fn create_stream(&self, group: &str, stream: &str) -> Result<(), TransportError> {
        let url = self.endpoint(&format!("groups/{}/streams", urlencoding::encode(group)));
        ureq::post(&url)
            .send_json(json!({ "stream_name": stream }))
            .map_err(|err| transport_error("create stream", err))?;
        Ok(())
    }

    fn delete_stream(&self, group: &str, stream: &str) -> Result<(), TransportError> {
        let url = self.stream_endpoint(group, stream, "");
        match ureq::delete(&url).call() {
            Ok(_) => Ok(()),
            // deleting an absent stream is success
            Err(ureq::Error::Status(404, _)) => Ok(()),
            Err(err) => Err(transport_error("delete stream", err)),
        }
    }

    fn put_events(
        &self,
        group: &str,
        stream: &str,
        events: &[LogEvent],
    ) -> Result<(), TransportError> {
        let url = self.stream_endpoint(group, stream, "/events");
        ureq::post(&url)
            .send_json(json!({ "events": events }))
            .map_err(|err| transport_error("put events", err))?;
        Ok(())
    }

    fn get_events(&self, group: &str, stream: &str) -> Result<Vec<LogEvent>, TransportError> {
        let url = self.stream_endpoint(group, stream, "/events");
        let response = ureq::get(&url)
            .call()
            .map_err(|err| transport_error("get events", err))?;
        let data: EventsData = response
            .into_json()
            .map_err(|err| body_error("get events", err))?;
        Ok(data.events)
    }
}

use crate::config::BrokerSettings;
use crate::status::StatusPublisher;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum BrokerError {
    #[error("broker uri is not configured")]
    MissingUri,
    #[error("broker request to {url} failed: {message}")]
    Request { url: String, message: String },
    #[error("broker returned status {status} for {url}")]
    Status { url: String, status: u16 },
    #[error("failed to read broker response from {url}: {source}")]
    Read {
        url: String,
        #[source]
        source: std::io::Error,
    },
    #[error("broker connection has been disposed")]
    Disposed,
}

#[derive(Debug, Clone)]
pub struct RestBroker {
    agent: ureq::Agent,
    base_uri: String,
    status_topic: String,
    broadcast_topic: String,
    client_id: String,
    poll_timeout: Duration,
    disposed: Arc<AtomicBool>,
}

impl RestBroker {
    pub fn new(settings: &BrokerSettings, client_id: &str) -> Result<Self, BrokerError> {
        let base_uri = settings.uri.trim().trim_end_matches('/').to_string();
        if base_uri.is_empty() {
            return Err(BrokerError::MissingUri);
        }
        let poll_timeout = Duration::from_millis(settings.poll_timeout_ms);
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(poll_timeout + CONNECT_TIMEOUT)
            .build();
        Ok(Self {
            agent,
            base_uri,
            status_topic: settings.status_topic.clone(),
            broadcast_topic: settings.broadcast_topic.clone(),
            client_id: client_id.to_string(),
            poll_timeout,
            disposed: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn base_uri(&self) -> &str {
        &self.base_uri
    }

    fn topic_url(&self, topic: &str) -> String {
        format!(
            "{}/api/message/{}?type=topic",
            self.base_uri,
            urlencoding::encode(topic)
        )
    }

    pub fn send_status(&self, xml: &str) -> Result<(), BrokerError> {
        self.ensure_open()?;
        let url = self.topic_url(&self.status_topic);
        let response = self
            .agent
            .post(&url)
            .set("Content-Type", "text/xml; charset=utf-8")
            .send_string(xml)
            .map_err(|err| request_error(&url, err))?;
        match response.status() {
            200..=299 => Ok(()),
            status => Err(BrokerError::Status { url, status }),
        }
    }

    pub fn receive_broadcast(&self) -> Result<Option<String>, BrokerError> {
        self.ensure_open()?;
        let url = format!(
            "{}&clientId={}&readTimeout={}",
            self.topic_url(&self.broadcast_topic),
            urlencoding::encode(&self.client_id),
            self.poll_timeout.as_millis()
        );
        let response = self
            .agent
            .get(&url)
            .call()
            .map_err(|err| request_error(&url, err))?;
        if response.status() == 204 {
            return Ok(None);
        }
        let body = response
            .into_string()
            .map_err(|source| BrokerError::Read {
                url: url.clone(),
                source,
            })?;
        if body.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(body))
        }
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), BrokerError> {
        if self.is_disposed() {
            Err(BrokerError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl StatusPublisher for RestBroker {
    fn publish_status(&mut self, xml: &str) -> Result<(), BrokerError> {
        self.send_status(xml)
    }
}

fn request_error(url: &str, err: ureq::Error) -> BrokerError {
    match err {
        ureq::Error::Status(status, _) => BrokerError::Status {
            url: url.to_string(),
            status,
        },
        other => BrokerError::Request {
            url: url.to_string(),
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(uri: &str) -> BrokerSettings {
        BrokerSettings {
            uri: uri.to_string(),
            status_topic: "Manager.Status".to_string(),
            broadcast_topic: "MgrCtl Broadcast".to_string(),
            poll_timeout_ms: 500,
        }
    }

    #[test]
    fn blank_uri_is_rejected() {
        assert!(matches!(
            RestBroker::new(&settings("  "), "mgr"),
            Err(BrokerError::MissingUri)
        ));
    }

    #[test]
    fn topic_names_are_url_encoded() {
        let broker = RestBroker::new(&settings("http://broker:8161/"), "mgr").expect("broker");
        assert_eq!(
            broker.topic_url("MgrCtl Broadcast"),
            "http://broker:8161/api/message/MgrCtl%20Broadcast?type=topic"
        );
    }

    #[test]
    fn disposed_broker_refuses_calls() {
        let broker = RestBroker::new(&settings("http://broker:8161"), "mgr").expect("broker");
        let clone = broker.clone();
        broker.dispose();
        assert!(matches!(clone.send_status("<Root/>"), Err(BrokerError::Disposed)));
    }
}

//! Adapters for the three variant data sources.
//!
//! - `gnomad`: population frequencies from the gnomAD GraphQL API
//! - `aou`: biobank counts and clinical significance from All of Us
//! - `sge`: saturation genome editing scores from a local TSV file
//!
//! The two remote clients talk JSON over a `Transport` so that tests can
//! substitute canned responses for the network.

pub mod aou;
pub mod gnomad;
pub mod sge;

use std::time::Duration;

use crate::err::Error;

/// Post a JSON body and receive a JSON document.
pub trait Transport {
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error>;
}

impl<T: Transport + ?Sized> Transport for &T {
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        (**self).post_json(url, body)
    }
}

/// `Transport` implementation on top of a blocking `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Construct with a fixed per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, Error> {
        Self::with_user_agent(
            timeout,
            &format!("rnudb-worker/{}", crate::common::worker_version()),
        )
    }

    /// Construct with a fixed per-request timeout and `User-Agent` header.
    pub fn with_user_agent(timeout: Duration, user_agent: &str) -> Result<Self, Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| Error::Transport {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post_json(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, Error> {
        let transport_err = |e: reqwest::Error| Error::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        let response = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .json(body)
            .send()
            .map_err(transport_err)?
            .error_for_status()
            .map_err(transport_err)?;

        response.json().map_err(|e| Error::Decode {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Split a compound variant identifier `<chrom>-<pos>-<ref>-<alt>`.
///
/// At least four `-`-separated fields are required and the second one must
/// consist of ASCII digits only; fields after the fourth are ignored.
pub fn parse_compound_id(raw: &str) -> Option<(i32, String, String)> {
    let parts = raw.trim().split('-').collect::<Vec<_>>();
    if parts.len() < 4 {
        return None;
    }
    let pos = parts[1];
    if pos.is_empty() || !pos.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let pos = pos.parse::<i32>().ok()?;
    if parts[2].is_empty() || parts[3].is_empty() {
        return None;
    }
    Some((pos, parts[2].to_string(), parts[3].to_string()))
}

/// Flatten a JSON text member that may be a string or a list of strings.
///
/// Lists are joined with `", "`; `null`, empty strings and empty lists yield
/// `None`.  Numbers and booleans are rendered as text.
pub fn flatten_text(value: &serde_json::Value) -> Option<String> {
    use serde_json::Value;

    let text = match value {
        Value::Null => return None,
        Value::String(s) => s.trim().to_string(),
        Value::Array(values) => values
            .iter()
            .filter_map(flatten_text)
            .collect::<Vec<_>>()
            .join(", "),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Object(_) => value.to_string(),
    };

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory `Transport` for tests.

    use std::cell::RefCell;
    use std::collections::VecDeque;

    use crate::err::Error;

    /// Replays a queue of canned responses and records the request bodies.
    #[derive(Debug, Default)]
    pub struct FakeTransport {
        responses: RefCell<VecDeque<Result<serde_json::Value, Error>>>,
        pub requests: RefCell<Vec<(String, serde_json::Value)>>,
    }

    impl FakeTransport {
        pub fn new(responses: Vec<Result<serde_json::Value, Error>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requests: RefCell::new(Vec::new()),
            }
        }

        pub fn num_requests(&self) -> usize {
            self.requests.borrow().len()
        }
    }

    impl super::Transport for FakeTransport {
        fn post_json(
            &self,
            url: &str,
            body: &serde_json::Value,
        ) -> Result<serde_json::Value, Error> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), body.clone()));
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(Error::Transport {
                        url: url.to_string(),
                        message: String::from("no more canned responses"),
                    })
                })
        }
    }

    /// Shortcut for a transport failure.
    pub fn transport_error(message: &str) -> Error {
        Error::Transport {
            url: String::from("http://fake"),
            message: message.to_string(),
        }
    }
}

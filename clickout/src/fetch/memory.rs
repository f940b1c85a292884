//! In-memory transport.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Cursor, Read};

use url::Url;

use super::Transport;
use crate::error::TransferError;

/// Serves resources from a map keyed by URL and records every request.
///
/// Unknown URLs answer like a server would, with a 404 status. Meant for
/// tests and for embedding a deployment that is already held in memory; it
/// is not `Sync`.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    resources: HashMap<String, Vec<u8>>,
    requests: RefCell<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the body served for `url`.
    pub fn with_resource(mut self, url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        self.resources.insert(url.into(), body.into());
        self
    }

    /// URLs requested so far, in order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }
}

impl Transport for MemoryTransport {
    fn open(&self, url: &Url) -> Result<Box<dyn Read>, TransferError> {
        self.requests.borrow_mut().push(url.to_string());
        match self.resources.get(url.as_str()) {
            Some(body) => Ok(Box::new(Cursor::new(body.clone()))),
            None => Err(TransferError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

//! Recording transport stub shared by the crate's tests.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::{
    delivery::{port::BotApiTransport, types::ApiRequest},
    domain::BotCredential,
    errors::Error,
    Result,
};

#[derive(Clone, Debug)]
pub(crate) enum StubReply {
    Body(String),
    Fail(String),
}

/// Replies are consumed in order; the last one repeats.
pub(crate) struct StubTransport {
    replies: Mutex<VecDeque<StubReply>>,
    calls: Mutex<Vec<(String, ApiRequest)>>,
}

impl StubTransport {
    pub(crate) fn new(replies: Vec<StubReply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn replying(body: &str) -> Arc<Self> {
        Self::new(vec![StubReply::Body(body.to_string())])
    }

    pub(crate) fn failing(reason: &str) -> Arc<Self> {
        Self::new(vec![StubReply::Fail(reason.to_string())])
    }

    pub(crate) fn calls(&self) -> Vec<(String, ApiRequest)> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl BotApiTransport for StubTransport {
    async fn get(&self, credential: &BotCredential, request: &ApiRequest) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), request.clone()));

        let reply = {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.pop_front()
            } else {
                replies.front().cloned()
            }
        };

        match reply {
            Some(StubReply::Body(body)) => Ok(body),
            Some(StubReply::Fail(reason)) => Err(Error::Transport(reason)),
            None => Err(Error::Transport("no stub reply".to_string())),
        }
    }
}

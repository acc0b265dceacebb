//! REST adapter for the collaborator poll service.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::AppConfig;
use crate::domain::{NewPoll, OptionId, Poll, PollId};
use crate::error::{QuickPollError, Result};
use crate::service::PollService;

/// Longest error body kept in `QuickPollError::Api`
const MAX_ERROR_BODY: usize = 512;

#[derive(Clone)]
pub struct PollApiClient {
    http: Client,
    base_url: String,
}

impl PollApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self> {
        let base_url = base_url.trim_end_matches('/').to_string();

        let http = Client::builder()
            .user_agent(concat!("quickpoll/", env!("CARGO_PKG_VERSION")))
            .timeout(request_timeout)
            .build()
            .map_err(|e| QuickPollError::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(
            &config.server.rest_url,
            config.connection.request_timeout(),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send and turn any non-2xx status into `QuickPollError::Api`.
    async fn send(&self, req: RequestBuilder, what: &str) -> Result<Response> {
        let resp = req.send().await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let mut body = resp.text().await.unwrap_or_default();
        if body.len() > MAX_ERROR_BODY {
            let mut cut = MAX_ERROR_BODY;
            while !body.is_char_boundary(cut) {
                cut -= 1;
            }
            body.truncate(cut);
        }
        warn!(status = status.as_u16(), "{} failed: {}", what, body);

        Err(QuickPollError::Api {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl PollService for PollApiClient {
    async fn list_polls(&self) -> Result<Vec<Poll>> {
        let resp = self
            .send(self.http.get(self.url("/polls/")), "list polls")
            .await?;
        let polls: Vec<Poll> = resp.json().await?;
        debug!("Fetched {} polls", polls.len());
        Ok(polls)
    }

    async fn create_poll(&self, poll: &NewPoll) -> Result<()> {
        self.send(
            self.http.post(self.url("/polls/")).json(poll),
            "create poll",
        )
        .await?;
        debug!("Created poll '{}' with {} options", poll.title, poll.options.len());
        Ok(())
    }

    async fn vote(&self, poll_id: PollId, option_id: OptionId) -> Result<()> {
        let path = format!("/polls/{}/vote/{}", poll_id, option_id);
        self.send(self.http.post(self.url(&path)), "vote").await?;
        Ok(())
    }

    async fn like(&self, poll_id: PollId) -> Result<()> {
        let path = format!("/polls/{}/like", poll_id);
        self.send(self.http.post(self.url(&path)), "like").await?;
        Ok(())
    }
}

//! Problem pages over HTTP.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, Url};
use tracing::debug;

use crate::{
    application::ports::{FetchError, ProblemPageSource},
    config::FetchSettings,
    domain::problem::ProblemRef,
};

use super::error::InfraError;

#[derive(Debug, Clone)]
pub struct HttpProblemSource {
    client: Client,
    base: Url,
}

impl HttpProblemSource {
    pub fn new(settings: &FetchSettings) -> Result<Self, InfraError> {
        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .timeout(settings.timeout)
            .build()
            .map_err(|err| InfraError::http_client(err.to_string()))?;
        Ok(Self {
            client,
            base: directory_url(settings.base_url.clone()),
        })
    }

    pub fn page_url(&self, problem: &ProblemRef) -> Result<Url, FetchError> {
        let path = problem.page_path();
        self.base.join(&path).map_err(|err| FetchError::InvalidUrl {
            url: format!("{}{path}", self.base),
            message: err.to_string(),
        })
    }
}

/// `Url::join` replaces the last path segment unless the base ends with `/`.
fn directory_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

#[async_trait]
impl ProblemPageSource for HttpProblemSource {
    async fn fetch_page(&self, problem: &ProblemRef) -> Result<String, FetchError> {
        let url = self.page_url(problem)?;
        let started_at = Instant::now();

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| FetchError::Connection {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status();
        debug!(
            target = "cf2pdf::fetch",
            op = "fetch_page",
            url = %url,
            status = status.as_u16(),
            elapsed_ms = started_at.elapsed().as_millis() as u64,
            "Problem page answered"
        );
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|err| FetchError::Body {
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn settings(base: &str) -> FetchSettings {
        FetchSettings {
            base_url: Url::parse(base).expect("base url"),
            timeout: Duration::from_secs(5),
            user_agent: "cf2pdf-test".to_string(),
        }
    }

    #[test]
    fn joins_problem_path_onto_base() {
        let problem = ProblemRef::new(1900, "B1").expect("problem");

        let source = HttpProblemSource::new(&settings("https://codeforces.com")).expect("client");
        assert_eq!(
            source.page_url(&problem).expect("url").as_str(),
            "https://codeforces.com/contest/1900/problem/B1"
        );

        let mirrored =
            HttpProblemSource::new(&settings("http://127.0.0.1:8080/mirror")).expect("client");
        assert_eq!(
            mirrored.page_url(&problem).expect("url").as_str(),
            "http://127.0.0.1:8080/mirror/contest/1900/problem/B1"
        );
    }
}

/*!
 * External error-analysis service client
 *
 * Wraps the network boundary to the "explain this validation error"
 * assistant. The service receives a failed segment check with the file
 * content and returns an analysis plus ranked correction suggestions. The
 * call is slow and fallible; failures surface as recoverable
 * [`RipsError::Analysis`](crate::RipsError) values and never touch
 * validation state.
 */

#[cfg(feature = "analyze")]
use crate::data_types::{AnalysisTarget, ErrorAnalysis};
#[cfg(feature = "analyze")]
use crate::{Result, RipsError};

/// Analyzer configuration
#[cfg(feature = "analyze")]
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// Endpoint accepting the analysis request as a JSON POST
    pub endpoint: String,
    /// Timeout for HTTP requests in seconds
    pub timeout_seconds: u64,
    /// Bearer token sent with each request, if required
    pub api_key: Option<String>,
    /// Custom user agent string
    pub user_agent: Option<String>,
}

#[cfg(feature = "analyze")]
impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("RIPS_ANALYZER_ENDPOINT").unwrap_or_default(),
            timeout_seconds: 60,
            api_key: std::env::var("RIPS_ANALYZER_API_KEY").ok(),
            user_agent: Some(format!("rips-rust/{}", env!("CARGO_PKG_VERSION"))),
        }
    }
}

/// Client for the external error-analysis service
#[cfg(feature = "analyze")]
pub struct ErrorAnalyzer {
    config: AnalyzerConfig,
    client: Option<reqwest::Client>,
}

#[cfg(feature = "analyze")]
impl ErrorAnalyzer {
    /// Create a new analyzer against an endpoint
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            config: AnalyzerConfig {
                endpoint: endpoint.into(),
                ..Default::default()
            },
            client: None,
        }
    }

    /// Create a new analyzer with custom configuration
    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            config,
            client: None,
        }
    }

    /// Get or create the HTTP client
    fn get_client(&mut self) -> Result<&reqwest::Client> {
        if self.client.is_none() {
            let mut builder = reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(self.config.timeout_seconds));

            if let Some(user_agent) = &self.config.user_agent {
                builder = builder.user_agent(user_agent.as_str());
            }

            self.client = Some(builder.build().map_err(|e| RipsError::Custom {
                message: format!("Failed to create HTTP client: {}", e),
                suggestion: Some("Check your network configuration".to_string()),
            })?);
        }

        Ok(self.client.as_ref().unwrap())
    }

    /// Request an analysis of one failed segment check.
    ///
    /// Sends `{fileName, segment, expected, found, fileContent}` and decodes
    /// `{analysis, suggestions}`.
    pub async fn analyze(&mut self, target: &AnalysisTarget) -> Result<ErrorAnalysis> {
        if self.config.endpoint.is_empty() {
            return Err(RipsError::Configuration {
                message: "No analyzer endpoint configured".to_string(),
                suggestion: Some(
                    "Set RIPS_ANALYZER_ENDPOINT or construct the analyzer with an endpoint URL"
                        .to_string(),
                ),
            });
        }

        let endpoint = self.config.endpoint.clone();
        let api_key = self.config.api_key.clone();
        let client = self.get_client()?;

        let mut request = client.post(&endpoint).json(target);
        if let Some(key) = &api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| RipsError::analysis_unavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(RipsError::analysis_unavailable(format!(
                "service returned HTTP {}",
                response.status()
            )));
        }

        response
            .json::<ErrorAnalysis>()
            .await
            .map_err(|e| RipsError::analysis_unavailable(format!("invalid response: {}", e)))
    }
}

#[cfg(all(test, feature = "analyze"))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_endpoint_is_a_recoverable_error() {
        let mut analyzer = ErrorAnalyzer::with_config(AnalyzerConfig {
            endpoint: String::new(),
            timeout_seconds: 1,
            api_key: None,
            user_agent: None,
        });
        let target = AnalysisTarget {
            file_name: "a.txt".to_string(),
            segment: "AF".to_string(),
            expected: 5,
            found: 3,
            file_content: String::new(),
        };
        assert!(analyzer.analyze(&target).await.is_err());
    }
}

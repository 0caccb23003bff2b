mod response;

use config::{ProfileServiceConfig, ResponseSchema};
use domain::models::{ConnectCode, FetchFailure, FetchOutcome};
use domain::repositories::PlayerProfileRepository;
use serde_json::{json, Value};
use std::time::Duration;

pub use response::decode_response;

const USER_PROFILE_PAGE_QUERY: &str = r#"
    fragment profileFields on NetplayProfile {
      id
      ratingOrdinal
      ratingUpdateCount
      wins
      losses
      dailyGlobalPlacement
      dailyRegionalPlacement
      continent
      characters {
        character
        gameCount
      }
    }

    fragment userProfilePage on User {
      fbUid
      displayName
      connectCode {
        code
      }
      status
      activeSubscription {
        level
        hasGiftSub
      }
      rankedNetplayProfile {
        ...profileFields
      }
    }

    query UserProfilePageQuery($cc: String, $uid: String) {
      getUser(fbUid: $uid, connectCode: $cc) {
        ...userProfilePage
      }
    }
"#;

const CONNECT_CODE_QUERY: &str = r#"
    query ConnectCodeQuery($code: String!) {
      getConnectCode(code: $code) {
        user {
          fbUid
          displayName
          connectCode {
            code
          }
          status
          activeSubscription {
            level
            hasGiftSub
          }
          rankedNetplayProfile {
            id
            ratingOrdinal
            ratingUpdateCount
            wins
            losses
            dailyGlobalPlacement
            dailyRegionalPlacement
            continent
            characters {
              character
              gameCount
            }
          }
        }
      }
    }
"#;

/// Client of the profile service's GraphQL endpoint. Issues one POST per connect code.
#[derive(Debug, Clone)]
pub struct GraphqlUpstreamRepository {
    client: reqwest::Client,
    endpoint_url: String,
    schema: ResponseSchema,
}

impl GraphqlUpstreamRepository {
    pub fn try_new(config: &ProfileServiceConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint_url: config.endpoint_url.clone(),
            schema: config.response_schema,
        })
    }

    fn request_body(&self, code: &ConnectCode) -> Value {
        match self.schema {
            ResponseSchema::GetUser => json!({
                "operationName": "UserProfilePageQuery",
                "query": USER_PROFILE_PAGE_QUERY,
                "variables": { "cc": code.as_str(), "uid": code.as_str() },
            }),
            ResponseSchema::GetConnectCode => json!({
                "operationName": "ConnectCodeQuery",
                "query": CONNECT_CODE_QUERY,
                "variables": { "code": code.as_str() },
            }),
        }
    }

    async fn send(&self, code: &ConnectCode) -> reqwest::Result<(reqwest::StatusCode, String)> {
        let response = self
            .client
            .post(&self.endpoint_url)
            .json(&self.request_body(code))
            .send()
            .await?;

        let status = response.status();
        Ok((status, response.text().await?))
    }
}

#[async_trait::async_trait]
impl PlayerProfileRepository for GraphqlUpstreamRepository {
    #[tracing::instrument(skip(self, code), fields(code = %code))]
    async fn fetch_profile(&self, code: &ConnectCode) -> FetchOutcome {
        tracing::info!("Fetching for {code}");

        let outcome = match self.send(code).await {
            Ok((status, body)) => decode_response(self.schema, code, status.as_u16(), &body),
            Err(error) => FetchOutcome::Failed(FetchFailure::Network {
                code: code.clone(),
                message: error.to_string(),
            }),
        };

        match &outcome {
            FetchOutcome::Fetched(_) => tracing::info!("Success for {code}"),
            FetchOutcome::Failed(failure) if failure.is_hard_failure() => {
                tracing::error!("{failure}");
            }
            FetchOutcome::Failed(failure) => tracing::warn!("{failure}"),
        }

        outcome
    }
}

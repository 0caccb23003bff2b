use config::ResponseSchema;
use domain::models::{ConnectCode, FetchFailure, FetchOutcome, ProfileRecord};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{Map, Value};

const LOGGED_BODY_EXCERPT_CHARS: usize = 500;

type UserObject = Map<String, Value>;

#[derive(Deserialize, Debug)]
struct GraphqlResponse<Data> {
    data: Option<Data>,
    #[serde(default)]
    errors: Vec<GraphqlError>,
}

#[derive(Deserialize, Debug)]
struct GraphqlError {
    message: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GetUserData {
    get_user: Option<UserObject>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GetConnectCodeData {
    get_connect_code: Option<ConnectCodeNode>,
}

#[derive(Deserialize, Debug)]
struct ConnectCodeNode {
    user: Option<UserObject>,
}

trait UserData: DeserializeOwned {
    fn into_user(self) -> Option<UserObject>;
}

impl UserData for GetUserData {
    fn into_user(self) -> Option<UserObject> {
        self.get_user
    }
}

impl UserData for GetConnectCodeData {
    fn into_user(self) -> Option<UserObject> {
        self.get_connect_code.and_then(|node| node.user)
    }
}

/// Decodes one response body of the profile service.
///
/// A body that is not JSON is a malformed response. A JSON body without a usable user
/// object, whatever its shape, is a missing profile.
pub fn decode_response(
    schema: ResponseSchema,
    code: &ConnectCode,
    status: u16,
    body: &str,
) -> FetchOutcome {
    let decoded = match schema {
        ResponseSchema::GetUser => decode_user::<GetUserData>(body),
        ResponseSchema::GetConnectCode => decode_user::<GetConnectCodeData>(body),
    };

    match decoded {
        Ok(Some(user)) => FetchOutcome::Fetched(ProfileRecord::from_user_object(code.clone(), user)),
        Ok(None) => FetchOutcome::Failed(FetchFailure::MissingProfile { code: code.clone() }),
        Err(error) => {
            let excerpt = body
                .chars()
                .take(LOGGED_BODY_EXCERPT_CHARS)
                .collect::<String>();
            tracing::error!(status, excerpt = %excerpt, "JSON parse error for {code}");

            FetchOutcome::Failed(FetchFailure::MalformedResponse {
                code: code.clone(),
                message: format!("HTTP {status}: {error}"),
            })
        }
    }
}

/// Fails only when the body is not JSON. JSON of an unexpected shape carries no user.
fn decode_user<Data: UserData>(body: &str) -> serde_json::Result<Option<UserObject>> {
    let json = serde_json::from_str::<Value>(body)?;
    let response = match serde_json::from_value::<GraphqlResponse<Data>>(json) {
        Ok(response) => response,
        Err(error) => {
            tracing::warn!("unexpected response shape: {error}");
            return Ok(None);
        }
    };

    for error in &response.errors {
        tracing::warn!("profile service reported: {}", error.message);
    }

    Ok(response.data.and_then(UserData::into_user))
}

//! Three-leg OAuth1 login against Discogs.
//!
//! ```text
//! Unauthenticated --begin_login--> RequestTokenObtained
//! RequestTokenObtained --complete_login--> Authenticated
//! Authenticated --logout--> Unauthenticated
//! ```
//!
//! A failed provider step always leaves the session unauthenticated.

use crate_digger_discogs_models::{Identity, OAuthSessionState, TokenPair};

use crate::signing::parse_form;
use crate::transport::Method;
use crate::{DiscogsClient, DiscogsError};

impl DiscogsClient {
    /// Obtains a request token and returns the URL to send the user to.
    ///
    /// Any previous login held by `state` is discarded.
    ///
    /// # Errors
    ///
    /// Returns [`DiscogsError::OAuth`] if Discogs rejects the request or the
    /// response has no token. `state` is left unauthenticated.
    pub async fn begin_login(&self, state: &mut OAuthSessionState) -> Result<String, DiscogsError> {
        let url = format!("{}/oauth/request_token", self.config.api_base);
        let callback = self.config.callback_url.clone();

        let request_token = match self
            .token_exchange(&url, None, &[("oauth_callback", callback.as_str())])
            .await
        {
            Ok(token) => token,
            Err(e) => {
                state.clear();
                return Err(e);
            }
        };

        let authorize_url = self.config.authorize_url(&request_token.token);
        log::info!("Obtained Discogs request token, redirecting user to authorize");
        state.begin(request_token);

        Ok(authorize_url)
    }

    /// Exchanges the authorized request token for an access token and
    /// resolves the username.
    ///
    /// `oauth_token` and `verifier` are the query parameters Discogs appends
    /// to the callback URL.
    ///
    /// # Errors
    ///
    /// * [`DiscogsError::NoPendingAuthentication`] if no login was started.
    ///   `state` is not modified.
    /// * [`DiscogsError::OAuth`] if the callback token does not match the
    ///   pending request token, or if the exchange or identity lookup fails.
    ///   `state` is left unauthenticated.
    pub async fn complete_login(
        &self,
        state: &mut OAuthSessionState,
        oauth_token: &str,
        verifier: &str,
    ) -> Result<(), DiscogsError> {
        let Some(request_token) = state.take_request_token() else {
            log::warn!("Discogs callback received with no pending login");
            return Err(DiscogsError::NoPendingAuthentication);
        };

        match self.exchange(&request_token, oauth_token, verifier).await {
            Ok((access_token, identity)) => {
                log::info!("Authenticated Discogs user {}", identity.username);
                state.complete(access_token, Some(identity.username));
                Ok(())
            }
            Err(e) => {
                log::warn!("Discogs login failed: {e}");
                state.clear();
                Err(e)
            }
        }
    }

    async fn exchange(
        &self,
        request_token: &TokenPair,
        oauth_token: &str,
        verifier: &str,
    ) -> Result<(TokenPair, Identity), DiscogsError> {
        if request_token.token != oauth_token {
            return Err(DiscogsError::OAuth {
                message: "callback token does not match the pending login".to_owned(),
            });
        }

        if verifier.trim().is_empty() {
            return Err(DiscogsError::OAuth {
                message: "callback is missing oauth_verifier".to_owned(),
            });
        }

        let url = format!("{}/oauth/access_token", self.config.api_base);
        let access_token = self
            .token_exchange(&url, Some(request_token), &[("oauth_verifier", verifier)])
            .await?;

        let identity = self
            .identity(&access_token)
            .await
            .map_err(|message| DiscogsError::OAuth {
                message: format!("failed to resolve identity: {message}"),
            })?;

        Ok((access_token, identity))
    }

    /// Looks up the user the access token belongs to.
    ///
    /// Returns the failure as a message so callers can classify it.
    pub(crate) async fn identity(&self, access_token: &TokenPair) -> Result<Identity, String> {
        let url = format!("{}/oauth/identity", self.config.api_base);
        let body = self
            .send_signed(Method::Get, &url, Some(access_token), &[])
            .await?;
        serde_json::from_str(&body).map_err(|e| format!("malformed identity response: {e}"))
    }

    /// POSTs a signed token request and parses the form-encoded reply.
    async fn token_exchange(
        &self,
        url: &str,
        token: Option<&TokenPair>,
        extra: &[(&str, &str)],
    ) -> Result<TokenPair, DiscogsError> {
        let body = self
            .send_signed(Method::Post, url, token, extra)
            .await
            .map_err(|message| DiscogsError::OAuth { message })?;

        parse_token_response(&body)
    }
}

/// Extracts `oauth_token` and `oauth_token_secret` from a token response.
///
/// # Errors
///
/// Returns [`DiscogsError::OAuth`] if either value is missing or empty.
pub fn parse_token_response(body: &str) -> Result<TokenPair, DiscogsError> {
    let mut form = parse_form(body);

    let mut take = |key: &str| {
        form.remove(key)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| DiscogsError::OAuth {
                message: format!("token response is missing {key}"),
            })
    };

    let token = take("oauth_token")?;
    let secret = take("oauth_token_secret")?;

    Ok(TokenPair::new(token, secret))
}

/// Logs the session out of Discogs.
pub fn logout(state: &mut OAuthSessionState) {
    if state.is_authenticated() {
        log::info!(
            "Logging out Discogs user {}",
            state.username().unwrap_or("<unknown>")
        );
    }
    state.clear();
}

#[cfg(test)]
mod tests {
    use crate_digger_discogs_models::OAuthPhase;

    use super::*;
    use crate::testing;

    const IDENTITY: &str = r#"{"id": 1, "username": "digger", "resource_url": "https://api.discogs.com/users/digger", "consumer_name": "Crate Digger"}"#;

    async fn logged_in(client: &DiscogsClient, transport: &testing::MockTransport) -> OAuthSessionState {
        let mut state = OAuthSessionState::default();
        transport.respond(200, "oauth_token=req&oauth_token_secret=req-secret&oauth_callback_confirmed=true");
        client.begin_login(&mut state).await.unwrap();
        transport.respond(200, "oauth_token=acc&oauth_token_secret=acc-secret");
        transport.respond(200, IDENTITY);
        client.complete_login(&mut state, "req", "verif").await.unwrap();
        state
    }

    #[tokio::test]
    async fn full_handshake() {
        let (client, transport, _clock) = testing::client();
        let mut state = OAuthSessionState::default();

        transport.respond(200, "oauth_token=req&oauth_token_secret=req-secret&oauth_callback_confirmed=true");
        let url = client.begin_login(&mut state).await.unwrap();
        assert_eq!(url, "https://www.discogs.com/oauth/authorize?oauth_token=req");
        assert_eq!(state.phase(), OAuthPhase::RequestTokenObtained);

        transport.respond(200, "oauth_token=acc&oauth_token_secret=acc-secret");
        transport.respond(200, IDENTITY);
        client.complete_login(&mut state, "req", "verif").await.unwrap();

        assert_eq!(state.phase(), OAuthPhase::Authenticated);
        assert!(state.request_token().is_none());
        assert_eq!(state.access_token().unwrap().token, "acc");
        assert_eq!(state.username(), Some("digger"));

        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].1.method, Method::Post);
        assert!(requests[0].1.url.ends_with("/oauth/request_token"));
        assert!(requests[0].1.header("Authorization").unwrap().contains("oauth_callback="));
        assert!(requests[1].1.url.ends_with("/oauth/access_token"));
        let access_auth = requests[1].1.header("Authorization").unwrap();
        assert!(access_auth.contains("oauth_token=\"req\""));
        assert!(access_auth.contains("oauth_verifier=\"verif\""));
        assert!(requests[2].1.url.ends_with("/oauth/identity"));
        assert!(requests[2].1.header("Authorization").unwrap().contains("oauth_token=\"acc\""));
    }

    #[tokio::test]
    async fn callback_without_login_is_rejected() {
        let (client, transport, _clock) = testing::client();
        let mut state = OAuthSessionState::default();

        let err = client.complete_login(&mut state, "req", "verif").await.unwrap_err();
        assert!(matches!(err, DiscogsError::NoPendingAuthentication));
        assert!(transport.requests().is_empty());
        assert_eq!(state.phase(), OAuthPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn callback_cannot_be_replayed() {
        let (client, transport, _clock) = testing::client();
        let mut state = logged_in(&client, &transport).await;
        let err = client.complete_login(&mut state, "req", "verif").await.unwrap_err();
        assert!(matches!(err, DiscogsError::NoPendingAuthentication));
        assert!(state.is_authenticated());
    }

    #[tokio::test]
    async fn mismatched_callback_token_resets_state() {
        let (client, transport, _clock) = testing::client();
        let mut state = OAuthSessionState::default();
        transport.respond(200, "oauth_token=req&oauth_token_secret=s");
        client.begin_login(&mut state).await.unwrap();

        let err = client.complete_login(&mut state, "other", "verif").await.unwrap_err();
        assert!(matches!(err, DiscogsError::OAuth { .. }));
        assert_eq!(state, OAuthSessionState::default());
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn rejected_exchange_resets_state() {
        let (client, transport, _clock) = testing::client();
        let mut state = OAuthSessionState::default();
        transport.respond(200, "oauth_token=req&oauth_token_secret=s");
        client.begin_login(&mut state).await.unwrap();

        transport.respond(401, "Invalid verifier");
        let err = client.complete_login(&mut state, "req", "bad").await.unwrap_err();
        assert!(matches!(err, DiscogsError::OAuth { ref message } if message.contains("401")));
        assert_eq!(state.phase(), OAuthPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn identity_failure_resets_state() {
        let (client, transport, _clock) = testing::client();
        let mut state = OAuthSessionState::default();
        transport.respond(200, "oauth_token=req&oauth_token_secret=s");
        client.begin_login(&mut state).await.unwrap();

        transport.respond(200, "oauth_token=acc&oauth_token_secret=acc-secret");
        transport.respond(500, "oops");
        let err = client.complete_login(&mut state, "req", "verif").await.unwrap_err();
        assert!(matches!(err, DiscogsError::OAuth { .. }));
        assert!(!state.is_authenticated());
        assert!(state.access_token().is_none());
    }

    #[tokio::test]
    async fn failed_request_token_leaves_session_logged_out() {
        let (client, transport, _clock) = testing::client();
        let mut state = logged_in(&client, &transport).await;

        transport.fail("connection refused");
        let err = client.begin_login(&mut state).await.unwrap_err();
        assert!(matches!(err, DiscogsError::OAuth { .. }));
        assert_eq!(state, OAuthSessionState::default());
    }

    #[tokio::test]
    async fn logout_clears_tokens() {
        let (client, transport, _clock) = testing::client();
        let mut state = logged_in(&client, &transport).await;
        logout(&mut state);
        assert_eq!(state.phase(), OAuthPhase::Unauthenticated);
        assert!(state.username().is_none());
    }

    #[test]
    fn token_response_requires_both_values() {
        assert!(parse_token_response("oauth_token=a&oauth_token_secret=b").is_ok());
        assert!(parse_token_response("oauth_token=a").is_err());
        assert!(parse_token_response("oauth_token=&oauth_token_secret=b").is_err());
        assert!(parse_token_response("<html>error</html>").is_err());
    }
}

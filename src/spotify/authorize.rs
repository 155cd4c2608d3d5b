use url::Url;

use crate::types::AuthorizationRequest;

/// Composes the authorization URL for `request`.
///
/// Parameters are appended in a fixed order and encoded as
/// `application/x-www-form-urlencoded`. Scopes are joined with a single
/// space before encoding. The PKCE verifier is not part of the request and
/// therefore can never leak into the URL.
pub fn build_authorization_url(authorize_endpoint: &Url, request: &AuthorizationRequest) -> Url {
    let mut url = authorize_endpoint.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &request.client_id)
        .append_pair("response_type", "code")
        .append_pair("redirect_uri", &request.redirect_uri)
        .append_pair("code_challenge", &request.code_challenge)
        .append_pair("code_challenge_method", request.code_challenge_method)
        .append_pair("state", request.state.as_str())
        .append_pair("scope", &request.scopes.join(" "));
    url
}

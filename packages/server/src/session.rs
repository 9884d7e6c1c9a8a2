//! Session cookie handling.

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{HttpRequest, HttpResponseBuilder};
use crate_digger_session::SessionId;

/// Name of the cookie carrying the session ID.
pub const SESSION_COOKIE: &str = "crate_digger_session";

/// The session a request belongs to.
pub struct RequestSession {
    /// Session ID.
    pub id: SessionId,
    /// Whether the ID was just minted and must be sent back.
    pub is_new: bool,
    /// Whether the request arrived over HTTPS, directly or through a proxy
    /// setting `Forwarded`/`X-Forwarded-Proto`. The cookie is then marked
    /// `Secure`.
    pub secure: bool,
}

impl RequestSession {
    /// Reads the session cookie, minting a new ID if it is missing or
    /// malformed.
    pub fn from_request(req: &HttpRequest) -> Self {
        let secure = req.connection_info().scheme().eq_ignore_ascii_case("https");

        match req
            .cookie(SESSION_COOKIE)
            .and_then(|cookie| cookie.value().parse::<SessionId>().ok())
        {
            Some(id) => Self {
                id,
                is_new: false,
                secure,
            },
            None => Self {
                id: SessionId::generate(),
                is_new: true,
                secure,
            },
        }
    }

    /// Attaches the session cookie to `builder` if the ID is new.
    pub fn attach(&self, builder: &mut HttpResponseBuilder) {
        if self.is_new {
            builder.cookie(
                Cookie::build(SESSION_COOKIE, self.id.to_string())
                    .path("/")
                    .http_only(true)
                    .same_site(SameSite::Lax)
                    .secure(self.secure)
                    .finish(),
            );
        }
    }
}

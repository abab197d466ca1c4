use axum_extra::extract::cookie::Cookie;
use axum_extra::extract::cookie::CookieJar;
use axum_extra::extract::cookie::SameSite;

pub const REFRESH_COOKIE_NAME: &str = "refreshToken";

/// Attributes of the refresh-token cookie.
///
/// The cookie is `HttpOnly`, `SameSite=Strict` and scoped to `/`; `Secure` is
/// only dropped for local development over plain HTTP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshCookie {
    pub secure: bool,
    pub max_age_seconds: i64,
}

impl RefreshCookie {
    pub fn new(secure: bool, max_age: chrono::Duration) -> Self {
        Self {
            secure,
            max_age_seconds: max_age.num_seconds(),
        }
    }

    fn build(&self, value: String) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE_NAME, value))
            .http_only(true)
            .secure(self.secure)
            .same_site(SameSite::Strict)
            .path("/")
            .max_age(time::Duration::seconds(self.max_age_seconds))
            .build()
    }

    /// Set the refresh cookie; `Max-Age` is renewed on every call.
    pub fn issue(&self, jar: CookieJar, token: String) -> CookieJar {
        jar.add(self.build(token))
    }

    /// Expire the refresh cookie, whether or not the request carried it.
    pub fn clear(&self, jar: CookieJar) -> CookieJar {
        let mut cookie = self.build(String::new());
        cookie.make_removal();
        jar.add(cookie)
    }
}

/// Refresh token carried by the request cookie, if any.
pub fn presented_refresh_token(jar: &CookieJar) -> Option<String> {
    jar.get(REFRESH_COOKIE_NAME)
        .map(|cookie| cookie.value().to_string())
        .filter(|value| !value.is_empty())
}

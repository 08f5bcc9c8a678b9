//! Cookie-backed session scaffold. Nothing in the router requires a session
//! yet; handlers that need one call these helpers directly.

use rocket::http::{Cookie, CookieJar, SameSite};
use tracing::{debug, warn};

pub const SESSION_COOKIE: &str = "session_user";

pub fn start(cookies: &CookieJar<'_>, user_id: i32) {
    debug!(user_id, "Starting session");
    cookies.add_private(
        Cookie::build((SESSION_COOKIE, user_id.to_string()))
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(false),
    );
}

pub fn current_user_id(cookies: &CookieJar<'_>) -> Option<i32> {
    let cookie = cookies.get_private(SESSION_COOKIE)?;

    match cookie.value().parse() {
        Ok(user_id) => Some(user_id),
        Err(_) => {
            warn!("Session cookie holds an invalid user id");
            None
        }
    }
}

pub fn end(cookies: &CookieJar<'_>) {
    cookies.remove_private(Cookie::from(SESSION_COOKIE));
}

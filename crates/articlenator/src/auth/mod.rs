//! X session cookies.
//!
//! Parsing and validation of user-supplied cookie strings, persistence in the
//! config directory, and live verification against the X API.

mod cookies;
mod session;
mod store;
mod verify;

pub use cookies::{
    mask_cookies, mask_value, parse_cookie_input, validate_cookies, CookieStatus,
    CookieValidation, MaskedCookie, MIN_TOKEN_LENGTH, REQUIRED_COOKIES,
};
pub use session::Session;
pub use store::CookieStore;
pub use verify::{CookieVerifier, LiveCheck};

//! Reusable scenario helpers built on [`Page`](crate::Page) and
//! [`expect`](crate::expect()).
//!
//! - [`style`]: computed style of the focused element
//! - [`toggle`]: default state of accessibility toggles
//! - [`form`]: fill a field and verify the value stuck
//! - [`consent`]: cookie banner dismissal, reactive and polling

pub mod consent;
pub mod form;
pub mod style;
pub mod toggle;

pub use consent::{install_consent_handler, ConsentBanner, ConsentState};
#[allow(deprecated)]
pub use consent::accept_consent_if_present;
pub use form::fill_and_verify;
pub use style::{expect_focused_outline, focused_element_style, ComputedStyleSnapshot};
pub use toggle::check_toggle_default;

//! kmslh.com scenarios.
//!
//! | name                   | flow                                               |
//! |------------------------|----------------------------------------------------|
//! | roi calculator         | nav menu -> ROI form -> savings figures            |
//! | accessibility toggles  | toolbar -> toggle defaults -> focus outline        |
//! | book a demo            | header CTA -> demo form -> captcha error           |
//! | knowledge center       | nav menu -> News -> search "leader"                |

mod accessibility_toggles;
mod book_demo;
mod knowledge_center;
mod roi_calculator;

pub use accessibility_toggles::AccessibilityToggles;
pub use book_demo::BookDemo;
pub use knowledge_center::KnowledgeCenter;
pub use roi_calculator::RoiCalculator;

use siteprobe::{Locator, Page, Scenario};
use std::time::Duration;

/// Bound for the header menu to open and its links to show
pub(crate) const NAV_TIMEOUT: Duration = Duration::from_millis(3000);

/// Every scenario, in run order
#[must_use]
pub fn all() -> Vec<Box<dyn Scenario>> {
    vec![
        Box::new(RoiCalculator),
        Box::new(AccessibilityToggles),
        Box::new(BookDemo),
        Box::new(KnowledgeCenter),
    ]
}

/// "Knowledge Center" entry of the header navigation
pub(crate) fn knowledge_center_nav(page: &Page) -> Locator {
    page.locator("a.header_panel__nav-list-link")
        .filter_has_text("Knowledge Center")
}

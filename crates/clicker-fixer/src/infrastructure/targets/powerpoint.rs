//! PowerPoint target: drives a running slide show through Office automation.
//!
//! The target is active while PowerPoint reports at least one slide show
//! window.  Navigation is applied to the first slide show window and is
//! suppressed once the show reaches its terminal "End of slide show"
//! screen, so a stray click never exits the show.

use thiserror::Error;
use tracing::debug;

use crate::application::targets::PresentationTarget;

/// Display name of this target.
pub const POWERPOINT: &str = "PowerPoint";

/// Error type for slide show automation.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("PowerPoint is not running")]
    NotRunning,
    #[error("no slide show window is open")]
    NoSlideShow,
    #[error("automation call {call} failed: {reason}")]
    Call { call: &'static str, reason: String },
    #[error("slide show automation is not supported on {0}")]
    Unsupported(&'static str),
}

/// View state of a slide show window.
///
/// Values follow PowerPoint's `PpSlideShowState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlideShowState {
    Running,
    Paused,
    BlackScreen,
    WhiteScreen,
    /// The "End of slide show, click to exit." screen.
    Done,
    Other(i32),
}

impl SlideShowState {
    pub fn from_raw(raw: i32) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Paused,
            3 => Self::BlackScreen,
            4 => Self::WhiteScreen,
            5 => Self::Done,
            other => Self::Other(other),
        }
    }
}

/// The slice of the presentation program's automation surface the target
/// needs.  Navigation and state calls address the first slide show window.
#[cfg_attr(test, mockall::automock)]
pub trait SlideShowAutomation: Send {
    /// Number of open slide show windows.
    fn slide_show_count(&self) -> Result<u32, AutomationError>;

    /// View state of the first slide show window.
    fn state(&self) -> Result<SlideShowState, AutomationError>;

    fn next(&self) -> Result<(), AutomationError>;

    fn previous(&self) -> Result<(), AutomationError>;
}

/// Automation for platforms without Office automation.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedAutomation;

impl SlideShowAutomation for UnsupportedAutomation {
    fn slide_show_count(&self) -> Result<u32, AutomationError> {
        Err(AutomationError::Unsupported(std::env::consts::OS))
    }

    fn state(&self) -> Result<SlideShowState, AutomationError> {
        Err(AutomationError::Unsupported(std::env::consts::OS))
    }

    fn next(&self) -> Result<(), AutomationError> {
        Err(AutomationError::Unsupported(std::env::consts::OS))
    }

    fn previous(&self) -> Result<(), AutomationError> {
        Err(AutomationError::Unsupported(std::env::consts::OS))
    }
}

/// The automation backend for the current platform.
pub fn platform_automation() -> Box<dyn SlideShowAutomation> {
    #[cfg(target_os = "windows")]
    {
        Box::new(super::powerpoint_com::ComSlideShowAutomation::new())
    }

    #[cfg(not(target_os = "windows"))]
    {
        Box::new(UnsupportedAutomation)
    }
}

/// [`PresentationTarget`] for PowerPoint slide shows.
pub struct PowerPointTarget {
    automation: Box<dyn SlideShowAutomation>,
}

impl PowerPointTarget {
    pub fn new(automation: Box<dyn SlideShowAutomation>) -> Self {
        Self { automation }
    }

    /// Runs `step` unless the show has reached its end screen.
    fn navigate(
        &self,
        label: &str,
        step: impl FnOnce(&dyn SlideShowAutomation) -> Result<(), AutomationError>,
    ) {
        let result = self.automation.state().and_then(|state| {
            if state == SlideShowState::Done {
                debug!("{POWERPOINT}: show ended; ignoring {label}");
                Ok(())
            } else {
                step(self.automation.as_ref())
            }
        });
        if let Err(e) = result {
            debug!("{POWERPOINT}: {label} failed: {e}");
        }
    }
}

impl PresentationTarget for PowerPointTarget {
    fn name(&self) -> &'static str {
        POWERPOINT
    }

    fn is_active(&self) -> bool {
        match self.automation.slide_show_count() {
            Ok(count) => count > 0,
            Err(e) => {
                debug!("{POWERPOINT}: not active: {e}");
                false
            }
        }
    }

    fn advance(&self) {
        self.navigate("advance", |a| a.next());
    }

    fn retreat(&self) {
        self.navigate("retreat", |a| a.previous());
    }

    fn release(&self) {
        // Automation objects are acquired per call; nothing is held.
        debug!("{POWERPOINT}: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target_with(automation: MockSlideShowAutomation) -> PowerPointTarget {
        PowerPointTarget::new(Box::new(automation))
    }

    #[test]
    fn test_is_active_when_a_slide_show_window_exists() {
        let mut automation = MockSlideShowAutomation::new();
        automation.expect_slide_show_count().return_once(|| Ok(1));

        assert!(target_with(automation).is_active());
    }

    #[test]
    fn test_is_not_active_without_slide_show_windows() {
        let mut automation = MockSlideShowAutomation::new();
        automation.expect_slide_show_count().return_once(|| Ok(0));

        assert!(!target_with(automation).is_active());
    }

    #[test]
    fn test_automation_failure_reports_not_active() {
        let mut automation = MockSlideShowAutomation::new();
        automation
            .expect_slide_show_count()
            .return_once(|| Err(AutomationError::NotRunning));

        assert!(!target_with(automation).is_active());
    }

    #[test]
    fn test_advance_calls_next_while_running() {
        // Arrange
        let mut automation = MockSlideShowAutomation::new();
        automation
            .expect_state()
            .return_once(|| Ok(SlideShowState::Running));
        automation.expect_next().times(1).return_once(|| Ok(()));
        automation.expect_previous().never();

        // Act
        target_with(automation).advance();
    }

    #[test]
    fn test_retreat_calls_previous_while_paused() {
        let mut automation = MockSlideShowAutomation::new();
        automation
            .expect_state()
            .return_once(|| Ok(SlideShowState::Paused));
        automation.expect_previous().times(1).return_once(|| Ok(()));

        target_with(automation).retreat();
    }

    #[test]
    fn test_navigation_is_suppressed_on_end_screen() {
        // Arrange
        let mut automation = MockSlideShowAutomation::new();
        automation
            .expect_state()
            .times(2)
            .returning(|| Ok(SlideShowState::Done));
        automation.expect_next().never();
        automation.expect_previous().never();
        let target = target_with(automation);

        // Act
        target.advance();
        target.retreat();
    }

    #[test]
    fn test_navigation_errors_are_swallowed() {
        let mut automation = MockSlideShowAutomation::new();
        automation
            .expect_state()
            .return_once(|| Ok(SlideShowState::Running));
        automation.expect_next().return_once(|| {
            Err(AutomationError::Call {
                call: "Next",
                reason: "RPC_E_CALL_REJECTED".to_string(),
            })
        });

        target_with(automation).advance();
    }

    #[test]
    fn test_release_is_idempotent() {
        let target = target_with(MockSlideShowAutomation::new());
        target.release();
        target.release();
    }

    #[test]
    fn test_slide_show_state_from_raw() {
        assert_eq!(SlideShowState::from_raw(1), SlideShowState::Running);
        assert_eq!(SlideShowState::from_raw(5), SlideShowState::Done);
        assert_eq!(SlideShowState::from_raw(-2), SlideShowState::Other(-2));
    }

    #[test]
    fn test_unsupported_automation_is_never_active() {
        let target = PowerPointTarget::new(Box::new(UnsupportedAutomation));
        assert!(!target.is_active());
        target.advance();
    }
}

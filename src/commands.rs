//! Navigation command detection.
//!
//! Detects navigation phrases in user transcripts before they reach the
//! response generator. A matched transcript is answered with a fixed
//! acknowledgement and never generates a model call.
//!
//! # Supported Commands
//!
//! | Phrase | Route |
//! |--------|-------|
//! | "go to dashboard", "show dashboard" | `/` |
//! | "open timer", "show timer" | `/pomodoro` |
//! | "show learning", "open learning" | `/learning` |
//! | "show jobs", "open jobs" | `/jobs` |
//! | "show challenges", "open challenges" | `/challenges` |
//! | "open settings", "show settings" | `/settings` |

/// A screen the host can navigate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Overview dashboard.
    Dashboard,
    /// Pomodoro focus timer.
    Timer,
    /// Learning tracker.
    Learning,
    /// Job application tracker.
    Jobs,
    /// Coding challenges.
    Challenges,
    /// Application settings.
    Settings,
}

impl Destination {
    /// Every destination, in matching order.
    pub const ALL: [Destination; 6] = [
        Self::Dashboard,
        Self::Timer,
        Self::Learning,
        Self::Jobs,
        Self::Challenges,
        Self::Settings,
    ];

    /// Host route for this destination.
    pub fn route(self) -> &'static str {
        match self {
            Self::Dashboard => "/",
            Self::Timer => "/pomodoro",
            Self::Learning => "/learning",
            Self::Jobs => "/jobs",
            Self::Challenges => "/challenges",
            Self::Settings => "/settings",
        }
    }

    /// Spoken acknowledgement.
    pub fn acknowledgement(self) -> &'static str {
        match self {
            Self::Dashboard => "Navigating to Dashboard.",
            Self::Timer => "Opening Pomodoro Timer.",
            Self::Learning => "Opening Learning Tracker.",
            Self::Jobs => "Opening Job Tracker.",
            Self::Challenges => "Opening Coding Challenges.",
            Self::Settings => "Opening Settings.",
        }
    }

    /// Lowercase trigger phrases.
    pub fn phrases(self) -> &'static [&'static str] {
        match self {
            Self::Dashboard => &["go to dashboard", "show dashboard"],
            Self::Timer => &["open timer", "show timer"],
            Self::Learning => &["show learning", "open learning"],
            Self::Jobs => &["show jobs", "open jobs"],
            Self::Challenges => &["show challenges", "open challenges"],
            Self::Settings => &["open settings", "show settings"],
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.route())
    }
}

/// Detect a navigation phrase anywhere in `transcript`, ignoring case.
pub fn detect_navigation(transcript: &str) -> Option<Destination> {
    let lower = transcript.to_lowercase();
    Destination::ALL
        .into_iter()
        .find(|dest| dest.phrases().iter().any(|phrase| lower.contains(phrase)))
}

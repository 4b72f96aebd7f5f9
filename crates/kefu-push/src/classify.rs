// SPDX-FileCopyrightText: 2026 Kefu Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider status code classification.
//!
//! Only two codes mean the user's subscription is gone. Every other failure,
//! including codes this table does not know, leaves the subscription valid.

use strum::Display;

/// How a provider status code affects the user's subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    Success,
    /// The attempt failed but the subscription stays valid.
    Transient,
    /// The user can no longer receive notifications until they re-subscribe.
    Invalidated,
    /// Not in the table; handled like [`Verdict::Transient`].
    Unknown,
}

impl Verdict {
    pub fn invalidates(self) -> bool {
        self == Self::Invalidated
    }
}

const CODE_TABLE: &[(i64, Verdict, &str)] = &[
    (0, Verdict::Success, "ok"),
    (43101, Verdict::Invalidated, "user refused subscription messages"),
    (43104, Verdict::Invalidated, "subscription expired or was single-use"),
    (45009, Verdict::Transient, "rate limited"),
    (20001, Verdict::Transient, "system busy"),
    (47003, Verdict::Transient, "template parameter error"),
    (40001, Verdict::Transient, "invalid access token"),
    (40013, Verdict::Transient, "invalid app id"),
    (40037, Verdict::Transient, "invalid template id"),
];

/// Classify a provider status code.
pub fn classify(code: i64) -> Verdict {
    CODE_TABLE
        .iter()
        .find(|(known, _, _)| *known == code)
        .map_or(Verdict::Unknown, |(_, verdict, _)| *verdict)
}

/// Short operator-facing description of a status code.
pub fn describe(code: i64) -> &'static str {
    CODE_TABLE
        .iter()
        .find(|(known, _, _)| *known == code)
        .map_or("unrecognized provider code", |(_, _, text)| text)
}

/// The subscription flag to write after a send. `None` means leave it as it is.
///
/// Only invalidation writes. A send is only attempted for a subscribed user,
/// so every other outcome already finds the flag set.
pub fn resolve_subscription(verdict: Verdict) -> Option<bool> {
    match verdict {
        Verdict::Invalidated => Some(false),
        Verdict::Success | Verdict::Transient | Verdict::Unknown => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_refusal_and_expiry_invalidate() {
        assert_eq!(classify(43101), Verdict::Invalidated);
        assert_eq!(classify(43104), Verdict::Invalidated);
        for code in [45009, 20001, 47003, 40001, 40013, 40037] {
            assert_eq!(classify(code), Verdict::Transient, "code {code}");
            assert!(!classify(code).invalidates());
        }
        assert_eq!(classify(0), Verdict::Success);
    }

    #[test]
    fn unknown_codes_do_not_invalidate() {
        assert_eq!(classify(-1), Verdict::Unknown);
        assert_eq!(classify(99999), Verdict::Unknown);
        assert!(!Verdict::Unknown.invalidates());
        assert_eq!(describe(99999), "unrecognized provider code");
        assert_eq!(describe(45009), "rate limited");
    }

    #[test]
    fn refusal_and_expiry_clear_subscription() {
        assert_eq!(resolve_subscription(classify(43101)), Some(false));
        assert_eq!(resolve_subscription(classify(43104)), Some(false));
    }

    #[test]
    fn other_outcomes_leave_subscription_alone() {
        for code in [0, 45009, 20001, 47003, 40001, 99999] {
            assert_eq!(resolve_subscription(classify(code)), None, "code {code}");
        }
    }

    #[test]
    fn verdict_displays_snake_case() {
        assert_eq!(Verdict::Invalidated.to_string(), "invalidated");
    }
}

//! Read and write policy for diagrams.
//!
//! The gate is a pure function of its inputs. It never performs I/O and
//! never looks at ambient request state: the caller's session, the presented
//! share token and the current instant are passed explicitly.

use chrono::{DateTime, Utc};

use super::diagram::{Diagram, ShareToken};
use super::user::User;

/// Outcome of a read check, distinguishing how access was granted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadGrant {
    /// Diagram is public.
    Public,
    /// Caller owns the diagram.
    Owner,
    /// Caller presented the token of an active share.
    ActiveShare,
    /// Caller presented the token of an inactive share while logged in.
    ExpiredShare,
}

/// Stateless authorisation policy.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessGate;

impl AccessGate {
    /// Decide whether `session` may read `diagram`.
    ///
    /// Rules, first match wins:
    /// 1. public diagrams are readable by anyone;
    /// 2. owners read their own diagrams;
    /// 3. a token matching an active share grants read;
    /// 4. a token matching an inactive share grants read only to a logged-in
    ///    caller.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use renderboard::domain::{AccessGate, Diagram};
    /// # fn example(diagram: &Diagram) {
    /// let grant = AccessGate::can_read(None, diagram, None, Utc::now());
    /// assert_eq!(grant.is_some(), !diagram.is_private);
    /// # }
    /// ```
    pub fn can_read(
        session: Option<&User>,
        diagram: &Diagram,
        token: Option<&ShareToken>,
        now: DateTime<Utc>,
    ) -> Option<ReadGrant> {
        if !diagram.is_private {
            return Some(ReadGrant::Public);
        }
        if session.is_some_and(|user| diagram.is_owned_by(user.id())) {
            return Some(ReadGrant::Owner);
        }
        if !token.is_some_and(|candidate| diagram.share.matches(candidate)) {
            return None;
        }
        if diagram.share.is_active(now) {
            Some(ReadGrant::ActiveShare)
        } else if session.is_some() {
            Some(ReadGrant::ExpiredShare)
        } else {
            None
        }
    }

    /// Only the owner may mutate a diagram; guest diagrams are immutable.
    pub fn can_write(session: Option<&User>, diagram: &Diagram) -> bool {
        session.is_some_and(|user| diagram.is_owned_by(user.id()))
    }
}

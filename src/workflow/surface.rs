//! Admin surface
//!
//! What a transition can ask of the presentation layer: flash a message,
//! redirect, refresh the content pane, add the record to the listing.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::record::{Record, RecordId};

/// Severity of a flash message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Good,
    Bad,
}

impl NoticeLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeLevel::Good => "good",
            NoticeLevel::Bad => "bad",
        }
    }
}

/// HTTP status of a redirect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum RedirectStatus {
    /// 302
    Found,
    /// 303
    SeeOther,
}

impl RedirectStatus {
    pub fn code(&self) -> u16 {
        match self {
            RedirectStatus::Found => 302,
            RedirectStatus::SeeOther => 303,
        }
    }
}

impl TryFrom<u16> for RedirectStatus {
    type Error = String;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            302 => Ok(RedirectStatus::Found),
            303 => Ok(RedirectStatus::SeeOther),
            other => Err(format!("unsupported redirect status: {}", other)),
        }
    }
}

impl From<RedirectStatus> for u16 {
    fn from(status: RedirectStatus) -> u16 {
        status.code()
    }
}

impl fmt::Display for RedirectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Presentation hooks used by the workflow.
pub trait AdminSurface {
    /// Flashes a message on the next rendered form.
    fn notify(&mut self, message: &str, level: NoticeLevel);

    fn redirect(&mut self, url: &str, status: RedirectStatus);

    fn redirect_back(&mut self);

    /// Forces a refresh of the content pane only.
    fn mark_partial_refresh(&mut self);

    /// Ensures the record appears in the listing it was opened from.
    fn add_to_listing(&mut self, record: &Record);
}

/// Surface that records every call.
#[derive(Debug, Default, Clone)]
pub struct RecordedSurface {
    pub notices: Vec<(String, NoticeLevel)>,
    pub redirects: Vec<(String, RedirectStatus)>,
    pub redirected_back: usize,
    pub partial_refresh: bool,
    pub listing: Vec<RecordId>,
}

impl RecordedSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_notice(&self) -> Option<(&str, NoticeLevel)> {
        self.notices.last().map(|(m, l)| (m.as_str(), *l))
    }

    pub fn last_redirect(&self) -> Option<(&str, RedirectStatus)> {
        self.redirects.last().map(|(u, s)| (u.as_str(), *s))
    }
}

impl AdminSurface for RecordedSurface {
    fn notify(&mut self, message: &str, level: NoticeLevel) {
        self.notices.push((message.to_string(), level));
    }

    fn redirect(&mut self, url: &str, status: RedirectStatus) {
        self.redirects.push((url.to_string(), status));
    }

    fn redirect_back(&mut self) {
        self.redirected_back += 1;
    }

    fn mark_partial_refresh(&mut self) {
        self.partial_refresh = true;
    }

    fn add_to_listing(&mut self, record: &Record) {
        if !self.listing.contains(&record.id) {
            self.listing.push(record.id.clone());
        }
    }
}

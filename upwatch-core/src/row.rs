use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::Serialize;
use upwatch_client::{Target, TargetStatus};

pub const PLACEHOLDER: &str = "—";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Liveness {
    Up,
    Down,
    Unknown,
}

impl Liveness {
    pub fn from_flag(is_up: Option<bool>) -> Self {
        match is_up {
            Some(true) => Liveness::Up,
            Some(false) => Liveness::Down,
            None => Liveness::Unknown,
        }
    }

    pub fn badge(&self) -> &'static str {
        match self {
            Liveness::Up => "Up",
            Liveness::Down => "Down",
            Liveness::Unknown => PLACEHOLDER,
        }
    }
}

/// One dashboard row.
///
/// `Enriched` rows come from the status endpoint; `Bare` rows come from the
/// plain target list when the status endpoint is not deployed, and carry no
/// liveness at all.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewRow {
    Enriched(TargetStatus),
    Bare(Target),
}

impl ViewRow {
    pub fn id(&self) -> i64 {
        match self {
            ViewRow::Enriched(s) => s.id,
            ViewRow::Bare(t) => t.id,
        }
    }

    pub fn url(&self) -> &str {
        match self {
            ViewRow::Enriched(s) => &s.url,
            ViewRow::Bare(t) => &t.url,
        }
    }

    pub fn name(&self) -> Option<&str> {
        let name = match self {
            ViewRow::Enriched(s) => s.name.as_deref(),
            ViewRow::Bare(t) => t.name.as_deref(),
        };
        name.filter(|n| !n.is_empty())
    }

    /// What the row is called on screen: its name, or its URL if unnamed.
    pub fn label(&self) -> &str {
        self.name().unwrap_or_else(|| self.url())
    }

    pub fn liveness(&self) -> Liveness {
        match self {
            ViewRow::Enriched(s) => Liveness::from_flag(s.is_up),
            ViewRow::Bare(_) => Liveness::Unknown,
        }
    }

    pub fn checked_at(&self) -> Option<&str> {
        match self {
            ViewRow::Enriched(s) => s.checked_at.as_deref(),
            ViewRow::Bare(_) => None,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            ViewRow::Enriched(s) => s.status_code,
            ViewRow::Bare(_) => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            ViewRow::Enriched(s) => s.error.as_deref(),
            ViewRow::Bare(_) => None,
        }
    }

    pub fn last_checked(&self) -> String {
        format_timestamp(self.checked_at())
    }
}

/// Render an ISO-8601 timestamp in local time, or "—" when absent or unreadable.
///
/// Timestamps without an offset are taken as local time.
pub fn format_timestamp(iso: Option<&str>) -> String {
    const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    let Some(iso) = iso.map(str::trim).filter(|s| !s.is_empty()) else {
        return PLACEHOLDER.to_string();
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(iso) {
        return parsed.with_timezone(&Local).format(FORMAT).to_string();
    }

    NaiveDateTime::parse_from_str(iso, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|local| local.format(FORMAT).to_string())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

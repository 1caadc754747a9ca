use std::collections::HashSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use sam_core::NominativeUserDetails;
use sam_platform::NominativeUserInput;
use tracing::warn;

use crate::error::{ServiceError, ServiceResult};

/// Product identity used when a record is not attached to an aggregation:
/// `name_editor[_version]` with spaces replaced by underscores.
pub fn derive_swidtag(name: &str, editor: &str, version: &str) -> String {
    let joined = if version.is_empty() {
        format!("{name}_{editor}")
    } else {
        format!("{name}_{editor}_{version}")
    };
    joined.replace(' ', "_")
}

/// Parses an optional RFC 3339 maintenance date. Unparseable input is
/// treated as absent.
pub fn parse_maintenance_date(raw: &str) -> Option<DateTime<Utc>> {
    if raw.is_empty() {
        return None;
    }
    match DateTime::parse_from_rfc3339(raw) {
        Ok(parsed) => Some(parsed.with_timezone(&Utc)),
        Err(err) => {
            warn!(raw, "ignoring unparseable maintenance date: {err}");
            None
        }
    }
}

pub fn check_maintenance_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> ServiceResult<()> {
    match (start, end) {
        (Some(start), Some(end)) if end <= start => Err(ServiceError::validation(
            "end of maintenance must be after its start",
        )),
        _ => Ok(()),
    }
}

/// Activation dates arrive as `YYYY-MM-DD`, `YYYY/MM/DD` or `YY/D/M`, the
/// long forms optionally followed by `THH:MM:SS.mmmZ`.
pub fn parse_activation_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let slashed = raw.contains('/');

    if raw.len() <= 10 {
        let format = match (slashed, raw.len() <= 8) {
            (true, true) => "%y/%d/%m",
            (true, false) => "%Y/%m/%d",
            (false, _) => "%Y-%m-%d",
        };
        NaiveDate::parse_from_str(raw, format).ok()
    } else if raw.len() <= 24 {
        let format = if slashed {
            "%Y/%m/%dT%H:%M:%S%.3fZ"
        } else {
            "%Y-%m-%dT%H:%M:%S%.3fZ"
        };
        NaiveDateTime::parse_from_str(raw, format)
            .ok()
            .map(|parsed| parsed.date())
    } else {
        None
    }
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

#[derive(Debug, Default)]
pub struct ScreenedUsers {
    pub accepted: Vec<NominativeUserDetails>,
    pub rejected: usize,
}

/// Keeps users with a valid email, dropping repeats of an email and profile
/// pair already seen in the batch.
pub fn screen_nominative_users(inputs: &[NominativeUserInput]) -> ScreenedUsers {
    let mut seen = HashSet::new();
    let mut screened = ScreenedUsers::default();

    for input in inputs {
        let valid = is_valid_email(&input.email);
        let first = seen.insert((input.email.clone(), input.profile.clone()));
        if !valid || !first {
            warn!(
                email = %input.email,
                profile = %input.profile,
                duplicate = !first,
                "nominative user rejected"
            );
            screened.rejected += 1;
            continue;
        }

        screened.accepted.push(NominativeUserDetails {
            user_name: input.user_name.clone(),
            first_name: input.first_name.clone(),
            email: input.email.clone(),
            profile: input.profile.clone(),
            activation_date: parse_activation_date(&input.activation_date),
        });
    }

    screened
}

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Concurrent-user counts are recorded per month. An update to a record
/// whose calendar month matches the current one keeps the record's date,
/// whatever its year; anything else lands on the current month.
pub fn purchase_date(today: NaiveDate, existing: Option<NaiveDate>) -> NaiveDate {
    match existing {
        Some(previous) if previous.month() == today.month() => first_of_month(previous),
        _ => first_of_month(today),
    }
}

//! The chat command grammar.
//!
//! Commands are matched against an ordered table of patterns; the first
//! pattern that matches and yields a command wins. Text matching nothing is
//! not a command.

use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use purgebot_cron::JobSchedule;

const DATE_FORMAT: &str = "%d.%m.%Y";
const TIME_FORMAT: &str = "%H:%M";

/// Upper bound for `last N`.
pub const MAX_DELETE_COUNT: u32 = 100;

/// A recognized chat command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `hey`: list the queue.
    ListQueue,
    /// `lock` or `unlock` with no password.
    MissingPassword,
    Lock(String),
    Unlock(String),
    Clear,
    Delete(DeleteRequest),
}

/// Which day a `delete` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    Today,
    Tomorrow,
    On(NaiveDate),
}

/// Parsed arguments of a `delete` command, before resolving against the clock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteRequest {
    /// How many messages to delete, ending at the replied-to one.
    pub count: u32,
    pub date: DateSpec,
    pub from: NaiveTime,
    /// End of the window; `None` for a plain deadline.
    pub until: Option<NaiveTime>,
}

impl DeleteRequest {
    /// Turn the request into a concrete schedule relative to `now`.
    ///
    /// Returns `None` when the date overflows or the window is empty.
    pub fn resolve(&self, now: DateTime<FixedOffset>) -> Option<JobSchedule> {
        let offset = *now.offset();
        let today = now.date_naive();
        let date = match self.date {
            DateSpec::Today => today,
            DateSpec::Tomorrow => today.checked_add_days(Days::new(1))?,
            DateSpec::On(date) => date,
        };

        let from = offset
            .from_local_datetime(&date.and_time(self.from))
            .single()?;
        match self.until {
            None => Some(JobSchedule::Deadline { at: from }),
            Some(until) => {
                let until = offset.from_local_datetime(&date.and_time(until)).single()?;
                JobSchedule::window(from, until).ok()
            }
        }
    }
}

type Matcher = fn(&Captures<'_>) -> Option<Command>;

static GRAMMAR: Lazy<Vec<(Regex, Matcher)>> = Lazy::new(|| {
    let rules: [(&str, Matcher); 6] = [
        (r"^hey$", |_| Some(Command::ListQueue)),
        (r"^(?:lock|unlock)$", |_| Some(Command::MissingPassword)),
        (r"^lock\s+(\S+)$", |caps| Some(Command::Lock(caps[1].to_string()))),
        (r"^unlock\s+(\S+)$", |caps| {
            Some(Command::Unlock(caps[1].to_string()))
        }),
        (r"^clear$", |_| Some(Command::Clear)),
        (
            r"^delete\s+(?:last\s+(\d+)\s+)?(\d\d\.\d\d\.\d\d\d\d|today|tomorrow)\s+(\d\d:\d\d)(?:(?:-|\s)+(\d\d:\d\d))?$",
            parse_delete,
        ),
    ];
    rules
        .into_iter()
        .map(|(pattern, matcher)| (Regex::new(pattern).expect("invalid command pattern"), matcher))
        .collect()
});

fn parse_delete(caps: &Captures<'_>) -> Option<Command> {
    let count = match caps.get(1) {
        Some(n) => n
            .as_str()
            .parse::<u32>()
            .ok()
            .filter(|n| (1..=MAX_DELETE_COUNT).contains(n))?,
        None => 1,
    };
    let date = match &caps[2] {
        "today" => DateSpec::Today,
        "tomorrow" => DateSpec::Tomorrow,
        other => DateSpec::On(NaiveDate::parse_from_str(other, DATE_FORMAT).ok()?),
    };
    let from = NaiveTime::parse_from_str(&caps[3], TIME_FORMAT).ok()?;
    let until = match caps.get(4) {
        Some(t) => Some(NaiveTime::parse_from_str(t.as_str(), TIME_FORMAT).ok()?),
        None => None,
    };

    Some(Command::Delete(DeleteRequest {
        count,
        date,
        from,
        until,
    }))
}

/// Normalize a message (trim, lowercase) and match it against the grammar.
pub fn parse(text: &str) -> Option<Command> {
    let text = text.trim().to_lowercase();
    GRAMMAR.iter().find_map(|(pattern, matcher)| {
        pattern.captures(&text).and_then(|caps| matcher(&caps))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 1, 1, 8, 30, 0)
            .unwrap()
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("hey"), Some(Command::ListQueue));
        assert_eq!(parse("  HEY \n"), Some(Command::ListQueue));
        assert_eq!(parse("clear"), Some(Command::Clear));
        assert_eq!(parse("lock"), Some(Command::MissingPassword));
        assert_eq!(parse("Unlock"), Some(Command::MissingPassword));
    }

    #[test]
    fn test_lock_with_password() {
        assert_eq!(parse("lock Secret"), Some(Command::Lock("secret".into())));
        assert_eq!(parse("unlock  abc"), Some(Command::Unlock("abc".into())));
        assert_eq!(parse("lock a b"), None);
        assert_eq!(parse("lockdown"), None);
    }

    #[test]
    fn test_not_commands() {
        assert_eq!(parse("banana"), None);
        assert_eq!(parse("hey there"), None);
        assert_eq!(parse("clear all"), None);
        assert_eq!(parse(""), None);
    }

    #[test]
    fn test_delete_window() {
        let expected = Command::Delete(DeleteRequest {
            count: 1,
            date: DateSpec::Today,
            from: time(10, 0),
            until: Some(time(11, 0)),
        });
        assert_eq!(parse("delete today 10:00-11:00"), Some(expected.clone()));
        assert_eq!(parse("Delete TODAY 10:00 - 11:00"), Some(expected.clone()));
        assert_eq!(parse("delete today 10:00 11:00"), Some(expected));
    }

    #[test]
    fn test_delete_deadline_with_count() {
        assert_eq!(
            parse("delete last 3 tomorrow 09:00"),
            Some(Command::Delete(DeleteRequest {
                count: 3,
                date: DateSpec::Tomorrow,
                from: time(9, 0),
                until: None,
            }))
        );
    }

    #[test]
    fn test_delete_count_at_limit() {
        let Some(Command::Delete(req)) = parse("delete last 100 today 10:00") else {
            panic!("expected delete");
        };
        assert_eq!(req.count, MAX_DELETE_COUNT);
    }

    #[test]
    fn test_delete_explicit_date() {
        assert_eq!(
            parse("delete 15.03.2024 23:59"),
            Some(Command::Delete(DeleteRequest {
                count: 1,
                date: DateSpec::On(NaiveDate::from_ymd_opt(2024, 3, 15).unwrap()),
                from: time(23, 59),
                until: None,
            }))
        );
    }

    #[test]
    fn test_delete_malformed() {
        assert_eq!(parse("delete 31.02.2024 10:00"), None);
        assert_eq!(parse("delete today 25:00"), None);
        assert_eq!(parse("delete last 0 today 10:00"), None);
        assert_eq!(parse("delete last 101 today 10:00"), None);
        assert_eq!(parse("delete last 4000000000 today 10:00"), None);
        assert_eq!(parse("delete last 99999999999 today 10:00"), None);
        assert_eq!(parse("delete yesterday 10:00"), None);
        assert_eq!(parse("delete today 9:00"), None);
        assert_eq!(parse("delete today"), None);
    }

    #[test]
    fn test_resolve_today_window() {
        let Some(Command::Delete(req)) = parse("delete today 10:00-11:00") else {
            panic!("expected delete");
        };
        let offset = *now().offset();
        assert_eq!(
            req.resolve(now()),
            Some(JobSchedule::Window {
                from: offset.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap(),
                until: offset.with_ymd_and_hms(2024, 1, 1, 11, 0, 0).unwrap(),
            })
        );
    }

    #[test]
    fn test_resolve_tomorrow_crosses_year() {
        let Some(Command::Delete(req)) = parse("delete tomorrow 09:00") else {
            panic!("expected delete");
        };
        let new_year_eve = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2023, 12, 31, 22, 0, 0)
            .unwrap();
        assert_eq!(
            req.resolve(new_year_eve),
            Some(JobSchedule::Deadline {
                at: FixedOffset::east_opt(0)
                    .unwrap()
                    .with_ymd_and_hms(2024, 1, 1, 9, 0, 0)
                    .unwrap(),
            })
        );
    }

    #[test]
    fn test_resolve_rejects_inverted_window() {
        let Some(Command::Delete(req)) = parse("delete today 11:00-10:00") else {
            panic!("expected delete");
        };
        assert_eq!(req.resolve(now()), None);
    }
}

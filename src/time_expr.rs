use chrono::{DateTime, Local, NaiveTime, TimeDelta};

use crate::error::{Result, ReviewError};

const GIT_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Resolve a `--since` token (`today`, `1h`, `30m`, `2d`) against the current time.
pub fn parse_time_expr(token: &str) -> Result<DateTime<Local>> {
    parse_time_expr_at(token, Local::now())
}

pub fn parse_time_expr_at(token: &str, now: DateTime<Local>) -> Result<DateTime<Local>> {
    let normalized = token.trim().to_lowercase();
    let invalid = || ReviewError::InvalidTimeFormat(token.to_string());

    if normalized == "today" {
        let midnight = now.date_naive().and_time(NaiveTime::MIN);
        return midnight
            .and_local_timezone(Local)
            .earliest()
            .ok_or_else(invalid);
    }

    let Some(unit) = normalized.chars().last() else {
        return Err(invalid());
    };
    let digits = &normalized[..normalized.len() - unit.len_utf8()];
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    let amount: i64 = digits.parse().map_err(|_| invalid())?;

    let delta = match unit {
        'h' => TimeDelta::try_hours(amount),
        'm' => TimeDelta::try_minutes(amount),
        'd' => TimeDelta::try_days(amount),
        _ => None,
    }
    .ok_or_else(invalid)?;

    now.checked_sub_signed(delta).ok_or_else(invalid)
}

/// Render a point in time as a `--before=` boundary git understands.
pub fn to_git_timestamp(at: &DateTime<Local>) -> String {
    at.format(GIT_TIMESTAMP_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Timelike};

    use super::*;

    fn fixed_now() -> DateTime<Local> {
        Local
            .with_ymd_and_hms(2024, 5, 14, 15, 42, 7)
            .earliest()
            .expect("valid local time")
    }

    #[test]
    fn relative_tokens_subtract_units() {
        let now = fixed_now();
        let cases = [
            ("1h", TimeDelta::hours(1)),
            ("30m", TimeDelta::minutes(30)),
            ("2d", TimeDelta::days(2)),
            ("0h", TimeDelta::zero()),
        ];
        for (token, delta) in cases {
            let at = parse_time_expr_at(token, now).expect("token parses");
            assert_eq!(now - at, delta, "token {token}");
        }
    }

    #[test]
    fn relative_token_is_close_to_wall_clock() {
        let at = parse_time_expr("2h").expect("token parses");
        let elapsed = Local::now() - at;
        let drift = (elapsed - TimeDelta::hours(2)).num_milliseconds().abs();
        assert!(drift < 1_000, "drift {drift}ms");
    }

    #[test]
    fn today_is_local_midnight() {
        let at = parse_time_expr("today").expect("today parses");
        assert_eq!(at.hour(), 0);
        assert_eq!(at.minute(), 0);
        assert_eq!(at.second(), 0);
        assert_eq!(at.nanosecond(), 0);
        assert_eq!(at.date_naive(), Local::now().date_naive());
    }

    #[test]
    fn tokens_are_trimmed_and_case_insensitive() {
        let now = fixed_now();
        assert!(parse_time_expr_at("  TODAY ", now).is_ok());
        assert_eq!(
            parse_time_expr_at("3H", now).expect("parses"),
            now - TimeDelta::hours(3)
        );
    }

    #[test]
    fn unsupported_tokens_fail() {
        for token in ["soon", "-1h", "1x", "", "h", "1.5h", "1 h", "1hh", "99999999999999999999d"] {
            match parse_time_expr_at(token, fixed_now()) {
                Err(ReviewError::InvalidTimeFormat(t)) => assert_eq!(t, token),
                other => panic!("expected InvalidTimeFormat for {token:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn git_timestamp_format() {
        assert_eq!(to_git_timestamp(&fixed_now()), "2024-05-14 15:42:07");
    }
}

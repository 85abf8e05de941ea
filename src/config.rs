//! Parsing of the runtime schedule configuration string.

use std::env;

use crate::schedule::Schedule;

/// The environment variable consulted when a call requests
/// [`Schedule::Runtime`]: a string of the form `"<name>[,<chunk>]"`, for
/// example `"guided,4"` or `"dynamic"`.
pub const SCHEDULE_ENV: &str = "LOOPSHARE_SCHEDULE";

/// Parses `"<name>[,<chunk>]"`. Returns `None` on anything malformed: an
/// unknown schedule name, a chunk that is not a positive integer, or trailing
/// garbage. Surrounding whitespace and ASCII case are ignored.
pub(crate) fn parse_schedule(raw: &str) -> Option<Schedule> {
    let mut parts = raw.splitn(2, ',');
    let name = parts.next()?.trim();
    let chunk = match parts.next() {
        Some(text) => Some(text.trim().parse::<usize>().ok().filter(|&chunk| chunk > 0)?),
        None => None,
    };

    if name.eq_ignore_ascii_case("static") {
        Some(Schedule::Static { chunk })
    } else if name.eq_ignore_ascii_case("dynamic") {
        Some(Schedule::Dynamic { chunk })
    } else if name.eq_ignore_ascii_case("guided") {
        Some(Schedule::Guided { chunk })
    } else {
        None
    }
}

/// Resolves a [`Schedule::Runtime`] request from the environment. An unset
/// variable quietly selects the default static schedule; a set but malformed
/// one goes through the warning fallback in [`Schedule::from_config_str`].
pub(crate) fn schedule_from_env() -> Schedule {
    match env::var(SCHEDULE_ENV) {
        Ok(raw) => Schedule::from_config_str(&raw),
        Err(_) => Schedule::Static { chunk: None },
    }
}

// -----------------------------------------------------------------------------
// Tests

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_names() {
        assert_eq!(
            parse_schedule("static"),
            Some(Schedule::Static { chunk: None })
        );
        assert_eq!(
            parse_schedule("dynamic"),
            Some(Schedule::Dynamic { chunk: None })
        );
        assert_eq!(
            parse_schedule("guided"),
            Some(Schedule::Guided { chunk: None })
        );
    }

    #[test]
    fn chunk_suffix() {
        assert_eq!(
            parse_schedule("dynamic,4"),
            Some(Schedule::Dynamic { chunk: Some(4) })
        );
        assert_eq!(
            parse_schedule("guided, 16 "),
            Some(Schedule::Guided { chunk: Some(16) })
        );
    }

    #[test]
    fn case_and_whitespace() {
        assert_eq!(
            parse_schedule("  GUIDED  "),
            Some(Schedule::Guided { chunk: None })
        );
        assert_eq!(
            parse_schedule("Static,2"),
            Some(Schedule::Static { chunk: Some(2) })
        );
    }

    #[test]
    fn malformed() {
        assert_eq!(parse_schedule(""), None);
        assert_eq!(parse_schedule("roundrobin"), None);
        assert_eq!(parse_schedule("dynamic,0"), None);
        assert_eq!(parse_schedule("dynamic,-3"), None);
        assert_eq!(parse_schedule("dynamic,seven"), None);
        assert_eq!(parse_schedule("guided,4,4"), None);
    }

    #[test]
    fn fallback_is_default_static() {
        assert_eq!(
            Schedule::from_config_str("bogus,99"),
            Schedule::Static { chunk: None }
        );
    }
}

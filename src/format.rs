//! Display formatting for dates, runtimes, money and ratings.

use chrono::NaiveDate;

/// Four-digit year prefix of an ISO date.
pub fn year(date: &str) -> Option<&str> {
    let year = date.get(..4)?;
    year.bytes().all(|b| b.is_ascii_digit()).then_some(year)
}

/// `125` -> `"2h 5min"`, `45` -> `"45min"`.
pub fn runtime(minutes: u32) -> String {
    let hours = minutes / 60;
    let mins = minutes % 60;
    match (hours, mins) {
        (0, m) => format!("{}min", m),
        (h, 0) => format!("{}h", h),
        (h, m) => format!("{}h {}min", h, m),
    }
}

pub fn thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn money(value: u64) -> String {
    format!("${}", thousands(value))
}

pub fn rating(vote_average: f32) -> String {
    format!("{:.1}/10", vote_average)
}

/// `"2024-03-01"` -> `"March 1, 2024"`. Unparseable input is returned as is.
pub fn long_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%B %-d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

/// Human label for a TMDB release status.
pub fn status(status: &str) -> &str {
    match status {
        "Released" => "Released",
        "Post Production" => "Post-production",
        "In Production" => "In production",
        "Planned" => "Planned",
        "Rumored" => "Rumored",
        "Canceled" => "Canceled",
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn years_need_four_digits() {
        assert_eq!(year("2024-03-01"), Some("2024"));
        assert_eq!(year("24"), None);
        assert_eq!(year("abcd-01-01"), None);
    }

    #[test]
    fn runtimes() {
        assert_eq!(runtime(125), "2h 5min");
        assert_eq!(runtime(45), "45min");
        assert_eq!(runtime(120), "2h");
    }

    #[test]
    fn money_groups_thousands() {
        assert_eq!(money(1_234_567), "$1,234,567");
        assert_eq!(money(999), "$999");
        assert_eq!(thousands(1000), "1,000");
    }

    #[test]
    fn dates() {
        assert_eq!(long_date("2024-03-01"), "March 1, 2024");
        assert_eq!(long_date("soon"), "soon");
        assert_eq!(rating(7.84), "7.8/10");
    }
}

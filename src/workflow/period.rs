use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Invalid period '{0}', expected YYYY, YYYY-Qn or YYYY-MM")]
pub struct PeriodError(pub String);

/// Accepts yearly ("2025"), quarterly ("2025-Q3") and monthly ("2025-07") periods.
pub fn validate_period(period: &str) -> Result<(), PeriodError> {
    let err = || PeriodError(period.to_string());

    let (year, rest) = match period.split_once('-') {
        Some((year, rest)) => (year, Some(rest)),
        None => (period, None),
    };

    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return Err(err());
    }

    match rest {
        None => Ok(()),
        Some(q) if q.starts_with('Q') => match &q[1..] {
            "1" | "2" | "3" | "4" => Ok(()),
            _ => Err(err()),
        },
        Some(m) if m.len() == 2 && m.bytes().all(|b| b.is_ascii_digit()) => match m.parse::<u8>() {
            Ok(1..=12) => Ok(()),
            _ => Err(err()),
        },
        Some(_) => Err(err()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_shapes() {
        for p in ["2025", "2025-Q1", "2025-Q4", "2025-01", "2025-12"] {
            assert!(validate_period(p).is_ok(), "{p}");
        }
    }

    #[test]
    fn rejects_garbage() {
        for p in [
            "", "25", "2025-Q5", "2025-Q0", "2025-13", "2025-1", "2025-Q", "abcd-Q1", "2025-Q3-x",
        ] {
            assert!(validate_period(p).is_err(), "{p}");
        }
    }

    #[test]
    fn rejects_signed_months_and_quarters() {
        // parse::<u8> alone would accept these and create a second "January"
        for p in ["2025-+1", "2025-Q+1", "+025", "2025- 1"] {
            assert!(validate_period(p).is_err(), "{p}");
        }
    }
}

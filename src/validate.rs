//! Input preconditions, checked before handlers touch the store.

use chrono::NaiveDate;

use crate::error::ApiError;

pub fn email(value: &str) -> Result<(), ApiError> {
    let mut parts = value.split('@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next().unwrap_or_default();
    let valid = parts.next().is_none()
        && !local.is_empty()
        && !domain.is_empty()
        && domain.contains('.')
        && !value.contains(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(ApiError::validation("valid email address is required"))
    }
}

pub fn name(value: &str) -> Result<(), ApiError> {
    if value.trim().len() < 2 {
        return Err(ApiError::validation(
            "name is required and must be at least 2 characters",
        ));
    }
    Ok(())
}

pub fn age(value: i32) -> Result<(), ApiError> {
    if !(8..=80).contains(&value) {
        return Err(ApiError::validation("age must be between 8 and 80"));
    }
    Ok(())
}

pub fn phone(value: &str) -> Result<(), ApiError> {
    if value.len() < 10 {
        return Err(ApiError::validation("valid phone number is required"));
    }
    Ok(())
}

pub fn password(value: &str) -> Result<(), ApiError> {
    if value.len() < 8 {
        return Err(ApiError::validation(
            "password must be at least 8 characters",
        ));
    }
    Ok(())
}

pub fn cycle_length(value: i32) -> Result<(), ApiError> {
    if !(21..=40).contains(&value) {
        return Err(ApiError::validation(
            "average cycle length must be between 21 and 40 days",
        ));
    }
    Ok(())
}

pub fn date_range(start: NaiveDate, end: NaiveDate) -> Result<(), ApiError> {
    if end < start {
        return Err(ApiError::validation(
            "end date must not be before start date",
        ));
    }
    Ok(())
}

pub fn required(value: &str, field: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn email_shapes() {
        assert!(email("user@example.com").is_ok());
        assert!(email("no-at-sign").is_err());
        assert!(email("two@@example.com").is_err());
        assert!(email("user@nodot").is_err());
        assert!(email("spaced user@example.com").is_err());
    }

    #[test]
    fn age_bounds() {
        assert!(age(8).is_ok());
        assert!(age(80).is_ok());
        assert!(age(7).is_err());
        assert!(age(81).is_err());
    }

    #[test]
    fn cycle_length_bounds() {
        assert!(cycle_length(21).is_ok());
        assert!(cycle_length(40).is_ok());
        assert!(cycle_length(20).is_err());
        assert!(cycle_length(41).is_err());
    }

    #[test]
    fn same_day_range_is_allowed() {
        let d = date(2024, 5, 1);
        assert!(date_range(d, d).is_ok());
        assert!(date_range(date(2024, 5, 2), d).is_err());
    }
}

//! Activation codes: batch generation, filtering and CSV export

use crate::backend::{Code, CodeStatus, NewCode};
use crate::error::{KitError, Result};
use rand::Rng;

pub const CSV_HEADER: &str = "ID,Code,Case,Status,Created,Used";

/// One code in the form `NEW-<1000..9999>-<A..Z>`.
pub fn random_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    let number: u16 = rng.gen_range(1000..=9999);
    let letter = (b'A' + rng.gen_range(0..26u8)) as char;
    format!("NEW-{}-{}", number, letter)
}

/// Build a batch of active codes for a case. Codes are not checked for
/// uniqueness here; the table's unique constraint rejects a clashing batch.
pub fn generate_codes<R: Rng + ?Sized>(case_name: &str, quantity: usize, rng: &mut R) -> Result<Vec<NewCode>> {
    let case_name = case_name.trim();
    if case_name.is_empty() {
        return Err(KitError::Validation("Select a case to generate codes for".into()));
    }
    if quantity == 0 {
        return Err(KitError::Validation("Quantity must be at least 1".into()));
    }
    Ok((0..quantity)
        .map(|_| NewCode {
            code: random_code(rng),
            case_name: case_name.to_string(),
            status: CodeStatus::Active,
        })
        .collect())
}

pub fn filter_codes<'a>(codes: &'a [Code], search: &str, status: Option<CodeStatus>) -> Vec<&'a Code> {
    codes.iter().filter(|c| c.matches(search, status)).collect()
}

/// `YYYY-MM-DD` in UTC, or empty when missing.
fn csv_date(value: Option<&str>) -> String {
    let Some(raw) = value.filter(|v| !v.is_empty()) else {
        return String::new();
    };
    match chrono::DateTime::parse_from_rfc3339(raw) {
        Ok(dt) => dt.with_timezone(&chrono::Utc).format("%Y-%m-%d").to_string(),
        Err(_) => crate::utils::safe_truncate(raw, 10).to_string(),
    }
}

fn quoted(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Render the selection as CSV. An empty selection is an error.
pub fn to_csv(codes: &[&Code]) -> Result<String> {
    if codes.is_empty() {
        return Err(KitError::Validation("There is no data to export".into()));
    }
    let mut lines = Vec::with_capacity(codes.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for code in codes {
        lines.push(
            [
                code.id.clone(),
                code.code.clone(),
                quoted(&code.case_name),
                code.status.as_str().to_string(),
                csv_date(code.created_at.as_deref()),
                csv_date(code.used_at.as_deref()),
            ]
            .join(","),
        );
    }
    Ok(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use regex::Regex;

    fn code(id: &str, value: &str, case: &str, status: CodeStatus) -> Code {
        Code {
            id: id.into(),
            code: value.into(),
            case_name: case.into(),
            case_id: None,
            status,
            created_at: Some("2026-03-01T23:30:00-03:00".into()),
            used_at: None,
        }
    }

    #[test]
    fn test_generated_codes_have_expected_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let batch = generate_codes("The Clockmaker", 200, &mut rng).unwrap();
        assert_eq!(batch.len(), 200);
        let shape = Regex::new(r"^NEW-[1-9][0-9]{3}-[A-Z]$").unwrap();
        for new in &batch {
            assert!(shape.is_match(&new.code), "{}", new.code);
            assert_eq!(new.case_name, "The Clockmaker");
            assert_eq!(new.status, CodeStatus::Active);
        }
    }

    #[test]
    fn test_generate_validation() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_codes("Case", 0, &mut rng).is_err());
        assert!(generate_codes("  ", 5, &mut rng).is_err());
    }

    #[test]
    fn test_filter_codes() {
        let codes = vec![
            code("1", "NEW-1234-A", "Coldbridge", CodeStatus::Active),
            code("2", "NEW-5678-B", "The Clockmaker", CodeStatus::Used),
            code("3", "NEW-9999-C", "Coldbridge", CodeStatus::Expired),
        ];
        assert_eq!(filter_codes(&codes, "cold", None).len(), 2);
        assert_eq!(filter_codes(&codes, "5678", None)[0].id, "2");
        assert_eq!(filter_codes(&codes, "", Some(CodeStatus::Expired))[0].id, "3");
        assert!(filter_codes(&codes, "cold", Some(CodeStatus::Used)).is_empty());
    }

    #[test]
    fn test_csv_export() {
        let mut used = code("2", "NEW-5678-B", "Smith, \"Doc\"", CodeStatus::Used);
        used.used_at = Some("2026-03-05T10:00:00+00:00".into());
        let codes = vec![code("1", "NEW-1234-A", "Coldbridge", CodeStatus::Active), used];
        let selection: Vec<&Code> = codes.iter().collect();

        let csv = to_csv(&selection).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], CSV_HEADER);
        // 23:30 at -03:00 is already the next day in UTC
        assert_eq!(lines[1], "1,NEW-1234-A,\"Coldbridge\",active,2026-03-02,");
        assert_eq!(lines[2], "2,NEW-5678-B,\"Smith, \"\"Doc\"\"\",used,2026-03-02,2026-03-05");
    }

    #[test]
    fn test_empty_selection_is_an_error() {
        assert!(matches!(to_csv(&[]), Err(KitError::Validation(_))));
    }
}

//! Output normalization and comparison

use super::RunOutcome;
use crate::value::{Value, ValueError};

/// Extracts the result value from a driver's stdout
///
/// Submissions may print before the driver does, so only the last non-empty
/// line is read.
pub fn normalize_output(stdout: &str) -> Result<Value, ValueError> {
    let line = stdout
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .ok_or(ValueError::Empty)?;
    Value::parse_canonical(line)
}

/// Whether a test case passed
///
/// Only a produced value can pass; timeouts and execution errors never do.
pub fn compare(outcome: &RunOutcome, expected: &Value) -> bool {
    match outcome {
        RunOutcome::Value(actual) => actual == expected,
        RunOutcome::ExecutionError { .. } | RunOutcome::Timeout => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::ErrorKind;

    #[test]
    fn test_last_non_empty_line_wins() {
        assert_eq!(normalize_output("debug\n5\n"), Ok(Value::Int(5)));
        assert_eq!(normalize_output("[1,2]\n\n  \n"), Ok(Value::from(vec![1i64, 2])));
        assert_eq!(normalize_output("\"olleh\"\r\n"), Ok(Value::from("olleh")));
        assert_eq!(normalize_output(""), Err(ValueError::Empty));
        assert_eq!(normalize_output("\n \n"), Err(ValueError::Empty));
        assert!(matches!(
            normalize_output("undefined\n"),
            Err(ValueError::Malformed(_))
        ));
        assert_eq!(normalize_output("null\n"), Err(ValueError::Null));
    }

    #[test]
    fn test_compare() {
        assert!(compare(&RunOutcome::Value(Value::Float(5.0)), &Value::Int(5)));
        assert!(!compare(&RunOutcome::Value(Value::from("5")), &Value::Int(5)));
        assert!(!compare(
            &RunOutcome::Value(Value::from(vec![2i64, 1])),
            &Value::from(vec![1i64, 2])
        ));
        assert!(!compare(&RunOutcome::Timeout, &Value::Int(5)));
        assert!(!compare(
            &RunOutcome::error(ErrorKind::Runtime, "boom"),
            &Value::Int(5)
        ));
    }
}

use std::time::Duration;

use crate::sandbox::codegen::{c_string_literal, float_literal, snake_case, Call, GenerateError};
use crate::sandbox::{CommandSpec, Language, LanguageAdapter};
use crate::value::Value;

const SOURCE_FILE: &str = "driver.py";

const PRELUDE: &str = "import json as _runner_json\nimport sys as _runner_sys\n\n";

const CALL_OPEN: &str = "\n\ntry:\n    _runner_result = ";

const CALL_CLOSE: &str = r#"
    _runner_sys.stdout.write(_runner_json.dumps(_runner_result) + "\n")
    _runner_sys.stdout.flush()
except Exception as _runner_error:
    _runner_sys.stderr.write(_runner_json.dumps({"error": str(_runner_error)}) + "\n")
    _runner_sys.exit(1)
"#;

/// Python submissions define functions in snake_case
pub struct Python {
    interpreter: String,
}

impl Python {
    pub fn new(interpreter: &str) -> Self {
        Self {
            interpreter: interpreter.to_string(),
        }
    }
}

impl LanguageAdapter for Python {
    fn language(&self) -> Language {
        Language::Python
    }

    fn source_file(&self) -> &'static str {
        SOURCE_FILE
    }

    fn function_name(&self, name: &str) -> String {
        snake_case(name)
    }

    fn literal(&self, value: &Value) -> Result<String, GenerateError> {
        match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => float_literal(*f),
            Value::Bool(true) => Ok("True".to_string()),
            Value::Bool(false) => Ok("False".to_string()),
            Value::Str(s) => Ok(c_string_literal(s)),
            Value::Array(items) => {
                let items = items
                    .iter()
                    .map(|item| self.literal(item))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("[{}]", items.join(", ")))
            }
        }
    }

    fn render_driver(&self, source: &str, call: &Call) -> String {
        [PRELUDE, source, CALL_OPEN, &call.expression(), CALL_CLOSE].concat()
    }

    fn run_command(&self, timeout: Duration) -> CommandSpec {
        // -u keeps the result line from being lost in a buffer on abrupt exit
        CommandSpec::new(&self.interpreter, timeout).args(["-u", SOURCE_FILE])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let py = Python::new("python3");
        assert_eq!(py.literal(&Value::Bool(false)).unwrap(), "False");
        assert_eq!(py.literal(&Value::Float(1e300)).unwrap(), "1e300");
        assert_eq!(py.literal(&Value::from("it's")).unwrap(), "\"it's\"");
        assert_eq!(
            py.literal(&Value::from(vec![Value::Int(1), Value::Float(0.5)]))
                .unwrap(),
            "[1, 0.5]"
        );
    }

    #[test]
    fn test_driver_calls_snake_case_name() {
        let py = Python::new("python3");
        assert_eq!(py.function_name("countVowels"), "count_vowels");

        let call = Call {
            function: py.function_name("findMax"),
            arguments: vec!["[1, 2]".to_string()],
        };
        let driver = py.render_driver("def find_max(arr):\n    return max(arr)", &call);
        assert!(driver.starts_with("import json as _runner_json\n"));
        assert!(driver.contains("def find_max(arr):\n    return max(arr)\n\ntry:\n"));
        assert!(driver.contains("    _runner_result = find_max([1, 2])\n"));
    }
}

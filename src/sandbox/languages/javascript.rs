use std::time::Duration;

use crate::sandbox::codegen::{float_literal, Call, GenerateError};
use crate::sandbox::{CommandSpec, Language, LanguageAdapter};
use crate::value::Value;

const SOURCE_FILE: &str = "driver.js";

// Console output from the submission must not mix with the result line
const PRELUDE: &str = r#"const __runnerStdout = process.stdout;
const __runnerStderr = process.stderr;
for (const __runnerLevel of ["log", "info", "warn", "error", "debug", "trace", "dir", "table"]) {
  console[__runnerLevel] = () => {};
}

"#;

const CALL_OPEN: &str = r#"

;(() => {
  try {
    const __runnerResult = "#;

const CALL_CLOSE: &str = r#";
    const __runnerJson = JSON.stringify(__runnerResult);
    __runnerStdout.write((__runnerJson === undefined ? "undefined" : __runnerJson) + "\n");
  } catch (e) {
    const message = e instanceof Error ? e.message : String(e);
    __runnerStderr.write(JSON.stringify({ error: message }) + "\n");
    process.exitCode = 1;
  }
})();
"#;

pub struct JavaScript {
    node: String,
}

impl JavaScript {
    pub fn new(node: &str) -> Self {
        Self {
            node: node.to_string(),
        }
    }
}

impl LanguageAdapter for JavaScript {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn source_file(&self) -> &'static str {
        SOURCE_FILE
    }

    fn literal(&self, value: &Value) -> Result<String, GenerateError> {
        match value {
            Value::Int(i) => Ok(i.to_string()),
            Value::Float(f) => float_literal(*f),
            Value::Bool(b) => Ok(b.to_string()),
            // A JSON string is a valid JavaScript string literal
            Value::Str(s) => Ok(serde_json::Value::from(s.as_str()).to_string()),
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
        CommandSpec::new(&self.node, timeout).arg(SOURCE_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literals() {
        let js = JavaScript::new("node");
        assert_eq!(js.literal(&Value::Int(-3)).unwrap(), "-3");
        assert_eq!(js.literal(&Value::Float(2.5)).unwrap(), "2.5");
        assert_eq!(
            js.literal(&Value::from("quote\" and \\ and\nnewline")).unwrap(),
            r#""quote\" and \\ and\nnewline""#
        );
        assert_eq!(
            js.literal(&Value::from(vec![1i64, 2, 3])).unwrap(),
            "[1, 2, 3]"
        );
    }

    #[test]
    fn test_driver_layout() {
        let js = JavaScript::new("node");
        let call = Call {
            function: "sum".to_string(),
            arguments: vec!["1".to_string(), "2".to_string()],
        };
        let driver = js.render_driver("function sum(a, b) { return a + b; }", &call);

        let silence = driver.find("console[__runnerLevel]").unwrap();
        let source = driver.find("function sum").unwrap();
        let invoke = driver.find("= sum(1, 2);").unwrap();
        assert!(silence < source && source < invoke);

        let run = js.run_command(Duration::from_secs(1));
        assert_eq!(run.program, "node");
        assert_eq!(run.args, vec!["driver.js"]);
        assert!(js.compile_command(Duration::from_secs(1)).is_none());
    }
}

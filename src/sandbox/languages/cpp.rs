use std::time::Duration;

use crate::sandbox::codegen::{
    c_string_literal, float_literal, numeric_array_kind, Call, GenerateError, NumericKind,
};
use crate::sandbox::{CommandSpec, Language, LanguageAdapter};
use crate::value::Value;

const SOURCE_FILE: &str = "driver.cpp";
const BINARY: &str = "driver";

const PRELUDE: &str = r#"#include <cstdio>
#include <exception>
#include <iostream>
#include <sstream>
#include <string>
#include <vector>

namespace runner_json {

inline std::string quote(const std::string& s) {
    std::string out = "\"";
    for (unsigned char c : s) {
        switch (c) {
            case '"': out += "\\\""; break;
            case '\\': out += "\\\\"; break;
            case '\n': out += "\\n"; break;
            case '\r': out += "\\r"; break;
            case '\t': out += "\\t"; break;
            default:
                if (c < 0x20) {
                    char buf[8];
                    std::snprintf(buf, sizeof buf, "\\u%04x", static_cast<unsigned>(c));
                    out += buf;
                } else {
                    out += static_cast<char>(c);
                }
        }
    }
    return out + "\"";
}

inline std::string encode(bool v) { return v ? "true" : "false"; }
inline std::string encode(char v) { return quote(std::string(1, v)); }
inline std::string encode(int v) { return std::to_string(v); }
inline std::string encode(unsigned v) { return std::to_string(v); }
inline std::string encode(long v) { return std::to_string(v); }
inline std::string encode(unsigned long v) { return std::to_string(v); }
inline std::string encode(long long v) { return std::to_string(v); }
inline std::string encode(unsigned long long v) { return std::to_string(v); }
inline std::string encode(double v) {
    char buf[32];
    std::snprintf(buf, sizeof buf, "%.17g", v);
    return buf;
}
inline std::string encode(float v) { return encode(static_cast<double>(v)); }
inline std::string encode(const std::string& v) { return quote(v); }
inline std::string encode(const char* v) { return quote(v); }

template <typename T>
std::string encode(const std::vector<T>& items) {
    std::string out = "[";
    bool first = true;
    for (const auto& item : items) {
        if (!first) out += ",";
        out += encode(static_cast<T>(item));
        first = false;
    }
    return out + "]";
}

}  // namespace runner_json

using namespace std;

"#;

const CALL_OPEN: &str = r#"

int main() {
    try {
        auto runner_result = "#;

const CALL_CLOSE: &str = r#";
        std::cout << runner_json::encode(runner_result) << std::endl;
        return 0;
    } catch (const std::exception& e) {
        std::cerr << "{\"error\": " << runner_json::quote(e.what()) << "}" << std::endl;
    } catch (...) {
        std::cerr << "{\"error\": \"unknown exception\"}" << std::endl;
    }
    return 1;
}
"#;

/// C++ submissions define free functions
///
/// Strings are passed as `std::string`; arrays as `std::vector` of the
/// narrowest numeric type that holds every element.
pub struct Cpp {
    compiler: String,
}

impl Cpp {
    pub fn new(compiler: &str) -> Self {
        Self {
            compiler: compiler.to_string(),
        }
    }
}

fn int_literal(i: i64) -> String {
    if i == i64::MIN {
        // The positive half of i64::MIN is out of range for long long
        "(-9223372036854775807LL - 1)".to_string()
    } else if i32::try_from(i).is_ok() {
        i.to_string()
    } else {
        format!("{i}LL")
    }
}

impl LanguageAdapter for Cpp {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn source_file(&self) -> &'static str {
        SOURCE_FILE
    }

    fn literal(&self, value: &Value) -> Result<String, GenerateError> {
        match value {
            Value::Int(i) => Ok(int_literal(*i)),
            Value::Float(f) => float_literal(*f),
            Value::Bool(b) => Ok(b.to_string()),
            // The explicit length keeps embedded NUL bytes
            Value::Str(s) => Ok(format!("std::string({}, {})", c_string_literal(s), s.len())),
            Value::Array(items) => {
                let kind = numeric_array_kind(Language::Cpp, items)?;
                let items = items
                    .iter()
                    .map(|item| match (kind, item) {
                        (NumericKind::Double, Value::Int(i)) => float_literal(*i as f64),
                        (_, other) => self.literal(other),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let element = match kind {
                    NumericKind::Int => "int",
                    NumericKind::Long => "long long",
                    NumericKind::Double => "double",
                };
                Ok(format!("std::vector<{element}>{{{}}}", items.join(", ")))
            }
        }
    }

    fn render_driver(&self, source: &str, call: &Call) -> String {
        [PRELUDE, source, CALL_OPEN, &call.expression(), CALL_CLOSE].concat()
    }

    fn compile_command(&self, timeout: Duration) -> Option<CommandSpec> {
        Some(
            CommandSpec::new(&self.compiler, timeout)
                .args(["-std=c++17", "-O2", SOURCE_FILE, "-o", BINARY]),
        )
    }

    fn run_command(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new(format!("./{BINARY}"), timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_int_literals() {
        assert_eq!(int_literal(42), "42");
        assert_eq!(int_literal(-42), "-42");
        assert_eq!(int_literal(5_000_000_000), "5000000000LL");
        assert_eq!(int_literal(i64::MIN), "(-9223372036854775807LL - 1)");
    }

    #[test]
    fn test_value_literals() {
        let cpp = Cpp::new("g++");
        assert_eq!(
            cpp.literal(&Value::from("tab\there")).unwrap(),
            r#"std::string("tab\there", 8)"#
        );
        assert_eq!(
            cpp.literal(&Value::from("a\0b")).unwrap(),
            r#"std::string("a\000b", 3)"#
        );
        assert_eq!(
            cpp.literal(&Value::from("héllo")).unwrap(),
            r#"std::string("héllo", 6)"#
        );
        assert_eq!(
            cpp.literal(&Value::from(vec![-1i64, -5, -3])).unwrap(),
            "std::vector<int>{-1, -5, -3}"
        );
        assert_eq!(
            cpp.literal(&Value::Array(vec![Value::Int(2), Value::Float(1.5)]))
                .unwrap(),
            "std::vector<double>{2.0, 1.5}"
        );
        assert!(matches!(
            cpp.literal(&Value::Array(vec![Value::from(vec![1i64])])),
            Err(GenerateError::UnsupportedValue { kind: "nested array", .. })
        ));
    }

    #[test]
    fn test_commands() {
        let cpp = Cpp::new("g++");
        let compile = cpp.compile_command(Duration::from_secs(10)).unwrap();
        assert_eq!(compile.program, "g++");
        assert_eq!(compile.args, vec!["-std=c++17", "-O2", "driver.cpp", "-o", "driver"]);

        let run = cpp.run_command(Duration::from_secs(5));
        assert_eq!(run.program, "./driver");
        assert!(run.args.is_empty());
    }
}

use std::time::Duration;

use crate::sandbox::codegen::{
    c_string_literal, float_literal, numeric_array_kind, Call, GenerateError, NumericKind,
};
use crate::sandbox::{CommandSpec, Language, LanguageAdapter};
use crate::value::Value;

const SOURCE_FILE: &str = "Main.java";

const PRELUDE: &str = "import java.util.*;\n\n";

const CALL_OPEN: &str = r#"

public class Main {
    public static void main(String[] args) throws Exception {
        java.io.PrintStream out = new java.io.PrintStream(
            new java.io.FileOutputStream(java.io.FileDescriptor.out), true, "UTF-8");
        Object result;
        try {
            result = Solution."#;

const CALL_CLOSE: &str = r#";
        } catch (Throwable e) {
            String message = e.getMessage() == null ? e.toString() : e.getMessage();
            System.err.println("{\"error\": " + quote(message) + "}");
            System.err.flush();
            System.exit(1);
            return;
        }
        String encoded = toJson(result);
        System.out.flush();
        out.println(encoded);
        out.flush();
    }

    private static String toJson(Object value) {
        if (value == null) return "null";
        if (value instanceof String || value instanceof Character) return quote(value.toString());
        if (value instanceof Boolean || value instanceof Number) return value.toString();
        if (value.getClass().isArray()) {
            StringBuilder sb = new StringBuilder("[");
            int length = java.lang.reflect.Array.getLength(value);
            for (int i = 0; i < length; i++) {
                if (i > 0) sb.append(",");
                sb.append(toJson(java.lang.reflect.Array.get(value, i)));
            }
            return sb.append("]").toString();
        }
        if (value instanceof Iterable) {
            StringBuilder sb = new StringBuilder("[");
            boolean first = true;
            for (Object item : (Iterable<?>) value) {
                if (!first) sb.append(",");
                sb.append(toJson(item));
                first = false;
            }
            return sb.append("]").toString();
        }
        return quote(value.toString());
    }

    private static String quote(String s) {
        StringBuilder sb = new StringBuilder("\"");
        for (int i = 0; i < s.length(); i++) {
            char c = s.charAt(i);
            switch (c) {
                case '"': sb.append("\\\""); break;
                case '\\': sb.append("\\\\"); break;
                case '\n': sb.append("\\n"); break;
                case '\r': sb.append("\\r"); break;
                case '\t': sb.append("\\t"); break;
                default:
                    if (c < 0x20) sb.append(String.format("\\u%04x", (int) c));
                    else sb.append(c);
            }
        }
        return sb.append('"').toString();
    }
}
"#;

/// Java submissions declare a `Solution` class with static methods
///
/// Only scalars and flat numeric arrays can be passed: strings, booleans and
/// nested arrays have no single array type to bind to.
pub struct Java {
    javac: String,
    java: String,
}

impl Java {
    pub fn new(javac: &str, java: &str) -> Self {
        Self {
            javac: javac.to_string(),
            java: java.to_string(),
        }
    }
}

fn scalar_literal(i: i64) -> String {
    if i32::try_from(i).is_ok() {
        i.to_string()
    } else {
        format!("{i}L")
    }
}

impl LanguageAdapter for Java {
    fn language(&self) -> Language {
        Language::Java
    }

    fn source_file(&self) -> &'static str {
        SOURCE_FILE
    }

    fn literal(&self, value: &Value) -> Result<String, GenerateError> {
        match value {
            Value::Int(i) => Ok(scalar_literal(*i)),
            Value::Float(f) => float_literal(*f),
            Value::Bool(b) => Ok(b.to_string()),
            Value::Str(s) => Ok(c_string_literal(s)),
            Value::Array(items) => {
                let kind = numeric_array_kind(Language::Java, items)?;
                let items = items
                    .iter()
                    .map(|item| match (kind, item) {
                        (NumericKind::Double, Value::Int(i)) => float_literal(*i as f64),
                        (NumericKind::Double, Value::Float(f)) => float_literal(*f),
                        (_, Value::Int(i)) => Ok(scalar_literal(*i)),
                        (_, other) => self.literal(other),
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let element = match kind {
                    NumericKind::Int => "int",
                    NumericKind::Long => "long",
                    NumericKind::Double => "double",
                };
                Ok(format!("new {element}[]{{{}}}", items.join(", ")))
            }
        }
    }

    fn render_driver(&self, source: &str, call: &Call) -> String {
        // The file is named after `Main`, so `Solution` must not be public
        let source = source.replacen("public class Solution", "class Solution", 1);
        [PRELUDE, &source, CALL_OPEN, &call.expression(), CALL_CLOSE].concat()
    }

    fn compile_command(&self, timeout: Duration) -> Option<CommandSpec> {
        Some(CommandSpec::new(&self.javac, timeout).args(["-encoding", "UTF-8", SOURCE_FILE]))
    }

    fn run_command(&self, timeout: Duration) -> CommandSpec {
        CommandSpec::new(&self.java, timeout).args(["-cp", ".", "Main"])
    }
}

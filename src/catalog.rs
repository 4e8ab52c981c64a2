use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::sandbox::Language;
use crate::value::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Vec<Value>,
    pub expected_output: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Name of the function every submission must define
    pub function_name: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub starter_code: BTreeMap<Language, String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("duplicate exercise id '{0}'")]
    DuplicateId(String),
    #[error("exercise '{exercise}': '{name}' is not a valid function name")]
    InvalidFunctionName { exercise: String, name: String },
    #[error("exercise '{0}' has no test cases")]
    NoTestCases(String),
    #[error("exercise '{exercise}' test case {case}: {kind} values are not supported")]
    UnsupportedValue {
        exercise: String,
        case: usize,
        kind: &'static str,
    },
}

/// Read-only, process-wide set of exercises keyed by identifier
#[derive(Debug, Clone)]
pub struct ExerciseCatalog {
    exercises: Vec<Exercise>,
}

impl ExerciseCatalog {
    /// Builds a catalog after validating every exercise
    pub fn new(exercises: Vec<Exercise>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for exercise in &exercises {
            if !seen.insert(exercise.id.as_str()) {
                return Err(CatalogError::DuplicateId(exercise.id.clone()));
            }
            validate_exercise(exercise)?;
        }
        Ok(Self { exercises })
    }

    /// The exercises shipped with the service
    pub fn builtin() -> Self {
        Self {
            exercises: builtin_exercises(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Exercise> {
        self.exercises.iter().find(|e| e.id == id)
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

fn validate_exercise(exercise: &Exercise) -> Result<(), CatalogError> {
    if !is_identifier(&exercise.function_name) {
        return Err(CatalogError::InvalidFunctionName {
            exercise: exercise.id.clone(),
            name: exercise.function_name.clone(),
        });
    }
    if exercise.test_cases.is_empty() {
        return Err(CatalogError::NoTestCases(exercise.id.clone()));
    }
    for (idx, case) in exercise.test_cases.iter().enumerate() {
        let values = case.input.iter().chain(std::iter::once(&case.expected_output));
        if let Some(bad) = values.into_iter().find(|v| !v.is_argument_kind()) {
            return Err(CatalogError::UnsupportedValue {
                exercise: exercise.id.clone(),
                case: idx,
                kind: bad.kind_name(),
            });
        }
    }
    Ok(())
}

/// Function names are spliced into generated drivers, so only plain
/// identifiers are accepted
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn case(input: Vec<Value>, expected_output: impl Into<Value>) -> TestCase {
    TestCase {
        input,
        expected_output: expected_output.into(),
    }
}

fn starter(js: &str, py: &str, java: &str, cpp: &str) -> BTreeMap<Language, String> {
    BTreeMap::from([
        (Language::JavaScript, js.to_string()),
        (Language::Python, py.to_string()),
        (Language::Java, java.to_string()),
        (Language::Cpp, cpp.to_string()),
    ])
}

fn builtin_exercises() -> Vec<Exercise> {
    vec![
        Exercise {
            id: "sum-two-numbers".to_string(),
            title: "Sum of Two Numbers".to_string(),
            description: "Create a function called `sum` that takes two parameters (a, b) and returns their sum.".to_string(),
            difficulty: Difficulty::Easy,
            function_name: "sum".to_string(),
            test_cases: vec![
                case(vec![2.into(), 3.into()], 5),
                case(vec![10.into(), 20.into()], 30),
                case(vec![(-5).into(), 5.into()], 0),
                case(vec![0.into(), 0.into()], 0),
            ],
            starter_code: starter(
                "function sum(a, b) {\n  // Write your code here\n  \n}",
                "def sum(a, b):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static int sum(int a, int b) {\n        // Write your code here\n        return 0;\n    }\n}",
                "int sum(int a, int b) {\n    // Write your code here\n    return 0;\n}",
            ),
        },
        Exercise {
            id: "is-even".to_string(),
            title: "Is Even Number".to_string(),
            description: "Create a function called `isEven` that checks if a number is even. Return true if it is, false otherwise.".to_string(),
            difficulty: Difficulty::Easy,
            function_name: "isEven".to_string(),
            test_cases: vec![
                case(vec![4.into()], true),
                case(vec![7.into()], false),
                case(vec![0.into()], true),
                case(vec![(-2).into()], true),
            ],
            starter_code: starter(
                "function isEven(num) {\n  // Write your code here\n  \n}",
                "def is_even(num):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static boolean isEven(int num) {\n        // Write your code here\n        return false;\n    }\n}",
                "bool isEven(int num) {\n    // Write your code here\n    return false;\n}",
            ),
        },
        Exercise {
            id: "reverse-string".to_string(),
            title: "Reverse String".to_string(),
            description: "Create a function called `reverseString` that takes a string and returns the reversed string.".to_string(),
            difficulty: Difficulty::Easy,
            function_name: "reverseString".to_string(),
            test_cases: vec![
                case(vec!["hello".into()], "olleh"),
                case(vec!["world".into()], "dlrow"),
                case(vec!["".into()], ""),
                case(vec!["a".into()], "a"),
            ],
            starter_code: starter(
                "function reverseString(str) {\n  // Write your code here\n  \n}",
                "def reverse_string(s):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static String reverseString(String s) {\n        // Write your code here\n        return \"\";\n    }\n}",
                "#include <string>\nusing namespace std;\n\nstring reverseString(string s) {\n    // Write your code here\n    return \"\";\n}",
            ),
        },
        Exercise {
            id: "find-max".to_string(),
            title: "Find Maximum".to_string(),
            description: "Create a function called `findMax` that takes an array of numbers and returns the largest number.".to_string(),
            difficulty: Difficulty::Medium,
            function_name: "findMax".to_string(),
            test_cases: vec![
                case(vec![vec![1i64, 5, 3, 9, 2].into()], 9),
                case(vec![vec![-1i64, -5, -3].into()], -1),
                case(vec![vec![42i64].into()], 42),
                case(vec![vec![100i64, 200, 50].into()], 200),
            ],
            starter_code: starter(
                "function findMax(arr) {\n  // Write your code here\n  \n}",
                "def find_max(arr):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static int findMax(int[] arr) {\n        // Write your code here\n        return 0;\n    }\n}",
                "#include <vector>\nusing namespace std;\n\nint findMax(vector<int> arr) {\n    // Write your code here\n    return 0;\n}",
            ),
        },
        Exercise {
            id: "count-vowels".to_string(),
            title: "Count Vowels".to_string(),
            description: "Create a function called `countVowels` that counts how many vowels are in a string (a, e, i, o, u).".to_string(),
            difficulty: Difficulty::Medium,
            function_name: "countVowels".to_string(),
            test_cases: vec![
                case(vec!["hello".into()], 2),
                case(vec!["programming".into()], 3),
                case(vec!["aeiou".into()], 5),
                case(vec!["xyz".into()], 0),
            ],
            starter_code: starter(
                "function countVowels(str) {\n  // Write your code here\n  \n}",
                "def count_vowels(s):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static int countVowels(String s) {\n        // Write your code here\n        return 0;\n    }\n}",
                "#include <string>\nusing namespace std;\n\nint countVowels(string s) {\n    // Write your code here\n    return 0;\n}",
            ),
        },
        Exercise {
            id: "fibonacci".to_string(),
            title: "Fibonacci Sequence".to_string(),
            description: "Create a function called `fibonacci` that returns the nth number in the Fibonacci sequence.".to_string(),
            difficulty: Difficulty::Hard,
            function_name: "fibonacci".to_string(),
            test_cases: vec![
                case(vec![0.into()], 0),
                case(vec![1.into()], 1),
                case(vec![6.into()], 8),
                case(vec![10.into()], 55),
            ],
            starter_code: starter(
                "function fibonacci(n) {\n  // Write your code here\n  \n}",
                "def fibonacci(n):\n    # Write your code here\n    pass",
                "public class Solution {\n    public static int fibonacci(int n) {\n        // Write your code here\n        return 0;\n    }\n}",
                "int fibonacci(int n) {\n    // Write your code here\n    return 0;\n}",
            ),
        },
    ]
}

//! Prompt construction for per-file analysis.

/// Build the review prompt for one file.
///
/// `sibling_paths` is the full list of paths in the batch. The cross-file
/// preamble is only added when the batch holds more than one file.
pub fn build_prompt(content: &str, file_path: &str, sibling_paths: Option<&[String]>) -> String {
    let preamble = match sibling_paths {
        Some(paths) if paths.len() > 1 => format!(
            "You are reviewing the file '{file_path}'. This review is part of a batch analysis \
             that also includes these files: {batch}. Consider potential interactions or shared \
             concerns among these files if relevant, but focus your specific findings on \
             '{file_path}'.\n\n",
            batch = paths.join(", "),
        ),
        _ => String::new(),
    };

    format!(
        r#"{preamble}You are an expert code reviewer. Analyze the following code from the file "{file_path}" for potential issues.
Focus on:
1.  **Performance Bottlenecks**: Identify inefficient code, unnecessary computations, or areas that could lead to slow execution.
2.  **Code Integrity & Bugs**: Find logical errors, potential null dereferences, race conditions, resource leaks, or deviations that could lead to incorrect behavior.
3.  **Security Vulnerabilities**: Look for common security flaws such as XSS, SQL injection, insecure handling of credentials, buffer overflows, or improper input validation.
4.  **Scalability Concerns**: Point out design choices or patterns that might hinder handling increased load or data.
5.  **Maintainability & Readability**: Suggest improvements for clarity, overly complex logic, missing comments where necessary, or inconsistent style.
6.  **Best Practices**: Check adherence to language-specific best practices and common design patterns.

For each issue found, provide the following information in a JSON array. Each object in the array represents a single issue:
{{
  "lineNumber": "approximate_line_number_as_string_or_empty_string",
  "issueTitle": "A concise title for the issue (max 15 words).",
  "description": "A detailed explanation of the issue, why it is a problem, and its potential impact. Be specific to the code provided.",
  "severity": "Critical | High | Medium | Low | Informational",
  "category": "Performance | Security | Integrity | Scalability | Maintainability | BestPractice | Other"
}}

If no significant issues are found, return an empty array [].
Only return the JSON array. Do not include any other explanatory text, markdown formatting around the JSON, or any preamble.

Code to review (from file: {file_path}):
---
{content}
---
"#
    )
}

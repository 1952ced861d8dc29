use crate::domain::content::CodeBlock;

const PLAIN_TEXT_LABEL: &str = "Plain Text";

/// Caption shown above a code block: filename, then a display name for the
/// language, then the raw language token, then a generic label.
pub(crate) fn code_label(block: &CodeBlock) -> String {
    if let Some(filename) = block.filename.as_deref() {
        return filename.trim().to_string();
    }

    match block.language.as_deref().map(str::trim) {
        Some(language) if !language.is_empty() => language_display_name(language)
            .map(str::to_string)
            .unwrap_or_else(|| language.to_string()),
        _ => PLAIN_TEXT_LABEL.to_string(),
    }
}

fn language_display_name(language: &str) -> Option<&'static str> {
    let name = match language.to_ascii_lowercase().as_str() {
        "ts" | "typescript" => "TypeScript",
        "tsx" => "TSX",
        "js" | "javascript" => "JavaScript",
        "jsx" => "JSX",
        "sh" | "bash" | "shell" | "zsh" => "Bash",
        "py" | "python" => "Python",
        "rs" | "rust" => "Rust",
        "go" | "golang" => "Go",
        "json" => "JSON",
        "yaml" | "yml" => "YAML",
        "toml" => "TOML",
        "html" => "HTML",
        "css" => "CSS",
        "scss" => "SCSS",
        "sql" => "SQL",
        "md" | "markdown" => "Markdown",
        "graphql" | "gql" => "GraphQL",
        "java" => "Java",
        "kt" | "kotlin" => "Kotlin",
        "rb" | "ruby" => "Ruby",
        "php" => "PHP",
        "c" => "C",
        "cpp" | "c++" => "C++",
        "cs" | "csharp" => "C#",
        "swift" => "Swift",
        "dockerfile" | "docker" => "Dockerfile",
        "xml" => "XML",
        "diff" => "Diff",
        "text" | "plaintext" | "txt" => PLAIN_TEXT_LABEL,
        _ => return None,
    };
    Some(name)
}

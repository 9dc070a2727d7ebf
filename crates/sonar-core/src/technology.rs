//! Extension to language mapping used for primary technology estimates.

/// Language for a source file extension (lowercase, with leading dot).
///
/// Documentation, data and config extensions return `None`.
pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let language = match ext {
        ".rs" => "Rust",
        ".py" | ".pyi" => "Python",
        ".js" | ".jsx" | ".mjs" | ".cjs" => "JavaScript",
        ".ts" | ".tsx" | ".mts" | ".cts" => "TypeScript",
        ".java" => "Java",
        ".kt" | ".kts" => "Kotlin",
        ".scala" | ".sc" => "Scala",
        ".groovy" | ".gradle" => "Groovy",
        ".go" => "Go",
        ".rb" => "Ruby",
        ".php" => "PHP",
        ".cs" | ".cshtml" | ".razor" => "C#",
        ".fs" | ".fsx" => "F#",
        ".vb" => "Visual Basic",
        ".c" | ".h" => "C",
        ".cpp" | ".cc" | ".cxx" | ".hpp" | ".hh" => "C++",
        ".swift" => "Swift",
        ".m" | ".mm" => "Objective-C",
        ".dart" => "Dart",
        ".ex" | ".exs" => "Elixir",
        ".erl" | ".hrl" => "Erlang",
        ".clj" | ".cljs" => "Clojure",
        ".hs" => "Haskell",
        ".lua" => "Lua",
        ".r" => "R",
        ".pl" | ".pm" => "Perl",
        ".sh" | ".bash" => "Shell",
        ".ps1" => "PowerShell",
        ".sql" => "SQL",
        ".tf" => "Terraform",
        ".vue" => "Vue",
        ".svelte" => "Svelte",
        _ => return None,
    };
    Some(language)
}

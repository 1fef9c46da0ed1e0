//! Descriptors shipped with the binary.

/// `(file name, TOML content)` for every built-in platform.
pub const DESCRIPTORS: &[(&str, &str)] = &[
    (
        "claude_code.toml",
        include_str!("../../descriptors/claude_code.toml"),
    ),
    ("opencode.toml", include_str!("../../descriptors/opencode.toml")),
    (
        "github_copilot.toml",
        include_str!("../../descriptors/github_copilot.toml"),
    ),
    (
        "kilo_code_vscode.toml",
        include_str!("../../descriptors/kilo_code_vscode.toml"),
    ),
    (
        "kilo_code.toml",
        include_str!("../../descriptors/kilo_code.toml"),
    ),
];

//! Known agent CLIs and the flags each needs to run non-interactively.

use std::fmt;

use serde::{Deserialize, Serialize};

const CODEX_SUBCOMMANDS: &[&str] = &[
    "exec",
    "review",
    "login",
    "logout",
    "mcp",
    "mcp-server",
    "app-server",
    "completion",
    "sandbox",
    "apply",
    "resume",
    "fork",
    "cloud",
    "features",
    "help",
];

const OPENCODE_SUBCOMMANDS: &[&str] = &[
    "agent",
    "attach",
    "auth",
    "github",
    "mcp",
    "models",
    "run",
    "serve",
    "session",
    "stats",
    "export",
    "import",
    "web",
    "acp",
    "uninstall",
    "upgrade",
    "help",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    Codex,
    Claude,
    Gemini,
    Opencode,
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl Vendor {
    /// Executable name the vendor ships.
    pub fn program(self) -> &'static str {
        match self {
            Vendor::Codex => "codex",
            Vendor::Claude => "claude",
            Vendor::Gemini => "gemini",
            Vendor::Opencode => "opencode",
        }
    }

    /// Normalize `argv` for this vendor, filling in the subcommand and flags
    /// the caller left out. Flags already present are never overridden.
    pub fn apply(self, argv: &[String], model: Option<&str>) -> Vec<String> {
        let mut out = argv.to_vec();

        match self {
            Vendor::Codex => {
                insert_subcommand(&mut out, "codex", "exec", CODEX_SUBCOMMANDS);
                push_model(&mut out, model);
                if !has_flag(&out, "--sandbox") {
                    push_flag(&mut out, "--sandbox", "workspace-write");
                }
            }
            Vendor::Opencode => {
                insert_subcommand(&mut out, "opencode", "run", OPENCODE_SUBCOMMANDS);
                push_model(&mut out, model);
            }
            Vendor::Gemini => {
                push_model(&mut out, model);
                if !has_flag(&out, "--output-format") {
                    push_flag(&mut out, "--output-format", "text");
                }
            }
            Vendor::Claude => push_model(&mut out, model),
        }

        out
    }
}

/// Insert `default` after `program` unless a known subcommand already follows.
fn insert_subcommand(argv: &mut Vec<String>, program: &str, default: &str, known: &[&str]) {
    if argv.first().map(String::as_str) != Some(program) {
        return;
    }
    let has_subcommand = argv
        .get(1)
        .is_some_and(|arg| !arg.starts_with('-') && known.contains(&arg.as_str()));
    if !has_subcommand {
        argv.insert(1, default.to_string());
    }
}

fn push_model(argv: &mut Vec<String>, model: Option<&str>) {
    let Some(model) = model.filter(|model| !model.is_empty()) else {
        return;
    };
    if !has_flag(argv, "--model") && !has_flag(argv, "-m") {
        push_flag(argv, "--model", model);
    }
}

fn push_flag(argv: &mut Vec<String>, name: &str, value: &str) {
    argv.push(name.to_string());
    argv.push(value.to_string());
}

/// `true` if `name` appears as its own arg or in `name=value` form.
fn has_flag(argv: &[String], name: &str) -> bool {
    argv.iter().any(|arg| {
        arg == name
            || arg
                .strip_prefix(name)
                .is_some_and(|rest| rest.starts_with('='))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| (*item).to_string()).collect()
    }

    struct Case {
        name: &'static str,
        argv: &'static [&'static str],
        model: Option<&'static str>,
        expected: &'static [&'static str],
    }

    fn check(vendor: Vendor, cases: &[Case]) {
        for case in cases {
            let got = vendor.apply(&args(case.argv), case.model);
            assert_eq!(got, args(case.expected), "{vendor} case: {}", case.name);
        }
    }

    #[test]
    fn codex_flags() {
        check(
            Vendor::Codex,
            &[
                Case {
                    name: "minimal",
                    argv: &["codex"],
                    model: None,
                    expected: &["codex", "exec", "--sandbox", "workspace-write"],
                },
                Case {
                    name: "with model",
                    argv: &["codex"],
                    model: Some("gpt-4"),
                    expected: &[
                        "codex",
                        "exec",
                        "--model",
                        "gpt-4",
                        "--sandbox",
                        "workspace-write",
                    ],
                },
                Case {
                    name: "already has exec",
                    argv: &["codex", "exec"],
                    model: None,
                    expected: &["codex", "exec", "--sandbox", "workspace-write"],
                },
                Case {
                    name: "is subcommand",
                    argv: &["codex", "review"],
                    model: None,
                    expected: &["codex", "review", "--sandbox", "workspace-write"],
                },
                Case {
                    name: "has sandbox",
                    argv: &["codex", "--sandbox", "none"],
                    model: None,
                    expected: &["codex", "exec", "--sandbox", "none"],
                },
                Case {
                    name: "equals spelling",
                    argv: &["codex", "--model=gpt-5", "--sandbox=read-only"],
                    model: Some("gpt-4"),
                    expected: &["codex", "exec", "--model=gpt-5", "--sandbox=read-only"],
                },
                Case {
                    name: "short model flag",
                    argv: &["codex", "-m", "o3"],
                    model: Some("gpt-4"),
                    expected: &["codex", "exec", "-m", "o3", "--sandbox", "workspace-write"],
                },
            ],
        );
    }

    #[test]
    fn opencode_flags() {
        check(
            Vendor::Opencode,
            &[
                Case {
                    name: "minimal",
                    argv: &["opencode"],
                    model: None,
                    expected: &["opencode", "run"],
                },
                Case {
                    name: "with model",
                    argv: &["opencode"],
                    model: Some("deepseek"),
                    expected: &["opencode", "run", "--model", "deepseek"],
                },
                Case {
                    name: "already has run",
                    argv: &["opencode", "run"],
                    model: None,
                    expected: &["opencode", "run"],
                },
                Case {
                    name: "is subcommand",
                    argv: &["opencode", "agent"],
                    model: None,
                    expected: &["opencode", "agent"],
                },
                Case {
                    name: "leading flag",
                    argv: &["opencode", "--print-logs"],
                    model: None,
                    expected: &["opencode", "run", "--print-logs"],
                },
            ],
        );
    }

    #[test]
    fn gemini_flags() {
        check(
            Vendor::Gemini,
            &[
                Case {
                    name: "minimal",
                    argv: &["gemini"],
                    model: None,
                    expected: &["gemini", "--output-format", "text"],
                },
                Case {
                    name: "with model",
                    argv: &["gemini"],
                    model: Some("flash"),
                    expected: &["gemini", "--model", "flash", "--output-format", "text"],
                },
                Case {
                    name: "has output format",
                    argv: &["gemini", "--output-format", "json"],
                    model: None,
                    expected: &["gemini", "--output-format", "json"],
                },
            ],
        );
    }

    #[test]
    fn claude_only_adds_model() {
        check(
            Vendor::Claude,
            &[
                Case {
                    name: "minimal",
                    argv: &["claude"],
                    model: None,
                    expected: &["claude"],
                },
                Case {
                    name: "with model",
                    argv: &["claude", "-p"],
                    model: Some("sonnet"),
                    expected: &["claude", "-p", "--model", "sonnet"],
                },
                Case {
                    name: "empty model is ignored",
                    argv: &["claude"],
                    model: Some(""),
                    expected: &["claude"],
                },
            ],
        );
    }

    #[test]
    fn subcommand_insertion_needs_matching_program() {
        let got = Vendor::Codex.apply(&args(&["/opt/bin/codex-wrapper"]), None);
        assert_eq!(got, args(&["/opt/bin/codex-wrapper", "--sandbox", "workspace-write"]));
    }

    #[test]
    fn vendor_names_deserialize_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            vendor: Vendor,
        }
        let parsed: Wrapper = toml::from_str(r#"vendor = "opencode""#).expect("parse");
        assert_eq!(parsed.vendor, Vendor::Opencode);
        assert_eq!(Vendor::Gemini.to_string(), "gemini");
    }
}

use anyhow::{Context, Result};
use metacat_catalog::Command;

/// Parse a command script: either one JSON array of commands or one
/// command object per non-blank line. Lines starting with `#` or `//`
/// are comments in the line form.
pub fn parse_script(text: &str) -> Result<Vec<Command>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("failed to parse command array");
    }

    let mut commands = Vec::new();
    for (i, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with("//") {
            continue;
        }
        let command: Command = serde_json::from_str(line)
            .with_context(|| format!("failed to parse command on line {}", i + 1))?;
        commands.push(command);
    }
    Ok(commands)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_line_delimited_commands() {
        let script = r#"
# bootstrap
{"type":"create_cluster","cluster":"c1"}
{"type":"create_database","database":["c1","sales"]}

// list
{"type":"show_databases","cluster":["c1"]}
"#;
        let commands = parse_script(script).unwrap();
        assert_eq!(commands.len(), 3);
        assert_eq!(commands[2].kind(), "show_databases");
    }

    #[test]
    fn parses_a_json_array() {
        let script = r#"[{"type":"show_clusters"},{"type":"use_cluster","cluster":"c1"}]"#;
        let commands = parse_script(script).unwrap();
        assert_eq!(commands.len(), 2);
        assert_eq!(commands[0], Command::ShowClusters);
    }

    #[test]
    fn reports_the_failing_line() {
        let script = "{\"type\":\"show_clusters\"}\n{\"type\":\"explode\"}\n";
        let err = parse_script(script).unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }
}

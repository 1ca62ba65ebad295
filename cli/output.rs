use anyhow::{Context, Result};
use byte_unit::{Byte, UnitType};
use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use ctxcat_core::{Exclusion, ScanResult, TreeNode, build_tree};

/// Sends the assembled stream to `output_path`, or to stdout when absent.
pub fn write_stream(bytes: &[u8], output_path: Option<&Path>, quiet: bool) -> Result<()> {
    match output_path {
        Some(path) => {
            write_to_file(path, bytes)?;
            if !quiet {
                eprintln!(
                    "{} Output saved to: {}",
                    "✅".green(),
                    path.display().to_string().blue()
                );
            }
        }
        None => write_to_stdout(bytes)?,
    }
    Ok(())
}

pub fn write_report(result: &ScanResult, path: &Path, quiet: bool) -> Result<()> {
    let json = result
        .to_json_pretty()
        .context("Failed to serialize scan report")?;
    write_to_file(path, json.as_bytes())?;
    if !quiet {
        eprintln!(
            "{} Report saved to: {}",
            "📄".blue(),
            path.display().to_string().dimmed()
        );
    }
    Ok(())
}

fn write_to_file(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content)
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

fn write_to_stdout(content: &[u8]) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content)
        .context("Failed to write to stdout")?;
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn format_size(bytes: u64) -> String {
    Byte::from_u128(bytes as u128)
        .unwrap_or_default()
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Plain-text tree of the included files, one line per node.
pub fn render_tree(nodes: &[TreeNode]) -> String {
    let mut out = String::new();
    render_level(nodes, "", &mut out);
    out
}

fn render_level(nodes: &[TreeNode], prefix: &str, out: &mut String) {
    for (i, node) in nodes.iter().enumerate() {
        let last = i + 1 == nodes.len();
        let connector = if last { "└── " } else { "├── " };
        out.push_str(prefix);
        out.push_str(connector);
        out.push_str(&node.name);
        if node.is_dir() {
            out.push('/');
        } else {
            out.push_str(&format!(" ({})", format_size(node.size)));
            if node.manual {
                out.push_str(" (manual)");
            }
        }
        out.push('\n');
        if !node.children.is_empty() {
            let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
            render_level(&node.children, &child_prefix, out);
        }
    }
}

/// Human summary on stderr; stdout stays reserved for the stream.
pub fn print_summary(result: &ScanResult, show_excluded: bool) {
    eprintln!();
    eprintln!("{}", " Included Files ".green().bold().underline());
    if result.files.is_empty() {
        eprintln!("{}", "(No files included)".yellow());
    } else {
        eprint!("{}", render_tree(&build_tree(&result.files)));
    }

    if !result.empty.is_empty() {
        eprintln!("\n{}", " Empty Files ".yellow().bold().underline());
        for path in &result.empty {
            eprintln!("  {}", path.dimmed());
        }
    }

    if !result.errors.is_empty() {
        eprintln!("\n{}", " Errors ".red().bold().underline());
        for (path, error) in &result.errors {
            eprintln!("  {}: {}", path.red(), error);
        }
    }

    if show_excluded {
        eprintln!("\n{}", " Excluded Files ".green().bold().underline());
        if result.excluded.is_empty() {
            eprintln!("{}", "(Nothing excluded)".yellow());
        } else {
            eprintln!("{}", excluded_table(&result.excluded));
        }
    }

    eprintln!(
        "\n{:<14} {}",
        "Files:".green(),
        result.files.len().to_string().cyan()
    );
    eprintln!(
        "{:<14} {}",
        "Total Size:".green(),
        format_size(result.total_size).cyan()
    );
}

fn excluded_table(excluded: &[Exclusion]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Path").fg(Color::Green),
        Cell::new("Reason").fg(Color::Green),
        Cell::new("Pattern").fg(Color::Green),
    ]);
    for entry in excluded {
        table.add_row(vec![
            Cell::new(&entry.path),
            Cell::new(entry.reason.to_string()),
            Cell::new(&entry.pattern),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxcat_core::{ExclusionReason, FileInfo};

    fn file(path: &str, size: u64, manual: bool) -> FileInfo {
        FileInfo {
            path: path.to_string(),
            size,
            manual,
        }
    }

    #[test]
    fn tree_uses_branch_glyphs() {
        let tree = build_tree(&[
            file("README.md", 10, true),
            file("src/lib.rs", 20, false),
            file("src/main.rs", 30, false),
        ]);
        let rendered = render_tree(&tree);
        let expected = "├── README.md (10 B) (manual)\n\
                        └── src/\n    \
                        ├── lib.rs (20 B)\n    \
                        └── main.rs (30 B)\n";
        assert_eq!(rendered, expected);
    }

    #[test]
    fn excluded_table_lists_reason_and_pattern() {
        let table = excluded_table(&[Exclusion {
            path: "build/app.o".into(),
            reason: ExclusionReason::AncestorCwdMatch,
            pattern: "build".into(),
        }]);
        let rendered = table.to_string();
        assert!(rendered.contains("build/app.o"));
        assert!(rendered.contains("ancestor CWD match"));
    }

    #[test]
    fn stream_is_written_to_nested_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("out/context.txt");
        write_stream(b"--- a\nx\n---\n", Some(&path), true).unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"--- a\nx\n---\n");
    }
}

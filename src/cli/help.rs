// src/cli/help.rs

use crate::core::registry::Registry;
use colored::Colorize;

const TAB_SPACES: usize = 4;

/// Renders the usage screen from the registry: one aligned row per command and option.
pub fn render_help(registry: &Registry) -> String {
    let command_rows: Vec<(String, &str)> = registry
        .commands()
        .iter()
        .map(|cmd| {
            let flags = if cmd.is_default() {
                "TEXT".to_string()
            } else {
                cmd.flags.join(", ")
            };
            (flags, cmd.description.as_str())
        })
        .collect();
    let option_rows: Vec<(String, &str)> = registry
        .options()
        .iter()
        .map(|opt| (opt.flags.join(", "), opt.description.as_str()))
        .collect();

    let flag_len = command_rows
        .iter()
        .chain(option_rows.iter())
        .map(|(flags, _)| flags.len())
        .max()
        .unwrap_or(0)
        + 2;

    let mut help = format!(
        "q {} - {}",
        env!("CARGO_PKG_VERSION"),
        env!("CARGO_PKG_DESCRIPTION")
    );
    help.push_str(&format!(
        "\n\nUsage: {}",
        "q [command] TEXT [options]".green()
    ));
    help.push_str("\n\nCommands (one required):\n");
    help.push_str(&render_rows(&command_rows, flag_len));
    help.push_str("\n\nOptions:\n");
    help.push_str(&render_rows(&option_rows, flag_len));
    help
}

fn render_rows(rows: &[(String, &str)], width: usize) -> String {
    rows.iter()
        .map(|(flags, description)| format_row(flags, description, width))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_row(flags: &str, description: &str, width: usize) -> String {
    format!(
        "{}{}{}",
        " ".repeat(TAB_SPACES),
        format!("{flags:<width$}").green(),
        description
    )
}

//! Output formatting utilities.

use ac_core::controller::Response;
use colored::Colorize;

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green().bold(), message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn info(message: &str) {
    eprintln!("{} {}", "ℹ".blue().bold(), message);
}

/// Print a handler response as JSON on stdout, with a summary on stderr.
pub fn response(response: &Response) -> color_eyre::Result<()> {
    let json = match response {
        Response::View(view) => {
            let status = view.status.to_string();
            let status = if view.status >= 400 {
                status.red().bold()
            } else {
                status.green().bold()
            };
            eprintln!("{} {}", status, view.template);
            serde_json::to_value(view)?
        }
        Response::Redirect(url) => {
            eprintln!("{} {}", "302".cyan().bold(), url);
            serde_json::json!({ "redirect": url })
        }
    };
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}

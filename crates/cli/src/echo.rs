use owo_colors::OwoColorize;
use web2onenote_core::{Article, DeviceCodePrompt, NotebookRef, Route, SectionRef};

use crate::VERSION;

/// Print a styled banner for verbose mode
pub fn print_banner() {
    eprintln!(
        "\n{} {} {}",
        "web2onenote".bold().bright_blue(),
        "v".dimmed(),
        VERSION.dimmed()
    );
    eprintln!("{}", "Clip web articles into OneNote\n".dimmed());
}

/// Print a styled step message
pub fn print_step(step: usize, total: usize, message: &str) {
    eprintln!("{} {}", format!("[{}/{}]", step, total).dimmed(), message.bright_cyan());
}

/// Print a success message
pub fn print_success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.bright_green());
}

/// Print an info message
pub fn print_info(message: &str) {
    eprintln!("{} {}", "ℹ".blue(), message.bright_blue());
}

/// Print a warning message
pub fn print_warning(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.bright_yellow());
}

/// Print timing information with color coding
pub fn print_timing(label: &str, duration: std::time::Duration) {
    let ms = duration.as_secs_f64() * 1000.0;
    let label = format!("{}:", label);

    if ms < 500.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "fast".dimmed());
    } else if ms < 3000.0 {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "moderate".bright_yellow());
    } else {
        eprintln!("  {} {:>8.2}ms ({})", label.dimmed(), ms, "slow".bright_red());
    }
}

/// Print extraction details summary
pub fn print_extraction_details(article: &Article, route: Option<&Route>) {
    eprintln!("\n{}", "═".repeat(60).dimmed());
    eprintln!("{}", "Extraction Details".bold().cyan());
    eprintln!("{}", "═".repeat(60).dimmed());
    eprintln!("  {} {}", "Title:".dimmed(), article.title.bright_white());
    eprintln!("  {} {}", "Tier:".dimmed(), format!("{:?}", article.tier).bright_white());
    if let Some(route) = route {
        let route = match route {
            Route::Proxy(name) => format!("proxy {}", name),
            Route::Direct => "direct".to_string(),
        };
        eprintln!("  {} {}", "Route:".dimmed(), route.bright_white());
    }
    eprintln!(
        "  {} {}\n",
        "Content:".dimmed(),
        format_size(article.content.len()).bright_white()
    );
}

/// Print the device code instructions for an interactive sign-in
pub fn print_device_code(prompt: &DeviceCodePrompt) {
    eprintln!();
    if prompt.message.is_empty() {
        print_info(&format!(
            "Open {} and enter the code {}",
            prompt.verification_uri, prompt.user_code
        ));
    } else {
        print_info(&prompt.message);
    }
    eprintln!(
        "  {} {}s\n",
        "Expires in:".dimmed(),
        prompt.expires_in.as_secs().to_string().bright_white()
    );
}

/// Print a notebook listing with its sections
pub fn print_catalog(
    notebooks: &[NotebookRef], selected_notebook: Option<&str>, sections: &[SectionRef],
    selected_section: Option<&str>,
) {
    for notebook in notebooks {
        let marker = if selected_notebook == Some(notebook.id.as_str()) { "*" } else { " " };
        println!("{} {}  {}", marker, notebook.display_name, notebook.id.dimmed());

        if selected_notebook == Some(notebook.id.as_str()) {
            for section in sections {
                let marker = if selected_section == Some(section.id.as_str()) { "*" } else { " " };
                println!("    {} {}  {}", marker, section.display_name, section.id.dimmed());
            }
        }
    }
}

/// Format file size for display
pub fn format_size(bytes: usize) -> String {
    const KB: usize = 1024;
    const MB: usize = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

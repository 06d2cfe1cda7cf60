//! HTML rendering of the cached messages.

use rust_embed::RustEmbed;
use thiserror::Error;

/// Replaced by one `<li>` per message.
const MESSAGES_PLACEHOLDER: &str = "{{messages}}";

const TEMPLATE: &str = "index.html";

/// Embedded dashboard assets from assets/dashboard/
#[derive(RustEmbed)]
#[folder = "assets/dashboard/"]
struct DashboardAssets;

#[derive(Debug, Error)]
pub enum PageError {
    #[error("dashboard template '{0}' is not embedded")]
    MissingTemplate(&'static str),

    #[error("dashboard template is not valid UTF-8")]
    InvalidEncoding,
}

/// Render the dashboard page listing `messages` in order.
pub fn render_page(messages: &[String]) -> Result<String, PageError> {
    let template = DashboardAssets::get(TEMPLATE).ok_or(PageError::MissingTemplate(TEMPLATE))?;
    let html = std::str::from_utf8(&template.data).map_err(|_| PageError::InvalidEncoding)?;

    let items: String = messages
        .iter()
        .map(|m| format!("      <li>{}</li>\n", escape_html(m)))
        .collect();

    Ok(html.replace(MESSAGES_PLACEHOLDER, &items))
}

/// Escape text for use inside HTML element content or attribute values.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

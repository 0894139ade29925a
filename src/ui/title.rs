use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::core::catalog::ModelDescriptor;

const SEPARATOR: &str = " • ";

/// Header state gathered from both session controllers.
#[derive(Debug, Clone)]
pub struct TitleInfo<'a> {
    pub model: &'a ModelDescriptor,
    pub username: Option<&'a str>,
    pub chat_ready: bool,
    pub auth_ready: bool,
}

fn account_field(info: &TitleInfo<'_>) -> String {
    match (info.auth_ready, info.username) {
        (false, _) => "Connecting…".to_string(),
        (true, Some(username)) => format!("Signed in as {username}"),
        (true, None) => "Not signed in".to_string(),
    }
}

/// Cut `text` to at most `max_width` columns, ending in `…` when shortened.
pub fn truncate_to_width(text: &str, max_width: usize) -> String {
    if UnicodeWidthStr::width(text) <= max_width {
        return text.to_string();
    }
    if max_width == 0 {
        return String::new();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max_width {
            break;
        }
        out.push(ch);
        used += w;
    }
    out.push('…');
    out
}

/// Build the header line. The model field shrinks first so the account
/// state stays readable on narrow terminals.
pub fn build_title(info: &TitleInfo<'_>, width: usize) -> String {
    let base = format!("Monkeyking v{}", env!("CARGO_PKG_VERSION"));
    let account = account_field(info);
    let model = if info.chat_ready {
        format!("{} ({})", info.model.name, info.model.provider)
    } else {
        format!("{} (waiting for platform)", info.model.name)
    };

    let fixed = UnicodeWidthStr::width(base.as_str())
        + UnicodeWidthStr::width(account.as_str())
        + 2 * SEPARATOR.width();
    let model_budget = width.saturating_sub(fixed);
    if model_budget < 4 {
        return truncate_to_width(&format!("{base}{SEPARATOR}{account}"), width);
    }

    format!(
        "{base}{SEPARATOR}{}{SEPARATOR}{account}",
        truncate_to_width(&model, model_budget)
    )
}

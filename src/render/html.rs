use std::{fmt::Write as _, time::Duration};

use crate::bar::CollabBar;

/// Render the strip as HTML markup at `now`.
///
/// Every tiled entry is emitted; each logo links to its target in a new browsing context.
pub fn render_html(bar: &CollabBar, now: Duration) -> String {
    let layout = bar.layout(now);
    let tiled = bar.tiled();
    let state = if layout.paused { "paused" } else { "running" };

    let mut out = String::with_capacity(256 + tiled.len() * 192);
    let _ = writeln!(
        out,
        r#"<div class="collab-bar" style="width:{}px;height:{}px;overflow:hidden;position:relative">"#,
        px(layout.width),
        px(layout.height),
    );
    let _ = writeln!(
        out,
        r#"  <div class="collab-bar__track" data-state="{state}" style="display:flex;align-items:center;height:100%;gap:{}px;transform:translateX({}px)">"#,
        px(tiled.gap()),
        px(layout.offset),
    );
    for (i, logo) in tiled.iter().enumerate() {
        let _ = writeln!(
            out,
            r#"    <a href="{}" target="_blank" rel="noopener noreferrer" style="width:max-content"><img src="{}" alt="Logo {i}" width="{}" height="{}"></a>"#,
            escape_attr(logo.href()),
            escape_attr(logo.source()),
            px(logo.width),
            px(logo.height),
        );
    }
    out.push_str("  </div>\n</div>\n");
    out
}

// Two decimals, trailing zeros trimmed.
fn px(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" { "0".to_owned() } else { s.to_owned() }
}

fn escape_attr(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

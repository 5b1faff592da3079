use super::{SCRIPT_FILE, STYLESHEET_FILE};
use crate::schema::{Component, Screen, Specification};

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// HTML shell with the `#app` mount and a static outline for clients that
/// run no script.
pub fn render_markup(spec: &Specification) -> String {
    let title = escape_html(&spec.title);
    let mut html = String::new();
    html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
    html.push_str("<meta charset=\"utf-8\">\n");
    html.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    html.push_str(&format!("<title>{}</title>\n", title));
    html.push_str(&format!(
        "<link rel=\"stylesheet\" href=\"{}\">\n",
        STYLESHEET_FILE
    ));
    html.push_str("</head>\n<body>\n");
    html.push_str("<div id=\"app\" class=\"app\"></div>\n");
    html.push_str("<noscript>\n<main class=\"outline\">\n");
    html.push_str(&format!("<h1>{}</h1>\n", title));
    if !spec.summary.trim().is_empty() {
        html.push_str(&format!(
            "<p class=\"outline__summary\">{}</p>\n",
            escape_html(&spec.summary)
        ));
    }
    for screen in &spec.key_screens {
        render_screen(&mut html, screen);
    }
    html.push_str("</main>\n</noscript>\n");
    html.push_str(&format!("<script src=\"{}\" defer></script>\n", SCRIPT_FILE));
    html.push_str("</body>\n</html>\n");
    html
}

fn render_screen(html: &mut String, screen: &Screen) {
    html.push_str("<section class=\"screen\">\n");
    html.push_str(&format!("<h2>{}</h2>\n", escape_html(&screen.name)));
    html.push_str(&format!(
        "<p class=\"screen__goal\">{}</p>\n",
        escape_html(&screen.goal)
    ));
    for component in &screen.components {
        render_component(html, component);
    }
    html.push_str("</section>\n");
}

fn render_component(html: &mut String, component: &Component) {
    html.push_str(&format!(
        "<div class=\"component component--{}\">\n",
        component.kind
    ));
    if let Some(title) = &component.title {
        html.push_str(&format!("<h3>{}</h3>\n", escape_html(title)));
    }
    if let Some(description) = &component.description {
        html.push_str(&format!("<p>{}</p>\n", escape_html(description)));
    }
    for items in [&component.fields, &component.sample_items].into_iter().flatten() {
        push_list(html, items);
    }
    if !component.actions.is_empty() {
        html.push_str("<div class=\"component__actions\">");
        for action in &component.actions {
            html.push_str(&format!(
                "<button type=\"button\" disabled>{}</button>",
                escape_html(action)
            ));
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div>\n");
}

fn push_list(html: &mut String, items: &[String]) {
    if items.is_empty() {
        return;
    }
    html.push_str("<ul>");
    for item in items {
        html.push_str(&format!("<li>{}</li>", escape_html(item)));
    }
    html.push_str("</ul>\n");
}

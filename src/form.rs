//! HTML rendering of the prediction form

use crate::config::FormMode;
use crate::presenter::Message;
use crate::schema::{FeatureKind, FeatureSchema};
use std::collections::HashMap;
use std::fmt::Write;

/// Input widget for one column
#[derive(Debug, Clone, PartialEq)]
pub enum Widget {
    Text,
    Number { min: f64, max: f64, step: f64 },
    Select { choices: Vec<String> },
}

/// A labelled form field bound to a model column
#[derive(Debug, Clone, PartialEq)]
pub struct FormField {
    pub name: String,
    pub label: String,
    pub widget: Widget,
}

/// Build one field per model column, in model order.
///
/// Free-text mode renders every column as a text box. Typed mode uses the
/// schema constraints and falls back to a text box for columns the schema
/// does not know.
pub fn build_fields(schema: &FeatureSchema, columns: &[String], mode: FormMode) -> Vec<FormField> {
    columns
        .iter()
        .map(|name| {
            let spec = schema.get(name);
            let widget = match (mode, spec.map(|s| &s.kind)) {
                (FormMode::Typed, Some(FeatureKind::Numeric { min, max, integer })) => {
                    Widget::Number {
                        min: *min,
                        max: *max,
                        step: if *integer { 1.0 } else { 0.001 },
                    }
                }
                (FormMode::Typed, Some(FeatureKind::Categorical { choices })) => Widget::Select {
                    choices: choices.iter().map(|c| c.to_string()).collect(),
                },
                _ => Widget::Text,
            };

            FormField {
                name: name.clone(),
                label: schema.label_for(name).to_string(),
                widget,
            }
        })
        .collect()
}

/// Escape text for use in HTML content and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub const DESCRIPTION: &str = "Predict whether a bank client will subscribe to a term deposit \
     using a machine learning model trained on past campaign data.";
pub const SUBHEADING: &str = "Client Information Input";

const STYLE: &str = r#"
body { font-family: sans-serif; max-width: 960px; margin: 2rem auto; padding: 0 1rem; }
.grid { display: grid; grid-template-columns: repeat(3, 1fr); gap: 1rem; }
.field label { display: block; font-size: 0.9rem; margin-bottom: 0.25rem; }
.field input, .field select { width: 100%; box-sizing: border-box; padding: 0.3rem; }
button { margin-top: 1.5rem; padding: 0.5rem 1.5rem; }
.msg { margin-top: 1rem; padding: 0.6rem 0.8rem; border-radius: 4px; }
.msg-success { background: #e6f4ea; color: #1e4620; }
.msg-error { background: #fce8e6; color: #5f2120; }
.msg-info { background: #e8f0fe; color: #0b3a75; }
.msg-warning { background: #fef7e0; color: #5c4400; }
.msg-caption { padding: 0.2rem 0; color: #666; font-size: 0.85rem; }
"#;

fn render_field(out: &mut String, field: &FormField, value: Option<&str>) {
    let name = escape_html(&field.name);
    let value = value.unwrap_or("");

    let _ = write!(
        out,
        r#"<div class="field"><label for="{name}">{}</label>"#,
        escape_html(&field.label)
    );

    match &field.widget {
        Widget::Text => {
            let _ = write!(
                out,
                r#"<input type="text" id="{name}" name="{name}" value="{}">"#,
                escape_html(value)
            );
        }
        Widget::Number { min, max, step } => {
            let _ = write!(
                out,
                r#"<input type="number" id="{name}" name="{name}" min="{min}" max="{max}" step="{step}" value="{}">"#,
                escape_html(value)
            );
        }
        Widget::Select { choices } => {
            let _ = write!(out, r#"<select id="{name}" name="{name}">"#);
            for choice in choices {
                let selected = if choice == value { " selected" } else { "" };
                let choice = escape_html(choice);
                let _ = write!(out, r#"<option value="{choice}"{selected}>{choice}</option>"#);
            }
            out.push_str("</select>");
        }
    }

    out.push_str("</div>");
}

/// Render the full page: form fields in a three-column grid, then messages.
///
/// `values` holds the previously submitted input so a re-rendered form keeps it.
pub fn render_page(
    title: &str,
    fields: &[FormField],
    values: &HashMap<String, String>,
    messages: &[Message],
) -> String {
    let title = escape_html(title);
    let mut out = String::with_capacity(8 * 1024);

    let _ = write!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body>\n<h1>{title}</h1>\n\
         <p>{DESCRIPTION}</p>\n<h2>{SUBHEADING}</h2>\n\
         <form method=\"post\" action=\"/predict\">\n<div class=\"grid\">\n"
    );

    for field in fields {
        render_field(&mut out, field, values.get(&field.name).map(String::as_str));
        out.push('\n');
    }

    out.push_str("</div>\n<button type=\"submit\">Predict</button>\n</form>\n");

    for message in messages {
        let _ = writeln!(
            out,
            r#"<div class="{}">{}</div>"#,
            message.kind.css_class(),
            escape_html(&message.text)
        );
    }

    out.push_str("</body>\n</html>\n");
    out
}

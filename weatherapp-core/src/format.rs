//! Output formatters, looked up by name at output time.

use crate::{model::ProviderOutput, registry::Registry};

pub trait Formatter: Send + Sync {
    fn emit(&self, output: &ProviderOutput) -> String;
}

pub type FormatterFactory = Box<dyn Fn() -> Box<dyn Formatter> + Send + Sync>;

pub const DEFAULT_FORMATTER: &str = "list";

pub fn builtin_formatters() -> Registry<FormatterFactory> {
    let mut registry: Registry<FormatterFactory> = Registry::new();
    registry.add("list", Box::new(|| Box::new(ListFormatter)));
    registry.add("table", Box::new(|| Box::new(TableFormatter)));
    registry.add("csv", Box::new(|| Box::new(CsvFormatter)));
    registry.add("json", Box::new(|| Box::new(JsonFormatter)));
    registry
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ListFormatter;

impl Formatter for ListFormatter {
    fn emit(&self, output: &ProviderOutput) -> String {
        let mut out = format!(
            "{}\n{}\n{}\n{}\n",
            output.title,
            "*".repeat(12),
            output.location,
            "-".repeat(12)
        );
        for (key, value) in output.info.iter() {
            out.push_str(&format!("{key}: {value}\n"));
        }
        out
    }
}

/// Two-column box table: title/location header, then one row per field.
#[derive(Debug, Clone, Copy, Default)]
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn emit(&self, output: &ProviderOutput) -> String {
        let width = |s: &str| s.chars().count();
        let left = output
            .info
            .iter()
            .map(|(k, _)| width(k))
            .chain([width(&output.title)])
            .max()
            .unwrap_or(0);
        let right = output
            .info
            .iter()
            .map(|(_, v)| width(v))
            .chain([width(&output.location)])
            .max()
            .unwrap_or(0);

        let rule = format!("+{}+{}+\n", "-".repeat(left + 2), "-".repeat(right + 2));
        let row = |a: &str, b: &str| {
            format!(
                "| {a}{} | {b}{} |\n",
                " ".repeat(left - width(a)),
                " ".repeat(right - width(b))
            )
        };

        let mut out = rule.clone();
        out.push_str(&row(&output.title, &output.location));
        out.push_str(&rule);
        if !output.info.is_empty() {
            for (key, value) in output.info.iter() {
                out.push_str(&row(key, value));
            }
            out.push_str(&rule);
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CsvFormatter;

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', ' ', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

impl Formatter for CsvFormatter {
    fn emit(&self, output: &ProviderOutput) -> String {
        let mut out = format!(
            "{},{}\n",
            csv_field(&output.title),
            csv_field(&output.location)
        );
        for (key, value) in output.info.iter() {
            out.push_str(&format!("{},{}\n", csv_field(key), csv_field(value)));
        }
        out
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn emit(&self, output: &ProviderOutput) -> String {
        let mut json = serde_json::to_string_pretty(output).unwrap_or_default();
        json.push('\n');
        json
    }
}

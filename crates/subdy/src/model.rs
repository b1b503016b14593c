use crate::dns::Answer;
use crate::Result;
use colored::Colorize;
use serde::Serialize;
use serde_json::to_string_pretty;
use std::fmt::Write as FmtWrite;

// region:        --- Models

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubdomainResult {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<Answer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub open_ports: Option<Vec<String>>,
}

impl SubdomainResult {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            answer: None,
            open_ports: None,
        }
    }

    /// IPv4 addresses of the resolved answer, empty when not resolved.
    pub fn ips(&self) -> Vec<String> {
        self.answer.as_ref().map(Answer::ips).unwrap_or_default()
    }
}

/// A source which failed during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceWarning {
    pub source: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct Report {
    pub domain: String,
    pub subdomains: Vec<SubdomainResult>,
    pub warnings: Vec<SourceWarning>,
}

impl Report {
    pub fn is_empty(&self) -> bool {
        self.subdomains.is_empty()
    }
}

// endregion:     --- Models

// region:        --- Rendering

pub fn render_json(report: &Report) -> Result<String> {
    Ok(to_string_pretty(report)?)
}

/// One line per subdomain: name, simple answer and comma separated ports.
pub fn render_raw(report: &Report) -> Result<String> {
    let mut content = String::new();

    for subdomain in &report.subdomains {
        let mut fields = vec![subdomain.name.clone()];

        if let Some(answer) = &subdomain.answer {
            let display = answer.to_display(true);
            if !display.is_empty() {
                fields.push(display);
            }
        }

        if let Some(ports) = subdomain.open_ports.as_ref().filter(|ports| !ports.is_empty()) {
            fields.push(ports.join(","));
        }

        writeln!(&mut content, "{}", fields.join(" "))?;
    }

    Ok(content)
}

pub fn render_text(report: &Report) -> Result<String> {
    let mut content = String::new();
    writeln!(&mut content)?;

    for subdomain in &report.subdomains {
        write!(&mut content, " {} {}", "•".dimmed(), subdomain.name)?;

        if let Some(answer) = &subdomain.answer {
            let display = answer.to_display(false);
            if !display.is_empty() {
                write!(&mut content, " {}", format!("({})", display).dimmed())?;
            }
        }

        if let Some(ports) = subdomain.open_ports.as_ref().filter(|ports| !ports.is_empty()) {
            write!(&mut content, " {}", format!("[{}]", ports.join(", ")).green())?;
        }

        writeln!(&mut content)?;
    }

    writeln!(&mut content)?;
    Ok(content)
}

// endregion:     --- Rendering

//! Rendering of session events for the terminal.

use chrono::{Local, TimeZone};
use console::{Style, style};
use hearth_session::{Established, EstablishedFrom, Language, SessionObserver};
use serde::Serialize;

/// One establishment, as printed with `--json`.
#[derive(Debug, Serialize)]
pub struct EventOutput<'a> {
    pub authenticated: bool,
    pub username: Option<&'a str>,
    pub timestamp: i64,
    pub source: EstablishedFrom,
    pub label: String,
    pub resume_to: Option<&'a str>,
}

impl<'a> EventOutput<'a> {
    pub fn new(event: &'a Established, language: &Language) -> Self {
        Self {
            authenticated: event.snapshot.is_authenticated(),
            username: event.snapshot.username.as_deref(),
            timestamp: event.snapshot.timestamp,
            source: event.source,
            label: label(event, language),
            resume_to: event.resume_to.as_deref(),
        }
    }
}

/// Label of the control the user would see for this event.
///
/// Signed in: the logout control. Signed out: the sign-in control.
pub fn label(event: &Established, language: &Language) -> String {
    if event.snapshot.is_authenticated() {
        language.status_label(&event.snapshot)
    } else {
        language.login_label().to_string()
    }
}

/// Epoch millis as local time; `-` for the zero timestamp.
pub fn format_millis(millis: i64) -> String {
    if millis == 0 {
        return "-".to_string();
    }
    match Local.timestamp_millis_opt(millis).single() {
        Some(time) => time.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => millis.to_string(),
    }
}

pub fn print_event(event: &Established, language: &Language, json: bool) {
    if json {
        match serde_json::to_string(&EventOutput::new(event, language)) {
            Ok(line) => println!("{}", line),
            Err(e) => tracing::warn!(error = %e, "Failed to encode event"),
        }
        return;
    }

    let dim = Style::new().dim();
    let source = match event.source {
        EstablishedFrom::Cache => "cached",
        EstablishedFrom::Server => "server",
    };

    if event.snapshot.is_authenticated() {
        println!(
            "{} {} {}",
            style("●").green(),
            label(event, language),
            dim.apply_to(format!("({})", source))
        );
        println!("  {} hearth logout", dim.apply_to(format!("{}:", language.logout)));
    } else {
        println!(
            "{} Not signed in. {}",
            style("○").yellow(),
            dim.apply_to(format!("({})", source))
        );
        println!(
            "  {} hearth login",
            dim.apply_to(format!("{}:", language.login_label()))
        );
    }

    if let Some(target) = &event.resume_to {
        println!("  {} {}", dim.apply_to("Continue at:"), target);
    }
}

/// Observer that prints every establishment as it happens.
#[derive(Debug)]
pub struct Presenter {
    language: Language,
    json: bool,
}

impl Presenter {
    pub fn new(language: Language, json: bool) -> Self {
        Self { language, json }
    }
}

impl SessionObserver for Presenter {
    fn on_established(&self, event: &Established) {
        print_event(event, &self.language, self.json);
    }
}

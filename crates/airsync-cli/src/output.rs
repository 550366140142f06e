//! Command reports
//!
//! Every command fills one [`Report`] and prints it once, either as
//! terminal lines or as a single JSON object on stdout.

use serde_json::{Map, Value};

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Outcome {
    Success,
    Warning,
    Failure,
}

/// Outcome of one command
///
/// Fields and notes only appear in terminal output; `data` entries only in
/// JSON. Warnings appear in both.
#[derive(Debug, Clone)]
pub struct Report {
    outcome: Outcome,
    headline: String,
    fields: Vec<(String, String)>,
    notes: Vec<String>,
    warnings: Vec<String>,
    data: Map<String, Value>,
}

impl Report {
    fn with_outcome(outcome: Outcome, headline: impl Into<String>) -> Self {
        Self {
            outcome,
            headline: headline.into(),
            fields: Vec::new(),
            notes: Vec::new(),
            warnings: Vec::new(),
            data: Map::new(),
        }
    }

    pub fn success(headline: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Success, headline)
    }

    /// Command finished, but the result needs attention
    pub fn warning(headline: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Warning, headline)
    }

    pub fn failure(headline: impl Into<String>) -> Self {
        Self::with_outcome(Outcome::Failure, headline)
    }

    /// Labelled value, aligned under the headline
    pub fn field(mut self, label: &str, value: impl Into<String>) -> Self {
        self.fields.push((label.to_string(), value.into()));
        self
    }

    pub fn note(mut self, text: impl Into<String>) -> Self {
        self.notes.push(text.into());
        self
    }

    pub fn warn(mut self, text: impl Into<String>) -> Self {
        self.warnings.push(text.into());
        self
    }

    /// Top-level member of the JSON object
    pub fn data(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.outcome != Outcome::Failure
    }

    pub fn render_human(&self) -> String {
        let mut out = match self.outcome {
            Outcome::Success => format!("\u{2713} {}\n", self.headline),
            Outcome::Warning => format!("\u{26a0} {}\n", self.headline),
            Outcome::Failure => format!("\u{2717} Error: {}\n", self.headline),
        };
        for (label, value) in &self.fields {
            out.push_str(&format!("  {:<18} {}\n", format!("{label}:"), value));
        }
        for warning in &self.warnings {
            out.push_str(&format!("\u{26a0} Warning: {warning}\n"));
        }
        for note in &self.notes {
            if note.is_empty() {
                out.push('\n');
            } else {
                out.push_str(&format!("  {note}\n"));
            }
        }
        out
    }

    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        object.insert("success".into(), Value::Bool(self.is_success()));
        object.insert("message".into(), Value::String(self.headline.clone()));
        for (key, value) in &self.data {
            object.insert(key.clone(), value.clone());
        }
        if !self.warnings.is_empty() {
            object.insert("warnings".into(), self.warnings.clone().into());
        }
        Value::Object(object)
    }

    /// Writes the report; failures go to stderr in terminal output
    pub fn print(&self, format: OutputFormat) {
        match format {
            OutputFormat::Json => match serde_json::to_string_pretty(&self.to_json()) {
                Ok(text) => println!("{text}"),
                Err(e) => eprintln!("{{\"success\": false, \"error\": \"{e}\"}}"),
            },
            OutputFormat::Human if self.is_success() => print!("{}", self.render_human()),
            OutputFormat::Human => eprint!("{}", self.render_human()),
        }
    }
}

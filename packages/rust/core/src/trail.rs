//! Append-only audit state of one run.

use tracing::debug;

/// Audit tags and every email address seen during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunTrail {
    path: Vec<String>,
    emails: Vec<String>,
}

impl RunTrail {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an audit tag.
    pub fn tag(&mut self, tag: impl Into<String>) {
        let tag = tag.into();
        debug!(%tag, "enrichment step");
        self.path.push(tag);
    }

    pub fn has(&self, tag: &str) -> bool {
        self.path.iter().any(|t| t == tag)
    }

    /// Remember an email for reconciliation. Blank values are ignored.
    pub fn collect_email(&mut self, email: Option<&str>) {
        if let Some(email) = email.map(str::trim).filter(|e| !e.is_empty()) {
            self.emails.push(email.to_string());
        }
    }

    pub fn collect_emails<S: AsRef<str>>(&mut self, emails: impl IntoIterator<Item = S>) {
        for email in emails {
            self.collect_email(Some(email.as_ref()));
        }
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Raw collected emails, duplicates included.
    pub fn emails(&self) -> &[String] {
        &self.emails
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<String>) {
        (self.path, self.emails)
    }
}

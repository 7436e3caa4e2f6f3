//! Asking the compute server to measure a configuration that has no cache.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use thiserror::Error;

use crate::data::model::DatasetArgs;

// ---------------------------------------------------------------------------
// Email validation
// ---------------------------------------------------------------------------

static LOCAL_PART_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9!#$%&'*+/=?^_`{|}~.-]+$").expect("local-part pattern is valid")
});
static DOMAIN_LABEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$").expect("label pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmailError {
    #[error("the email address is empty")]
    Empty,
    #[error("the email address must contain exactly one @")]
    At,
    #[error("the part before the @ is not valid")]
    LocalPart,
    #[error("the domain name is not valid")]
    Domain,
}

/// Check the syntax of an address and return its normalized form
/// (domain lower-cased, surrounding whitespace removed).
pub fn validate_email(input: &str) -> Result<String, EmailError> {
    let email = input.trim();
    if email.is_empty() {
        return Err(EmailError::Empty);
    }
    let (local, domain) = match email.split_once('@') {
        Some((l, d)) if !d.contains('@') => (l, d),
        _ => return Err(EmailError::At),
    };

    if local.is_empty()
        || local.len() > 64
        || local.starts_with('.')
        || local.ends_with('.')
        || local.contains("..")
        || !LOCAL_PART_RE.is_match(local)
    {
        return Err(EmailError::LocalPart);
    }

    let domain = domain.to_ascii_lowercase();
    let labels: Vec<&str> = domain.split('.').collect();
    let tld_ok = labels
        .last()
        .is_some_and(|tld| tld.len() >= 2 && tld.chars().all(|c| c.is_ascii_alphabetic()));
    if domain.len() > 253
        || labels.len() < 2
        || !tld_ok
        || !labels.iter().all(|l| DOMAIN_LABEL_RE.is_match(l))
    {
        return Err(EmailError::Domain);
    }

    Ok(format!("{local}@{domain}"))
}

/// What the form should show for the current input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailCheck {
    /// Nothing typed, nothing clicked.
    Idle,
    /// Valid address, waiting for the button.
    Ready(String),
    /// Valid address and the button was clicked.
    Submit(String),
    Invalid,
}

pub fn check_email_input(input: &str, clicked: bool) -> EmailCheck {
    match validate_email(input) {
        Ok(email) if clicked => EmailCheck::Submit(email),
        Ok(email) => EmailCheck::Ready(email),
        Err(_) if !input.trim().is_empty() || clicked => EmailCheck::Invalid,
        Err(_) => EmailCheck::Idle,
    }
}

// ---------------------------------------------------------------------------
// Compute request
// ---------------------------------------------------------------------------

pub const COMPUTING_MESSAGE: &str = "Computing metrics! An email will be sent to you.\n\
    This could take a while if the dataset is big.";
pub const REQUEST_FAILED_MESSAGE: &str =
    "Oh no, a problem happened while requesting the data measurements.";
pub const INVALID_EMAIL_MESSAGE: &str = "Oh no, that email doesn't seem valid!";

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("no compute server is configured (SERVER_URL)")]
    NoServer,
    #[error("request to the compute server failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Accepted,
    /// The server answered with something other than `success`.
    Rejected(String),
}

impl RequestOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            RequestOutcome::Accepted => COMPUTING_MESSAGE,
            RequestOutcome::Rejected(_) => REQUEST_FAILED_MESSAGE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputeRequest {
    pub email: String,
    pub args: DatasetArgs,
}

impl ComputeRequest {
    /// Form fields: the email followed by the dataset arguments. List
    /// values repeat their key once per element.
    pub fn form_fields(&self) -> Vec<(&'static str, String)> {
        let args = &self.args;
        let mut fields = vec![
            ("email", self.email.clone()),
            ("dset_name", args.dset_name.clone()),
            ("dset_config", args.dset_config.clone()),
            ("split_name", args.split_name.clone()),
        ];
        fields.extend(args.text_field.iter().map(|f| ("text_field", f.clone())));
        if let Some(label) = &args.label_field {
            fields.push(("label_field", label.clone()));
        }
        fields.extend(args.label_names.iter().map(|n| ("label_names", n.clone())));
        fields
    }

    /// POST the form to the compute server; blocks until it answers.
    pub fn send(&self, server_url: Option<&str>) -> Result<RequestOutcome, RequestError> {
        let url = server_url.ok_or(RequestError::NoServer)?;
        log::info!(
            "Requesting measurements for {} / {} / {}",
            self.args.dset_name,
            self.args.dset_config,
            self.args.split_name
        );
        let body = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?
            .post(url)
            .form(&self.form_fields())
            .send()?
            .text()?;
        Ok(interpret_response(&body))
    }
}

pub fn interpret_response(body: &str) -> RequestOutcome {
    if body.trim() == "success" {
        RequestOutcome::Accepted
    } else {
        RequestOutcome::Rejected(body.to_string())
    }
}

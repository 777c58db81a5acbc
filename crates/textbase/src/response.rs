use serde::Deserialize;
use serde_json::Value;

use crate::table::Record;

/// JSON envelope returned by every remote service route.
#[derive(Deserialize, Debug)]
pub(crate) struct Envelope<T> {
    /// Error payload, if the request was rejected.
    pub error: Option<Value>,

    /// Route-specific response payload.
    pub data: Option<T>,
}

impl<T> Envelope<T> {
    /// Check whether the service reported an error.
    ///
    /// `null`, `false` and empty strings, arrays or objects do not count as errors.
    pub fn has_error(&self) -> bool {
        match &self.error {
            None | Some(Value::Null) | Some(Value::Bool(false)) => false,
            Some(Value::String(text)) => !text.is_empty(),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(fields)) => !fields.is_empty(),
            Some(_) => true,
        }
    }
}

/// `data` payload of a successful upload.
#[derive(Deserialize, Debug)]
pub(crate) struct UploadData {
    /// Free-text deployment summary.
    pub message: Option<String>,
}

/// A single entry of the bot listing.
#[derive(Deserialize, Debug, PartialEq)]
pub(crate) struct BotSummary {
    /// Bot identifier, either a string or a number.
    pub id: Value,

    /// Bot name.
    pub name: String,

    /// Public bot URL.
    pub url: String,
}

impl BotSummary {
    /// Convert into a table row with `id`, `name` and `url` columns.
    pub fn to_record(&self) -> Record {
        vec![
            (String::from("id"), crate::table::cell(&self.id)),
            (String::from("name"), self.name.clone()),
            (String::from("url"), self.url.clone()),
        ]
    }
}

/// Successfully deployed bot.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Deployment {
    /// Deployment status reported by the service.
    pub status: String,

    /// Identifier of the deployed bot.
    pub bot_id: String,

    /// Public bot URL.
    pub url: String,
}

impl Deployment {
    /// Parse the upload summary message.
    ///
    /// The message has the form `"<status>. Bot ID: <id>. URL: <url>"`: exactly
    /// three clauses separated by `". "`, where the last whitespace-separated
    /// token of the second and third clauses holds the bot ID and URL.
    /// Returns [`None`] for anything else.
    pub fn parse(message: &str) -> Option<Self> {
        let mut clauses = message.trim().split(". ");

        let (Some(status), Some(id_clause), Some(url_clause), None) = (
            clauses.next(),
            clauses.next(),
            clauses.next(),
            clauses.next(),
        ) else {
            return None;
        };

        let status = status.trim();

        if status.is_empty() {
            return None;
        }

        Some(Self {
            status: status.to_owned(),
            bot_id: labelled_value(id_clause)?.to_owned(),
            url: labelled_value(url_clause)?.to_owned(),
        })
    }

    /// Convert into a table row with `Status`, `Bot ID` and `URL` columns.
    pub fn to_record(&self) -> Record {
        vec![
            (String::from("Status"), self.status.clone()),
            (String::from("Bot ID"), self.bot_id.clone()),
            (String::from("URL"), self.url.clone()),
        ]
    }
}

/// Get the trailing token of a `"<label> <value>"` clause.
fn labelled_value(clause: &str) -> Option<&str> {
    let mut tokens = clause.split_whitespace();
    let value = tokens.next_back()?;

    // Label is mandatory.
    tokens.next()?;

    Some(value)
}

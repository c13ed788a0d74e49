//! The request envelope: a `GET <table>` line followed by `Name: value` headers.

/// One `Name: value` line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub table: String,
    pub headers: Vec<Header>,
}

impl Request {
    /// Split a request block into the table name and its headers. Parsing
    /// stops at the first empty line.
    pub fn parse(text: &str) -> Result<Self, RequestError> {
        let mut lines = text.lines().map(|l| l.trim_end_matches('\r'));

        let first = lines
            .by_ref()
            .find(|l| !l.trim().is_empty())
            .ok_or(RequestError::Empty)?;

        let table = match first.split_once(' ') {
            Some(("GET", table)) if !table.trim().is_empty() => table.trim().to_string(),
            _ => return Err(RequestError::InvalidRequestLine(first.to_string())),
        };

        let mut headers = Vec::new();
        for line in lines {
            if line.is_empty() {
                break;
            }
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| RequestError::MalformedHeader(line.to_string()))?;
            headers.push(Header {
                name: name.trim().to_string(),
                value: value.trim_start().to_string(),
            });
        }

        Ok(Self { table, headers })
    }

    /// Last value given for a header, if any
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .rev()
            .find(|h| h.name == name)
            .map(|h| h.value.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("Empty request")]
    Empty,

    #[error("Invalid request method: {0}")]
    InvalidRequestLine(String),

    #[error("Invalid header line: {0}")]
    MalformedHeader(String),
}

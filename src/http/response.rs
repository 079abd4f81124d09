use std::collections::HashMap;

/// Body of every 404 the server writes.
pub const NOT_FOUND_PAGE: &str = "<!DOCTYPE html>\n\
<html lang=\"en\">\n\
<head>\n\
<meta charset=\"utf-8\">\n\
<title>Page not found</title>\n\
</head>\n\
<body>\n\
<h1>Page not found</h1>\n\
<p>The requested page could not be found on this server.</p>\n\
</body>\n\
</html>\n";

/// The statuses this server ever writes. Anything a handler produces goes
/// out as 200; the rest come from the dispatcher and the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    Ok,
    BadRequest,
    NotFound,
    PayloadTooLarge,
    InternalServerError,
}

impl StatusCode {
    fn parts(self) -> (u16, &'static str) {
        match self {
            StatusCode::Ok => (200, "OK"),
            StatusCode::BadRequest => (400, "Bad Request"),
            StatusCode::NotFound => (404, "Not Found"),
            StatusCode::PayloadTooLarge => (413, "Payload Too Large"),
            StatusCode::InternalServerError => (500, "Internal Server Error"),
        }
    }

    /// ```
    /// # use polyport::http::response::StatusCode;
    /// assert_eq!(StatusCode::PayloadTooLarge.as_u16(), 413);
    /// ```
    pub fn as_u16(&self) -> u16 {
        self.parts().0
    }

    pub fn reason_phrase(&self) -> &'static str {
        self.parts().1
    }
}

/// A response as handed to the writer. Header names keep the case they were
/// set with; lookups through [`Response::header`] ignore it.
#[derive(Debug)]
pub struct Response {
    pub status: StatusCode,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

pub struct ResponseBuilder {
    status: StatusCode,
    headers: HashMap<String, String>,
    body: Vec<u8>,
}

impl ResponseBuilder {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        insert_header(&mut self.headers, key.into(), value.into());
        self
    }

    /// Adds every header from `headers`, later entries replacing earlier ones.
    pub fn headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (k, v) in headers {
            insert_header(&mut self.headers, k.clone(), v.clone());
        }
        self
    }

    pub fn body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Fills in `Content-Length` from the body unless it was set explicitly.
    pub fn build(mut self) -> Response {
        if !has_header(&self.headers, "Content-Length") {
            self.headers
                .insert("Content-Length".to_string(), self.body.len().to_string());
        }

        Response {
            status: self.status,
            headers: self.headers,
            body: self.body,
        }
    }
}

impl Response {
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        ResponseBuilder::new(StatusCode::Ok)
            .body(body.into())
            .build()
    }

    /// The fixed "Page not found" document.
    pub fn not_found() -> Self {
        ResponseBuilder::new(StatusCode::NotFound)
            .header("Content-Type", "text/html; charset=utf-8")
            .body(NOT_FOUND_PAGE.as_bytes().to_vec())
            .build()
    }

    pub fn bad_request() -> Self {
        ResponseBuilder::new(StatusCode::BadRequest)
            .header("Content-Type", "text/plain")
            .body(b"400 Bad Request".to_vec())
            .build()
    }

    pub fn payload_too_large() -> Self {
        ResponseBuilder::new(StatusCode::PayloadTooLarge)
            .header("Content-Type", "text/plain")
            .body(b"413 Payload Too Large".to_vec())
            .build()
    }

    pub fn internal_error() -> Self {
        ResponseBuilder::new(StatusCode::InternalServerError)
            .header("Content-Type", "text/plain")
            .body(b"500 Internal Server Error".to_vec())
            .build()
    }

    /// Applies `headers` on top of the response.
    pub fn with_headers<'a, I>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = &'a (String, String)>,
    {
        for (k, v) in headers {
            insert_header(&mut self.headers, k.clone(), v.clone());
        }
        self
    }

    /// Sets `key`, replacing any header with the same name in another case.
    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) {
        insert_header(&mut self.headers, key.into(), value.into());
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

fn has_header(headers: &HashMap<String, String>, key: &str) -> bool {
    headers.keys().any(|k| k.eq_ignore_ascii_case(key))
}

fn insert_header(headers: &mut HashMap<String, String>, key: String, value: String) {
    headers.retain(|k, _| !k.eq_ignore_ascii_case(&key));
    headers.insert(key, value);
}

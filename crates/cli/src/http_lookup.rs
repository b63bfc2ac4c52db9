//! Product lookup over HTTP: one GET per identifier against a URL template.

use std::time::Duration;

use partcheck_recon::{LookupError, ProductLookup, ReferenceRecord};
use reqwest::StatusCode;

const USER_AGENT: &str = concat!("partcheck/", env!("CARGO_PKG_VERSION"));

/// Placeholder replaced by the (URL-encoded) identifier.
pub const ID_PLACEHOLDER: &str = "{id}";

pub struct HttpLookup {
    client: reqwest::blocking::Client,
    url_template: String,
}

impl HttpLookup {
    /// `url_template` must contain `{id}`, e.g. `https://host/api/products/{id}`.
    pub fn new(url_template: &str, timeout: Duration) -> Result<Self, LookupError> {
        if !url_template.contains(ID_PLACEHOLDER) {
            return Err(LookupError::Transport(format!(
                "lookup URL '{url_template}' has no {ID_PLACEHOLDER} placeholder"
            )));
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LookupError::Transport(e.to_string()))?;
        Ok(Self {
            client,
            url_template: url_template.to_string(),
        })
    }

    fn url_for(&self, id: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(id.as_bytes()).collect();
        self.url_template.replace(ID_PLACEHOLDER, &encoded)
    }
}

impl ProductLookup for HttpLookup {
    /// 404 means unknown identifier; any other non-2xx status is an error.
    fn lookup(&self, id: &str) -> Result<Option<ReferenceRecord>, LookupError> {
        let response = self
            .client
            .get(self.url_for(id))
            .send()
            .map_err(|e| LookupError::Transport(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(LookupError::Status {
                id: id.to_string(),
                status: status.as_u16(),
            });
        }

        let record: ReferenceRecord = response.json().map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn lookup_for(server: &MockServer) -> HttpLookup {
        HttpLookup::new(&format!("{}/products/{{id}}", server.base_url()), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn template_requires_placeholder() {
        let err = HttpLookup::new("http://localhost/products", Duration::from_secs(1)).err().unwrap();
        assert!(err.to_string().contains("{id}"));
    }

    #[test]
    fn identifier_is_url_encoded() {
        let lookup = HttpLookup::new("http://h/p/{id}?full=1", Duration::from_secs(1)).unwrap();
        assert_eq!(lookup.url_for("A2V 1/2"), "http://h/p/A2V+1%2F2?full=1");
    }

    #[test]
    fn found_record_is_decoded() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/products/A2V100");
            then.status(200)
                .header("content-type", "application/json")
                .json_body(serde_json::json!({
                    "Produkttitel": "Relais 24V",
                    "Weitere Artikelnummer": "Nicht gefunden",
                    "Gewicht": "45 g"
                }));
        });

        let record = lookup_for(&server).lookup("A2V100").unwrap().unwrap();
        mock.assert();
        assert_eq!(record.title.as_deref(), Some("Relais 24V"));
        assert_eq!(record.alternate_part_number, None);
        assert_eq!(record.weight.as_deref(), Some("45 g"));
    }

    #[test]
    fn not_found_is_none() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products/A2V404");
            then.status(404);
        });
        assert!(lookup_for(&server).lookup("A2V404").unwrap().is_none());
    }

    #[test]
    fn server_error_is_status_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products/A2V500");
            then.status(503);
        });
        let err = lookup_for(&server).lookup("A2V500").unwrap_err();
        assert!(matches!(err, LookupError::Status { status: 503, .. }));
    }

    #[test]
    fn malformed_body_is_decode_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/products/A2V1");
            then.status(200).body("<html>maintenance</html>");
        });
        let err = lookup_for(&server).lookup("A2V1").unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }
}

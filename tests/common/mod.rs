#![allow(dead_code)]

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};

pub const JOB_ID: &str = "750D00000004SkVIAU";

/// SOAP login answer whose serverUrl points back at the mock server.
pub fn login_response(base_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<soapenv:Envelope xmlns:soapenv="http://schemas.xmlsoap.org/soap/envelope/" xmlns="urn:partner.soap.sforce.com">
  <soapenv:Body>
    <loginResponse>
      <result>
        <serverUrl>{}/services/Soap/u/36.0/00D50000000IehZ</serverUrl>
        <sessionId>00D50000000IehZ!SESSION</sessionId>
      </result>
    </loginResponse>
  </soapenv:Body>
</soapenv:Envelope>"#,
        base_url
    )
}

pub fn mock_login(server: &MockServer) -> Mock<'_> {
    let body = login_response(&server.base_url());
    server.mock(|when, then| {
        when.method(POST).path("/services/Soap/u/36.0");
        then.status(200)
            .header("Content-Type", "text/xml")
            .body(body);
    })
}

pub fn job_json(object: &str, operation: &str, state: &str) -> Value {
    json!({
        "id": JOB_ID,
        "object": object,
        "operation": operation,
        "state": state,
        "contentType": "JSON",
        "concurrencyMode": "Parallel",
        "createdDate": "2015-12-15T21:54:29.000+0000"
    })
}

pub fn batch_json(id: &str, state: &str) -> Value {
    json!({
        "id": id,
        "jobId": JOB_ID,
        "state": state,
        "stateMessage": null,
        "createdDate": "2015-12-15T21:56:43.000+0000",
        "numberRecordsProcessed": 0,
        "numberRecordsFailed": 0
    })
}

pub fn async_path(rest: &str) -> String {
    format!("/services/async/36.0/{}", rest)
}

use crate::dispatcher::{HandlerResponse, JSON_CONTENT_TYPE};
use may_minihttp::Response;
use serde_json::Value;
use tracing::debug;

fn status_reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "OK",
    }
}

/// Header lines the server knows how to emit. `may_minihttp` needs `'static` header
/// text, so handler headers outside this set are dropped.
fn static_header(name: &str, value: &str) -> Option<&'static str> {
    if !name.eq_ignore_ascii_case("content-type") {
        return None;
    }
    match value {
        JSON_CONTENT_TYPE => Some("Content-Type: application/json; charset=UTF-8"),
        "application/json" => Some("Content-Type: application/json"),
        "text/plain" => Some("Content-Type: text/plain"),
        "text/yaml" => Some("Content-Type: text/yaml"),
        _ => None,
    }
}

pub fn write_handler_response(res: &mut Response, resp: &HandlerResponse) {
    res.status_code(resp.status as usize, status_reason(resp.status));
    let mut has_content_type = false;
    for (name, value) in &resp.headers {
        match static_header(name, value) {
            Some(line) => {
                has_content_type |= name.eq_ignore_ascii_case("content-type");
                res.header(line);
            }
            None => debug!(header = %name, value = %value, "Dropping unsupported response header"),
        }
    }
    if !has_content_type {
        res.header("Content-Type: application/json; charset=UTF-8");
    }
    if let Some(body) = &resp.body {
        res.body_vec(body.to_string().into_bytes());
    }
}

pub fn write_json_error(res: &mut Response, status: u16, body: Value) {
    res.status_code(status as usize, status_reason(status));
    res.header("Content-Type: application/json");
    res.body_vec(body.to_string().into_bytes());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_reason() {
        assert_eq!(status_reason(200), "OK");
        assert_eq!(status_reason(404), "Not Found");
        assert_eq!(status_reason(500), "Internal Server Error");
    }

    #[test]
    fn test_static_header() {
        assert_eq!(
            static_header("content-type", JSON_CONTENT_TYPE),
            Some("Content-Type: application/json; charset=UTF-8")
        );
        assert_eq!(static_header("x-custom", "1"), None);
        assert_eq!(static_header("Content-Type", "image/png"), None);
    }
}

use tiny_http::{
    Header,
    Request,
    Response,
    StatusCode,
};

use crate::request::{
    RequestResult,
    RequestResultType,
};

use log::{debug, error};


fn header(field: &str, value: &str) -> Option<Header> {
    match Header::from_bytes(field.as_bytes(), value.as_bytes()) {
        Ok(v) => Some(v),
        Err(_) => {
            error!("cannot build header {}: {:?}", field, value);
            None
        },
    }
}

/// Headers sent with every response.
pub fn origin_headers() -> Vec<Header> {
    let server_header_v = format!("hashdrop/{}, tiny_http (Rust)", env!("CARGO_PKG_VERSION"));
    [
        ("Access-Control-Allow-Origin", "*"),
        ("Access-Control-Allow-Methods", "OPTIONS, PUT, POST, GET"),
        ("Access-Control-Allow-Headers", "Content-Type,Authorization,X-Filename"),
        ("Server", server_header_v.as_str()),
    ].iter()
        .filter_map(|(k, v)| header(k, v))
        .collect()
}

/// Map a request outcome to the HTTP status sent to the client.
pub fn status_for(typ: &RequestResultType) -> StatusCode {
    match typ {
        RequestResultType::Found => StatusCode(200),
        RequestResultType::Changed => StatusCode(200),
        RequestResultType::WriteError => StatusCode(500),
        RequestResultType::AuthError => StatusCode(403),
        RequestResultType::InputError => StatusCode(400),
        RequestResultType::RecordError => StatusCode(404),
    }
}

fn respond<R: std::io::Read>(req: Request, mut res: Response<R>) {
    for v in origin_headers() {
        res.add_header(v);
    }
    if let Err(e) = req.respond(res) {
        error!("cannot send response: {}", e);
    }
}

pub fn preflight_response(req: Request) {
    respond(req, Response::empty(StatusCode(200)));
    debug!("served options request");
}

pub fn exec_response(req: Request, r: RequestResult) {
    let res_status = status_for(&r.typ);

    if let Some(v) = r.v {
        let mut res = Response::from_string(v).with_status_code(res_status);
        if let Some(h) = header("Content-Type", "text/plain; charset=utf-8") {
            res.add_header(h);
        }
        respond(req, res);
        return;
    }

    match r.f {
        Some(f) => {
            let info = r.m.unwrap_or_default();
            let mut res = Response::from_file(f).with_status_code(res_status);
            if let Some(h) = header("Content-Type", info.mime().as_ref()) {
                res.add_header(h);
            }
            if let Some(h) = header("Content-Disposition", &info.content_disposition()) {
                res.add_header(h);
            }
            respond(req, res);
        },
        None => {
            respond(req, Response::empty(res_status));
        },
    }
}


#[cfg(test)]
mod tests {
    use super::{
        origin_headers,
        status_for,
    };
    use crate::request::RequestResultType;

    #[test]
    fn test_status_for() {
        assert_eq!(status_for(&RequestResultType::Found).0, 200);
        assert_eq!(status_for(&RequestResultType::Changed).0, 200);
        assert_eq!(status_for(&RequestResultType::AuthError).0, 403);
        assert_eq!(status_for(&RequestResultType::InputError).0, 400);
        assert_eq!(status_for(&RequestResultType::RecordError).0, 404);
        assert_eq!(status_for(&RequestResultType::WriteError).0, 500);
    }

    #[test]
    fn test_origin_headers() {
        let headers = origin_headers();
        assert_eq!(headers.len(), 4);
        assert!(headers.iter().any(|h| h.field.equiv("Server") && h.value.as_str().starts_with("hashdrop/")));
    }
}

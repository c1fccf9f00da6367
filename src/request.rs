use std::fs::File;
use std::io::Read;

use tiny_http::Method;

use crate::auth::AuthSpec;
use crate::meta::FileInfo;
use crate::record::RecordError;
use crate::state::{
    State,
    StateError,
};

use log::{
    debug,
    error,
};

#[derive(Debug, PartialEq)]
pub enum RequestResultType {
    Found,
    Changed,
    WriteError,
    AuthError,
    InputError,
    RecordError,
}

/// Outcome of a client request, ready to be turned into a response.
pub struct RequestResult {
    pub typ: RequestResultType,
    /// Text body.
    pub v: Option<String>,
    /// Content body.
    pub f: Option<File>,
    /// Metadata of the content body.
    pub m: Option<FileInfo>,
}

impl RequestResult {
    fn empty(typ: RequestResultType) -> RequestResult {
        RequestResult {
            typ,
            v: None,
            f: None,
            m: None,
        }
    }
}

fn error_result(e: StateError) -> RequestResult {
    let typ = match e {
        StateError::Auth => RequestResultType::AuthError,
        StateError::NotFound => RequestResultType::RecordError,
        StateError::Record(RecordError::SizeMismatch { .. }) => RequestResultType::InputError,
        _ => RequestResultType::WriteError,
    };
    if typ == RequestResultType::WriteError {
        error!("request failed: {}", e);
    } else {
        debug!("request rejected: {}", e);
    }
    RequestResult::empty(typ)
}

/// Extract the short hash from a request path, ignoring any extension.
pub fn short_hash_from_url(url: &str) -> Option<String> {
    let path = url.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    let name = path.trim_start_matches('/');
    let short = match name.split('.').next() {
        Some(v) => v.to_ascii_lowercase(),
        None => {
            return None;
        },
    };
    if short.is_empty() || !short.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(short)
}

/// Handle client input by method type.
///
/// # Arguments
///
/// * `state` - Service state.
/// * `method` - The HTTP method of the client request.
/// * `url` - The local part of the URL of the client request.
/// * `f` - Reader providing the content body of a client upload.
/// * `expected_size` - Size hint for content body.
/// * `auth` - Credentials the client has provided with the request, if any.
/// * `info` - Metadata the client has provided with an upload.
pub fn process_method(state: &State, method: &Method, url: &str, f: impl Read, expected_size: usize, auth: Option<AuthSpec>, info: FileInfo) -> RequestResult {
    match method {
        Method::Put | Method::Post => {
            let auth = match auth {
                Some(v) => v,
                None => {
                    debug!("upload without credentials");
                    return RequestResult::empty(RequestResultType::AuthError);
                },
            };
            match state.upload(&auth.name, auth.secret(), info, f, expected_size) {
                Ok(v) => {
                    let mut res = RequestResult::empty(RequestResultType::Changed);
                    res.v = Some(v.url);
                    res
                },
                Err(e) => error_result(e),
            }
        },
        Method::Get => {
            let short = match short_hash_from_url(url) {
                Some(v) => v,
                None => {
                    debug!("invalid short hash in {}", url);
                    return RequestResult::empty(RequestResultType::InputError);
                },
            };
            match state.download(&short) {
                Ok((file, f)) => {
                    let mut res = RequestResult::empty(RequestResultType::Found);
                    res.f = Some(f);
                    res.m = Some(file.info);
                    res
                },
                Err(e) => error_result(e),
            }
        },
        _ => RequestResult::empty(RequestResultType::InputError),
    }
}


#[cfg(test)]
mod tests {
    use std::io::{
        empty,
        Read,
    };

    use tiny_http::Method;

    use super::{
        process_method,
        short_hash_from_url,
        RequestResultType,
    };
    use crate::auth::AuthSpec;
    use crate::meta::FileInfo;
    use crate::state::tests::state_with_user;

    fn info(filename: &str) -> FileInfo {
        FileInfo {
            filename: filename.to_string(),
            content_type: Some("text/plain".to_string()),
        }
    }

    #[test]
    fn test_short_hash_from_url() {
        assert_eq!(short_hash_from_url("/a999"), Some("a999".to_string()));
        assert_eq!(short_hash_from_url("/A999.txt"), Some("a999".to_string()));
        assert_eq!(short_hash_from_url("/teadbeef"), None);
        assert_eq!(short_hash_from_url("/"), None);
        assert_eq!(short_hash_from_url("/.txt"), None);
        assert_eq!(short_hash_from_url("/../etc/passwd"), None);
        assert_eq!(short_hash_from_url("/a999?dl=1"), Some("a999".to_string()));
        assert_eq!(short_hash_from_url("/a999.txt?v=a.b"), Some("a999".to_string()));
        assert_eq!(short_hash_from_url("/a999#top"), Some("a999".to_string()));
        assert_eq!(short_hash_from_url("/?a999"), None);
    }

    #[test]
    fn test_put_and_get() {
        let (_d, state) = state_with_user(true);
        let data = b"abc";
        let auth = AuthSpec::new("moradi", "hunter2");
        let res = process_method(&state, &Method::Put, "/", &data[..], 3, Some(auth), info("abc.txt"));
        assert_eq!(res.typ, RequestResultType::Changed);
        assert_eq!(res.v.unwrap(), "https://example.org/a999.txt");

        let res = process_method(&state, &Method::Get, "/a999.txt", empty(), 0, None, FileInfo::default());
        assert_eq!(res.typ, RequestResultType::Found);
        assert_eq!(res.m.unwrap().filename, "abc.txt");
        let mut s = String::new();
        res.f.unwrap().read_to_string(&mut s).unwrap();
        assert_eq!(s, "abc");

        let res = process_method(&state, &Method::Get, "/a999?dl=1", empty(), 0, None, FileInfo::default());
        assert_eq!(res.typ, RequestResultType::Found);
    }

    #[test]
    fn test_post_accepted() {
        let (_d, state) = state_with_user(false);
        let data = b"foo";
        let auth = AuthSpec::new("moradi", "hunter2");
        let res = process_method(&state, &Method::Post, "/", &data[..], 3, Some(auth), FileInfo::default());
        assert_eq!(res.typ, RequestResultType::Changed);
        assert_eq!(res.v.unwrap(), "https://example.org/0bee");
    }

    #[test]
    fn test_put_noauth() {
        let (_d, state) = state_with_user(true);
        let data = b"abc";
        let res = process_method(&state, &Method::Put, "/", &data[..], 3, None, info(""));
        assert_eq!(res.typ, RequestResultType::AuthError);

        let auth = AuthSpec::new("moradi", "wrong");
        let res = process_method(&state, &Method::Put, "/", &data[..], 3, Some(auth), info(""));
        assert_eq!(res.typ, RequestResultType::AuthError);

        let auth = AuthSpec::new("nobody", "hunter2");
        let res = process_method(&state, &Method::Put, "/", &data[..], 3, Some(auth), info(""));
        assert_eq!(res.typ, RequestResultType::AuthError);
        assert!(res.v.is_none());
    }

    #[test]
    fn test_put_truncated() {
        let (_d, state) = state_with_user(true);
        let data = b"ab";
        let auth = AuthSpec::new("moradi", "hunter2");
        let res = process_method(&state, &Method::Put, "/", &data[..], 3, Some(auth), info(""));
        assert_eq!(res.typ, RequestResultType::InputError);
    }

    #[test]
    fn test_get_bogus() {
        let (_d, state) = state_with_user(true);
        let res = process_method(&state, &Method::Get, "/teadbeef", empty(), 0, None, FileInfo::default());
        assert_eq!(res.typ, RequestResultType::InputError);

        let res = process_method(&state, &Method::Get, "/deadbeef", empty(), 0, None, FileInfo::default());
        assert_eq!(res.typ, RequestResultType::RecordError);
    }

    #[test]
    fn test_other_method() {
        let (_d, state) = state_with_user(true);
        let res = process_method(&state, &Method::Delete, "/a999", empty(), 0, None, FileInfo::default());
        assert_eq!(res.typ, RequestResultType::InputError);
    }
}

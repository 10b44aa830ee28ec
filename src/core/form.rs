//! Request body parsing for `POST`/`FILES`.

use std::collections::HashMap;

use bytes::Bytes;
use encoding_rs::Encoding;

use super::error::Failure;
use super::parser::parse_query_string;
use super::query::QueryDict;

/// Media type of urlencoded form bodies.
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";

/// Media type of multipart form bodies.
pub const MULTIPART_FORM_DATA: &str = "multipart/form-data";

/// A file submitted with a form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Form field the file was submitted under.
    pub field: String,
    /// Client-supplied file name.
    pub filename: String,
    pub content_type: String,
    pub content: Bytes,
}

/// Files submitted with a form, in submission order.
pub type Files = Vec<UploadedFile>;

/// Parsed form body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub post: QueryDict,
    pub files: Files,
}

/// Input handed to a [`BodyParser`].
#[derive(Debug, Clone, Copy)]
pub struct BodySource<'a> {
    pub content_type: &'a str,
    pub content_params: &'a HashMap<String, String>,
    pub encoding: &'static Encoding,
    pub body: &'a [u8],
}

/// Turns a request body into form data.
///
/// Called at most once per request, on first access to `post()` or `files()`.
pub trait BodyParser: Send + Sync {
    fn parse(&self, source: BodySource<'_>) -> Result<FormData, Failure>;
}

/// Default parser: urlencoded bodies only.
///
/// Multipart and any other media type produce empty form data.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormParser;

impl BodyParser for FormParser {
    fn parse(&self, source: BodySource<'_>) -> Result<FormData, Failure> {
        if source.content_type.eq_ignore_ascii_case(FORM_URLENCODED) {
            return Ok(FormData {
                post: parse_query_string(source.body, source.encoding),
                files: Files::new(),
            });
        }

        if source.content_type.eq_ignore_ascii_case(MULTIPART_FORM_DATA)
            && !source.content_params.contains_key("boundary")
        {
            return Err(Failure::BadRequest(
                "multipart body without boundary".to_string(),
            ));
        }

        Ok(FormData::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use encoding_rs::UTF_8;

    fn source<'a>(
        content_type: &'a str,
        params: &'a HashMap<String, String>,
        body: &'a [u8],
    ) -> BodySource<'a> {
        BodySource {
            content_type,
            content_params: params,
            encoding: UTF_8,
            body,
        }
    }

    #[test]
    fn test_urlencoded_body() {
        let params = HashMap::new();
        let data = FormParser
            .parse(source(FORM_URLENCODED, &params, b"name=Ann+Lee&tag=a&tag=b"))
            .unwrap();

        assert_eq!(data.post.get("name"), Some("Ann Lee"));
        assert_eq!(data.post.get_list("tag"), vec!["a", "b"]);
        assert!(data.files.is_empty());
    }

    #[test]
    fn test_other_types_are_empty() {
        let params = HashMap::new();
        let data = FormParser
            .parse(source("application/json", &params, b"{\"a\":1}"))
            .unwrap();
        assert!(data.post.is_empty());
    }

    #[test]
    fn test_multipart_requires_boundary() {
        let mut params = HashMap::new();
        assert!(FormParser
            .parse(source(MULTIPART_FORM_DATA, &params, b""))
            .is_err());

        params.insert("boundary".to_string(), "xyz".to_string());
        let data = FormParser
            .parse(source(MULTIPART_FORM_DATA, &params, b"--xyz--"))
            .unwrap();
        assert_eq!(data, FormData::default());
    }
}

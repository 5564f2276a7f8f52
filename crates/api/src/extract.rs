//! Request extractors
//!
//! JSON bodies, query strings and path ids decode into
//! `AppError::InvalidFormat` on failure so every error leaves the service in
//! the same envelope. Multipart forms are read fully into a [`Form`] of text
//! fields and files.

use axum::{
    extract::{FromRequest, FromRequestParts, Multipart, Path, Query, Request},
    http::request::Parts,
    Json,
};
use cpsu_common::{errors::AppError, storage::UploadedFile};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use validator::Validate;

/// JSON body with decode failures mapped to a 400
pub struct JsonBody<T>(pub T);

impl<T, S> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.body_text(),
            })?;
        Ok(JsonBody(value))
    }
}

/// JSON body that also passes its `validator` rules
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let JsonBody(value) = JsonBody::<T>::from_request(req, state).await?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// Query string with decode failures mapped to a 400
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.body_text(),
            })?;
        Ok(QueryParams(value))
    }
}

/// Integer id from the route's single path parameter
pub struct IdPath(pub i32);

impl<S> FromRequestParts<S> for IdPath
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i32>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::InvalidFormat {
                message: rejection.body_text(),
            })?;
        Ok(IdPath(id))
    }
}

/// A fully read multipart form
#[derive(Debug, Default)]
pub struct Form {
    fields: HashMap<String, String>,
    files: HashMap<String, Vec<UploadedFile>>,
}

impl Form {
    /// Drain a multipart stream. Parts carrying a file name are files; a
    /// file part with an empty name or body is an unfilled file input and is
    /// dropped. `images[]` and `images` name the same field.
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Form::default();

        while let Some(field) = multipart.next_field().await.map_err(|e| AppError::InvalidFormat {
            message: e.body_text(),
        })? {
            let name = field
                .name()
                .unwrap_or_default()
                .trim_end_matches("[]")
                .to_string();

            match field.file_name().map(str::to_string) {
                Some(file_name) => {
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await.map_err(|e| AppError::InvalidFormat {
                        message: e.body_text(),
                    })?;

                    if file_name.is_empty() || bytes.is_empty() {
                        continue;
                    }

                    form.files.entry(name).or_default().push(UploadedFile {
                        file_name,
                        content_type,
                        bytes: bytes.to_vec(),
                    });
                }
                None => {
                    let value = field.text().await.map_err(|e| AppError::InvalidFormat {
                        message: e.body_text(),
                    })?;
                    form.fields.insert(name, value);
                }
            }
        }

        Ok(form)
    }

    /// Text value; blank values count as absent
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    /// Raw text value, empty when absent
    pub fn text_or_empty(&self, name: &str) -> String {
        self.fields.get(name).cloned().unwrap_or_default()
    }

    /// Integer value; present but unparseable is a 400
    pub fn int(&self, name: &str) -> Result<Option<i32>, AppError> {
        match self.text(name) {
            Some(raw) => raw
                .parse::<i32>()
                .map(Some)
                .map_err(|_| AppError::invalid_field(name, format!("{} must be an integer", name))),
            None => Ok(None),
        }
    }

    pub fn file(&mut self, name: &str) -> Option<UploadedFile> {
        self.files.get_mut(name).and_then(|files| {
            if files.is_empty() {
                None
            } else {
                Some(files.remove(0))
            }
        })
    }

    /// Every file under `name`, in submission order
    pub fn files(&mut self, name: &str) -> Vec<UploadedFile> {
        self.files.remove(name).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(fields: &[(&str, &str)]) -> Form {
        Form {
            fields: fields
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            files: HashMap::new(),
        }
    }

    #[test]
    fn test_text_treats_blank_as_absent() {
        let form = form(&[("title", "  "), ("content", " body ")]);
        assert_eq!(form.text("title"), None);
        assert_eq!(form.text("content").as_deref(), Some("body"));
        assert_eq!(form.text_or_empty("missing"), "");
    }

    #[test]
    fn test_int_parsing() {
        let form = form(&[("type_id", "3"), ("course_id", "abc")]);
        assert_eq!(form.int("type_id").unwrap(), Some(3));
        assert_eq!(form.int("nothing").unwrap(), None);
        assert!(form.int("course_id").is_err());
    }

    #[test]
    fn test_files_keep_order() {
        let upload = |name: &str| UploadedFile {
            file_name: name.to_string(),
            content_type: None,
            bytes: vec![1],
        };
        let mut form = Form::default();
        form.files
            .insert("images".to_string(), vec![upload("a.jpg"), upload("b.jpg")]);

        let names: Vec<_> = form.files("images").into_iter().map(|f| f.file_name).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg"]);
        assert!(form.file("images").is_none());
    }
}

use reqwest::multipart::{Form, Part};

use super::GatewayError;

#[derive(Debug, Clone)]
enum Field {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        content_type: Option<String>,
        bytes: Vec<u8>,
    },
}

/// A `multipart/form-data` request body, for submissions that carry
/// binary content such as a profile picture.
#[derive(Debug, Clone, Default)]
pub struct MultipartBody {
    fields: Vec<Field>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(Field::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        content_type: Option<&str>,
        bytes: Vec<u8>,
    ) -> Self {
        self.fields.push(Field::File {
            name: name.into(),
            file_name: file_name.into(),
            content_type: content_type.map(str::to_string),
            bytes,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn into_form(self) -> Result<Form, GatewayError> {
        let mut form = Form::new();
        for field in self.fields {
            form = match field {
                Field::Text { name, value } => form.text(name, value),
                Field::File {
                    name,
                    file_name,
                    content_type,
                    bytes,
                } => {
                    let mut part = Part::bytes(bytes).file_name(file_name);
                    if let Some(ct) = content_type {
                        part = part.mime_str(&ct).map_err(|e| {
                            GatewayError::InvalidBody(format!("invalid content type {:?}: {}", ct, e))
                        })?;
                    }
                    form.part(name, part)
                }
            };
        }
        Ok(form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_collects_fields() {
        let body = MultipartBody::new()
            .text("balance", "25")
            .file("avatar", "me.png", Some("image/png"), vec![1, 2, 3]);
        assert_eq!(body.len(), 2);
        assert!(!body.is_empty());
        assert!(body.into_form().is_ok());
        assert!(MultipartBody::new().is_empty());
    }

    #[test]
    fn test_invalid_mime_is_rejected() {
        let body = MultipartBody::new().file("avatar", "me.png", Some("not a mime"), vec![1]);
        assert!(matches!(body.into_form(), Err(GatewayError::InvalidBody(_))));
    }
}

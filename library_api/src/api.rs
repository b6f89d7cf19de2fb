use paperclip::actix::Apiv2Schema;
use serde::{Deserialize, Serialize};

pub type BookId = i32;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(default, rename_all = "camelCase")]
/// Wire representation of a book
pub struct BookDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<BookId>,
    pub title: String,
    pub author: String,
    pub isbn: String,
}

impl BookDto {
    /// Returns one message per required field that is missing or empty
    pub fn validate(&self) -> Vec<String> {
        [
            ("title", &self.title),
            ("author", &self.author),
            ("isbn", &self.isbn),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| format!("{} must not be empty", field))
        .collect()
    }

    /// Same as [`BookDto::validate`] but for the fields accepted on update
    pub fn validate_for_update(&self) -> Vec<String> {
        self.validate()
            .into_iter()
            .filter(|message| !message.starts_with("isbn"))
            .collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
/// Query parameters of the book search, every filter field is optional
pub struct FindBooksQuery {
    pub title: Option<String>,
    pub author: Option<String>,
    pub page: Option<u32>,
    pub size: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
pub struct Pageable {
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
#[serde(rename_all = "camelCase")]
/// One page of search results together with the total number of matches
pub struct PageEnvelope {
    pub content: Vec<BookDto>,
    pub total_elements: u64,
    pub pageable: Pageable,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Eq, PartialEq, Apiv2Schema)]
pub struct ApiErrors {
    pub errors: Vec<String>,
}

impl ApiErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            errors: vec![message.into()],
        }
    }
}

impl From<Vec<String>> for ApiErrors {
    fn from(errors: Vec<String>) -> Self {
        Self { errors }
    }
}

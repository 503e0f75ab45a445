use serde::{Deserialize, Serialize};

/// Uniform provider envelope.
///
/// A non-empty `errors` list is a recovered domain failure (wrong password,
/// validation), never a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceResponse<T> {
    pub response_data: T,
    #[serde(default)]
    pub errors: Vec<String>,
}

impl<T> ServiceResponse<T> {
    pub fn ok(response_data: T) -> Self {
        Self {
            response_data,
            errors: Vec::new(),
        }
    }

    pub fn failed(response_data: T, errors: Vec<String>) -> Self {
        Self {
            response_data,
            errors,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.errors.first().map(String::as_str)
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ServiceResponse<U> {
        ServiceResponse {
            response_data: f(self.response_data),
            errors: self.errors,
        }
    }
}

impl<T: Default> ServiceResponse<T> {
    pub fn rejected(errors: Vec<String>) -> Self {
        Self::failed(T::default(), errors)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommonAccountResponse {
    pub message: String,
    pub code: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialUrl {
    pub provider: String,
    pub url: String,
}

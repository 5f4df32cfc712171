use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::AppError;
use crate::users::repo_types::{
    NewUser, User, UserChanges, EMAIL_MAX_LEN, FIRST_NAME_MAX_LEN, LAST_NAME_MAX_LEN,
    PHONE_NUMBER_MAX_LEN,
};

const MISSING_FIELDS: &str = "Missing required fields";

/// POST /users body. Required keys are `Option` so a missing key can be
/// reported as a validation failure instead of a deserialize error.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl CreateUserRequest {
    pub fn into_new_user(self) -> Result<NewUser, AppError> {
        let (Some(first_name), Some(last_name), Some(email)) =
            (self.first_name, self.last_name, self.email)
        else {
            return Err(AppError::validation(MISSING_FIELDS));
        };

        reject_blank(&[
            ("first_name", first_name.as_str()),
            ("last_name", last_name.as_str()),
            ("email", email.as_str()),
        ])?;
        reject_too_long(&[
            ("first_name", first_name.as_str(), FIRST_NAME_MAX_LEN),
            ("last_name", last_name.as_str(), LAST_NAME_MAX_LEN),
            ("email", email.as_str(), EMAIL_MAX_LEN),
            (
                "phone_number",
                self.phone_number.as_deref().unwrap_or_default(),
                PHONE_NUMBER_MAX_LEN,
            ),
        ])?;

        Ok(NewUser {
            first_name,
            last_name,
            email,
            phone_number: self.phone_number,
        })
    }
}

/// PUT /users/{id} body. The outer `Option` is "key present", the inner one
/// is "value not null". Unrecognized keys are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default, deserialize_with = "present")]
    pub first_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub last_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub phone_number: Option<Option<String>>,
}

impl UpdateUserRequest {
    pub fn into_changes(self) -> Result<UserChanges, AppError> {
        let first_name = required("first_name", self.first_name)?;
        let last_name = required("last_name", self.last_name)?;
        let email = required("email", self.email)?;

        let mut provided = Vec::new();
        for (name, value, max_len) in [
            ("first_name", &first_name, FIRST_NAME_MAX_LEN),
            ("last_name", &last_name, LAST_NAME_MAX_LEN),
            ("email", &email, EMAIL_MAX_LEN),
        ] {
            if let Some(v) = value {
                provided.push((name, v.as_str(), max_len));
            }
        }
        let names: Vec<(&str, &str)> = provided.iter().map(|(n, v, _)| (*n, *v)).collect();
        reject_blank(&names)?;

        if let Some(Some(phone)) = &self.phone_number {
            provided.push(("phone_number", phone.as_str(), PHONE_NUMBER_MAX_LEN));
        }
        reject_too_long(&provided)?;

        Ok(UserChanges {
            first_name,
            last_name,
            email,
            phone_number: self.phone_number,
        })
    }
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn required(field: &str, value: Option<Option<String>>) -> Result<Option<String>, AppError> {
    match value {
        Some(None) => Err(AppError::validation(format!("{field} cannot be null"))),
        Some(Some(v)) => Ok(Some(v)),
        None => Ok(None),
    }
}

fn reject_blank(fields: &[(&str, &str)]) -> Result<(), AppError> {
    let blank: Vec<&str> = fields
        .iter()
        .filter(|(_, v)| v.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();
    if blank.is_empty() {
        Ok(())
    } else {
        Err(AppError::validation(format!(
            "Fields must not be empty: {}",
            blank.join(", ")
        )))
    }
}

/// Limits are in characters, matching `VARCHAR(n)`.
fn reject_too_long(fields: &[(&str, &str, usize)]) -> Result<(), AppError> {
    match fields
        .iter()
        .find(|(_, v, max_len)| v.chars().count() > *max_len)
    {
        Some((name, _, max_len)) => Err(AppError::validation(format!(
            "{name} must be at most {max_len} characters"
        ))),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub users: Vec<User>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

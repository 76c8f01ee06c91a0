use axum::{
    Json,
    extract::{Multipart, Path, Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use tracing::debug;

use contactbook_types::api::{ListQuery, MAX_ADDRESS_LEN, MAX_FULL_NAME_LEN, MAX_PHONE_LEN};
use contactbook_types::models::{ContactPatch, NewContact};

use crate::book::AppState;
use crate::error::{ContactError, Result};
use crate::photos::PhotoUpload;

/// Fields of a create/update multipart form. Every field is optional at
/// this stage; create enforces presence afterwards.
#[derive(Debug, Default)]
pub struct ContactForm {
    pub full_name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub photo: Option<PhotoUpload>,
}

impl ContactForm {
    /// Read a multipart body. Field names match case-insensitively; unknown
    /// fields are ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_ascii_lowercase();
            match name.as_str() {
                "photo" => {
                    let file_name = field.file_name().unwrap_or_default().to_string();
                    let bytes = field.bytes().await?;
                    form.photo = Some(PhotoUpload::new(file_name, bytes));
                }
                "fullname" | "address" | "phone" => {
                    let value = field.text().await?;
                    match name.as_str() {
                        "fullname" => form.full_name = Some(value),
                        "address" => form.address = Some(value),
                        _ => form.phone = Some(value),
                    }
                }
                other => debug!("Ignoring unknown form field '{}'", other),
            }
        }

        Ok(form)
    }

    /// All three text fields must be present, non-empty and within limits.
    pub fn into_new_contact(self) -> Result<(NewContact, Option<PhotoUpload>)> {
        let full_name = required("FullName", self.full_name, MAX_FULL_NAME_LEN)?;
        let address = required("Address", self.address, MAX_ADDRESS_LEN)?;
        let phone = required("Phone", self.phone, MAX_PHONE_LEN)?;

        Ok((
            NewContact {
                full_name,
                address,
                phone,
                photo_url: None,
            },
            self.photo,
        ))
    }

    /// Supplied fields must be non-empty and within limits; absent fields
    /// stay unchanged.
    pub fn into_patch(self) -> Result<(ContactPatch, Option<PhotoUpload>)> {
        let patch = ContactPatch {
            full_name: optional("FullName", self.full_name, MAX_FULL_NAME_LEN)?,
            address: optional("Address", self.address, MAX_ADDRESS_LEN)?,
            phone: optional("Phone", self.phone, MAX_PHONE_LEN)?,
            photo_url: None,
        };
        Ok((patch, self.photo))
    }
}

fn required(field: &str, value: Option<String>, max_len: usize) -> Result<String> {
    optional(field, value, max_len)?
        .ok_or_else(|| ContactError::invalid(format!("{} is required", field)))
}

fn optional(field: &str, value: Option<String>, max_len: usize) -> Result<Option<String>> {
    let Some(value) = value else {
        return Ok(None);
    };
    if value.trim().is_empty() {
        return Err(ContactError::invalid(format!("{} must not be empty", field)));
    }
    if value.chars().count() > max_len {
        return Err(ContactError::invalid(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(Some(value))
}

/// GET /contacts?skip=&take=
pub async fn list_contacts(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ListQuery>, ContactError>,
) -> Result<impl IntoResponse> {
    let contacts = state.list(query.skip, query.take).await?;
    Ok(Json(contacts))
}

/// GET /contacts/{id}
pub async fn get_contact(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ContactError>,
) -> Result<impl IntoResponse> {
    Ok(Json(state.get(id).await?))
}

/// POST /contacts — multipart form with fullName, address, phone and an
/// optional photo. Responds 201 with a Location header.
pub async fn create_contact(
    State(state): State<AppState>,
    WithRejection(multipart, _): WithRejection<Multipart, ContactError>,
) -> Result<impl IntoResponse> {
    let form = ContactForm::from_multipart(multipart).await?;
    let (new, photo) = form.into_new_contact()?;

    let contact = state.create(new, photo).await?;
    let location = format!("/contacts/{}", contact.id);

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(contact),
    ))
}

/// PUT /contacts/{id} — multipart form, every field optional.
pub async fn update_contact(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ContactError>,
    WithRejection(multipart, _): WithRejection<Multipart, ContactError>,
) -> Result<impl IntoResponse> {
    let form = ContactForm::from_multipart(multipart).await?;
    let (patch, photo) = form.into_patch()?;

    Ok(Json(state.update(id, patch, photo).await?))
}

/// DELETE /contacts/{id}
pub async fn delete_contact(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<i64>, ContactError>,
) -> Result<StatusCode> {
    state.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

use crate::error::AttachmentError;
use crate::models::UploadPayload;

/// Rejects payloads before anything touches storage.
pub fn validate_payload(payload: &UploadPayload) -> Result<(), AttachmentError> {
    if !payload.is_valid() {
        return Err(AttachmentError::InvalidPayload(format!(
            "uploaded file '{}' is not valid",
            payload.original_name
        )));
    }

    if payload.data.is_empty() {
        return Err(AttachmentError::InvalidPayload(format!(
            "uploaded file '{}' is empty",
            payload.original_name
        )));
    }

    if payload.original_name.contains('\0') {
        return Err(AttachmentError::InvalidPayload(
            "file name contains a null byte".to_string(),
        ));
    }

    Ok(())
}

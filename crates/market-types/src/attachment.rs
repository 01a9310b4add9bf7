//! File metadata records.
//!
//! Uploads are handled outside this service; documents only keep the
//! metadata the upload layer reports back.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Metadata for a stored file referenced by a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct FileRef {
	/// Name of the file as stored by the upload layer.
	#[validate(length(min = 1))]
	pub filename: String,
	/// Name of the file as supplied by the uploader.
	#[serde(default)]
	pub original_name: Option<String>,
	/// Location of the stored file.
	#[validate(length(min = 1))]
	pub path: String,
	/// Size in bytes.
	#[serde(default)]
	pub size: u64,
	/// Upload time, stamped when the record is attached to a document.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub uploaded_at: Option<u64>,
}

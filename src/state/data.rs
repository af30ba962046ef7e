//! Shared data structures for the application state
//!
//! These structs represent the data model that flows between
//! the gateway (document storage) and the UI layer.

use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::error::FormError;

/// Prefix of every embedded image payload produced by ingestion
const JPEG_DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

/// Opaque document identifier, minted when a new project's modal opens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(String);

impl ProjectId {
    /// Mint a fresh identifier (gateway only)
    pub(crate) fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ProjectId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The three fixed lifecycle buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "wishlist")]
    Wishlist,
    /// Older documents stored this as "wip"
    #[serde(rename = "in-progress", alias = "wip")]
    InProgress,
    #[serde(rename = "finished")]
    Finished,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Wishlist, Category::InProgress, Category::Finished];

    /// Parse a stored tag. Unknown tags return `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "wishlist" => Some(Category::Wishlist),
            "in-progress" | "wip" => Some(Category::InProgress),
            "finished" => Some(Category::Finished),
            _ => None,
        }
    }

    /// Tag written into documents
    pub fn as_tag(&self) -> &'static str {
        match self {
            Category::Wishlist => "wishlist",
            Category::InProgress => "in-progress",
            Category::Finished => "finished",
        }
    }

    /// Column heading shown on the board
    pub fn label(&self) -> &'static str {
        match self {
            Category::Wishlist => "Wishlist",
            Category::InProgress => "Work in Progress",
            Category::Finished => "Finished",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Category as actually found in a stored document
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CategoryTag {
    Known(Category),
    /// Written by something other than this app; shown in the Unfiled column
    Unrecognized(String),
}

impl CategoryTag {
    pub fn parse(raw: &str) -> Self {
        match Category::from_tag(raw) {
            Some(category) => CategoryTag::Known(category),
            None => CategoryTag::Unrecognized(raw.to_string()),
        }
    }

    pub fn known(&self) -> Option<Category> {
        match self {
            CategoryTag::Known(category) => Some(*category),
            CategoryTag::Unrecognized(_) => None,
        }
    }
}

/// A self-contained `data:` URI holding a JPEG image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImagePayload(String);

impl ImagePayload {
    /// Wrap encoded JPEG bytes as an embeddable payload
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self(format!(
            "{}{}",
            JPEG_DATA_URI_PREFIX,
            general_purpose::STANDARD.encode(bytes)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decode the payload back to raw image bytes for display.
    /// Accepts any `data:<mime>;base64,` URI, not just the ones we produce.
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        let rest = self.0.strip_prefix("data:")?;
        let (_, encoded) = rest.split_once(";base64,")?;
        general_purpose::STANDARD.decode(encoded).ok()
    }
}

impl From<String> for ImagePayload {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Wire shape of a stored project document.
///
/// Every field defaults to empty so that partially written documents still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProjectDocument {
    pub name: String,
    pub category: String,
    pub pattern: String,
    pub yarn: String,
    pub hook_size: String,
    pub notes_link: String,
    pub notes: String,
    pub images: Vec<ImagePayload>,
    pub main_image: String,
    /// Milliseconds since the Unix epoch, stamped by the gateway on create
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

/// A persisted project record
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub category: CategoryTag,
    pub pattern: String,
    pub yarn: String,
    pub hook_size: String,
    pub notes_link: String,
    pub notes: String,
    pub images: Vec<ImagePayload>,
    pub main_image: Option<ImagePayload>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Project {
    pub fn from_document(id: ProjectId, doc: ProjectDocument) -> Self {
        let main_image = if doc.main_image.is_empty() {
            None
        } else {
            Some(ImagePayload::from(doc.main_image))
        };

        Self {
            id,
            name: doc.name,
            category: CategoryTag::parse(&doc.category),
            pattern: doc.pattern,
            yarn: doc.yarn,
            hook_size: doc.hook_size,
            notes_link: doc.notes_link,
            notes: doc.notes,
            images: doc.images,
            main_image,
            created_at: doc.created_at.and_then(DateTime::from_timestamp_millis),
        }
    }

    /// Designated main image, falling back to the first image.
    /// A stored main image that is not among `images` is ignored.
    pub fn thumbnail(&self) -> Option<&ImagePayload> {
        self.main_image
            .as_ref()
            .filter(|main| self.images.contains(main))
            .or_else(|| self.images.first())
    }

    /// Text matched by the search box
    pub fn search_text(&self) -> String {
        [
            self.name.as_str(),
            self.pattern.as_str(),
            self.yarn.as_str(),
            self.hook_size.as_str(),
            self.notes.as_str(),
        ]
        .join(" ")
    }
}

/// The edit buffer held by the project modal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectDraft {
    pub name: String,
    pub category: Category,
    pub pattern: String,
    pub yarn: String,
    pub hook_size: String,
    pub notes_link: String,
    pub notes: String,
    pub images: Vec<ImagePayload>,
    pub main_image: Option<ImagePayload>,
}

impl ProjectDraft {
    pub fn blank() -> Self {
        Self::default()
    }

    /// Seed a draft from a record's current values
    pub fn from_project(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            category: project.category.known().unwrap_or_default(),
            pattern: project.pattern.clone(),
            yarn: project.yarn.clone(),
            hook_size: project.hook_size.clone(),
            notes_link: project.notes_link.clone(),
            notes: project.notes.clone(),
            images: project.images.clone(),
            main_image: project.main_image.clone(),
        }
    }

    /// Append freshly ingested images in order.
    /// The first one becomes the main image when none is set yet.
    pub fn append_images(&mut self, payloads: impl IntoIterator<Item = ImagePayload>) {
        let start = self.images.len();
        self.images.extend(payloads);

        if self.main_image.is_none() {
            self.main_image = self.images.get(start).cloned();
        }
    }

    pub fn set_main_image(&mut self, payload: &ImagePayload) -> Result<(), FormError> {
        if !self.images.contains(payload) {
            return Err(FormError::UnknownImage);
        }
        self.main_image = Some(payload.clone());
        Ok(())
    }

    /// Repair the draft before it leaves the modal.
    ///
    /// A main image that is not one of `images` is replaced by the first
    /// image (or cleared when there are none). The name is trimmed.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();

        let main_is_member = self
            .main_image
            .as_ref()
            .is_some_and(|main| self.images.contains(main));

        if !main_is_member {
            self.main_image = self.images.first().cloned();
        }
        self
    }

    /// Build the stored document for a first save
    pub fn to_document(&self, created_at: DateTime<Utc>) -> ProjectDocument {
        ProjectDocument {
            name: self.name.clone(),
            category: self.category.as_tag().to_string(),
            pattern: self.pattern.clone(),
            yarn: self.yarn.clone(),
            hook_size: self.hook_size.clone(),
            notes_link: self.notes_link.clone(),
            notes: self.notes.clone(),
            images: self.images.clone(),
            main_image: self
                .main_image
                .as_ref()
                .map(|m| m.as_str().to_string())
                .unwrap_or_default(),
            created_at: Some(created_at.timestamp_millis()),
        }
    }

    /// Patch carrying every draft field; `createdAt` is never included
    pub fn to_patch(&self) -> ProjectPatch {
        ProjectPatch {
            name: Some(self.name.clone()),
            category: Some(self.category),
            pattern: Some(self.pattern.clone()),
            yarn: Some(self.yarn.clone()),
            hook_size: Some(self.hook_size.clone()),
            notes_link: Some(self.notes_link.clone()),
            notes: Some(self.notes.clone()),
            images: Some(self.images.clone()),
            main_image: Some(
                self.main_image
                    .as_ref()
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
            ),
        }
    }
}

/// Partial record for merge updates. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yarn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hook_size: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<ImagePayload>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(tag: &str) -> ImagePayload {
        ImagePayload::from(format!("data:image/jpeg;base64,{}", tag))
    }

    #[test]
    fn test_category_tags() {
        assert_eq!(Category::from_tag("wishlist"), Some(Category::Wishlist));
        assert_eq!(Category::from_tag("wip"), Some(Category::InProgress));
        assert_eq!(Category::from_tag("in-progress"), Some(Category::InProgress));
        assert_eq!(Category::from_tag("Finished"), None);

        for category in Category::ALL {
            assert_eq!(Category::from_tag(category.as_tag()), Some(category));
        }
    }

    #[test]
    fn test_unrecognized_tag_is_kept() {
        let tag = CategoryTag::parse("frogged");
        assert_eq!(tag, CategoryTag::Unrecognized("frogged".to_string()));
        assert_eq!(tag.known(), None);
    }

    #[test]
    fn test_document_defaults_missing_fields() {
        let doc: ProjectDocument =
            serde_json::from_str(r#"{"name":"Granny square","category":"wip"}"#).unwrap();

        let project = Project::from_document(ProjectId::from("p1".to_string()), doc);
        assert_eq!(project.category, CategoryTag::Known(Category::InProgress));
        assert_eq!(project.pattern, "");
        assert!(project.images.is_empty());
        assert_eq!(project.main_image, None);
        assert_eq!(project.created_at, None);
    }

    #[test]
    fn test_append_images_sets_first_as_main() {
        let mut draft = ProjectDraft::blank();
        draft.append_images(vec![payload("A"), payload("B"), payload("C")]);

        assert_eq!(draft.images, vec![payload("A"), payload("B"), payload("C")]);
        assert_eq!(draft.main_image, Some(payload("A")));

        // A second batch does not steal the main image
        draft.append_images(vec![payload("D")]);
        assert_eq!(draft.main_image, Some(payload("A")));
    }

    #[test]
    fn test_set_main_image_rejects_strangers() {
        let mut draft = ProjectDraft::blank();
        draft.append_images(vec![payload("A"), payload("B")]);

        assert!(draft.set_main_image(&payload("B")).is_ok());
        assert_eq!(draft.main_image, Some(payload("B")));
        assert_eq!(draft.set_main_image(&payload("Z")), Err(FormError::UnknownImage));
        assert_eq!(draft.main_image, Some(payload("B")));
    }

    #[test]
    fn test_normalized_repairs_main_image() {
        let mut draft = ProjectDraft::blank();
        draft.name = "  Amigurumi fox ".to_string();
        draft.images = vec![payload("A"), payload("B")];
        draft.main_image = Some(payload("Z"));

        let repaired = draft.normalized();
        assert_eq!(repaired.name, "Amigurumi fox");
        assert_eq!(repaired.main_image, Some(payload("A")));

        let mut empty = ProjectDraft::blank();
        empty.main_image = Some(payload("Z"));
        assert_eq!(empty.normalized().main_image, None);
    }

    #[test]
    fn test_patch_omits_created_at() {
        let mut draft = ProjectDraft::blank();
        draft.name = "Shawl".to_string();
        let json = serde_json::to_value(draft.to_patch()).unwrap();

        assert_eq!(json["name"], "Shawl");
        assert_eq!(json["category"], "wishlist");
        assert_eq!(json["hookSize"], "");
        assert!(json.get("createdAt").is_none());
    }

    #[test]
    fn test_thumbnail_ignores_main_image_outside_images() {
        let doc = ProjectDocument {
            name: "Shawl".to_string(),
            images: vec![ImagePayload::from_jpeg(&[1]), ImagePayload::from_jpeg(&[2])],
            main_image: ImagePayload::from_jpeg(&[9]).as_str().to_string(),
            ..Default::default()
        };
        let project = Project::from_document(ProjectId::from("s".to_string()), doc);
        assert_eq!(project.thumbnail(), Some(&ImagePayload::from_jpeg(&[1])));

        let bare = Project::from_document(ProjectId::from("b".to_string()), ProjectDocument::default());
        assert_eq!(bare.thumbnail(), None);
    }

    #[test]
    fn test_payload_decodes() {
        let original = vec![0xFF, 0xD8, 0x01, 0x02];
        let payload = ImagePayload::from_jpeg(&original);

        assert!(payload.as_str().starts_with("data:image/jpeg;base64,"));
        assert_eq!(payload.decode_bytes(), Some(original));
        assert_eq!(ImagePayload::from("https://example.com/a.jpg".to_string()).decode_bytes(), None);
    }
}

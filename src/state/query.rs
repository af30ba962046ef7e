//! Filter/sort engine
//!
//! Derives what the board and the collage show from the cached records.
//! Everything here borrows from the cache; nothing is copied or mutated.

use tracing::warn;

use super::data::{Category, CategoryTag, ImagePayload, Project};

/// How many photos the collage shows
pub const DEFAULT_COLLAGE_LIMIT: usize = 12;

/// Case-insensitive substring search over name, pattern, yarn, hook size and notes.
/// An empty query matches everything. Input order is preserved.
pub fn filter<'a>(records: &'a [Project], query: &str) -> Vec<&'a Project> {
    let needle = query.to_lowercase();
    records
        .iter()
        .filter(|project| needle.is_empty() || project.search_text().to_lowercase().contains(&needle))
        .collect()
}

/// Oldest first; records without a timestamp come before all others.
/// Stable, so equal timestamps keep their relative order.
pub fn sort_by_created(projects: &mut [&Project]) {
    projects.sort_by_key(|project| project.created_at);
}

/// Records of one category, ordered by creation time
pub fn bucket<'a>(subset: &[&'a Project], category: Category) -> Vec<&'a Project> {
    let mut projects: Vec<&Project> = subset
        .iter()
        .copied()
        .filter(|project| project.category == CategoryTag::Known(category))
        .collect();
    sort_by_created(&mut projects);
    projects
}

/// Records whose stored category is not one of the three known tags
pub fn unfiled<'a>(subset: &[&'a Project]) -> Vec<&'a Project> {
    let mut projects: Vec<&Project> = subset
        .iter()
        .copied()
        .filter(|project| matches!(project.category, CategoryTag::Unrecognized(_)))
        .collect();
    sort_by_created(&mut projects);
    projects
}

/// Everything the board renders for one search query
#[derive(Debug, Default)]
pub struct Board<'a> {
    pub wishlist: Vec<&'a Project>,
    pub in_progress: Vec<&'a Project>,
    pub finished: Vec<&'a Project>,
    pub unfiled: Vec<&'a Project>,
}

impl<'a> Board<'a> {
    pub fn build(records: &'a [Project], query: &str) -> Self {
        let subset = filter(records, query);

        let unfiled = unfiled(&subset);
        for project in &unfiled {
            if let CategoryTag::Unrecognized(tag) = &project.category {
                warn!("Project {} has unrecognized category {:?}", project.id, tag);
            }
        }

        Self {
            wishlist: bucket(&subset, Category::Wishlist),
            in_progress: bucket(&subset, Category::InProgress),
            finished: bucket(&subset, Category::Finished),
            unfiled,
        }
    }

    pub fn column(&self, category: Category) -> &[&'a Project] {
        match category {
            Category::Wishlist => &self.wishlist,
            Category::InProgress => &self.in_progress,
            Category::Finished => &self.finished,
        }
    }
}

/// Photos for the "Recent Creations" collage.
///
/// One image per record (main image, else first image), newest first,
/// records without a timestamp last, at most `limit` entries.
pub fn collage(records: &[Project], finished_only: bool, limit: usize) -> Vec<&ImagePayload> {
    let mut entries: Vec<(&Project, &ImagePayload)> = records
        .iter()
        .filter(|project| !finished_only || project.category == CategoryTag::Known(Category::Finished))
        .filter_map(|project| project.thumbnail().map(|image| (project, image)))
        .collect();

    // Descending with None < Some puts missing timestamps at the end
    entries.sort_by(|a, b| b.0.created_at.cmp(&a.0.created_at));

    entries.into_iter().take(limit).map(|(_, image)| image).collect()
}
